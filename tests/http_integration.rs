//! Integration tests for sessions, API handles and resources using wiremock
//!
//! These tests run the full stack (session, transport, content negotiation,
//! resource lifecycle and bulk fan-out) against mocked endpoints.

use futures::StreamExt;
use restspec::{Body, Call, Error, ErrorKind, Expect, FieldValue, FilePayload, Fields, Resource, Session};
use serde_json::json;
use wiremock::matchers::{
    body_partial_json, body_string_contains, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fields(value: serde_json::Value) -> Fields {
    restspec::resource::fields_from_json(value).unwrap()
}

fn petstore_spec() -> serde_json::Value {
    json!({
        "swagger": "2.0",
        "basePath": "/api",
        "paths": {
            "/pets": {
                "get": {"operationId": "findPets"},
                "post": {"operationId": "addPet"}
            },
            "/pets/{petId}": {
                "get": {"operationId": "getPet"},
                "delete": {"operationId": "deletePet"}
            }
        }
    })
}

async fn spec_session(server: &MockServer) -> Session {
    Mock::given(method("GET"))
        .and(path("/swagger.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(petstore_spec()))
        .mount(server)
        .await;

    Session::from_url(&format!("{}/swagger.json", server.uri()))
        .await
        .expect("spec should load")
}

/// Content negotiation across families
mod negotiation_tests {
    use super::*;

    #[tokio::test]
    async fn test_json_body_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Rex"})))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let body = session.api("pets").get(Call::new().path("1")).await.unwrap();
        assert_eq!(body.into_data().unwrap(), json!({"id": 1, "name": "Rex"}));
    }

    #[tokio::test]
    async fn test_xml_body_is_converted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<pet><id>1</id><name>Rex</name></pet>", "application/xml"),
            )
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let body = session.api("pets").get(Call::new().path("1")).await.unwrap();
        assert_eq!(
            body.into_data().unwrap(),
            json!({"pet": {"id": "1", "name": "Rex"}})
        );
    }

    #[tokio::test]
    async fn test_extension_used_when_content_type_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/config.yaml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("name: Rex\nage: 3\n", "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let body = session.api("files").get(Call::new().path("config.yaml")).await.unwrap();
        assert_eq!(body.into_data().unwrap(), json!({"name": "Rex", "age": 3}));
    }

    #[tokio::test]
    async fn test_plain_text_is_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        match session.api("health").get(Call::new()).await.unwrap() {
            Body::Text(text) => assert_eq!(text, "ok"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_parameters_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets"))
            .and(query_param("status", "available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let body = session
            .api("pets")
            .get(Call::new().query("status", "available"))
            .await
            .unwrap();
        assert_eq!(body.into_data().unwrap(), json!([]));
    }
}

/// File uploads
mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_file_is_sent_as_multipart_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/uploads"))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .and(body_string_contains(r#"name="file""#))
            .and(body_string_contains(r#"filename="a.csv""#))
            .and(body_string_contains("text/csv"))
            .and(body_string_contains("id,name"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"rows": 2})))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let csv = b"id,name\n1,Rex\n2,Tom\n".to_vec();
        let body = session
            .api("uploads")
            .post(Call::new().file(FilePayload::new("a.csv", csv).with_mime("text/csv")))
            .await
            .unwrap();
        assert_eq!(body.into_data().unwrap(), json!({"rows": 2}));
    }

    #[tokio::test]
    async fn test_file_with_json_body_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let err = session
            .api("uploads")
            .post(
                Call::new()
                    .json(json!({"name": "a"}))
                    .file(FilePayload::new("a.csv", b"id\n".to_vec())),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}

/// Remote failures surface as typed errors
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_404_is_remote_status_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets/99"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let err = session.api("pets").get_by_id(99).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteStatus);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_malformed_json_is_decode_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("{not json", "application/json"))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let err = session.api("pets").get(Call::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[tokio::test]
    async fn test_closed_session_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let pets = session.api("pets");
        session.close().await;

        let err = pets.get(Call::new()).await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
    }
}

/// Single-resource lifecycle
mod resource_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_load_is_stable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pets"))
            .and(body_partial_json(json!({"name": "Rex"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7, "name": "Rex"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pets/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Rex"})))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let mut rex = Resource::with_api(fields(json!({"name": "Rex"})), session.api("pets"));
        rex.create().await.unwrap();
        assert_eq!(rex.id(), Some(&FieldValue::Integer(7)));

        let created = rex.clone();
        rex.load().await.unwrap();
        assert_eq!(rex, created);
    }

    #[tokio::test]
    async fn test_commit_merges_partial_response() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "sold"})))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let mut rex = Resource::with_api(fields(json!({"id": 7, "name": "Rex"})), session.api("pets"));
        rex.commit().await.unwrap();

        assert_eq!(rex.get("name").and_then(FieldValue::as_str), Some("Rex"));
        assert_eq!(rex.get("status").and_then(FieldValue::as_str), Some("sold"));
    }

    #[tokio::test]
    async fn test_load_without_id_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let mut pet = Resource::with_api(fields(json!({"name": "Rex"})), session.api("pets"));
        assert!(matches!(pet.load().await, Err(Error::MissingId)));
    }

    #[tokio::test]
    async fn test_delete_keeps_local_fields() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/pets/7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let rex = Resource::with_api(fields(json!({"id": 7, "name": "Rex"})), session.api("pets"));
        rex.delete().await.unwrap();
        assert_eq!(rex.get("name").and_then(FieldValue::as_str), Some("Rex"));
    }
}

/// Bulk operations and collections
mod collection_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_binds_every_resource() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"id": 1, "name": "Rex"}, {"id": 2, "name": "Tom"}])),
            )
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let pets = session.api("pets").list().all().await.unwrap();
        assert_eq!(pets.len(), 2);
        assert!(pets.iter().all(|pet| pet.api().is_some()));
        assert_eq!(pets[1].get("name").and_then(FieldValue::as_str), Some("Tom"));
    }

    #[tokio::test]
    async fn test_list_of_object_is_shape_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let err = session.api("pets").list().all().await.unwrap_err();
        assert!(matches!(err, Error::UnexpectedShape { expected: "array", .. }));
    }

    #[tokio::test]
    async fn test_create_multiple_reports_single_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pets"))
            .and(body_partial_json(json!({"name": "bad"})))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/pets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"created": true})))
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let items = ["a", "b", "bad", "c", "d"]
            .iter()
            .map(|name| fields(json!({"name": name})));

        let results: Vec<_> = session.api("pets").create_multiple(items).collect().await;
        assert_eq!(results.len(), 5);

        let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].status(), Some(500));

        let created: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
        assert_eq!(created.len(), 4);
        assert!(created
            .iter()
            .all(|pet| pet.get("created").and_then(FieldValue::as_bool) == Some(true)));
    }

    #[tokio::test]
    async fn test_bulk_delete_yields_deleted_resources() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}, {"id": 3}])))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let session = Session::new(&server.uri()).unwrap();
        let deleted = session
            .api("pets")
            .list()
            .filter(|pet| pet.id() != Some(&FieldValue::Integer(2)))
            .delete()
            .sorted(false)
            .await
            .unwrap();

        let ids: Vec<_> = deleted.iter().filter_map(|pet| pet.id()?.as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}

/// Spec-driven sessions and declared operations
mod spec_tests {
    use super::*;

    #[tokio::test]
    async fn test_from_url_derives_base_from_source() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;

        assert_eq!(session.base_url().as_str(), format!("{}/api", server.uri()));
        assert_eq!(
            session.endpoint_names(),
            vec!["/pets".to_string(), "/pets/{petId}".to_string()]
        );
    }

    #[tokio::test]
    async fn test_spec_without_base_path_lists_from_host_root() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/swagger.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "swagger": "2.0",
                "paths": {"/pets": {"get": {"operationId": "findPets"}}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .expect(1)
            .mount(&server)
            .await;

        let session = Session::from_url(&format!("{}/swagger.json", server.uri()))
            .await
            .unwrap();
        assert_eq!(session.base_url().as_str(), format!("{}/", server.uri()));

        let pets = session.endpoint("/pets").unwrap().list().all().await.unwrap();
        assert_eq!(pets.len(), 2);
    }

    #[tokio::test]
    async fn test_endpoint_list_keeps_base_path() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
            .expect(1)
            .mount(&server)
            .await;

        let pets = session.endpoint("/pets").unwrap().list().all().await.unwrap();
        assert_eq!(pets.len(), 1);
    }

    #[tokio::test]
    async fn test_declared_operation_expands_path_params() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/pets/7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7, "name": "Rex"})))
            .expect(1)
            .mount(&server)
            .await;

        let pet = session
            .endpoint("/pets/{petId}")
            .unwrap()
            .call("getPet", Call::new().param("petId", 7), Expect::One)
            .await
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(pet.get("name").and_then(FieldValue::as_str), Some("Rex"));
    }

    #[tokio::test]
    async fn test_declared_list_operation_wraps_many() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/pets"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
            .mount(&server)
            .await;

        let pets = session
            .endpoint("/pets")
            .unwrap()
            .call_many("findPets", Call::new().query("limit", 2))
            .await
            .unwrap()
            .all()
            .await
            .unwrap();
        assert_eq!(pets.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_operation_makes_no_request() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/pets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let err = session
            .endpoint("/pets")
            .unwrap()
            .invoke("explode", Call::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSuchOperation(name) if name == "explode"));
    }

    #[tokio::test]
    async fn test_missing_path_param_makes_no_request() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let err = session
            .endpoint("/pets/{petId}")
            .unwrap()
            .invoke("deletePet", Call::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingPathParam(name) if name == "petId"));
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_lookup_failure() {
        let server = MockServer::start().await;
        let session = spec_session(&server).await;
        let err = session.endpoint("/owners").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Lookup);
    }
}
