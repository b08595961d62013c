//! Specification-driven client for REST APIs.
//!
//! Load an API description, get a [`Session`], and work with endpoints as
//! [`Api`] handles, records as [`Resource`]s and bulk sets of records as lazy
//! [`Collection`]s.
//!
//! # Example
//!
//! ```ignore
//! use restspec::{Call, Session};
//!
//! #[tokio::main]
//! async fn main() -> restspec::Result<()> {
//!     let session = Session::from_url("https://petstore.example.com/v2/swagger.json").await?;
//!     let pets = session.endpoint("/pets")?;
//!
//!     let mut rex = pets.get_by_id(1).await?;
//!     rex.insert("name", "Rex");
//!     rex.commit().await?;
//!
//!     let names: Vec<String> = pets
//!         .list()
//!         .map(|pet| pet.get("name").and_then(|n| n.as_str()).unwrap_or("-").to_string())
//!         .distinct()
//!         .all()
//!         .await?;
//!
//!     session.close().await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod error;
pub mod http;
pub mod persist;
pub mod resource;
pub mod spec;

pub use api::{Api, Call, Expect, Outcome};
pub use error::{Error, ErrorKind, Result};
pub use http::{Body, FilePayload, HttpTransport, Session, Transport};
pub use persist::{IfExists, Persistence, TableDescriptor};
pub use resource::{Collection, FanOut, FieldValue, Fields, Resource, ResourceCollection};
pub use spec::{load_spec, Endpoint, Field, FieldType, Model, Operation, Spec};
