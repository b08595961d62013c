//! Resources and resource collections
//!
//! This module provides the record-level view of an API: single
//! [`Resource`]s with create/load/commit/delete, and lazy [`Collection`]s that
//! fan bulk verbs out concurrently.
//!
//! # Architecture
//!
//! - [`value`] - Typed field values and the [`Fields`] mapping
//! - [`object`] - The [`Resource`] record and its lifecycle calls
//! - [`collection`] - Lazy concatenated sequences and their combinators
//! - [`fanout`] - Completion-ordered concurrent bulk verbs
//!
//! # Example
//!
//! ```ignore
//! use restspec::Session;
//!
//! async fn rename_all(session: &Session) -> restspec::Result<()> {
//!     let pets = session.endpoint("/pets")?;
//!     let mut renamed = pets
//!         .list()
//!         .filter(|pet| pet.get("status").and_then(|s| s.as_str()) == Some("available"))
//!         .map(|mut pet| {
//!             pet.insert("name", "renamed");
//!             pet
//!         })
//!         .commit();
//!     while let Some(pet) = futures::StreamExt::next(&mut renamed).await {
//!         println!("{:?}", pet?.id());
//!     }
//!     Ok(())
//! }
//! ```

pub mod collection;
pub mod fanout;
pub mod object;
pub mod value;

pub use collection::{Collection, ResourceCollection};
pub use fanout::FanOut;
pub use object::{Resource, ID_FIELD};
pub use value::{fields_from_json, fields_to_json, FieldValue, Fields};
