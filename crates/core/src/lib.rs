//! `credo-core`: identifiers, aggregate versioning and the shared error
//! taxonomy used by the credential crates. No IO.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{AggregateRoot, ExpectedVersion};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::IdentityId;
pub use value_object::ValueObject;
