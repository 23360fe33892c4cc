//! Error types for the domain layer and its collaborators

mod collaborator_error;
mod domain_error;

pub use collaborator_error::{CacheError, PresenceError, ResolveError};
pub use domain_error::DomainError;
