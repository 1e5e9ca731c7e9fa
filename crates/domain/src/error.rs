//! Common error types used across the workspace.
//!
//! [`BridgeError`] is the error that crosses port boundaries. Each layer
//! defines its own typed errors and converts into it via `#[from]` or an
//! explicit `into_domain` helper.

/// Boxed source error carried by the IO-flavoured variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Base error for the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced object does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The vendor rejected our credentials, even after re-authenticating.
    #[error("authentication failed")]
    Auth(#[source] BoxError),

    /// The vendor API failed for a reason other than authentication.
    #[error("upstream error")]
    Upstream(#[source] BoxError),

    /// Persistence (registry, token file) failed.
    #[error("storage error")]
    Storage(#[source] BoxError),
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A display name is empty.
    #[error("name must not be empty")]
    EmptyName,

    /// A unique id is empty.
    #[error("unique id must not be empty")]
    EmptyUniqueId,

    /// An entity id does not follow the `<kind>.<slug>` format.
    #[error("invalid entity id {0:?}")]
    InvalidEntityId(String),

    /// A service is not supported by the targeted entity kind.
    #[error("service {service:?} is not supported by {kind} entities")]
    UnsupportedService {
        /// The requested service name.
        service: String,
        /// The entity kind the call targeted.
        kind: &'static str,
    },

    /// Service call data is missing or malformed.
    #[error("invalid service data: {0}")]
    InvalidServiceData(&'static str),

    /// A refresh produced a snapshot that breaks its own key relations.
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),
}

/// A lookup did not find the requested object.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    /// Kind of object that was looked up (e.g. `"Entity"`).
    pub entity: &'static str,
    /// Identifier that was looked up.
    pub id: String,
}
