//! Error types for the model runtime.

use thiserror::Error;

/// Misuse of a model instance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A suspend scope was opened while another one is still alive on the same core.
    #[error("notifications are already suspended on this model")]
    NestedSuspend,
}

/// Failures while resolving services from a [`ServiceProvider`](crate::ServiceProvider).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no service registered for `{type_name}`")]
    NotRegistered { type_name: &'static str },

    #[error("circular service dependency: {chain}")]
    Circular { chain: String },

    #[error("failed to construct `{type_name}`: {message}")]
    Construction {
        type_name: &'static str,
        message: String,
    },
}

impl ServiceError {
    /// Construction failure reported from inside a factory.
    pub fn construction<T: ?Sized>(message: impl Into<String>) -> Self {
        Self::Construction {
            type_name: std::any::type_name::<T>(),
            message: message.into(),
        }
    }
}
