//! # Handler Abstraction
//!
//! Provider and subscriber callables come from the surrounding application
//! and may be synchronous or asynchronous. The variant is resolved once at
//! registration time; the router and bus just call [`Handler::invoke`] and
//! await only when the handler is actually async.

use crate::message::Message;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A handler failure, carried back to the caller as message data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    /// Build a handler error from any displayable cause.
    pub fn new(cause: impl fmt::Display) -> Self {
        Self(cause.to_string())
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// What a handler returns: a JSON result value or a contained failure.
pub type HandlerResult = Result<Value, HandlerError>;

/// An asynchronous message handler.
#[async_trait]
pub trait AsyncHandler: Send + Sync {
    /// Process a delivered message.
    async fn handle(&self, message: &Message) -> HandlerResult;
}

type SyncFn = dyn Fn(&Message) -> HandlerResult + Send + Sync;

/// A registered handler, sync or async, resolved at registration time.
///
/// Cheap to clone; both variants are reference-counted.
#[derive(Clone)]
pub enum Handler {
    /// Plain function or closure, invoked inline.
    Sync(Arc<SyncFn>),
    /// Async handler object, awaited at the dispatch suspension point.
    Async(Arc<dyn AsyncHandler>),
}

impl Handler {
    /// Register a synchronous handler.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Register an asynchronous handler.
    pub fn from_async<H>(handler: H) -> Self
    where
        H: AsyncHandler + 'static,
    {
        Self::Async(Arc::new(handler))
    }

    /// Invoke the handler, awaiting only for the async variant.
    pub async fn invoke(&self, message: &Message) -> HandlerResult {
        match self {
            Self::Sync(f) => f(message),
            Self::Async(h) => h.handle(message).await,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Handler::Sync"),
            Self::Async(_) => f.write_str("Handler::Async"),
        }
    }
}
