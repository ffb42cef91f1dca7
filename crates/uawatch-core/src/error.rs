// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for notification routing.
//!
//! ```text
//! DispatchError
//! ├── MalformedEvent   - notification carries no extractable node identity
//! ├── ListenerFailure  - a listener returned an error, panicked or timed out
//! └── Cancelled        - dispatch stopped by a cancellation token
//! ```
//!
//! None of these ever escape [`NotificationRouter`](crate::router::NotificationRouter)
//! dispatch. They are handed to the injected
//! [`DiagnosticSink`](crate::diagnostics::DiagnosticSink) instead.

use std::time::Duration;

use thiserror::Error;

/// Boxed error type accepted as a listener failure cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// DispatchError
// =============================================================================

/// Failures contained inside a single dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The notification payload does not carry an extractable node identity.
    #[error("Malformed event: {reason}")]
    MalformedEvent {
        /// Why the key could not be extracted.
        reason: String,
    },

    /// A registered listener failed.
    #[error("Listener '{listener}' failed: {source}")]
    ListenerFailure {
        /// Listener identity.
        listener: String,
        /// Underlying cause.
        #[source]
        source: ListenerError,
    },

    /// Dispatch was cancelled before all listeners ran.
    #[error("Dispatch cancelled after {invoked} listener(s)")]
    Cancelled {
        /// Listeners that completed before cancellation.
        invoked: usize,
    },
}

impl DispatchError {
    /// Creates a malformed event error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            reason: reason.into(),
        }
    }

    /// Creates a listener failure error.
    pub fn listener_failure(listener: impl Into<String>, source: ListenerError) -> Self {
        Self::ListenerFailure {
            listener: listener.into(),
            source,
        }
    }

    /// Returns the error kind name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed_event",
            Self::ListenerFailure { .. } => "listener_failure",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Returns the listener identity for listener failures.
    pub fn listener(&self) -> Option<&str> {
        match self {
            Self::ListenerFailure { listener, .. } => Some(listener),
            _ => None,
        }
    }
}

// =============================================================================
// ListenerError
// =============================================================================

/// Failure reported by (or on behalf of) a listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The listener returned an error.
    #[error("{message}")]
    Failed {
        /// Error message.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The listener panicked.
    #[error("Listener panicked: {0}")]
    Panicked(String),

    /// The listener did not finish within the dispatch timeout.
    #[error("Listener timed out after {0:?}")]
    TimedOut(Duration),
}

impl ListenerError {
    /// Creates a failure from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a failure wrapping an underlying error.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Failed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns `true` if the listener panicked.
    #[inline]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Returns `true` if the listener timed out.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

// =============================================================================
// NodeIdError
// =============================================================================

/// A node id string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid node id '{input}': {reason}")]
pub struct NodeIdError {
    /// The rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: String,
}

impl NodeIdError {
    pub(crate) fn new(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
