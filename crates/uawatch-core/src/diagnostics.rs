// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Diagnostic sinks.
//!
//! The router never logs failures through a global logger of its own choosing.
//! Every contained failure and every received event is handed to the
//! [`DiagnosticSink`] injected at construction.
//!
//! | Sink            | Use                                        |
//! |-----------------|--------------------------------------------|
//! | [`TracingSink`]   | Structured `tracing` events (default)      |
//! | [`MemorySink`]    | Keeps diagnostics in memory for inspection |
//! | [`CompositeSink`] | Fans out to several sinks                  |

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::Level;

use crate::error::{DispatchError, ListenerError};
use crate::event::EventNotification;

// =============================================================================
// Diagnostic
// =============================================================================

/// A diagnostic produced by the router.
#[derive(Debug, Clone)]
pub enum Diagnostic {
    /// A notification carried no extractable node identity.
    MalformedEvent {
        /// Why the key could not be extracted.
        reason: String,
        /// When it was recorded.
        at: DateTime<Utc>,
    },

    /// A listener returned an error, panicked or timed out.
    ListenerFailure {
        /// Listener identity.
        listener: String,
        /// Variable key being dispatched.
        key: String,
        /// The failure.
        cause: Arc<ListenerError>,
        /// When it was recorded.
        at: DateTime<Utc>,
    },

    /// A dispatch was cancelled.
    Cancelled {
        /// Variable key being dispatched.
        key: String,
        /// Listeners that completed before cancellation.
        invoked: usize,
        /// When it was recorded.
        at: DateTime<Utc>,
    },

    /// A non-data-change event was received.
    Event(EventNotification),
}

impl Diagnostic {
    /// Builds the diagnostic for a contained dispatch error.
    pub fn from_error(key: Option<&str>, error: DispatchError) -> Self {
        let at = Utc::now();
        let key = key.unwrap_or_default().to_string();
        match error {
            DispatchError::MalformedEvent { reason } => Self::MalformedEvent { reason, at },
            DispatchError::ListenerFailure { listener, source } => Self::ListenerFailure {
                listener,
                key,
                cause: Arc::new(source),
                at,
            },
            DispatchError::Cancelled { invoked } => Self::Cancelled { key, invoked, at },
        }
    }

    /// Returns the diagnostic kind name.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed_event",
            Self::ListenerFailure { .. } => "listener_failure",
            Self::Cancelled { .. } => "cancelled",
            Self::Event(_) => "event",
        }
    }

    /// Returns `true` for failures (malformed events and listener failures).
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::MalformedEvent { .. } | Self::ListenerFailure { .. })
    }

    /// Returns the listener identity for listener failures.
    pub fn listener(&self) -> Option<&str> {
        match self {
            Self::ListenerFailure { listener, .. } => Some(listener),
            _ => None,
        }
    }

    /// Returns the level this diagnostic is logged at.
    pub fn level(&self) -> Level {
        match self {
            Self::MalformedEvent { .. } | Self::ListenerFailure { .. } => Level::ERROR,
            Self::Cancelled { .. } => Level::WARN,
            Self::Event(event) if event.severity >= 700 => Level::WARN,
            Self::Event(_) => Level::INFO,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedEvent { reason, .. } => write!(f, "Malformed event: {}", reason),
            Self::ListenerFailure {
                listener,
                key,
                cause,
                ..
            } => write!(f, "Error in listener {} for '{}': {}", listener, key, cause),
            Self::Cancelled { key, invoked, .. } => write!(
                f,
                "Dispatch of '{}' cancelled after {} listener(s)",
                key, invoked
            ),
            Self::Event(event) => write!(f, "Event received: {}", event),
        }
    }
}

// =============================================================================
// DiagnosticSink Trait
// =============================================================================

/// Receiver of router diagnostics.
///
/// Implementations must be cheap and must not block: `record` is called
/// inline on the dispatch path.
pub trait DiagnosticSink: Send + Sync {
    /// Records a diagnostic.
    fn record(&self, diagnostic: &Diagnostic);

    /// Returns the sink name.
    fn name(&self) -> &str {
        "unnamed"
    }
}

// =============================================================================
// TracingSink
// =============================================================================

/// Emits each diagnostic as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Creates a tracing sink.
    pub fn new() -> Self {
        Self
    }
}

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::MalformedEvent { reason, .. } => {
                tracing::error!(reason = %reason, "Malformed data-change notification");
            }
            Diagnostic::ListenerFailure {
                listener,
                key,
                cause,
                ..
            } => {
                tracing::error!(
                    listener = %listener,
                    key = %key,
                    panicked = cause.is_panic(),
                    timed_out = cause.is_timeout(),
                    error = %cause,
                    "Error in listener {}",
                    listener
                );
            }
            Diagnostic::Cancelled { key, invoked, .. } => {
                tracing::warn!(key = %key, invoked = invoked, "Dispatch cancelled");
            }
            Diagnostic::Event(event) if diagnostic.level() == Level::WARN => {
                tracing::warn!(source = %event.source, severity = event.severity, "Event received: {}", event.message);
            }
            Diagnostic::Event(event) => {
                tracing::info!(source = %event.source, severity = event.severity, "Event received: {}", event.message);
            }
        }
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

// =============================================================================
// MemorySink
// =============================================================================

/// Keeps diagnostics in memory.
///
/// Clones share the same storage, so a test can keep one handle and give the
/// other to the router.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<RwLock<Vec<Diagnostic>>>,
    /// Maximum number of entries to keep (0 = unlimited).
    max_entries: usize,
}

impl MemorySink {
    /// Creates an unbounded memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a memory sink that drops the oldest entries beyond `max_entries`.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::with_capacity(max_entries.min(1024)))),
            max_entries,
        }
    }

    /// Returns all recorded diagnostics.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries.read().clone()
    }

    /// Returns diagnostics matching a predicate.
    pub fn entries_where<F>(&self, predicate: F) -> Vec<Diagnostic>
    where
        F: Fn(&Diagnostic) -> bool,
    {
        self.entries
            .read()
            .iter()
            .filter(|d| predicate(d))
            .cloned()
            .collect()
    }

    /// Returns recorded failures only.
    pub fn failures(&self) -> Vec<Diagnostic> {
        self.entries_where(Diagnostic::is_failure)
    }

    /// Returns recorded events only.
    pub fn events(&self) -> Vec<EventNotification> {
        self.entries
            .read()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Event(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, diagnostic: &Diagnostic) {
        let mut entries = self.entries.write();
        entries.push(diagnostic.clone());
        if self.max_entries > 0 && entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// =============================================================================
// CompositeSink
// =============================================================================

/// Forwards each diagnostic to every inner sink, in order.
#[derive(Clone, Default)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn DiagnosticSink>>,
}

impl CompositeSink {
    /// Creates an empty composite sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Returns the number of inner sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` if there are no inner sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl fmt::Debug for CompositeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSink")
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl DiagnosticSink for CompositeSink {
    fn record(&self, diagnostic: &Diagnostic) {
        for sink in &self.sinks {
            sink.record(diagnostic);
        }
    }

    fn name(&self) -> &str {
        "composite"
    }
}

// =============================================================================
// Tests
// =============================================================================
