// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Notifications delivered by the subscription transport.
//!
//! A [`ChangeEvent`] is what the transport hands to the router for every
//! monitored-item change. The router only reads it. The logical variable key
//! is taken from the monitored item carried in the notification payload, not
//! from the changed node itself.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::node::NodeId;
use crate::types::Value;

// =============================================================================
// MonitoredItemRef
// =============================================================================

/// The monitored item a data-change notification belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoredItemRef {
    /// Node the item monitors.
    pub node_id: NodeId,

    /// Client handle assigned when the item was created.
    pub client_handle: u32,
}

impl MonitoredItemRef {
    /// Creates a monitored item reference.
    pub fn new(node_id: NodeId, client_handle: u32) -> Self {
        Self {
            node_id,
            client_handle,
        }
    }
}

// =============================================================================
// NotificationPayload
// =============================================================================

/// Raw notification payload as produced by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// A data-change notification for one monitored item.
    DataChange {
        /// The monitored item that changed.
        monitored_item: MonitoredItemRef,
    },

    /// Any other notification shape.
    Other {
        /// Transport-specific description of the payload.
        description: String,
    },
}

// =============================================================================
// ChangeEvent
// =============================================================================

/// A data change delivered by the subscription transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Node whose value changed.
    pub node_id: NodeId,

    /// The new value.
    pub value: Value,

    /// Raw notification payload.
    pub notification: NotificationPayload,
}

impl ChangeEvent {
    /// Creates a well-formed data-change event for a monitored node.
    pub fn data_change(node_id: NodeId, client_handle: u32, value: Value) -> Self {
        Self {
            notification: NotificationPayload::DataChange {
                monitored_item: MonitoredItemRef::new(node_id.clone(), client_handle),
            },
            node_id,
            value,
        }
    }

    /// Creates an event with an arbitrary payload.
    pub fn with_payload(node_id: NodeId, value: Value, notification: NotificationPayload) -> Self {
        Self {
            node_id,
            value,
            notification,
        }
    }

    /// Extracts the logical variable key from the notification payload.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedEvent`] when the payload is not a
    /// data-change notification or its monitored item has no usable identity.
    pub fn logical_key(&self) -> Result<String, DispatchError> {
        match &self.notification {
            NotificationPayload::DataChange { monitored_item } => {
                monitored_item.node_id.logical_key().ok_or_else(|| {
                    DispatchError::malformed(format!(
                        "monitored item '{}' has no usable identifier",
                        monitored_item.node_id
                    ))
                })
            }
            NotificationPayload::Other { description } => Err(DispatchError::malformed(format!(
                "expected a data-change notification, got '{}'",
                description
            ))),
        }
    }
}

// =============================================================================
// EventNotification
// =============================================================================

/// A non-data-change notification (alarm, condition, audit event...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNotification {
    /// Node that emitted the event.
    pub source: NodeId,

    /// Event message.
    pub message: String,

    /// OPC UA severity, 1 (lowest) to 1000 (highest).
    pub severity: u16,

    /// Time the event occurred.
    pub time: DateTime<Utc>,
}

impl EventNotification {
    /// Creates an event notification stamped with the current time.
    pub fn new(source: NodeId, message: impl Into<String>, severity: u16) -> Self {
        Self {
            source,
            message: message.into(),
            severity: severity.clamp(1, 1000),
            time: Utc::now(),
        }
    }
}

impl fmt::Display for EventNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (severity {})",
            self.source, self.message, self.severity
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
