// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA error types.
//!
//! # Error Categories
//!
//! ```text
//! UaError
//! ├── Connection    - endpoint and session issues
//! ├── Operation     - read, write and call failures (carry a StatusCode)
//! ├── Subscription  - subscription and monitored item errors
//! └── Configuration - invalid settings, unknown namespaces
//! ```
//!
//! These errors belong to the owner of a session or subscription. The
//! notification router never sees them.
//!
//! # Examples
//!
//! ```
//! use uawatch_opcua::error::{StatusCode, UaError};
//!
//! let error = UaError::node_not_found("ns=2;s=missing");
//! assert_eq!(error.status_code(), Some(StatusCode::BadNodeIdUnknown));
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use uawatch_core::DataType;

/// Result alias for OPC UA operations.
pub type UaResult<T> = Result<T, UaError>;

// =============================================================================
// StatusCode
// =============================================================================

/// The subset of OPC UA status codes produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u32)]
pub enum StatusCode {
    /// Operation succeeded.
    Good = 0x0000_0000,
    /// Unexpected internal failure.
    BadInternalError = 0x8002_0000,
    /// Server is shutting down.
    BadShutdown = 0x800E_0000,
    /// No connection to the server.
    BadServerNotConnected = 0x800F_0000,
    /// Subscription id is not valid.
    BadSubscriptionIdInvalid = 0x8028_0000,
    /// Node id does not refer to a node in the address space.
    BadNodeIdUnknown = 0x8034_0000,
    /// Access level does not allow reading.
    BadNotReadable = 0x803A_0000,
    /// Access level does not allow writing.
    BadNotWritable = 0x803B_0000,
    /// Value was out of range.
    BadOutOfRange = 0x803C_0000,
    /// Monitored item id is not valid.
    BadMonitoredItemIdInvalid = 0x8042_0000,
    /// Requested node id is already in use.
    BadNodeIdExists = 0x805E_0000,
    /// Node class is not valid for the operation.
    BadNodeClassInvalid = 0x805F_0000,
    /// Value supplied has the wrong data type.
    BadTypeMismatch = 0x8074_0000,
    /// Method does not exist on the object.
    BadMethodInvalid = 0x8075_0000,
    /// Not enough input arguments.
    BadArgumentsMissing = 0x8076_0000,
    /// One or more arguments are invalid.
    BadInvalidArgument = 0x80AB_0000,
    /// Too many input arguments.
    BadTooManyArguments = 0x80E5_0000,
}

impl StatusCode {
    /// Returns the numeric status code.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns the symbolic name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::BadInternalError => "BadInternalError",
            Self::BadShutdown => "BadShutdown",
            Self::BadServerNotConnected => "BadServerNotConnected",
            Self::BadSubscriptionIdInvalid => "BadSubscriptionIdInvalid",
            Self::BadNodeIdUnknown => "BadNodeIdUnknown",
            Self::BadNotReadable => "BadNotReadable",
            Self::BadNotWritable => "BadNotWritable",
            Self::BadOutOfRange => "BadOutOfRange",
            Self::BadMonitoredItemIdInvalid => "BadMonitoredItemIdInvalid",
            Self::BadNodeIdExists => "BadNodeIdExists",
            Self::BadNodeClassInvalid => "BadNodeClassInvalid",
            Self::BadTypeMismatch => "BadTypeMismatch",
            Self::BadMethodInvalid => "BadMethodInvalid",
            Self::BadArgumentsMissing => "BadArgumentsMissing",
            Self::BadInvalidArgument => "BadInvalidArgument",
            Self::BadTooManyArguments => "BadTooManyArguments",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#010x})", self.name(), self.code())
    }
}

// =============================================================================
// UaError - Main Error Type
// =============================================================================

/// The main error type for OPC UA operations.
#[derive(Debug, Error)]
pub enum UaError {
    /// Connection-related errors.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// Read, write and call errors.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// Subscription and monitoring errors.
    #[error("{0}")]
    Subscription(#[from] SubscriptionError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
}

impl UaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection error.
    #[inline]
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Creates an operation error.
    #[inline]
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Creates a subscription error.
    #[inline]
    pub fn subscription(error: SubscriptionError) -> Self {
        Self::Subscription(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    // =========================================================================
    // Convenience Factory Methods
    // =========================================================================

    /// Creates a not connected error.
    pub fn not_connected() -> Self {
        Self::Connection(ConnectionError::NotConnected)
    }

    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::Operation(OperationError::node_not_found(node_id))
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(node_id: impl Into<String>, expected: DataType, actual: DataType) -> Self {
        Self::Operation(OperationError::type_mismatch(node_id, expected, actual))
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration(ConfigurationError::invalid_parameter(field, reason))
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns the OPC UA status code carried by this error, if any.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Connection(e) => Some(e.status_code()),
            Self::Operation(e) => Some(e.status_code()),
            Self::Subscription(e) => Some(e.status_code()),
            Self::Configuration(_) => None,
        }
    }
}

// =============================================================================
// ConnectionError
// =============================================================================

/// Connection-related errors.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// No server is listening at the endpoint.
    #[error("Connection refused to '{endpoint}'")]
    Refused {
        /// Endpoint URL.
        endpoint: String,
    },

    /// Endpoint URL is malformed.
    #[error("Invalid endpoint URL: '{url}' - {reason}")]
    InvalidEndpoint {
        /// The URL.
        url: String,
        /// Why it is invalid.
        reason: String,
    },

    /// The server exists but is not running.
    #[error("Server not running at '{endpoint}'")]
    ServerNotRunning {
        /// Endpoint URL.
        endpoint: String,
    },

    /// The request did not complete in time.
    #[error("Request to '{endpoint}' timed out after {duration:?}")]
    TimedOut {
        /// Endpoint URL.
        endpoint: String,
        /// Time waited.
        duration: Duration,
    },

    /// No session is open.
    #[error("Not connected to OPC UA server")]
    NotConnected,
}

impl ConnectionError {
    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>) -> Self {
        Self::Refused {
            endpoint: endpoint.into(),
        }
    }

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a server not running error.
    pub fn server_not_running(endpoint: impl Into<String>) -> Self {
        Self::ServerNotRunning {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timed_out(endpoint: impl Into<String>, duration: Duration) -> Self {
        Self::TimedOut {
            endpoint: endpoint.into(),
            duration,
        }
    }

    /// Returns the matching status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ServerNotRunning { .. } => StatusCode::BadShutdown,
            _ => StatusCode::BadServerNotConnected,
        }
    }
}

// =============================================================================
// OperationError
// =============================================================================

/// Read, write and method call errors.
#[derive(Debug, Clone, Error)]
pub enum OperationError {
    /// Node does not exist.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// Node id.
        node_id: String,
    },

    /// Node id already in use.
    #[error("Node already exists: {node_id}")]
    NodeExists {
        /// Node id.
        node_id: String,
    },

    /// Node has the wrong class for the operation.
    #[error("Node '{node_id}' is not a {expected}")]
    WrongNodeClass {
        /// Node id.
        node_id: String,
        /// Required node class.
        expected: &'static str,
    },

    /// Node is not writable.
    #[error("Node '{node_id}' is not writable")]
    NotWritable {
        /// Node id.
        node_id: String,
    },

    /// Value has the wrong data type.
    #[error("Type mismatch for node '{node_id}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Node id.
        node_id: String,
        /// Declared data type.
        expected: DataType,
        /// Supplied data type.
        actual: DataType,
    },

    /// Method is not a component of the object.
    #[error("Method '{method}' is not defined on object '{object}'")]
    MethodInvalid {
        /// Object node id.
        object: String,
        /// Method node id.
        method: String,
    },

    /// Wrong number of input arguments.
    #[error("Method '{method}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        /// Method node id.
        method: String,
        /// Declared argument count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },

    /// An input argument has the wrong data type.
    #[error("Argument '{name}' of method '{method}': expected {expected}, got {actual}")]
    InvalidArgument {
        /// Method node id.
        method: String,
        /// Argument name.
        name: String,
        /// Declared data type.
        expected: DataType,
        /// Supplied data type.
        actual: DataType,
    },

    /// A method handler returned results that do not match its declared outputs.
    #[error("Method '{method}' returned invalid output: {message}")]
    InvalidOutput {
        /// Method node id.
        method: String,
        /// Details.
        message: String,
    },

    /// Value out of range.
    #[error("Value out of range for '{node_id}': {message}")]
    OutOfRange {
        /// Node id.
        node_id: String,
        /// Details.
        message: String,
    },
}

impl OperationError {
    /// Creates a node not found error.
    pub fn node_not_found(node_id: impl Into<String>) -> Self {
        Self::NodeNotFound {
            node_id: node_id.into(),
        }
    }

    /// Creates a node exists error.
    pub fn node_exists(node_id: impl Into<String>) -> Self {
        Self::NodeExists {
            node_id: node_id.into(),
        }
    }

    /// Creates a wrong node class error.
    pub fn wrong_node_class(node_id: impl Into<String>, expected: &'static str) -> Self {
        Self::WrongNodeClass {
            node_id: node_id.into(),
            expected,
        }
    }

    /// Creates a not writable error.
    pub fn not_writable(node_id: impl Into<String>) -> Self {
        Self::NotWritable {
            node_id: node_id.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(node_id: impl Into<String>, expected: DataType, actual: DataType) -> Self {
        Self::TypeMismatch {
            node_id: node_id.into(),
            expected,
            actual,
        }
    }

    /// Creates a method invalid error.
    pub fn method_invalid(object: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodInvalid {
            object: object.into(),
            method: method.into(),
        }
    }

    /// Creates an out of range error.
    pub fn out_of_range(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutOfRange {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Returns the matching status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NodeNotFound { .. } => StatusCode::BadNodeIdUnknown,
            Self::NodeExists { .. } => StatusCode::BadNodeIdExists,
            Self::WrongNodeClass { .. } => StatusCode::BadNodeClassInvalid,
            Self::NotWritable { .. } => StatusCode::BadNotWritable,
            Self::TypeMismatch { .. } => StatusCode::BadTypeMismatch,
            Self::MethodInvalid { .. } => StatusCode::BadMethodInvalid,
            Self::ArgumentCount {
                expected, actual, ..
            } if actual < expected => StatusCode::BadArgumentsMissing,
            Self::ArgumentCount { .. } => StatusCode::BadTooManyArguments,
            Self::InvalidArgument { .. } => StatusCode::BadInvalidArgument,
            Self::InvalidOutput { .. } => StatusCode::BadInternalError,
            Self::OutOfRange { .. } => StatusCode::BadOutOfRange,
        }
    }
}

// =============================================================================
// SubscriptionError
// =============================================================================

/// Subscription and monitored item errors.
#[derive(Debug, Clone, Error)]
pub enum SubscriptionError {
    /// Subscription does not exist (or was deleted).
    #[error("Subscription not found: {subscription_id}")]
    NotFound {
        /// Subscription id.
        subscription_id: u32,
    },

    /// Monitored item does not exist.
    #[error("Monitored item not found: {item_id}")]
    MonitoredItemNotFound {
        /// Monitored item id.
        item_id: u32,
    },

    /// Publishing interval rejected.
    #[error("Invalid publishing interval: {interval:?}")]
    InvalidInterval {
        /// Requested interval.
        interval: Duration,
    },
}

impl SubscriptionError {
    /// Creates a subscription not found error.
    pub fn not_found(subscription_id: u32) -> Self {
        Self::NotFound { subscription_id }
    }

    /// Creates a monitored item not found error.
    pub fn monitored_item_not_found(item_id: u32) -> Self {
        Self::MonitoredItemNotFound { item_id }
    }

    /// Returns the matching status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::BadSubscriptionIdInvalid,
            Self::MonitoredItemNotFound { .. } => StatusCode::BadMonitoredItemIdInvalid,
            Self::InvalidInterval { .. } => StatusCode::BadInvalidArgument,
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// A parameter is invalid.
    #[error("Invalid parameter '{field}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        field: String,
        /// Why it is invalid.
        reason: String,
    },

    /// Namespace URI is not registered on the server.
    #[error("Namespace not found: {uri}")]
    NamespaceNotFound {
        /// Namespace URI.
        uri: String,
    },

    /// Operation not allowed in the current server state.
    #[error("Invalid server state: expected {expected}, was {actual}")]
    InvalidState {
        /// Required state.
        expected: String,
        /// Actual state.
        actual: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid parameter error.
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a namespace not found error.
    pub fn namespace_not_found(uri: impl Into<String>) -> Self {
        Self::NamespaceNotFound { uri: uri.into() }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self::InvalidState {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCode::BadTypeMismatch.code(), 0x8074_0000);
        assert_eq!(
            StatusCode::BadNodeIdUnknown.to_string(),
            "BadNodeIdUnknown (0x80340000)"
        );
    }

    #[test]
    fn test_operation_status_mapping() {
        let err = UaError::type_mismatch("ns=2;s=temperature", DataType::Float, DataType::String);
        assert_eq!(err.status_code(), Some(StatusCode::BadTypeMismatch));
        assert_eq!(
            err.to_string(),
            "Type mismatch for node 'ns=2;s=temperature': expected Float, got String"
        );

        let missing = OperationError::ArgumentCount {
            method: "increment_value".into(),
            expected: 1,
            actual: 0,
        };
        assert_eq!(missing.status_code(), StatusCode::BadArgumentsMissing);

        let extra = OperationError::ArgumentCount {
            method: "increment_value".into(),
            expected: 1,
            actual: 2,
        };
        assert_eq!(extra.status_code(), StatusCode::BadTooManyArguments);
    }

    #[test]
    fn test_status_code_per_category() {
        assert_eq!(
            UaError::not_connected().status_code(),
            Some(StatusCode::BadServerNotConnected)
        );
        assert_eq!(
            UaError::from(ConnectionError::refused("opc.tcp://localhost:4840")).status_code(),
            Some(StatusCode::BadServerNotConnected)
        );

        let err = UaError::from(ConfigurationError::namespace_not_found("urn:missing"));
        assert!(err.status_code().is_none());
    }
}
