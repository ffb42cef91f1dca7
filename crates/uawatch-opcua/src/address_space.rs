// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process OPC UA address space.
//!
//! A flat node table keyed by [`NodeId`] with parent/child component links,
//! plus the server namespace table. Only the node classes the demo needs are
//! modelled: objects (folders), variables and methods.
//!
//! ```text
//! Objects (i=85)
//! └── Device (ns=2;s=Device)
//!     ├── temperature   Float, writable
//!     ├── ...
//!     └── increment_value()
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uawatch_core::{DataType, NodeId, Value};

use crate::error::{OperationError, UaError, UaResult};

/// URI of namespace 0.
pub const STANDARD_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Method implementation: receives the validated input arguments.
pub type MethodHandler = Arc<dyn Fn(&[Value]) -> UaResult<Vec<Value>> + Send + Sync>;

// =============================================================================
// Node Metadata
// =============================================================================

/// Node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Object or folder.
    Object,
    /// Variable.
    Variable,
    /// Method.
    Method,
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => write!(f, "Object"),
            Self::Variable => write!(f, "Variable"),
            Self::Method => write!(f, "Method"),
        }
    }
}

/// Namespace-qualified browse name, displayed as `2:Temperature`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace_index, self.name)
    }
}

/// Method argument definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Scalar data type.
    pub data_type: DataType,
    /// Description.
    pub description: String,
}

impl Argument {
    /// Creates an argument definition.
    pub fn new(name: impl Into<String>, data_type: DataType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: description.into(),
        }
    }
}

/// A value with its timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// The value.
    pub value: Value,
    /// When the value was produced.
    pub source_timestamp: DateTime<Utc>,
    /// When the server recorded it.
    pub server_timestamp: DateTime<Utc>,
}

impl DataValue {
    /// Creates a data value stamped now.
    pub fn now(value: Value) -> Self {
        let now = Utc::now();
        Self {
            value,
            source_timestamp: now,
            server_timestamp: now,
        }
    }
}

/// Read-only view of a node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    /// Node id.
    pub node_id: NodeId,
    /// Browse name.
    pub browse_name: QualifiedName,
    /// Node class.
    pub node_class: NodeClass,
    /// Parent node, `None` for the Objects folder.
    pub parent: Option<NodeId>,
    /// Data type, for variables.
    pub data_type: Option<DataType>,
    /// Whether clients may write the value.
    pub writable: bool,
}

// =============================================================================
// Internal Node Storage
// =============================================================================

enum NodeKind {
    Object,
    Variable {
        value: DataValue,
        data_type: DataType,
        writable: bool,
    },
    Method {
        handler: MethodHandler,
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
    },
}

struct Node {
    browse_name: QualifiedName,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    fn class(&self) -> NodeClass {
        match self.kind {
            NodeKind::Object => NodeClass::Object,
            NodeKind::Variable { .. } => NodeClass::Variable,
            NodeKind::Method { .. } => NodeClass::Method,
        }
    }

    fn info(&self, node_id: &NodeId) -> NodeInfo {
        let (data_type, writable) = match &self.kind {
            NodeKind::Variable {
                data_type,
                writable,
                ..
            } => (Some(*data_type), *writable),
            _ => (None, false),
        };
        NodeInfo {
            node_id: node_id.clone(),
            browse_name: self.browse_name.clone(),
            node_class: self.class(),
            parent: self.parent.clone(),
            data_type,
            writable,
        }
    }
}

// =============================================================================
// AddressSpace
// =============================================================================

/// Thread-safe node table and namespace registry.
pub struct AddressSpace {
    namespaces: RwLock<Vec<String>>,
    nodes: DashMap<NodeId, Node>,
}

impl AddressSpace {
    /// Creates an address space holding only the Objects folder.
    pub fn new() -> Self {
        let nodes = DashMap::new();
        nodes.insert(
            NodeId::OBJECTS_FOLDER,
            Node {
                browse_name: QualifiedName::new(0, "Objects"),
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Object,
            },
        );
        Self {
            namespaces: RwLock::new(vec![STANDARD_NAMESPACE_URI.to_string()]),
            nodes,
        }
    }

    // -------------------------------------------------------------------------
    // Namespaces
    // -------------------------------------------------------------------------

    /// Registers a namespace URI and returns its index.
    ///
    /// Registering an existing URI returns the existing index.
    pub fn register_namespace(&self, uri: &str) -> u16 {
        let mut namespaces = self.namespaces.write();
        if let Some(index) = namespaces.iter().position(|ns| ns == uri) {
            return index as u16;
        }
        namespaces.push(uri.to_string());
        (namespaces.len() - 1) as u16
    }

    /// Returns the index of a registered namespace URI.
    pub fn get_namespace_index(&self, uri: &str) -> Option<u16> {
        self.namespaces
            .read()
            .iter()
            .position(|ns| ns == uri)
            .map(|index| index as u16)
    }

    /// Returns the namespace table.
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.read().clone()
    }

    // -------------------------------------------------------------------------
    // Node Creation
    // -------------------------------------------------------------------------

    /// Adds a folder object under `parent`.
    pub fn add_folder(&self, parent: &NodeId, node_id: NodeId, browse_name: &str) -> UaResult<NodeId> {
        self.insert(parent, node_id, browse_name, NodeKind::Object)
    }

    /// Adds a variable under `parent`. Its data type is fixed by `initial`.
    ///
    /// Variables start read-only for clients; see [`set_writable`](Self::set_writable).
    pub fn add_variable(
        &self,
        parent: &NodeId,
        node_id: NodeId,
        browse_name: &str,
        initial: Value,
    ) -> UaResult<NodeId> {
        let kind = NodeKind::Variable {
            data_type: initial.data_type(),
            value: DataValue::now(initial),
            writable: false,
        };
        self.insert(parent, node_id, browse_name, kind)
    }

    /// Adds a method under `parent`.
    pub fn add_method<F>(
        &self,
        parent: &NodeId,
        node_id: NodeId,
        browse_name: &str,
        inputs: Vec<Argument>,
        outputs: Vec<Argument>,
        handler: F,
    ) -> UaResult<NodeId>
    where
        F: Fn(&[Value]) -> UaResult<Vec<Value>> + Send + Sync + 'static,
    {
        let kind = NodeKind::Method {
            handler: Arc::new(handler),
            inputs,
            outputs,
        };
        self.insert(parent, node_id, browse_name, kind)
    }

    /// Allows (or forbids) client writes to a variable.
    pub fn set_writable(&self, node_id: &NodeId, writable: bool) -> UaResult<()> {
        let mut node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| UaError::node_not_found(node_id.to_string()))?;
        match &mut node.kind {
            NodeKind::Variable { writable: w, .. } => {
                *w = writable;
                Ok(())
            }
            _ => Err(OperationError::wrong_node_class(node_id.to_string(), "Variable").into()),
        }
    }

    fn insert(
        &self,
        parent: &NodeId,
        node_id: NodeId,
        browse_name: &str,
        kind: NodeKind,
    ) -> UaResult<NodeId> {
        match self.nodes.get(parent) {
            None => return Err(UaError::node_not_found(parent.to_string())),
            Some(p) if p.class() != NodeClass::Object => {
                return Err(OperationError::wrong_node_class(parent.to_string(), "Object").into())
            }
            Some(_) => {}
        }

        match self.nodes.entry(node_id.clone()) {
            Entry::Occupied(_) => return Err(OperationError::node_exists(node_id.to_string()).into()),
            Entry::Vacant(slot) => {
                slot.insert(Node {
                    browse_name: QualifiedName::new(node_id.namespace_index, browse_name),
                    parent: Some(parent.clone()),
                    children: Vec::new(),
                    kind,
                });
            }
        }

        if let Some(mut p) = self.nodes.get_mut(parent) {
            p.children.push(node_id.clone());
        }
        debug!(node_id = %node_id, parent = %parent, browse_name = browse_name, "Added node");
        Ok(node_id)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Returns `true` if the node exists.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Returns the number of nodes, including the Objects folder.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if only the Objects folder exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Returns metadata for a node.
    pub fn node_info(&self, node_id: &NodeId) -> UaResult<NodeInfo> {
        self.nodes
            .get(node_id)
            .map(|node| node.info(node_id))
            .ok_or_else(|| UaError::node_not_found(node_id.to_string()))
    }

    /// Returns the components of a node, in creation order.
    pub fn children(&self, node_id: &NodeId) -> UaResult<Vec<NodeInfo>> {
        let children = self
            .nodes
            .get(node_id)
            .map(|node| node.children.clone())
            .ok_or_else(|| UaError::node_not_found(node_id.to_string()))?;

        Ok(children
            .iter()
            .filter_map(|child| self.nodes.get(child).map(|node| node.info(child)))
            .collect())
    }

    // -------------------------------------------------------------------------
    // Values
    // -------------------------------------------------------------------------

    /// Reads the current value of a variable.
    pub fn read_value(&self, node_id: &NodeId) -> UaResult<DataValue> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| UaError::node_not_found(node_id.to_string()))?;
        match &node.kind {
            NodeKind::Variable { value, .. } => Ok(value.clone()),
            _ => Err(OperationError::wrong_node_class(node_id.to_string(), "Variable").into()),
        }
    }

    /// Writes a variable on behalf of a client.
    ///
    /// # Errors
    ///
    /// - `BadNodeIdUnknown` if the node does not exist
    /// - `BadNodeClassInvalid` if it is not a variable
    /// - `BadNotWritable` if the variable is not writable
    /// - `BadTypeMismatch` if `value` has a different data type
    pub fn write_value(&self, node_id: &NodeId, value: Value) -> UaResult<DataValue> {
        self.write(node_id, value, true)
    }

    /// Writes a variable on behalf of the server, ignoring the writable flag.
    pub fn set_value(&self, node_id: &NodeId, value: Value) -> UaResult<DataValue> {
        self.write(node_id, value, false)
    }

    fn write(&self, node_id: &NodeId, value: Value, check_access: bool) -> UaResult<DataValue> {
        let mut node = self
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| UaError::node_not_found(node_id.to_string()))?;
        match &mut node.kind {
            NodeKind::Variable {
                value: current,
                data_type,
                writable,
            } => {
                if check_access && !*writable {
                    return Err(OperationError::not_writable(node_id.to_string()).into());
                }
                if value.data_type() != *data_type {
                    return Err(UaError::type_mismatch(
                        node_id.to_string(),
                        *data_type,
                        value.data_type(),
                    ));
                }
                *current = DataValue::now(value);
                Ok(current.clone())
            }
            _ => Err(OperationError::wrong_node_class(node_id.to_string(), "Variable").into()),
        }
    }

    // -------------------------------------------------------------------------
    // Methods
    // -------------------------------------------------------------------------

    /// Calls `method` on `object` with `args`.
    ///
    /// The method must be a component of the object, and the arguments must
    /// match the declared inputs in count and data type.
    pub fn call_method(&self, object: &NodeId, method: &NodeId, args: &[Value]) -> UaResult<Vec<Value>> {
        {
            let parent = self
                .nodes
                .get(object)
                .ok_or_else(|| UaError::node_not_found(object.to_string()))?;
            if parent.class() != NodeClass::Object {
                return Err(OperationError::wrong_node_class(object.to_string(), "Object").into());
            }
            if !parent.children.contains(method) {
                return Err(OperationError::method_invalid(object.to_string(), method.to_string()).into());
            }
        }

        let (handler, inputs, outputs) = {
            let node = self
                .nodes
                .get(method)
                .ok_or_else(|| UaError::node_not_found(method.to_string()))?;
            match &node.kind {
                NodeKind::Method {
                    handler,
                    inputs,
                    outputs,
                } => (handler.clone(), inputs.clone(), outputs.clone()),
                _ => {
                    return Err(
                        OperationError::method_invalid(object.to_string(), method.to_string()).into(),
                    )
                }
            }
        };

        if args.len() != inputs.len() {
            return Err(OperationError::ArgumentCount {
                method: method.to_string(),
                expected: inputs.len(),
                actual: args.len(),
            }
            .into());
        }
        for (arg, def) in args.iter().zip(&inputs) {
            if arg.data_type() != def.data_type {
                return Err(OperationError::InvalidArgument {
                    method: method.to_string(),
                    name: def.name.clone(),
                    expected: def.data_type,
                    actual: arg.data_type(),
                }
                .into());
            }
        }

        let results = handler(args)?;
        if results.len() != outputs.len() {
            return Err(OperationError::InvalidOutput {
                method: method.to_string(),
                message: format!("expected {} values, got {}", outputs.len(), results.len()),
            }
            .into());
        }
        if let Some((value, def)) = results
            .iter()
            .zip(&outputs)
            .find(|(value, def)| value.data_type() != def.data_type)
        {
            return Err(OperationError::InvalidOutput {
                method: method.to_string(),
                message: format!("'{}' expected {}, got {}", def.name, def.data_type, value.data_type()),
            }
            .into());
        }
        Ok(results)
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddressSpace")
            .field("namespaces", &*self.namespaces.read())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
