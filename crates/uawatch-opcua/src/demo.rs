// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The demo `Device` address space.
//!
//! | Node              | Browse name      | Type     | Initial          |
//! |-------------------|------------------|----------|------------------|
//! | `status`          | Status           | Boolean  | `false`          |
//! | `counter`         | Counter          | Int32    | `0`              |
//! | `temperature`     | Temperature      | Float    | `22.5`           |
//! | `message`         | Message          | String   | `"Hello OPC UA"` |
//! | `timestamp`       | Timestamp        | DateTime | now              |
//! | `increment_value` | IncrementValue() | method   | `value + 1`      |
//!
//! All nodes use string identifiers in the server namespace, so the node id
//! of `temperature` is `ns=<idx>;s=temperature`.

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::info;
use uawatch_core::{DataType, NodeId, Value};

use crate::address_space::{AddressSpace, Argument};
use crate::error::{OperationError, UaResult};

/// Identifier of the device folder.
pub const DEVICE_FOLDER: &str = "Device";

/// Identifier of the increment method.
pub const INCREMENT_METHOD: &str = "increment_value";

/// Browse name of the increment method.
pub const INCREMENT_METHOD_BROWSE_NAME: &str = "IncrementValue";

/// Demo variables: identifier and browse name.
pub const DEMO_VARIABLES: [(&str, &str); 5] = [
    ("status", "Status"),
    ("counter", "Counter"),
    ("temperature", "Temperature"),
    ("message", "Message"),
    ("timestamp", "Timestamp"),
];

/// Node ids created by [`build_demo_address_space`].
#[derive(Debug, Clone)]
pub struct DemoNodes {
    /// Server namespace index.
    pub namespace_index: u16,
    /// The `Device` folder.
    pub device: NodeId,
    /// Variables by identifier.
    pub variables: BTreeMap<String, NodeId>,
    /// The `increment_value` method.
    pub increment_value: NodeId,
}

impl DemoNodes {
    /// Returns the node id of a demo variable.
    pub fn variable(&self, name: &str) -> Option<&NodeId> {
        self.variables.get(name)
    }
}

fn initial_value(name: &str) -> Value {
    match name {
        "status" => Value::Boolean(false),
        "counter" => Value::Int32(0),
        "temperature" => Value::Float(22.5),
        "message" => Value::from("Hello OPC UA"),
        _ => Value::DateTime(Utc::now()),
    }
}

/// Builds the `Device` folder with its variables and method in namespace `ns`.
pub fn build_demo_address_space(space: &AddressSpace, ns: u16) -> UaResult<DemoNodes> {
    let device = space.add_folder(&NodeId::OBJECTS_FOLDER, NodeId::string(ns, DEVICE_FOLDER), DEVICE_FOLDER)?;
    info!("Created Device folder");

    let mut variables = BTreeMap::new();
    for (name, browse_name) in DEMO_VARIABLES {
        let initial = initial_value(name);
        let data_type = initial.data_type();
        let node = space.add_variable(&device, NodeId::string(ns, name), browse_name, initial)?;
        space.set_writable(&node, true)?;
        info!(node_id = %node, "Added variable: {} ({})", name, data_type);
        variables.insert(name.to_string(), node);
    }

    let method = space.add_method(
        &device,
        NodeId::string(ns, INCREMENT_METHOD),
        INCREMENT_METHOD_BROWSE_NAME,
        vec![Argument::new("value", DataType::Int32, "Value to increment")],
        vec![Argument::new("result", DataType::Int32, "Incremented value")],
        increment_value,
    )?;
    info!("Added method: {}", INCREMENT_METHOD_BROWSE_NAME);

    Ok(DemoNodes {
        namespace_index: ns,
        device,
        variables,
        increment_value: method,
    })
}

/// `IncrementValue(value: Int32) -> result: Int32`.
///
/// Arguments are already validated by the address space.
pub fn increment_value(args: &[Value]) -> UaResult<Vec<Value>> {
    let value = args
        .first()
        .and_then(Value::as_i32)
        .ok_or_else(|| OperationError::InvalidArgument {
            method: INCREMENT_METHOD.to_string(),
            name: "value".to_string(),
            expected: DataType::Int32,
            actual: args.first().map(Value::data_type).unwrap_or(DataType::Int32),
        })?;
    let result = value
        .checked_add(1)
        .ok_or_else(|| OperationError::out_of_range(INCREMENT_METHOD, format!("{} + 1 overflows Int32", value)))?;
    info!("Method called: {}({}) -> {}", INCREMENT_METHOD_BROWSE_NAME, value, result);
    Ok(vec![Value::Int32(result)])
}
