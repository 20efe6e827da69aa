//! Earth Engine expression graphs
//!
//! The REST API takes computations as a graph of value nodes. Nodes are
//! nested inline except function bodies, which must live in the top-level
//! `values` table and are referenced by key.

use serde_json::{json, Map, Value};

/// A constant node
pub fn constant(value: impl Into<Value>) -> Value {
    json!({ "constantValue": value.into() })
}

/// A call to a server-side algorithm
pub fn invoke(function: &str, arguments: Vec<(&str, Value)>) -> Value {
    let arguments: Map<String, Value> = arguments
        .into_iter()
        .map(|(name, node)| (name.to_string(), node))
        .collect();
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

/// A list of nodes
pub fn array(nodes: Vec<Value>) -> Value {
    json!({ "arrayValue": { "values": nodes } })
}

/// Reference to an argument of the enclosing function definition
pub fn argument(name: &str) -> Value {
    json!({ "argumentReference": name })
}

/// Graph under construction
#[derive(Debug, Default)]
pub struct Expression {
    values: Map<String, Value>,
}

impl Expression {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node in the values table and return its key
    pub fn add(&mut self, node: Value) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        key
    }

    /// A function of `parameters` whose body is `body`
    pub fn function(&mut self, parameters: &[&str], body: Value) -> Value {
        let body = self.add(body);
        json!({
            "functionDefinitionValue": {
                "argumentNames": parameters,
                "body": body,
            }
        })
    }

    /// Finish the graph with `root` as its result
    pub fn finish(mut self, root: Value) -> Value {
        let result = self.add(root);
        json!({ "result": result, "values": Value::Object(self.values) })
    }
}

pub fn load_image(asset_id: &str) -> Value {
    invoke("Image.load", vec![("id", constant(asset_id))])
}

pub fn load_table(asset_id: &str) -> Value {
    invoke("Collection.loadTable", vec![("tableId", constant(asset_id))])
}
