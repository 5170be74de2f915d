use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::DslError;
use crate::node::{Modifiers, Node, NodeId, NodeKind, NodeType, TYPE_FIELD};

/// A child that failed to decode and was left out of the tree
#[derive(Debug)]
pub struct DecodeDiagnostic {
    /// Location of the failed node, e.g. `$.children[1].children[0]`
    pub path: String,
    /// Why it failed
    pub error: DslError,
}

/// A decoded screen document
#[derive(Debug)]
pub struct ScreenDocument {
    /// Root of the node tree
    pub root: Node,
    /// Subtrees dropped during decoding; their siblings were kept
    pub diagnostics: Vec<DecodeDiagnostic>,
}

impl ScreenDocument {
    /// Whether every node in the source decoded cleanly
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Find a node anywhere in the document
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        self.root.find(id)
    }
}

/// Decode a JSON string into a screen document
pub fn decode_json(json_str: &str) -> Result<ScreenDocument, DslError> {
    let raw: Value = serde_json::from_str(json_str)?;
    decode_value(&raw)
}

/// Decode a YAML string into a screen document
pub fn decode_yaml(yaml_str: &str) -> Result<ScreenDocument, DslError> {
    let raw: Value = serde_yaml::from_str(yaml_str)?;
    decode_value(&raw)
}

/// Decode an already-parsed record into a screen document.
///
/// Only the root is required to decode; a malformed descendant is dropped
/// with a diagnostic and its siblings are kept.
pub fn decode_value(raw: &Value) -> Result<ScreenDocument, DslError> {
    let mut diagnostics = Vec::new();
    let root = decode_node(raw, "$", &mut diagnostics)?;

    debug!(
        "Decoded screen document: {} nodes, {} dropped subtrees",
        root.count(),
        diagnostics.len()
    );

    Ok(ScreenDocument { root, diagnostics })
}

/// Decode a single node record and, leniently, its children
pub fn decode_node(
    raw: &Value,
    path: &str,
    diagnostics: &mut Vec<DecodeDiagnostic>,
) -> Result<Node, DslError> {
    let record = raw.as_object().ok_or_else(|| DslError::InvalidField {
        field: "<node>".to_string(),
        path: path.to_string(),
        reason: "expected an object".to_string(),
    })?;

    let type_name = required_str(record, TYPE_FIELD, path)?;
    let node_type = NodeType::from_type_name(type_name).ok_or_else(|| DslError::UnknownNodeType {
        type_name: type_name.to_string(),
        path: path.to_string(),
    })?;

    let id = required_str(record, "id", path)?;
    let name = optional_str(record, "name", path)?;
    let kind = NodeKind::decode(node_type, raw, path)?;
    let modifiers = Modifiers::extract(record);

    let children = match record.get("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => decode_children(items, path, diagnostics),
        Some(_) => {
            return Err(DslError::InvalidField {
                field: "children".to_string(),
                path: path.to_string(),
                reason: "expected an array".to_string(),
            })
        }
    };

    Ok(Node {
        id: NodeId(id.to_string()),
        name: name.map(str::to_string),
        kind,
        children,
        modifiers,
    })
}

fn decode_children(
    items: &[Value],
    parent_path: &str,
    diagnostics: &mut Vec<DecodeDiagnostic>,
) -> Vec<Node> {
    let mut children = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let path = format!("{}.children[{}]", parent_path, i);
        match decode_node(item, &path, diagnostics) {
            Ok(child) => children.push(child),
            Err(error) => {
                warn!("Dropping undecodable node at {}: {}", path, error);
                diagnostics.push(DecodeDiagnostic { path, error });
            }
        }
    }

    children
}

fn required_str<'a>(record: &'a Map<String, Value>, field: &str, path: &str) -> Result<&'a str, DslError> {
    match record.get(field) {
        None | Some(Value::Null) => Err(DslError::MissingField {
            field: field.to_string(),
            path: path.to_string(),
        }),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(DslError::InvalidField {
            field: field.to_string(),
            path: path.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn optional_str<'a>(record: &'a Map<String, Value>, field: &str, path: &str) -> Result<Option<&'a str>, DslError> {
    match record.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(DslError::InvalidField {
            field: field.to_string(),
            path: path.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}
