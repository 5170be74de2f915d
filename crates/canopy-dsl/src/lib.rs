//! # Canopy DSL
//!
//! The screen document format of the Canopy renderer. A document is a tree
//! of self-describing node records; the `__typeName` field of each record
//! selects the node variant.
//!
//! ## Features
//!
//! * JSON and YAML documents
//! * Closed set of node variants with capability queries
//! * Lenient decoding: a malformed node only loses its own subtree
//! * Document validation (unique ids, screen placement, collection limits)
//!
//! ## Example
//!
//! ```
//! use canopy_dsl::{decode_json, NodeType};
//!
//! let json = r#"{
//!     "__typeName": "Screen",
//!     "id": "root",
//!     "children": [
//!         {"__typeName": "Text", "id": "title", "text": "Hello {{user.name}}"}
//!     ]
//! }"#;
//!
//! let document = decode_json(json).unwrap();
//! assert_eq!(document.root.children[0].node_type(), NodeType::Text);
//! ```

mod error;
mod parser;

pub mod node;
pub mod validation;

pub use error::DslError;
pub use node::{
    Carousel, Collection, Condition, Conditional, DataSource, Header, HttpMethod, Image, Limit,
    Modifiers, Node, NodeId, NodeKind, NodeType, Predicate, Rectangle, ScrollView,
    SortDescriptor, Stack, Text, WebView,
};
pub use parser::{decode_json, decode_node, decode_value, decode_yaml, DecodeDiagnostic, ScreenDocument};
pub use validation::validate_document;

/// Decode a JSON document and validate it.
///
/// # Errors
///
/// Fails when the root cannot be decoded or when validation finds
/// duplicate ids or misplaced nodes. Dropped descendants are reported in
/// [`ScreenDocument::diagnostics`], not as errors.
///
/// ```
/// use canopy_dsl::decode_and_validate_json;
///
/// let json = r#"{
///     "__typeName": "Screen",
///     "id": "root",
///     "children": [
///         {"__typeName": "Spacer", "id": "same"},
///         {"__typeName": "Divider", "id": "same"}
///     ]
/// }"#;
///
/// let error = decode_and_validate_json(json).unwrap_err();
/// assert_eq!(error.error_code(), "ERR_DSL_DUPLICATE_ID");
/// ```
pub fn decode_and_validate_json(json_str: &str) -> Result<ScreenDocument, DslError> {
    let document = decode_json(json_str)?;
    validate_document(&document)?;
    Ok(document)
}

/// YAML counterpart of [`decode_and_validate_json`]
pub fn decode_and_validate_yaml(yaml_str: &str) -> Result<ScreenDocument, DslError> {
    let document = decode_yaml(yaml_str)?;
    validate_document(&document)?;
    Ok(document)
}

/// Returns a version string for the Canopy DSL crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
