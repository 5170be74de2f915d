use std::collections::HashSet;

use crate::error::DslError;
use crate::node::{Node, NodeKind};
use crate::parser::ScreenDocument;

/// Validate a decoded document.
///
/// Checks that node ids are unique, that only the root is a `Screen`, and
/// that collection limits are 1-based. All problems are collected before
/// returning.
pub fn validate_document(document: &ScreenDocument) -> Result<(), DslError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    document.root.walk(&mut |node| {
        if !seen.insert(node.id.clone()) {
            errors.push(DslError::DuplicateId(node.id.to_string()));
        }
        check_node(node, &mut errors);
    });

    for child in &document.root.children {
        child.walk(&mut |node| {
            if matches!(node.kind, NodeKind::Screen) {
                errors.push(DslError::InvalidField {
                    field: "__typeName".to_string(),
                    path: node.id.to_string(),
                    reason: "Screen is only allowed at the root".to_string(),
                });
            }
        });
    }

    match DslError::from_validation_errors(errors) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn check_node(node: &Node, errors: &mut Vec<DslError>) {
    if let Some(limit) = node.as_collection().and_then(|c| c.limit) {
        if limit.start_at == 0 {
            errors.push(DslError::InvalidField {
                field: "limit.startAt".to_string(),
                path: node.id.to_string(),
                reason: "startAt is 1-based".to_string(),
            });
        }
    }
}
