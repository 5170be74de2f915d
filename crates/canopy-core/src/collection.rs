//! Collection iteration: array in the scope -> filtered, sorted, limited items.

use canopy_dsl::Collection;
use serde_json::Value;
use std::cmp::Ordering;

use crate::condition::{compare_values, evaluate_all};
use crate::expression::resolve_value;
use crate::scope::DataScope;

/// One element of an iterated collection, as the scope of its subtree
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Position in the produced sequence
    pub index: usize,
    /// The parent scope with `data` replaced by the element
    pub scope: DataScope,
}

/// Produce the items of a collection.
///
/// Applies the filters, then the sort descriptors (stable), then the limit.
/// If the key path does not select an array the result is empty; this is
/// the normal state before a fetch completes. The output depends only on
/// the inputs, so it is safe to regenerate on every render pass.
pub fn items(collection: &Collection, scope: &DataScope) -> Vec<Item> {
    let elements = match resolve_value(&collection.key_path, scope) {
        Some(Value::Array(elements)) => elements,
        _ => return Vec::new(),
    };

    let mut kept: Vec<DataScope> = elements
        .into_iter()
        .map(|element| scope.with_data(element))
        .filter(|item| evaluate_all(&collection.filters, item))
        .collect();

    if !collection.sort_descriptors.is_empty() {
        let mut keyed: Vec<(Vec<Option<Value>>, DataScope)> = kept
            .into_iter()
            .map(|item| {
                let keys = collection
                    .sort_descriptors
                    .iter()
                    .map(|d| resolve_value(&d.key_path, &item))
                    .collect();
                (keys, item)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            for (descriptor, (x, y)) in collection.sort_descriptors.iter().zip(a.iter().zip(b.iter())) {
                let ordering = compare_values(x.as_ref(), y.as_ref());
                let ordering = if descriptor.ascending { ordering } else { ordering.reverse() };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        kept = keyed.into_iter().map(|(_, item)| item).collect();
    }

    let window: Box<dyn Iterator<Item = DataScope>> = match collection.limit {
        Some(limit) => Box::new(kept.into_iter().skip(limit.start_at.saturating_sub(1)).take(limit.show)),
        None => Box::new(kept.into_iter()),
    };

    window
        .enumerate()
        .map(|(index, scope)| Item { index, scope })
        .collect()
}
