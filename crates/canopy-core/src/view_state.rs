//! Per-session transient UI state, keyed by view instantiation.
//!
//! The node tree never changes; interaction state (the current carousel
//! page, a web view's load error) lives here instead. Entries are keyed by
//! [`ViewId`] so the same node rendered inside several collection items
//! keeps separate state for each instance.

use canopy_dsl::NodeId;
use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Identity of one rendered instance of a node.
///
/// Inside nested collections the innermost item index is
/// `collection_index` and the indexes of the enclosing items are kept in
/// `outer_indexes`, outermost first, so every instance has its own id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewId {
    /// Id of the node in the document
    pub node_id: NodeId,
    /// Index of the innermost enclosing collection item, if any
    pub collection_index: Option<usize>,
    /// Item indexes of the collections around the innermost one
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outer_indexes: Vec<usize>,
}

impl ViewId {
    /// Create a view id
    pub fn new(node_id: impl Into<NodeId>, collection_index: Option<usize>) -> Self {
        Self {
            node_id: node_id.into(),
            collection_index,
            outer_indexes: Vec::new(),
        }
    }

    /// A view id outside any collection
    pub fn root(node_id: impl Into<NodeId>) -> Self {
        Self::new(node_id, None)
    }

    /// A view id from the item indexes of every enclosing collection,
    /// outermost first
    pub fn at_path(node_id: impl Into<NodeId>, item_path: &[usize]) -> Self {
        match item_path.split_last() {
            Some((index, outer)) => Self {
                node_id: node_id.into(),
                collection_index: Some(*index),
                outer_indexes: outer.to_vec(),
            },
            None => Self::root(node_id),
        }
    }

    /// Item indexes of every enclosing collection, outermost first
    pub fn item_path(&self) -> Vec<usize> {
        let mut path = self.outer_indexes.clone();
        path.extend(self.collection_index);
        path
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.item_path();
        if path.is_empty() {
            return write!(f, "{}", self.node_id);
        }
        let indexes: Vec<String> = path.iter().map(usize::to_string).collect();
        write!(f, "{}#{}", self.node_id, indexes.join("."))
    }
}

impl FromStr for ViewId {
    type Err = String;

    /// Parse the display form: `node`, `node#index` or `node#outer.index`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('#') {
            Some((node, indexes)) if !node.is_empty() => {
                let path = indexes
                    .split('.')
                    .map(|index| index.parse::<usize>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| format!("invalid collection index in view id '{}'", s))?;
                Ok(ViewId::at_path(node, &path))
            }
            _ if s.is_empty() || s.starts_with('#') => Err(format!("invalid view id '{}'", s)),
            _ => Ok(ViewId::root(s)),
        }
    }
}

/// A kind of state that can be kept in a [`ViewStateStore`].
///
/// `Default` supplies the value returned for views that were never set.
pub trait ViewState: Any + Clone + Default + Send + Sync {}

/// Current page of a carousel instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CarouselPage(pub usize);

impl ViewState for CarouselPage {}

/// Outcome of the last load of a web view instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebLoadState {
    /// Message of the last failed load, cleared when a load finishes
    pub error: Option<String>,
}

impl ViewState for WebLoadState {}

/// Mapping from view id to per-view state, partitioned by state type.
///
/// Owned by a single render session. No internal locking: the session
/// serializes reads and writes.
#[derive(Default)]
pub struct ViewStateStore {
    entries: HashMap<TypeId, HashMap<ViewId, Box<dyn Any + Send + Sync>>>,
}

impl ViewStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a view, or the type's default when absent
    pub fn get<S: ViewState>(&self, view_id: &ViewId) -> S {
        self.entries
            .get(&TypeId::of::<S>())
            .and_then(|views| views.get(view_id))
            .and_then(|state| state.downcast_ref::<S>())
            .cloned()
            .unwrap_or_default()
    }

    /// Insert or replace the state of a view
    pub fn set<S: ViewState>(&mut self, view_id: ViewId, state: S) {
        debug!("Setting {} state for view {}", std::any::type_name::<S>(), view_id);
        self.entries
            .entry(TypeId::of::<S>())
            .or_default()
            .insert(view_id, Box::new(state));
    }

    /// Remove the state of a view, returning it if it was set
    pub fn remove<S: ViewState>(&mut self, view_id: &ViewId) -> Option<S> {
        let state = self.entries.get_mut(&TypeId::of::<S>())?.remove(view_id)?;
        state.downcast::<S>().ok().map(|boxed| *boxed)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries across all state types
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current page of a carousel instance (0 when never set)
    pub fn current_page(&self, view_id: &ViewId) -> usize {
        self.get::<CarouselPage>(view_id).0
    }

    /// Record the current page of a carousel instance
    pub fn set_current_page(&mut self, view_id: ViewId, page: usize) {
        self.set(view_id, CarouselPage(page));
    }
}

impl fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("entries", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_view_returns_default() {
        let store = ViewStateStore::new();
        assert_eq!(store.current_page(&ViewId::root("carousel")), 0);
        assert_eq!(store.get::<WebLoadState>(&ViewId::root("web")), WebLoadState::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_then_get() {
        let mut store = ViewStateStore::new();
        let view = ViewId::root("carousel");

        store.set_current_page(view.clone(), 2);
        assert_eq!(store.current_page(&view), 2);

        store.set_current_page(view.clone(), 0);
        assert_eq!(store.current_page(&view), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_collection_index_disambiguates_instances() {
        let mut store = ViewStateStore::new();
        store.set_current_page(ViewId::new("carousel", Some(2)), 3);

        assert_eq!(store.current_page(&ViewId::new("carousel", Some(2))), 3);
        assert_eq!(store.current_page(&ViewId::new("carousel", Some(1))), 0);
        assert_eq!(store.current_page(&ViewId::root("carousel")), 0);
    }

    #[test]
    fn test_state_types_are_kept_apart() {
        let mut store = ViewStateStore::new();
        let view = ViewId::root("shared");

        store.set_current_page(view.clone(), 1);
        store.set(view.clone(), WebLoadState { error: Some("offline".to_string()) });

        assert_eq!(store.current_page(&view), 1);
        assert_eq!(store.get::<WebLoadState>(&view).error.as_deref(), Some("offline"));
        assert_eq!(store.len(), 2);

        assert_eq!(store.remove::<CarouselPage>(&view), Some(CarouselPage(1)));
        assert_eq!(store.current_page(&view), 0);
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_view_id_display() {
        assert_eq!(ViewId::root("a").to_string(), "a");
        assert_eq!(ViewId::new("a", Some(4)).to_string(), "a#4");
        assert_eq!(ViewId::at_path("a", &[1, 0]).to_string(), "a#1.0");
    }

    #[test]
    fn test_nested_instances_are_distinct() {
        let inner = ViewId::at_path("cell", &[1, 0]);
        assert_eq!(inner.collection_index, Some(0));
        assert_eq!(inner.outer_indexes, vec![1]);
        assert_eq!(inner.item_path(), vec![1, 0]);
        assert_ne!(inner, ViewId::at_path("cell", &[0, 0]));
        assert_ne!(inner, ViewId::new("cell", Some(0)));
        assert_eq!(ViewId::at_path("cell", &[2]), ViewId::new("cell", Some(2)));
        assert_eq!(ViewId::at_path("cell", &[]), ViewId::root("cell"));

        let mut store = ViewStateStore::new();
        store.set_current_page(inner.clone(), 2);
        assert_eq!(store.current_page(&inner), 2);
        assert_eq!(store.current_page(&ViewId::at_path("cell", &[0, 0])), 0);
    }

    #[test]
    fn test_view_id_parse() {
        assert_eq!("a".parse::<ViewId>(), Ok(ViewId::root("a")));
        assert_eq!("a#4".parse::<ViewId>(), Ok(ViewId::new("a", Some(4))));
        assert_eq!("a#1.0".parse::<ViewId>(), Ok(ViewId::at_path("a", &[1, 0])));
        assert!("a#1.".parse::<ViewId>().is_err());
        assert!("a#x".parse::<ViewId>().is_err());
        assert!("#1".parse::<ViewId>().is_err());
        assert!("".parse::<ViewId>().is_err());
    }
}
