//!
//! Canopy Core - evaluation engine of the Canopy renderer
//!
//! Turns a decoded screen document into a resolved render tree: threads
//! data scopes through the tree, resolves expression templates, iterates
//! collections, fetches data sources through a host-supplied transport and
//! keeps per-instance interaction state across render passes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Collection iteration
pub mod collection;

/// Condition predicates and value ordering
pub mod condition;

/// Error types
pub mod error;

/// Expression templates and key paths
pub mod expression;

/// Data source fetching and stale-result suppression
pub mod fetch;

/// Resolved render tree and the host renderer interface
pub mod render;

/// Evaluation context
pub mod scope;

/// Render sessions
pub mod session;

/// Per-instance interaction state
pub mod view_state;

pub use collection::{items, Item};
pub use condition::{evaluate_all, evaluate_condition};
pub use error::{CoreError, FetchError};
pub use expression::{has_markers, resolve, resolve_value, Helper};
pub use fetch::{
    DataSourceFetcher, FetchCompletion, FetchCoordinator, FetchState, HttpRequest, HttpResponse, HttpTransport,
    TransportError,
};
pub use render::{fold_tree, HostRenderer, NodeStatus, RenderNode, RenderTree, ResolvedProperties};
pub use scope::{DataScope, UrlParameters, UserInfo};
pub use session::{Interaction, RedrawSink, RenderSession, SessionConfig};
pub use view_state::{CarouselPage, ViewId, ViewState, ViewStateStore, WebLoadState};

/// Returns a version string for the Canopy core crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
