//! Render sessions.
//!
//! A [`RenderSession`] is the single owner of everything mutable about one
//! displayed screen: the view state store, the fetch coordinator and the
//! base scope. Evaluation happens synchronously in [`RenderSession::render`];
//! fetches run on the tokio runtime and report back over a channel, which
//! the host drains with [`RenderSession::next_update`] or
//! [`RenderSession::drain_updates`]. All mutation goes through `&mut self`,
//! so the session is its own sequencing point.

mod evaluate;

use canopy_dsl::{Header, NodeId, ScreenDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::CoreError;
use crate::fetch::{DataSourceFetcher, FetchCompletion, FetchCoordinator, FetchState, HttpTransport};
use crate::render::{RenderNode, RenderTree};
use crate::scope::DataScope;
use crate::view_state::{ViewId, ViewStateStore, WebLoadState};
use evaluate::Evaluator;

/// Engine settings for a render session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Log properties whose templates do not resolve (at debug level)
    #[serde(default = "default_log_resolution_misses")]
    pub log_resolution_misses: bool,

    /// Headers appended to every data source request after its own
    #[serde(default)]
    pub default_headers: Vec<Header>,
}

fn default_log_resolution_misses() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_resolution_misses: default_log_resolution_misses(),
            default_headers: Vec::new(),
        }
    }
}

/// Redraw trigger supplied by the host.
///
/// Called once per published change with the instance whose subtree must
/// be re-rendered.
#[cfg_attr(test, mockall::automock)]
pub trait RedrawSink: Send {
    /// The subtree rooted at `view_id` is stale
    fn invalidate(&self, view_id: &ViewId);
}

/// Host notifications about user-driven or platform-driven changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// A carousel was swiped to a page
    PageChanged {
        /// Carousel instance
        view_id: ViewId,
        /// New page index
        page: usize,
    },
    /// A web view finished loading
    LoadFinished {
        /// Web view instance
        view_id: ViewId,
    },
    /// A web view failed to load
    LoadFailed {
        /// Web view instance
        view_id: ViewId,
        /// Platform error message
        message: String,
    },
}

/// Evaluation state of one displayed screen
pub struct RenderSession {
    document: ScreenDocument,
    scope: DataScope,
    view_state: ViewStateStore,
    fetches: FetchCoordinator,
    completions: mpsc::UnboundedReceiver<FetchCompletion>,
    redraw: Option<Box<dyn RedrawSink>>,
    config: SessionConfig,
}

impl RenderSession {
    /// Start a session with the default configuration
    pub fn new(document: ScreenDocument, transport: Arc<dyn HttpTransport>, scope: DataScope) -> Self {
        Self::with_config(document, transport, scope, SessionConfig::default())
    }

    /// Start a session
    pub fn with_config(
        document: ScreenDocument,
        transport: Arc<dyn HttpTransport>,
        scope: DataScope,
        config: SessionConfig,
    ) -> Self {
        let fetcher = DataSourceFetcher::new(transport).with_default_headers(config.default_headers.clone());
        let (fetches, completions) = FetchCoordinator::new(fetcher);

        info!(
            "Render session started for screen {} ({} nodes)",
            document.root.id,
            document.root.count()
        );

        Self {
            document,
            scope,
            view_state: ViewStateStore::new(),
            fetches,
            completions,
            redraw: None,
            config,
        }
    }

    /// Install the host's redraw trigger
    pub fn set_redraw_sink(&mut self, sink: Box<dyn RedrawSink>) {
        self.redraw = Some(sink);
    }

    /// The rendered document
    pub fn document(&self) -> &ScreenDocument {
        &self.document
    }

    /// The base scope of the screen
    pub fn scope(&self) -> &DataScope {
        &self.scope
    }

    /// Replace the base scope; the next render refetches whatever changed
    pub fn set_scope(&mut self, scope: DataScope) {
        self.scope = scope;
    }

    /// Interaction state of the session
    pub fn view_state(&self) -> &ViewStateStore {
        &self.view_state
    }

    /// Fetch state of a data source instance
    pub fn fetch_state(&self, view_id: &ViewId) -> Option<&FetchState> {
        self.fetches.state(view_id)
    }

    /// Number of data source instances waiting for their latest fetch
    pub fn pending_fetches(&self) -> usize {
        self.fetches.in_flight_count()
    }

    /// Number of data source instances tracked since the last full render
    pub fn tracked_data_sources(&self) -> usize {
        self.fetches.len()
    }

    /// Evaluate the whole document against the base scope.
    ///
    /// Starts fetches for data source instances whose resolved request
    /// changed. Instances the pass no longer reaches are dropped, and their
    /// in-flight results are discarded unpublished. Requires a tokio
    /// runtime for fetches to start.
    pub fn render(&mut self) -> RenderTree {
        self.fetches.begin_pass();
        let root = Evaluator {
            view_state: &self.view_state,
            fetches: &mut self.fetches,
            config: &self.config,
        }
        .evaluate(&self.document.root, &self.scope, &[]);
        self.fetches.end_pass();

        RenderTree { root }
    }

    /// Re-evaluate only the subtree of a data source instance, using the
    /// scope it was last rendered with.
    pub fn render_subtree(&mut self, view_id: &ViewId) -> Result<RenderNode, CoreError> {
        let node = self
            .document
            .find(&view_id.node_id)
            .ok_or_else(|| CoreError::NodeNotFound(view_id.node_id.to_string()))?;
        let scope = self
            .fetches
            .scope_of(view_id)
            .cloned()
            .ok_or_else(|| CoreError::ViewNotFound(view_id.to_string()))?;

        Ok(Evaluator {
            view_state: &self.view_state,
            fetches: &mut self.fetches,
            config: &self.config,
        }
        .evaluate(node, &scope, &view_id.item_path()))
    }

    /// Wait for the next fetch result that is still current and publish it.
    ///
    /// Superseded results are discarded along the way. Returns `None` at
    /// once when no fetch is in flight.
    pub async fn next_update(&mut self) -> Option<ViewId> {
        while self.fetches.in_flight_count() > 0 {
            let completion = self.completions.recv().await?;
            if let Some(view_id) = self.fetches.apply(completion) {
                self.notify(&view_id);
                return Some(view_id);
            }
        }
        None
    }

    /// Publish every result that has already arrived, without waiting
    pub fn drain_updates(&mut self) -> Vec<ViewId> {
        let mut updated = Vec::new();
        while let Ok(completion) = self.completions.try_recv() {
            if let Some(view_id) = self.fetches.apply(completion) {
                self.notify(&view_id);
                updated.push(view_id);
            }
        }
        updated
    }

    /// Render repeatedly until no fetch is in flight.
    ///
    /// Nested data sources only start once their parent's payload is
    /// published, so every update is followed by another render pass.
    pub async fn settle(&mut self, timeout: Duration) -> Result<RenderTree, CoreError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let tree = self.render();
            let pending = self.fetches.in_flight_count();
            if pending == 0 {
                info!("Render session settled ({} rendered nodes)", tree.root.count());
                return Ok(tree);
            }

            debug!("Waiting for {} in-flight fetches", pending);
            if tokio::time::timeout_at(deadline, self.next_update()).await.is_err() {
                return Err(CoreError::SettleTimeout(self.fetches.in_flight_count()));
            }
        }
    }

    /// Apply a host notification
    pub fn handle_interaction(&mut self, interaction: Interaction) {
        match interaction {
            Interaction::PageChanged { view_id, page } => self.page_changed(view_id, page),
            Interaction::LoadFinished { view_id } => self.load_finished(view_id),
            Interaction::LoadFailed { view_id, message } => self.load_failed(view_id, message),
        }
    }

    /// A carousel instance was moved to `page`
    pub fn page_changed(&mut self, view_id: ViewId, page: usize) {
        self.view_state.set_current_page(view_id.clone(), page);
        self.notify(&view_id);
    }

    /// A web view instance finished loading; clears any previous error
    pub fn load_finished(&mut self, view_id: ViewId) {
        self.view_state.set(view_id.clone(), WebLoadState::default());
        self.notify(&view_id);
    }

    /// A web view instance failed to load
    pub fn load_failed(&mut self, view_id: ViewId, message: impl Into<String>) {
        self.view_state.set(view_id.clone(), WebLoadState { error: Some(message.into()) });
        self.notify(&view_id);
    }

    /// Refetch a single data source instance on the next render
    pub fn refresh(&mut self, view_id: &ViewId) -> Result<(), CoreError> {
        if self.fetches.invalidate(view_id) {
            Ok(())
        } else {
            Err(CoreError::ViewNotFound(view_id.to_string()))
        }
    }

    /// Refetch every data source on the next render
    pub fn refresh_all(&mut self) {
        self.fetches.invalidate_all();
    }

    /// Whether a node id exists in the document
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.document.find(node_id).is_some()
    }

    fn notify(&self, view_id: &ViewId) {
        if let Some(sink) = &self.redraw {
            sink.invalidate(view_id);
        }
    }
}

impl std::fmt::Debug for RenderSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderSession")
            .field("screen", &self.document.root.id)
            .field("view_state", &self.view_state)
            .field("fetches", &self.fetches)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{HttpResponse, MockHttpTransport};
    use crate::render::NodeStatus;
    use canopy_dsl::decode_value;
    use mockall::predicate::eq;
    use serde_json::json;

    fn document(raw: serde_json::Value) -> ScreenDocument {
        decode_value(&raw).unwrap()
    }

    fn idle_transport() -> Arc<dyn HttpTransport> {
        let mut transport = MockHttpTransport::new();
        transport.expect_perform_request().times(0);
        Arc::new(transport)
    }

    fn carousel_screen() -> ScreenDocument {
        document(json!({
            "__typeName": "Screen",
            "id": "screen",
            "children": [{
                "__typeName": "Collection",
                "id": "rows",
                "keyPath": "data.rows",
                "children": [{
                    "__typeName": "Carousel",
                    "id": "carousel",
                    "children": [
                        {"__typeName": "Text", "id": "intro", "text": "{{data.title}}"},
                        {
                            "__typeName": "Collection",
                            "id": "slides",
                            "keyPath": "data.slides",
                            "children": [{"__typeName": "Image", "id": "slide", "url": "{{data}}"}]
                        }
                    ]
                }]
            }]
        }))
    }

    fn carousel_scope() -> DataScope {
        DataScope::from_data(json!({
            "rows": [
                {"title": "first", "slides": ["https://img.test/1.png", "https://img.test/2.png"]},
                {"title": "second", "slides": []}
            ]
        }))
    }

    #[test]
    fn test_static_tree_resolves_properties() {
        let doc = document(json!({
            "__typeName": "Screen",
            "id": "screen",
            "children": [{
                "__typeName": "VStack",
                "id": "stack",
                "spacing": 8,
                "padding": 16,
                "children": [
                    {"__typeName": "Text", "id": "greeting", "text": "Hello {{ capitalize user.name }}"},
                    {"__typeName": "Text", "id": "missing", "text": "{{data.nope}}"},
                    {"__typeName": "Spacer", "id": "gap"}
                ]
            }]
        }));
        let scope = DataScope::default().with_user_info("name", json!("ada"));
        let mut session = RenderSession::new(doc, idle_transport(), scope);

        let tree = session.render();
        let stack = &tree.root.children[0];
        assert_eq!(stack.property("spacing"), Some(&json!(8.0)));
        assert_eq!(stack.modifiers.get("padding"), Some(&json!(16)));

        let greeting = tree.find(&ViewId::root("greeting")).unwrap();
        assert_eq!(greeting.property("text"), Some(&json!("Hello Ada")));

        let missing = tree.find(&ViewId::root("missing")).unwrap();
        assert_eq!(missing.property("text"), None);
        assert_eq!(missing.status, NodeStatus::Ready);
    }

    #[test]
    fn test_carousel_pages_and_instances() {
        let mut session = RenderSession::new(carousel_screen(), idle_transport(), carousel_scope());
        let tree = session.render();

        let carousels = tree.instances("carousel");
        assert_eq!(carousels.len(), 2);
        assert_eq!(carousels[0].view_id, ViewId::new("carousel", Some(0)));
        assert_eq!(carousels[0].property("pageCount"), Some(&json!(3)));
        assert_eq!(carousels[1].property("pageCount"), Some(&json!(1)));
        assert_eq!(carousels[0].property("currentPage"), Some(&json!(0)));

        let slides = tree.instances("slide");
        assert_eq!(slides.len(), 2);
        assert_eq!(slides[1].property("url"), Some(&json!("https://img.test/2.png")));
        assert_eq!(slides[1].view_id, ViewId::at_path("slide", &[0, 1]));
    }

    #[test]
    fn test_page_changed_is_per_instance_and_notifies() {
        let mut sink = MockRedrawSink::new();
        sink.expect_invalidate()
            .with(eq(ViewId::new("carousel", Some(1))))
            .times(2)
            .return_const(());

        let mut session = RenderSession::new(carousel_screen(), idle_transport(), carousel_scope());
        session.set_redraw_sink(Box::new(sink));

        session.handle_interaction(Interaction::PageChanged {
            view_id: ViewId::new("carousel", Some(1)),
            page: 0,
        });
        let tree = session.render();
        assert_eq!(tree.instances("carousel")[1].property("pageInRange"), Some(&json!(true)));

        session.page_changed(ViewId::new("carousel", Some(1)), 4);
        let tree = session.render();
        let carousels = tree.instances("carousel");
        assert_eq!(carousels[0].property("currentPage"), Some(&json!(0)));
        assert_eq!(carousels[1].property("currentPage"), Some(&json!(4)));
        assert_eq!(carousels[1].property("pageInRange"), Some(&json!(false)));
    }

    #[test]
    fn test_web_view_load_state() {
        let doc = document(json!({
            "__typeName": "Screen",
            "id": "screen",
            "children": [
                {"__typeName": "WebView", "id": "web", "url": "https://docs.test/{{url.page}}"},
                {"__typeName": "WebView", "id": "broken", "url": "not a url"}
            ]
        }));
        let scope = DataScope::default().with_url_parameter("page", "faq");
        let mut session = RenderSession::new(doc, idle_transport(), scope);
        let web = ViewId::root("web");

        let tree = session.render();
        assert_eq!(tree.find(&web).unwrap().property("url"), Some(&json!("https://docs.test/faq")));
        assert_eq!(tree.find(&ViewId::root("broken")).unwrap().property("url"), None);

        session.load_failed(web.clone(), "offline");
        let tree = session.render();
        assert_eq!(tree.find(&web).unwrap().property("loadError"), Some(&json!("offline")));

        session.handle_interaction(Interaction::LoadFinished { view_id: web.clone() });
        let tree = session.render();
        assert_eq!(tree.find(&web).unwrap().property("loadError"), None);
    }

    #[test]
    fn test_conditional_children() {
        let doc = document(json!({
            "__typeName": "Screen",
            "id": "screen",
            "children": [{
                "__typeName": "Conditional",
                "id": "banner",
                "conditions": [{"keyPath": "user.isMember", "predicate": "isTrue"}],
                "children": [{"__typeName": "Text", "id": "perk", "text": "Members save 10%"}]
            }]
        }));

        let mut session = RenderSession::new(doc, idle_transport(), DataScope::default());
        let banner = session.render().root.children[0].clone();
        assert_eq!(banner.property("isSatisfied"), Some(&json!(false)));
        assert!(banner.children.is_empty());

        session.set_scope(DataScope::default().with_user_info("isMember", json!(true)));
        let banner = session.render().root.children[0].clone();
        assert_eq!(banner.children.len(), 1);
    }

    #[tokio::test]
    async fn test_data_source_loads_then_renders_children() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_perform_request()
            .times(1)
            .returning(|_| Ok(HttpResponse { status: 200, body: br#"{"name": "Boots"}"#.to_vec() }));

        let doc = document(json!({
            "__typeName": "Screen",
            "id": "screen",
            "children": [{
                "__typeName": "DataSource",
                "id": "product",
                "url": "https://api.test/products/{{url.id}}",
                "headers": [],
                "children": [{"__typeName": "Text", "id": "name", "text": "{{data.name}}"}]
            }]
        }));
        let scope = DataScope::default().with_url_parameter("id", "7");
        let mut session = RenderSession::new(doc, Arc::new(transport), scope);
        let product = ViewId::root("product");

        let tree = session.render();
        let node = tree.find(&product).unwrap();
        assert_eq!(node.status, NodeStatus::Loading);
        assert_eq!(node.property("url"), Some(&json!("https://api.test/products/7")));
        assert!(node.children.is_empty());

        assert_eq!(session.next_update().await, Some(product.clone()));
        assert_eq!(session.next_update().await, None);

        let subtree = session.render_subtree(&product).unwrap();
        assert_eq!(subtree.status, NodeStatus::Loaded);
        assert_eq!(subtree.children[0].property("text"), Some(&json!("Boots")));
    }

    #[test]
    fn test_render_subtree_errors() {
        let mut session = RenderSession::new(carousel_screen(), idle_transport(), carousel_scope());
        assert_eq!(
            session.render_subtree(&ViewId::root("nope")),
            Err(CoreError::NodeNotFound("nope".to_string()))
        );
        assert_eq!(
            session.render_subtree(&ViewId::root("carousel")),
            Err(CoreError::ViewNotFound("carousel".to_string()))
        );
        assert!(session.refresh(&ViewId::root("carousel")).is_err());
    }

    #[test]
    fn test_session_config_defaults() {
        let config: SessionConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert!(config.log_resolution_misses);

        let config: SessionConfig = serde_json::from_value(json!({
            "default_headers": [{"key": "X-Client", "value": "canopy"}]
        }))
        .unwrap();
        assert_eq!(config.default_headers, vec![Header::new("X-Client", "canopy")]);
    }
}
