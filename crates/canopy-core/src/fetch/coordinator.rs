use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{DataSourceFetcher, HttpRequest};
use crate::error::FetchError;
use crate::scope::DataScope;
use crate::view_state::ViewId;
use canopy_dsl::DataSource;

/// Fetch status of one data source instance
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    /// A request is in flight and nothing has been published yet
    Loading,
    /// The latest request succeeded
    Loaded(Value),
    /// The latest request failed or could not be built
    Failed(FetchError),
}

/// Result of a spawned fetch, sent back to the owning session
#[derive(Debug)]
pub struct FetchCompletion {
    /// Instance the fetch was started for
    pub view_id: ViewId,
    /// Generation the fetch was started with
    pub generation: u64,
    /// Payload or failure
    pub result: Result<Value, FetchError>,
}

#[derive(Debug)]
struct FetchSlot {
    generation: u64,
    request: Option<HttpRequest>,
    scope: DataScope,
    state: FetchState,
    in_flight: bool,
}

impl FetchSlot {
    fn new(scope: DataScope) -> Self {
        Self {
            generation: 0,
            request: None,
            scope,
            state: FetchState::Loading,
            in_flight: false,
        }
    }
}

/// Starts fetches for data source instances and decides which results
/// may be published.
///
/// Every instance (a [`ViewId`]) records the generation of its latest
/// fetch. Generations come from one counter shared by all instances, and
/// a completion is only applied when it carries the current generation of
/// a live instance, so the last triggered fetch wins even if an older one
/// completes later. A request is only started when the resolved request
/// differs from the previous one for that instance.
///
/// A full render pass is bracketed by [`begin_pass`](Self::begin_pass) and
/// [`end_pass`](Self::end_pass); instances the pass did not reach have left
/// the tree and are dropped along with any fetch still in flight for them.
pub struct FetchCoordinator {
    fetcher: DataSourceFetcher,
    slots: HashMap<ViewId, FetchSlot>,
    next_generation: u64,
    visited: Option<HashSet<ViewId>>,
    tx: mpsc::UnboundedSender<FetchCompletion>,
}

impl FetchCoordinator {
    /// Create a coordinator and the receiving end of its completion channel
    pub fn new(fetcher: DataSourceFetcher) -> (Self, mpsc::UnboundedReceiver<FetchCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let coordinator = Self {
            fetcher,
            slots: HashMap::new(),
            next_generation: 0,
            visited: None,
            tx,
        };
        (coordinator, rx)
    }

    /// Make sure the instance reflects `source` resolved against `scope`.
    ///
    /// Returns the state to render now. Must be called from within a tokio
    /// runtime for a fetch to be started.
    pub fn trigger(&mut self, view_id: &ViewId, source: &DataSource, scope: &DataScope) -> FetchState {
        if let Some(visited) = &mut self.visited {
            visited.insert(view_id.clone());
        }

        let resolved = self.fetcher.resolve_request(source, scope);
        let slot = self
            .slots
            .entry(view_id.clone())
            .or_insert_with(|| FetchSlot::new(scope.clone()));
        slot.scope = scope.clone();

        let request = match resolved {
            Ok(request) => request,
            Err(error) => {
                if slot.in_flight {
                    debug!("Scope of {} no longer resolves; suppressing in-flight fetch", view_id);
                }
                // Any result still in flight belongs to an older scope
                self.next_generation += 1;
                slot.generation = self.next_generation;
                slot.request = None;
                slot.in_flight = false;
                if slot.state != FetchState::Failed(error.clone()) {
                    debug!("Data source {} not fetched: {}", view_id, error);
                }
                slot.state = FetchState::Failed(error);
                return slot.state.clone();
            }
        };

        if slot.request.as_ref() == Some(&request) {
            return slot.state.clone();
        }

        self.next_generation += 1;
        slot.generation = self.next_generation;
        let generation = slot.generation;

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("Cannot fetch {} for {}: no async runtime available", request.url, view_id);
                // Left unset so the same request is retried once a runtime exists
                slot.request = None;
                slot.in_flight = false;
                slot.state = FetchState::Failed(FetchError::FetchFailed("no async runtime available".to_string()));
                return slot.state.clone();
            }
        };

        debug!("Starting fetch {} of {} (generation {})", request.url, view_id, generation);
        slot.request = Some(request.clone());
        slot.in_flight = true;
        slot.state = FetchState::Loading;

        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        let completion_view = view_id.clone();
        handle.spawn(async move {
            let result = fetcher.execute(&request).await;
            let completion = FetchCompletion {
                view_id: completion_view,
                generation,
                result,
            };
            if tx.send(completion).is_err() {
                debug!("Session closed before a fetch completed");
            }
        });

        FetchState::Loading
    }

    /// Apply a completion if it is still current.
    ///
    /// Returns the instance to redraw, or `None` when the result was
    /// superseded and discarded.
    pub fn apply(&mut self, completion: FetchCompletion) -> Option<ViewId> {
        let Some(slot) = self.slots.get_mut(&completion.view_id) else {
            debug!("Discarding fetch result for unknown view {}", completion.view_id);
            return None;
        };

        if !slot.in_flight || completion.generation != slot.generation {
            warn!(
                "Discarding superseded fetch result for {} (generation {}, current {})",
                completion.view_id, completion.generation, slot.generation
            );
            return None;
        }

        slot.in_flight = false;
        slot.state = match completion.result {
            Ok(payload) => {
                debug!("Fetch for {} completed", completion.view_id);
                FetchState::Loaded(payload)
            }
            Err(error) => {
                warn!("Fetch for {} failed: {}", completion.view_id, error);
                FetchState::Failed(error)
            }
        };
        Some(completion.view_id)
    }

    /// Start recording which instances a full render pass reaches
    pub fn begin_pass(&mut self) {
        self.visited = Some(HashSet::new());
    }

    /// Drop every instance the pass since [`begin_pass`](Self::begin_pass)
    /// did not reach. Results still in flight for them are discarded when
    /// they arrive. Returns the number of dropped instances.
    pub fn end_pass(&mut self) -> usize {
        let Some(visited) = self.visited.take() else {
            return 0;
        };

        let before = self.slots.len();
        self.slots.retain(|view_id, slot| {
            let keep = visited.contains(view_id);
            if !keep && slot.in_flight {
                debug!("Data source {} left the tree; suppressing in-flight fetch", view_id);
            }
            keep
        });

        let dropped = before - self.slots.len();
        if dropped > 0 {
            debug!("Dropped {} data source instances no longer rendered", dropped);
        }
        dropped
    }

    /// Forget the last request of an instance so the next trigger refetches.
    /// Returns `false` for an unknown instance.
    pub fn invalidate(&mut self, view_id: &ViewId) -> bool {
        match self.slots.get_mut(view_id) {
            Some(slot) => {
                slot.request = None;
                true
            }
            None => false,
        }
    }

    /// Forget every request so the next render refetches everything
    pub fn invalidate_all(&mut self) {
        for slot in self.slots.values_mut() {
            slot.request = None;
        }
    }

    /// Current state of an instance
    pub fn state(&self, view_id: &ViewId) -> Option<&FetchState> {
        self.slots.get(view_id).map(|slot| &slot.state)
    }

    /// Scope the instance was last triggered with
    pub fn scope_of(&self, view_id: &ViewId) -> Option<&DataScope> {
        self.slots.get(view_id).map(|slot| &slot.scope)
    }

    /// Current generation of an instance
    pub fn generation(&self, view_id: &ViewId) -> Option<u64> {
        self.slots.get(view_id).map(|slot| slot.generation)
    }

    /// Number of live instances
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no instance is tracked
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of instances waiting for their latest fetch
    pub fn in_flight_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.in_flight).count()
    }
}

impl std::fmt::Debug for FetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchCoordinator")
            .field("slots", &self.slots.len())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{HttpResponse, MockHttpTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn coordinator(transport: MockHttpTransport) -> (FetchCoordinator, mpsc::UnboundedReceiver<FetchCompletion>) {
        FetchCoordinator::new(DataSourceFetcher::new(Arc::new(transport)))
    }

    fn echo_transport() -> MockHttpTransport {
        let mut transport = MockHttpTransport::new();
        transport.expect_perform_request().returning(|request| {
            Ok(HttpResponse {
                status: 200,
                body: serde_json::to_vec(&json!({"url": request.url.as_str()})).unwrap(),
            })
        });
        transport
    }

    #[tokio::test]
    async fn test_unchanged_request_is_not_refetched() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_perform_request()
            .times(1)
            .returning(|_| Ok(HttpResponse { status: 200, body: b"[1]".to_vec() }));
        let (mut coordinator, mut rx) = coordinator(transport);
        let view = ViewId::root("ds");
        let source = DataSource::get("https://api.test/{{data.id}}");

        assert_eq!(coordinator.trigger(&view, &source, &DataScope::from_data(json!({"id": 1}))), FetchState::Loading);
        assert_eq!(coordinator.trigger(&view, &source, &DataScope::from_data(json!({"id": 1, "other": true}))), FetchState::Loading);
        assert_eq!(coordinator.in_flight_count(), 1);

        let completion = rx.recv().await.unwrap();
        assert_eq!(coordinator.apply(completion), Some(view.clone()));
        assert_eq!(coordinator.state(&view), Some(&FetchState::Loaded(json!([1]))));

        let state = coordinator.trigger(&view, &source, &DataScope::from_data(json!({"id": 1})));
        assert_eq!(state, FetchState::Loaded(json!([1])));
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let (mut coordinator, mut rx) = coordinator(echo_transport());
        let view = ViewId::root("ds");
        let source = DataSource::get("https://api.test/{{data.id}}");

        coordinator.trigger(&view, &source, &DataScope::from_data(json!({"id": 1})));
        coordinator.trigger(&view, &source, &DataScope::from_data(json!({"id": 2})));
        assert_eq!(coordinator.generation(&view), Some(2));

        let mut applied = Vec::new();
        for _ in 0..2 {
            let completion = rx.recv().await.unwrap();
            if let Some(view_id) = coordinator.apply(completion) {
                applied.push(view_id);
            }
        }

        assert_eq!(applied, vec![view.clone()]);
        assert_eq!(
            coordinator.state(&view),
            Some(&FetchState::Loaded(json!({"url": "https://api.test/2"})))
        );
    }

    #[tokio::test]
    async fn test_unresolved_scope_suppresses_in_flight_result() {
        let (mut coordinator, mut rx) = coordinator(echo_transport());
        let view = ViewId::root("ds");
        let source = DataSource::get("https://api.test/{{data.id}}");

        coordinator.trigger(&view, &source, &DataScope::from_data(json!({"id": 1})));
        let state = coordinator.trigger(&view, &source, &DataScope::default());
        assert!(matches!(state, FetchState::Failed(FetchError::UnresolvedUrl(_))));
        assert_eq!(coordinator.in_flight_count(), 0);

        let completion = rx.recv().await.unwrap();
        assert_eq!(coordinator.apply(completion), None);
        assert!(matches!(coordinator.state(&view), Some(FetchState::Failed(_))));
    }

    #[tokio::test]
    async fn test_instances_are_independent() {
        let (mut coordinator, mut rx) = coordinator(echo_transport());
        let source = DataSource::get("https://api.test/{{data.id}}");
        let first = ViewId::new("ds", Some(0));
        let second = ViewId::new("ds", Some(1));

        coordinator.trigger(&first, &source, &DataScope::from_data(json!({"id": "a"})));
        coordinator.trigger(&second, &source, &DataScope::from_data(json!({"id": "b"})));
        assert_eq!(coordinator.in_flight_count(), 2);

        for _ in 0..2 {
            let completion = rx.recv().await.unwrap();
            assert!(coordinator.apply(completion).is_some());
        }
        assert_eq!(coordinator.state(&first), Some(&FetchState::Loaded(json!({"url": "https://api.test/a"}))));
        assert_eq!(coordinator.state(&second), Some(&FetchState::Loaded(json!({"url": "https://api.test/b"}))));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_perform_request()
            .times(2)
            .returning(|_| Ok(HttpResponse { status: 200, body: b"{}".to_vec() }));
        let (mut coordinator, mut rx) = coordinator(transport);
        let view = ViewId::root("ds");
        let source = DataSource::get("https://api.test/items");

        coordinator.trigger(&view, &source, &DataScope::default());
        coordinator.apply(rx.recv().await.unwrap());

        assert!(coordinator.invalidate(&view));
        assert!(!coordinator.invalidate(&ViewId::root("unknown")));
        assert_eq!(coordinator.trigger(&view, &source, &DataScope::default()), FetchState::Loading);
        assert!(coordinator.apply(rx.recv().await.unwrap()).is_some());
    }

    #[test]
    fn test_no_runtime_fails_then_retries_inside_runtime() {
        let mut transport = MockHttpTransport::new();
        transport
            .expect_perform_request()
            .times(1)
            .returning(|_| Ok(HttpResponse { status: 200, body: b"{}".to_vec() }));
        let (mut coordinator, mut rx) = coordinator(transport);
        let view = ViewId::root("ds");
        let source = DataSource::get("https://api.test/a");

        let state = coordinator.trigger(&view, &source, &DataScope::default());
        assert_eq!(
            state,
            FetchState::Failed(FetchError::FetchFailed("no async runtime available".to_string()))
        );
        assert_eq!(coordinator.in_flight_count(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            assert_eq!(coordinator.trigger(&view, &source, &DataScope::default()), FetchState::Loading);
            let completion = rx.recv().await.unwrap();
            assert_eq!(coordinator.apply(completion), Some(view.clone()));
        });
        assert_eq!(coordinator.state(&view), Some(&FetchState::Loaded(json!({}))));
    }

    #[tokio::test]
    async fn test_pass_drops_instances_it_did_not_reach() {
        let (mut coordinator, mut rx) = coordinator(echo_transport());
        let source = DataSource::get("https://api.test/{{data.id}}");
        let first = ViewId::new("ds", Some(0));
        let second = ViewId::new("ds", Some(1));

        coordinator.begin_pass();
        coordinator.trigger(&first, &source, &DataScope::from_data(json!({"id": "a"})));
        coordinator.trigger(&second, &source, &DataScope::from_data(json!({"id": "b"})));
        assert_eq!(coordinator.end_pass(), 0);
        assert_eq!(coordinator.len(), 2);

        coordinator.begin_pass();
        coordinator.trigger(&first, &source, &DataScope::from_data(json!({"id": "a"})));
        assert_eq!(coordinator.end_pass(), 1);
        assert_eq!(coordinator.len(), 1);
        assert_eq!(coordinator.in_flight_count(), 1);
        assert_eq!(coordinator.state(&second), None);

        let mut applied = Vec::new();
        for _ in 0..2 {
            if let Some(view_id) = coordinator.apply(rx.recv().await.unwrap()) {
                applied.push(view_id);
            }
        }
        assert_eq!(applied, vec![first]);
    }

    #[tokio::test]
    async fn test_recreated_instance_ignores_earlier_completion() {
        let (mut coordinator, mut rx) = coordinator(echo_transport());
        let view = ViewId::root("ds");
        let source = DataSource::get("https://api.test/items");

        coordinator.begin_pass();
        coordinator.trigger(&view, &source, &DataScope::default());
        coordinator.end_pass();
        let dropped_generation = coordinator.generation(&view);

        coordinator.begin_pass();
        assert_eq!(coordinator.end_pass(), 1);

        coordinator.begin_pass();
        assert_eq!(coordinator.trigger(&view, &source, &DataScope::default()), FetchState::Loading);
        coordinator.end_pass();
        assert_ne!(coordinator.generation(&view), dropped_generation);

        let mut applied = 0;
        for _ in 0..2 {
            if coordinator.apply(rx.recv().await.unwrap()).is_some() {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(coordinator.in_flight_count(), 0);
    }

    #[test]
    fn test_end_pass_without_begin_keeps_everything() {
        let (mut coordinator, _rx) = coordinator(MockHttpTransport::new());
        coordinator.trigger(&ViewId::root("ds"), &DataSource::get("https://api.test/{{data.id}}"), &DataScope::default());
        assert_eq!(coordinator.end_pass(), 0);
        assert_eq!(coordinator.len(), 1);
    }
}
