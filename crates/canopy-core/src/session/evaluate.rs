//! One render pass: node tree + scope -> render tree.

use canopy_dsl::{Node, NodeKind};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use super::SessionConfig;
use crate::collection::items;
use crate::condition::evaluate_all;
use crate::expression::resolve;
use crate::fetch::{FetchCoordinator, FetchState};
use crate::render::{NodeStatus, RenderNode, ResolvedProperties};
use crate::scope::DataScope;
use crate::view_state::{ViewId, ViewStateStore, WebLoadState};

pub(super) struct Evaluator<'a> {
    pub view_state: &'a ViewStateStore,
    pub fetches: &'a mut FetchCoordinator,
    pub config: &'a SessionConfig,
}

impl Evaluator<'_> {
    /// Evaluate `node` at `item_path`, the item indexes of every enclosing
    /// collection, outermost first.
    pub fn evaluate(&mut self, node: &Node, scope: &DataScope, item_path: &[usize]) -> RenderNode {
        let view_id = ViewId::at_path(node.id.clone(), item_path);
        let mut properties = ResolvedProperties::new();
        let mut status = NodeStatus::Ready;

        let children = match &node.kind {
            NodeKind::Screen => self.layers(node, scope, item_path),
            NodeKind::VStack(stack) | NodeKind::HStack(stack) | NodeKind::ZStack(stack) => {
                if let Some(spacing) = stack.spacing {
                    properties.insert("spacing".to_string(), json!(spacing));
                }
                if let Some(alignment) = &stack.alignment {
                    properties.insert("alignment".to_string(), json!(alignment));
                }
                self.layers(node, scope, item_path)
            }
            NodeKind::ScrollView(scroll) => {
                properties.insert("axes".to_string(), json!(scroll.axes));
                properties.insert("showsIndicators".to_string(), json!(scroll.shows_indicators));
                self.layers(node, scope, item_path)
            }
            NodeKind::Carousel(carousel) => {
                let pages = self.pages(node, scope, item_path);
                let page_count = pages.len();
                let current_page = self.view_state.current_page(&view_id);
                let in_range = current_page < page_count || (page_count == 0 && current_page == 0);
                if !in_range {
                    warn!("Carousel {} is on page {} but has {} pages", view_id, current_page, page_count);
                }
                properties.insert("isLoopEnabled".to_string(), json!(carousel.is_loop_enabled));
                properties.insert("currentPage".to_string(), json!(current_page));
                properties.insert("pageCount".to_string(), json!(page_count));
                properties.insert("pageInRange".to_string(), json!(in_range));
                pages
            }
            NodeKind::Text(text) => {
                self.insert_resolved(&mut properties, &view_id, "text", &text.text, scope);
                Vec::new()
            }
            NodeKind::Image(image) => {
                self.insert_resolved(&mut properties, &view_id, "url", &image.url, scope);
                if let Some(dark) = &image.dark_mode_url {
                    self.insert_resolved(&mut properties, &view_id, "darkModeUrl", dark, scope);
                }
                if let Some(mode) = &image.resizing_mode {
                    properties.insert("resizingMode".to_string(), json!(mode));
                }
                Vec::new()
            }
            NodeKind::WebView(web) => {
                match resolve(&web.url, scope).map(|resolved| Url::parse(&resolved).map_err(|e| (resolved, e))) {
                    Some(Ok(url)) => {
                        properties.insert("url".to_string(), json!(url.as_str()));
                    }
                    Some(Err((resolved, e))) => warn!("Web view {} has invalid url '{}': {}", view_id, resolved, e),
                    None => self.log_miss(&view_id, "url", &web.url),
                }
                properties.insert("isScrollEnabled".to_string(), json!(web.is_scroll_enabled));
                if let Some(error) = self.view_state.get::<WebLoadState>(&view_id).error {
                    properties.insert("loadError".to_string(), json!(error));
                }
                Vec::new()
            }
            NodeKind::Rectangle(rectangle) => {
                if let Some(fill) = &rectangle.fill {
                    properties.insert("fill".to_string(), fill.clone());
                }
                if let Some(radius) = rectangle.corner_radius {
                    properties.insert("cornerRadius".to_string(), json!(radius));
                }
                Vec::new()
            }
            NodeKind::Spacer | NodeKind::Divider => Vec::new(),
            NodeKind::DataSource(source) => {
                properties.insert("httpMethod".to_string(), json!(source.http_method.as_str()));
                if let Some(url) = resolve(&source.url, scope) {
                    properties.insert("url".to_string(), json!(url));
                }

                match self.fetches.trigger(&view_id, source, scope) {
                    FetchState::Loaded(payload) => {
                        status = NodeStatus::Loaded;
                        self.layers(node, &scope.with_data(payload), item_path)
                    }
                    FetchState::Loading => {
                        status = NodeStatus::Loading;
                        Vec::new()
                    }
                    FetchState::Failed(error) => {
                        properties.insert("errorCode".to_string(), json!(error.error_code()));
                        status = NodeStatus::Failed(error.to_string());
                        Vec::new()
                    }
                }
            }
            NodeKind::Collection(collection) => {
                let produced = items(collection, scope);
                properties.insert("itemCount".to_string(), json!(produced.len()));
                let mut rendered = Vec::with_capacity(produced.len() * node.children.len());
                for item in &produced {
                    let path = item_path_with(item_path, item.index);
                    for child in node.layers() {
                        rendered.push(self.evaluate(child, &item.scope, &path));
                    }
                }
                rendered
            }
            NodeKind::Conditional(conditional) => {
                let satisfied = evaluate_all(&conditional.conditions, scope);
                properties.insert("isSatisfied".to_string(), Value::Bool(satisfied));
                if satisfied {
                    self.layers(node, scope, item_path)
                } else {
                    Vec::new()
                }
            }
        };

        RenderNode {
            view_id,
            node_type: node.node_type(),
            name: node.name.clone(),
            properties,
            modifiers: node.modifiers.clone(),
            status,
            children,
        }
    }

    fn layers(&mut self, node: &Node, scope: &DataScope, item_path: &[usize]) -> Vec<RenderNode> {
        node.layers()
            .map(|child| self.evaluate(child, scope, item_path))
            .collect()
    }

    /// Carousel pages: each layer child is a page, except collections,
    /// which contribute one page per item and child.
    fn pages(&mut self, node: &Node, scope: &DataScope, item_path: &[usize]) -> Vec<RenderNode> {
        let mut pages = Vec::new();
        for child in node.layers() {
            match child.as_collection() {
                Some(collection) => {
                    for item in items(collection, scope) {
                        let path = item_path_with(item_path, item.index);
                        for grandchild in child.layers() {
                            pages.push(self.evaluate(grandchild, &item.scope, &path));
                        }
                    }
                }
                None => pages.push(self.evaluate(child, scope, item_path)),
            }
        }
        pages
    }

    fn insert_resolved(
        &self,
        properties: &mut ResolvedProperties,
        view_id: &ViewId,
        key: &str,
        template: &str,
        scope: &DataScope,
    ) {
        match resolve(template, scope) {
            Some(value) => {
                properties.insert(key.to_string(), Value::String(value));
            }
            None => self.log_miss(view_id, key, template),
        }
    }

    fn log_miss(&self, view_id: &ViewId, key: &str, template: &str) {
        if self.config.log_resolution_misses {
            debug!("Property '{}' of {} does not resolve: {}", key, view_id, template);
        }
    }
}

fn item_path_with(item_path: &[usize], index: usize) -> Vec<usize> {
    let mut path = Vec::with_capacity(item_path.len() + 1);
    path.extend_from_slice(item_path);
    path.push(index);
    path
}
