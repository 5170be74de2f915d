//! The resolved render tree handed to the host.

use canopy_dsl::{Modifiers, NodeType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::view_state::ViewId;

/// Properties of a node after expression resolution
pub type ResolvedProperties = Map<String, Value>;

/// Evaluation status of a rendered node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum NodeStatus {
    /// Fully evaluated
    Ready,
    /// A data source whose latest fetch was published
    Loaded,
    /// Waiting for a data source fetch; no children yet
    Loading,
    /// The data source failed; no children
    Failed(String),
}

impl NodeStatus {
    /// Short label used in outlines and logs
    pub fn label(&self) -> &'static str {
        match self {
            NodeStatus::Ready => "ready",
            NodeStatus::Loaded => "loaded",
            NodeStatus::Loading => "loading",
            NodeStatus::Failed(_) => "failed",
        }
    }
}

/// One rendered instance of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderNode {
    /// Instance identity
    pub view_id: ViewId,
    /// Variant of the source node
    pub node_type: NodeType,
    /// Name of the source node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resolved properties; unresolved ones are absent
    pub properties: ResolvedProperties,
    /// Modifiers passed through from the source node
    #[serde(skip_serializing_if = "Modifiers::is_empty", default)]
    pub modifiers: Modifiers,
    /// Evaluation status
    pub status: NodeStatus,
    /// Rendered children in document order
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<RenderNode>,
}

impl RenderNode {
    /// Look up a resolved property
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Depth-first search for an instance
    pub fn find(&self, view_id: &ViewId) -> Option<&RenderNode> {
        if &self.view_id == view_id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(view_id))
    }

    /// Every instance of a node id, in pre-order
    pub fn instances_of<'a>(&'a self, node_id: &str, found: &mut Vec<&'a RenderNode>) {
        if self.view_id.node_id.as_str() == node_id {
            found.push(self);
        }
        for child in &self.children {
            child.instances_of(node_id, found);
        }
    }

    /// Number of rendered nodes in the subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(RenderNode::count).sum::<usize>()
    }
}

/// Output of a render pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderTree {
    /// The rendered screen root
    pub root: RenderNode,
}

impl RenderTree {
    /// Search the tree for an instance
    pub fn find(&self, view_id: &ViewId) -> Option<&RenderNode> {
        self.root.find(view_id)
    }

    /// Every instance of a node id, in pre-order
    pub fn instances(&self, node_id: &str) -> Vec<&RenderNode> {
        let mut found = Vec::new();
        self.root.instances_of(node_id, &mut found);
        found
    }

    /// Serialize the tree as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The leaf render collaborator supplied by the host.
///
/// Called bottom-up: a node's children are rendered before the node
/// itself and handed over in document order.
pub trait HostRenderer {
    /// Platform view type
    type View;

    /// Build the platform view for one resolved node
    fn render_resolved(&mut self, node: &RenderNode, children: Vec<Self::View>) -> Self::View;
}

/// Pass a render tree through a host renderer
pub fn fold_tree<R: HostRenderer>(renderer: &mut R, node: &RenderNode) -> R::View {
    let children = node
        .children
        .iter()
        .map(|child| fold_tree(renderer, child))
        .collect();
    renderer.render_resolved(node, children)
}
