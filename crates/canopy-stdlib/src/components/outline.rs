use canopy_core::{HostRenderer, NodeStatus, RenderNode};
use serde_json::Value;

/// Renders a resolved tree as an indented text outline, one node per line:
///
/// ```text
/// Screen screen
///   DataSource catalog [loaded] url="https://api.test/42"
///     Text title#0 text="Boots"
/// ```
#[derive(Debug, Clone)]
pub struct OutlineRenderer {
    indent: usize,
}

impl OutlineRenderer {
    /// Outline with two spaces per level
    pub fn new() -> Self {
        Self { indent: 2 }
    }

    /// Outline with a custom indent width
    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    fn line(node: &RenderNode) -> String {
        let mut line = format!("{} {}", node.node_type, node.view_id);

        if let Some(name) = &node.name {
            line.push_str(&format!(" ({})", name));
        }

        match &node.status {
            NodeStatus::Ready => {}
            NodeStatus::Loaded => line.push_str(" [loaded]"),
            NodeStatus::Loading => line.push_str(" [loading]"),
            NodeStatus::Failed(message) => line.push_str(&format!(" [failed: {}]", message)),
        }

        for (key, value) in &node.properties {
            match value {
                Value::String(s) => line.push_str(&format!(" {}={:?}", key, s)),
                other => line.push_str(&format!(" {}={}", key, other)),
            }
        }

        line
    }
}

impl Default for OutlineRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRenderer for OutlineRenderer {
    type View = String;

    fn render_resolved(&mut self, node: &RenderNode, children: Vec<String>) -> String {
        let padding = " ".repeat(self.indent);
        let mut output = Self::line(node);
        for child in children {
            for child_line in child.lines() {
                output.push('\n');
                output.push_str(&padding);
                output.push_str(child_line);
            }
        }
        output
    }
}
