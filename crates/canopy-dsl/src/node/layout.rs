use serde::{Deserialize, Serialize};

/// Shared payload of the stack containers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    /// Spacing between children, host units
    #[serde(default)]
    pub spacing: Option<f64>,

    /// Alignment keyword, interpreted by the host
    #[serde(default)]
    pub alignment: Option<String>,
}

/// Scrolling container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollView {
    /// Scroll axes keyword (`vertical`, `horizontal`, ...)
    #[serde(default = "default_axes")]
    pub axes: String,

    /// Whether scroll indicators are shown
    #[serde(default = "default_true")]
    pub shows_indicators: bool,
}

impl Default for ScrollView {
    fn default() -> Self {
        Self {
            axes: default_axes(),
            shows_indicators: true,
        }
    }
}

/// Paged container. Each layer child is a page; collection children
/// contribute one page per item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Carousel {
    /// Whether paging wraps around at either end
    #[serde(default)]
    pub is_loop_enabled: bool,
}

fn default_axes() -> String {
    "vertical".to_string()
}

fn default_true() -> bool {
    true
}
