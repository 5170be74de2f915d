use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text leaf. `text` is an expression template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    /// Expression template of the displayed text
    pub text: String,
}

/// Image leaf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Expression template of the image URL
    pub url: String,

    /// Optional template used when the host is in dark mode
    #[serde(default, rename = "darkModeURL")]
    pub dark_mode_url: Option<String>,

    /// Resizing keyword, interpreted by the host
    #[serde(default)]
    pub resizing_mode: Option<String>,
}

/// Embedded web content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebView {
    /// Expression template of the page URL
    pub url: String,

    /// Whether the page scrolls inside the view
    #[serde(default = "default_true")]
    pub is_scroll_enabled: bool,
}

/// Filled shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rectangle {
    /// Fill description, opaque to the engine
    #[serde(default)]
    pub fill: Option<Value>,

    /// Corner radius, host units
    #[serde(default)]
    pub corner_radius: Option<f64>,
}

fn default_true() -> bool {
    true
}
