//! The node model: a typed, immutable tree of heterogeneous node variants.

mod collection;
mod content;
mod data_source;
mod layout;

pub use collection::{Collection, Condition, Conditional, Limit, Predicate, SortDescriptor};
pub use content::{Image, Rectangle, Text, WebView};
pub use data_source::{DataSource, Header, HttpMethod};
pub use layout::{Carousel, ScrollView, Stack};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::DslError;

/// Discriminator field selecting the variant decoder
pub const TYPE_FIELD: &str = "__typeName";

/// Stable identifier of a node, unique within a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Keys that make up the opaque modifier bag shared by every node
const MODIFIER_KEYS: &[&str] = &[
    "padding",
    "frame",
    "offset",
    "opacity",
    "aspectRatio",
    "layoutPriority",
    "shadow",
    "background",
    "overlay",
    "mask",
    "action",
    "accessibility",
    "metadata",
    "ignoresSafeArea",
];

/// Visual and layout modifiers. Opaque to the evaluation engine; passed
/// through to the host untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(Map<String, Value>);

impl Modifiers {
    /// Pick the known modifier keys out of a raw node record
    pub fn extract(raw: &Map<String, Value>) -> Self {
        let bag = MODIFIER_KEYS
            .iter()
            .filter_map(|key| raw.get(*key).map(|v| (key.to_string(), v.clone())))
            .filter(|(_, v)| !v.is_null())
            .collect();
        Modifiers(bag)
    }

    /// Look up a single modifier
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether no modifiers are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the modifiers in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

/// Fieldless tag for each node variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    /// Root of a document
    Screen,
    /// Vertical stack
    VStack,
    /// Horizontal stack
    HStack,
    /// Depth stack
    ZStack,
    /// Scrolling container
    ScrollView,
    /// Paged container
    Carousel,
    /// Text leaf
    Text,
    /// Image leaf
    Image,
    /// Embedded web content
    WebView,
    /// Flexible space
    Spacer,
    /// Filled shape
    Rectangle,
    /// Separator line
    Divider,
    /// Remote data source
    DataSource,
    /// Repeated children over a data array
    Collection,
    /// Children shown when conditions hold
    Conditional,
}

impl NodeType {
    /// All node types, in declaration order
    pub const ALL: [NodeType; 15] = [
        NodeType::Screen,
        NodeType::VStack,
        NodeType::HStack,
        NodeType::ZStack,
        NodeType::ScrollView,
        NodeType::Carousel,
        NodeType::Text,
        NodeType::Image,
        NodeType::WebView,
        NodeType::Spacer,
        NodeType::Rectangle,
        NodeType::Divider,
        NodeType::DataSource,
        NodeType::Collection,
        NodeType::Conditional,
    ];

    /// The discriminator string used in serialized documents
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeType::Screen => "Screen",
            NodeType::VStack => "VStack",
            NodeType::HStack => "HStack",
            NodeType::ZStack => "ZStack",
            NodeType::ScrollView => "ScrollView",
            NodeType::Carousel => "Carousel",
            NodeType::Text => "Text",
            NodeType::Image => "Image",
            NodeType::WebView => "WebView",
            NodeType::Spacer => "Spacer",
            NodeType::Rectangle => "Rectangle",
            NodeType::Divider => "Divider",
            NodeType::DataSource => "DataSource",
            NodeType::Collection => "Collection",
            NodeType::Conditional => "Conditional",
        }
    }

    /// Parse a discriminator string
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.type_name() == name)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Variant-specific payload of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of a document; not itself a layer
    Screen,
    /// Vertical stack
    VStack(Stack),
    /// Horizontal stack
    HStack(Stack),
    /// Depth stack
    ZStack(Stack),
    /// Scrolling container
    ScrollView(ScrollView),
    /// Paged container
    Carousel(Carousel),
    /// Text leaf
    Text(Text),
    /// Image leaf
    Image(Image),
    /// Embedded web content
    WebView(WebView),
    /// Flexible space
    Spacer,
    /// Filled shape
    Rectangle(Rectangle),
    /// Separator line
    Divider,
    /// Remote data source
    DataSource(DataSource),
    /// Repeated children over a data array
    Collection(Collection),
    /// Children shown when conditions hold
    Conditional(Conditional),
}

impl NodeKind {
    /// Decode the variant payload from a raw node record
    pub(crate) fn decode(node_type: NodeType, raw: &Value, path: &str) -> Result<Self, DslError> {
        fn fields<'de, T: Deserialize<'de>>(
            node_type: NodeType,
            raw: &'de Value,
            path: &str,
        ) -> Result<T, DslError> {
            T::deserialize(raw).map_err(|e| DslError::InvalidNode {
                type_name: node_type.type_name().to_string(),
                path: path.to_string(),
                message: e.to_string(),
            })
        }

        Ok(match node_type {
            NodeType::Screen => NodeKind::Screen,
            NodeType::VStack => NodeKind::VStack(fields(node_type, raw, path)?),
            NodeType::HStack => NodeKind::HStack(fields(node_type, raw, path)?),
            NodeType::ZStack => NodeKind::ZStack(fields(node_type, raw, path)?),
            NodeType::ScrollView => NodeKind::ScrollView(fields(node_type, raw, path)?),
            NodeType::Carousel => NodeKind::Carousel(fields(node_type, raw, path)?),
            NodeType::Text => NodeKind::Text(fields(node_type, raw, path)?),
            NodeType::Image => NodeKind::Image(fields(node_type, raw, path)?),
            NodeType::WebView => NodeKind::WebView(fields(node_type, raw, path)?),
            NodeType::Spacer => NodeKind::Spacer,
            NodeType::Rectangle => NodeKind::Rectangle(fields(node_type, raw, path)?),
            NodeType::Divider => NodeKind::Divider,
            NodeType::DataSource => NodeKind::DataSource(fields(node_type, raw, path)?),
            NodeType::Collection => NodeKind::Collection(fields(node_type, raw, path)?),
            NodeType::Conditional => NodeKind::Conditional(fields(node_type, raw, path)?),
        })
    }

    /// The fieldless tag for this variant
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Screen => NodeType::Screen,
            NodeKind::VStack(_) => NodeType::VStack,
            NodeKind::HStack(_) => NodeType::HStack,
            NodeKind::ZStack(_) => NodeType::ZStack,
            NodeKind::ScrollView(_) => NodeType::ScrollView,
            NodeKind::Carousel(_) => NodeType::Carousel,
            NodeKind::Text(_) => NodeType::Text,
            NodeKind::Image(_) => NodeType::Image,
            NodeKind::WebView(_) => NodeType::WebView,
            NodeKind::Spacer => NodeType::Spacer,
            NodeKind::Rectangle(_) => NodeType::Rectangle,
            NodeKind::Divider => NodeType::Divider,
            NodeKind::DataSource(_) => NodeType::DataSource,
            NodeKind::Collection(_) => NodeType::Collection,
            NodeKind::Conditional(_) => NodeType::Conditional,
        }
    }
}

/// One element of the declarative UI tree.
///
/// Children are owned exclusively by their parent and their order is
/// preserved from the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Stable identifier
    pub id: NodeId,
    /// Optional human-readable name
    pub name: Option<String>,
    /// Variant payload
    pub kind: NodeKind,
    /// Ordered children
    pub children: Vec<Node>,
    /// Opaque visual/layout modifiers
    pub modifiers: Modifiers,
}

impl Node {
    /// Create a node with no children or modifiers
    pub fn new(id: impl Into<NodeId>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind,
            children: Vec::new(),
            modifiers: Modifiers::default(),
        }
    }

    /// Builder-style helper to attach children
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Builder-style helper to set the name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The fieldless tag for this node
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Discriminator string of this node
    pub fn type_name(&self) -> &'static str {
        self.node_type().type_name()
    }

    /// Whether this node renders as a layer (everything except the screen root)
    pub fn is_layer(&self) -> bool {
        !matches!(self.kind, NodeKind::Screen)
    }

    /// Whether this node lays out its children itself
    pub fn is_container(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Screen
                | NodeKind::VStack(_)
                | NodeKind::HStack(_)
                | NodeKind::ZStack(_)
                | NodeKind::ScrollView(_)
                | NodeKind::Carousel(_)
        )
    }

    /// Whether this node is leaf content handed straight to the host
    pub fn is_leaf(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Text(_)
                | NodeKind::Image(_)
                | NodeKind::WebView(_)
                | NodeKind::Spacer
                | NodeKind::Rectangle(_)
                | NodeKind::Divider
        )
    }

    /// The data source payload, if this is a data source node
    pub fn as_data_source(&self) -> Option<&DataSource> {
        match &self.kind {
            NodeKind::DataSource(ds) => Some(ds),
            _ => None,
        }
    }

    /// The collection payload, if this is a collection node
    pub fn as_collection(&self) -> Option<&Collection> {
        match &self.kind {
            NodeKind::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// The conditional payload, if this is a conditional node
    pub fn as_conditional(&self) -> Option<&Conditional> {
        match &self.kind {
            NodeKind::Conditional(c) => Some(c),
            _ => None,
        }
    }

    /// Children that render as layers, in order
    pub fn layers(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|child| child.is_layer())
    }

    /// Depth-first search for a node by id, including this node
    pub fn find(&self, id: &NodeId) -> Option<&Node> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Visit every node of the subtree in pre-order
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Number of nodes in the subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }
}
