//! Flow canvas model: nodes, edges, typed node payloads, and the flow editor.
//!
//! Flow nodes are freely placed in continuous pixel coordinates; there is no
//! occupancy constraint. Dragging, edge routing and the minimap belong to the
//! external graph renderer, which hands back plain node/edge records. Fields
//! the renderer adds that we do not interpret are kept in `extra` so a
//! dashboard exports exactly as it was imported.

#[cfg(test)]
#[path = "flow_test.rs"]
mod flow_test;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::block::{ChartPoint, PayloadError};
use crate::codec::{FlowImport, max_id_suffix};
use crate::consts::{DEFAULT_FLOW_TITLE, EDGE_ID_PREFIX, FIRST_ENTITY_ID, FLOW_NODE_STEP_PX, NODE_ID_PREFIX};
use crate::store::{StoredDashboard, StoredFlow, new_dashboard_id, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("node not found: {0}")]
    UnknownNode(String),
    #[error("edge not found: {0}")]
    UnknownEdge(String),
    #[error("edge already exists: {0}")]
    DuplicateEdge(String),
    #[error("unknown node template: {0}")]
    UnknownTemplate(String),
    #[error("node id counter exhausted")]
    IdsExhausted,
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Renderer component a node is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Html,
    Equipment,
    Chart,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Equipment => "equipment",
            Self::Chart => "chart",
        }
    }
}

/// Continuous canvas position in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node on the flow canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub position: Position,
    /// Kind-specific payload, decoded with [`FlowNode::payload`].
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowNode {
    /// Typed view of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] if `data` does not match this node's kind.
    pub fn payload(&self) -> Result<NodePayload, PayloadError> {
        NodePayload::decode(self.kind, &self.data)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animated: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FlowEdge {
    fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

// =============================================================================
// PAYLOADS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlElement {
    Button,
    Input,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Equipment {
    OilJack,
    Pump,
    Tank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartType {
    PieChart,
    LineChart,
    BarChart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlData {
    pub label: String,
    #[serde(rename = "type")]
    pub element: HtmlElement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentData {
    pub label: String,
    #[serde(rename = "type")]
    pub equipment: Equipment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub label: String,
    #[serde(rename = "type")]
    pub chart: ChartType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<ChartPoint>,
}

/// Decoded node payload; the variant always matches the node's [`NodeKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Html(HtmlData),
    Equipment(EquipmentData),
    Chart(ChartData),
}

impl NodePayload {
    /// Decode a node's `data` object according to its kind.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Malformed`] if the value has the wrong shape.
    pub fn decode(kind: NodeKind, data: &Value) -> Result<Self, PayloadError> {
        let malformed = |source| PayloadError::Malformed { kind: kind.as_str(), source };
        match kind {
            NodeKind::Html => HtmlData::deserialize(data).map(Self::Html).map_err(malformed),
            NodeKind::Equipment => EquipmentData::deserialize(data).map(Self::Equipment).map_err(malformed),
            NodeKind::Chart => ChartData::deserialize(data).map(Self::Chart).map_err(malformed),
        }
    }

    /// Encode back into the node's `data` value.
    ///
    /// # Errors
    ///
    /// Returns [`PayloadError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Value, PayloadError> {
        match self {
            Self::Html(d) => serde_json::to_value(d),
            Self::Equipment(d) => serde_json::to_value(d),
            Self::Chart(d) => serde_json::to_value(d),
        }
        .map_err(PayloadError::Encode)
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Html(_) => NodeKind::Html,
            Self::Equipment(_) => NodeKind::Equipment,
            Self::Chart(_) => NodeKind::Chart,
        }
    }
}

/// Palette entry that a new node is created from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTemplate {
    Html(HtmlElement),
    Equipment(Equipment),
    Chart(ChartType),
}

impl NodeTemplate {
    /// Every palette entry, grouped by category.
    pub const ALL: [NodeTemplate; 9] = [
        Self::Html(HtmlElement::Button),
        Self::Html(HtmlElement::Input),
        Self::Html(HtmlElement::Label),
        Self::Equipment(Equipment::OilJack),
        Self::Equipment(Equipment::Pump),
        Self::Equipment(Equipment::Tank),
        Self::Chart(ChartType::PieChart),
        Self::Chart(ChartType::LineChart),
        Self::Chart(ChartType::BarChart),
    ];

    /// Palette name, also the `data.type` written on the node.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Html(HtmlElement::Button) => "button",
            Self::Html(HtmlElement::Input) => "input",
            Self::Html(HtmlElement::Label) => "label",
            Self::Equipment(Equipment::OilJack) => "oilJack",
            Self::Equipment(Equipment::Pump) => "pump",
            Self::Equipment(Equipment::Tank) => "tank",
            Self::Chart(ChartType::PieChart) => "pieChart",
            Self::Chart(ChartType::LineChart) => "lineChart",
            Self::Chart(ChartType::BarChart) => "barChart",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Html(HtmlElement::Button) => "Button",
            Self::Html(HtmlElement::Input) => "Input",
            Self::Html(HtmlElement::Label) => "Label",
            Self::Equipment(Equipment::OilJack) => "Oil Jack",
            Self::Equipment(Equipment::Pump) => "Pump",
            Self::Equipment(Equipment::Tank) => "Tank",
            Self::Chart(ChartType::PieChart) => "Pie Chart",
            Self::Chart(ChartType::LineChart) => "Line Chart",
            Self::Chart(ChartType::BarChart) => "Bar Chart",
        }
    }

    /// Initial payload for a node created from this entry.
    #[must_use]
    pub fn payload(self) -> NodePayload {
        let label = self.label().to_owned();
        match self {
            Self::Html(element) => NodePayload::Html(HtmlData { label, element }),
            Self::Equipment(equipment) => NodePayload::Equipment(EquipmentData { label, equipment }),
            Self::Chart(chart) => {
                let data = match chart {
                    ChartType::PieChart => vec![
                        ChartPoint::colored("A", 400.0, "#0088FE"),
                        ChartPoint::colored("B", 300.0, "#00C49F"),
                        ChartPoint::colored("C", 200.0, "#FFBB28"),
                    ],
                    ChartType::LineChart | ChartType::BarChart => vec![
                        ChartPoint::new("Jan", 400.0),
                        ChartPoint::new("Feb", 300.0),
                        ChartPoint::new("Mar", 200.0),
                    ],
                };
                NodePayload::Chart(ChartData { label, chart, data })
            }
        }
    }
}

impl fmt::Display for NodeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeTemplate {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FlowError::UnknownTemplate(s.to_owned()))
    }
}

// =============================================================================
// EDITOR
// =============================================================================

/// Editing state for one flow dashboard.
pub struct FlowEditor {
    id: String,
    title: String,
    nodes: Vec<FlowNode>,
    edges: Vec<FlowEdge>,
    selected_id: Option<String>,
    next_node: u64,
}

impl Default for FlowEditor {
    fn default() -> Self {
        Self::new(DEFAULT_FLOW_TITLE)
    }
}

impl FlowEditor {
    /// Empty dashboard with a fresh identity.
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            id: new_dashboard_id(),
            title: title.to_owned(),
            nodes: Vec::new(),
            edges: Vec::new(),
            selected_id: None,
            next_node: FIRST_ENTITY_ID,
        }
    }

    /// Resume editing a saved dashboard under its stored identity.
    #[must_use]
    pub fn from_stored(stored: StoredFlow) -> Self {
        let max = max_id_suffix(stored.nodes.iter().map(|n| n.id.as_str()), NODE_ID_PREFIX);
        Self {
            id: stored.id,
            title: stored.title,
            nodes: stored.nodes,
            edges: stored.edges,
            selected_id: None,
            next_node: max.saturating_add(1),
        }
    }

    /// Start editing an imported file. Always issues a fresh identity.
    #[must_use]
    pub fn from_import(import: FlowImport) -> Self {
        let next_node = import.next_node_id();
        Self {
            id: new_dashboard_id(),
            title: import.title,
            nodes: import.nodes,
            edges: import.edges,
            selected_id: None,
            next_node,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        title.clone_into(&mut self.title);
    }

    #[must_use]
    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Counter value the next created node will use.
    #[must_use]
    pub fn next_node_id(&self) -> u64 {
        self.next_node
    }

    /// The currently selected node, read live from the node list.
    #[must_use]
    pub fn selection(&self) -> Option<&FlowNode> {
        self.selected_id.as_deref().and_then(|id| self.node(id))
    }

    // --- Mutations ---

    pub fn select(&mut self, id: &str) -> Option<&FlowNode> {
        if self.node(id).is_none() {
            return None;
        }
        self.selected_id = Some(id.to_owned());
        self.selection()
    }

    pub fn clear_selection(&mut self) {
        self.selected_id = None;
    }

    /// Add a node from a palette entry. Without a position the node is
    /// staggered down-right from the origin by creation order.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::IdsExhausted`] once the node counter cannot
    /// advance, or [`FlowError::Payload`] if the template payload fails to encode.
    pub fn add_node(&mut self, template: NodeTemplate, position: Option<Position>) -> Result<FlowNode, FlowError> {
        let n = self.next_node;
        let next = n.checked_add(1).ok_or(FlowError::IdsExhausted)?;
        let position = position.unwrap_or_else(|| {
            #[allow(clippy::cast_precision_loss)]
            let offset = self.nodes.len() as f64 * FLOW_NODE_STEP_PX;
            Position { x: offset, y: offset }
        });
        let payload = template.payload();
        let node = FlowNode {
            id: format!("{NODE_ID_PREFIX}{n}"),
            kind: payload.kind(),
            position,
            data: payload.encode()?,
            extra: Map::new(),
        };
        self.nodes.push(node.clone());
        self.next_node = next;
        debug!(id = %node.id, template = %template, "flow node added");
        Ok(node)
    }

    /// # Errors
    ///
    /// Returns [`FlowError::UnknownNode`] if no node has `id`.
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<(), FlowError> {
        let node = self.node_mut(id)?;
        node.position = position;
        Ok(())
    }

    /// Replace a node's payload after checking it decodes for the node's kind.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownNode`] or [`FlowError::Payload`].
    pub fn update_node_data(&mut self, id: &str, data: Value) -> Result<FlowNode, FlowError> {
        let node = self.node_mut(id)?;
        NodePayload::decode(node.kind, &data)?;
        node.data = data;
        Ok(node.clone())
    }

    /// Connect two existing nodes.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownNode`] for a dangling endpoint or
    /// [`FlowError::DuplicateEdge`] if the same connection already exists.
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        source_handle: Option<&str>,
        target_handle: Option<&str>,
    ) -> Result<FlowEdge, FlowError> {
        for endpoint in [source, target] {
            if self.node(endpoint).is_none() {
                return Err(FlowError::UnknownNode(endpoint.to_owned()));
            }
        }
        let id = format!(
            "{EDGE_ID_PREFIX}{source}{}-{target}{}",
            source_handle.unwrap_or_default(),
            target_handle.unwrap_or_default()
        );
        if self.edges.iter().any(|e| e.id == id) {
            return Err(FlowError::DuplicateEdge(id));
        }
        let edge = FlowEdge {
            id,
            source: source.to_owned(),
            target: target.to_owned(),
            source_handle: source_handle.map(str::to_owned),
            target_handle: target_handle.map(str::to_owned),
            kind: None,
            animated: None,
            style: None,
            label: None,
            extra: Map::new(),
        };
        self.edges.push(edge.clone());
        Ok(edge)
    }

    /// Remove a node and every edge attached to it.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownNode`] if no node has `id`.
    pub fn delete_node(&mut self, id: &str) -> Result<FlowNode, FlowError> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_owned()))?;
        let node = self.nodes.remove(idx);
        self.edges.retain(|e| !e.touches(id));
        if self.selected_id.as_deref() == Some(id) {
            self.selected_id = None;
        }
        Ok(node)
    }

    /// # Errors
    ///
    /// Returns [`FlowError::UnknownEdge`] if no edge has `id`.
    pub fn delete_edge(&mut self, id: &str) -> Result<FlowEdge, FlowError> {
        let idx = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| FlowError::UnknownEdge(id.to_owned()))?;
        Ok(self.edges.remove(idx))
    }

    /// Replace nodes and edges wholesale with the renderer's current state.
    pub fn replace_graph(&mut self, nodes: Vec<FlowNode>, edges: Vec<FlowEdge>) {
        self.nodes = nodes;
        self.edges = edges;
        if self.selection().is_none() {
            self.selected_id = None;
        }
    }

    /// Snapshot for the persistence store.
    #[must_use]
    pub fn snapshot(&self) -> StoredDashboard {
        StoredDashboard::Flow(StoredFlow {
            id: self.id.clone(),
            title: self.title.clone(),
            last_modified: now_ms(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        })
    }

    fn node_mut(&mut self, id: &str) -> Result<&mut FlowNode, FlowError> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| FlowError::UnknownNode(id.to_owned()))
    }
}
