//! Rendered graph instance and its owning host
//!
//! A `GraphInstance` holds the styled elements and layout for one graph
//! model. The `GraphHost` owns at most one instance and always tears the
//! current one down before mounting a replacement.

use crate::graph_model::DerivedGraphModel;
use crate::layout::{self, Layout, LayoutConfig, Point};
use crate::visual::{self, EdgeStyle, NodeStyle};
use crate::AccountNode;
use tracing::{debug, info};
use uuid::Uuid;

/// What a tap landed on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapTarget {
    Node(String),
    /// Edge by payload index
    Edge(usize),
    Background,
}

/// Events emitted by the rendered graph
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeSelected(AccountNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedNode {
    pub node: AccountNode,
    pub style: NodeStyle,
    pub position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEdge {
    pub index: usize,
    pub source: String,
    pub target: String,
    pub amount: f64,
    pub style: EdgeStyle,
}

/// Styled, laid-out graph for one model
#[derive(Debug)]
pub struct GraphInstance {
    id: Uuid,
    nodes: Vec<RenderedNode>,
    edges: Vec<RenderedEdge>,
    layout: Layout,
}

impl GraphInstance {
    fn construct(model: &DerivedGraphModel, config: &LayoutConfig) -> Self {
        let layout = layout::compute(model, config);

        let nodes = model
            .nodes()
            .iter()
            .enumerate()
            .map(|(i, node)| RenderedNode {
                node: node.clone(),
                style: visual::node_style(node),
                position: layout.position(i).unwrap_or_default(),
            })
            .collect();

        let edges = model
            .edges()
            .iter()
            .map(|edge| {
                let (source, target) = model.endpoints(edge);
                RenderedEdge {
                    index: edge.index,
                    source: source.id.clone(),
                    target: target.id.clone(),
                    amount: edge.amount,
                    style: visual::edge_style(edge),
                }
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            nodes,
            edges,
            layout,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn nodes(&self) -> &[RenderedNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[RenderedEdge] {
        &self.edges
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn rendered_node(&self, id: &str) -> Option<&RenderedNode> {
        self.nodes.iter().find(|n| n.node.id == id)
    }

    /// Only node taps produce an event
    pub fn tap(&self, target: &TapTarget) -> Option<GraphEvent> {
        match target {
            TapTarget::Node(id) => self
                .rendered_node(id)
                .map(|rendered| GraphEvent::NodeSelected(rendered.node.clone())),
            TapTarget::Edge(_) | TapTarget::Background => None,
        }
    }
}

impl Drop for GraphInstance {
    fn drop(&mut self) {
        debug!(instance = %self.id, "Graph instance released");
    }
}

/// Exclusive owner of the current graph instance
#[derive(Debug, Default)]
pub struct GraphHost {
    current: Option<GraphInstance>,
    constructed: usize,
    destroyed: usize,
}

impl GraphHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current instance with one built from `model`
    pub fn mount(&mut self, model: &DerivedGraphModel, config: &LayoutConfig) -> &GraphInstance {
        self.teardown();

        let instance = GraphInstance::construct(model, config);
        info!(
            instance = %instance.id,
            nodes = instance.nodes.len(),
            edges = instance.edges.len(),
            "Graph instance mounted"
        );
        self.constructed += 1;
        self.current.insert(instance)
    }

    /// Release the current instance, if any
    pub fn teardown(&mut self) {
        if let Some(instance) = self.current.take() {
            info!(instance = %instance.id, "Graph instance torn down");
            self.destroyed += 1;
        }
    }

    pub fn instance(&self) -> Option<&GraphInstance> {
        self.current.as_ref()
    }

    pub fn is_mounted(&self) -> bool {
        self.current.is_some()
    }

    pub fn tap(&self, target: &TapTarget) -> Option<GraphEvent> {
        self.current.as_ref().and_then(|instance| instance.tap(target))
    }

    pub fn instances_constructed(&self) -> usize {
        self.constructed
    }

    pub fn instances_destroyed(&self) -> usize {
        self.destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::visual::{HIGH_RISK_COLOR, MUTED_EDGE_COLOR, RING_ACCENT_COLOR};

    fn mounted_host() -> GraphHost {
        let model = DerivedGraphModel::build(&two_node_result()).unwrap();
        let mut host = GraphHost::new();
        host.mount(&model, &LayoutConfig::default());
        host
    }

    #[test]
    fn test_scenario_styles() {
        let host = mounted_host();
        let instance = host.instance().unwrap();

        let b = instance.rendered_node("B").unwrap();
        assert_eq!(b.style.fill, HIGH_RISK_COLOR);
        assert_eq!(b.style.border.color, RING_ACCENT_COLOR);

        let edge = &instance.edges()[0];
        assert_eq!((edge.source.as_str(), edge.target.as_str()), ("A", "B"));
        assert_eq!(edge.style.line_color, MUTED_EDGE_COLOR);
    }

    #[test]
    fn test_only_node_taps_emit() {
        let host = mounted_host();

        match host.tap(&TapTarget::Node("B".to_string())) {
            Some(GraphEvent::NodeSelected(node)) => {
                assert_eq!(node.id, "B");
                assert_eq!(node.ring_id.as_deref(), Some("R1"));
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(host.tap(&TapTarget::Edge(0)), None);
        assert_eq!(host.tap(&TapTarget::Background), None);
        assert_eq!(host.tap(&TapTarget::Node("missing".to_string())), None);
    }

    #[test]
    fn test_mount_tears_down_previous() {
        let model = DerivedGraphModel::build(&cycle_result()).unwrap();
        let mut host = mounted_host();
        let first = host.instance().unwrap().id();

        let second = host.mount(&model, &LayoutConfig::default()).id();
        assert_ne!(first, second);
        assert_eq!(host.instances_constructed(), 2);
        assert_eq!(host.instances_destroyed(), 1);

        host.teardown();
        host.teardown();
        assert!(!host.is_mounted());
        assert_eq!(host.instances_destroyed(), 2);
        assert_eq!(host.tap(&TapTarget::Node("X".to_string())), None);
    }
}
