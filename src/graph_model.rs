//! Derived graph model built from an analysis payload
//!
//! Resolves edge endpoints to node indices and marks edges whose endpoints
//! share a ring. Everything here is presentation state: the model is rebuilt
//! for each payload and is never serialized.

use crate::{AccountNode, AnalysisResult, IntegrityError};
use regex::RegexBuilder;
use std::collections::HashMap;

/// Edge with resolved endpoints and ring emphasis
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedEdge {
    /// Position of the edge in the payload
    pub index: usize,
    pub source: usize,
    pub target: usize,
    pub amount: f64,
    pub in_same_ring: bool,
    /// Shared ring, only set when `in_same_ring`
    pub ring_id: Option<String>,
}

/// Query-able graph over one analysis payload
#[derive(Debug, Clone)]
pub struct DerivedGraphModel {
    nodes: Vec<AccountNode>,
    index: HashMap<String, usize>,
    edges: Vec<DerivedEdge>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
}

impl DerivedGraphModel {
    /// Build the model, failing on the first edge with an unknown endpoint
    pub fn build(result: &AnalysisResult) -> Result<Self, IntegrityError> {
        let nodes = result.nodes.clone();
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(IntegrityError::DuplicateNode(node.id.clone()));
            }
        }

        let mut edges = Vec::with_capacity(result.edges.len());
        let mut outgoing = vec![Vec::new(); nodes.len()];
        let mut incoming = vec![Vec::new(); nodes.len()];

        for (edge_index, edge) in result.edges.iter().enumerate() {
            let resolve = |id: &String| {
                index
                    .get(id)
                    .copied()
                    .ok_or_else(|| IntegrityError::UnknownEdgeEndpoint {
                        edge_index,
                        node_id: id.clone(),
                    })
            };
            let source = resolve(&edge.source)?;
            let target = resolve(&edge.target)?;

            let shared_ring = match (&nodes[source].ring_id, &nodes[target].ring_id) {
                (Some(a), Some(b)) if a == b => Some(a.clone()),
                _ => None,
            };

            outgoing[source].push(edges.len());
            incoming[target].push(edges.len());
            edges.push(DerivedEdge {
                index: edge_index,
                source,
                target,
                amount: edge.amount,
                in_same_ring: shared_ring.is_some(),
                ring_id: shared_ring,
            });
        }

        Ok(Self {
            nodes,
            index,
            edges,
            outgoing,
            incoming,
        })
    }

    pub fn nodes(&self) -> &[AccountNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[DerivedEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &str) -> Option<&AccountNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node_at(&self, index: usize) -> Option<&AccountNode> {
        self.nodes.get(index)
    }

    /// Source and target accounts of an edge
    pub fn endpoints(&self, edge: &DerivedEdge) -> (&AccountNode, &AccountNode) {
        (&self.nodes[edge.source], &self.nodes[edge.target])
    }

    /// Accounts tagged with `ring_id`, in payload order
    pub fn ring_members(&self, ring_id: &str) -> Vec<&AccountNode> {
        self.nodes
            .iter()
            .filter(|n| n.ring_id.as_deref() == Some(ring_id))
            .collect()
    }

    /// Edges running between two members of the same ring
    pub fn ring_edges(&self, ring_id: &str) -> Vec<&DerivedEdge> {
        self.edges
            .iter()
            .filter(|e| e.ring_id.as_deref() == Some(ring_id))
            .collect()
    }

    /// Accounts receiving money from `id`
    pub fn successors(&self, id: &str) -> Vec<&AccountNode> {
        self.index
            .get(id)
            .map(|&i| {
                self.outgoing[i]
                    .iter()
                    .map(|&e| &self.nodes[self.edges[e].target])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Accounts sending money to `id`
    pub fn predecessors(&self, id: &str) -> Vec<&AccountNode> {
        self.index
            .get(id)
            .map(|&i| {
                self.incoming[i]
                    .iter()
                    .map(|&e| &self.nodes[self.edges[e].source])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Weakly connected components as node indices.
    ///
    /// Components are ordered by their first node in payload order and each
    /// component lists its nodes in payload order.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut component_of = vec![usize::MAX; self.nodes.len()];
        let mut components: Vec<Vec<usize>> = Vec::new();

        for start in 0..self.nodes.len() {
            if component_of[start] != usize::MAX {
                continue;
            }
            let id = components.len();
            let mut members = Vec::new();
            let mut stack = vec![start];
            component_of[start] = id;

            while let Some(current) = stack.pop() {
                members.push(current);
                let neighbours = self.outgoing[current]
                    .iter()
                    .map(|&e| self.edges[e].target)
                    .chain(self.incoming[current].iter().map(|&e| self.edges[e].source));
                for next in neighbours {
                    if component_of[next] == usize::MAX {
                        component_of[next] = id;
                        stack.push(next);
                    }
                }
            }

            members.sort_unstable();
            components.push(members);
        }

        components
    }

    /// Case-insensitive substring search over account ids and labels
    pub fn search(&self, query: &str) -> Vec<&AccountNode> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let pattern = match RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => pattern,
            Err(_) => return Vec::new(),
        };

        self.nodes
            .iter()
            .filter(|n| pattern.is_match(&n.id) || pattern.is_match(&n.label))
            .collect()
    }

    /// Total amount carried by intra-ring edges
    pub fn ring_volume(&self, ring_id: &str) -> f64 {
        self.ring_edges(ring_id).iter().map(|e| e.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;

    #[test]
    fn test_same_ring_edges() {
        let model = DerivedGraphModel::build(&cycle_result()).unwrap();

        let flags: Vec<bool> = model.edges().iter().map(|e| e.in_same_ring).collect();
        assert_eq!(flags, vec![true, true, true, false]);
        assert_eq!(model.edges()[0].ring_id.as_deref(), Some("R1"));
        assert_eq!(model.edges()[3].ring_id, None);
    }

    #[test]
    fn test_edge_touching_unringed_node_is_muted() {
        let model = DerivedGraphModel::build(&two_node_result()).unwrap();

        let edge = &model.edges()[0];
        assert!(!edge.in_same_ring);
        assert_eq!(edge.ring_id, None);

        let (source, target) = model.endpoints(edge);
        assert_eq!(source.id, "A");
        assert_eq!(target.id, "B");
    }

    #[test]
    fn test_different_rings_not_same_ring() {
        let mut result = two_node_result();
        result.nodes[0].ring_id = Some("R2".to_string());
        result.fraud_rings.push(ring("R2", "star", &["A"], 70.0));

        let model = DerivedGraphModel::build(&result).unwrap();
        assert!(!model.edges()[0].in_same_ring);
    }

    #[test]
    fn test_unknown_endpoint_fails() {
        let mut result = two_node_result();
        result.edges.push(edge("GHOST", "A", 1.0));

        let err = DerivedGraphModel::build(&result).unwrap_err();
        assert_eq!(
            err,
            IntegrityError::UnknownEdgeEndpoint {
                edge_index: 1,
                node_id: "GHOST".to_string()
            }
        );
    }

    #[test]
    fn test_neighbours_and_ring_queries() {
        let model = DerivedGraphModel::build(&cycle_result()).unwrap();

        let successors: Vec<&str> = model.successors("X").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(successors, vec!["Y"]);

        let predecessors: Vec<&str> = model
            .predecessors("X")
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(predecessors, vec!["Z", "W"]);

        assert_eq!(model.ring_members("R1").len(), 3);
        assert_eq!(model.ring_edges("R1").len(), 3);
        assert_eq!(model.ring_volume("R1"), 1450.0);
        assert!(model.successors("missing").is_empty());
    }

    #[test]
    fn test_components() {
        let mut result = cycle_result();
        result.nodes.push(node("P", 1.0, None));
        result.nodes.push(node("Q", 1.0, None));
        result.edges.push(edge("Q", "P", 5.0));

        let model = DerivedGraphModel::build(&result).unwrap();
        let components = model.components();
        assert_eq!(components, vec![vec![0, 1, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_literal() {
        let mut result = cycle_result();
        result.nodes.push(node("ACC.1", 1.0, None));
        result.nodes.push(node("ACCX1", 1.0, None));
        let model = DerivedGraphModel::build(&result).unwrap();

        let hits: Vec<&str> = model.search("acc.1").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(hits, vec!["ACC.1"]);
        assert_eq!(model.search("x").len(), 2);
        assert!(model.search("   ").is_empty());
    }
}
