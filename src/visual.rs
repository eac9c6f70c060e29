//! Risk-to-style mapping for nodes and edges
//!
//! Pure functions of the graph model. Thresholds are inclusive at the lower
//! bound of each band: 70 is high, 30 is medium.

use crate::graph_model::DerivedEdge;
use crate::AccountNode;
use serde::Serialize;

pub const HIGH_RISK_THRESHOLD: f64 = 70.0;
pub const MEDIUM_RISK_THRESHOLD: f64 = 30.0;

pub const HIGH_RISK_COLOR: &str = "#ff1e1e";
pub const MEDIUM_RISK_COLOR: &str = "#facc15";
pub const LOW_RISK_COLOR: &str = "#10b981";

pub const RING_ACCENT_COLOR: &str = "#3b82f6";
pub const MUTED_BORDER_COLOR: &str = "#ffffff22";
pub const MUTED_EDGE_COLOR: &str = "#3b82f633";

const BASE_DIAMETER: f64 = 25.0;
const RISK_DIAMETER_DIVISOR: f64 = 1.5;

/// Risk band used for fill color and headline labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn from_risk(risk: f64) -> Self {
        if risk >= HIGH_RISK_THRESHOLD {
            RiskBand::High
        } else if risk >= MEDIUM_RISK_THRESHOLD {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskBand::High => HIGH_RISK_COLOR,
            RiskBand::Medium => MEDIUM_RISK_COLOR,
            RiskBand::Low => LOW_RISK_COLOR,
        }
    }

    /// Headline shown in the investigation drawer
    pub fn headline(&self) -> &'static str {
        match self {
            RiskBand::High => "CRITICAL RISK",
            RiskBand::Medium => "ELEVATED RISK",
            RiskBand::Low => "LOW RISK",
        }
    }

    pub fn legend_label(&self) -> &'static str {
        match self {
            RiskBand::High => "High Risk (70-100)",
            RiskBand::Medium => "Medium Risk (30-69)",
            RiskBand::Low => "Low Risk (0-29)",
        }
    }
}

/// Legend entries, highest band first
pub fn legend() -> [(RiskBand, &'static str); 3] {
    [RiskBand::High, RiskBand::Medium, RiskBand::Low].map(|band| (band, band.color()))
}

/// Node diameter, used for both width and height
pub fn node_diameter(risk: f64) -> f64 {
    BASE_DIAMETER + risk / RISK_DIAMETER_DIVISOR
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BorderStyle {
    pub width: f64,
    pub color: &'static str,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStyle {
    pub label: String,
    pub band: RiskBand,
    pub fill: &'static str,
    pub diameter: f64,
    pub border: BorderStyle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrowShape {
    Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeStyle {
    pub width: f64,
    pub line_color: &'static str,
    pub arrow_color: &'static str,
    pub opacity: f64,
    pub target_arrow: ArrowShape,
}

/// Style for an account node; ring membership only shows in the border
pub fn node_style(node: &AccountNode) -> NodeStyle {
    let band = RiskBand::from_risk(node.risk);
    let border = if node.is_ringed() {
        BorderStyle {
            width: 4.0,
            color: RING_ACCENT_COLOR,
            opacity: 1.0,
        }
    } else {
        BorderStyle {
            width: 2.0,
            color: MUTED_BORDER_COLOR,
            opacity: 0.5,
        }
    };

    NodeStyle {
        label: node.label.clone(),
        band,
        fill: band.color(),
        diameter: node_diameter(node.risk),
        border,
    }
}

/// Style for a transaction edge; always drawn source to target
pub fn edge_style(edge: &DerivedEdge) -> EdgeStyle {
    if edge.in_same_ring {
        EdgeStyle {
            width: 3.0,
            line_color: RING_ACCENT_COLOR,
            arrow_color: RING_ACCENT_COLOR,
            opacity: 1.0,
            target_arrow: ArrowShape::Triangle,
        }
    } else {
        EdgeStyle {
            width: 1.5,
            line_color: MUTED_EDGE_COLOR,
            arrow_color: MUTED_EDGE_COLOR,
            opacity: 0.8,
            target_arrow: ArrowShape::Triangle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::*;
    use crate::graph_model::DerivedGraphModel;

    #[test]
    fn test_diameter_bounds_and_monotonicity() {
        assert_eq!(node_diameter(0.0), 25.0);
        assert!((node_diameter(100.0) - 91.666_666).abs() < 1e-3);

        let mut previous = node_diameter(0.0);
        for step in 1..=1000 {
            let current = node_diameter(step as f64 / 10.0);
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RiskBand::from_risk(100.0), RiskBand::High);
        assert_eq!(RiskBand::from_risk(70.0), RiskBand::High);
        assert_eq!(RiskBand::from_risk(69.999), RiskBand::Medium);
        assert_eq!(RiskBand::from_risk(30.0), RiskBand::Medium);
        assert_eq!(RiskBand::from_risk(29.999), RiskBand::Low);
        assert_eq!(RiskBand::from_risk(0.0), RiskBand::Low);
    }

    #[test]
    fn test_bands_partition_range() {
        for step in 0..=1000 {
            let risk = step as f64 / 10.0;
            let band = RiskBand::from_risk(risk);
            let expected = if risk >= 70.0 {
                RiskBand::High
            } else if risk >= 30.0 {
                RiskBand::Medium
            } else {
                RiskBand::Low
            };
            assert_eq!(band, expected, "risk {}", risk);
        }
    }

    #[test]
    fn test_ringed_node_style() {
        let style = node_style(&node("B", 85.0, Some("R1")));
        assert_eq!(style.fill, HIGH_RISK_COLOR);
        assert_eq!(style.border.width, 4.0);
        assert_eq!(style.border.color, RING_ACCENT_COLOR);
        assert_eq!(style.border.opacity, 1.0);

        let plain = node_style(&node("A", 10.0, None));
        assert_eq!(plain.fill, LOW_RISK_COLOR);
        assert_eq!(plain.border.width, 2.0);
        assert_eq!(plain.border.opacity, 0.5);
    }

    #[test]
    fn test_edge_emphasis() {
        let model = DerivedGraphModel::build(&cycle_result()).unwrap();

        let ring_edge = edge_style(&model.edges()[0]);
        assert_eq!(ring_edge.width, 3.0);
        assert_eq!(ring_edge.line_color, RING_ACCENT_COLOR);
        assert_eq!(ring_edge.opacity, 1.0);

        let feeder = edge_style(&model.edges()[3]);
        assert_eq!(feeder.width, 1.5);
        assert_eq!(feeder.line_color, MUTED_EDGE_COLOR);
        assert_eq!(feeder.opacity, 0.8);
        assert_eq!(feeder.target_arrow, ArrowShape::Triangle);
    }

    #[test]
    fn test_headlines_and_legend() {
        assert_eq!(RiskBand::from_risk(85.0).headline(), "CRITICAL RISK");
        assert_eq!(RiskBand::from_risk(45.0).headline(), "ELEVATED RISK");
        assert_eq!(legend()[0], (RiskBand::High, HIGH_RISK_COLOR));
    }
}
