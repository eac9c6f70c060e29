//! # Forensics Console
//!
//! Investigation core for reviewing the output of an external fraud-analysis
//! engine: transaction graph, detected fraud rings, per-account drill-down and
//! JSON export.
//!
//! ## Features
//!
//! - **Session Lifecycle**: Idle / Uploading / Analyzed / Error state machine
//! - **Integrity Checks**: Analysis payloads are validated before anything is rendered
//! - **Graph Model**: Ring-aware edges, neighbourhoods, components and node search
//! - **Visual Mapping**: Pure risk-to-style mapping with a deterministic layout
//! - **Investigation Drawer**: Token-guarded explanation requests, stale results are dropped
//! - **Ring Summary & Export**: Tabular ring view and the canonical export document

pub mod client;
pub mod config;
pub mod console;
pub mod drawer;
pub mod export;
pub mod graph_model;
pub mod layout;
pub mod logging;
pub mod render;
pub mod ring_summary;
pub mod session;
pub mod upload;
pub mod visual;

pub use client::{AnalysisService, ExplainRequest, HttpAnalysisClient};
pub use config::ConsoleConfig;
pub use console::{Console, ConsoleEvent};
pub use drawer::{DrawerPhase, Explanation, InvestigationDrawer, RequestToken, Resolution};
pub use export::ExportDocument;
pub use graph_model::{DerivedEdge, DerivedGraphModel};
pub use render::{GraphEvent, GraphHost, GraphInstance, TapTarget};
pub use ring_summary::{RingRow, RingSelected, RingTable};
pub use session::{SessionController, SessionState, UploadTicket};
pub use upload::UploadFile;
pub use visual::RiskBand;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Value the analysis engine uses for "not part of any ring"
pub const RING_NONE: &str = "NONE";

/// Message shown when an upload fails without a usable detail
pub const UPLOAD_FALLBACK_MESSAGE: &str = "Connection to engine failed";

/// Transport failures talking to the analysis engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Engine rejected request with status {status}")]
    Rejected { status: u16, detail: Option<String> },

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Response could not be decoded: {0}")]
    Decode(String),
}

impl TransportError {
    /// Message for the analyst: server detail verbatim, else `fallback`
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            TransportError::Rejected {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            TransportError::Decode(reason) => {
                format!("Analysis response could not be decoded: {}", reason)
            }
            _ => fallback.to_string(),
        }
    }
}

/// Violations of the analysis payload invariants
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("Duplicate ring id: {0}")]
    DuplicateRing(String),

    #[error("Edge #{edge_index} references unknown node '{node_id}'")]
    UnknownEdgeEndpoint { edge_index: usize, node_id: String },

    #[error("Edge #{edge_index} has invalid amount {amount}")]
    InvalidAmount { edge_index: usize, amount: f64 },

    #[error("Node '{node_id}' references unknown ring '{ring_id}'")]
    UnknownRing { node_id: String, ring_id: String },

    #[error("Ring '{ring_id}' lists unknown member '{account_id}'")]
    UnknownRingMember { ring_id: String, account_id: String },

    #[error("Risk score of '{entity}' is not a finite number")]
    NonFiniteRisk { entity: String },
}

/// Top-level errors
#[derive(Error, Debug)]
pub enum ForensicsError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Data integrity error: {0}")]
    DataIntegrity(#[from] IntegrityError),

    #[error("Invalid input: {0}")]
    UserInput(String),

    #[error("Cannot {action} while session is {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Degree metrics computed by the engine for one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub in_degree: u32,
    pub out_degree: u32,
    pub degree: u32,
}

/// Account node in the analyzed transaction graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "risk_score", alias = "risk")]
    pub risk: f64,
    #[serde(default, with = "ring_sentinel")]
    pub ring_id: Option<String>,
    #[serde(default)]
    pub metrics: NodeMetrics,
}

impl AccountNode {
    /// Check if the account belongs to a detected ring
    pub fn is_ringed(&self) -> bool {
        self.ring_id.is_some()
    }
}

/// Directed money movement between two accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEdge {
    pub source: String,
    pub target: String,
    pub amount: f64,
}

/// Coarse classification of a ring's `pattern_type` label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Money moving in a circle back to origin
    Cycle,
    /// Many-to-one or one-to-many hub (smurfing, star)
    FanOut,
    Other,
}

impl PatternKind {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "cycle" => PatternKind::Cycle,
            "fan-out" | "fan_out" | "fan-in" | "star" | "smurfing" => PatternKind::FanOut,
            _ => PatternKind::Other,
        }
    }
}

impl std::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternKind::Cycle => write!(f, "cycle"),
            PatternKind::FanOut => write!(f, "fan-out"),
            PatternKind::Other => write!(f, "other"),
        }
    }
}

/// Detected fraud ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudRing {
    pub ring_id: String,
    /// Label exactly as sent by the engine
    pub pattern_type: String,
    pub member_accounts: Vec<String>,
    pub risk_score: f64,
}

impl FraudRing {
    pub fn pattern(&self) -> PatternKind {
        PatternKind::from_label(&self.pattern_type)
    }
}

/// Flagged account as listed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousAccount {
    pub account_id: String,
    pub suspicion_score: f64,
    #[serde(default)]
    pub detected_patterns: Vec<String>,
    #[serde(default, with = "ring_sentinel")]
    pub ring_id: Option<String>,
}

/// Run summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_accounts_analyzed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspicious_accounts_flagged: Option<u64>,
    pub fraud_rings_detected: u64,
    pub processing_time_seconds: f64,
}

/// Analysis payload returned by the engine for one uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub nodes: Vec<AccountNode>,
    pub edges: Vec<TransactionEdge>,
    #[serde(default)]
    pub suspicious_accounts: Vec<SuspiciousAccount>,
    pub fraud_rings: Vec<FraudRing>,
    pub summary: AnalysisSummary,
}

impl AnalysisResult {
    /// Bring engine scoring into display range.
    ///
    /// Finite risk scores are clamped to `[0, 100]` and repeated ring members
    /// are collapsed, keeping the first occurrence. Non-finite scores are left
    /// for `validate` to reject. Returns the number of adjusted values.
    pub fn normalize(&mut self) -> usize {
        let mut adjusted = 0;

        for node in &mut self.nodes {
            if let Some(clamped) = clamp_risk(node.risk) {
                warn!(account = %node.id, risk = node.risk, clamped, "Account risk outside [0, 100], clamped");
                node.risk = clamped;
                adjusted += 1;
            }
        }

        for ring in &mut self.fraud_rings {
            if let Some(clamped) = clamp_risk(ring.risk_score) {
                warn!(ring = %ring.ring_id, risk = ring.risk_score, clamped, "Ring risk outside [0, 100], clamped");
                ring.risk_score = clamped;
                adjusted += 1;
            }

            let before = ring.member_accounts.len();
            let mut seen = HashSet::with_capacity(before);
            ring.member_accounts.retain(|id| seen.insert(id.clone()));
            let removed = before - ring.member_accounts.len();
            if removed > 0 {
                warn!(ring = %ring.ring_id, removed, "Repeated ring members collapsed");
                adjusted += removed;
            }
        }

        adjusted
    }

    /// Check the payload invariants, reporting the first violation
    pub fn validate(&self) -> Result<(), IntegrityError> {
        let mut node_ids: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !node_ids.insert(node.id.as_str()) {
                return Err(IntegrityError::DuplicateNode(node.id.clone()));
            }
            check_risk(&node.id, node.risk)?;
        }

        for (edge_index, edge) in self.edges.iter().enumerate() {
            for endpoint in [&edge.source, &edge.target] {
                if !node_ids.contains(endpoint.as_str()) {
                    return Err(IntegrityError::UnknownEdgeEndpoint {
                        edge_index,
                        node_id: endpoint.clone(),
                    });
                }
            }
            if !edge.amount.is_finite() || edge.amount < 0.0 {
                return Err(IntegrityError::InvalidAmount {
                    edge_index,
                    amount: edge.amount,
                });
            }
        }

        let mut ring_ids: HashSet<&str> = HashSet::with_capacity(self.fraud_rings.len());
        for ring in &self.fraud_rings {
            if !ring_ids.insert(ring.ring_id.as_str()) {
                return Err(IntegrityError::DuplicateRing(ring.ring_id.clone()));
            }
            check_risk(&ring.ring_id, ring.risk_score)?;

            for account_id in &ring.member_accounts {
                if !node_ids.contains(account_id.as_str()) {
                    return Err(IntegrityError::UnknownRingMember {
                        ring_id: ring.ring_id.clone(),
                        account_id: account_id.clone(),
                    });
                }
            }
        }

        for node in &self.nodes {
            if let Some(ring_id) = &node.ring_id {
                if !ring_ids.contains(ring_id.as_str()) {
                    return Err(IntegrityError::UnknownRing {
                        node_id: node.id.clone(),
                        ring_id: ring_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Parse an engine response body
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn ring(&self, ring_id: &str) -> Option<&FraudRing> {
        self.fraud_rings.iter().find(|r| r.ring_id == ring_id)
    }
}

fn check_risk(entity: &str, value: f64) -> Result<(), IntegrityError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(IntegrityError::NonFiniteRisk {
            entity: entity.to_string(),
        })
    }
}

/// Clamped value when a finite `risk` lies outside `[0, 100]`
fn clamp_risk(risk: f64) -> Option<f64> {
    let clamped = risk.clamp(0.0, 100.0);
    (risk.is_finite() && clamped != risk).then_some(clamped)
}

/// Maps the engine's `"NONE"` ring sentinel to `None` and back
mod ring_sentinel {
    use super::RING_NONE;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value.as_deref().unwrap_or(RING_NONE))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.filter(|id| !id.is_empty() && id != RING_NONE))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn node(id: &str, risk: f64, ring_id: Option<&str>) -> AccountNode {
        AccountNode {
            id: id.to_string(),
            label: id.to_string(),
            risk,
            ring_id: ring_id.map(str::to_string),
            metrics: NodeMetrics::default(),
        }
    }

    pub fn edge(source: &str, target: &str, amount: f64) -> TransactionEdge {
        TransactionEdge {
            source: source.to_string(),
            target: target.to_string(),
            amount,
        }
    }

    pub fn ring(ring_id: &str, pattern_type: &str, members: &[&str], risk_score: f64) -> FraudRing {
        FraudRing {
            ring_id: ring_id.to_string(),
            pattern_type: pattern_type.to_string(),
            member_accounts: members.iter().map(|m| m.to_string()).collect(),
            risk_score,
        }
    }

    pub fn summary(accounts: u64, rings: u64) -> AnalysisSummary {
        AnalysisSummary {
            total_accounts_analyzed: accounts,
            suspicious_accounts_flagged: None,
            fraud_rings_detected: rings,
            processing_time_seconds: 0.5,
        }
    }

    /// A(10, unringed) -> B(85, R1)
    pub fn two_node_result() -> AnalysisResult {
        AnalysisResult {
            nodes: vec![node("A", 10.0, None), node("B", 85.0, Some("R1"))],
            edges: vec![edge("A", "B", 100.0)],
            suspicious_accounts: Vec::new(),
            fraud_rings: vec![ring("R1", "cycle", &["B"], 85.0)],
            summary: summary(2, 1),
        }
    }

    /// Ring R1 = X -> Y -> Z -> X, plus a low-risk feeder W -> X
    pub fn cycle_result() -> AnalysisResult {
        AnalysisResult {
            nodes: vec![
                node("X", 85.0, Some("R1")),
                node("Y", 72.0, Some("R1")),
                node("Z", 40.0, Some("R1")),
                node("W", 5.0, None),
            ],
            edges: vec![
                edge("X", "Y", 500.0),
                edge("Y", "Z", 480.0),
                edge("Z", "X", 470.0),
                edge("W", "X", 20.0),
            ],
            suspicious_accounts: vec![SuspiciousAccount {
                account_id: "X".to_string(),
                suspicion_score: 85.0,
                detected_patterns: vec!["cycle".to_string()],
                ring_id: Some("R1".to_string()),
            }],
            fraud_rings: vec![ring("R1", "cycle", &["X", "Y", "Z"], 91.5)],
            summary: summary(4, 1),
        }
    }
}
