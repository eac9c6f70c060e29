//! Tabular view of detected fraud rings

use crate::{FraudRing, PatternKind};
use serde::Serialize;

/// One table row per ring, in payload order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RingRow {
    pub ring_id: String,
    pub pattern_type: String,
    #[serde(skip)]
    pub pattern: PatternKind,
    pub member_count: usize,
    pub risk_score: f64,
    pub member_accounts: Vec<String>,
}

impl RingRow {
    /// Risk with one decimal, as shown in the table
    pub fn risk_display(&self) -> String {
        format!("{:.1}", self.risk_score)
    }

    pub fn members_display(&self) -> String {
        self.member_accounts.join(", ")
    }
}

/// Emitted when the analyst picks a ring row
#[derive(Debug, Clone, PartialEq)]
pub struct RingSelected {
    pub ring: FraudRing,
}

pub fn project(rings: &[FraudRing]) -> Vec<RingRow> {
    rings
        .iter()
        .map(|ring| RingRow {
            ring_id: ring.ring_id.clone(),
            pattern_type: ring.pattern_type.clone(),
            pattern: ring.pattern(),
            member_count: ring.member_accounts.len(),
            risk_score: ring.risk_score,
            member_accounts: ring.member_accounts.clone(),
        })
        .collect()
}

/// Ring table bound to one analysis
#[derive(Debug, Clone, Default)]
pub struct RingTable {
    rings: Vec<FraudRing>,
    rows: Vec<RingRow>,
}

impl RingTable {
    pub fn new(rings: &[FraudRing]) -> Self {
        Self {
            rings: rings.to_vec(),
            rows: project(rings),
        }
    }

    pub fn rows(&self) -> &[RingRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header badge, e.g. `3 RINGS IDENTIFIED`
    pub fn badge(&self) -> String {
        format!("{} RINGS IDENTIFIED", self.rows.len())
    }

    pub fn select(&self, ring_id: &str) -> Option<RingSelected> {
        self.rings
            .iter()
            .find(|r| r.ring_id == ring_id)
            .map(|ring| RingSelected { ring: ring.clone() })
    }
}
