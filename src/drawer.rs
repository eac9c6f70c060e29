//! Investigation drawer for a selected account
//!
//! Every selection bumps a request token. An explanation outcome is only
//! applied when it carries the current token of an open drawer, so a slow
//! response for an earlier selection can never overwrite a later one.

use crate::client::ExplainRequest;
use crate::visual::RiskBand;
use crate::{AccountNode, TransportError};
use tracing::{debug, info, warn};

/// Text shown when the explanation request fails
pub const EXPLANATION_FALLBACK: &str = "Failed to generate AI explanation.";

/// Monotonically increasing selection token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Explanation {
    Pending,
    Ready(String),
    /// Request failed, fallback text shown
    Failed(String),
}

impl Explanation {
    /// Text to display, `None` while pending
    pub fn text(&self) -> Option<&str> {
        match self {
            Explanation::Pending => None,
            Explanation::Ready(text) | Explanation::Failed(text) => Some(text),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawerPhase {
    Closed,
    Loading,
    Ready,
    Failed,
}

/// Drawer contents while an account is selected
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedNodeContext {
    pub node: AccountNode,
    pub explanation: Explanation,
    pub token: RequestToken,
}

impl SelectedNodeContext {
    pub fn band(&self) -> RiskBand {
        RiskBand::from_risk(self.node.risk)
    }

    /// Drawer title, e.g. `NODE_ACC1`
    pub fn title(&self) -> String {
        format!("NODE_{}", self.node.id)
    }
}

/// Explanation request issued for a selection
#[derive(Debug, Clone, PartialEq)]
pub struct ExplanationTicket {
    pub token: RequestToken,
    pub request: ExplainRequest,
}

/// Whether an explanation outcome reached the drawer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Applied,
    Stale,
}

/// Drawer state machine: Closed -> Loading -> Ready | Failed -> Closed
#[derive(Debug)]
pub struct InvestigationDrawer {
    last_token: u64,
    current: Option<SelectedNodeContext>,
    fallback: String,
}

impl InvestigationDrawer {
    pub fn new() -> Self {
        Self::with_fallback(EXPLANATION_FALLBACK)
    }

    pub fn with_fallback(fallback: impl Into<String>) -> Self {
        Self {
            last_token: 0,
            current: None,
            fallback: fallback.into(),
        }
    }

    /// Open the drawer on `node`, superseding any previous selection
    pub fn open(&mut self, node: AccountNode) -> ExplanationTicket {
        self.last_token += 1;
        let token = RequestToken(self.last_token);
        let request = ExplainRequest::for_node(&node);

        if let Some(previous) = &self.current {
            debug!(
                superseded = %previous.token,
                node = %previous.node.id,
                "Selection superseded"
            );
        }
        info!(token = %token, node = %node.id, "Investigating account");

        self.current = Some(SelectedNodeContext {
            node,
            explanation: Explanation::Pending,
            token,
        });

        ExplanationTicket { token, request }
    }

    /// Apply an explanation outcome if `token` is still current
    pub fn resolve(
        &mut self,
        token: RequestToken,
        outcome: Result<String, TransportError>,
    ) -> Resolution {
        let context = match self.current.as_mut() {
            Some(context) if context.token == token => context,
            _ => {
                debug!(token = %token, "Discarding stale explanation");
                return Resolution::Stale;
            }
        };

        context.explanation = match outcome {
            Ok(text) => Explanation::Ready(text),
            Err(e) => {
                warn!(token = %token, node = %context.node.id, error = %e, "Explanation request failed");
                Explanation::Failed(self.fallback.clone())
            }
        };
        Resolution::Applied
    }

    pub fn close(&mut self) {
        if let Some(context) = self.current.take() {
            debug!(token = %context.token, node = %context.node.id, "Drawer closed");
        }
    }

    pub fn phase(&self) -> DrawerPhase {
        match self.current.as_ref().map(|c| &c.explanation) {
            None => DrawerPhase::Closed,
            Some(Explanation::Pending) => DrawerPhase::Loading,
            Some(Explanation::Ready(_)) => DrawerPhase::Ready,
            Some(Explanation::Failed(_)) => DrawerPhase::Failed,
        }
    }

    pub fn context(&self) -> Option<&SelectedNodeContext> {
        self.current.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_token(&self) -> Option<RequestToken> {
        self.current.as_ref().map(|c| c.token)
    }
}

impl Default for InvestigationDrawer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::node;

    #[test]
    fn test_open_shows_static_data_and_loads() {
        let mut drawer = InvestigationDrawer::new();
        assert_eq!(drawer.phase(), DrawerPhase::Closed);

        let ticket = drawer.open(node("B", 85.0, Some("R1")));
        assert_eq!(drawer.phase(), DrawerPhase::Loading);
        assert_eq!(ticket.request.node_id, "B");
        assert_eq!(ticket.request.risk_score, 85.0);

        let context = drawer.context().unwrap();
        assert_eq!(context.node.risk, 85.0);
        assert_eq!(context.title(), "NODE_B");
        assert_eq!(context.band(), RiskBand::High);
        assert_eq!(context.explanation.text(), None);
    }

    #[test]
    fn test_tokens_increase() {
        let mut drawer = InvestigationDrawer::new();
        let first = drawer.open(node("A", 1.0, None)).token;
        drawer.close();
        let second = drawer.open(node("A", 1.0, None)).token;
        assert!(second > first);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let mut drawer = InvestigationDrawer::new();
        let n1 = drawer.open(node("N1", 20.0, None)).token;
        let n2 = drawer.open(node("N2", 75.0, None)).token;

        assert_eq!(
            drawer.resolve(n2, Ok("N2 explanation".to_string())),
            Resolution::Applied
        );
        assert_eq!(
            drawer.resolve(n1, Ok("N1 explanation".to_string())),
            Resolution::Stale
        );

        let context = drawer.context().unwrap();
        assert_eq!(context.node.id, "N2");
        assert_eq!(context.explanation.text(), Some("N2 explanation"));
    }

    #[test]
    fn test_stale_response_while_newer_pending() {
        let mut drawer = InvestigationDrawer::new();
        let n1 = drawer.open(node("N1", 20.0, None)).token;
        drawer.open(node("N2", 75.0, None));

        assert_eq!(drawer.resolve(n1, Ok("late".to_string())), Resolution::Stale);
        assert_eq!(drawer.phase(), DrawerPhase::Loading);
        assert_eq!(drawer.context().unwrap().node.id, "N2");
    }

    #[test]
    fn test_failure_shows_fallback_and_stays_open() {
        let mut drawer = InvestigationDrawer::new();
        let token = drawer.open(node("B", 85.0, Some("R1"))).token;

        drawer.resolve(token, Err(TransportError::Timeout));
        assert_eq!(drawer.phase(), DrawerPhase::Failed);
        assert_eq!(
            drawer.context().unwrap().explanation.text(),
            Some(EXPLANATION_FALLBACK)
        );
    }

    #[test]
    fn test_close_before_resolution() {
        let mut drawer = InvestigationDrawer::new();
        let token = drawer.open(node("B", 85.0, Some("R1"))).token;
        drawer.close();

        assert_eq!(drawer.resolve(token, Ok("late".to_string())), Resolution::Stale);
        assert_eq!(drawer.phase(), DrawerPhase::Closed);
        assert!(drawer.context().is_none());
    }
}
