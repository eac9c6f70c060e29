//! Investigation session state machine
//!
//! `Idle -> Uploading -> Analyzed | Error`, with `reset` returning to `Idle`.
//! The session owns the analysis payload together with everything derived
//! from it (graph model, ring table, rendered graph, open drawer) and
//! replaces or discards all of them in one step.

use crate::config::ConsoleConfig;
use crate::drawer::{ExplanationTicket, InvestigationDrawer, RequestToken, Resolution};
use crate::export::{self, ExportDocument};
use crate::graph_model::DerivedGraphModel;
use crate::layout::LayoutConfig;
use crate::render::{GraphEvent, GraphHost, GraphInstance, TapTarget};
use crate::ring_summary::{RingSelected, RingTable};
use crate::upload::UploadFile;
use crate::{
    AccountNode, AnalysisResult, AnalysisSummary, ForensicsError, IntegrityError, TransportError,
    UPLOAD_FALLBACK_MESSAGE,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

/// Upload request handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTicket {
    pub id: Uuid,
    pub file: UploadFile,
}

/// Everything held while a payload is on screen
#[derive(Debug)]
pub struct AnalyzedSession {
    session_id: Uuid,
    result: AnalysisResult,
    model: DerivedGraphModel,
    rings: RingTable,
    source_name: String,
    fingerprint: String,
    analyzed_at: DateTime<Utc>,
}

impl AnalyzedSession {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn model(&self) -> &DerivedGraphModel {
        &self.model
    }

    pub fn rings(&self) -> &RingTable {
        &self.rings
    }

    pub fn summary(&self) -> &AnalysisSummary {
        &self.result.summary
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// SHA-256 of the uploaded file
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn analyzed_at(&self) -> DateTime<Utc> {
        self.analyzed_at
    }
}

#[derive(Debug)]
pub enum SessionState {
    Idle,
    Uploading {
        ticket_id: Uuid,
        file_name: String,
        fingerprint: String,
        started_at: DateTime<Utc>,
    },
    Analyzed(Box<AnalyzedSession>),
    Error {
        message: String,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Uploading { .. } => "uploading",
            SessionState::Analyzed(_) => "analyzed",
            SessionState::Error { .. } => "error",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Top-level session controller
#[derive(Debug)]
pub struct SessionController {
    state: SessionState,
    drawer: InvestigationDrawer,
    graph: GraphHost,
    layout: LayoutConfig,
    upload_fallback: String,
}

impl SessionController {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            drawer: InvestigationDrawer::new(),
            graph: GraphHost::new(),
            layout: LayoutConfig::default(),
            upload_fallback: UPLOAD_FALLBACK_MESSAGE.to_string(),
        }
    }

    pub fn with_config(config: &ConsoleConfig) -> Self {
        Self {
            state: SessionState::Idle,
            drawer: InvestigationDrawer::with_fallback(config.explanation_fallback_message.clone()),
            graph: GraphHost::new(),
            layout: config.layout.clone(),
            upload_fallback: config.upload_fallback_message.clone(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Upload control is only enabled when no upload is in flight and no
    /// analysis is on screen
    pub fn upload_enabled(&self) -> bool {
        matches!(self.state, SessionState::Idle | SessionState::Error { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Error { message } => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<&AnalyzedSession> {
        match &self.state {
            SessionState::Analyzed(session) => Some(&**session),
            _ => None,
        }
    }

    pub fn graph(&self) -> Option<&GraphInstance> {
        self.graph.instance()
    }

    pub fn graph_host(&self) -> &GraphHost {
        &self.graph
    }

    pub fn drawer(&self) -> &InvestigationDrawer {
        &self.drawer
    }

    fn invalid(&self, action: &str) -> ForensicsError {
        ForensicsError::InvalidTransition {
            state: self.state.name().to_string(),
            action: action.to_string(),
        }
    }

    /// Start an upload; valid from `Idle` and `Error`
    pub fn submit_file(&mut self, file: UploadFile) -> Result<UploadTicket, ForensicsError> {
        if !self.upload_enabled() {
            return Err(self.invalid("upload a file"));
        }
        file.precheck()?;

        let ticket = UploadTicket {
            id: Uuid::new_v4(),
            file,
        };
        info!(
            ticket = %ticket.id,
            file = %ticket.file.name(),
            bytes = ticket.file.len(),
            "Upload started"
        );
        self.state = SessionState::Uploading {
            ticket_id: ticket.id,
            file_name: ticket.file.name().to_string(),
            fingerprint: ticket.file.fingerprint(),
            started_at: Utc::now(),
        };
        Ok(ticket)
    }

    /// Finish the in-flight upload with the engine's outcome
    pub fn complete_upload(
        &mut self,
        ticket_id: Uuid,
        outcome: Result<AnalysisResult, TransportError>,
    ) -> Result<&SessionState, ForensicsError> {
        let (file_name, fingerprint) = match &self.state {
            SessionState::Uploading {
                ticket_id: current,
                file_name,
                fingerprint,
                ..
            } if *current == ticket_id => (file_name.clone(), fingerprint.clone()),
            _ => return Err(self.invalid("complete an upload")),
        };

        match outcome {
            Ok(result) => {
                if let Err(e) = self.enter_analyzed(result, file_name, fingerprint) {
                    warn!(error = %e, "Analysis payload failed integrity check");
                    self.enter_error(format!("Analysis rejected: {}", e));
                }
            }
            Err(e) => {
                warn!(error = %e, "Upload failed");
                let message = e.user_message(&self.upload_fallback);
                self.enter_error(message);
            }
        }

        Ok(&self.state)
    }

    fn enter_analyzed(
        &mut self,
        mut result: AnalysisResult,
        source_name: String,
        fingerprint: String,
    ) -> Result<(), IntegrityError> {
        result.normalize();
        result.validate()?;
        let model = DerivedGraphModel::build(&result)?;
        let rings = RingTable::new(&result.fraud_rings);

        self.drawer.close();
        self.graph.mount(&model, &self.layout);

        let session = AnalyzedSession {
            session_id: Uuid::new_v4(),
            result,
            model,
            rings,
            source_name,
            fingerprint,
            analyzed_at: Utc::now(),
        };
        info!(
            session = %session.session_id,
            accounts = session.result.summary.total_accounts_analyzed,
            rings = session.result.summary.fraud_rings_detected,
            "Analysis ready"
        );
        self.state = SessionState::Analyzed(Box::new(session));
        Ok(())
    }

    fn enter_error(&mut self, message: String) {
        self.drawer.close();
        self.graph.teardown();
        self.state = SessionState::Error { message };
    }

    /// Discard the analysis and everything derived from it
    pub fn reset(&mut self) -> Result<(), ForensicsError> {
        if matches!(self.state, SessionState::Uploading { .. }) {
            return Err(self.invalid("reset"));
        }
        self.drawer.close();
        self.graph.teardown();
        if !matches!(self.state, SessionState::Idle) {
            info!(from = %self.state, "Session reset");
        }
        self.state = SessionState::Idle;
        Ok(())
    }

    /// Route a tap on the graph; node taps open the drawer
    pub fn tap(&mut self, target: &TapTarget) -> Result<Option<ExplanationTicket>, ForensicsError> {
        if self.analysis().is_none() {
            return Err(self.invalid("select a node"));
        }
        Ok(self.graph.tap(target).map(|event| match event {
            GraphEvent::NodeSelected(node) => self.drawer.open(node),
        }))
    }

    pub fn select_node(&mut self, id: &str) -> Result<Option<ExplanationTicket>, ForensicsError> {
        self.tap(&TapTarget::Node(id.to_string()))
    }

    pub fn resolve_explanation(
        &mut self,
        token: RequestToken,
        outcome: Result<String, TransportError>,
    ) -> Resolution {
        self.drawer.resolve(token, outcome)
    }

    pub fn close_drawer(&mut self) {
        self.drawer.close();
    }

    pub fn select_ring(&self, ring_id: &str) -> Result<Option<RingSelected>, ForensicsError> {
        self.analysis()
            .map(|session| session.rings.select(ring_id))
            .ok_or_else(|| self.invalid("select a ring"))
    }

    pub fn search_nodes(&self, query: &str) -> Vec<&AccountNode> {
        self.analysis()
            .map(|session| session.model.search(query))
            .unwrap_or_default()
    }

    /// Export document; only offered while analyzed
    pub fn export(&self) -> Result<ExportDocument, ForensicsError> {
        self.analysis()
            .map(|session| export::serialize(&session.result))
            .ok_or_else(|| self.invalid("export"))
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}
