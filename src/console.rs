//! Event loop driving a session against the analysis engine
//!
//! Requests run as spawned tasks whose only effect is to send their outcome
//! back over a channel. State changes happen when the loop dispatches those
//! outcomes, one at a time, so the session is never touched concurrently.

use crate::client::AnalysisService;
use crate::config::ConsoleConfig;
use crate::drawer::{RequestToken, Resolution};
use crate::export;
use crate::render::TapTarget;
use crate::ring_summary::RingSelected;
use crate::session::SessionController;
use crate::upload::UploadFile;
use crate::{AnalysisResult, ForensicsError, TransportError};
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Reported when a request task dies without producing an outcome
pub const REQUEST_ABORTED: &str = "request task aborted";

/// Completed request, queued for the loop
#[derive(Debug, Clone)]
pub enum ConsoleEvent {
    UploadFinished {
        ticket_id: Uuid,
        outcome: Result<AnalysisResult, TransportError>,
    },
    ExplanationFinished {
        token: RequestToken,
        outcome: Result<String, TransportError>,
    },
}

/// What dispatching an event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// Upload finished; carries the resulting session state name
    Upload(&'static str),
    Explanation(Resolution),
}

pub struct Console {
    session: SessionController,
    service: Arc<dyn AnalysisService>,
    config: ConsoleConfig,
    events_tx: mpsc::UnboundedSender<ConsoleEvent>,
    events_rx: mpsc::UnboundedReceiver<ConsoleEvent>,
    in_flight: usize,
}

impl Console {
    pub fn new(service: Arc<dyn AnalysisService>, config: ConsoleConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            session: SessionController::with_config(&config),
            service,
            config,
            events_tx,
            events_rx,
            in_flight: 0,
        }
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Requests spawned but not yet dispatched
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start uploading `file`; the outcome arrives as an event
    pub fn submit_file(&mut self, file: UploadFile) -> Result<Uuid, ForensicsError> {
        let ticket = self.session.submit_file(file)?;
        let ticket_id = ticket.id;
        let service = Arc::clone(&self.service);

        self.spawn_request(
            async move { service.upload_transactions(&ticket.file).await },
            move |outcome| ConsoleEvent::UploadFinished { ticket_id, outcome },
        );
        Ok(ticket_id)
    }

    /// Route a tap; a node tap opens the drawer and requests its explanation
    pub fn tap(&mut self, target: &TapTarget) -> Result<Option<RequestToken>, ForensicsError> {
        let Some(ticket) = self.session.tap(target)? else {
            return Ok(None);
        };

        let token = ticket.token;
        let service = Arc::clone(&self.service);

        self.spawn_request(
            async move { service.explain_node(&ticket.request).await },
            move |outcome| ConsoleEvent::ExplanationFinished { token, outcome },
        );
        Ok(Some(token))
    }

    /// Run `request` on its own task and queue its outcome.
    ///
    /// A request task that panics or is cancelled still reports, as a
    /// network failure, so `in_flight` always drains.
    fn spawn_request<T, F, E>(&mut self, request: F, into_event: E)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, TransportError>> + Send + 'static,
        E: FnOnce(Result<T, TransportError>) -> ConsoleEvent + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let outcome = match tokio::spawn(request).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Request task aborted");
                    Err(TransportError::Network(REQUEST_ABORTED.to_string()))
                }
            };
            if tx.send(into_event(outcome)).is_err() {
                debug!("Console gone, request outcome dropped");
            }
        });
    }

    pub fn select_node(&mut self, id: &str) -> Result<Option<RequestToken>, ForensicsError> {
        self.tap(&TapTarget::Node(id.to_string()))
    }

    pub fn close_drawer(&mut self) {
        self.session.close_drawer();
    }

    pub fn reset(&mut self) -> Result<(), ForensicsError> {
        self.session.reset()
    }

    /// Emit a ring selection; nothing else reacts to it yet
    pub fn select_ring(&self, ring_id: &str) -> Result<Option<RingSelected>, ForensicsError> {
        let selected = self.session.select_ring(ring_id)?;
        if let Some(event) = &selected {
            info!(
                ring = %event.ring.ring_id,
                members = event.ring.member_accounts.len(),
                "Ring selected"
            );
        }
        Ok(selected)
    }

    /// Write the export document into the configured directory
    pub fn export(&self) -> Result<PathBuf, ForensicsError> {
        let document = self.session.export()?;
        export::write_to_dir(&document, &self.config.export_dir, Utc::now())
    }

    /// Apply one completed request to the session
    pub fn dispatch(&mut self, event: ConsoleEvent) -> Result<Dispatched, ForensicsError> {
        match event {
            ConsoleEvent::UploadFinished { ticket_id, outcome } => {
                let state = self.session.complete_upload(ticket_id, outcome)?;
                Ok(Dispatched::Upload(state.name()))
            }
            ConsoleEvent::ExplanationFinished { token, outcome } => Ok(Dispatched::Explanation(
                self.session.resolve_explanation(token, outcome),
            )),
        }
    }

    /// Wait for the next completed request and apply it.
    ///
    /// Returns `None` when nothing is in flight.
    pub async fn step(&mut self) -> Option<Result<Dispatched, ForensicsError>> {
        if self.in_flight == 0 {
            return None;
        }
        let event = self.events_rx.recv().await?;
        self.in_flight -= 1;

        let dispatched = self.dispatch(event);
        if let Err(e) = &dispatched {
            warn!(error = %e, "Event could not be applied");
        }
        Some(dispatched)
    }

    /// Drain every in-flight request
    pub async fn run_until_idle(&mut self) {
        while self.step().await.is_some() {}
    }
}
