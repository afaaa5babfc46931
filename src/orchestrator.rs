//! Single-flight download coordination.
//!
//! The session moves `Idle -> Running -> Idle`; the [`Outcome`] returned by
//! [`Orchestrator::pump`] says whether the run succeeded or failed. Only the
//! UI context mutates the session: the background task reports back over a
//! channel that `pump` drains once per frame.

use std::{path::Path, sync::Arc};

use tokio::{
    runtime::Handle,
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::config::DownloadConfig;
use crate::dialogs::Surface;
use crate::downloader::Engine;
use crate::error::{EngineError, ValidationError};
use crate::model::{
    DOWNLOAD_LABEL, Phase, READY_STATUS, RETRY_LABEL, RUNNING_LABEL, Session, StatusTone,
};
use crate::progress::{ProgressRelay, ProgressUpdate};

pub const STARTING_STATUS: &str = "Starting...";
pub const SUCCESS_STATUS: &str = "Success! Download Complete.";
pub const ERROR_STATUS: &str = "Error occurred.";

/// Sent from the background task to the UI context
#[derive(Debug)]
pub enum WorkerMessage {
    Progress(ProgressUpdate),
    Finished(Result<(), EngineError>),
}

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    /// `retry` is the user's answer to the retry prompt
    Failed { retry: bool },
}

/// Posts `Finished` exactly once, even when the engine panics.
struct OutcomeGuard {
    tx: UnboundedSender<WorkerMessage>,
    sent: bool,
}

impl OutcomeGuard {
    fn finish(mut self, outcome: Result<(), EngineError>) {
        self.sent = true;
        let _ = self.tx.send(WorkerMessage::Finished(outcome));
    }
}

impl Drop for OutcomeGuard {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(WorkerMessage::Finished(Err(EngineError::Aborted)));
        }
    }
}

/// Handle to the background task of one download.
///
/// There is no way to abort a download: once started it runs until the engine
/// returns. Dropping the handle detaches the task.
pub struct DownloadHandle {
    join: JoinHandle<()>,
}

impl DownloadHandle {
    /// True once the worker has posted its outcome
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Resolves after the worker has posted its outcome
    pub async fn wait(self) {
        if let Err(err) = self.join.await {
            warn!(%err, "download task ended abnormally");
        }
    }
}

pub struct Orchestrator<E: Engine> {
    engine: Arc<E>,
    runtime: Handle,
    tx: UnboundedSender<WorkerMessage>,
    rx: UnboundedReceiver<WorkerMessage>,
}

impl<E: Engine> Orchestrator<E> {
    pub fn new(engine: E, runtime: Handle) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            engine: Arc::new(engine),
            runtime,
            tx,
            rx,
        }
    }

    /// Starts a download for the session's current choices.
    ///
    /// Refused while another download is running, when the link is empty, or
    /// when no folder is chosen, checked in that order. A refusal shows an
    /// error dialog and leaves the session untouched.
    pub fn start(
        &self,
        session: &mut Session,
        surface: &mut dyn Surface,
    ) -> Result<DownloadHandle, ValidationError> {
        let destination = match validate(session) {
            Ok(folder) => folder.to_path_buf(),
            Err(err) => {
                warn!(%err, "download refused");
                surface.show_error("Error", &err.to_string());
                return Err(err);
            }
        };

        let url = session.url.trim().to_owned();
        let config = DownloadConfig::build(session.format_kind, session.resolution, &destination);

        session.phase = Phase::Running;
        session.action_label = RUNNING_LABEL.to_string();
        session.progress = 0.0;
        session.set_status(STARTING_STATUS, StatusTone::Neutral);
        info!(%url, folder = %destination.display(), kind = ?session.format_kind, "download started");

        let engine = Arc::clone(&self.engine);
        let tx = self.tx.clone();
        let join = self.runtime.spawn(async move {
            let guard = OutcomeGuard {
                tx: tx.clone(),
                sent: false,
            };
            let relay = ProgressRelay::new(tx);
            let outcome = engine.download(&url, &config, &relay).await;
            guard.finish(outcome);
        });

        Ok(DownloadHandle { join })
    }

    /// Applies everything the worker has reported so far, in order. Returns
    /// how the run ended if its outcome was among the messages.
    pub fn pump(&mut self, session: &mut Session, surface: &mut dyn Surface) -> Option<Outcome> {
        let mut ended = None;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                WorkerMessage::Progress(update) => update.apply(session),
                WorkerMessage::Finished(outcome) => {
                    ended = Some(complete(session, outcome, surface));
                }
            }
        }
        ended
    }
}

fn validate(session: &Session) -> Result<&Path, ValidationError> {
    if session.in_progress() {
        return Err(ValidationError::AlreadyRunning);
    }
    if session.url.trim().is_empty() {
        return Err(ValidationError::EmptyLink);
    }
    match session.destination.as_deref() {
        Some(folder) if !folder.as_os_str().is_empty() => Ok(folder),
        _ => Err(ValidationError::NoDestination),
    }
}

fn complete(
    session: &mut Session,
    outcome: Result<(), EngineError>,
    surface: &mut dyn Surface,
) -> Outcome {
    session.phase = Phase::Idle;
    match outcome {
        Ok(()) => {
            info!("download complete");
            session.set_status(SUCCESS_STATUS, StatusTone::Success);
            surface.show_info("Success", "Download and Conversion Complete!");
            session.action_label = DOWNLOAD_LABEL.to_string();
            Outcome::Succeeded
        }
        Err(err) => {
            warn!(%err, "download failed");
            session.set_status(ERROR_STATUS, StatusTone::Error);
            let retry = surface.ask_retry(
                "Error",
                &format!("Download failed:\n{}\n\nDo you want to retry?", err),
            );
            if retry {
                // The link stays so the same download can be attempted again.
                session.progress = 0.0;
                session.set_status(READY_STATUS, StatusTone::Neutral);
                session.action_label = RETRY_LABEL.to_string();
            } else {
                session.action_label = DOWNLOAD_LABEL.to_string();
            }
            Outcome::Failed { retry }
        }
    }
}

/// Clears the link, progress and status. Ignored while a download is running.
pub fn reset(session: &mut Session) -> bool {
    if session.in_progress() {
        return false;
    }
    session.url.clear();
    session.progress = 0.0;
    session.set_status(READY_STATUS, StatusTone::Neutral);
    session.action_label = DOWNLOAD_LABEL.to_string();
    session.phase = Phase::Idle;
    true
}
