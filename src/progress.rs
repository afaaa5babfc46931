use tokio::sync::mpsc::UnboundedSender;

use crate::downloader::ProgressHook;
use crate::model::{ProgressEvent, Session, StatusTone};
use crate::orchestrator::WorkerMessage;

/// Template passed to `--progress-template`; each progress report becomes one stdout line
pub const PROGRESS_TEMPLATE: &str =
    "download:ytconvert|%(progress.status)s|%(progress._percent_str)s|%(progress.eta)s";

const MARKER: &str = "ytconvert|";

pub const POSTPROCESSING_STATUS: &str = "Conversion in progress... (This may take a moment)";

/// Turns one engine stdout line into a progress event, if it is one
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    let idx = line.find(MARKER)?;
    let mut fields = line[idx + MARKER.len()..].splitn(3, '|');
    let status = fields.next()?.trim();
    let percent = fields.next().unwrap_or("").to_owned();
    let eta_seconds = fields.next().and_then(|eta| eta.trim().parse::<u64>().ok());

    match status {
        "downloading" => Some(ProgressEvent::Downloading { percent, eta_seconds }),
        "finished" => Some(ProgressEvent::Finished),
        _ => None,
    }
}

/// What the progress bar and status label should show after an event
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub ratio: f32,
    pub status: String,
    pub tone: StatusTone,
}

impl ProgressUpdate {
    /// Maps an event onto the display. A percent that does not parse yields `None`.
    pub fn from_event(event: &ProgressEvent) -> Option<Self> {
        match event {
            ProgressEvent::Downloading { percent, eta_seconds } => {
                let text = percent.trim().trim_end_matches('%').trim();
                let value = text.parse::<f32>().ok().filter(|v| v.is_finite())?;
                let eta = eta_seconds
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "?".to_string());
                Some(Self {
                    ratio: (value / 100.0).clamp(0.0, 1.0),
                    status: format!("Downloading: {}% | ETA: {}s", text, eta),
                    tone: StatusTone::Neutral,
                })
            }
            ProgressEvent::Finished => Some(Self {
                ratio: 1.0,
                status: POSTPROCESSING_STATUS.to_string(),
                tone: StatusTone::Working,
            }),
        }
    }

    pub fn apply(&self, session: &mut Session) {
        session.progress = self.ratio;
        session.set_status(self.status.clone(), self.tone);
    }
}

/// Forwards display updates from the worker to the UI context
pub struct ProgressRelay {
    tx: UnboundedSender<WorkerMessage>,
}

impl ProgressRelay {
    pub fn new(tx: UnboundedSender<WorkerMessage>) -> Self {
        Self { tx }
    }
}

impl ProgressHook for ProgressRelay {
    fn on_progress(&self, event: &ProgressEvent) {
        if let Some(update) = ProgressUpdate::from_event(event) {
            // The window may already be gone.
            let _ = self.tx.send(WorkerMessage::Progress(update));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn downloading(percent: &str, eta: Option<u64>) -> ProgressEvent {
        ProgressEvent::Downloading {
            percent: percent.to_string(),
            eta_seconds: eta,
        }
    }

    #[test]
    fn parses_downloading_line() {
        let event = parse_progress_line("ytconvert|downloading|  42.3%|17");
        assert_eq!(event, Some(downloading("  42.3%", Some(17))));
    }

    #[test]
    fn parses_finished_line() {
        assert_eq!(
            parse_progress_line("ytconvert|finished|100.0%|NA"),
            Some(ProgressEvent::Finished)
        );
    }

    #[test]
    fn unknown_eta_is_none() {
        let event = parse_progress_line("ytconvert|downloading|  3.0%|NA");
        assert_eq!(event, Some(downloading("  3.0%", None)));
    }

    #[test]
    fn other_lines_are_not_progress() {
        assert_eq!(parse_progress_line("[youtube] abc123: Downloading webpage"), None);
        assert_eq!(parse_progress_line("ytconvert|error|N/A|NA"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn ratio_is_percent_over_hundred() {
        for (text, expected) in [("0%", 0.0), ("25%", 0.25), (" 42.5%", 0.425), ("100%", 1.0)] {
            let update = ProgressUpdate::from_event(&downloading(text, Some(3))).unwrap();
            assert!((update.ratio - expected).abs() < 1e-6, "{text}");
        }
    }

    #[test]
    fn ratio_is_clamped() {
        let update = ProgressUpdate::from_event(&downloading("130%", None)).unwrap();
        assert_eq!(update.ratio, 1.0);
        let update = ProgressUpdate::from_event(&downloading("-5%", None)).unwrap();
        assert_eq!(update.ratio, 0.0);
    }

    #[test]
    fn status_text_shows_eta_or_placeholder() {
        let update = ProgressUpdate::from_event(&downloading(" 42.3%", Some(12))).unwrap();
        assert_eq!(update.status, "Downloading: 42.3% | ETA: 12s");
        let update = ProgressUpdate::from_event(&downloading("7%", None)).unwrap();
        assert_eq!(update.status, "Downloading: 7% | ETA: ?s");
    }

    #[test]
    fn malformed_percent_is_ignored() {
        for text in ["N/A", "", "abc%", "nan%"] {
            assert_eq!(ProgressUpdate::from_event(&downloading(text, None)), None, "{text}");
        }
    }

    #[test]
    fn finished_means_postprocessing() {
        let update = ProgressUpdate::from_event(&ProgressEvent::Finished).unwrap();
        assert_eq!(update.ratio, 1.0);
        assert_eq!(update.status, POSTPROCESSING_STATUS);
        assert_eq!(update.tone, StatusTone::Working);
    }

    #[test]
    fn relay_drops_malformed_events_and_forwards_the_rest() {
        let (tx, mut rx) = unbounded_channel();
        let relay = ProgressRelay::new(tx);

        relay.on_progress(&downloading("N/A", None));
        assert!(rx.try_recv().is_err());

        relay.on_progress(&downloading("50%", Some(4)));
        match rx.try_recv() {
            Ok(WorkerMessage::Progress(update)) => assert_eq!(update.ratio, 0.5),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn relay_survives_closed_channel() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let relay = ProgressRelay::new(tx);
        relay.on_progress(&downloading("10%", None));
        relay.on_progress(&ProgressEvent::Finished);
    }

    #[test]
    fn apply_updates_session() {
        let mut session = Session::default();
        ProgressUpdate::from_event(&ProgressEvent::Finished)
            .unwrap()
            .apply(&mut session);
        assert_eq!(session.progress, 1.0);
        assert_eq!(session.status, POSTPROCESSING_STATUS);
        assert_eq!(session.tone, StatusTone::Working);
    }
}
