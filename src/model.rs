use std::{fmt, path::PathBuf};

/// What the user wants out of the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatKind {
    /// Audio only, extracted to MP3
    Audio,
    /// Video merged into an MP4 container
    #[default]
    Video,
}

/// Maximum video height offered in the resolution selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resolution {
    P2160,
    P1440,
    #[default]
    P1080,
    P720,
    P480,
    P360,
}

impl Resolution {
    /// Every option, highest first, in the order the selector lists them
    pub const ALL: [Resolution; 6] = [
        Resolution::P2160,
        Resolution::P1440,
        Resolution::P1080,
        Resolution::P720,
        Resolution::P480,
        Resolution::P360,
    ];

    /// Pixel height used in the engine's format filter
    pub fn height(self) -> u32 {
        match self {
            Resolution::P2160 => 2160,
            Resolution::P1440 => 1440,
            Resolution::P1080 => 1080,
            Resolution::P720 => 720,
            Resolution::P480 => 480,
            Resolution::P360 => 360,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

/// A status update emitted by the download engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Bytes are still arriving. `percent` is the engine's raw text, e.g. `" 42.3%"`.
    Downloading {
        percent: String,
        eta_seconds: Option<u64>,
    },
    /// Raw download done; post-processing (merge, extraction) may still run
    Finished,
}

/// Colour family for the status label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTone {
    #[default]
    Neutral,
    Working,
    Success,
    Error,
}

/// Where the download state machine currently sits. A run ends straight back
/// in `Idle`; how it ended is reported by `Orchestrator::pump`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
}

pub const READY_STATUS: &str = "Ready";
pub const DOWNLOAD_LABEL: &str = "Download";
pub const RUNNING_LABEL: &str = "Running...";
pub const RETRY_LABEL: &str = "Retry Download";

/// Everything the window shows and edits, passed explicitly to each handler
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Link pasted by the user
    pub url: String,
    /// Audio or video
    pub format_kind: FormatKind,
    /// Height cap, only meaningful for video
    pub resolution: Resolution,
    /// Folder picked through the dialog
    pub destination: Option<PathBuf>,
    /// State machine position; `Running` is the single-flight flag
    pub phase: Phase,
    /// Progress bar value (0.0 to 1.0)
    pub progress: f32,
    /// Status label text
    pub status: String,
    /// Status label colour
    pub tone: StatusTone,
    /// Text on the primary action button
    pub action_label: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            url: String::new(),
            format_kind: FormatKind::default(),
            resolution: Resolution::default(),
            destination: None,
            phase: Phase::Idle,
            progress: 0.0,
            status: READY_STATUS.to_string(),
            tone: StatusTone::Neutral,
            action_label: DOWNLOAD_LABEL.to_string(),
        }
    }
}

impl Session {
    /// True while a download is in flight
    pub fn in_progress(&self) -> bool {
        self.phase == Phase::Running
    }

    /// The primary action is clickable only when nothing is running
    pub fn action_enabled(&self) -> bool {
        !self.in_progress()
    }

    pub fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.status = text.into();
        self.tone = tone;
    }

    /// Label shown under the folder button
    pub fn destination_label(&self) -> String {
        match &self.destination {
            Some(folder) => {
                let name = folder
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| folder.display().to_string());
                format!("Saving to: {}", name)
            }
            None => "No folder selected".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_defaults() {
        let session = Session::default();
        assert_eq!(session.format_kind, FormatKind::Video);
        assert_eq!(session.resolution, Resolution::P1080);
        assert_eq!(session.status, "Ready");
        assert_eq!(session.action_label, "Download");
        assert!(session.destination.is_none());
        assert!(!session.in_progress());
        assert!(session.action_enabled());
    }

    #[test]
    fn resolution_labels_and_heights() {
        let labels: Vec<String> = Resolution::ALL.iter().map(|r| r.to_string()).collect();
        assert_eq!(labels, ["2160p", "1440p", "1080p", "720p", "480p", "360p"]);
        assert_eq!(Resolution::P720.height(), 720);
    }

    #[test]
    fn destination_label_uses_folder_name() {
        let mut session = Session::default();
        assert_eq!(session.destination_label(), "No folder selected");
        session.destination = Some(PathBuf::from("/home/me/Music"));
        assert_eq!(session.destination_label(), "Saving to: Music");
    }
}
