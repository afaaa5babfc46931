use thiserror::Error;

/// Reasons a start action is refused. The message is shown to the user as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("A download is already running.")]
    AlreadyRunning,
    #[error("Please paste a YouTube link first.")]
    EmptyLink,
    #[error("Please select a save folder.")]
    NoDestination,
}

/// Any failure of the download engine. All variants are handled the same way.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("yt-dlp output was not captured")]
    MissingOutput,
    #[error("I/O error while reading yt-dlp output: {0}")]
    Io(#[from] std::io::Error),
    #[error("the download stopped unexpectedly")]
    Aborted,
    #[error("{0}")]
    Failed(String),
}
