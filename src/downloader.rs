use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use directories::ProjectDirs;
use rust_embed::RustEmbed;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    process::Command,
};
use tracing::{debug, info, trace, warn};

use crate::config::DownloadConfig;
use crate::error::EngineError;
use crate::model::ProgressEvent;
use crate::progress::parse_progress_line;

#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

/// Receives progress events from the engine.
///
/// Events arrive one at a time, in the order the engine emits them, on the
/// engine's own task. Implementations must not fail: an event that cannot be
/// displayed is ignored and the download continues.
pub trait ProgressHook: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// The external media download/transcode engine.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Downloads `url` as described by `config`. Runs to completion or failure.
    async fn download(
        &self,
        url: &str,
        config: &DownloadConfig,
        hook: &dyn ProgressHook,
    ) -> Result<(), EngineError>;
}

/// yt-dlp driven as a child process
pub struct YtDlp {
    program: PathBuf,
}

impl YtDlp {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Prefers a binary bundled in `assets/`, falls back to `yt-dlp` on PATH.
    pub fn locate() -> Self {
        let bin = if cfg!(target_os = "windows") { "yt-dlp.exe" } else { "yt-dlp" };
        match extract_bundled(bin) {
            Ok(Some(path)) => {
                info!(path = %path.display(), "using bundled yt-dlp");
                Self::new(path)
            }
            Ok(None) => {
                info!("no bundled yt-dlp, using the one on PATH");
                Self::new(bin)
            }
            Err(err) => {
                warn!(%err, "could not extract bundled yt-dlp, using the one on PATH");
                Self::new(bin)
            }
        }
    }
}

fn extract_bundled(bin: &str) -> std::io::Result<Option<PathBuf>> {
    let Some(data) = Asset::get(bin) else {
        return Ok(None);
    };
    let dir = match ProjectDirs::from("com", "ytconvert", "ytconvert") {
        Some(dirs) => dirs.data_local_dir().join("bin"),
        None => std::env::temp_dir().join(format!("ytconvert-{}", std::process::id())),
    };
    extract_to(&dir, bin, data.data.as_ref()).map(Some)
}

/// Writes `data` to `dir/bin` unless an identical copy is already there.
/// The file is written under a temporary name and renamed into place.
fn extract_to(dir: &Path, bin: &str, data: &[u8]) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let target = dir.join(bin);
    if std::fs::read(&target).is_ok_and(|existing| existing == data) {
        return Ok(target);
    }

    let partial = dir.join(format!("{}.{}.part", bin, std::process::id()));
    std::fs::write(&partial, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&partial, std::fs::Permissions::from_mode(0o755))?;
    }
    if let Err(err) = std::fs::rename(&partial, &target) {
        let _ = std::fs::remove_file(&partial);
        return Err(err);
    }
    debug!(path = %target.display(), "extracted bundled yt-dlp");
    Ok(target)
}

#[async_trait]
impl Engine for YtDlp {
    async fn download(
        &self,
        url: &str,
        config: &DownloadConfig,
        hook: &dyn ProgressHook,
    ) -> Result<(), EngineError> {
        info!(program = %self.program.display(), %url, format = %config.format, "starting yt-dlp");
        let mut cmd = Command::new(&self.program);
        cmd.args(config.to_args(url));
        run(cmd, hook).await
    }
}

/// Spawns `cmd`, feeds progress lines from its stdout to `hook` and waits for it to exit.
async fn run(mut cmd: Command, hook: &dyn ProgressHook) -> Result<(), EngineError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW

    let mut child = cmd.spawn().map_err(EngineError::Spawn)?;
    let stdout = child.stdout.take().ok_or(EngineError::MissingOutput)?;
    let stderr = child.stderr.take().ok_or(EngineError::MissingOutput)?;

    let stderr_task = tokio::spawn(async move {
        let mut reader = BufReader::new(stderr);
        let mut collected = Vec::new();
        while let Ok(Some(line)) = next_lossy_line(&mut reader).await {
            debug!(target: "ytconvert::yt_dlp", "{}", line);
            collected.push(line);
        }
        collected
    });

    let mut reader = BufReader::new(stdout);
    while let Some(line) = next_lossy_line(&mut reader).await? {
        trace!(target: "ytconvert::yt_dlp", "{}", line);
        if let Some(event) = parse_progress_line(&line) {
            hook.on_progress(&event);
        }
    }

    let status = child.wait().await?;
    let stderr_lines = stderr_task.await.unwrap_or_default();
    if status.success() {
        Ok(())
    } else {
        let message = stderr_lines
            .iter()
            .rev()
            .find(|l| l.starts_with("ERROR:"))
            .or_else(|| stderr_lines.iter().rev().find(|l| !l.trim().is_empty()))
            .map(|l| l.trim().to_owned())
            .unwrap_or_else(|| format!("yt-dlp exited with {}", status));
        Err(EngineError::Failed(message))
    }
}

/// Reads one line, replacing bytes that are not UTF-8. yt-dlp prints titles in
/// the locale encoding, which need not be UTF-8.
async fn next_lossy_line<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf).await? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
