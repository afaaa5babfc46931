//! Translates the user's choices into the engine's parameter set.

use std::path::Path;

use crate::model::{FormatKind, Resolution};
use crate::progress::PROGRESS_TEMPLATE;

/// Audio extraction post-processing step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioExtraction {
    pub codec: &'static str,
    pub quality: &'static str,
}

/// Immutable parameter set handed to the engine once per download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Engine format selector, e.g. `bestaudio/best`
    pub format: String,
    /// Set for audio downloads
    pub extract_audio: Option<AudioExtraction>,
    /// Container to merge separate video and audio streams into
    pub merge_output_format: Option<&'static str>,
    /// Output path template rooted at the destination folder
    pub output_template: String,
    /// A single link always yields a single file
    pub no_playlist: bool,
}

impl DownloadConfig {
    /// Builds the configuration. The caller has already checked that the folder is set.
    pub fn build(format_kind: FormatKind, resolution: Resolution, destination: &Path) -> Self {
        let output_template = destination
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned();

        match format_kind {
            FormatKind::Audio => Self {
                format: "bestaudio/best".to_string(),
                extract_audio: Some(AudioExtraction {
                    codec: "mp3",
                    quality: "192K",
                }),
                merge_output_format: None,
                output_template,
                no_playlist: true,
            },
            FormatKind::Video => {
                let height = resolution.height();
                Self {
                    format: format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]"),
                    extract_audio: None,
                    merge_output_format: Some("mp4"),
                    output_template,
                    no_playlist: true,
                }
            }
        }
    }

    /// Command line for yt-dlp. The link goes last, after `--`.
    pub fn to_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--newline".to_owned(),
            "--no-colors".to_owned(),
            "--progress-template".to_owned(),
            PROGRESS_TEMPLATE.to_owned(),
        ];

        if self.no_playlist {
            args.push("--no-playlist".to_owned());
        }

        args.push("-f".to_owned());
        args.push(self.format.clone());

        if let Some(audio) = &self.extract_audio {
            args.push("--extract-audio".to_owned());
            args.push("--audio-format".to_owned());
            args.push(audio.codec.to_owned());
            args.push("--audio-quality".to_owned());
            args.push(audio.quality.to_owned());
        }

        if let Some(container) = self.merge_output_format {
            args.push("--merge-output-format".to_owned());
            args.push(container.to_owned());
        }

        args.push("-o".to_owned());
        args.push(self.output_template.clone());
        args.push("--".to_owned());
        args.push(url.to_owned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        let idx = args.iter().position(|a| a == flag)?;
        args.get(idx + 1).map(String::as_str)
    }

    #[test]
    fn audio_requests_best_audio_and_mp3_extraction() {
        let config = DownloadConfig::build(FormatKind::Audio, Resolution::P1080, Path::new("/tmp/out"));

        assert_eq!(config.format, "bestaudio/best");
        assert_eq!(
            config.extract_audio,
            Some(AudioExtraction { codec: "mp3", quality: "192K" })
        );
        assert_eq!(config.merge_output_format, None);
        assert_eq!(config.output_template, "/tmp/out/%(title)s.%(ext)s");
        assert!(config.no_playlist);
    }

    #[test]
    fn video_caps_height_and_merges_to_mp4() {
        let config = DownloadConfig::build(FormatKind::Video, Resolution::P720, Path::new("/tmp/out"));

        assert_eq!(config.format, "bestvideo[height<=720]+bestaudio/best[height<=720]");
        assert_eq!(config.merge_output_format, Some("mp4"));
        assert!(config.extract_audio.is_none());
    }

    #[test]
    fn audio_ignores_resolution() {
        let a = DownloadConfig::build(FormatKind::Audio, Resolution::P360, Path::new("/x"));
        let b = DownloadConfig::build(FormatKind::Audio, Resolution::P2160, Path::new("/x"));
        assert_eq!(a, b);
    }

    #[test]
    fn audio_args() {
        let config = DownloadConfig::build(FormatKind::Audio, Resolution::P1080, Path::new("/tmp/out"));
        let args = config.to_args("https://example.com/watch?v=abc123");

        assert_eq!(value_after(&args, "-f"), Some("bestaudio/best"));
        assert!(args.contains(&"--extract-audio".to_owned()));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192K"));
        assert!(!args.contains(&"--merge-output-format".to_owned()));
        assert_eq!(value_after(&args, "-o"), Some("/tmp/out/%(title)s.%(ext)s"));
        assert!(args.contains(&"--no-playlist".to_owned()));
        assert_eq!(value_after(&args, "--progress-template"), Some(PROGRESS_TEMPLATE));
    }

    #[test]
    fn video_args() {
        let config = DownloadConfig::build(FormatKind::Video, Resolution::P1440, Path::new("/tmp/out"));
        let args = config.to_args("https://example.com/watch?v=abc123");

        assert_eq!(
            value_after(&args, "-f"),
            Some("bestvideo[height<=1440]+bestaudio/best[height<=1440]")
        );
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mp4"));
        assert!(!args.contains(&"--extract-audio".to_owned()));
    }

    #[test]
    fn link_is_last_and_behind_separator() {
        let config = DownloadConfig::build(FormatKind::Video, Resolution::P720, Path::new("/tmp/out"));
        let args = config.to_args("-rf");

        let n = args.len();
        assert_eq!(args[n - 2], "--");
        assert_eq!(args[n - 1], "-rf");
    }
}
