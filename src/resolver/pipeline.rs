// Resolution pipeline: liveness probe -> format plan -> direct URL -> metadata
//
// Each step is a separate yt-dlp process and runs only after the previous one
// finished, since the format plan depends on the liveness answer. The liveness
// and metadata steps fail soft; only the direct-URL step can fail a resolution.
// Cancellation always propagates.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::errors::ResolveError;
use super::format_selector::FormatSelector;
use super::models::{ProbeInfo, ResolveOptions, ResolvedStream};
use super::process::{self, ProcessInvocation, ProcessOutcome};

const BASE_ARGS: &[&str] = &["--no-warnings", "--no-check-certificate", "--no-playlist"];

/// Fields printed by the metadata step, one line each, in this order
const METADATA_FIELDS: &[&str] = &[
    "title",
    "width",
    "height",
    "duration",
    "channel",
    "thumbnail",
    "vcodec",
    "acodec",
    "%(http_headers)j",
    "%(formats.:.height)j",
];

const PROBE_FIELDS: &[&str] = &["title", "is_live", "duration"];

/// Metadata parsed from the positional `--print` output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamMetadata {
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
    pub duration_secs: Option<f64>,
    pub channel: Option<String>,
    pub thumbnail_url: Option<String>,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub http_headers: BTreeMap<String, String>,
    pub available_heights: Vec<u32>,
}

impl StreamMetadata {
    /// Parse by line index; missing or `NA` lines keep their defaults
    pub fn from_lines(lines: &[String]) -> Self {
        if lines.len() < METADATA_FIELDS.len() {
            tracing::debug!(
                "[yt-dlp] metadata has {} of {} lines, defaulting the rest",
                lines.len(),
                METADATA_FIELDS.len()
            );
        }

        Self {
            title: text_field(lines, 0),
            width: dimension_field(lines, 1),
            height: dimension_field(lines, 2),
            duration_secs: field(lines, 3).and_then(|v| v.parse().ok()),
            channel: text_field(lines, 4),
            thumbnail_url: text_field(lines, 5),
            video_codec: codec_field(lines, 6),
            audio_codec: codec_field(lines, 7),
            http_headers: field(lines, 8)
                .and_then(|v| serde_json::from_str(v).ok())
                .unwrap_or_default(),
            available_heights: field(lines, 9).map(parse_heights).unwrap_or_default(),
        }
    }

    fn apply_to(self, stream: &mut ResolvedStream) {
        stream.title = self.title;
        stream.width = self.width;
        stream.height = self.height;
        stream.duration_secs = self.duration_secs;
        stream.channel = self.channel;
        stream.thumbnail_url = self.thumbnail_url;
        stream.video_codec = self.video_codec;
        stream.audio_codec = self.audio_codec;
        stream.http_headers = self.http_headers;
        stream.available_heights = self.available_heights;
    }
}

fn field(lines: &[String], index: usize) -> Option<&str> {
    lines
        .get(index)
        .map(|line| line.trim())
        .filter(|value| !value.is_empty() && *value != "NA")
}

fn text_field(lines: &[String], index: usize) -> Option<String> {
    field(lines, index).map(str::to_string)
}

fn codec_field(lines: &[String], index: usize) -> Option<String> {
    field(lines, index)
        .filter(|codec| *codec != "none")
        .map(str::to_string)
}

fn dimension_field(lines: &[String], index: usize) -> u32 {
    field(lines, index)
        .and_then(|v| {
            v.parse::<u32>()
                .ok()
                .or_else(|| v.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u32))
        })
        .unwrap_or(0)
}

fn parse_heights(json: &str) -> Vec<u32> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json).unwrap_or_default();
    let mut heights: Vec<u32> = values
        .iter()
        .filter_map(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
        .filter_map(|h| u32::try_from(h).ok())
        .filter(|h| *h > 0)
        .collect();
    heights.sort_unstable();
    heights.dedup();
    heights
}

/// Exactly `true` (case-insensitive, surrounding whitespace ignored) means live
pub fn parse_is_live(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("true")
}

/// One resolution run against a located yt-dlp binary
pub struct ResolutionPipeline<'a> {
    tool: &'a Path,
    timeout: Duration,
    cancel: &'a CancellationToken,
}

impl<'a> ResolutionPipeline<'a> {
    pub fn new(tool: &'a Path, timeout: Duration, cancel: &'a CancellationToken) -> Self {
        Self {
            tool,
            timeout,
            cancel,
        }
    }

    pub async fn resolve(
        &self,
        url: &str,
        options: &ResolveOptions,
    ) -> Result<ResolvedStream, ResolveError> {
        let is_live = self.probe_live(url).await?;

        let selector = FormatSelector::for_quality(options.quality, is_live);
        tracing::debug!(
            "[yt-dlp] quality {} live={} -> selector {}",
            options.quality,
            is_live,
            selector
        );

        let (direct_url, audio_url) = self.resolve_direct(url, &selector).await?;
        let mut stream = ResolvedStream::resolved(url, direct_url, is_live);
        stream.audio_url = audio_url;

        if options.include_metadata {
            self.fetch_metadata(url, &selector).await?.apply_to(&mut stream);
        }

        tracing::info!(
            "[yt-dlp] resolved {} ({}x{}, live={}, hls={})",
            url,
            stream.width,
            stream.height,
            stream.is_live,
            stream.is_hls
        );
        Ok(stream)
    }

    /// Soft step: anything but a clean `true` counts as not live
    pub async fn probe_live(&self, url: &str) -> Result<bool, ResolveError> {
        match self.exec(url, &["--print", "is_live"]).await {
            Ok(output) => Ok(parse_is_live(&output.stdout_text())),
            Err(ResolveError::Cancelled) => Err(ResolveError::Cancelled),
            Err(e) => {
                tracing::warn!("[yt-dlp] liveness probe failed, assuming VOD: {}", e);
                Ok(false)
            }
        }
    }

    /// Hard step: returns the direct URL and, for split formats, the audio URL
    pub async fn resolve_direct(
        &self,
        url: &str,
        selector: &str,
    ) -> Result<(String, Option<String>), ResolveError> {
        let output = self.exec(url, &["-f", selector, "--get-url"]).await?;

        if !output.success() {
            tracing::warn!(
                "[yt-dlp] --get-url exited with {:?} for {}",
                output.exit_code,
                url
            );
            return Err(ResolveError::from_stderr(
                output.stderr.as_deref(),
                "Failed to resolve URL",
            ));
        }

        let lines = output.stdout_lines();
        let mut urls = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());
        match urls.next() {
            Some(direct) => Ok((direct.to_string(), urls.next().map(str::to_string))),
            None => Err(ResolveError::from_stderr(
                output.stderr.as_deref(),
                "Failed to resolve URL",
            )),
        }
    }

    /// Soft step: failures yield empty metadata
    pub async fn fetch_metadata(
        &self,
        url: &str,
        selector: &str,
    ) -> Result<StreamMetadata, ResolveError> {
        let mut args = vec!["-f", selector];
        for field in METADATA_FIELDS {
            args.push("--print");
            args.push(*field);
        }

        match self.exec(url, &args).await {
            Ok(output) => {
                if !output.success() {
                    tracing::warn!(
                        "[yt-dlp] metadata step exited with {:?}, keeping what was printed",
                        output.exit_code
                    );
                }
                Ok(StreamMetadata::from_lines(&output.stdout_lines()))
            }
            Err(ResolveError::Cancelled) => Err(ResolveError::Cancelled),
            Err(e) => {
                tracing::warn!("[yt-dlp] metadata step failed: {}", e);
                Ok(StreamMetadata::default())
            }
        }
    }

    /// Title, liveness and duration only; never selects a format
    pub async fn probe(&self, url: &str) -> Result<ProbeInfo, ResolveError> {
        let mut args = Vec::with_capacity(PROBE_FIELDS.len() * 2);
        for field in PROBE_FIELDS {
            args.push("--print");
            args.push(*field);
        }

        let output = self.exec(url, &args).await?;
        if !output.success() {
            return Err(ResolveError::from_stderr(
                output.stderr.as_deref(),
                "Failed to probe URL",
            ));
        }

        let lines = output.stdout_lines();
        Ok(ProbeInfo {
            original_url: url.to_string(),
            title: text_field(&lines, 0),
            is_live: field(&lines, 1).map(parse_is_live).unwrap_or(false),
            duration_secs: field(&lines, 2).and_then(|v| v.parse().ok()),
        })
    }

    fn invocation(&self, url: &str, args: &[&str]) -> ProcessInvocation {
        ProcessInvocation::new(self.tool, self.timeout)
            .args(BASE_ARGS.iter().copied())
            .args(args.iter().copied())
            .arg("--")
            .arg(url)
    }

    async fn exec(&self, url: &str, args: &[&str]) -> Result<ProcessOutcome, ResolveError> {
        let invocation = self.invocation(url, args);
        process::run_cancellable(&invocation, self.cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn liveness_requires_exact_true() {
        assert!(parse_is_live("true\n"));
        assert!(parse_is_live("  True  "));
        assert!(!parse_is_live("false"));
        assert!(!parse_is_live("NA"));
        assert!(!parse_is_live(""));
        assert!(!parse_is_live("true\ntrue"));
    }

    #[test]
    fn three_line_metadata() {
        let meta = StreamMetadata::from_lines(&lines(&["Title", "1280", "720"]));
        assert_eq!(meta.title.as_deref(), Some("Title"));
        assert_eq!((meta.width, meta.height), (1280, 720));
        assert_eq!(meta.duration_secs, None);
        assert!(meta.http_headers.is_empty());
    }

    #[test]
    fn short_output_degrades_to_defaults() {
        let meta = StreamMetadata::from_lines(&lines(&["Only a title"]));
        assert_eq!(meta.title.as_deref(), Some("Only a title"));
        assert_eq!((meta.width, meta.height), (0, 0));

        assert_eq!(StreamMetadata::from_lines(&[]), StreamMetadata::default());
    }

    #[test]
    fn parsing_is_positional_not_labelled() {
        // an empty title line must not shift width/height up
        let meta = StreamMetadata::from_lines(&lines(&["", "640", "360"]));
        assert_eq!(meta.title, None);
        assert_eq!((meta.width, meta.height), (640, 360));
    }

    #[test]
    fn na_and_garbage_fields_default() {
        let meta = StreamMetadata::from_lines(&lines(&[
            "NA", "NA", "abc", "NA", "NA", "NA", "none", "none",
        ]));
        assert_eq!(meta.title, None);
        assert_eq!((meta.width, meta.height), (0, 0));
        assert_eq!(meta.video_codec, None);
        assert_eq!(meta.audio_codec, None);
    }

    #[test]
    fn full_metadata() {
        let meta = StreamMetadata::from_lines(&lines(&[
            "Big Buck Bunny",
            "1920.0",
            "1080",
            "596.5",
            "Blender",
            "https://i.ytimg.com/vi/x/maxres.jpg",
            "avc1.640028",
            "mp4a.40.2",
            r#"{"User-Agent": "Mozilla/5.0", "Accept": "*/*"}"#,
            "[null, 144, 360, 720, 360, 1080, null]",
        ]));
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.duration_secs, Some(596.5));
        assert_eq!(meta.channel.as_deref(), Some("Blender"));
        assert_eq!(meta.video_codec.as_deref(), Some("avc1.640028"));
        assert_eq!(
            meta.http_headers.get("User-Agent").map(String::as_str),
            Some("Mozilla/5.0")
        );
        assert_eq!(meta.available_heights, vec![144, 360, 720, 1080]);
    }

    #[test]
    fn url_comes_after_option_terminator() {
        let cancel = CancellationToken::new();
        let pipeline =
            ResolutionPipeline::new(Path::new("yt-dlp"), Duration::from_secs(1), &cancel);
        let inv = pipeline.invocation("-not-an-option", &["--print", "is_live"]);
        let args: Vec<_> = inv
            .arguments()
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            args,
            vec![
                "--no-warnings",
                "--no-check-certificate",
                "--no-playlist",
                "--print",
                "is_live",
                "--",
                "-not-an-option"
            ]
        );
    }
}
