use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::clients::{ClientError, Transcriber};
use crate::media::processor::{MediaProcessor, MediaTool};

/// One time-coded line of the transcript.
///
/// Sequences handed out by [`CaptionEngine::transcribe`] are ordered, with
/// contiguous indices starting at 1, non-decreasing start times, trimmed
/// non-empty text, and `end_seconds > start_seconds`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionSegment {
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

/// Visual override applied uniformly to every caption.
///
/// Fields are addressed by name when rewriting the subtitle track's `Style:`
/// lines; nothing in the engine depends on the ASS field order.
#[derive(Debug, Clone)]
pub struct StyleSpec {
    pub font_name: String,
    pub font_size: u32,
    pub primary_colour: String,
    pub outline_colour: String,
    pub outline: u32,
    pub shadow: u32,
}

impl Default for StyleSpec {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_owned(),
            font_size: 16,
            primary_colour: "&H00FFFFFF".to_owned(),
            outline_colour: "&H00000000".to_owned(),
            outline: 1,
            shadow: 0,
        }
    }
}

impl StyleSpec {
    /// Render the `force_style` argument for ffmpeg's subtitles filter.
    pub fn force_style(&self) -> String {
        format!(
            "FontName={},FontSize={},Outline={},Shadow={}",
            self.font_name, self.font_size, self.outline, self.shadow
        )
    }
}

#[derive(Debug, Error)]
pub enum CaptionError {
    /// The external transcription call failed. Transcription is billed per
    /// attempt, so it is never retried; the job fails instead.
    #[error("transcription failed: {0}")]
    Transcription(#[source] ClientError),

    #[error("subtitle conversion exited with status {exit_code}: {stderr}")]
    Convert { exit_code: i32, stderr: String },

    #[error("subtitle conversion produced no output")]
    EmptyConversion,

    #[error("subtitle conversion emitted non-UTF-8 output: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("subtitle scratch I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns narration audio into a styled, burn-ready subtitle track.
#[derive(Clone)]
pub struct CaptionEngine {
    transcriber: Arc<dyn Transcriber>,
    processor: Arc<dyn MediaProcessor>,
}

impl CaptionEngine {
    pub fn new(transcriber: Arc<dyn Transcriber>, processor: Arc<dyn MediaProcessor>) -> Self {
        Self {
            transcriber,
            processor,
        }
    }

    /// Transcribe `audio_path` and normalize the result into caption shape:
    /// text trimmed, empty segments dropped, indices reassigned from 1.
    ///
    /// An empty result is valid — it yields a captionless video downstream.
    pub async fn transcribe(&self, audio_path: &Path) -> Result<Vec<CaptionSegment>, CaptionError> {
        let raw = self
            .transcriber
            .transcribe(audio_path)
            .await
            .map_err(CaptionError::Transcription)?;
        Ok(normalize_segments(raw))
    }

    /// Convert an SRT track to the advanced (ASS) format via ffmpeg.
    pub async fn to_ass(&self, srt: &str) -> Result<String, CaptionError> {
        let file = tempfile::Builder::new().suffix(".srt").tempfile()?;
        tokio::fs::write(file.path(), srt).await?;

        let args = vec![
            "-v".to_owned(),
            "error".to_owned(),
            "-i".to_owned(),
            file.path().display().to_string(),
            "-f".to_owned(),
            "ass".to_owned(),
            "pipe:1".to_owned(),
        ];
        let output = self.processor.run(MediaTool::Ffmpeg, &args).await?;
        if !output.success() {
            return Err(CaptionError::Convert {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        if output.stdout.is_empty() {
            return Err(CaptionError::EmptyConversion);
        }
        Ok(String::from_utf8(output.stdout)?)
    }
}

impl std::fmt::Debug for CaptionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptionEngine").finish()
    }
}

/// Drop empty segments, trim text, and reassign contiguous indices from 1.
///
/// Segments whose time span is not strictly positive are dropped along with
/// the empty ones; both violate the caption invariants and come from
/// collaborator quirks, not valid speech.
pub fn normalize_segments(raw: Vec<CaptionSegment>) -> Vec<CaptionSegment> {
    raw.into_iter()
        .filter_map(|segment| {
            let text = segment.text.trim().to_owned();
            if text.is_empty() || segment.end_seconds <= segment.start_seconds {
                return None;
            }
            Some(CaptionSegment { text, ..segment })
        })
        .enumerate()
        .map(|(i, segment)| CaptionSegment {
            index: i + 1,
            ..segment
        })
        .collect()
}

/// Serialize segments as SRT: `index\nstart --> end\ntext\n`, blank-line
/// separated blocks.
pub fn render_srt(segments: &[CaptionSegment]) -> String {
    let blocks: Vec<String> = segments
        .iter()
        .map(|segment| {
            format!(
                "{}\n{} --> {}\n{}\n",
                segment.index,
                format_timestamp(segment.start_seconds),
                format_timestamp(segment.end_seconds),
                segment.text
            )
        })
        .collect();
    blocks.join("\n")
}

/// Format seconds as the SRT time code `HH:MM:SS,mmm`.
///
/// Hours are zero-padded to at least two digits and grow unbounded beyond
/// `99` — durations past 99:59:59 are not clamped.
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    let secs = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    format!("{hours:02}:{minutes:02}:{secs:02},{millis:03}")
}

/// Rewrite the `Style:` lines of an ASS track with the given [`StyleSpec`].
///
/// Fields are located by name using the most recent `Format:` header, so a
/// track with reordered style fields is still rewritten correctly. Only
/// `Style:` lines are touched; the transform is idempotent.
pub fn apply_style(ass: &str, style: &StyleSpec) -> String {
    let mut format_fields: Option<Vec<String>> = None;
    let mut out: Vec<String> = Vec::new();

    for line in ass.lines() {
        if let Some(rest) = line.strip_prefix("Format:") {
            format_fields = Some(rest.split(',').map(|f| f.trim().to_owned()).collect());
            out.push(line.to_owned());
        } else if let Some(rest) = line.strip_prefix("Style:") {
            match &format_fields {
                Some(fields) => out.push(restyle_line(rest, fields, style)),
                // A Style line before any Format header is malformed ASS;
                // leave it alone rather than guessing field positions.
                None => out.push(line.to_owned()),
            }
        } else {
            out.push(line.to_owned());
        }
    }

    let mut result = out.join("\n");
    if ass.ends_with('\n') {
        result.push('\n');
    }
    result
}

fn restyle_line(rest: &str, fields: &[String], style: &StyleSpec) -> String {
    let mut values: Vec<String> = rest.split(',').map(|v| v.trim().to_owned()).collect();
    for (i, name) in fields.iter().enumerate() {
        if i >= values.len() {
            break;
        }
        let replacement = match name.as_str() {
            "Fontname" => Some(style.font_name.clone()),
            "Fontsize" => Some(style.font_size.to_string()),
            "PrimaryColour" => Some(style.primary_colour.clone()),
            "OutlineColour" => Some(style.outline_colour.clone()),
            "Outline" => Some(style.outline.to_string()),
            "Shadow" => Some(style.shadow.to_string()),
            _ => None,
        };
        if let Some(value) = replacement {
            values[i] = value;
        }
    }
    format!("Style: {}", values.join(","))
}
