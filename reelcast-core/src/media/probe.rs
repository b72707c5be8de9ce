use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::media::processor::{MediaProcessor, MediaTool};

/// Errors produced when measuring the playable length of a media file.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffprobe exited with status {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("ffprobe reported an unreadable duration: {raw:?}")]
    Unparsable { raw: String },

    /// A zero or negative duration is a probe failure, never a valid
    /// measurement — callers must not treat 0.0 as "no duration".
    #[error("media has non-positive duration: {seconds}")]
    NonPositive { seconds: f64 },
}

/// The container family of an asset, used to pick a temp-file suffix that
/// ffprobe/ffmpeg can demux by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            MediaKind::Audio => ".wav",
            MediaKind::Video => ".mp4",
        }
    }
}

/// Raw media bytes together with their measured duration.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub bytes: Bytes,
    pub duration_seconds: f64,
}

impl MediaAsset {
    /// Write `bytes` to a suffixed temp file, probe it, and return the asset.
    ///
    /// The temp file is removed on every path, including probe failure.
    pub async fn probe(
        probe: &DurationProbe,
        bytes: Bytes,
        kind: MediaKind,
    ) -> Result<Self, ProbeError> {
        let file = tempfile::Builder::new().suffix(kind.suffix()).tempfile()?;
        tokio::fs::write(file.path(), &bytes).await?;
        let duration_seconds = probe.measure(file.path()).await?;
        Ok(Self {
            bytes,
            duration_seconds,
        })
    }
}

/// Measures the playable length of an audio or video file via ffprobe.
#[derive(Clone)]
pub struct DurationProbe {
    processor: Arc<dyn MediaProcessor>,
}

impl DurationProbe {
    pub fn new(processor: Arc<dyn MediaProcessor>) -> Self {
        Self { processor }
    }

    /// Return the asset's duration in seconds.
    ///
    /// No retries: a probe failure is fatal to the calling job.
    pub async fn measure(&self, path: &Path) -> Result<f64, ProbeError> {
        let args = probe_args(path);
        let output = self.processor.run(MediaTool::Ffprobe, &args).await?;
        if !output.success() {
            return Err(ProbeError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

impl std::fmt::Debug for DurationProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurationProbe").finish()
    }
}

pub(crate) fn probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".into(),
        "error".into(),
        "-show_entries".into(),
        "format=duration".into(),
        "-of".into(),
        "default=noprint_wrappers=1:nokey=1".into(),
        path.display().to_string(),
    ]
}

fn parse_duration(raw: &str) -> Result<f64, ProbeError> {
    let trimmed = raw.trim();
    let seconds: f64 = trimmed.parse().map_err(|_| ProbeError::Unparsable {
        raw: trimmed.to_owned(),
    })?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ProbeError::NonPositive { seconds });
    }
    Ok(seconds)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::media::processor::fake::FakeProcessor;

    #[test]
    fn parse_duration_accepts_fractional_seconds() {
        assert_eq!(parse_duration("12.345\n").unwrap(), 12.345);
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(matches!(
            parse_duration("N/A"),
            Err(ProbeError::Unparsable { .. })
        ));
        assert!(matches!(
            parse_duration(""),
            Err(ProbeError::Unparsable { .. })
        ));
    }

    #[test]
    fn parse_duration_rejects_zero_and_negative() {
        assert!(matches!(
            parse_duration("0.0"),
            Err(ProbeError::NonPositive { .. })
        ));
        assert!(matches!(
            parse_duration("-3.5"),
            Err(ProbeError::NonPositive { .. })
        ));
    }

    #[tokio::test]
    async fn measure_returns_parsed_stdout() {
        let processor = Arc::new(FakeProcessor::ok_with(b"42.5\n".to_vec()));
        let probe = DurationProbe::new(Arc::clone(&processor) as Arc<dyn MediaProcessor>);

        let seconds = probe.measure(Path::new("clip.mp4")).await.unwrap();
        assert_eq!(seconds, 42.5);

        let calls = processor.calls_for(MediaTool::Ffprobe);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].last().unwrap(), "clip.mp4");
    }

    #[tokio::test]
    async fn measure_propagates_tool_failure() {
        let processor = Arc::new(FakeProcessor::failing(1, "clip.mp4: Invalid data"));
        let probe = DurationProbe::new(processor as Arc<dyn MediaProcessor>);

        let err = probe.measure(Path::new("clip.mp4")).await.unwrap_err();
        match err {
            ProbeError::Failed { exit_code, stderr } => {
                assert_eq!(exit_code, 1);
                assert!(stderr.contains("Invalid data"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn asset_probe_measures_written_bytes() {
        let processor = Arc::new(FakeProcessor::ok_with(b"8.0\n".to_vec()));
        let probe = DurationProbe::new(Arc::clone(&processor) as Arc<dyn MediaProcessor>);

        let asset = MediaAsset::probe(&probe, Bytes::from_static(b"RIFFdata"), MediaKind::Audio)
            .await
            .unwrap();
        assert_eq!(asset.duration_seconds, 8.0);
        assert_eq!(&asset.bytes[..], b"RIFFdata");

        // The probed temp path must carry the audio suffix.
        let calls = processor.calls_for(MediaTool::Ffprobe);
        assert!(calls[0].last().unwrap().ends_with(".wav"));
    }
}
