use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::info;

use crate::media::captions::StyleSpec;
use crate::media::probe::MediaAsset;
use crate::media::processor::{MediaProcessor, MediaTool};

#[derive(Debug, Error)]
pub enum ComposeError {
    /// The narration must be strictly shorter than the background clip.
    #[error(
        "narration ({narration:.2}s) must be shorter than the background video ({background:.2}s)"
    )]
    Validation { narration: f64, background: f64 },

    #[error("transcode exited with status {exit_code}: {stderr}")]
    Transcode { exit_code: i32, stderr: String },

    /// A zero-length result is a failure; a short or partial file must never
    /// be returned as if it were the composed video.
    #[error("transcode produced empty output")]
    EmptyOutput,

    #[error("composition scratch I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Trims the background clip to a window the length of the narration,
/// burns the styled captions in, muxes the narration audio, and returns the
/// finished fragmented MP4.
pub struct VideoComposer {
    processor: Arc<dyn MediaProcessor>,
    rng: Mutex<StdRng>,
}

impl VideoComposer {
    pub fn new(processor: Arc<dyn MediaProcessor>) -> Self {
        Self {
            processor,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for tests: the start offset sequence is a pure
    /// function of `seed`.
    pub fn with_seed(processor: Arc<dyn MediaProcessor>, seed: u64) -> Self {
        Self {
            processor,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Compose the final video.
    ///
    /// `captions` is the styled ASS track, or `None` for a captionless
    /// render. All scratch files live in a per-call temp directory that is
    /// removed on every exit path.
    pub async fn compose(
        &self,
        narration: &MediaAsset,
        background: &MediaAsset,
        captions: Option<&str>,
        style: &StyleSpec,
    ) -> Result<Vec<u8>, ComposeError> {
        if narration.duration_seconds >= background.duration_seconds {
            return Err(ComposeError::Validation {
                narration: narration.duration_seconds,
                background: background.duration_seconds,
            });
        }

        let max_offset = background.duration_seconds - narration.duration_seconds;
        let start_offset = self.pick_offset(max_offset);
        info!(
            start_offset,
            window = narration.duration_seconds,
            "composing video segment"
        );

        let scratch = tempfile::tempdir()?;
        let background_path = scratch.path().join("background.mp4");
        let narration_path = scratch.path().join("narration.wav");
        tokio::fs::write(&background_path, &background.bytes).await?;
        tokio::fs::write(&narration_path, &narration.bytes).await?;

        let subtitle_path = match captions {
            Some(content) => {
                let path = scratch.path().join("captions.ass");
                tokio::fs::write(&path, content).await?;
                Some(path)
            }
            None => None,
        };

        let args = compose_args(
            &background_path,
            &narration_path,
            subtitle_path.as_deref(),
            style,
            start_offset,
            narration.duration_seconds,
        );
        let output = self.processor.run(MediaTool::Ffmpeg, &args).await?;

        if !output.success() {
            return Err(ComposeError::Transcode {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        if output.stdout.is_empty() {
            return Err(ComposeError::EmptyOutput);
        }
        Ok(output.stdout)
    }

    /// Pick a start offset uniformly in `[0, max_offset]`, rounded to two
    /// decimal places.
    ///
    /// The randomization varies which part of a long background loop each
    /// job shows; it has no security significance. A non-positive window
    /// always yields 0 rather than sampling an empty range.
    fn pick_offset(&self, max_offset: f64) -> f64 {
        if max_offset <= 0.0 {
            return 0.0;
        }
        let sample = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen_range(0.0..=max_offset)
        };
        (sample * 100.0).round() / 100.0
    }
}

impl std::fmt::Debug for VideoComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoComposer").finish()
    }
}

/// Build the ffmpeg argument list for one composition.
///
/// Seeks the background to `start_offset`, takes exactly the narration's
/// length, optionally burns the subtitle track, copies the background's
/// video stream re-encoded to H.264 with the narration audio at 192 kbps /
/// 48 kHz stereo, and emits a fragmented MP4 on stdout so no seekable output
/// file is needed.
pub(crate) fn compose_args(
    background: &Path,
    narration: &Path,
    subtitle: Option<&Path>,
    style: &StyleSpec,
    start_offset: f64,
    window_seconds: f64,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-ss".into(),
        format!("{start_offset:.2}"),
        "-i".into(),
        background.display().to_string(),
        "-i".into(),
        narration.display().to_string(),
    ];
    if let Some(subtitle) = subtitle {
        args.push("-vf".into());
        args.push(format!(
            "subtitles={}:force_style='{}'",
            subtitle.display(),
            style.force_style()
        ));
    }
    let window = window_seconds.to_string();
    let tail: [&str; 24] = [
        "-t",
        &window,
        "-map",
        "0:v:0",
        "-map",
        "1:a:0",
        "-c:v",
        "libx264",
        "-preset",
        "veryfast",
        "-c:a",
        "aac",
        "-b:a",
        "192k",
        "-ar",
        "48000",
        "-ac",
        "2",
        "-shortest",
        "-movflags",
        "frag_keyframe+empty_moov+default_base_moof",
        "-f",
        "mp4",
        "pipe:1",
    ];
    args.extend(tail.iter().map(|s| s.to_string()));
    args
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::media::processor::fake::FakeProcessor;
    use bytes::Bytes;

    fn asset(duration: f64) -> MediaAsset {
        MediaAsset {
            bytes: Bytes::from_static(b"mediadata"),
            duration_seconds: duration,
        }
    }

    fn extract_offset(args: &[String]) -> f64 {
        let pos = args.iter().position(|a| a == "-ss").unwrap();
        args[pos + 1].parse().unwrap()
    }

    #[tokio::test]
    async fn rejects_narration_longer_than_background() {
        let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
        let composer = VideoComposer::with_seed(Arc::clone(&processor) as _, 1);

        let err = composer
            .compose(&asset(20.0), &asset(8.0), None, &StyleSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::Validation { .. }));
        // Nothing may be spawned when validation fails.
        assert_eq!(processor.call_count(), 0);
    }

    #[tokio::test]
    async fn rejects_equal_durations_before_spawning() {
        let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
        let composer = VideoComposer::with_seed(Arc::clone(&processor) as _, 1);

        let err = composer
            .compose(&asset(10.0), &asset(10.0), None, &StyleSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::Validation { .. }));
        assert_eq!(processor.call_count(), 0);
    }

    #[tokio::test]
    async fn same_seed_yields_same_offset() {
        let run = |seed| async move {
            let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
            let composer = VideoComposer::with_seed(Arc::clone(&processor) as _, seed);
            let out = composer
                .compose(&asset(8.0), &asset(20.0), None, &StyleSpec::default())
                .await
                .unwrap();
            assert!(!out.is_empty());
            extract_offset(&processor.calls_for(MediaTool::Ffmpeg)[0])
        };
        let first = run(42).await;
        let second = run(42).await;
        assert_eq!(first, second);
        assert!((0.0..=12.0).contains(&first));
    }

    #[tokio::test]
    async fn offset_stays_within_window() {
        let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
        let composer = VideoComposer::new(Arc::clone(&processor) as _);
        for _ in 0..100 {
            let offset = composer.pick_offset(12.0);
            assert!((0.0..=12.0).contains(&offset));
            // Two decimal places only.
            assert_eq!((offset * 100.0).round() / 100.0, offset);
        }
    }

    #[tokio::test]
    async fn zero_window_pins_offset_to_start() {
        let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
        let composer = VideoComposer::new(processor as _);
        assert_eq!(composer.pick_offset(0.0), 0.0);
    }

    #[tokio::test]
    async fn transcode_failure_carries_stderr_and_cleans_scratch() {
        let processor = Arc::new(FakeProcessor::failing(187, "Error opening filter"));
        let composer = VideoComposer::with_seed(Arc::clone(&processor) as _, 7);

        let err = composer
            .compose(&asset(8.0), &asset(20.0), None, &StyleSpec::default())
            .await
            .unwrap_err();
        match &err {
            ComposeError::Transcode { exit_code, stderr } => {
                assert_eq!(*exit_code, 187);
                assert!(stderr.contains("Error opening filter"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // The scratch directory handed to ffmpeg must be gone.
        let args = &processor.calls_for(MediaTool::Ffmpeg)[0];
        let pos = args.iter().position(|a| a == "-i").unwrap();
        let background_path = std::path::PathBuf::from(&args[pos + 1]);
        assert!(!background_path.exists());
        assert!(!background_path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn empty_output_is_an_error() {
        let processor = Arc::new(FakeProcessor::ok_with(Vec::new()));
        let composer = VideoComposer::with_seed(processor as _, 7);
        let err = composer
            .compose(&asset(8.0), &asset(20.0), None, &StyleSpec::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ComposeError::EmptyOutput));
    }

    #[tokio::test]
    async fn captionless_compose_omits_subtitle_filter() {
        let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
        let composer = VideoComposer::with_seed(Arc::clone(&processor) as _, 7);
        let out = composer
            .compose(&asset(8.0), &asset(20.0), None, &StyleSpec::default())
            .await
            .unwrap();
        assert_eq!(out, b"mp4");

        let args = &processor.calls_for(MediaTool::Ffmpeg)[0];
        assert!(!args.iter().any(|a| a == "-vf"));
    }

    #[tokio::test]
    async fn captions_are_burned_with_forced_style() {
        let processor = Arc::new(FakeProcessor::ok_with(b"mp4".to_vec()));
        let composer = VideoComposer::with_seed(Arc::clone(&processor) as _, 7);
        composer
            .compose(
                &asset(8.0),
                &asset(20.0),
                Some("[V4+ Styles]\n"),
                &StyleSpec::default(),
            )
            .await
            .unwrap();

        let args = &processor.calls_for(MediaTool::Ffmpeg)[0];
        let pos = args.iter().position(|a| a == "-vf").unwrap();
        let filter = &args[pos + 1];
        assert!(filter.starts_with("subtitles="));
        assert!(filter.contains("captions.ass"));
        assert!(filter.contains("force_style='FontName=Arial,FontSize=16,Outline=1,Shadow=0'"));
    }

    #[test]
    fn args_trim_to_narration_window() {
        let style = StyleSpec::default();
        let args = compose_args(
            Path::new("/tmp/x/background.mp4"),
            Path::new("/tmp/x/narration.wav"),
            None,
            &style,
            3.25,
            8.0,
        );
        assert_eq!(args[0], "-y");
        assert_eq!(args[1], "-ss");
        assert_eq!(args[2], "3.25");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "8");
        assert_eq!(args.last().unwrap(), "pipe:1");
        assert!(args.windows(2).any(|w| w[0] == "-movflags"
            && w[1] == "frag_keyframe+empty_moov+default_base_moof"));
    }
}
