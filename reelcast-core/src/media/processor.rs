use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;

/// Which external binary a [`MediaProcessor`] call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTool {
    Ffmpeg,
    Ffprobe,
}

/// Typed result of one media subprocess run.
///
/// `stdout` carries the produced bytes when the command writes to `pipe:1`;
/// `stderr` is the tool's log output, kept as text for error reporting.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Boundary around the external transcoding tools.
///
/// The composition and probing algorithms only ever build argument lists and
/// interpret a [`ProcessOutput`]; they never spawn a binary themselves. Tests
/// inject a fake implementation, so the media math is exercised without
/// ffmpeg installed.
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    async fn run(&self, tool: MediaTool, args: &[String]) -> std::io::Result<ProcessOutput>;
}

/// Production [`MediaProcessor`] backed by the ffmpeg-sidecar binaries.
///
/// Binary paths are resolved through ffmpeg-sidecar, which prefers a
/// downloaded sidecar installation and falls back to the system `PATH`.
#[derive(Debug, Default, Clone)]
pub struct FfProcessor;

impl FfProcessor {
    pub fn new() -> Self {
        Self
    }

    fn program(tool: MediaTool) -> PathBuf {
        match tool {
            MediaTool::Ffmpeg => ffmpeg_sidecar::paths::ffmpeg_path(),
            MediaTool::Ffprobe => ffmpeg_sidecar::ffprobe::ffprobe_path(),
        }
    }
}

#[async_trait]
impl MediaProcessor for FfProcessor {
    async fn run(&self, tool: MediaTool, args: &[String]) -> std::io::Result<ProcessOutput> {
        let program = Self::program(tool);
        debug!(?tool, ?args, "spawning media subprocess");

        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(ProcessOutput {
            // Killed-by-signal has no code; report it as a generic failure.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
