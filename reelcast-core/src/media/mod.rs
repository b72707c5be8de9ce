pub mod captions;
pub mod composer;
pub mod probe;
pub mod processor;

pub use captions::{CaptionEngine, CaptionError, CaptionSegment, StyleSpec};
pub use composer::{ComposeError, VideoComposer};
pub use probe::{DurationProbe, MediaAsset, MediaKind, ProbeError};
pub use processor::{FfProcessor, MediaProcessor, MediaTool, ProcessOutput};
