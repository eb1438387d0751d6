//! Video composition: captions, overlays and the FFmpeg render.

mod captions;
mod composer;
mod ffmpeg;
mod overlay;

pub use captions::{build_cues, plan_captions, split_sentences, CaptionCue};
pub use composer::{ComposeError, RenderedVideo, VideoComposer};
pub use ffmpeg::{
    build_filter_graph, build_render_args, fit_footage, parse_media_duration, EncodeSettings,
    Ffmpeg, FootageFit, MediaError, MediaToolkit, RenderPlan,
};
pub use overlay::{
    escape_drawtext, render_overlay, render_overlays, wrap_caption, CaptionStyle, OverlayError,
    PLACEHOLDER_CAPTION,
};
