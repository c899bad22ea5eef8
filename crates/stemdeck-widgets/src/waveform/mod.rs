//! Waveform display
//!
//! - [`Surface`]: the raster contract, with [`TextSurface`] for terminals
//! - [`VisibleWindow`]: the sliding time window that follows the playhead
//! - [`render`]: draws an envelope slice onto a surface
//! - [`WaveformView`]: per-track state tying the three together

mod render;
mod surface;
mod view;
mod window;

pub use render::render;
pub use surface::{Surface, TextSurface};
pub use view::WaveformView;
pub use window::{index_range, VisibleWindow};
