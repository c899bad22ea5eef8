//! Shared display widgets for stemdeck front ends
//!
//! Rendering is written against the small [`waveform::Surface`] trait so any
//! raster can host it; [`waveform::TextSurface`] draws into a character grid
//! for the terminal player.
//!
//! ## Features
//!
//! - **Theme**: normal and muted waveform fills, short stem names
//! - **Waveform**: visible-window tracking, envelope slice renderer, per-track view
//! - **Progress**: `m:ss` time labels, text progress bar, click-to-seek fraction

pub mod progress;
pub mod theme;
pub mod waveform;

pub use progress::{format_time, fraction_from_click, progress_bar, status_line};
pub use theme::{Color, MUTED_COLOR, STEM_NAMES_SHORT, WAVEFORM_COLOR};
pub use waveform::{render, Surface, TextSurface, VisibleWindow, WaveformView};
