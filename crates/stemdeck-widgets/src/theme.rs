//! Shared theme constants for stemdeck front ends
//!
//! The waveform renderer only ever needs two fills: normal and muted-dim.

/// RGBA colour with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Perceived brightness in [0, 1] (Rec. 709 weights)
    pub fn luminance(&self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }
}

/// Fill for an audible stem's waveform
pub const WAVEFORM_COLOR: Color = Color::from_rgb(0.0, 0.0, 0.0);

/// Fill for a muted stem's waveform
pub const MUTED_COLOR: Color = Color::from_rgb(0.5, 0.5, 0.5);

/// Waveform fill for a stem's mute state
#[inline]
pub fn waveform_fill(muted: bool) -> Color {
    if muted {
        MUTED_COLOR
    } else {
        WAVEFORM_COLOR
    }
}

/// Stem names (short, for compact UI), slot order
pub const STEM_NAMES_SHORT: [&str; 4] = ["Drm", "Bas", "Oth", "Vox"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_depends_only_on_mute() {
        assert_eq!(waveform_fill(false), WAVEFORM_COLOR);
        assert_eq!(waveform_fill(true), MUTED_COLOR);
        assert!(MUTED_COLOR.luminance() > WAVEFORM_COLOR.luminance());
    }
}
