//! Transport read-outs: time labels, progress bar and click-to-seek

use stemdeck_core::engine::PlaybackSnapshot;

/// Format seconds as `m:ss`
///
/// Minutes are not wrapped into hours. NaN, infinite and negative inputs
/// render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Progress fraction for a click at `x` on a bar `width` units wide
pub fn fraction_from_click(x: f64, width: f64) -> f64 {
    if !width.is_finite() || width <= 0.0 || x.is_nan() {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0)
}

/// Text progress bar, `width` cells wide
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    };
    let filled = ((fraction * width as f64).round() as usize).min(width);
    format!("{}{}", "=".repeat(filled), "-".repeat(width - filled))
}

/// `position [bar] duration` line for a snapshot
pub fn status_line(snapshot: &PlaybackSnapshot, bar_width: usize) -> String {
    format!(
        "{} [{}] {}",
        format_time(snapshot.position),
        progress_bar(snapshot.progress(), bar_width),
        format_time(snapshot.duration)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(5.9), "0:05");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(3725.4), "62:05");
    }

    #[test]
    fn test_format_time_degenerate() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    #[test]
    fn test_fraction_from_click() {
        assert_eq!(fraction_from_click(50.0, 200.0), 0.25);
        assert_eq!(fraction_from_click(-5.0, 200.0), 0.0);
        assert_eq!(fraction_from_click(500.0, 200.0), 1.0);
        assert_eq!(fraction_from_click(10.0, 0.0), 0.0);
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "----");
        assert_eq!(progress_bar(0.5, 4), "==--");
        assert_eq!(progress_bar(1.5, 4), "====");
        assert_eq!(progress_bar(f64::NAN, 2), "--");
    }

    #[test]
    fn test_status_line() {
        let snapshot = PlaybackSnapshot {
            position: 30.0,
            duration: 120.0,
            ..PlaybackSnapshot::default()
        };
        assert_eq!(status_line(&snapshot, 8), "0:30 [==------] 2:00");
    }
}
