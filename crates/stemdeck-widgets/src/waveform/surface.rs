//! Drawing surfaces the waveform renderer paints onto

use crate::theme::Color;

/// Minimal 2D raster the renderer needs
///
/// Coordinates are in surface units with the origin top-left; rectangles
/// partly outside the surface are clipped by the implementation.
pub trait Surface {
    fn width(&self) -> f32;

    fn height(&self) -> f32;

    /// Erase everything drawn so far
    fn clear(&mut self);

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color);
}

const EMPTY_CELL: char = ' ';
const DARK_CELL: char = '█';
const LIGHT_CELL: char = '░';

/// Character-grid surface for terminal output, one unit per cell
#[derive(Debug, Clone)]
pub struct TextSurface {
    columns: usize,
    rows: usize,
    cells: Vec<char>,
}

impl TextSurface {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![EMPTY_CELL; columns * rows],
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Character at a cell, `None` outside the grid
    pub fn cell(&self, column: usize, row: usize) -> Option<char> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        Some(self.cells[row * self.columns + column])
    }

    /// Rows as strings, top to bottom
    pub fn lines(&self) -> Vec<String> {
        if self.columns == 0 {
            return vec![String::new(); self.rows];
        }
        self.cells
            .chunks(self.columns)
            .map(|row| row.iter().collect())
            .collect()
    }

    /// Number of painted cells
    pub fn filled(&self) -> usize {
        self.cells.iter().filter(|&&c| c != EMPTY_CELL).count()
    }

    fn glyph(color: Color) -> char {
        if color.luminance() < 0.25 {
            DARK_CELL
        } else {
            LIGHT_CELL
        }
    }

    /// Cell span covered by `[start, start + len)`, clipped to `limit`
    fn span(start: f32, len: f32, limit: usize) -> std::ops::Range<usize> {
        if !start.is_finite() || !len.is_finite() || len <= 0.0 {
            return 0..0;
        }
        let first = start.floor().max(0.0) as usize;
        let last = (start + len).ceil().max(0.0) as usize;
        first.min(limit)..last.min(limit)
    }
}

impl std::fmt::Display for TextSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, line) in self.lines().iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl Surface for TextSurface {
    fn width(&self) -> f32 {
        self.columns as f32
    }

    fn height(&self) -> f32 {
        self.rows as f32
    }

    fn clear(&mut self) {
        self.cells.fill(EMPTY_CELL);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let glyph = Self::glyph(color);
        let columns = Self::span(x, w, self.columns);
        for row in Self::span(y, h, self.rows) {
            for column in columns.clone() {
                self.cells[row * self.columns + column] = glyph;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{MUTED_COLOR, WAVEFORM_COLOR};

    #[test]
    fn test_fill_rect_paints_covered_cells() {
        let mut surface = TextSurface::new(4, 3);
        surface.fill_rect(0.5, 1.0, 1.0, 1.0, WAVEFORM_COLOR);

        assert_eq!(surface.lines(), vec!["    ", "██  ", "    "]);
        assert_eq!(surface.filled(), 2);
    }

    #[test]
    fn test_fill_rect_is_clipped() {
        let mut surface = TextSurface::new(2, 2);
        surface.fill_rect(-3.0, -3.0, 10.0, 10.0, MUTED_COLOR);
        assert_eq!(surface.filled(), 4);
        assert_eq!(surface.cell(1, 1), Some('░'));
        assert_eq!(surface.cell(2, 0), None);
    }

    #[test]
    fn test_clear_erases() {
        let mut surface = TextSurface::new(3, 1);
        surface.fill_rect(0.0, 0.0, 3.0, 1.0, WAVEFORM_COLOR);
        surface.clear();
        assert_eq!(surface.filled(), 0);
        assert_eq!(surface.to_string(), "   ");
    }

    #[test]
    fn test_degenerate_rects_paint_nothing() {
        let mut surface = TextSurface::new(3, 3);
        surface.fill_rect(1.0, 1.0, 0.0, 1.0, WAVEFORM_COLOR);
        surface.fill_rect(f32::NAN, 1.0, 1.0, 1.0, WAVEFORM_COLOR);
        assert_eq!(surface.filled(), 0);
    }
}
