//! Screen buffer types
//!
//! Provides a character-based screen buffer for text-mode displays.

use heapless::String;

use crate::backend::{DisplayBackend, DisplayError};

/// Number of character rows on the module display
pub const SCREEN_ROWS: usize = 3;

/// Number of character columns on the module display
pub const SCREEN_COLS: usize = 16;

/// Character-based screen buffer
///
/// Implements [`DisplayBackend`] so procedures can render into memory; a
/// board can then copy the lines to the real panel, and tests can inspect
/// exactly what the operator would see.
#[derive(Clone)]
pub struct Screen {
    /// Current display content
    lines: [String<SCREEN_COLS>; SCREEN_ROWS],
    /// Whether the screen changed since the last flush
    dirty: bool,
    /// Number of flushes performed
    flushes: u32,
}

impl Default for Screen {
    fn default() -> Self {
        Self::new()
    }
}

impl Screen {
    /// Create a new empty screen
    pub fn new() -> Self {
        Self {
            lines: core::array::from_fn(|_| String::new()),
            dirty: true,
            flushes: 0,
        }
    }

    /// Get the content of a specific row, including alignment padding
    pub fn get_line(&self, row: usize) -> Option<&str> {
        self.lines.get(row).map(|s| s.as_str())
    }

    /// Get all lines as an iterator
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|s| s.as_str())
    }

    /// Check if any row contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().any(|line| line.contains(needle))
    }

    /// Check if screen changed since the last flush
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of completed flushes
    pub fn flushes(&self) -> u32 {
        self.flushes
    }
}

impl DisplayBackend for Screen {
    fn clear(&mut self) -> Result<(), DisplayError> {
        for line in &mut self.lines {
            line.clear();
        }
        self.dirty = true;
        Ok(())
    }

    fn draw_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        let row = row as usize;
        let col = col as usize;
        if row >= SCREEN_ROWS || col >= SCREEN_COLS {
            return Err(DisplayError::InvalidCoordinates);
        }

        let line = &mut self.lines[row];
        let mut existing = line.chars();
        let mut rebuilt: String<SCREEN_COLS> = String::new();
        for _ in 0..col {
            let _ = rebuilt.push(existing.next().unwrap_or(' '));
        }
        for ch in text.chars() {
            existing.next();
            if rebuilt.push(ch).is_err() {
                break;
            }
        }
        for ch in existing {
            if rebuilt.push(ch).is_err() {
                break;
            }
        }
        *line = rebuilt;
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.dirty = false;
        self.flushes += 1;
        Ok(())
    }

    fn dimensions(&self) -> (u8, u8) {
        (SCREEN_COLS as u8, SCREEN_ROWS as u8)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Screen {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Screen[");
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                defmt::write!(f, " | ");
            }
            defmt::write!(f, "{}", line.as_str());
        }
        defmt::write!(f, "]");
    }
}
