//! Display backend trait
//!
//! Defines the interface for different display types.

/// Display backend errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Communication error with display
    Communication,
    /// Invalid coordinates or dimensions
    InvalidCoordinates,
}

/// Display backend trait
///
/// Provides a hardware-agnostic interface for rendering to displays.
pub trait DisplayBackend {
    /// Clear the entire display
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Draw text at the specified row and column
    ///
    /// - `row`: Row number (0-based)
    /// - `col`: Column number in characters (0-based)
    /// - `text`: Text to display, truncated at the right edge
    fn draw_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError>;

    /// Flush buffered content to the display
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Get the display dimensions
    ///
    /// Returns (columns, rows) in character units
    fn dimensions(&self) -> (u8, u8);
}

/// Helper trait for the calibration screen layout
pub trait DisplayExt: DisplayBackend {
    /// Replace the screen with up to three centred lines
    ///
    /// Lines beyond the display height are dropped. Leading and trailing
    /// spaces are significant, so callers can align button hints.
    fn show_lines(&mut self, line1: &str, line2: &str, line3: &str) -> Result<(), DisplayError> {
        let (cols, rows) = self.dimensions();
        self.clear()?;
        for (row, line) in [line1, line2, line3].into_iter().enumerate() {
            if row >= rows as usize {
                break;
            }
            if line.is_empty() {
                continue;
            }
            let len = line.chars().count().min(cols as usize);
            let col = (cols as usize - len) / 2;
            self.draw_text(row as u8, col as u8, line)?;
        }
        self.flush()
    }
}

// Blanket implementation for all DisplayBackend types
impl<T: DisplayBackend> DisplayExt for T {}
