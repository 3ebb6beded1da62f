//! Character display model
//!
//! The terminal's at-a-glance display is a 16x4 character panel. Row 0
//! holds the tag UID, rows 1-3 show the current operation or error.

pub const ROWS: usize = 4;
pub const COLUMNS: usize = 16;

/// Contents of the 16x4 status display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusDisplay {
    rows: [String; ROWS],
}

impl StatusDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one row, truncated to the panel width
    ///
    /// Writing an operation row (1..) clears the rows below it.
    pub fn set_row(&mut self, row: usize, text: &str) {
        if row >= ROWS {
            return;
        }
        if row > 0 {
            self.clear_from(row);
        }
        self.rows[row] = text.chars().take(COLUMNS).collect();
    }

    /// Show an error label below the UID row
    pub fn show_error(&mut self, label: &str) {
        self.clear_from(1);
        self.rows[1] = "ERROR:".to_string();
        self.rows[2] = label.chars().take(COLUMNS).collect();
    }

    fn clear_from(&mut self, first: usize) {
        for row in &mut self.rows[first..] {
            row.clear();
        }
    }

    pub fn row(&self, row: usize) -> &str {
        self.rows.get(row).map(String::as_str).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_row_truncates() {
        let mut display = StatusDisplay::new();
        display.set_row(1, "this text is far too long for the panel");
        assert_eq!(display.row(1).len(), COLUMNS);
    }

    #[test]
    fn test_operation_row_clears_below() {
        let mut display = StatusDisplay::new();
        display.show_error("AUTH FAILED");
        display.set_row(1, "->SEE STATEMENT");
        assert_eq!(display.row(1), "->SEE STATEMENT");
        assert_eq!(display.row(2), "");
    }

    #[test]
    fn test_out_of_range_row_ignored() {
        let mut display = StatusDisplay::new();
        display.set_row(7, "nothing");
        assert_eq!(display.row(7), "");
        assert_eq!(display, StatusDisplay::new());
    }
}
