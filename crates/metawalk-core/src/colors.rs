//! Escape sequences used to highlight a layout dump.
//!
//! A dump has three kinds of text: the type line (kind, name, superclass),
//! field names, and details such as offsets, encoded type names and the
//! `unsupported` marker. Each gets its own sequence; flags stay plain.

/// Highlighting for each kind of dump text.
///
/// [`Colors::OFF`] leaves every sequence empty, so the same rendering code
/// produces plain text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Colors {
    /// Type line.
    pub ty: &'static str,
    /// Field names.
    pub field: &'static str,
    /// Offsets, encoded type names, markers.
    pub detail: &'static str,
    pub reset: &'static str,
}

impl Default for Colors {
    fn default() -> Self {
        Self::OFF
    }
}

impl Colors {
    /// Blue type line, green field names, faint details.
    pub const ON: Self = Self {
        ty: "\x1b[34m",
        field: "\x1b[32m",
        detail: "\x1b[2m",
        reset: "\x1b[0m",
    };

    pub const OFF: Self = Self {
        ty: "",
        field: "",
        detail: "",
        reset: "",
    };

    pub fn new(enabled: bool) -> Self {
        if enabled { Self::ON } else { Self::OFF }
    }

    /// Wrap `text` in the `color` sequence, or return it as is when off.
    pub fn paint(&self, color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{color}{text}{}", self.reset)
        }
    }
}
