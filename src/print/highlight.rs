//! Syntax highlighting for printed tokens.

/// Decorates individual tokens of the printed text.
///
/// Implementations must only wrap the text (e.g. in escape sequences), as
/// alignment is always computed on the undecorated text.
pub trait Highlighter {
    fn highlight_id(&self, id: &str) -> String;
    fn highlight_string(&self, quoted: &str) -> String;
    fn highlight_int(&self, int: &str) -> String;
    fn highlight_comment(&self, comment: &str) -> String;
}

/// Leaves all text undecorated.
pub struct NoHighlight;

impl Highlighter for NoHighlight {
    fn highlight_id(&self, id: &str) -> String {
        id.to_string()
    }
    fn highlight_string(&self, quoted: &str) -> String {
        quoted.to_string()
    }
    fn highlight_int(&self, int: &str) -> String {
        int.to_string()
    }
    fn highlight_comment(&self, comment: &str) -> String {
        comment.to_string()
    }
}

/// Color palettes built-in for convenience (colors are RGB, as `[u8; 3]`).
pub mod palettes {
    /// Minimalist palette, chosen to work with both light and dark backgrounds.
    pub mod simple {
        pub const DARK_GRAY: [u8; 3] = [0x44, 0x44, 0x44];
        pub const LIGHT_GRAY: [u8; 3] = [0x88, 0x88, 0x88];

        pub const RED: [u8; 3] = [0xcc, 0x55, 0x55];
        pub const GREEN: [u8; 3] = [0x44, 0x99, 0x44];
        pub const BLUE: [u8; 3] = [0x44, 0x66, 0xcc];

        pub const YELLOW: [u8; 3] = [0xcc, 0x99, 0x44];
        pub const MAGENTA: [u8; 3] = [0xcc, 0x44, 0xcc];
        pub const CYAN: [u8; 3] = [0x44, 0x99, 0xcc];

        pub const ORANGE: [u8; 3] = [0xcc, 0x77, 0x55];
    }
}

/// Wraps tokens in 24-bit ("true color") ANSI escapes, using
/// [`palettes::simple`].
pub struct AnsiHighlighter;

impl AnsiHighlighter {
    fn paint(text: &str, [r, g, b]: [u8; 3]) -> String {
        format!("\x1b[38;2;{r};{g};{b}m{text}\x1b[0m")
    }
}

impl Highlighter for AnsiHighlighter {
    fn highlight_id(&self, id: &str) -> String {
        Self::paint(id, palettes::simple::ORANGE)
    }
    fn highlight_string(&self, quoted: &str) -> String {
        Self::paint(quoted, palettes::simple::RED)
    }
    fn highlight_int(&self, int: &str) -> String {
        Self::paint(int, palettes::simple::YELLOW)
    }
    fn highlight_comment(&self, comment: &str) -> String {
        Self::paint(comment, palettes::simple::LIGHT_GRAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_escapes_wrap_the_text() {
        assert_eq!(AnsiHighlighter.highlight_int("42"), "\x1b[38;2;204;153;68m42\x1b[0m");
        assert_eq!(NoHighlight.highlight_id("%1"), "%1");
    }
}
