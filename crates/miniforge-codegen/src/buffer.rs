//! Line buffer shared by the generators.
//!
//! Generators push units while walking the tree; [`LineBuffer::join`]
//! turns them into text once, attaching trailing comments to the line
//! they follow.

/// One emitted unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Unit {
    Text(String),
    /// `//text`. A trailing comment continues the previous line.
    Comment { text: String, trailing: bool },
    Eol,
}

/// Append-only sequence of [`Unit`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineBuffer {
    units: Vec<Unit>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.units.push(Unit::Text(text));
        }
    }

    pub fn comment(&mut self, text: impl Into<String>, trailing: bool) {
        self.units.push(Unit::Comment {
            text: text.into(),
            trailing,
        });
    }

    pub fn eol(&mut self) {
        self.units.push(Unit::Eol);
    }

    /// Move every unit of `other` to the end of this buffer.
    pub fn append(&mut self, other: LineBuffer) {
        self.units.extend(other.units);
    }

    /// `true` if any line break was emitted.
    pub fn has_break(&self) -> bool {
        self.units.iter().any(|unit| matches!(unit, Unit::Eol))
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Join into text. Trailing line breaks are dropped.
    pub fn join(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            match unit {
                Unit::Text(text) => out.push_str(text),
                Unit::Eol => out.push('\n'),
                Unit::Comment {
                    text,
                    trailing: true,
                } => {
                    if out.ends_with('\n') {
                        out.pop();
                    }
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push(' ');
                    }
                    out.push_str("//");
                    out.push_str(text);
                }
                Unit::Comment {
                    text,
                    trailing: false,
                } => {
                    out.push_str("//");
                    out.push_str(text);
                }
            }
        }
        while out.ends_with('\n') {
            out.pop();
        }
        out
    }
}

/// Blank lines between a construct ending on `prev_end` and the next one
/// starting on `next_start`.
pub(crate) fn blank_lines(prev_end: u32, next_start: u32) -> usize {
    next_start.saturating_sub(prev_end).saturating_sub(1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_lines() {
        let mut buf = LineBuffer::new();
        buf.text("a = 1");
        buf.eol();
        buf.text("b = 2");
        buf.eol();
        assert_eq!(buf.join(), "a = 1\nb = 2");
    }

    #[test]
    fn test_trailing_comment_joins_previous_line() {
        let mut buf = LineBuffer::new();
        buf.text("a = 1");
        buf.eol();
        buf.comment(" note", true);
        buf.eol();
        buf.comment(" own line", false);
        buf.eol();
        assert_eq!(buf.join(), "a = 1 // note\n// own line");
    }

    #[test]
    fn test_has_break_and_append() {
        let mut scratch = LineBuffer::new();
        scratch.text("x");
        assert!(!scratch.has_break());
        let mut buf = LineBuffer::new();
        buf.text("[");
        buf.append(scratch);
        buf.text("]");
        assert_eq!(buf.join(), "[x]");
        buf.eol();
        assert!(buf.has_break());
    }

    #[test]
    fn test_blank_lines_clamp_at_zero() {
        assert_eq!(blank_lines(1, 2), 0);
        assert_eq!(blank_lines(1, 4), 2);
        assert_eq!(blank_lines(3, 3), 0);
        assert_eq!(blank_lines(5, 2), 0);
    }
}
