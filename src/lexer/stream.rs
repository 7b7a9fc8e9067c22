//! Character stream with pattern-based lookahead.
//!
//! Token rules describe what they expect as regex character classes
//! (`"[0-9]"`, `"[A-Za-z_]"`, …), one pattern per character of lookahead.
//! Compiled classes are cached process-wide so the per-character cost is a
//! map lookup.

use std::{collections::HashMap, sync::Mutex};

use once_cell::sync::Lazy;
use regex::Regex;

static PATTERNS: Lazy<Mutex<HashMap<String, Regex>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Check a single character against a character-class pattern. An invalid
/// class is an implementation bug in a token rule, not a user error.
fn char_matches(pattern: &str, c: char) -> bool {
    let mut patterns = PATTERNS.lock().expect("pattern cache poisoned");
    let regex = patterns
        .entry(pattern.to_string())
        .or_insert_with(|| Regex::new(pattern).expect("invalid character class"));

    let mut buffer = [0u8; 4];
    regex.is_match(c.encode_utf8(&mut buffer))
}

/// The lexer's view of the input: a current `index` plus a `length`
/// counting the characters consumed since the last [`CharStream::emit`].
pub(crate) struct CharStream {
    chars: Vec<char>,
    index: usize,
    length: usize,
}

impl CharStream {
    pub fn new(input: &str) -> CharStream {
        CharStream {
            chars: input.chars().collect(),
            index: 0,
            length: 0,
        }
    }

    /// Whether at least one more character is available.
    pub fn has(&self) -> bool {
        self.index < self.chars.len()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Check the next `patterns.len()` characters against the given
    /// character classes without advancing.
    pub fn peek(&self, patterns: &[&str]) -> bool {
        patterns.iter().enumerate().all(|(offset, pattern)| {
            self.chars
                .get(self.index + offset)
                .is_some_and(|c| char_matches(pattern, *c))
        })
    }

    /// Like [`CharStream::peek`], but advance past the matched characters
    /// on success.
    pub fn take(&mut self, patterns: &[&str]) -> bool {
        if !self.peek(patterns) {
            return false;
        }

        self.index += patterns.len();
        self.length += patterns.len();
        true
    }

    /// Return the substring consumed since the last emit and reset the
    /// length counter.
    pub fn emit(&mut self) -> String {
        let start = self.index - self.length;
        let literal = self.chars[start..self.index].iter().collect();
        self.length = 0;
        literal
    }

    /// The not-yet-consumed remainder, for error messages.
    pub fn remaining(&self) -> String {
        self.chars[self.index..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::CharStream;

    #[test]
    fn test_peek_does_not_advance() {
        let stream = CharStream::new("abc");

        assert!(stream.peek(&["[a-z]"]));
        assert!(stream.peek(&["[a-z]", "[a-z]", "c"]));
        assert!(!stream.peek(&["[0-9]"]));
        assert_eq!(stream.index(), 0);
    }

    #[test]
    fn test_take_advances_on_match() {
        let mut stream = CharStream::new("a1");

        assert!(stream.take(&["[a-z]", "[0-9]"]));
        assert_eq!(stream.index(), 2);
        assert!(!stream.has());
    }

    #[test]
    fn test_take_leaves_index_on_mismatch() {
        let mut stream = CharStream::new("a1");

        assert!(!stream.take(&["[a-z]", "[a-z]"]));
        assert_eq!(stream.index(), 0);
    }

    #[test]
    fn test_emit_returns_consumed_substring() {
        let mut stream = CharStream::new("foo bar");

        for _ in 0..3 {
            stream.take(&["[a-z]"]);
        }

        assert_eq!(stream.emit(), "foo");
        assert_eq!(stream.emit(), "");
    }

    #[test]
    fn test_peek_beyond_end() {
        let stream = CharStream::new("a");
        assert!(!stream.peek(&["[a-z]", "[a-z]"]));
    }
}
