//! Line readers
//!
//! A reader yields physical lines *including* the trailing newline it
//! consumed, so the scanner can do byte-accurate index accounting. The file
//! variant buffers the whole file up front; filter lists are small enough
//! that streaming buys nothing and it keeps the OS handle lifetime trivial.

use std::path::Path;

use crate::error::FilterError;

/// The capability the scanner needs from its input.
pub trait LineReader {
    /// Next physical line, trailing newline included, or `None` at the end.
    fn read_line(&mut self) -> Option<&str>;
}

fn next_line(text: &str, pos: &mut usize) -> Option<(usize, usize)> {
    if *pos >= text.len() {
        return None;
    }
    let start = *pos;
    let end = match text[start..].find('\n') {
        Some(i) => start + i + 1,
        None => text.len(),
    };
    *pos = end;
    Some((start, end))
}

/// Reads lines from a borrowed string.
pub struct StringLineReader<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> StringLineReader<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }
}

impl LineReader for StringLineReader<'_> {
    fn read_line(&mut self) -> Option<&str> {
        next_line(self.text, &mut self.pos).map(|(start, end)| &self.text[start..end])
    }
}

/// Reads lines from a file, whole-file buffered.
pub struct FileLineReader {
    text: String,
    pos: usize,
}

impl FileLineReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FilterError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self { text, pos: 0 })
    }
}

impl LineReader for FileLineReader {
    fn read_line(&mut self) -> Option<&str> {
        next_line(&self.text, &mut self.pos).map(|(start, end)| &self.text[start..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_reader_preserves_newlines() {
        let mut reader = StringLineReader::new("one\ntwo\nthree");
        assert_eq!(reader.read_line(), Some("one\n"));
        assert_eq!(reader.read_line(), Some("two\n"));
        assert_eq!(reader.read_line(), Some("three"));
        assert_eq!(reader.read_line(), None);
    }

    #[test]
    fn test_string_reader_empty() {
        let mut reader = StringLineReader::new("");
        assert_eq!(reader.read_line(), None);
    }

    #[test]
    fn test_string_reader_trailing_newline() {
        let mut reader = StringLineReader::new("only\n");
        assert_eq!(reader.read_line(), Some("only\n"));
        assert_eq!(reader.read_line(), None);
    }

    #[test]
    fn test_file_reader() {
        let path = std::env::temp_dir().join("rf_core_reader_test.txt");
        std::fs::write(&path, "||example.org^\n! comment\n").unwrap();

        let mut reader = FileLineReader::open(&path).unwrap();
        assert_eq!(reader.read_line(), Some("||example.org^\n"));
        assert_eq!(reader.read_line(), Some("! comment\n"));
        assert_eq!(reader.read_line(), None);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_file_reader_missing_file() {
        assert!(matches!(
            FileLineReader::open("/nonexistent/rf-core-no-such-file"),
            Err(FilterError::Io(_))
        ));
    }
}
