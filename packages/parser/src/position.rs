use serde::{Deserialize, Serialize};

/// Line/column location; `line` is 1-based, `column` counts chars from 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Byte offsets of every line start in a source text
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            source
                .bytes()
                .enumerate()
                .filter(|(_, byte)| *byte == b'\n')
                .map(|(idx, _)| idx + 1),
        );
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position(&self, source: &str, offset: usize) -> Position {
        let offset = offset.min(source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let column = source
            .get(start..offset)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(offset - start);
        Position::new(line as u32 + 1, column as u32)
    }

    /// Byte offset of `pos`, or `None` if it lies outside the text
    pub fn offset(&self, source: &str, pos: Position) -> Option<usize> {
        let line = (pos.line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(line)?;
        let end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(source.len());
        let text = &source[start..end];
        if pos.column == 0 {
            return Some(start);
        }
        let mut chars = text.char_indices();
        match chars.nth(pos.column as usize) {
            Some((idx, _)) => Some(start + idx),
            None if text.chars().count() == pos.column as usize => Some(end),
            None => None,
        }
    }
}
