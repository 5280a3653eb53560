use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanError {
    #[error("inverted span ({0},{1})")]
    Inverted(usize, usize),
    #[error("span ({start},{end}) exceeds text length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("unparseable index string: {0:?}")]
    Unparseable(String),
}

/// Half-open range of character (not byte) offsets into the preprocessed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharSpan {
    pub start: usize,
    pub end: usize,
}

impl CharSpan {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Build a span and check it against the length of the text it indexes.
    pub fn checked(start: usize, end: usize, len: usize) -> Result<Self, SpanError> {
        if start > end {
            return Err(SpanError::Inverted(start, end));
        }
        if end > len {
            return Err(SpanError::OutOfBounds { start, end, len });
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) as f64 / 2.0
    }

    /// Number of characters shared by both spans.
    #[must_use]
    pub fn overlap(&self, other: &Self) -> usize {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end.saturating_sub(start)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.overlap(other) > 0
    }

    #[must_use]
    pub const fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[must_use]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Loose span equality: both endpoints within `tolerance` characters.
    #[must_use]
    pub const fn roughly_equals(&self, other: &Self, tolerance: usize) -> bool {
        self.start.abs_diff(other.start) <= tolerance && self.end.abs_diff(other.end) <= tolerance
    }

    /// Head-span coverage used when linking mentions: at least two shared
    /// characters, or the whole of a shorter span.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        let needed = 2.min(self.len()).min(other.len()).max(1);
        self.overlap(other) >= needed
    }

    /// Wire form `"(s,e)"`.
    #[must_use]
    pub fn to_index(&self) -> String {
        format!("({},{})", self.start, self.end)
    }

    pub fn parse_index(index: &str) -> Result<Self, SpanError> {
        let bad = || SpanError::Unparseable(index.to_string());
        let inner = index
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(bad)?;
        let (start, end) = inner.split_once(',').ok_or_else(bad)?;
        let start = start.parse().map_err(|_| bad())?;
        let end = end.parse().map_err(|_| bad())?;
        if start > end {
            return Err(SpanError::Inverted(start, end));
        }
        Ok(Self { start, end })
    }
}

impl std::fmt::Display for CharSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.start, self.end)
    }
}

/// Render an optional span the way quote records expect it: empty when absent.
#[must_use]
pub fn index_or_empty(span: Option<CharSpan>) -> String {
    span.map(|s| s.to_index()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_wire_form() {
        let span = CharSpan::new(3, 17);
        assert_eq!(span.to_index(), "(3,17)");
        assert_eq!(CharSpan::parse_index("(3,17)").unwrap(), span);
        assert_eq!(index_or_empty(None), "");
    }

    #[test]
    fn test_parse_index_rejects_garbage() {
        assert!(CharSpan::parse_index("").is_err());
        assert!(CharSpan::parse_index("(3, 17)").is_err());
        assert!(CharSpan::parse_index("3,17").is_err());
        assert_eq!(
            CharSpan::parse_index("(9,2)"),
            Err(SpanError::Inverted(9, 2))
        );
    }

    #[test]
    fn test_checked_bounds() {
        assert!(CharSpan::checked(0, 5, 5).is_ok());
        assert!(matches!(
            CharSpan::checked(2, 9, 5),
            Err(SpanError::OutOfBounds { .. })
        ));
        assert!(matches!(CharSpan::checked(4, 1, 5), Err(SpanError::Inverted(4, 1))));
    }

    #[test]
    fn test_overlap_and_cover() {
        let a = CharSpan::new(0, 10);
        let b = CharSpan::new(8, 20);
        assert_eq!(a.overlap(&b), 2);
        assert!(a.covers(&b));
        assert!(!a.covers(&CharSpan::new(9, 20)));
        assert!(!a.overlaps(&CharSpan::new(10, 12)));
        assert!(CharSpan::new(4, 5).covers(&CharSpan::new(4, 5)));
    }

    #[test]
    fn test_roughly_equals() {
        let a = CharSpan::new(10, 40);
        assert!(a.roughly_equals(&CharSpan::new(12, 43), 3));
        assert!(!a.roughly_equals(&CharSpan::new(14, 40), 3));
    }
}
