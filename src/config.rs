use crate::parser::DEFAULT_MAX_DEPTH;

/// Limits applied to untrusted input before and during parsing. The grammar
///  is recursive, so hosts accepting expressions from users should keep the
///  depth bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    /// Longest accepted expression in bytes; None means unlimited.
    pub max_length: Option<usize>,
    /// Deepest accepted tree: parentheses, function calls and each chained
    ///  binary operator count one level.
    pub max_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_length: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Options {
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
