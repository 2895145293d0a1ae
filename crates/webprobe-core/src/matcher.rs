//! Whole-word error phrase scan over response bodies
//!
//! The phrase list is data: a built-in list ships with the crate and can be
//! replaced by a file with one phrase per line.

use std::path::{Path, PathBuf};

use regex::Regex;

const BUILTIN_PHRASES: &str = include_str!("../data/error-phrases.txt");

/// Compiled "any of these phrases, as whole words" matcher.
#[derive(Debug, Clone)]
pub struct ErrorMatcher {
    regex: Option<Regex>,
    phrase_count: usize,
}

impl ErrorMatcher {
    /// Compile the given phrases. Blank entries are ignored; matching is case-sensitive.
    ///
    /// # Errors
    ///
    /// Returns error if the combined pattern exceeds the regex size limit.
    pub fn from_phrases<I, S>(phrases: I) -> Result<Self, MatcherError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .map(|p| format!("(?:{})", regex::escape(&p)))
            .collect();

        if escaped.is_empty() {
            return Ok(Self {
                regex: None,
                phrase_count: 0,
            });
        }

        let pattern = format!(r"\b(?:{})\b", escaped.join("|"));
        let regex = Regex::new(&pattern).map_err(|e| MatcherError::Compile(e.to_string()))?;
        Ok(Self {
            regex: Some(regex),
            phrase_count: escaped.len(),
        })
    }

    /// Matcher over the bundled phrase list.
    ///
    /// # Errors
    ///
    /// Only if the bundled list fails to compile.
    pub fn builtin() -> Result<Self, MatcherError> {
        Self::from_phrases(BUILTIN_PHRASES.lines())
    }

    /// Load phrases from a file, one per line.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the phrases fail to compile.
    pub fn from_file(path: &Path) -> Result<Self, MatcherError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MatcherError::Io(path.to_path_buf(), e.to_string()))?;
        let matcher = Self::from_phrases(content.lines())?;
        tracing::debug!(
            "loaded {} error phrases from {}",
            matcher.phrase_count,
            path.display()
        );
        Ok(matcher)
    }

    /// `true` when any phrase appears as a whole word in `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    #[must_use]
    pub const fn phrase_count(&self) -> usize {
        self.phrase_count
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    #[error("Cannot read {0}: {1}")]
    Io(PathBuf, String),
    #[error("Cannot compile error phrases: {0}")]
    Compile(String),
}
