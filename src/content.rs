//! Content quality checks.
//!
//! Issues found here are reported as warnings by the refinement loop; none of them stop
//! a run.

use std::collections::HashSet;
use std::fmt;

use crate::config::ContentConfig;
use crate::text::word_count;

/// Minimum share of distinct words before text counts as repetitive.
const MIN_UNIQUE_RATIO: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentIssue {
    Empty,
    TooShort { words: usize, min: usize },
    TooLong { words: usize, max: usize },
    Repetitive,
}

impl fmt::Display for ContentIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Content is empty"),
            Self::TooShort { words, min } => {
                write!(f, "Content too short: {words} words (min: {min})")
            }
            Self::TooLong { words, max } => {
                write!(f, "Content too long: {words} words (max: {max})")
            }
            Self::Repetitive => write!(f, "Content appears repetitive"),
        }
    }
}

/// Check `text` against the configured word bounds (when `check_word_count`) and for
/// heavy repetition. Returns the first issue found.
pub fn validate_content(
    text: &str,
    bounds: &ContentConfig,
    check_word_count: bool,
) -> Result<(), ContentIssue> {
    if text.trim().is_empty() {
        return Err(ContentIssue::Empty);
    }

    let words = word_count(text);
    if check_word_count {
        if words < bounds.min_word_count {
            return Err(ContentIssue::TooShort {
                words,
                min: bounds.min_word_count,
            });
        }
        if words > bounds.max_word_count {
            return Err(ContentIssue::TooLong {
                words,
                max: bounds.max_word_count,
            });
        }
    }

    let lower = text.to_lowercase();
    let unique = lower.split_whitespace().collect::<HashSet<_>>().len();
    if (unique as f64) < words as f64 * MIN_UNIQUE_RATIO {
        return Err(ContentIssue::Repetitive);
    }
    Ok(())
}
