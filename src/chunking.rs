//! Word-window chunking for corpus embedding.

use crate::error::{Result, StyleError};

/// Splits text into overlapping windows of whole words.
///
/// Text with at most `chunk_size` words comes back as a single chunk, untouched.
/// Longer text is cut into windows of `chunk_size` words, each starting
/// `chunk_size - overlap` words after the previous one. The last window may be shorter.
#[derive(Debug, Clone, Copy)]
pub struct WordChunker {
    chunk_size: usize,
    overlap: usize,
}

impl WordChunker {
    /// # Errors
    ///
    /// Returns [`StyleError::Configuration`] if `chunk_size` is zero or
    /// `overlap >= chunk_size` (the window would never advance).
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StyleError::Configuration(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if overlap >= chunk_size {
            return Err(StyleError::Configuration(format!(
                "chunk_overlap ({overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Returns an empty `Vec` for empty or whitespace-only text.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            return Vec::new();
        }
        if words.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::with_capacity(words.len() / step + 1);
        let mut start = 0;
        while start < words.len() {
            let end = (start + self.chunk_size).min(words.len());
            chunks.push(words[start..end].join(" "));
            start += step;
        }

        tracing::debug!(chunks = chunks.len(), words = words.len(), "chunked text");
        chunks
    }
}

/// One-shot helper for callers that do not keep a chunker around.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(WordChunker::new(chunk_size, overlap)?.chunk(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numbered_words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = WordChunker::new(10, 2).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t ").is_empty());
    }

    #[test]
    fn short_text_is_returned_verbatim() {
        let chunker = WordChunker::new(10, 2).unwrap();
        let text = "Short text,  with   odd spacing.\n\nAnd a paragraph.";
        assert_eq!(chunker.chunk(text), vec![text.to_string()]);
    }

    #[test]
    fn windows_advance_by_size_minus_overlap() {
        let chunker = WordChunker::new(5, 2).unwrap();
        let chunks = chunker.chunk(&numbered_words(12));
        assert_eq!(
            chunks,
            vec![
                "w0 w1 w2 w3 w4",
                "w3 w4 w5 w6 w7",
                "w6 w7 w8 w9 w10",
                "w9 w10 w11",
            ]
        );
    }

    #[test]
    fn invalid_overlap_is_a_configuration_error() {
        assert!(matches!(
            WordChunker::new(5, 5),
            Err(StyleError::Configuration(_))
        ));
        assert!(matches!(
            WordChunker::new(0, 0),
            Err(StyleError::Configuration(_))
        ));
        assert!(chunk_text("a b c", 3, 7).is_err());
    }

    proptest! {
        #[test]
        fn chunks_respect_size_and_overlap(
            n_words in 1usize..400,
            chunk_size in 1usize..60,
            overlap_seed in 0usize..60,
        ) {
            let overlap = overlap_seed % chunk_size;
            let chunker = WordChunker::new(chunk_size, overlap).unwrap();
            let text = numbered_words(n_words);
            let chunks = chunker.chunk(&text);

            if n_words <= chunk_size {
                prop_assert_eq!(chunks, vec![text]);
            } else {
                let windows: Vec<Vec<&str>> =
                    chunks.iter().map(|c| c.split(' ').collect()).collect();
                for window in &windows {
                    prop_assert!(window.len() <= chunk_size);
                }
                let step = chunk_size - overlap;
                for pair in windows.windows(2) {
                    let (prev, next) = (&pair[0], &pair[1]);
                    let carried = &prev[step.min(prev.len())..];
                    prop_assert_eq!(carried, &next[..carried.len()]);
                }
                prop_assert_eq!(windows[0][0], "w0");
                let last_word = format!("w{}", n_words - 1);
                prop_assert!(windows.iter().any(|w| w.last() == Some(&last_word.as_str())));
            }
        }
    }
}
