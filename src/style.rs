//! Stylistic feature extraction and style-example selection.
//!
//! [`StyleFeatures`] is descriptive only: it feeds the human-readable style line of the
//! rewrite prompt and the `features` CLI command, never the similarity score.

use serde::Serialize;

const CONTRACTIONS: [&str; 6] = ["don't", "can't", "won't", "it's", "you're", "we're"];

/// Paragraphs shorter than this are ignored when picking style examples.
const MIN_PARAGRAPH_CHARS: usize = 100;

/// An excerpt stops growing after this many paragraphs.
const MAX_EXCERPT_PARAGRAPHS: usize = 10;

/// Scalar and boolean measurements of one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleFeatures {
    pub avg_sentence_length: f64,
    pub sentence_count: usize,
    pub short_sentences: usize,
    pub long_sentences: usize,
    pub avg_word_length: f64,
    pub unique_word_ratio: f64,
    pub exclamation_count: usize,
    pub question_count: usize,
    pub comma_density: f64,
    pub dash_usage: usize,
    pub colon_usage: usize,
    pub paragraph_count: usize,
    pub bold_usage: usize,
    pub italic_usage: usize,
    pub list_usage: usize,
    pub uses_contractions: bool,
    pub uses_questions: bool,
    pub uses_em_dash: bool,
}

/// Measure `text`. Empty text yields all-zero features.
///
/// Sentences are split on `.`, `!` and `?`; words on whitespace. Short sentences have
/// fewer than 10 words, long ones more than 20.
pub fn extract_style_features(text: &str) -> StyleFeatures {
    if text.is_empty() {
        return StyleFeatures::default();
    }

    let sentences: Vec<&str> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    let words: Vec<&str> = text.split_whitespace().collect();
    let word_total = words.len().max(1) as f64;
    let sentence_words = |s: &&str| s.split_whitespace().count();

    let unique = words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<std::collections::HashSet<_>>()
        .len();
    let lower = text.to_lowercase();
    let double_stars = text.matches("**").count();

    StyleFeatures {
        avg_sentence_length: words.len() as f64 / sentences.len().max(1) as f64,
        sentence_count: sentences.len(),
        short_sentences: sentences.iter().filter(|s| sentence_words(s) < 10).count(),
        long_sentences: sentences.iter().filter(|s| sentence_words(s) > 20).count(),
        avg_word_length: words.iter().map(|w| w.chars().count()).sum::<usize>() as f64
            / word_total,
        unique_word_ratio: unique as f64 / word_total,
        exclamation_count: text.matches('!').count(),
        question_count: text.matches('?').count(),
        comma_density: text.matches(',').count() as f64 / word_total,
        dash_usage: text.matches("--").count() + text.matches('\u{2014}').count(),
        colon_usage: text.matches(':').count(),
        paragraph_count: text.matches("\n\n").count() + 1,
        bold_usage: double_stars / 2,
        italic_usage: text.matches('*').count().saturating_sub(double_stars * 2),
        list_usage: text.matches("\n*").count() + text.matches("\n-").count(),
        uses_contractions: CONTRACTIONS.iter().any(|c| lower.contains(c)),
        uses_questions: text.contains('?'),
        uses_em_dash: text.contains('\u{2014}') || text.contains("--"),
    }
}

/// One-line style summary for the rewrite prompt, e.g.
/// `"very short, punchy sentences; conversational with contractions"`.
pub fn describe_style(features: &StyleFeatures) -> String {
    let mut desc = Vec::new();

    desc.push(if features.avg_sentence_length < 12.0 {
        "very short, punchy sentences"
    } else if features.avg_sentence_length < 18.0 {
        "moderate-length sentences"
    } else {
        "longer, more complex sentences"
    });

    if features.exclamation_count > 2 {
        desc.push("enthusiastic tone with exclamations");
    }
    if features.question_count > 2 {
        desc.push("engages reader with questions");
    }
    if features.dash_usage > 1 {
        desc.push("uses dashes for emphasis or asides");
    }

    desc.push(if features.uses_contractions {
        "conversational with contractions"
    } else {
        "more formal without contractions"
    });

    if features.bold_usage > 3 {
        desc.push("emphasizes key points with bold text");
    }
    if features.list_usage > 3 {
        desc.push("uses bullet points or lists");
    }

    desc.join("; ")
}

/// Pick up to `num_examples` excerpts spread across an author's corpus.
///
/// Blank-line separated paragraphs longer than 100 chars are candidates; if there are
/// none, single lines longer than 100 chars are used instead. Excerpt *i*
/// starts at paragraph `i * (n / num_examples)` and accumulates paragraphs until it
/// reaches `min_length` chars or 10 paragraphs. With too few paragraphs the result is a
/// single prefix of `min_length * num_examples` chars.
pub fn select_diverse_examples(text: &str, num_examples: usize, min_length: usize) -> Vec<String> {
    let mut paragraphs = long_paragraphs(text, "\n\n");
    if paragraphs.is_empty() {
        paragraphs = long_paragraphs(text, "\n");
    }

    let fallback = || {
        vec![crate::text::truncate_chars(text, min_length.saturating_mul(num_examples)).to_string()]
    };
    if num_examples == 0 || paragraphs.len() < num_examples {
        return fallback();
    }

    let step = paragraphs.len() / num_examples;
    let examples: Vec<String> = (0..num_examples)
        .filter_map(|i| {
            let start = i * step;
            let end = (start + MAX_EXCERPT_PARAGRAPHS).min(paragraphs.len());
            let mut picked = Vec::new();
            let mut length = 0;
            for paragraph in &paragraphs[start..end] {
                picked.push(*paragraph);
                length += paragraph.chars().count();
                if length >= min_length {
                    break;
                }
            }
            (!picked.is_empty()).then(|| picked.join("\n\n"))
        })
        .collect();

    if examples.is_empty() {
        fallback()
    } else {
        examples
    }
}

fn long_paragraphs<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    text.split(separator)
        .map(str::trim)
        .filter(|p| p.chars().count() > MIN_PARAGRAPH_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(tag: usize) -> String {
        format!("Paragraph {tag} ").repeat(12)
    }

    #[test]
    fn empty_text_has_default_features() {
        assert_eq!(extract_style_features(""), StyleFeatures::default());
    }

    #[test]
    fn counts_sentences_and_punctuation() {
        let f = extract_style_features(
            "Hi there! Isn't it great? We're here -- today.\n\n**Bold** move, *quiet* one.",
        );
        assert_eq!(f.sentence_count, 4);
        assert_eq!(f.exclamation_count, 1);
        assert_eq!(f.question_count, 1);
        assert_eq!(f.dash_usage, 1);
        assert_eq!(f.paragraph_count, 2);
        assert_eq!(f.bold_usage, 1);
        assert_eq!(f.italic_usage, 2);
        assert!(f.uses_contractions);
        assert!(f.uses_questions);
        assert!(f.uses_em_dash);
        assert_eq!(f.short_sentences, 4);
    }

    #[test]
    fn describes_short_conversational_style() {
        let f = StyleFeatures {
            avg_sentence_length: 8.0,
            exclamation_count: 3,
            uses_contractions: true,
            ..Default::default()
        };
        assert_eq!(
            describe_style(&f),
            "very short, punchy sentences; enthusiastic tone with exclamations; conversational with contractions"
        );
    }

    #[test]
    fn describes_long_formal_style() {
        let f = StyleFeatures {
            avg_sentence_length: 25.0,
            dash_usage: 2,
            bold_usage: 4,
            list_usage: 4,
            question_count: 3,
            ..Default::default()
        };
        assert_eq!(
            describe_style(&f),
            "longer, more complex sentences; engages reader with questions; \
             uses dashes for emphasis or asides; more formal without contractions; \
             emphasizes key points with bold text; uses bullet points or lists"
        );
    }

    #[test]
    fn sentence_length_boundaries() {
        let at = |len| describe_style(&StyleFeatures {
            avg_sentence_length: len,
            ..Default::default()
        });
        assert!(at(12.0).starts_with("moderate-length"));
        assert!(at(18.0).starts_with("longer"));
    }

    #[test]
    fn selects_evenly_spaced_excerpts() {
        let text = (0..6).map(paragraph).collect::<Vec<_>>().join("\n\n");
        let examples = select_diverse_examples(&text, 3, 10);
        assert_eq!(examples.len(), 3);
        assert!(examples[0].starts_with("Paragraph 0"));
        assert!(examples[1].starts_with("Paragraph 2"));
        assert!(examples[2].starts_with("Paragraph 4"));
    }

    #[test]
    fn single_newline_paragraphs_are_split_when_no_blank_lines() {
        let text = (0..6).map(paragraph).collect::<Vec<_>>().join("\n");
        let examples = select_diverse_examples(&text, 3, 10);
        assert_eq!(examples.len(), 3);
        assert_eq!(examples[0], paragraph(0).trim());
        assert_eq!(examples[1], paragraph(2).trim());
        assert_eq!(examples[2], paragraph(4).trim());
    }

    #[test]
    fn excerpts_accumulate_until_min_length() {
        let text = (0..4).map(paragraph).collect::<Vec<_>>().join("\n\n");
        let examples = select_diverse_examples(&text, 2, 200);
        assert_eq!(examples[0], format!("{}\n\n{}", paragraph(0).trim(), paragraph(1).trim()));
    }

    #[test]
    fn falls_back_to_prefix_with_few_paragraphs() {
        let text = "short paragraph\n\nanother short one";
        assert_eq!(select_diverse_examples(text, 3, 4), vec!["short paragr".to_string()]);
    }
}
