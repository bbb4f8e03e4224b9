//! Style rewrite step.
//!
//! [`build_rewrite_prompt`] is a pure function of its inputs so prompt wording can be
//! tested without a model. [`Rewriter`] sends the prompt to a [`TextGenerator`] and
//! treats an empty answer as [`StyleError::EmptyRewrite`].

use std::sync::Arc;

use crate::config::ScribeConfig;
use crate::error::{Result, StyleError};
use crate::llm::{GenerationRequest, TextGenerator};

/// Knobs that shape the rewrite prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptOptions {
    pub detailed: bool,
    pub use_multiple_examples: bool,
    pub num_examples: usize,
    pub min_words: usize,
    pub max_words: usize,
}

impl PromptOptions {
    pub fn from_config(config: &ScribeConfig) -> Self {
        Self {
            detailed: config.style.detailed_prompt,
            use_multiple_examples: config.style.use_multiple_examples,
            num_examples: config.style.num_examples,
            min_words: config.content.min_word_count,
            max_words: config.content.max_word_count,
        }
    }
}

fn examples_section(examples: &[String], options: &PromptOptions) -> String {
    if options.use_multiple_examples && examples.len() > 1 {
        examples
            .iter()
            .take(options.num_examples)
            .enumerate()
            .map(|(i, ex)| format!("STYLE EXAMPLE {}:\n{ex}", i + 1))
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        format!(
            "STYLE EXAMPLE:\n{}",
            examples.first().map(String::as_str).unwrap_or("")
        )
    }
}

/// Render the rewrite prompt.
///
/// `style_description` is the output of [`crate::style::describe_style`], or empty when
/// feature extraction is turned off. It only appears in the detailed variant.
pub fn build_rewrite_prompt(
    text: &str,
    examples: &[String],
    author: &str,
    style_description: &str,
    options: &PromptOptions,
) -> String {
    let examples = examples_section(examples, options);
    let (min, max) = (options.min_words, options.max_words);

    if options.detailed {
        format!(
            "You are rewriting a blog post to match {author}'s distinctive writing style.

ORIGINAL TEXT TO REWRITE:
{text}

---

{examples}

---

STYLE ANALYSIS:
{author}'s writing style is characterized by: {style_description}

REWRITING INSTRUCTIONS:
1. **Sentence Structure**: Match the rhythm and length of sentences from the examples
2. **Vocabulary**: Use similar word choices, technical terms, and expressions
3. **Tone**: Capture the same level of formality/casualness and enthusiasm
4. **Punctuation**: Mirror the use of dashes, commas, exclamations, and questions
5. **Paragraph Flow**: Follow similar paragraph transitions and structure
6. **Rhetorical Devices**: If the author uses metaphors, analogies, or questions, include similar devices
7. **Content Preservation**: Keep ALL factual information and key points from the original
8. **Length Target**: {min}-{max} words

CRITICAL: The rewrite must sound like {author} wrote it while preserving all original information.

Rewritten blog post:"
        )
    } else {
        format!(
            "Rewrite this blog post to match {author}'s writing style.

STYLE EXAMPLES from {author}:
{examples}

TEXT TO REWRITE:
{text}

Instructions:
- Match the tone, vocabulary, and sentence patterns from the examples
- Preserve all key facts and information
- Target length: {min}-{max} words
- Make it sound authentically like {author}

Rewritten post:"
        )
    }
}

/// Drives one rewrite call per attempt.
pub struct Rewriter {
    generator: Arc<dyn TextGenerator>,
    options: PromptOptions,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Rewriter {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &ScribeConfig) -> Self {
        Self {
            generator,
            options: PromptOptions::from_config(config),
            model: config.generation.model.clone(),
            max_tokens: config.generation.max_output_tokens,
            temperature: config.generation.temperature,
        }
    }

    /// Rewrite `text` in `author`'s style. Returns the trimmed candidate.
    ///
    /// # Errors
    ///
    /// [`StyleError::EmptyRewrite`] for a blank answer; generator errors pass through.
    pub async fn rewrite(
        &self,
        text: &str,
        examples: &[String],
        author: &str,
        style_description: &str,
    ) -> Result<String> {
        let request = GenerationRequest {
            prompt_text: build_rewrite_prompt(text, examples, author, style_description, &self.options),
            model_id: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };
        let output = self.generator.generate(&request).await?;
        let candidate = output.trim();
        if candidate.is_empty() {
            return Err(StyleError::EmptyRewrite);
        }
        tracing::debug!(chars = candidate.len(), "rewrite complete");
        Ok(candidate.to_string())
    }
}
