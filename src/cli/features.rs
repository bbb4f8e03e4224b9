use anyhow::Result;
use std::path::Path;

use scribetwin::style::{describe_style, extract_style_features};

/// Print the stylistic features of a text file.
pub fn features(path: &Path, json: bool) -> Result<()> {
    let text = super::read_text(path)?;
    let features = extract_style_features(&text);
    let description = describe_style(&features);

    if json {
        let value = serde_json::json!({ "description": description, "features": features });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Style Features");
    println!("{}", "=".repeat(40));
    println!("  Sentences:           {}", features.sentence_count);
    println!("  Avg sentence length: {:.1} words", features.avg_sentence_length);
    println!("  Short / long:        {} / {}", features.short_sentences, features.long_sentences);
    println!("  Avg word length:     {:.2}", features.avg_word_length);
    println!("  Unique word ratio:   {:.2}", features.unique_word_ratio);
    println!("  Paragraphs:          {}", features.paragraph_count);
    println!();

    println!("Punctuation:");
    println!("  {:<12} {}", "exclamation", features.exclamation_count);
    println!("  {:<12} {}", "question", features.question_count);
    println!("  {:<12} {}", "dash", features.dash_usage);
    println!("  {:<12} {}", "colon", features.colon_usage);
    println!("  {:<12} {:.3}", "comma/word", features.comma_density);
    println!();

    println!("Formatting:");
    println!("  {:<12} {}", "bold", features.bold_usage);
    println!("  {:<12} {}", "italic", features.italic_usage);
    println!("  {:<12} {}", "list", features.list_usage);
    println!();

    println!("Style: {description}");
    Ok(())
}
