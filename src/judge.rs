//! LLM style judge.
//!
//! Asks a generative model to rate how closely a text matches an author's style and
//! parses a `[0, 1]` score out of the free-text answer. The judge never fails: a
//! transport error, an empty answer, or an unparseable one all yield the neutral
//! score [`NEUTRAL_SCORE`] with a rationale saying why.
//!
//! Verdicts are cached in memory and, optionally, on disk as `llm_sim_<hash>.json`,
//! keyed by the judged text plus the first style example.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::{content_hash, BoundedCache, DiskCache, LLM_SCORE_NAMESPACE};
use crate::config::ScoringConfig;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::text::truncate_chars;

/// Score reported when no real verdict is available.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// At most this many style examples are shown to the judge.
const MAX_JUDGE_EXAMPLES: usize = 2;

/// Score labels in priority order. Labels match in any case; the first match in the
/// output wins within a pattern.
static SCORE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)score:\s*([0-9]*\.?[0-9]+)",
        r"([0-9]*\.?[0-9]+)\s*/\s*1\.0",
        r"(?i)rating:\s*([0-9]*\.?[0-9]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid score pattern"))
    .collect()
});

/// A judge's verdict on one text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeVerdict {
    pub score: f64,
    pub rationale: String,
}

/// On-disk cache document.
#[derive(Debug, Serialize, Deserialize)]
struct CachedVerdict {
    score: f64,
    reasoning: String,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Parse a score from model output.
///
/// Values above 1.0 are treated as out of 10 (if ≤ 10) or out of 100 (if ≤ 100).
/// The result is clamped to `[0, 1]`. `None` if no pattern matches.
pub fn parse_score(output: &str) -> Option<f64> {
    SCORE_PATTERNS.iter().find_map(|pattern| {
        let raw: f64 = pattern.captures(output)?.get(1)?.as_str().parse().ok()?;
        let scaled = if raw > 1.0 && raw <= 10.0 {
            raw / 10.0
        } else if raw > 10.0 && raw <= 100.0 {
            raw / 100.0
        } else {
            raw
        };
        Some(scaled.clamp(0.0, 1.0))
    })
}

/// Tunables for [`LlmJudge`], lifted from [`ScoringConfig`].
#[derive(Debug, Clone)]
pub struct JudgeSettings {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub excerpt_chars: usize,
    pub text_chars: usize,
    pub cache_capacity: usize,
}

impl From<&ScoringConfig> for JudgeSettings {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            model: config.judge_model.clone(),
            max_tokens: config.judge_max_tokens,
            temperature: config.judge_temperature,
            excerpt_chars: config.judge_excerpt_chars,
            text_chars: config.judge_text_chars,
            cache_capacity: config.score_cache_capacity,
        }
    }
}

pub struct LlmJudge {
    generator: Arc<dyn TextGenerator>,
    settings: JudgeSettings,
    memory: BoundedCache<String, JudgeVerdict>,
    disk: Option<DiskCache>,
}

impl LlmJudge {
    /// `disk` enables the persistent `llm_sim_*` cache; the in-memory cache is always on.
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        settings: JudgeSettings,
        disk: Option<DiskCache>,
    ) -> Self {
        let memory = BoundedCache::new(settings.cache_capacity);
        Self {
            generator,
            settings,
            memory,
            disk,
        }
    }

    /// Build a judge from config. The disk cache is used only when both the global
    /// cache and LLM-score caching are enabled.
    pub fn from_config(generator: Arc<dyn TextGenerator>, config: &crate::config::ScribeConfig) -> Self {
        let disk = (config.cache.enabled && config.scoring.cache_llm_scores)
            .then(|| DiskCache::new(config.resolved_cache_dir()));
        Self::new(generator, JudgeSettings::from(&config.scoring), disk)
    }

    /// Rate how well `text` matches `author`'s style, judged against `style_examples`.
    pub async fn score(&self, text: &str, style_examples: &[String], author: &str) -> JudgeVerdict {
        let first_example = style_examples.first().map(String::as_str).unwrap_or("");
        let key = content_hash(&[text, first_example]);

        if let Some(hit) = self.memory.get(&key) {
            tracing::debug!(score = hit.score, "judge cache hit (memory)");
            return hit;
        }
        if let Some(disk) = &self.disk {
            if let Some(cached) = disk.read::<CachedVerdict>(LLM_SCORE_NAMESPACE, &key) {
                tracing::debug!(score = cached.score, "judge cache hit (disk)");
                let verdict = JudgeVerdict {
                    score: cached.score,
                    rationale: cached.reasoning,
                };
                self.memory.insert(key, verdict.clone());
                return verdict;
            }
        }

        let request = GenerationRequest {
            prompt_text: self.build_prompt(text, style_examples, author),
            model_id: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        };

        let output = match self.generator.generate(&request).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(error = %e, "LLM similarity scoring failed");
                return JudgeVerdict {
                    score: NEUTRAL_SCORE,
                    rationale: format!("Error: {e}"),
                };
            }
        };
        if output.trim().is_empty() {
            tracing::warn!("LLM similarity scoring returned empty response");
            return JudgeVerdict {
                score: NEUTRAL_SCORE,
                rationale: "No response from LLM".into(),
            };
        }

        let score = parse_score(&output).unwrap_or_else(|| {
            tracing::warn!("no score found in judge response, using neutral score");
            NEUTRAL_SCORE
        });
        tracing::debug!(score, "LLM similarity score");

        let verdict = JudgeVerdict {
            score,
            rationale: output,
        };
        self.remember(key, &verdict);
        verdict
    }

    fn remember(&self, key: String, verdict: &JudgeVerdict) {
        if let Some(disk) = &self.disk {
            disk.write(
                LLM_SCORE_NAMESPACE,
                &key,
                &CachedVerdict {
                    score: verdict.score,
                    reasoning: verdict.rationale.clone(),
                    timestamp: chrono::Utc::now(),
                },
            );
        }
        self.memory.insert(key, verdict.clone());
    }

    fn build_prompt(&self, text: &str, style_examples: &[String], author: &str) -> String {
        let examples = style_examples
            .iter()
            .take(MAX_JUDGE_EXAMPLES)
            .enumerate()
            .map(|(i, ex)| {
                format!(
                    "AUTHOR EXAMPLE {}:\n{}",
                    i + 1,
                    truncate_chars(ex, self.settings.excerpt_chars)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");
        let evaluated = truncate_chars(text, self.settings.text_chars);

        format!(
            "You are an expert literary analyst evaluating writing style similarity.

TASK: Rate how well the TEXT TO EVALUATE matches {author}'s distinctive writing style.

{examples}

---

TEXT TO EVALUATE:
{evaluated}

---

EVALUATION CRITERIA:
Analyze these specific aspects and provide detailed reasoning:

1. **Sentence Structure** (20 points)
2. **Vocabulary & Word Choice** (20 points)
3. **Tone & Voice** (20 points)
4. **Punctuation & Formatting** (15 points)
5. **Rhetorical Devices** (15 points)
6. **Paragraph Structure** (10 points)

Provide your response in this EXACT format:

SCORE: [0.0 to 1.0]

REASONING:
[Detailed analysis]

STRENGTHS:
[What matches well]

WEAKNESSES:
[What doesn't match]"
        )
    }
}
