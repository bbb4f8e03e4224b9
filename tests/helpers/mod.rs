#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scribetwin::chunking::WordChunker;
use scribetwin::config::ScribeConfig;
use scribetwin::corpus::{Corpus, CorpusProvider};
use scribetwin::embedding::engine::EmbeddingEngine;
use scribetwin::embedding::hashing::HashingEmbeddingProvider;
use scribetwin::embedding::EmbeddingProvider;
use scribetwin::error::{Result, StyleError};
use scribetwin::judge::{JudgeSettings, LlmJudge};
use scribetwin::llm::{GenerationRequest, TextGenerator};
use scribetwin::refine::StyleRefiner;

const EVAL_MARKER: &str = "TEXT TO EVALUATE:\n";

/// Judge stand-in: answers `SCORE: x` for each scripted text, found in the prompt.
/// Unknown texts get an answer with no score in it.
pub struct ScriptedJudge {
    scores: Vec<(String, f64)>,
    pub calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new(scores: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            scores: scores.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// The text under evaluation in a judge prompt.
pub fn evaluated_text(prompt: &str) -> &str {
    let start = prompt.find(EVAL_MARKER).map_or(0, |i| i + EVAL_MARKER.len());
    let rest = &prompt[start..];
    let end = rest.find("\n\n---").unwrap_or(rest.len());
    &rest[..end]
}

#[async_trait]
impl TextGenerator for ScriptedJudge {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let text = evaluated_text(&request.prompt_text);
        Ok(match self.scores.iter().find(|(t, _)| t == text) {
            Some((_, score)) => format!("SCORE: {score}\n\nREASONING:\nscripted verdict"),
            None => "I cannot decide.".to_string(),
        })
    }
}

/// Rewrite stand-in: hands out scripted answers in order, then fails.
pub struct ScriptedRewriter {
    outputs: Mutex<VecDeque<std::result::Result<String, String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedRewriter {
    pub fn new(outputs: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.iter().map(|o| Ok(o.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(VecDeque::from([Err(message.to_string())])),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedRewriter {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        self.prompts.lock().unwrap().push(request.prompt_text.clone());
        match self.outputs.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(StyleError::Network(message)),
            None => Err(StyleError::Generation("rewrite script exhausted".into())),
        }
    }
}

/// Hashing embeddings that fail for any text containing `marker`.
pub struct FailingOn {
    inner: HashingEmbeddingProvider,
    marker: &'static str,
}

impl FailingOn {
    pub fn new(marker: &'static str) -> Self {
        Self {
            inner: HashingEmbeddingProvider::default(),
            marker,
        }
    }
}

impl EmbeddingProvider for FailingOn {
    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::ensure!(!text.contains(self.marker), "embedding backend unavailable");
        self.inner.embed(text)
    }
}

/// Corpus provider that always returns the same result.
pub struct FixedCorpus {
    result: std::result::Result<Corpus, String>,
    pub calls: AtomicUsize,
}

impl FixedCorpus {
    pub fn ok(corpus: Corpus) -> Self {
        Self {
            result: Ok(corpus),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn network_error(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CorpusProvider for FixedCorpus {
    async fn fetch(&self, _url: &str) -> Result<Corpus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(StyleError::Network)
    }
}

/// Defaults suitable for tests: no rate-limit pause, judge-only scoring so scripted
/// verdicts fully determine the combined score.
pub fn test_config() -> ScribeConfig {
    let mut config = ScribeConfig::default();
    config.embedding.provider = "hashing".into();
    config.cache.enabled = false;
    config.refinement.rate_limit_delay_ms = 0;
    config.refinement.similarity_threshold = 0.65;
    config.refinement.max_rewrite_attempts = 2;
    config.scoring.use_embedding_similarity = false;
    config.scoring.use_llm_similarity = true;
    config
}

pub fn engine_with(provider: impl EmbeddingProvider + 'static) -> Arc<EmbeddingEngine> {
    let chunker = WordChunker::new(60, 10).unwrap();
    Arc::new(EmbeddingEngine::new(Arc::new(provider), chunker, 256))
}

pub fn hashing_engine() -> Arc<EmbeddingEngine> {
    engine_with(HashingEmbeddingProvider::default())
}

pub fn judge_from(generator: Arc<dyn TextGenerator>, config: &ScribeConfig) -> Arc<LlmJudge> {
    Arc::new(LlmJudge::new(generator, JudgeSettings::from(&config.scoring), None))
}

/// Refiner over the hashing engine with scripted judge and rewriter.
pub fn scripted_refiner(
    config: &ScribeConfig,
    judge: Arc<ScriptedJudge>,
    rewriter: Arc<ScriptedRewriter>,
) -> StyleRefiner {
    StyleRefiner::new(hashing_engine(), judge_from(judge, config), rewriter, config)
}

pub const ANN_PARAGRAPHS: [&str; 3] = [
    "My cats spend the whole morning in the garden, chasing bees between the tomato plants and the lavender. I don't mind; the garden is theirs as much as mine, and the bees don't seem bothered either.",
    "By noon the cats are asleep on the warm flagstones near the garden wall. I sit with a cup of tea and watch the lavender sway. It's the quietest hour of the day, and honestly, the best one.",
    "In the evening the cats come inside, smelling of soil and sunshine. We share the sofa, the garden lamps flicker on, and I write a few lines about tomatoes, bees, and the patience of growing things.",
];

pub const BOB_PARAGRAPHS: [&str; 3] = [
    "The diesel locomotive pulled forty freight wagons across the northern plain at a steady sixty kilometres per hour. Engineers monitored traction motors, brake pressure, and fuel consumption on every section of track.",
    "Maintenance crews inspected each bogie and coupling at the depot. Wheel profiles were measured with calipers, bearings were greased, and the signalling equipment was tested against the published railway standards.",
    "Modern rail freight depends on precise scheduling. Dispatchers coordinate locomotive rosters, crew shifts, and track possessions so that engines, wagons, and signals operate together without costly delays.",
];

pub fn ann_text() -> String {
    ANN_PARAGRAPHS.join("\n\n")
}

pub fn bob_text() -> String {
    BOB_PARAGRAPHS.join("\n\n")
}

/// Two clearly distinct authors, ann first.
pub fn two_author_corpus() -> Corpus {
    let mut corpus = Corpus::new();
    corpus.push_text("ann", &ann_text());
    corpus.push_text("bob", &bob_text());
    corpus
}

/// A short draft written in ann's vocabulary.
pub const GARDEN_DRAFT: &str = "The cats were out in the garden again this morning, chasing bees through the lavender and the tomato plants while I drank my tea.";
