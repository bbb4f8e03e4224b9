mod helpers;

use std::sync::Arc;

use helpers::*;
use scribetwin::config::ScribeConfig;
use scribetwin::embedding::engine::EmbeddingEngine;
use scribetwin::scoring::MultiModalScorer;

const TEXT: &str = GARDEN_DRAFT;
const BOOM: &str = "BOOM goes the garden hose, and the cats scatter.";

fn both_signals() -> ScribeConfig {
    let mut config = test_config();
    config.scoring.use_embedding_similarity = true;
    config.scoring.use_llm_similarity = true;
    config.scoring.embedding_weight = 0.4;
    config.scoring.llm_weight = 0.6;
    config
}

fn scorer(engine: Arc<EmbeddingEngine>, judge: Arc<ScriptedJudge>, config: &ScribeConfig) -> MultiModalScorer {
    let centroids = Arc::new(engine.build_centroids(&two_author_corpus()).unwrap());
    MultiModalScorer::new(engine, centroids, judge_from(judge, config), config.scoring.clone())
}

fn examples() -> Vec<String> {
    vec![ann_text()]
}

#[tokio::test]
async fn both_signals_are_blended_by_weight() {
    let config = both_signals();
    let scorer = scorer(hashing_engine(), ScriptedJudge::new(&[(TEXT, 0.8)]), &config);

    let result = scorer.compute_similarity(TEXT, "ann", &examples()).await;

    let embedding = result.embedding_score.expect("embedding signal present");
    assert!((-1.0..=1.0).contains(&embedding));
    assert_eq!(result.llm_score, Some(0.8));
    let expected = 0.4 * embedding + 0.6 * 0.8;
    assert!((result.combined_score - expected).abs() < 1e-12);
    assert!(result.rationale.contains("scripted verdict"));
}

#[tokio::test]
async fn closer_author_gets_higher_embedding_score() {
    let config = both_signals();
    let scorer = scorer(hashing_engine(), ScriptedJudge::new(&[]), &config);

    let ann = scorer.compute_similarity(TEXT, "ann", &examples()).await;
    let bob = scorer.compute_similarity(TEXT, "bob", &examples()).await;

    assert!(ann.embedding_score.unwrap() > bob.embedding_score.unwrap());
}

#[tokio::test]
async fn failing_embedding_leaves_the_judge_score() {
    let config = both_signals();
    let scorer = scorer(engine_with(FailingOn::new("BOOM")), ScriptedJudge::new(&[(BOOM, 0.7)]), &config);

    let result = scorer.compute_similarity(BOOM, "ann", &examples()).await;

    assert_eq!(result.embedding_score, None);
    assert_eq!(result.llm_score, Some(0.7));
    assert_eq!(result.combined_score, 0.7);
}

#[tokio::test]
async fn unknown_author_drops_only_the_embedding_signal() {
    let config = both_signals();
    let scorer = scorer(hashing_engine(), ScriptedJudge::new(&[(TEXT, 0.4)]), &config);

    let result = scorer.compute_similarity(TEXT, "carol", &examples()).await;

    assert_eq!(result.embedding_score, None);
    assert_eq!(result.combined_score, 0.4);
}

#[tokio::test]
async fn no_signal_means_zero() {
    let mut config = both_signals();
    config.scoring.use_llm_similarity = false;
    let scorer = scorer(engine_with(FailingOn::new("BOOM")), ScriptedJudge::new(&[]), &config);

    let result = scorer.compute_similarity(BOOM, "ann", &examples()).await;

    assert!(result.is_empty());
    assert_eq!(result.combined_score, 0.0);
    assert_eq!(result.rationale, "");
}

#[tokio::test]
async fn disabled_judge_is_never_called() {
    let mut config = both_signals();
    config.scoring.use_llm_similarity = false;
    let judge = ScriptedJudge::new(&[(TEXT, 0.9)]);
    let scorer = scorer(hashing_engine(), judge.clone(), &config);

    let result = scorer.compute_similarity(TEXT, "ann", &examples()).await;

    assert_eq!(result.llm_score, None);
    assert_eq!(Some(result.combined_score), result.embedding_score);
    assert_eq!(judge.calls(), 0);
}

#[tokio::test]
async fn repeated_scoring_is_bit_identical() {
    let config = both_signals();
    let judge = ScriptedJudge::new(&[(TEXT, 0.6)]);
    let scorer = scorer(hashing_engine(), judge.clone(), &config);

    let first = scorer.compute_similarity(TEXT, "ann", &examples()).await;
    let second = scorer.compute_similarity(TEXT, "ann", &examples()).await;

    assert_eq!(first, second);
    assert_eq!(judge.calls(), 1);
}

#[tokio::test]
async fn scoring_failure_mid_loop_is_reported_not_raised() {
    let mut config = both_signals();
    config.scoring.use_llm_similarity = false;
    config.refinement.similarity_threshold = 0.99;
    let engine = engine_with(FailingOn::new("BOOM"));
    let refiner = scribetwin::refine::StyleRefiner::new(
        engine,
        judge_from(ScriptedJudge::new(&[]), &config),
        ScriptedRewriter::new(&[BOOM]),
        &config,
    );

    let outcome = refiner
        .refine(TEXT, &two_author_corpus(), &tokio_util::sync::CancellationToken::new())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.styled_blog, TEXT);
    assert_eq!(outcome.stop_reason, scribetwin::refine::StopReason::ScoringFailed);
    assert!(outcome.error.unwrap().starts_with("ScoringSignalFailure:"));
}
