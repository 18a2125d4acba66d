//! Regex deadline handling and stream auto-pause end to end.

mod support;

use std::sync::Arc;

use streamroute_core::{MatchingType, Message, RuleType, Stream};
use streamroute_engine::{EngineConfig, FaultManager, StreamRouter};
use streamroute_telemetry::StreamMetrics;

use support::{init_tracing, rule, MemoryStreams, RecordingNotifier};

fn regex_stream() -> Stream {
    Stream::new("s1", MatchingType::And)
        .with_title("Slow regex stream")
        .with_rule(rule("r1", "s1", RuleType::Regex, "msg", "never-present"))
}

/// A field value large enough that the regex scan cannot win the race
/// against a zero-length deadline.
fn heavy_message() -> Message {
    Message::new().with_field("msg", "ab".repeat(200_000))
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_rule_is_non_match_and_pauses_after_threshold() {
    init_tracing();

    let config = EngineConfig {
        stream_processing_timeout_ms: 0,
        stream_processing_max_faults: 2,
        ..EngineConfig::default()
    };
    let persistence = MemoryStreams::new(vec![regex_stream()]);
    let notifier = Arc::new(RecordingNotifier::default());
    let metrics = StreamMetrics::new();
    let faults = Arc::new(FaultManager::new(
        &config,
        persistence.clone(),
        notifier.clone(),
        metrics.clone(),
    ));
    let router = StreamRouter::new(config, persistence.clone(), faults.clone(), metrics.clone())
        .await
        .unwrap();

    // First timeout: fault recorded, no pause yet, rule is a non-match.
    let matched = router.route(&heavy_message()).await;
    assert!(matched.is_empty());
    assert_eq!(metrics.rule_timeout_count("s1"), 1);
    assert!(persistence.paused().is_empty());
    assert_eq!(faults.fault_count("s1"), 1);

    // Second consecutive timeout crosses the threshold.
    let matched = router.route(&heavy_message()).await;
    assert!(matched.is_empty());
    assert_eq!(persistence.paused(), ["s1"]);
    assert_eq!(faults.fault_count("s1"), 0);
    assert_eq!(metrics.faults_exceeded_count(), 1);

    let published = notifier.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].stream_id, "s1");
    assert_eq!(published[0].stream_title, "Slow regex stream");
    assert_eq!(published[0].fault_count, 2);

    // The paused stream disappears from the next rebuilt generation.
    router.refresh_engine().await.unwrap();
    assert_eq!(router.swap_count(), 1);
    let matched = router
        .route(&Message::new().with_field("msg", "anything"))
        .await;
    assert!(matched.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sibling_streams_unaffected_by_timeouts() {
    init_tracing();

    let config = EngineConfig {
        stream_processing_timeout_ms: 0,
        stream_processing_max_faults: 0,
        ..EngineConfig::default()
    };
    let healthy = Stream::new("s2", MatchingType::And)
        .with_rule(rule("r2", "s2", RuleType::Presence, "msg", "ignored"));
    let persistence = MemoryStreams::new(vec![regex_stream(), healthy]);
    let metrics = StreamMetrics::new();
    let faults = Arc::new(FaultManager::new(
        &config,
        persistence.clone(),
        Arc::new(RecordingNotifier::default()),
        metrics.clone(),
    ));
    let router = StreamRouter::new(config, persistence.clone(), faults, metrics.clone())
        .await
        .unwrap();

    // The timing-out regex stream degrades alone; the presence stream
    // still routes, and auto-pause stays disabled.
    let matched = router.route(&heavy_message()).await;
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, "s2");
    assert!(persistence.paused().is_empty());
    assert!(metrics.rule_timeout_count("s1") >= 1);
}
