//! Router lifecycle: initial build, fingerprint-gated swaps, background
//! refresh, and default-stream bookkeeping.

mod support;

use std::sync::Arc;
use std::time::Duration;

use streamroute_core::{MatchingType, Message, RuleType, Stream};
use streamroute_engine::{EngineConfig, FaultManager, StreamRouter};
use streamroute_telemetry::StreamMetrics;

use support::{init_tracing, rule, MemoryStreams, RecordingNotifier};

async fn router(
    config: EngineConfig,
    persistence: Arc<MemoryStreams>,
) -> (Arc<StreamRouter>, StreamMetrics) {
    init_tracing();
    let metrics = StreamMetrics::new();
    let faults = Arc::new(FaultManager::new(
        &config,
        persistence.clone(),
        Arc::new(RecordingNotifier::default()),
        metrics.clone(),
    ));
    let router = StreamRouter::new(config, persistence, faults, metrics.clone())
        .await
        .unwrap();
    (router, metrics)
}

fn auth_stream() -> Stream {
    Stream::new("s1", MatchingType::And).with_rule(rule("r1", "s1", RuleType::Exact, "app", "auth"))
}

#[tokio::test]
async fn test_initial_generation_routes() {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, _) = router(EngineConfig::default(), persistence).await;

    let matched = router.route(&Message::new().with_field("app", "auth")).await;
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, "s1");

    let matched = router.route(&Message::new().with_field("app", "web")).await;
    assert!(matched.is_empty());
}

#[tokio::test]
async fn test_refresh_skips_swap_on_identical_fingerprint() -> anyhow::Result<()> {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, _) = router(EngineConfig::default(), persistence).await;

    let fingerprint = router.current_fingerprint();
    for _ in 0..5 {
        router.refresh_engine().await?;
    }

    assert_eq!(router.rebuild_count(), 5);
    assert_eq!(router.swap_count(), 0);
    assert_eq!(router.current_fingerprint(), fingerprint);
    Ok(())
}

#[tokio::test]
async fn test_refresh_swaps_on_changed_streams() -> anyhow::Result<()> {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, _) = router(EngineConfig::default(), persistence.clone()).await;
    let before = router.current_fingerprint();

    let billing = Stream::new("s2", MatchingType::And)
        .with_rule(rule("r2", "s2", RuleType::Exact, "app", "billing"));
    persistence.set_streams(vec![auth_stream(), billing]);
    router.refresh_engine().await?;

    assert_eq!(router.swap_count(), 1);
    assert_ne!(router.current_fingerprint(), before);

    let matched = router
        .route(&Message::new().with_field("app", "billing"))
        .await;
    assert_eq!(matched[0].id, "s2");
    Ok(())
}

#[tokio::test]
async fn test_failed_rebuild_keeps_live_generation() -> anyhow::Result<()> {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, _) = router(EngineConfig::default(), persistence.clone()).await;

    persistence.set_fail_loads(true);
    assert!(router.refresh_engine().await.is_err());
    assert_eq!(router.swap_count(), 0);

    // Traffic keeps flowing against the old generation.
    let matched = router.route(&Message::new().with_field("app", "auth")).await;
    assert_eq!(matched.len(), 1);

    persistence.set_fail_loads(false);
    router.refresh_engine().await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_picks_up_changes() {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, _) = router(EngineConfig::default(), persistence.clone()).await;

    let handle = router.spawn_refresh_task();

    persistence.set_streams(vec![
        auth_stream(),
        Stream::new("s2", MatchingType::Or).with_rule(rule("r2", "s2", RuleType::Presence, "tag", "x")),
    ]);

    for _ in 0..100 {
        if router.swap_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(router.swap_count() > 0);

    let matched = router.route(&Message::new().with_field("tag", "set")).await;
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].id, "s2");

    handle.abort();
}

#[tokio::test]
async fn test_default_stream_bookkeeping() {
    let config = EngineConfig {
        default_stream_id: Some("default".to_string()),
        ..EngineConfig::default()
    };

    let mut removing = auth_stream();
    removing.remove_matches_from_default_stream = true;
    let persistence = MemoryStreams::new(vec![removing]);
    let (router, metrics) = router(config, persistence).await;

    // No stream matched: message stays on the default stream.
    router.route(&Message::new().with_field("app", "web")).await;
    assert_eq!(metrics.incoming_count("default"), 1);

    // Matched stream removes its matches from the default stream.
    router.route(&Message::new().with_field("app", "auth")).await;
    assert_eq!(metrics.incoming_count("default"), 1);
    assert_eq!(metrics.incoming_count("s1"), 1);
}

#[tokio::test]
async fn test_route_records_streams_evaluated() {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, metrics) = router(EngineConfig::default(), persistence).await;

    router.route(&Message::new().with_field("app", "auth")).await;
    router.route(&Message::new()).await;

    assert_eq!(metrics.streams_evaluated_total(), 2);
}

#[tokio::test]
async fn test_test_match_against_live_generation() {
    let persistence = MemoryStreams::new(vec![auth_stream()]);
    let (router, _) = router(EngineConfig::default(), persistence).await;

    let traces = router.test_match(&Message::new().with_field("app", "auth"));
    assert_eq!(traces.len(), 1);
    assert!(traces[0].is_matched());
}
