// tests/digest_service.rs
//
// Orchestrator behavior end to end, against the scripted provider.
//
// Covered:
// - cache HIT within TTL (same Arc, zero provider calls)
// - forced refresh always re-fetches; TTL expiry re-fetches
// - per-author failure isolation and per-channel ordering
// - ranking scenario [10, 50, 5] + [30] -> [50, 30, 10, 5]
// - empty roster -> empty entry, no error
// - provider calls spaced by the cool-down, also after a panicking call
// - single-flight under concurrent misses
// - each channel's window ends when that channel is collected

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use cast_digest::analyze::window::parse_timestamp;
use cast_digest::digest::cache::DigestCache;
use cast_digest::digest::clock::{Clock, ManualClock};
use cast_digest::digest::{ChannelConfig, DigestOptions, DigestService, Served};
use cast_digest::ingest::gate::{FixedIntervalGate, RateGate, Unthrottled};
use cast_digest::ingest::providers::mock::MockProvider;
use cast_digest::ingest::types::{AuthorRef, CastProvider, ProviderError, RawCast};
use cast_digest::ingest::{AuthorFailureKind, SourceFetcher};
use chrono::{DateTime, Duration, Utc};

fn t0() -> DateTime<Utc> {
    parse_timestamp("2025-06-10T12:00:00Z").unwrap()
}

fn cast(hash: &str, fid: u64, score_as_likes: u64) -> RawCast {
    RawCast::new(hash, fid, format!("text of {hash}"))
        .with_timestamp("2025-06-10T09:30:00Z")
        .with_counts(score_as_likes, 0, 0)
}

struct Harness {
    service: DigestService,
    provider: Arc<MockProvider>,
    clock: Arc<ManualClock>,
}

fn harness_with_gate(provider: MockProvider, gate: Arc<dyn RateGate>) -> Harness {
    let provider = Arc::new(provider);
    let clock = Arc::new(ManualClock::new(t0()));
    let service = DigestService::new(
        SourceFetcher::new(provider.clone(), gate),
        DigestCache::new(Duration::minutes(30), clock.clone()),
        clock.clone(),
    );
    Harness {
        service,
        provider,
        clock,
    }
}

fn harness(provider: MockProvider) -> Harness {
    harness_with_gate(provider, Arc::new(Unthrottled))
}

fn scores(entry: &cast_digest::digest::ChannelEntry) -> Vec<u64> {
    entry.casts.iter().map(|c| c.score).collect()
}

#[tokio::test]
async fn second_call_within_ttl_is_served_from_cache() {
    let h = harness(MockProvider::new().with_casts(1, vec![cast("a", 1, 3)]));
    let channels = vec![ChannelConfig::new("c", vec![AuthorRef::Fid(1)])];

    let first = h
        .service
        .produce_digest_with_status(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert_eq!(first.served, Served::Refreshed);
    let calls_after_first = h.provider.total_calls();

    h.clock.advance(Duration::minutes(10));
    let second = h
        .service
        .produce_digest_with_status(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert_eq!(second.served, Served::Hit);
    assert!(Arc::ptr_eq(&first.digest, &second.digest));
    assert_eq!(h.provider.total_calls(), calls_after_first, "no provider calls on a hit");
    assert_eq!(h.service.last_capture(), Some(t0()));
}

#[tokio::test]
async fn forced_refresh_refetches_even_when_fresh() {
    let h = harness(MockProvider::new().with_casts(1, vec![cast("a", 1, 3)]));
    let channels = vec![ChannelConfig::new("c", vec![AuthorRef::Fid(1)])];

    let first = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    let second = h
        .service
        .produce_digest_with_status(&channels, DigestOptions::forced())
        .await
        .unwrap();

    assert_eq!(second.served, Served::Refreshed);
    assert_eq!(h.provider.fetch_calls(), 2);
    assert!(!Arc::ptr_eq(&first, &second.digest));

    // The forced result is what the cache now serves.
    let third = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&second.digest, &third));
}

#[tokio::test]
async fn expired_cache_triggers_a_new_pass() {
    let h = harness(MockProvider::new());
    let channels = vec![ChannelConfig::new("c", vec![AuthorRef::Fid(1)])];

    h.service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    h.clock.advance(Duration::minutes(30));
    let out = h
        .service
        .produce_digest_with_status(&channels, DigestOptions::default())
        .await
        .unwrap();

    assert_eq!(out.served, Served::Refreshed);
    assert_eq!(h.provider.fetch_calls(), 2);
    assert_eq!(out.digest.generated_at, t0() + Duration::minutes(30));
}

#[tokio::test]
async fn ranking_scenario_across_two_authors() {
    let h = harness(
        MockProvider::new()
            .with_casts(1, vec![cast("a10", 1, 10), cast("a50", 1, 50), cast("a5", 1, 5)])
            .with_casts(2, vec![cast("b30", 2, 30)]),
    );
    let channels = vec![ChannelConfig::new(
        "dev",
        vec![AuthorRef::Fid(1), AuthorRef::Fid(2)],
    )];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert_eq!(scores(&digest.channels[0]), vec![50, 30, 10, 5]);
}

#[tokio::test]
async fn failing_author_does_not_hide_the_other() {
    let h = harness(
        MockProvider::new()
            .with_failure(1, "HTTP 429")
            .with_user("bob", 2)
            .with_casts(2, vec![cast("b1", 2, 4)]),
    );
    let channels = vec![ChannelConfig::new(
        "mixed",
        vec![AuthorRef::Fid(1), AuthorRef::Username("bob".into())],
    )];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    let entry = &digest.channels[0];
    assert!(entry.error.is_none());
    assert_eq!(entry.casts.len(), 1);
    assert_eq!(entry.casts[0].hash, "b1");
    assert_eq!(entry.author_failures.len(), 1);
    assert_eq!(entry.author_failures[0].kind, AuthorFailureKind::Fetch);
    assert_eq!(entry.author_failures[0].author, "fid:1");
}

#[tokio::test]
async fn unresolvable_name_is_skipped() {
    let h = harness(MockProvider::new().with_casts(7, vec![cast("x", 7, 1)]));
    let channels = vec![ChannelConfig::new(
        "c",
        vec![AuthorRef::Username("nobody".into()), AuthorRef::Fid(7)],
    )];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    let entry = &digest.channels[0];
    assert_eq!(entry.casts.len(), 1);
    assert_eq!(entry.author_failures[0].kind, AuthorFailureKind::Resolution);
}

#[tokio::test]
async fn empty_roster_yields_empty_entry_without_error() {
    let h = harness(MockProvider::new());
    let channels = vec![ChannelConfig::new("quiet", vec![])];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert_eq!(digest.channels.len(), 1);
    assert!(digest.channels[0].casts.is_empty());
    assert!(digest.channels[0].error.is_none());
    assert_eq!(h.provider.total_calls(), 0);
}

#[tokio::test]
async fn entries_follow_config_order_and_panics_stay_contained() {
    let h = harness(
        MockProvider::new()
            .with_casts(1, vec![cast("one", 1, 1)])
            .with_panic(2)
            .with_casts(3, vec![cast("three", 3, 3)]),
    );
    let channels = vec![
        ChannelConfig::new("z-first", vec![AuthorRef::Fid(1)]),
        ChannelConfig::new("a-broken", vec![AuthorRef::Fid(2)]),
        ChannelConfig::new("m-last", vec![AuthorRef::Fid(3)]),
    ];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    let ids: Vec<&str> = digest.channels.iter().map(|c| c.channel_id.as_str()).collect();
    assert_eq!(ids, vec!["z-first", "a-broken", "m-last"]);
    assert!(digest.channels[1].error.is_some());
    assert!(digest.channels[1].casts.is_empty());
    assert_eq!(digest.channels[2].casts[0].hash, "three");
}

#[tokio::test]
async fn every_entry_is_capped_and_sorted() {
    let many = (0..12u64).map(|i| cast(&format!("c{i}"), 1, (i * 7) % 11)).collect();
    let h = harness(MockProvider::new().with_casts(1, many));
    let channels = vec![ChannelConfig::new("c", vec![AuthorRef::Fid(1)])];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    let s = scores(&digest.channels[0]);
    assert_eq!(s.len(), 5);
    assert!(s.windows(2).all(|w| w[0] >= w[1]), "{s:?}");
}

#[tokio::test(start_paused = true)]
async fn provider_calls_never_run_back_to_back() {
    let cooldown = StdDuration::from_millis(2000);
    let h = harness_with_gate(
        MockProvider::new()
            .with_user("alice", 1)
            .with_user("bob", 2)
            .with_casts(1, vec![cast("a", 1, 1)])
            .with_casts(2, vec![cast("b", 2, 1)]),
        Arc::new(FixedIntervalGate::new(cooldown)),
    );
    let channels = vec![
        ChannelConfig::new("one", vec!["alice".into(), AuthorRef::Fid(2)]),
        ChannelConfig::new("two", vec!["bob".into()]),
    ];

    h.service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();

    let calls = h.provider.calls();
    // alice: resolve + fetch, fid 2: fetch, bob: resolve + fetch
    assert_eq!(calls.len(), 5);
    for pair in calls.windows(2) {
        assert!(
            pair[1].at - pair[0].at >= cooldown,
            "calls {:?} and {:?} too close",
            pair[0].target,
            pair[1].target
        );
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_share_one_pass() {
    let h = harness_with_gate(
        MockProvider::new()
            .with_casts(1, vec![cast("a", 1, 1)])
            .with_casts(2, vec![cast("b", 2, 1)]),
        Arc::new(FixedIntervalGate::new(StdDuration::from_millis(2000))),
    );
    let channels = vec![ChannelConfig::new(
        "c",
        vec![AuthorRef::Fid(1), AuthorRef::Fid(2)],
    )];

    let (a, b) = tokio::join!(
        h.service
            .produce_digest_with_status(&channels, DigestOptions::default()),
        h.service
            .produce_digest_with_status(&channels, DigestOptions::default()),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let mut served = vec![a.served, b.served];
    served.sort_by_key(|s| s.as_header());
    assert_eq!(served, vec![Served::Coalesced, Served::Refreshed]);
    assert!(Arc::ptr_eq(&a.digest, &b.digest));
    assert_eq!(h.provider.fetch_calls(), 2, "one pass over two authors");
}

#[tokio::test(start_paused = true)]
async fn panicking_call_still_observes_the_cooldown() {
    let cooldown = StdDuration::from_millis(2000);
    let h = harness_with_gate(
        MockProvider::new()
            .with_casts(1, vec![cast("one", 1, 1)])
            .with_panic(2)
            .with_casts(3, vec![cast("three", 3, 3)]),
        Arc::new(FixedIntervalGate::new(cooldown)),
    );
    let channels = vec![
        ChannelConfig::new("first", vec![AuthorRef::Fid(1)]),
        ChannelConfig::new("broken", vec![AuthorRef::Fid(2)]),
        ChannelConfig::new("last", vec![AuthorRef::Fid(3)]),
    ];

    let digest = h
        .service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert!(digest.channels[1].error.is_some());

    let calls = h.provider.calls();
    assert_eq!(calls.len(), 3);
    for pair in calls.windows(2) {
        assert!(
            pair[1].at - pair[0].at >= cooldown,
            "calls {} and {} too close",
            pair[0].target,
            pair[1].target
        );
    }
}

/// Every fetch moves the clock forward ten minutes.
struct SlowFeed {
    clock: Arc<ManualClock>,
    casts: Vec<(u64, RawCast)>,
}

#[async_trait]
impl CastProvider for SlowFeed {
    async fn resolve_author(&self, username: &str) -> Result<u64, ProviderError> {
        Err(ProviderError::NotFound(username.to_string()))
    }

    async fn fetch_recent_casts(&self, fid: u64, _limit: usize) -> Result<Vec<RawCast>, ProviderError> {
        self.clock.advance(Duration::minutes(10));
        Ok(self
            .casts
            .iter()
            .filter(|(f, _)| *f == fid)
            .map(|(_, c)| c.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "slow-feed"
    }
}

#[tokio::test]
async fn later_channels_keep_casts_posted_during_the_pass() {
    let clock = Arc::new(ManualClock::new(t0()));
    let posted_mid_pass = (t0() + Duration::minutes(5)).to_rfc3339();
    let feed = SlowFeed {
        clock: clock.clone(),
        casts: vec![
            (1, cast("early", 1, 1)),
            (
                2,
                RawCast::new("fresh", 2, "just posted")
                    .with_timestamp(posted_mid_pass)
                    .with_counts(9, 0, 0),
            ),
        ],
    };
    let service = DigestService::new(
        SourceFetcher::new(Arc::new(feed), Arc::new(Unthrottled)),
        DigestCache::new(Duration::minutes(30), clock.clone()),
        clock.clone(),
    );
    let channels = vec![
        ChannelConfig::new("a", vec![AuthorRef::Fid(1)]),
        ChannelConfig::new("b", vec![AuthorRef::Fid(2)]),
    ];

    let digest = service
        .produce_digest(&channels, DigestOptions::default())
        .await
        .unwrap();
    assert_eq!(digest.generated_at, t0());
    assert_eq!(digest.channels[0].casts[0].hash, "early");
    assert_eq!(digest.channels[1].casts.len(), 1);
    assert_eq!(digest.channels[1].casts[0].hash, "fresh");
    assert!(clock.now() > t0());
}
