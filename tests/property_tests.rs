//! Property-based tests for rust_log_pipeline using proptest

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rust_log_pipeline::prelude::*;
use std::time::Duration;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop_oneof![
        Just(LogLevel::Trace),
        Just(LogLevel::Debug),
        Just(LogLevel::Info),
        Just(LogLevel::Warn),
        Just(LogLevel::Error),
        Just(LogLevel::Fatal),
    ]
}

// ============================================================================
// LogLevel / LevelSpan Tests
// ============================================================================

proptest! {
    /// Parsing the displayed level yields the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        let parsed: LogLevel = level.to_str().parse().unwrap();
        prop_assert_eq!(level, parsed);
    }

    /// A span contains exactly the levels between its bounds
    #[test]
    fn test_level_span_contains(start in any_level(), end in any_level(), level in any_level()) {
        let span = LevelSpan::new(start, end);
        prop_assert_eq!(span.contains(level), start <= level && level <= end);
    }

    /// The minimum level gate agrees with level ordering
    #[test]
    fn test_min_level_gate(min in any_level(), level in any_level()) {
        prop_assert_eq!(min.enables(level), level >= min);
    }
}

// ============================================================================
// Sampler Tests
// ============================================================================

proptest! {
    /// Within one window the number of kept entries follows the burst and
    /// thereafter arithmetic exactly
    #[test]
    fn test_sampler_keeps_expected_count(
        first in 0u64..50,
        thereafter in 0u64..20,
        calls in 1u64..400,
    ) {
        let sampler = RateLimitingSampler::new(
            SamplingConfig::default()
                .with_span(LevelSpan::all())
                .with_tick(Duration::from_secs(60))
                .with_first(first)
                .with_thereafter(thereafter),
        )
        .unwrap();

        let entry = LogEntry::new(LogLevel::Info, "repeated")
            .with_timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap());

        let kept = (0..calls).filter(|_| sampler.sample(&entry)).count() as u64;

        // The first call opens the window and is not counted
        let counted = calls - 1;
        let burst = counted.min(first);
        let after = match thereafter {
            0 => 0,
            n => counted.saturating_sub(first) / n,
        };
        prop_assert_eq!(kept, 1 + burst + after);
        prop_assert_eq!(sampler.metrics().total_count(), calls);
    }

    /// Levels outside the sampled span are never dropped
    #[test]
    fn test_sampler_ignores_levels_outside_span(calls in 1usize..300) {
        let sampler = RateLimitingSampler::new(
            SamplingConfig::default()
                .with_span(LevelSpan::new(LogLevel::Trace, LogLevel::Debug))
                .with_first(0)
                .with_thereafter(0),
        )
        .unwrap();

        let entry = LogEntry::new(LogLevel::Error, "always kept");
        prop_assert!((0..calls).all(|_| sampler.sample(&entry)));
    }

    /// Invalid configurations are rejected instead of panicking later
    #[test]
    fn test_sampler_rejects_empty_span(start in any_level(), end in any_level()) {
        let result = RateLimitingSampler::new(
            SamplingConfig::default().with_span(LevelSpan::new(start, end)),
        );
        prop_assert_eq!(result.is_ok(), start <= end);
    }
}

// ============================================================================
// Sink / Encoder Tests
// ============================================================================

proptest! {
    /// Configured capacities below the minimum are raised to it
    #[test]
    fn test_sink_capacity_clamp(capacity in 0usize..100_000) {
        let config = SinkConfig::default().with_capacity(capacity);
        prop_assert_eq!(config.effective_capacity(), capacity.max(1024));
    }

    /// Every buffered byte reaches the destination after sync
    #[test]
    fn test_buffered_sink_preserves_bytes(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..300), 0..40),
        capacity in 0usize..4096,
    ) {
        let sink = BufferedSink::new(Vec::<u8>::new(), SinkConfig::default().with_capacity(capacity));
        for chunk in &chunks {
            prop_assert_eq!(sink.write(chunk).unwrap(), chunk.len());
        }
        sink.sync().unwrap();

        let expected: Vec<u8> = chunks.concat();
        let written = sink.replace_destination(Vec::new()).unwrap();
        prop_assert_eq!(written, expected);
    }

    /// The text encoder emits exactly one line per entry
    #[test]
    fn test_text_encoder_single_line(message in ".*", level in any_level()) {
        let encoder = TextEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&mut buf, &LogEntry::new(level, message.as_str())).unwrap();

        let text = String::from_utf8(buf).unwrap();
        prop_assert!(text.ends_with('\n'));
        prop_assert_eq!(text.matches('\n').count(), 1);
        prop_assert!(!text.contains('\r'));
    }

    /// The JSON encoder output parses back with the original message
    #[test]
    fn test_json_encoder_valid(message in ".*") {
        let encoder = JsonEncoder::new();
        let mut buf = Vec::new();
        encoder.encode(&mut buf, &LogEntry::new(LogLevel::Warn, message.as_str())).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        prop_assert_eq!(value["message"].as_str(), Some(message.as_str()));
        prop_assert_eq!(value["level"].as_str(), Some("WARN"));
    }
}
