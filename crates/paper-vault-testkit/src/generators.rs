//! Proptest generators for property-based testing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use paper_vault_core::{ActorId, DistributionWindow, DocumentKey, Iv, KeyMaterial};

/// An instant within a few years of 2026, at nanosecond precision.
pub fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (1_700_000_000i64..1_900_000_000, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
        Utc.timestamp_opt(secs, nanos)
            .single()
            .unwrap_or_default()
    })
}

/// A valid window: positive length up to a week.
pub fn window() -> impl Strategy<Value = DistributionWindow> {
    (instant(), 1i64..=7 * 24 * 3600 * 1_000_000_000).prop_filter_map("window", |(start, len)| {
        DistributionWindow::starting_at(start, Duration::nanoseconds(len)).ok()
    })
}

/// A window together with an instant somewhere around it, often exactly
/// on one of its bounds.
pub fn window_and_now() -> impl Strategy<Value = (DistributionWindow, DateTime<Utc>)> {
    window().prop_flat_map(|w| {
        let span = w.duration().num_nanoseconds().unwrap_or(0);
        let offset = prop_oneof![
            Just(0),
            Just(span),
            Just(-1),
            Just(span + 1),
            -span * 2..=span * 3,
        ];
        (Just(w), offset).prop_map(|(w, offset)| (w, w.start() + Duration::nanoseconds(offset)))
    })
}

/// Arbitrary key material.
pub fn key_material() -> impl Strategy<Value = KeyMaterial> {
    (any::<[u8; 32]>(), any::<[u8; 16]>())
        .prop_map(|(key, iv)| KeyMaterial::new(DocumentKey::from_bytes(key), Iv::from_bytes(iv)))
}

/// Plaintext bytes of up to `max_len` bytes.
pub fn plaintext(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Opaque actor identifiers as an identity provider would issue them.
pub fn actor_id() -> impl Strategy<Value = ActorId> {
    "[a-z]{3,8}-[0-9]{1,4}".prop_map(ActorId::new)
}
