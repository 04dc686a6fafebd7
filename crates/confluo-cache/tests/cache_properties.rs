// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for the message cache.

use chrono::{TimeZone, Utc};
use confluo_cache::MessageCache;
use confluo_core::{ChannelType, Message};
use proptest::prelude::*;

fn channel_strategy() -> impl Strategy<Value = ChannelType> {
    prop_oneof![
        Just(ChannelType::Discord),
        Just(ChannelType::Gmail),
        Just(ChannelType::Line),
    ]
}

fn build(index: usize, secs: i64, channel: ChannelType) -> Message {
    Message {
        id: format!("m{index}"),
        from: "from".into(),
        to: "to".into(),
        content: String::new(),
        timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
        is_unread: true,
        channel,
        raw: serde_json::Value::Null,
    }
}

fn entries() -> impl Strategy<Value = Vec<(i64, ChannelType)>> {
    prop::collection::vec((0i64..1_000, channel_strategy()), 0..60)
}

proptest! {
    #[test]
    fn get_all_is_the_most_recently_added_suffix(capacity in 1usize..20, entries in entries()) {
        let cache = MessageCache::with_capacity(capacity);
        let added: Vec<Message> = entries
            .iter()
            .enumerate()
            .map(|(i, (secs, channel))| build(i, *secs, *channel))
            .collect();
        for message in &added {
            cache.add(message.clone());
        }

        let stored = cache.get_all();
        prop_assert!(stored.len() <= capacity);
        let expected_start = added.len().saturating_sub(capacity);
        prop_assert_eq!(stored, added[expected_start..].to_vec());
    }

    #[test]
    fn get_since_returns_only_newer_sorted_descending(
        entries in entries(),
        since_secs in 0i64..1_000,
    ) {
        let cache = MessageCache::with_capacity(100);
        for (i, (secs, channel)) in entries.iter().enumerate() {
            cache.add(build(i, *secs, *channel));
        }
        let since = Utc.timestamp_opt(since_secs, 0).unwrap();

        let result = cache.get(Some(since), None);
        prop_assert!(result.iter().all(|m| m.timestamp >= since));
        prop_assert!(result.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

        let expected = entries.iter().filter(|(secs, _)| *secs >= since_secs).count();
        prop_assert_eq!(result.len(), expected);
    }

    #[test]
    fn get_channel_returns_only_that_channel(
        entries in entries(),
        wanted in channel_strategy(),
    ) {
        let cache = MessageCache::with_capacity(100);
        for (i, (secs, channel)) in entries.iter().enumerate() {
            cache.add(build(i, *secs, *channel));
        }

        let result = cache.get(None, Some(wanted));
        prop_assert!(result.iter().all(|m| m.channel == wanted));
        let expected = entries.iter().filter(|(_, c)| *c == wanted).count();
        prop_assert_eq!(result.len(), expected);
    }

    #[test]
    fn clear_always_empties(entries in entries()) {
        let cache = MessageCache::with_capacity(10);
        for (i, (secs, channel)) in entries.iter().enumerate() {
            cache.add(build(i, *secs, *channel));
        }
        cache.clear();
        prop_assert!(cache.get_all().is_empty());
        prop_assert!(cache.get(None, None).is_empty());
    }
}

#[test]
fn concurrent_adds_never_exceed_capacity() {
    let cache = std::sync::Arc::new(MessageCache::with_capacity(50));
    let handles: Vec<_> = ChannelType::ALL
        .into_iter()
        .map(|channel| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    cache.add(build(i, i as i64, channel));
                    assert!(cache.len() <= 50);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.len(), 50);
}
