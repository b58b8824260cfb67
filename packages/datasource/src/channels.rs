//! Streaming channel registry.
//!
//! Each streamable frame gets a fresh channel: a UUID registered against the
//! stream's WebID and polling interval, addressed as
//! `ds/<datasource-uid>/<channel-id>`. The push-delivery side looks channels
//! up by ID to know what to re-poll. Channels are never deduplicated or
//! updated; they live until the datasource is disposed.

use std::collections::HashMap;
use std::sync::Mutex;

use uuid::Uuid;

/// What a channel re-polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamChannel {
    pub web_id: String,
    pub interval_nanos: u64,
}

/// A freshly minted channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelAddress {
    pub channel_id: String,
    /// `ds/<datasource-uid>/<channel-id>`
    pub path: String,
}

pub fn channel_path(datasource_uid: &str, channel_id: &str) -> String {
    format!("ds/{datasource_uid}/{channel_id}")
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, StreamChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StreamChannel>> {
        self.channels.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Register a new channel for `web_id` and return its address.
    pub fn mint(&self, datasource_uid: &str, web_id: &str, interval_nanos: u64) -> ChannelAddress {
        let channel_id = Uuid::now_v7().to_string();
        self.lock().insert(
            channel_id.clone(),
            StreamChannel {
                web_id: web_id.to_string(),
                interval_nanos,
            },
        );
        ChannelAddress {
            path: channel_path(datasource_uid, &channel_id),
            channel_id,
        }
    }

    pub fn get(&self, channel_id: &str) -> Option<StreamChannel> {
        self.lock().get(channel_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every channel. Called when the datasource is disposed.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn mint_registers_web_id_and_interval() {
        let registry = ChannelRegistry::new();
        let addr = registry.mint("uid-1", "F1DP", 30_000_000_000);

        assert_eq!(addr.path, format!("ds/uid-1/{}", addr.channel_id));
        assert_eq!(
            registry.get(&addr.channel_id),
            Some(StreamChannel {
                web_id: "F1DP".into(),
                interval_nanos: 30_000_000_000,
            })
        );
    }

    #[test]
    fn every_mint_is_a_new_channel() {
        let registry = ChannelRegistry::new();
        let a = registry.mint("uid", "F1DP", 1);
        let b = registry.mint("uid", "F1DP", 1);
        assert_ne!(a.channel_id, b.channel_id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_mints_are_all_recorded() {
        let registry = Arc::new(ChannelRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.mint("uid", &format!("W{t}-{i}"), 1);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }

    #[test]
    fn clear_drops_everything() {
        let registry = ChannelRegistry::new();
        let addr = registry.mint("uid", "F1DP", 1);
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get(&addr.channel_id).is_none());
    }
}
