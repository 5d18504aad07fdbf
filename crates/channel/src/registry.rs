//! The session registry (C6): a concurrency-safe `channel-id -> Session` map
//! used by the dispatcher to route inbound updates.

use std::sync::Arc;

use credswap_core::ChannelId;
use dashmap::DashMap;

use crate::session::Session;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<ChannelId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn add(&self, session: Arc<Session>) {
        self.sessions.insert(session.id(), session);
    }

    pub fn for_id(&self, id: ChannelId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|e| e.clone())
    }

    pub fn remove(&self, id: ChannelId) {
        self.sessions.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::PairedMockChannel;
    use credswap_core::{Address, ChannelParams, U256};

    #[tokio::test]
    async fn add_and_lookup_round_trips() {
        let params = ChannelParams {
            participants: vec![Address::repeat_byte(1), Address::repeat_byte(2)],
            challenge_duration: 1,
        };
        let (a, _b) = PairedMockChannel::pair(params, vec![U256::from(100u32), U256::from(0u32)]);
        let session = Session::new(std::sync::Arc::new(a));
        let id = session.id();

        let registry = SessionRegistry::new();
        registry.add(session);

        assert!(registry.for_id(id).is_some());
        registry.remove(id);
        assert!(registry.for_id(id).is_none());
    }
}
