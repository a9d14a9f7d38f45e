//! In-process publish/subscribe broker with MQTT topic semantics

use super::{ControlChannel, ControlMessage, Subscription};
use crate::error::{Result, StripError};
use crossbeam_channel::{unbounded, Sender};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

struct Subscriber {
    filter: String,
    sender: Sender<ControlMessage>,
    alive: Weak<()>,
}

impl Subscriber {
    fn is_alive(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

#[derive(Default)]
struct BrokerState {
    subscribers: Vec<Subscriber>,
    retained: BTreeMap<String, String>,
}

impl BrokerState {
    fn prune(&mut self) {
        self.subscribers.retain(Subscriber::is_alive);
    }
}

/// Routes published messages to every subscriber with a matching filter
///
/// Dropped subscriptions are pruned on every publish and subscribe.
#[derive(Default)]
pub struct LocalBroker {
    state: Mutex<BrokerState>,
}

impl LocalBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The retained payload of `topic`
    pub fn retained(&self, topic: &str) -> Option<String> {
        self.lock().retained.get(topic).cloned()
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.lock();
        state.prune();
        state.subscribers.len()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ControlChannel for LocalBroker {
    fn publish(&self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        if topic.is_empty() || topic.contains(['+', '#']) {
            return Err(StripError::Channel(format!(
                "Cannot publish to topic {:?}",
                topic
            )));
        }

        let mut state = self.lock();
        if retain {
            if payload.is_empty() {
                state.retained.remove(topic);
            } else {
                state
                    .retained
                    .insert(topic.to_string(), payload.to_string());
            }
        }

        state.prune();
        let message = ControlMessage::new(topic, payload);
        for subscriber in &state.subscribers {
            if topic_matches(&subscriber.filter, topic) {
                // a receiver dropped since pruning is gone with the next prune
                let _ = subscriber.sender.send(message.clone());
            }
        }
        tracing::trace!("Published {:?} on {}", payload, topic);
        Ok(())
    }

    fn subscribe(&self, filter: &str) -> Result<Subscription> {
        if !is_valid_filter(filter) {
            return Err(StripError::Channel(format!(
                "Invalid topic filter {:?}",
                filter
            )));
        }

        let (sender, receiver) = unbounded();
        let mut state = self.lock();
        state.prune();
        for (topic, payload) in &state.retained {
            if topic_matches(filter, topic) {
                let mut message = ControlMessage::new(topic.as_str(), payload.as_str());
                message.retained = true;
                // the receiver is still in scope, so this cannot fail
                let _ = sender.send(message);
            }
        }
        let (subscription, alive) = Subscription::new(receiver);
        state.subscribers.push(Subscriber {
            filter: filter.to_string(),
            sender,
            alive,
        });
        tracing::debug!("New subscription for {}", filter);
        Ok(subscription)
    }
}

/// `#` only as the whole last level, `+` only as a whole level
fn is_valid_filter(filter: &str) -> bool {
    if filter.is_empty() {
        return false;
    }
    let levels: Vec<&str> = filter.split('/').collect();
    levels.iter().enumerate().all(|(i, level)| match *level {
        "#" => i == levels.len() - 1,
        "+" => true,
        other => !other.contains(['+', '#']),
    })
}

/// MQTT topic filter matching
///
/// `+` matches exactly one level, a trailing `#` matches the parent level
/// and everything below it.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
