// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2025 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! Durable record of what should be subscribed, independent of the current connection.
//!
//! The registry keeps two containers behind one mutex:
//!
//! - `durable`: topics with their subscriber entries, in insertion order. Replayed in full after
//!   every reconnect.
//! - `pending`: entries requested while no connection was ready. Flushed into `durable` when the
//!   next connection activates.
//!
//! A subscribe frame is only ever pushed onto the generation's writer channel while the lock is
//! held, so no subscribe can interleave with a replay.

use std::{
    fmt::Debug,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use hyperstream_network::websocket::ConnectionHandle;
use indexmap::IndexMap;

use super::{
    error::{HyperliquidWsError, HyperliquidWsResult},
    messages::{HyperliquidWsMessage, HyperliquidWsRequest, SubscriptionRequest},
    topic::Topic,
};

/// Callback invoked for every message routed to a subscription's topic.
pub type SubscriptionCallback = Arc<dyn Fn(&HyperliquidWsMessage) + Send + Sync>;

/// A live subscriber: its id and callback.
#[derive(Clone)]
pub struct ActiveSubscription {
    pub id: u64,
    pub callback: SubscriptionCallback,
}

impl Debug for ActiveSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(ActiveSubscription))
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    subscription: SubscriptionRequest,
    active: ActiveSubscription,
}

#[derive(Debug, Default)]
struct RegistryState {
    durable: IndexMap<Topic, Vec<Entry>>,
    pending: Vec<(Topic, Entry)>,
    sink: Option<ConnectionHandle>,
    closed: bool,
}

impl RegistryState {
    fn ready_sink(&self) -> Option<ConnectionHandle> {
        self.sink.as_ref().filter(|sink| sink.is_open()).cloned()
    }

    fn topic_of(&self, id: u64) -> Option<&Topic> {
        self.durable
            .iter()
            .find(|(_, entries)| entries.iter().any(|e| e.active.id == id))
            .map(|(topic, _)| topic)
            .or_else(|| {
                self.pending
                    .iter()
                    .find(|(_, e)| e.active.id == id)
                    .map(|(topic, _)| topic)
            })
    }

    fn replace_callback(&mut self, topic: &Topic, id: u64, callback: &SubscriptionCallback) {
        let durable = self.durable.get_mut(topic).into_iter().flatten();
        let pending = self
            .pending
            .iter_mut()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e);

        for entry in durable.chain(pending).filter(|e| e.active.id == id) {
            entry.active.callback = callback.clone();
        }
    }

    fn replay_all<F>(&self, send: &mut F) -> usize
    where
        F: FnMut(&SubscriptionRequest) -> HyperliquidWsResult<()>,
    {
        let mut sent = 0;
        for (topic, entries) in &self.durable {
            for entry in entries {
                match send(&entry.subscription) {
                    Ok(()) => sent += 1,
                    Err(e) => tracing::warn!(
                        "Failed to resubscribe {topic} (id {}): {e}",
                        entry.active.id
                    ),
                }
            }
        }
        sent
    }

    fn flush_pending<F>(&mut self, send: &mut F) -> usize
    where
        F: FnMut(&SubscriptionRequest) -> HyperliquidWsResult<()>,
    {
        let mut flushed = 0;
        let mut retained = Vec::new();

        for (topic, entry) in std::mem::take(&mut self.pending) {
            match send(&entry.subscription) {
                Ok(()) => {
                    self.durable.entry(topic).or_default().push(entry);
                    flushed += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Failed to flush pending {topic} (id {}): {e}",
                        entry.active.id
                    );
                    retained.push((topic, entry));
                }
            }
        }

        self.pending = retained;
        flushed
    }
}

fn send_request(sink: &ConnectionHandle, request: &HyperliquidWsRequest) -> HyperliquidWsResult<()> {
    let json = request.to_json()?;
    sink.send_text(json)?;
    Ok(())
}

fn send_subscribe(sink: &ConnectionHandle, subscription: &SubscriptionRequest) -> HyperliquidWsResult<()> {
    send_request(
        sink,
        &HyperliquidWsRequest::Subscribe {
            subscription: subscription.clone(),
        },
    )
}

/// Thread-safe subscription registry shared by the client, router and orchestrator.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
    last_id: AtomicU64,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `callback` for `subscription` and returns the subscription id.
    ///
    /// When a connection is ready the subscribe frame is queued immediately, otherwise the entry
    /// waits in `pending` for the next activation. Never blocks on connectivity.
    ///
    /// # Errors
    ///
    /// Returns [`HyperliquidWsError::NotConnected`] after [`SubscriptionRegistry::close`], or
    /// [`HyperliquidWsError::DuplicateSubscriptionId`] if `id` is live on another topic, or
    /// [`HyperliquidWsError::SubscriptionIdsExhausted`] if no id above the highest one remains.
    pub fn subscribe(
        &self,
        subscription: SubscriptionRequest,
        callback: SubscriptionCallback,
        id: Option<u64>,
    ) -> HyperliquidWsResult<u64> {
        let topic = Topic::from(&subscription);
        let mut state = self.lock();

        if state.closed {
            return Err(HyperliquidWsError::NotConnected);
        }

        let id = match id {
            Some(id) => {
                if let Some(live_topic) = state.topic_of(id) {
                    if *live_topic != topic {
                        return Err(HyperliquidWsError::DuplicateSubscriptionId(id));
                    }
                    state.replace_callback(&topic, id, &callback);
                    tracing::debug!("Replaced callback for {topic} (id {id})");
                    return Ok(id);
                }
                self.last_id.fetch_max(id, Ordering::SeqCst);
                id
            }
            None => self
                .last_id
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
                .map_err(|_| HyperliquidWsError::SubscriptionIdsExhausted)?
                .saturating_add(1),
        };

        let entry = Entry {
            subscription,
            active: ActiveSubscription { id, callback },
        };

        match state.ready_sink() {
            Some(sink) => match send_subscribe(&sink, &entry.subscription) {
                Ok(()) => {
                    tracing::debug!("Subscribed to {topic} (id {id})");
                    state.durable.entry(topic).or_default().push(entry);
                }
                Err(e) => {
                    tracing::warn!("Subscribe send failed for {topic} (id {id}), queued: {e}");
                    state.pending.push((topic, entry));
                }
            },
            None => {
                tracing::debug!("Not ready, queued {topic} (id {id})");
                state.pending.push((topic, entry));
            }
        }

        Ok(id)
    }

    /// Removes subscription `id` from `subscription`'s topic.
    ///
    /// Returns true if anything was removed. An unsubscribe frame is sent only when the last
    /// durable entry for the topic goes and a connection is ready; send failures are ignored.
    pub fn unsubscribe(&self, subscription: &SubscriptionRequest, id: u64) -> bool {
        let topic = Topic::from(subscription);
        let mut state = self.lock();

        let mut removed = None;
        if let Some(entries) = state.durable.get_mut(&topic)
            && let Some(index) = entries.iter().position(|e| e.active.id == id)
        {
            let entry = entries.remove(index);
            removed = Some((entry, entries.is_empty()));
        }
        let removed_durable = removed.is_some();

        let pending_before = state.pending.len();
        state
            .pending
            .retain(|(t, e)| !(t == &topic && e.active.id == id));
        let removed_pending = state.pending.len() != pending_before;

        match removed {
            Some((entry, true)) => {
                state.durable.shift_remove(&topic);
                if let Some(sink) = state.ready_sink() {
                    let request = HyperliquidWsRequest::Unsubscribe {
                        subscription: entry.subscription,
                    };
                    if let Err(e) = send_request(&sink, &request) {
                        tracing::debug!("Unsubscribe send for {topic} failed, ignoring: {e}");
                    }
                }
                tracing::debug!("Unsubscribed {topic} (id {id})");
            }
            Some((_, false)) => {
                tracing::debug!("Unsubscribed {topic} (id {id}), topic still has subscribers");
            }
            None => {}
        }

        removed_durable || removed_pending
    }

    /// Sends a subscribe frame for every durable entry, returning how many were sent.
    pub fn replay_all<F>(&self, mut send: F) -> usize
    where
        F: FnMut(&SubscriptionRequest) -> HyperliquidWsResult<()>,
    {
        self.lock().replay_all(&mut send)
    }

    /// Moves pending entries into `durable` in arrival order, sending each.
    ///
    /// Entries whose send fails stay pending.
    pub fn flush_pending<F>(&self, mut send: F) -> usize
    where
        F: FnMut(&SubscriptionRequest) -> HyperliquidWsResult<()>,
    {
        self.lock().flush_pending(&mut send)
    }

    /// Replays the durable set, flushes pending, then routes later subscribes to `sink`.
    ///
    /// Runs as one critical section. Returns the `(replayed, flushed)` counts.
    pub fn activate(&self, sink: ConnectionHandle) -> (usize, usize) {
        let mut state = self.lock();
        let mut send = |subscription: &SubscriptionRequest| send_subscribe(&sink, subscription);

        let replayed = state.replay_all(&mut send);
        let flushed = state.flush_pending(&mut send);
        state.sink = Some(sink);

        tracing::info!(
            "Subscriptions active: replayed {replayed}, flushed {flushed}, pending {}",
            state.pending.len()
        );
        (replayed, flushed)
    }

    /// Detaches the connection; later subscribes queue into pending.
    pub fn deactivate(&self) {
        self.lock().sink = None;
    }

    /// Drops every subscription and refuses new ones until [`SubscriptionRegistry::reopen`].
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.sink = None;
        state.durable.clear();
        state.pending.clear();
    }

    pub fn reopen(&self) {
        self.lock().closed = false;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns true if subscribes are currently sent straight to a connection.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.lock().ready_sink().is_some()
    }

    /// Returns the callbacks registered for `topic`, in registration order.
    ///
    /// The list is a snapshot so callbacks can run without holding the lock.
    #[must_use]
    pub fn callbacks_for(&self, topic: &Topic) -> Vec<SubscriptionCallback> {
        self.lock().durable.get(topic).map_or_else(Vec::new, |entries| {
            entries.iter().map(|e| e.active.callback.clone()).collect()
        })
    }

    /// Returns the durable topics in insertion order.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.lock().durable.keys().cloned().collect()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.lock().durable.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}
