//! Shard pool: connection slots and lazy fault detection.
//!
//! The pool owns one slot per configured endpoint. A slot holds the live
//! connection for its shard plus an atomic liveness flag; the slot count
//! never changes after construction, only liveness does. Fault detection
//! is lazy (a shard is declared dead the first time a send to it fails,
//! never by background probing) and dead slots stay dead for the pool's
//! lifetime (no reconnection).

use crate::error::{Error, Result};
use crate::transport::{Connector, ShardConnection};
use crate::types::{Reply, ShardEndpoint};
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct Slot {
    endpoint: ShardEndpoint,
    live: AtomicBool,
    conn: Mutex<Option<Box<dyn ShardConnection>>>,
}

/// Fixed-size table of backend connections, addressed by shard index.
pub struct ShardPool {
    slots: Vec<Slot>,
}

impl ShardPool {
    /// Open one connection per endpoint.
    ///
    /// An individual connect failure is logged and leaves that slot
    /// absent from the start; construction only fails with
    /// [`Error::NoBackends`] when zero endpoints are reachable.
    pub async fn connect(connector: &dyn Connector, endpoints: &[ShardEndpoint]) -> Result<Self> {
        let mut slots = Vec::with_capacity(endpoints.len());
        let mut connected = 0usize;
        for endpoint in endpoints {
            let conn = match connector.connect(endpoint).await {
                Ok(c) => {
                    connected += 1;
                    Some(c)
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "shard connect failed, slot starts absent");
                    None
                }
            };
            slots.push(Slot {
                endpoint: endpoint.clone(),
                live: AtomicBool::new(conn.is_some()),
                conn: Mutex::new(conn),
            });
        }
        if connected == 0 {
            return Err(Error::NoBackends);
        }
        info!(shards = slots.len(), connected, "shard pool connected");
        Ok(Self { slots })
    }

    /// Number of configured slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the pool has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Endpoint configured for shard `idx`.
    pub fn endpoint(&self, idx: usize) -> &ShardEndpoint {
        &self.slots[idx].endpoint
    }

    /// Whether shard `idx` is currently live.
    pub fn is_live(&self, idx: usize) -> bool {
        self.slots[idx].live.load(Ordering::Acquire)
    }

    /// Number of currently live shards.
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.live.load(Ordering::Acquire))
            .count()
    }

    /// Mark shard `idx` failed. Idempotent; an already-dead slot is a
    /// no-op. The transition is immediately visible to ring lookups.
    pub fn mark_failed(&self, idx: usize) {
        if self.slots[idx].live.swap(false, Ordering::AcqRel) {
            warn!(shard = idx, endpoint = %self.slots[idx].endpoint, "shard marked failed");
        }
    }

    /// Send a fully formed command to shard `idx`.
    ///
    /// Returns `None` when the shard is absent: either already dead, or
    /// the transport failed on this very send, in which case the slot is
    /// marked failed first. This is the single point of lazy fault
    /// detection; transport failures never escape as errors.
    pub async fn send(&self, idx: usize, args: &[Bytes]) -> Option<Reply> {
        let slot = &self.slots[idx];
        if !slot.live.load(Ordering::Acquire) {
            return None;
        }
        let mut guard = slot.conn.lock().await;
        let conn = guard.as_mut()?;
        match conn.send(args).await {
            Some(reply) => Some(reply),
            None => {
                debug!(shard = idx, "transport failure on send");
                *guard = None;
                drop(guard);
                self.mark_failed(idx);
                None
            }
        }
    }

    /// Release every connection. The pool is consumed; no operation is
    /// valid afterwards.
    pub async fn shutdown(self) {
        for slot in &self.slots {
            slot.live.store(false, Ordering::Release);
            slot.conn.lock().await.take();
        }
    }
}
