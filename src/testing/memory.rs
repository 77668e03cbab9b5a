//! In-memory backend store implementing the transport contract.

use crate::error::{Error, Result};
use crate::transport::{Connector, ShardConnection};
use crate::types::{Reply, ShardEndpoint};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// One in-process backend: a flat key space plus failure injection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    killed: AtomicBool,
    error_next: Mutex<Option<String>>,
    requests: AtomicU64,
}

impl MemoryStore {
    /// Insert a key directly, bypassing the proxy.
    pub fn seed(&self, key: &[u8], value: &[u8]) {
        self.data.lock().insert(key.to_vec(), value.to_vec());
    }

    /// Read a key directly, bypassing the proxy.
    pub fn peek(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Number of keys currently stored.
    pub fn key_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Requests served (or refused) so far.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Simulate the connection dying: every send from now on reports a
    /// transport failure.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    /// Answer the next request with an error reply, then resume normal
    /// service.
    pub fn fail_next_with_error(&self, msg: impl Into<String>) {
        *self.error_next.lock() = Some(msg.into());
    }

    fn request(&self, args: &[Bytes]) -> Option<Reply> {
        if self.killed.load(Ordering::Acquire) {
            return None;
        }
        self.requests.fetch_add(1, Ordering::Relaxed);
        if let Some(msg) = self.error_next.lock().take() {
            return Some(Reply::Error(msg));
        }
        let Some(name) = args.first() else {
            return Some(Reply::error("ERR empty command"));
        };
        Some(self.dispatch(&name.to_ascii_uppercase(), &args[1..]))
    }

    fn dispatch(&self, name: &[u8], args: &[Bytes]) -> Reply {
        let mut data = self.data.lock();
        match name {
            b"PING" => Reply::Status("PONG".to_string()),
            b"FLUSHALL" | b"FLUSHDB" => {
                data.clear();
                Reply::ok()
            }
            b"DBSIZE" => Reply::Integer(data.len() as i64),
            b"GET" => match args.first().and_then(|k| data.get(k.as_ref())) {
                Some(v) => Reply::Bulk(Bytes::copy_from_slice(v)),
                None => Reply::Nil,
            },
            b"SET" => match (args.first(), args.get(1)) {
                (Some(k), Some(v)) => {
                    data.insert(k.to_vec(), v.to_vec());
                    Reply::ok()
                }
                _ => Reply::error("ERR wrong number of arguments for 'set' command"),
            },
            b"SETNX" => match (args.first(), args.get(1)) {
                (Some(k), Some(v)) => {
                    if data.contains_key(k.as_ref()) {
                        Reply::Integer(0)
                    } else {
                        data.insert(k.to_vec(), v.to_vec());
                        Reply::Integer(1)
                    }
                }
                _ => Reply::error("ERR wrong number of arguments for 'setnx' command"),
            },
            b"APPEND" => match (args.first(), args.get(1)) {
                (Some(k), Some(v)) => {
                    let entry = data.entry(k.to_vec()).or_default();
                    entry.extend_from_slice(v);
                    Reply::Integer(entry.len() as i64)
                }
                _ => Reply::error("ERR wrong number of arguments for 'append' command"),
            },
            b"STRLEN" => {
                let len = args
                    .first()
                    .and_then(|k| data.get(k.as_ref()))
                    .map_or(0, |v| v.len());
                Reply::Integer(len as i64)
            }
            b"EXISTS" => {
                let exists = args
                    .first()
                    .is_some_and(|k| data.contains_key(k.as_ref()));
                Reply::Integer(i64::from(exists))
            }
            b"DEL" => {
                let removed = args.iter().filter(|k| data.remove(k.as_ref()).is_some()).count();
                Reply::Integer(removed as i64)
            }
            b"INCR" => match args.first() {
                Some(k) => {
                    let current = match data.get(k.as_ref()) {
                        Some(v) => match std::str::from_utf8(v).ok().and_then(|s| s.parse::<i64>().ok()) {
                            Some(n) => n,
                            None => {
                                return Reply::error(
                                    "ERR value is not an integer or out of range",
                                )
                            }
                        },
                        None => 0,
                    };
                    let next = current + 1;
                    data.insert(k.to_vec(), next.to_string().into_bytes());
                    Reply::Integer(next)
                }
                None => Reply::error("ERR wrong number of arguments for 'incr' command"),
            },
            b"MGET" => Reply::Array(
                args.iter()
                    .map(|k| match data.get(k.as_ref()) {
                        Some(v) => Reply::Bulk(Bytes::copy_from_slice(v)),
                        None => Reply::Nil,
                    })
                    .collect(),
            ),
            b"MSET" => {
                if args.is_empty() || args.len() % 2 != 0 {
                    return Reply::error("ERR wrong number of arguments for 'mset' command");
                }
                for pair in args.chunks_exact(2) {
                    data.insert(pair[0].to_vec(), pair[1].to_vec());
                }
                Reply::ok()
            }
            _ => Reply::Error(format!(
                "ERR unknown command '{}'",
                String::from_utf8_lossy(name).to_ascii_lowercase()
            )),
        }
    }
}

struct Backend {
    store: Arc<MemoryStore>,
    refuse: AtomicBool,
}

/// A fixed set of in-memory backends plus the connector that reaches
/// them.
pub struct MemoryCluster {
    endpoints: Vec<ShardEndpoint>,
    backends: Arc<Vec<Backend>>,
}

impl MemoryCluster {
    /// Stand up `shards` backends on synthetic endpoints.
    pub fn new(shards: usize) -> Self {
        let endpoints = (0..shards)
            .map(|i| ShardEndpoint::new("127.0.0.1", 7000 + i as u16))
            .collect();
        let backends = Arc::new(
            (0..shards)
                .map(|_| Backend {
                    store: Arc::new(MemoryStore::default()),
                    refuse: AtomicBool::new(false),
                })
                .collect::<Vec<_>>(),
        );
        Self { endpoints, backends }
    }

    /// Endpoints in shard order, for handing to the proxy.
    pub fn endpoints(&self) -> &[ShardEndpoint] {
        &self.endpoints
    }

    /// The backing store of shard `idx`.
    pub fn store(&self, idx: usize) -> &Arc<MemoryStore> {
        &self.backends[idx].store
    }

    /// Requests shard `idx` has served so far.
    pub fn request_count(&self, idx: usize) -> u64 {
        self.backends[idx].store.request_count()
    }

    /// Make shard `idx` refuse new connections (construction-time
    /// failure).
    pub fn refuse(&self, idx: usize) {
        self.backends[idx].refuse.store(true, Ordering::Release);
    }

    /// Kill shard `idx`: its connection reports a transport failure on
    /// the next send.
    pub fn kill(&self, idx: usize) {
        self.backends[idx].store.kill();
    }

    /// A connector resolving this cluster's endpoints.
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            endpoints: self.endpoints.clone(),
            backends: Arc::clone(&self.backends),
        }
    }
}

/// Connector handing out connections to a [`MemoryCluster`].
pub struct MemoryConnector {
    endpoints: Vec<ShardEndpoint>,
    backends: Arc<Vec<Backend>>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, endpoint: &ShardEndpoint) -> Result<Box<dyn ShardConnection>> {
        let idx = self
            .endpoints
            .iter()
            .position(|e| e == endpoint)
            .ok_or_else(|| Error::Connect {
                endpoint: endpoint.clone(),
                reason: "unknown endpoint".to_string(),
            })?;
        let backend = &self.backends[idx];
        if backend.refuse.load(Ordering::Acquire) {
            return Err(Error::Connect {
                endpoint: endpoint.clone(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(Box::new(MemoryConnection {
            store: Arc::clone(&backend.store),
        }))
    }
}

struct MemoryConnection {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl ShardConnection for MemoryConnection {
    async fn send(&mut self, args: &[Bytes]) -> Option<Reply> {
        self.store.request(args)
    }
}
