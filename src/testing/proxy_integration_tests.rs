//! End-to-end tests driving the proxy against in-memory backends.
//!
//! These exercise the full path (policy lookup, ring placement, pool
//! sends, reply merging) including the degraded-cluster behaviors:
//! partial construction, lazy fault detection, rerouting, and fail-fast
//! merges.

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::testing::MemoryCluster;
    use crate::types::Reply;
    use crate::ShardProxy;
    use bytes::Bytes;

    async fn proxy_over(cluster: &MemoryCluster) -> ShardProxy {
        ShardProxy::connect(&cluster.connector(), cluster.endpoints())
            .await
            .expect("proxy must construct")
    }

    /// Two keys the ring assigns to two different shards.
    fn keys_on_distinct_shards(proxy: &ShardProxy) -> (String, String) {
        let first = "probe-0".to_string();
        let first_shard = proxy.shard_for_key(first.as_bytes()).unwrap();
        let second = (1..10_000)
            .map(|i| format!("probe-{i}"))
            .find(|k| proxy.shard_for_key(k.as_bytes()).unwrap() != first_shard)
            .expect("three shards cannot own every probe key");
        (first, second)
    }

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        let reply = proxy.command_str(&["SET", "foo", "hello world"]).await.unwrap();
        assert_eq!(reply, Reply::ok());
        let reply = proxy.command_str(&["GET", "foo"]).await.unwrap();
        assert_eq!(reply, Reply::Bulk(Bytes::from_static(b"hello world")));
    }

    #[tokio::test]
    async fn test_binary_safe_arguments() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        let key = Bytes::from_static(b"bin\x00key");
        let value = Bytes::from_static(b"\x01\x02\x00\x03");
        let set = [Bytes::from_static(b"SET"), key.clone(), value.clone()];
        assert_eq!(proxy.command(&set).await.unwrap(), Reply::ok());
        let get = [Bytes::from_static(b"GET"), key];
        assert_eq!(proxy.command(&get).await.unwrap(), Reply::Bulk(value));
    }

    #[tokio::test]
    async fn test_single_key_lands_on_ring_owner() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        proxy.command_str(&["SET", "foo", "1"]).await.unwrap();
        let owner = proxy.shard_for_key(b"foo").unwrap();
        assert_eq!(cluster.store(owner).peek(b"foo"), Some(b"1".to_vec()));
        for shard in 0..3 {
            if shard != owner {
                assert_eq!(cluster.store(shard).peek(b"foo"), None);
            }
        }
    }

    #[tokio::test]
    async fn test_mget_preserves_original_key_order() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        // Ten keys, scattered across shards by the ring.
        for i in 0..10 {
            proxy
                .command_str(&["SET", &format!("k{i}"), &format!("v{i}")])
                .await
                .unwrap();
        }
        // Request them in reverse, with a missing key in the middle.
        let mut request = vec!["MGET".to_string()];
        for i in (0..10).rev() {
            request.push(format!("k{i}"));
            if i == 5 {
                request.push("nosuchkey".to_string());
            }
        }
        let request: Vec<&str> = request.iter().map(String::as_str).collect();
        let reply = proxy.command_str(&request).await.unwrap();

        let elements = reply.as_array().expect("mget returns an array").to_vec();
        assert_eq!(elements.len(), 11);
        let mut expected = Vec::new();
        for i in (0..10).rev() {
            expected.push(Reply::Bulk(Bytes::from(format!("v{i}"))));
            if i == 5 {
                expected.push(Reply::Nil);
            }
        }
        assert_eq!(elements, expected);
    }

    #[tokio::test]
    async fn test_mset_reaches_every_owning_shard() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        let reply = proxy
            .command_str(&["MSET", "a", "1", "b", "2", "c", "3", "d", "4"])
            .await
            .unwrap();
        assert_eq!(reply, Reply::ok());
        for key in ["a", "b", "c", "d"] {
            let owner = proxy.shard_for_key(key.as_bytes()).unwrap();
            assert!(
                cluster.store(owner).peek(key.as_bytes()).is_some(),
                "key {key} missing on its owner"
            );
        }
        // And readable back through the proxy in request order.
        let reply = proxy.command_str(&["MGET", "d", "a"]).await.unwrap();
        assert_eq!(
            reply,
            Reply::Array(vec![
                Reply::Bulk(Bytes::from_static(b"4")),
                Reply::Bulk(Bytes::from_static(b"1")),
            ])
        );
    }

    #[tokio::test]
    async fn test_mget_keys_on_dead_shard_come_back_nil() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        let (a, b) = keys_on_distinct_shards(&proxy);
        proxy.command_str(&["SET", &a, "va"]).await.unwrap();
        proxy.command_str(&["SET", &b, "vb"]).await.unwrap();
        let shard_b = proxy.shard_for_key(b.as_bytes()).unwrap();
        cluster.kill(shard_b);

        let reply = proxy.command_str(&["MGET", &a, &b]).await.unwrap();
        let elements = reply.as_array().unwrap();
        // The live shard's key is served, the dead shard's key is nil
        // instead of failing the whole call.
        assert_eq!(elements[0], Reply::Bulk(Bytes::from_static(b"va")));
        assert_eq!(elements[1], Reply::Nil);
    }

    #[tokio::test]
    async fn test_del_sums_deletions_across_shards() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        let (a, b) = keys_on_distinct_shards(&proxy);
        proxy.command_str(&["SET", &a, "1"]).await.unwrap();
        proxy.command_str(&["SET", &b, "1"]).await.unwrap();

        // DEL broadcasts to all shards and sums per-shard deletion
        // counts: 1 + 1 here, each key deleted where it lives.
        let reply = proxy.command_str(&["DEL", &a, &b]).await.unwrap();
        assert_eq!(reply, Reply::Integer(2));
        assert_eq!(proxy.command_str(&["GET", &a]).await.unwrap(), Reply::Nil);
        assert_eq!(proxy.command_str(&["GET", &b]).await.unwrap(), Reply::Nil);
    }

    #[tokio::test]
    async fn test_dbsize_sums_across_shards() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        for i in 0..12 {
            proxy
                .command_str(&["SET", &format!("k{i}"), "x"])
                .await
                .unwrap();
        }
        assert_eq!(
            proxy.command_str(&["DBSIZE"]).await.unwrap(),
            Reply::Integer(12)
        );
    }

    #[tokio::test]
    async fn test_ping_and_flushall_broadcast() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        assert_eq!(
            proxy.command_str(&["PING"]).await.unwrap(),
            Reply::Status("PONG".to_string())
        );
        for i in 0..6 {
            proxy
                .command_str(&["SET", &format!("k{i}"), "x"])
                .await
                .unwrap();
        }
        assert_eq!(proxy.command_str(&["FLUSHALL"]).await.unwrap(), Reply::ok());
        assert_eq!(
            proxy.command_str(&["DBSIZE"]).await.unwrap(),
            Reply::Integer(0)
        );
    }

    #[tokio::test]
    async fn test_rename_rejected_without_shard_contact() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;
        let before: u64 = (0..3).map(|i| cluster.request_count(i)).sum();

        let reply = proxy.command_str(&["RENAME", "a", "b"]).await.unwrap();
        match reply {
            Reply::Error(msg) => assert!(msg.contains("rename"), "{msg}"),
            other => panic!("expected error reply, got {other:?}"),
        }
        let after: u64 = (0..3).map(|i| cluster.request_count(i)).sum();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unknown_command_rejected_like_unsupported() {
        let cluster = MemoryCluster::new(2);
        let proxy = proxy_over(&cluster).await;

        let reply = proxy.command_str(&["TOP123", "foo", "bar"]).await.unwrap();
        match reply {
            Reply::Error(msg) => assert!(msg.contains("top123"), "{msg}"),
            other => panic!("expected error reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_backend_error_passes_through_single_key() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        proxy.command_str(&["SET", "word", "abc"]).await.unwrap();
        let reply = proxy.command_str(&["INCR", "word"]).await.unwrap();
        match reply {
            Reply::Error(msg) => assert!(msg.contains("not an integer"), "{msg}"),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_key_reroutes_after_lazy_failure() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .try_init();

        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;

        proxy.command_str(&["SET", "foo", "1"]).await.unwrap();
        let owner = proxy.shard_for_key(b"foo").unwrap();

        // Connection dies behind the proxy's back; the failure is only
        // detected on the next send to that shard.
        cluster.kill(owner);
        assert_eq!(proxy.live_shards(), 3);

        // The data is gone with the shard, but the call must succeed via
        // the next live point on the ring rather than fail.
        let reply = proxy.command_str(&["GET", "foo"]).await.unwrap();
        assert_eq!(reply, Reply::Nil);
        assert_eq!(proxy.live_shards(), 2);

        let rerouted = proxy.shard_for_key(b"foo").unwrap();
        assert_ne!(rerouted, owner);
        // Writes now land on the alternate owner and read back fine.
        proxy.command_str(&["SET", "foo", "2"]).await.unwrap();
        assert_eq!(
            proxy.command_str(&["GET", "foo"]).await.unwrap(),
            Reply::Bulk(Bytes::from_static(b"2"))
        );
        assert_eq!(proxy.shard_for_key(b"foo").unwrap(), rerouted);
    }

    #[tokio::test]
    async fn test_all_shards_dead_fails_with_no_live_shard() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .try_init();

        let cluster = MemoryCluster::new(2);
        let proxy = proxy_over(&cluster).await;

        cluster.kill(0);
        cluster.kill(1);
        // First calls burn through lazy detection, then nothing is left.
        let result = proxy.command_str(&["GET", "foo"]).await;
        assert!(matches!(result, Err(Error::NoLiveShard)));
        assert_eq!(proxy.live_shards(), 0);
    }

    #[tokio::test]
    async fn test_partial_construction_routes_around_missing_shard() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("info")
            .try_init();

        let cluster = MemoryCluster::new(3);
        cluster.refuse(1);
        let proxy = proxy_over(&cluster).await;
        assert_eq!(proxy.shard_count(), 3);
        assert_eq!(proxy.live_shards(), 2);

        // Keys the ring would give to shard 1 go to its ring successor;
        // the dead slot is never selected.
        for i in 0..200 {
            let key = format!("probe-{i}");
            assert_ne!(proxy.shard_for_key(key.as_bytes()).unwrap(), 1);
        }
        proxy.command_str(&["SET", "foo", "v"]).await.unwrap();
        assert_eq!(
            proxy.command_str(&["GET", "foo"]).await.unwrap(),
            Reply::Bulk(Bytes::from_static(b"v"))
        );
    }

    #[tokio::test]
    async fn test_zero_endpoints_fails_construction() {
        let cluster = MemoryCluster::new(0);
        let result = ShardProxy::connect(&cluster.connector(), cluster.endpoints()).await;
        assert!(matches!(result, Err(Error::NoBackends)));
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error_reply() {
        let cluster = MemoryCluster::new(1);
        let proxy = proxy_over(&cluster).await;
        let reply = proxy.command(&[]).await.unwrap();
        assert!(reply.is_error());
    }

    #[tokio::test]
    async fn test_locate_is_stable_across_calls() {
        let cluster = MemoryCluster::new(3);
        let proxy = proxy_over(&cluster).await;
        for i in 0..100 {
            let key = format!("stable-{i}");
            let first = proxy.shard_for_key(key.as_bytes()).unwrap();
            let second = proxy.shard_for_key(key.as_bytes()).unwrap();
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_shutdown_releases_connections() {
        let cluster = MemoryCluster::new(2);
        let proxy = proxy_over(&cluster).await;
        proxy.command_str(&["PING"]).await.unwrap();
        proxy.shutdown().await;
        // The proxy is consumed; nothing further can be called on it.
    }
}
