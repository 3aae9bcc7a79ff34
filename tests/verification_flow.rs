//! End-to-end verification tests for the webhook guard.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_trusted_origin_is_forwarded() {
    let meta_addr: SocketAddr = "127.0.0.1:28201".parse().unwrap();
    let downstream_addr: SocketAddr = "127.0.0.1:28202".parse().unwrap();
    let guard_addr: SocketAddr = "127.0.0.1:28203".parse().unwrap();

    common::start_mock_meta(meta_addr, common::hooks_body(&["192.30.252.0/22"])).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    common::start_capture_downstream(downstream_addr, tx).await;

    let config = common::guard_config(meta_addr, downstream_addr);
    let _shutdown = common::start_guard(guard_addr, config).await;

    let res = client()
        .post(format!("http://{}/webhook", guard_addr))
        .header("X-Forwarded-For", "192.30.252.1")
        .body(common::webhook_payload())
        .send()
        .await
        .expect("guard unreachable");

    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "relayed");

    let captured = rx.recv().await.expect("downstream saw no request");
    assert!(captured.starts_with("POST /webhook"));
}

#[tokio::test]
async fn test_untrusted_origin_is_rejected() {
    let meta_addr: SocketAddr = "127.0.0.1:28211".parse().unwrap();
    let downstream_addr: SocketAddr = "127.0.0.1:28212".parse().unwrap();
    let guard_addr: SocketAddr = "127.0.0.1:28213".parse().unwrap();

    // The rescue fetch returns the same ranges, so the miss stays a miss.
    common::start_mock_meta(meta_addr, common::hooks_body(&["192.30.252.0/22"])).await;

    let config = common::guard_config(meta_addr, downstream_addr);
    let _shutdown = common::start_guard(guard_addr, config).await;

    let res = client()
        .post(format!("http://{}/webhook", guard_addr))
        .header("X-Forwarded-For", "192.30.251.1")
        .body(common::webhook_payload())
        .send()
        .await
        .expect("guard unreachable");

    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn test_miss_triggers_lazy_refresh() {
    let meta_addr: SocketAddr = "127.0.0.1:28221".parse().unwrap();
    let downstream_addr: SocketAddr = "127.0.0.1:28222".parse().unwrap();
    let guard_addr: SocketAddr = "127.0.0.1:28223".parse().unwrap();

    // Bootstrap sees an unrelated range; the provider rotates afterwards.
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    common::start_programmable_meta(meta_addr, move || {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                (200, common::hooks_body(&["10.1.0.0/16"]))
            } else {
                (200, common::hooks_body(&["192.30.252.0/22"]))
            }
        }
    })
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    common::start_capture_downstream(downstream_addr, tx).await;

    let config = common::guard_config(meta_addr, downstream_addr);
    let _shutdown = common::start_guard(guard_addr, config).await;

    let res = client()
        .post(format!("http://{}/webhook", guard_addr))
        .header("X-Forwarded-For", "192.30.252.1")
        .body(common::webhook_payload())
        .send()
        .await
        .expect("guard unreachable");

    // One synchronous refresh rescued the request.
    assert_eq!(res.status(), 200);
    assert!(rx.recv().await.is_some());
    assert!(call_count.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn test_failed_lazy_refresh_fails_closed() {
    let meta_addr: SocketAddr = "127.0.0.1:28231".parse().unwrap();
    let downstream_addr: SocketAddr = "127.0.0.1:28232".parse().unwrap();
    let guard_addr: SocketAddr = "127.0.0.1:28233".parse().unwrap();

    // Bootstrap succeeds, every later fetch breaks.
    let call_count = Arc::new(AtomicU32::new(0));
    let cc = call_count.clone();
    common::start_programmable_meta(meta_addr, move || {
        let cc = cc.clone();
        async move {
            if cc.fetch_add(1, Ordering::SeqCst) == 0 {
                (200, common::hooks_body(&["10.1.0.0/16"]))
            } else {
                (500, "upstream broken".to_string())
            }
        }
    })
    .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    common::start_capture_downstream(downstream_addr, tx).await;

    let config = common::guard_config(meta_addr, downstream_addr);
    let _shutdown = common::start_guard(guard_addr, config).await;

    let res = client()
        .post(format!("http://{}/webhook", guard_addr))
        .header("X-Forwarded-For", "192.30.252.1")
        .body(common::webhook_payload())
        .send()
        .await
        .expect("guard unreachable");

    // Unconfirmable is untrusted, never a server error.
    assert_eq!(res.status(), 401);

    // The failed refresh must not have evicted the bootstrap snapshot.
    let res = client()
        .post(format!("http://{}/webhook", guard_addr))
        .header("X-Forwarded-For", "10.1.0.5")
        .body(common::webhook_payload())
        .send()
        .await
        .expect("guard unreachable");

    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn test_status_reports_range_count() {
    let meta_addr: SocketAddr = "127.0.0.1:28241".parse().unwrap();
    let downstream_addr: SocketAddr = "127.0.0.1:28242".parse().unwrap();
    let guard_addr: SocketAddr = "127.0.0.1:28243".parse().unwrap();

    common::start_mock_meta(
        meta_addr,
        common::hooks_body(&["192.30.252.0/22", "185.199.108.0/22"]),
    )
    .await;

    let config = common::guard_config(meta_addr, downstream_addr);
    let _shutdown = common::start_guard(guard_addr, config).await;

    let res = client()
        .get(format!("http://{}/status", guard_addr))
        .send()
        .await
        .expect("guard unreachable");

    assert_eq!(res.status(), 200);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["trusted_ranges"], 2);
}

#[tokio::test]
async fn test_unusable_forwarding_header_is_bad_request() {
    let meta_addr: SocketAddr = "127.0.0.1:28251".parse().unwrap();
    let downstream_addr: SocketAddr = "127.0.0.1:28252".parse().unwrap();
    let guard_addr: SocketAddr = "127.0.0.1:28253".parse().unwrap();

    common::start_mock_meta(meta_addr, common::hooks_body(&["192.30.252.0/22"])).await;

    let config = common::guard_config(meta_addr, downstream_addr);
    let _shutdown = common::start_guard(guard_addr, config).await;

    let res = client()
        .post(format!("http://{}/webhook", guard_addr))
        .header("X-Forwarded-For", "not-an-address")
        .body(common::webhook_payload())
        .send()
        .await
        .expect("guard unreachable");

    assert_eq!(res.status(), 400);
}
