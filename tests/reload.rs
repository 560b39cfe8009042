//! Host table reload while serving.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use host_proxy::config::ProxyConfig;

mod common;

#[tokio::test]
async fn reload_adds_and_removes_hosts() {
    let one = common::start_mock_backend("ONE").await;
    let two = common::start_mock_backend("TWO").await;
    let table = common::write_table(&format!("a.com http://{one}\n"));
    let proxy = common::spawn_proxy(&table, |_| {}).await;
    let client = common::client();

    assert_eq!(common::get(&client, proxy.addr, "b.com", "/").await.0, 503);

    std::fs::write(table.path(), format!("b.com http://{two}\n")).unwrap();
    let installed = proxy.proxy.reload_scheduler().reload_once().await.unwrap();
    assert_eq!(installed, 1);

    assert_eq!(
        common::get(&client, proxy.addr, "b.com", "/").await,
        (200, "TWO".to_string())
    );
    assert_eq!(common::get(&client, proxy.addr, "a.com", "/").await.0, 503);
}

#[tokio::test]
async fn scheduler_picks_up_file_changes() {
    let one = common::start_mock_backend("ONE").await;
    let two = common::start_mock_backend("TWO").await;
    let table = common::write_table(&format!("a.com http://{one}\n"));
    let proxy = common::spawn_proxy(&table, |config: &mut ProxyConfig| {
        config.routes.reload_interval_secs = 1;
    })
    .await;
    let client = common::client();

    std::fs::write(table.path(), format!("a.com http://{two}\n")).unwrap();

    let switched = common::eventually(Duration::from_secs(5), || {
        let client = client.clone();
        let addr = proxy.addr;
        async move { common::get(&client, addr, "a.com", "/").await.1 == "TWO" }
    })
    .await;
    assert!(switched);
}

#[tokio::test]
async fn unreadable_table_keeps_serving_previous_routes() {
    let one = common::start_mock_backend("ONE").await;
    let table = common::write_table(&format!("a.com http://{one}\n"));
    let proxy = common::spawn_proxy(&table, |_| {}).await;
    let client = common::client();

    let path = table.path().to_path_buf();
    std::fs::remove_file(&path).unwrap();
    assert!(proxy.proxy.reload_scheduler().reload_once().await.is_err());

    assert_eq!(
        common::get(&client, proxy.addr, "a.com", "/").await,
        (200, "ONE".to_string())
    );
}

#[tokio::test]
async fn empty_reload_is_installed() {
    let one = common::start_mock_backend("ONE").await;
    let table = common::write_table(&format!("a.com http://{one}\n"));
    let proxy = common::spawn_proxy(&table, |_| {}).await;
    let client = common::client();

    std::fs::write(table.path(), "# nothing left\n").unwrap();
    assert_eq!(proxy.proxy.reload_scheduler().reload_once().await.unwrap(), 0);

    assert!(proxy.table.is_empty());
    assert_eq!(
        common::get(&client, proxy.addr, "a.com", "/").await,
        (503, "Service Unavailable".to_string())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_a_partial_table() {
    let one = common::start_mock_backend("ONE").await;
    let two = common::start_mock_backend("TWO").await;
    let first = format!("a.com http://{one}\nb.com http://{one}\nc.com http://{one}\n");
    let second = format!("a.com http://{two}\nb.com http://{two}\nc.com http://{two}\n");

    let table = common::write_table(&first);
    let proxy = common::spawn_proxy(&table, |_| {}).await;
    let routes = Arc::clone(&proxy.table);
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = Vec::new();
    for _ in 0..4 {
        let routes = Arc::clone(&routes);
        let done = Arc::clone(&done);
        readers.push(tokio::spawn(async move {
            let mut checked = 0usize;
            loop {
                let snapshot = routes.snapshot();
                let targets: Vec<_> = ["a.com", "b.com", "c.com"]
                    .iter()
                    .map(|host| snapshot.get(*host).unwrap().target().clone())
                    .collect();
                assert!(targets.iter().all(|t| *t == targets[0]));
                checked += 1;
                if done.load(Ordering::Relaxed) {
                    break;
                }
                tokio::task::yield_now().await;
            }
            checked
        }));
    }

    let scheduler = proxy.proxy.reload_scheduler();
    for round in 0..50 {
        let text = if round % 2 == 0 { &second } else { &first };
        std::fs::write(table.path(), text).unwrap();
        assert_eq!(scheduler.reload_once().await.unwrap(), 3);
    }
    done.store(true, Ordering::Relaxed);

    for reader in readers {
        assert!(reader.await.unwrap() > 0);
    }
}
