//! End-to-end tests of the line pipeline running on the real coordinator.

mod common;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::*;
use logmux::config::DaemonConfig;
use logmux::lifecycle::startup;
use logmux::lifecycle::{run_until, CoordinatorOptions, TerminationKind};
use logmux::net::ListenAddr;
use tokio::io::AsyncWriteExt;

#[tokio::test]
async fn test_unterminated_line_is_completed_on_close() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, path) = unix_listener(dir.path());
    let mut daemon = TestDaemon::start(listener, fast_options());

    let mut client = connect_unix(&path).await;
    client.write_all(b"hello").await.unwrap();
    drop(client);

    assert_eq!(daemon.read_lines(1).await, vec![b"hello\n".to_vec()]);

    let report = daemon.stop().await.unwrap();
    assert_eq!(report.sink.lines, 1);
    assert_eq!(report.sink.bytes, 6);
    assert_eq!(report.serve.connections, 1);
    assert_eq!(report.signal, Some(TerminationKind::Terminate));
    assert!(!report.drain_timed_out);
}

#[tokio::test]
async fn test_trailing_fragment_becomes_its_own_line() {
    let (listener, addr) = tcp_listener().await;
    let mut daemon = TestDaemon::start(listener, fast_options());

    let mut client = connect_tcp(&addr).await;
    client.write_all(b"a\nb\nc").await.unwrap();
    drop(client);

    assert_eq!(
        daemon.read_lines(3).await,
        vec![b"a\n".to_vec(), b"b\n".to_vec(), b"c\n".to_vec()]
    );

    let report = daemon.stop().await.unwrap();
    assert_eq!(report.sink.lines, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_never_interleave_lines() {
    const CLIENTS: usize = 10;
    const COPIES: usize = 10;

    let dir = tempfile::tempdir().unwrap();
    let (listener, path) = unix_listener(dir.path());
    let mut daemon = TestDaemon::start(listener, fast_options());

    let line = random_line(1024);
    let payload = line.repeat(COPIES);

    let mut clients = Vec::new();
    for _ in 0..CLIENTS {
        let path = path.clone();
        let payload = payload.clone();
        clients.push(tokio::spawn(async move {
            let mut conn = connect_unix(&path).await;
            write_in_random_chunks(&mut conn, &payload, 300).await;
        }));
    }
    for client in clients {
        client.await.unwrap();
    }

    let lines = daemon.read_lines(CLIENTS * COPIES).await;
    assert!(lines.iter().all(|l| *l == line));

    let report = daemon.stop().await.unwrap();
    assert_eq!(report.sink.lines, (CLIENTS * COPIES) as u64);
    assert_eq!(report.sink.bytes, (CLIENTS * COPIES * 1025) as u64);
    assert_eq!(report.serve.connections, CLIENTS as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_connection_keeps_its_own_order() {
    const CLIENTS: usize = 8;
    const LINES: usize = 50;

    let (listener, addr) = tcp_listener().await;
    let mut daemon = TestDaemon::start(listener, fast_options());

    let mut clients = Vec::new();
    for c in 0..CLIENTS {
        let addr = addr.clone();
        clients.push(tokio::spawn(async move {
            let mut payload = Vec::new();
            for seq in 0..LINES {
                payload.extend_from_slice(format!("client={c} seq={seq}\n").as_bytes());
            }
            let mut conn = connect_tcp(&addr).await;
            write_in_random_chunks(&mut conn, &payload, 17).await;
        }));
    }
    for client in clients {
        client.await.unwrap();
    }

    let mut next_seq: HashMap<usize, usize> = HashMap::new();
    for line in daemon.read_lines(CLIENTS * LINES).await {
        let text = String::from_utf8(line).unwrap();
        let (client, seq) = text
            .trim_end()
            .strip_prefix("client=")
            .and_then(|rest| rest.split_once(" seq="))
            .expect("line was torn apart");
        let client: usize = client.parse().unwrap();
        let seq: usize = seq.parse().unwrap();

        let expected = next_seq.entry(client).or_insert(0);
        assert_eq!(seq, *expected, "client {client} lines out of order");
        *expected += 1;
    }
    assert_eq!(next_seq.len(), CLIENTS);
    assert!(next_seq.values().all(|n| *n == LINES));

    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_silent_connection_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (listener, path) = unix_listener(dir.path());
    let mut daemon = TestDaemon::start(listener, fast_options());

    drop(connect_unix(&path).await);

    let mut client = connect_unix(&path).await;
    client.write_all(b"marker\n").await.unwrap();
    drop(client);

    assert_eq!(daemon.read_lines(1).await, vec![b"marker\n".to_vec()]);

    let report = daemon.stop().await.unwrap();
    assert_eq!(report.sink.lines, 1);
    assert_eq!(report.serve.connections, 2);
}

#[tokio::test]
async fn test_blank_lines_are_kept() {
    let (listener, addr) = tcp_listener().await;
    let mut daemon = TestDaemon::start(listener, fast_options());

    let mut client = connect_tcp(&addr).await;
    client.write_all(b"\n\nx\n").await.unwrap();
    drop(client);

    assert_eq!(
        daemon.read_lines(3).await,
        vec![b"\n".to_vec(), b"\n".to_vec(), b"x\n".to_vec()]
    );
    daemon.stop().await.unwrap();
}

#[tokio::test]
async fn test_file_output_appends_to_existing_content() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("aggregate.log");
    std::fs::write(&out_path, b"earlier\n").unwrap();

    let mut config = DaemonConfig::default();
    config.listener.address = "127.0.0.1:0".to_string();
    config.output.path = out_path.to_string_lossy().into_owned();
    config.shutdown.grace_period_ms = 0;

    let resources = startup::start(&config).await.unwrap();
    let ListenAddr::Tcp(addr) = resources.listener.local_addr() else {
        panic!("expected a tcp listener");
    };

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let run = tokio::spawn(run_until(
        resources.listener,
        resources.output,
        CoordinatorOptions::from(&config),
        async move {
            let _ = stop_rx.await;
            TerminationKind::Interrupt
        },
    ));

    let mut client = connect_tcp(&addr).await;
    client.write_all(b"one\ntwo").await.unwrap();
    drop(client);

    let expected = b"earlier\none\ntwo\n".to_vec();
    let deadline = Instant::now() + WAIT;
    loop {
        let content = tokio::fs::read(&out_path).await.unwrap();
        if content == expected {
            break;
        }
        assert!(Instant::now() < deadline, "output never settled: {content:?}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    stop_tx.send(()).unwrap();
    let report = run.await.unwrap().unwrap();
    assert_eq!(report.signal, Some(TerminationKind::Interrupt));
    assert_eq!(report.sink.lines, 2);
    assert_eq!(std::fs::read(&out_path).unwrap(), expected);
}
