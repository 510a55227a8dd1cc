//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use logmux::error::DaemonError;
use logmux::lifecycle::{run_until, CoordinatorOptions, RunReport, TerminationKind};
use logmux::net::{Accept, ListenAddr, LogListener, LogStream};
use logmux::pipeline::{LineOutput, ReaderOptions};
use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(10);

/// Options with no grace period so tests stop quickly.
pub fn fast_options() -> CoordinatorOptions {
    CoordinatorOptions {
        grace_period: Duration::ZERO,
        drain_timeout: Duration::from_secs(2),
        channel_capacity: 1,
        reader: ReaderOptions::default(),
    }
}

pub async fn tcp_listener() -> (LogListener, String) {
    let listener = LogListener::from_tcp(TcpListener::bind("127.0.0.1:0").await.unwrap());
    let ListenAddr::Tcp(addr) = listener.local_addr() else {
        unreachable!("bound a tcp listener")
    };
    (listener, addr)
}

pub fn unix_listener(dir: &Path) -> (LogListener, PathBuf) {
    let path = dir.join("log.sock");
    let listener = LogListener::from_unix(UnixListener::bind(&path).unwrap(), path.clone());
    (listener, path)
}

pub async fn connect_unix(path: &Path) -> UnixStream {
    UnixStream::connect(path).await.unwrap()
}

pub async fn connect_tcp(addr: &str) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}

/// Write `data` in randomly sized pieces of at most `max_chunk` bytes.
pub async fn write_in_random_chunks<W: AsyncWrite + Unpin>(conn: &mut W, data: &[u8], max_chunk: usize) {
    let mut offset = 0;
    while offset < data.len() {
        let n = rand::thread_rng().gen_range(1..=max_chunk).min(data.len() - offset);
        conn.write_all(&data[offset..offset + n]).await.unwrap();
        offset += n;
        if rand::thread_rng().gen_bool(0.1) {
            tokio::task::yield_now().await;
        }
    }
}

/// A printable line of `len` random characters, newline included.
pub fn random_line(len: usize) -> Vec<u8> {
    let mut line: Vec<u8> = rand::thread_rng()
        .sample_iter(rand::distributions::Alphanumeric)
        .take(len)
        .collect();
    line.push(b'\n');
    line
}

/// A daemon running on the real coordinator, writing into an in-memory pipe.
pub struct TestDaemon {
    pub output: BufReader<DuplexStream>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<RunReport<PipeOutput>, DaemonError>>,
}

impl TestDaemon {
    pub fn start<L: Accept>(listener: L, options: CoordinatorOptions) -> Self {
        Self::start_with_pipe(listener, options, 1 << 20)
    }

    /// `pipe_capacity` bounds how much output can pile up before the sink blocks.
    pub fn start_with_pipe<L: Accept>(listener: L, options: CoordinatorOptions, pipe_capacity: usize) -> Self {
        let (writer, reader) = tokio::io::duplex(pipe_capacity);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(run_until(listener, PipeOutput(writer), options, async move {
            let _ = stop_rx.await;
            TerminationKind::Terminate
        }));

        Self {
            output: BufReader::new(reader),
            stop: Some(stop_tx),
            task,
        }
    }

    /// Read exactly `n` lines from the output.
    pub async fn read_lines(&mut self, n: usize) -> Vec<Vec<u8>> {
        let mut lines = Vec::with_capacity(n);
        for _ in 0..n {
            let mut line = Vec::new();
            let read = tokio::time::timeout(WAIT, self.output.read_until(b'\n', &mut line))
                .await
                .expect("timed out waiting for output")
                .unwrap();
            assert!(read > 0, "output closed after {} lines", lines.len());
            lines.push(line);
        }
        lines
    }

    /// Deliver the termination signal and wait for the run to finish.
    pub async fn stop(mut self) -> Result<RunReport<PipeOutput>, DaemonError> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("daemon did not stop")
            .unwrap()
    }

    /// Wait for the run to end on its own (fatal error path).
    pub async fn finished(self) -> Result<RunReport<PipeOutput>, DaemonError> {
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("daemon did not stop")
            .unwrap()
    }

    /// Hand back the stop switch and task so a test can drive the output itself.
    pub fn into_parts(
        mut self,
    ) -> (
        BufReader<DuplexStream>,
        oneshot::Sender<()>,
        JoinHandle<Result<RunReport<PipeOutput>, DaemonError>>,
    ) {
        let stop = self.stop.take().expect("stop switch already used");
        (self.output, stop, self.task)
    }
}

/// Write end of an in-memory pipe, used as the daemon's output.
#[derive(Debug)]
pub struct PipeOutput(pub DuplexStream);

impl AsyncWrite for PipeOutput {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.0).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.0).poll_shutdown(cx)
    }
}

impl LineOutput for PipeOutput {
    async fn sync(&mut self) -> io::Result<()> {
        self.0.flush().await
    }
}

/// Listener that accepts `healthy` connections normally, then fails its next
/// accept once the returned switch is flipped.
pub struct ExhaustingListener {
    inner: LogListener,
    healthy: AtomicUsize,
    trip: Arc<Notify>,
}

impl ExhaustingListener {
    pub fn new(inner: LogListener, healthy: usize) -> (Self, Arc<Notify>) {
        let trip = Arc::new(Notify::new());
        let listener = Self {
            inner,
            healthy: AtomicUsize::new(healthy),
            trip: Arc::clone(&trip),
        };
        (listener, trip)
    }
}

impl Accept for ExhaustingListener {
    async fn accept(&self) -> io::Result<(LogStream, String)> {
        let budget = self
            .healthy
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if budget.is_ok() {
            return self.inner.accept().await;
        }

        self.trip.notified().await;
        Err(io::Error::from_raw_os_error(24))
    }

    fn local_addr(&self) -> ListenAddr {
        self.inner.local_addr()
    }
}

/// Output that accepts `budget` writes and then fails.
#[derive(Debug)]
pub struct FailingOutput {
    pub budget: usize,
}

impl AsyncWrite for FailingOutput {
    fn poll_write(mut self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if self.budget == 0 {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "no space left on device")));
        }
        self.budget -= 1;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl LineOutput for FailingOutput {
    async fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}
