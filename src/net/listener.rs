//! TCP and Unix-domain listener.
//!
//! # Responsibilities
//! - Pick the socket family from the address shape
//! - Bind, clearing whatever occupies the Unix socket path first
//! - Accept incoming connections as a single stream type
//! - Remove the Unix socket file again when the listener is dropped

use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

use crate::config::ListenerConfig;
use crate::error::StartupError;

/// Where the daemon listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// `host:port`.
    Tcp(String),
    /// Filesystem path of a Unix-domain socket.
    Unix(PathBuf),
}

impl ListenAddr {
    /// Anything containing a colon is treated as a TCP endpoint.
    pub fn parse(raw: &str) -> Self {
        if raw.contains(':') {
            ListenAddr::Tcp(raw.to_string())
        } else {
            ListenAddr::Unix(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenAddr::Tcp(addr) => write!(f, "tcp://{}", addr),
            ListenAddr::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// An accepted client connection.
#[derive(Debug)]
pub enum LogStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl AsyncRead for LogStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            LogStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            LogStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

enum Inner {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix {
        listener: UnixListener,
        path: PathBuf,
    },
}

/// A source of client connections for the accept loop.
pub trait Accept: Send + Sync + 'static {
    /// Wait for the next connection and describe its peer.
    fn accept(&self) -> impl Future<Output = io::Result<(LogStream, String)>> + Send;

    fn local_addr(&self) -> ListenAddr;
}

/// Listening socket owned by the acceptor.
pub struct LogListener {
    inner: Inner,
}

impl LogListener {
    /// Bind to the configured address.
    pub async fn bind(config: &ListenerConfig) -> Result<Self, StartupError> {
        let bind_err = |source| StartupError::Bind {
            address: config.address.clone(),
            source,
        };

        let listener = match ListenAddr::parse(&config.address) {
            ListenAddr::Tcp(addr) => {
                let listener = TcpListener::bind(&addr).await.map_err(bind_err)?;
                Self::from_tcp(listener)
            }
            #[cfg(unix)]
            ListenAddr::Unix(path) => {
                Self::bind_unix(path, config.unix_socket_mode).map_err(bind_err)?
            }
            #[cfg(not(unix))]
            ListenAddr::Unix(_) => {
                return Err(bind_err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix sockets are not supported on this platform",
                )));
            }
        };

        tracing::info!(address = %listener.local_addr(), "Listener bound");
        Ok(listener)
    }

    #[cfg(unix)]
    fn bind_unix(path: PathBuf, mode: Option<u32>) -> io::Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        Self::clear_socket_path(&path)?;

        let listener = UnixListener::bind(&path)?;
        if let Some(mode) = mode {
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))?;
        }

        Ok(Self {
            inner: Inner::Unix { listener, path },
        })
    }

    /// Remove whatever occupies the socket path, directories included.
    #[cfg(unix)]
    fn clear_socket_path(path: &std::path::Path) -> io::Result<()> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        if metadata.is_dir() {
            tracing::warn!(path = %path.display(), "Removing directory in the way of the socket");
            std::fs::remove_dir_all(path)
        } else {
            tracing::debug!(path = %path.display(), "Removing stale socket file");
            std::fs::remove_file(path)
        }
    }

    /// Wrap an already bound TCP listener.
    pub fn from_tcp(listener: TcpListener) -> Self {
        Self {
            inner: Inner::Tcp(listener),
        }
    }

    /// Wrap an already bound Unix listener. The socket file is removed on drop.
    #[cfg(unix)]
    pub fn from_unix(listener: UnixListener, path: PathBuf) -> Self {
        Self {
            inner: Inner::Unix { listener, path },
        }
    }

    /// Accept the next connection, returning it with a printable peer description.
    pub async fn accept(&self) -> io::Result<(LogStream, String)> {
        match &self.inner {
            Inner::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                Ok((LogStream::Tcp(stream), addr.to_string()))
            }
            #[cfg(unix)]
            Inner::Unix { listener, path } => {
                let (stream, addr) = listener.accept().await?;
                let peer = match addr.as_pathname() {
                    Some(p) => p.display().to_string(),
                    None => format!("unix:{}", path.display()),
                };
                Ok((LogStream::Unix(stream), peer))
            }
        }
    }

    /// The address actually bound (resolves port 0 for TCP).
    pub fn local_addr(&self) -> ListenAddr {
        match &self.inner {
            Inner::Tcp(listener) => match listener.local_addr() {
                Ok(addr) => ListenAddr::Tcp(addr.to_string()),
                Err(_) => ListenAddr::Tcp("unknown".to_string()),
            },
            #[cfg(unix)]
            Inner::Unix { path, .. } => ListenAddr::Unix(path.clone()),
        }
    }
}

impl LogListener {
    #[cfg(unix)]
    fn remove_socket_file(&self) {
        if let Inner::Unix { path, .. } = &self.inner {
            if let Err(e) = std::fs::remove_file(path) {
                if e.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove socket file");
                }
            }
        }
    }

    #[cfg(not(unix))]
    fn remove_socket_file(&self) {}
}

impl Accept for LogListener {
    fn accept(&self) -> impl Future<Output = io::Result<(LogStream, String)>> + Send {
        LogListener::accept(self)
    }

    fn local_addr(&self) -> ListenAddr {
        LogListener::local_addr(self)
    }
}

impl Drop for LogListener {
    fn drop(&mut self) {
        self.remove_socket_file();
    }
}
