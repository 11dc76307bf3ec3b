use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::{TcpListener, TcpStream};

use crate::error::TargetError;
use crate::stats::StatsSet;

/// Listener wrapper that counts live connections: every successful accept
/// increments the counter before the connection is handed to the caller.
pub struct TrackedListener {
    inner: TcpListener,
    stats: Arc<StatsSet>,
}

impl TrackedListener {
    /// Binds the listener. A bind failure is fatal at startup.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::Bind` when the address cannot be acquired.
    pub async fn bind(addr: &str, stats: Arc<StatsSet>) -> Result<Self, TargetError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|err| TargetError::Bind {
                addr: addr.to_owned(),
                source: err,
            })?;
        Ok(Self { inner, stats })
    }

    /// # Errors
    ///
    /// Returns `TargetError::LocalAddr` when the OS cannot report the bound
    /// address.
    pub fn local_addr(&self) -> Result<SocketAddr, TargetError> {
        self.inner
            .local_addr()
            .map_err(|err| TargetError::LocalAddr { source: err })
    }

    /// Accepts one connection, counting it live. Accept errors propagate
    /// untouched and leave the counter alone.
    ///
    /// # Errors
    ///
    /// Returns `TargetError::Accept` on listener/OS failure; the serving
    /// loop treats that as fatal.
    pub async fn accept(&self) -> Result<TrackedConn, TargetError> {
        let (stream, peer) = self
            .inner
            .accept()
            .await
            .map_err(|err| TargetError::Accept { source: err })?;
        self.stats.connection_opened();
        Ok(TrackedConn {
            stream,
            peer,
            stats: Arc::clone(&self.stats),
            closed: AtomicBool::new(false),
        })
    }
}

/// Accepted connection with a one-shot close guard: the live-connection
/// decrement happens exactly once, whether `close` is called explicitly,
/// called twice, or the connection is simply dropped.
pub struct TrackedConn {
    stream: TcpStream,
    peer: SocketAddr,
    stats: Arc<StatsSet>,
    closed: AtomicBool,
}

impl TrackedConn {
    pub const fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    #[must_use]
    pub const fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Idempotent close accounting; the socket itself closes on drop.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.stats.connection_closed();
        }
    }
}

impl Drop for TrackedConn {
    fn drop(&mut self) {
        self.close();
    }
}
