//! Process-signal plumbing: SIGHUP becomes a flush-stats event for the
//! reporter (never termination), Ctrl+C/SIGTERM become a cooperative
//! shutdown broadcast observed by workers between loop iterations.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::shutdown::ShutdownSender;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// One pending flush is enough; coalescing further signals is fine.
const FLUSH_CHANNEL_CAPACITY: usize = 1;

pub type FlushSender = mpsc::Sender<()>;
pub type FlushReceiver = mpsc::Receiver<()>;

#[must_use]
pub fn flush_channel() -> (FlushSender, FlushReceiver) {
    mpsc::channel(FLUSH_CHANNEL_CAPACITY)
}

/// Forwards reload-style signals (SIGHUP) to the reporter as flush events.
#[must_use]
pub fn setup_flush_signal_handler(flush_tx: FlushSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut hangup = match signal(SignalKind::hangup()) {
                Ok(hangup) => hangup,
                Err(err) => {
                    tracing::warn!("Failed to register SIGHUP handler: {}", err);
                    return;
                }
            };
            while hangup.recv().await.is_some() {
                if flush_tx.try_send(()).is_err() {
                    // Reporter gone or a flush already pending; either way
                    // nothing to do for this signal.
                    if flush_tx.is_closed() {
                        break;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            // No reload-style signal on this platform; park until the
            // reporter goes away so the channel stays open.
            flush_tx.closed().await;
        }
    })
}

/// Translates terminal signals into one shutdown broadcast so the worker
/// pool drains cleanly and the final stats line still goes out. Exits as
/// soon as a shutdown is seen, whichever side of the process sent it.
#[must_use]
pub fn setup_signal_shutdown_handler(shutdown_tx: &ShutdownSender) -> JoinHandle<()> {
    let shutdown_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        let mut observer = shutdown_tx.subscribe();
        tokio::select! {
            _ = observer.recv() => {}
            name = terminal_signal() => {
                tracing::debug!("{} received, stopping workers", name);
                drop(shutdown_tx.send(()));
            }
        }
    })
}

/// Resolves with the name of the first terminal signal delivered.
async fn terminal_signal() -> &'static str {
    #[cfg(unix)]
    {
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => "interrupt",
                    _ = term.recv() => "SIGTERM",
                }
            }
            Err(err) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", err);
                drop(tokio::signal::ctrl_c().await);
                "interrupt"
            }
        }
    }

    #[cfg(not(unix))]
    {
        drop(tokio::signal::ctrl_c().await);
        "interrupt"
    }
}
