//! The default `TcpClient`/`TcpConnection` implementation: a tokio
//! `TcpStream` framed with [`StompFrameCodec`], one outbound channel and one
//! read loop per connection, and timer-driven inactivity watchdogs.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use stomp_relay_protocol::Message;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_util::codec::Framed;
use tracing::{debug, error};

use crate::codec::StompFrameCodec;
use crate::error::{TransportError, TransportResult};
use crate::reconnect::ReconnectStrategy;
use crate::traits::{InactivityWatchdog, SessionEvents, TcpClient, TcpConnection};

const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Connects to a single fixed remote address. One `TokioTcpClient` is
/// constructed per logical session (client or system); there is no shared
/// listener, since the relay always dials out to the upstream broker.
pub struct TokioTcpClient {
    remote_addr: SocketAddr,
    shutdown_tx: broadcast::Sender<()>,
}

impl TokioTcpClient {
    #[must_use]
    pub fn new(remote_addr: SocketAddr) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self { remote_addr, shutdown_tx }
    }

    async fn dial_once(&self, handler: &Arc<dyn SessionEvents>) -> TransportResult<()> {
        let stream = TcpStream::connect(self.remote_addr).await.map_err(|e| {
            TransportError::ConnectFailed(format!("{} unreachable: {e}", self.remote_addr))
        })?;

        let framed = Framed::new(stream, StompFrameCodec);
        let (mut sink, mut stream) = framed.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(OUTBOUND_CHANNEL_CAPACITY);
        let (conn_shutdown_tx, _) = broadcast::channel(1);

        let connection = Arc::new(TokioTcpConnection {
            outbound: outbound_tx,
            closed: Arc::new(AtomicBool::new(false)),
            last_write: Arc::new(StdMutex::new(Instant::now())),
            last_read: Arc::new(StdMutex::new(Instant::now())),
            shutdown: conn_shutdown_tx.clone(),
        });

        let send_last_write = connection.last_write.clone();
        let mut send_shutdown = conn_shutdown_tx.subscribe();
        let send_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = send_shutdown.recv() => break,
                    frame = outbound_rx.recv() => {
                        let Some(frame) = frame else { break };
                        if let Err(e) = sink.send(frame).await {
                            error!("STOMP connection write failed: {e}");
                            break;
                        }
                        *send_last_write.lock().expect("last_write mutex poisoned") = Instant::now();
                    }
                }
            }
        });

        handler.after_connected(connection.clone() as Arc<dyn TcpConnection>).await;

        let read_last_read = connection.last_read.clone();
        let mut read_shutdown = conn_shutdown_tx.subscribe();
        loop {
            tokio::select! {
                _ = read_shutdown.recv() => break,
                frame = stream.next() => {
                    match frame {
                        Some(Ok(frame)) => {
                            *read_last_read.lock().expect("last_read mutex poisoned") = Instant::now();
                            handler.handle_message(frame).await;
                        }
                        Some(Err(e)) => {
                            handler.handle_failure(TransportError::ConnectFailed(e.to_string())).await;
                            break;
                        }
                        None => {
                            handler.after_connection_closed().await;
                            break;
                        }
                    }
                }
            }
        }

        connection.closed.store(true, Ordering::SeqCst);
        let _ = conn_shutdown_tx.send(());
        send_task.abort();
        Ok(())
    }
}

#[async_trait]
impl TcpClient for TokioTcpClient {
    async fn connect(&self, handler: Arc<dyn SessionEvents>) -> TransportResult<()> {
        match self.dial_once(&handler).await {
            Ok(()) => Ok(()),
            Err(e) => {
                handler.after_connect_failure(e.clone()).await;
                Err(e)
            }
        }
    }

    async fn connect_with_reconnect(
        &self,
        handler: Arc<dyn SessionEvents>,
        strategy: ReconnectStrategy,
    ) -> TransportResult<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        loop {
            if let Err(e) = self.dial_once(&handler).await {
                handler.after_connect_failure(e).await;
            }

            let Some(delay) = strategy.delay() else {
                return Ok(());
            };
            tokio::select! {
                _ = shutdown_rx.recv() => return Ok(()),
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn shutdown(&self) -> TransportResult<()> {
        let _ = self.shutdown_tx.send(());
        Ok(())
    }
}

/// A live connection: an outbound queue drained by a dedicated send task, plus
/// timer-driven inactivity watchdogs registered against the shared
/// last-activity timestamps the send/read loops update.
pub struct TokioTcpConnection {
    outbound: mpsc::Sender<Message>,
    closed: Arc<AtomicBool>,
    last_write: Arc<StdMutex<Instant>>,
    last_read: Arc<StdMutex<Instant>>,
    shutdown: broadcast::Sender<()>,
}

#[async_trait]
impl TcpConnection for TokioTcpConnection {
    async fn send(&self, message: Message) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(message)
            .await
            .map_err(|_| TransportError::SendFailed("connection's outbound queue is closed".into()))
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown.send(());
        }
    }

    fn on_write_inactivity(&self, watchdog: Arc<dyn InactivityWatchdog>, interval: Duration) {
        spawn_watchdog(self.last_write.clone(), self.closed.clone(), self.shutdown.clone(), watchdog, interval);
    }

    fn on_read_inactivity(&self, watchdog: Arc<dyn InactivityWatchdog>, interval: Duration) {
        spawn_watchdog(self.last_read.clone(), self.closed.clone(), self.shutdown.clone(), watchdog, interval);
    }
}

fn spawn_watchdog(
    last_activity: Arc<StdMutex<Instant>>,
    closed: Arc<AtomicBool>,
    shutdown: broadcast::Sender<()>,
    watchdog: Arc<dyn InactivityWatchdog>,
    interval: Duration,
) {
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                () = tokio::time::sleep(interval) => {}
            }
            if closed.load(Ordering::SeqCst) {
                break;
            }
            let elapsed = last_activity.lock().expect("last_activity mutex poisoned").elapsed();
            if elapsed >= interval {
                debug!("inactivity watchdog firing after {elapsed:?} (limit {interval:?})");
                watchdog.fire().await;
            }
        }
        debug!("inactivity watchdog loop exiting");
    });
}
