//! Reconnecting TCP client for the control-system link.
//!
//! Telemetry submission is best-effort: while disconnected, submitted
//! messages are dropped rather than queued, so the control system always
//! sees the latest data instead of a backlog of stale frames. A dedicated
//! maintenance thread retries the connection on a fixed interval and never
//! blocks submission.
//!
//! One mutex guards the whole connected-check / send / disconnect-flip
//! section, so a send can never race a reconnect on the same socket.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, trace, warn};

use crate::protocol::{decode_control, encode_telemetry, ControlMessage, TelemetryMessage};

/// Fast-fail connect so the retry loop never stalls on a dead host.
const CONNECT_TIMEOUT: Duration = Duration::from_millis(25);
/// Steady-state write timeout once connected.
const WRITE_TIMEOUT: Duration = Duration::from_millis(250);
/// Inbound reads are opportunistic and must not hold up the send cadence.
const READ_TIMEOUT: Duration = Duration::from_millis(10);
/// Reconnection retry interval while disconnected.
const RETRY_INTERVAL: Duration = Duration::from_millis(100);

const INBOUND_BUFFER: usize = 1024;

pub type ControlListener = Box<dyn Fn(&ControlMessage) + Send>;

struct Connection {
    connected: bool,
    stream: Option<TcpStream>,
}

pub struct NetworkClient {
    address: String,
    conn: Mutex<Connection>,
    listeners: Mutex<Vec<ControlListener>>,
    running: AtomicBool,
}

impl NetworkClient {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            address: format!("{}:{}", host, port),
            conn: Mutex::new(Connection {
                connected: false,
                stream: None,
            }),
            listeners: Mutex::new(Vec::new()),
            running: AtomicBool::new(true),
        }
    }

    /// Register a recipient of decoded inbound control messages.
    pub fn register_listener(&self, listener: ControlListener) {
        self.lock_listeners().push(listener);
    }

    pub fn is_connected(&self) -> bool {
        self.lock_conn().connected
    }

    /// One connection attempt with the fast-fail timeout. Returns whether
    /// the client is connected afterwards.
    pub fn connect_once(&self) -> bool {
        let mut conn = self.lock_conn();
        if conn.connected {
            return true;
        }

        let addr = match self.address.to_socket_addrs() {
            Ok(mut addrs) => match addrs.next() {
                Some(addr) => addr,
                None => {
                    debug!("No addresses resolved for {}", self.address);
                    return false;
                }
            },
            Err(e) => {
                debug!("Failed to resolve {}: {}", self.address, e);
                return false;
            }
        };

        match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
            Ok(stream) => {
                if let Err(e) = stream
                    .set_write_timeout(Some(WRITE_TIMEOUT))
                    .and_then(|_| stream.set_read_timeout(Some(READ_TIMEOUT)))
                {
                    warn!("Failed to set socket timeouts: {}", e);
                    return false;
                }
                info!("Connected to {}", self.address);
                conn.stream = Some(stream);
                conn.connected = true;
                true
            }
            Err(e) => {
                trace!("Connect to {} failed: {}", self.address, e);
                false
            }
        }
    }

    /// Send one telemetry message, then attempt one bounded inbound read.
    ///
    /// Dropped silently while disconnected. Any send error flips the client
    /// to disconnected; read timeouts and zero-length reads do not.
    pub fn submit(&self, message: &TelemetryMessage) {
        let inbound = {
            let mut conn = self.lock_conn();
            if !conn.connected {
                trace!("Disconnected, dropping telemetry for source {}", message.source);
                return;
            }

            let encoded = encode_telemetry(message);
            let stream = match conn.stream.as_mut() {
                Some(stream) => stream,
                None => return,
            };

            if let Err(e) = stream.write_all(encoded.as_bytes()) {
                error!("Send failed: {}", e);
                Self::drop_connection(&mut conn);
                return;
            }

            let mut buffer = [0u8; INBOUND_BUFFER];
            match stream.read(&mut buffer) {
                Ok(0) => None,
                Ok(n) => {
                    let decoded = decode_control(&buffer[..n]);
                    if decoded.is_none() {
                        debug!("Discarding malformed control message ({} bytes)", n);
                    }
                    decoded
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => None,
                Err(e) => {
                    error!("Receive failed: {}", e);
                    Self::drop_connection(&mut conn);
                    None
                }
            }
        };

        // Publish outside the socket section so a listener can call back
        // into the client without deadlocking.
        if let Some(message) = inbound {
            for listener in self.lock_listeners().iter() {
                listener(&message);
            }
        }
    }

    /// Run the reconnection loop until shutdown. The handle joins once the
    /// loop observes the stop flag.
    pub fn spawn_maintenance(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        thread::Builder::new()
            .name("net-maintenance".into())
            .spawn(move || {
                info!("Network maintenance starting for {}", client.address);
                while client.running.load(Ordering::Relaxed) {
                    if !client.is_connected() {
                        client.connect_once();
                    }
                    thread::sleep(RETRY_INTERVAL);
                }
                info!("Network maintenance stopping");
            })
            .expect("failed to spawn network maintenance thread")
    }

    /// Stop the maintenance loop and close the socket.
    pub fn shutdown(&self) {
        self.running.store(false, Ordering::Relaxed);
        let mut conn = self.lock_conn();
        Self::drop_connection(&mut conn);
    }

    fn drop_connection(conn: &mut MutexGuard<'_, Connection>) {
        if let Some(stream) = conn.stream.take() {
            // Half-close both directions for a faster reconnect server-side.
            let _ = stream.shutdown(Shutdown::Both);
        }
        conn.connected = false;
    }

    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<ControlListener>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
