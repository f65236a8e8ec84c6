//! FeedClient - resilient read loop over the Artemis feed
//!
//! The client owns the connection and runs the only long-lived loop of the
//! bridge. Every iteration it reads one chunk, turns it into events and hands
//! each event to the dispatch table synchronously, so handlers never run
//! concurrently. Any read failure (error, EOF, timeout, no connection) leads
//! to a bounded reconnect cycle; giving up on a cycle never ends the loop.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use super::connection::{ConnectionState, Connector};
use super::dispatch::{Dispatch, DispatchTable};
use super::parser::LineParser;
use crate::config::FeedConfig;
use crate::error::FeedError;

/// Commands that can be sent to a running client from other tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedCommand {
    /// Drop the current connection and start a reconnect cycle
    Reconnect,
    /// Stop the read loop
    Shutdown,
}

/// Handle for sending commands to a running FeedClient
pub type FeedCommandSender = mpsc::Sender<FeedCommand>;

/// Counters for the lifetime of a client
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FeedStats {
    /// Successful connections, including the first one
    pub connections: u64,
    /// Non-empty chunks read
    pub chunks: u64,
    /// Events parsed and routed
    pub events: u64,
    /// Events with no registered handler
    pub unhandled: u64,
    /// Reconnect cycles that exhausted every attempt
    pub failed_reconnect_cycles: u64,
}

enum Step {
    Command(Option<FeedCommand>),
    Read(Result<usize, FeedError>),
}

pub struct FeedClient<K: Connector> {
    connector: K,
    config: FeedConfig,
    stream: Option<K::Stream>,
    state: ConnectionState,
    parser: LineParser,
    read_buf: Vec<u8>,
    stats: FeedStats,
    command_rx: mpsc::Receiver<FeedCommand>,
}

impl<K: Connector> FeedClient<K> {
    /// Create a disconnected client.
    /// Returns the client and a sender for sending commands to it.
    pub fn new(config: FeedConfig, connector: K) -> (Self, FeedCommandSender) {
        let (command_tx, command_rx) = mpsc::channel(8);
        let read_buf = vec![0; config.chunk_size.max(1)];

        (
            Self {
                connector,
                config,
                stream: None,
                state: ConnectionState::Disconnected,
                parser: LineParser::new(),
                read_buf,
                stats: FeedStats::default(),
                command_rx,
            },
            command_tx,
        )
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Open a connection, replacing any existing one.
    pub async fn connect(&mut self) -> Result<(), FeedError> {
        self.drop_connection(ConnectionState::Disconnected);
        let stream = self.connector.connect().await?;
        self.install(stream);
        Ok(())
    }

    /// Retry `connect` up to the policy's attempt limit.
    ///
    /// Returns whether a connection was established. Exhausting the attempts
    /// is logged and leaves the client disconnected; it is not an error.
    pub async fn reconnect(&mut self) -> bool {
        self.drop_connection(ConnectionState::Reconnecting);

        let policy = self.config.reconnect.clone();
        let mut attempts = 0;
        while attempts < policy.max_attempts {
            attempts += 1;

            let delay = policy.backoff(attempts);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            match self.connector.connect().await {
                Ok(stream) => {
                    self.install(stream);
                    return true;
                }
                Err(e) => {
                    tracing::warn!(attempt = attempts, error = %e, "reconnect attempt failed");
                }
            }
        }

        self.state = ConnectionState::Disconnected;
        self.stats.failed_reconnect_cycles += 1;
        tracing::error!(
            target_addr = %self.connector.target(),
            "Could not reconnect after {} tries",
            attempts
        );
        false
    }

    /// Run the read loop until shutdown.
    ///
    /// Events are dispatched to `table` with `ctx` as the handler context.
    /// The loop ends on `FeedCommand::Shutdown` or once every command sender
    /// has been dropped.
    pub async fn run<C>(&mut self, table: &DispatchTable<C>, ctx: &mut C) {
        tracing::info!(
            target_addr = %self.connector.target(),
            handlers = table.len(),
            "feed client starting"
        );

        loop {
            let stream = self.stream.as_mut();
            let buf = &mut self.read_buf;
            let read_timeout = self.config.read_timeout;
            let read = async move {
                match stream {
                    Some(stream) => read_chunk(stream, buf, read_timeout).await,
                    None => Err(FeedError::NotConnected),
                }
            };

            let step = tokio::select! {
                biased;
                cmd = self.command_rx.recv() => Step::Command(cmd),
                result = read => Step::Read(result),
            };

            match step {
                Step::Command(Some(FeedCommand::Shutdown)) => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Step::Command(None) => {
                    tracing::info!("command channel closed, stopping");
                    break;
                }
                Step::Command(Some(FeedCommand::Reconnect)) => {
                    tracing::info!("reconnect requested");
                    self.reconnect().await;
                }
                Step::Read(Ok(n)) => self.deliver(n, table, ctx),
                Step::Read(Err(FeedError::NotConnected)) => {
                    self.reconnect().await;
                }
                Step::Read(Err(e)) => {
                    tracing::warn!(error = %e, "feed read failed, reconnecting");
                    self.reconnect().await;
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }

        self.drop_connection(ConnectionState::Disconnected);
        tracing::info!(
            connections = self.stats.connections,
            chunks = self.stats.chunks,
            events = self.stats.events,
            unhandled = self.stats.unhandled,
            failed_reconnect_cycles = self.stats.failed_reconnect_cycles,
            "feed client stopped"
        );
    }

    fn deliver<C>(&mut self, n: usize, table: &DispatchTable<C>, ctx: &mut C) {
        self.stats.chunks += 1;
        for event in self.parser.feed(&self.read_buf[..n]) {
            self.stats.events += 1;
            if table.dispatch(ctx, &event) == Dispatch::Unhandled {
                self.stats.unhandled += 1;
            }
        }
    }

    fn install(&mut self, stream: K::Stream) {
        self.stream = Some(stream);
        self.parser.reset();
        self.state = ConnectionState::Connected;
        self.stats.connections += 1;
        tracing::info!(target_addr = %self.connector.target(), "connected to feed");
    }

    fn drop_connection(&mut self, next: ConnectionState) {
        // A partial line from the old stream can never be completed by the new one
        self.stream = None;
        self.parser.reset();
        self.state = next;
    }
}

/// Read one chunk, mapping EOF and an elapsed timeout to errors.
async fn read_chunk<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut [u8],
    timeout: Option<Duration>,
) -> Result<usize, FeedError> {
    let n = match timeout {
        Some(limit) => tokio::time::timeout(limit, stream.read(buf))
            .await
            .map_err(|_| FeedError::ReadTimeout(limit))??,
        None => stream.read(buf).await?,
    };

    if n == 0 {
        return Err(FeedError::Closed);
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconnectPolicy;
    use crate::feed::Event;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncWriteExt, DuplexStream};

    /// Connector that always fails and counts how often it was asked
    struct FailingConnector {
        attempts: u32,
    }

    #[async_trait]
    impl Connector for FailingConnector {
        type Stream = DuplexStream;

        async fn connect(&mut self) -> Result<DuplexStream, FeedError> {
            self.attempts += 1;
            Err(FeedError::Connect {
                addr: self.target(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        }

        fn target(&self) -> String {
            "nowhere:0".to_string()
        }
    }

    /// Connector handing out pre-filled in-memory streams in order
    struct ScriptedConnector {
        streams: VecDeque<DuplexStream>,
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        type Stream = DuplexStream;

        async fn connect(&mut self) -> Result<DuplexStream, FeedError> {
            self.streams.pop_front().ok_or_else(|| FeedError::Connect {
                addr: self.target(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            })
        }

        fn target(&self) -> String {
            "script:0".to_string()
        }
    }

    fn fast_config() -> FeedConfig {
        FeedConfig {
            poll_interval: Duration::from_millis(1),
            reconnect: ReconnectPolicy {
                max_attempts: 5,
                initial_backoff: Duration::ZERO,
                max_backoff: Duration::ZERO,
            },
            ..FeedConfig::default()
        }
    }

    fn record(ctx: &mut Vec<String>, event: &Event) {
        ctx.push(event.message().to_string());
    }

    /// In-memory stream already holding `data`; the returned writer keeps it open
    async fn stream_with(data: &[u8]) -> (DuplexStream, DuplexStream) {
        let (client, mut server) = tokio::io::duplex(4096);
        server.write_all(data).await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_reconnect_gives_up_after_five_attempts() {
        let (mut client, _tx) = FeedClient::new(fast_config(), FailingConnector { attempts: 0 });

        assert!(!client.reconnect().await);
        assert_eq!(client.connector().attempts, 5);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.stats().failed_reconnect_cycles, 1);

        // A later cycle starts counting again
        assert!(!client.reconnect().await);
        assert_eq!(client.connector().attempts, 10);
    }

    /// Writer collecting formatted log output for assertions
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_reconnect_logs_attempt_count() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (mut client, _tx) = FeedClient::new(fast_config(), FailingConnector { attempts: 0 });
        assert!(!client.reconnect().await);

        let output = logs.contents();
        assert!(
            output.contains("Could not reconnect after 5 tries"),
            "log output was: {}",
            output
        );
        assert_eq!(output.matches("reconnect attempt failed").count(), 5);
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let (mut client, _tx) = FeedClient::new(fast_config(), FailingConnector { attempts: 0 });
        assert!(matches!(client.connect().await, Err(FeedError::Connect { .. })));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_reconnect_uses_backoff() {
        let mut config = fast_config();
        config.reconnect.max_attempts = 3;
        config.reconnect.initial_backoff = Duration::from_millis(20);
        config.reconnect.max_backoff = Duration::from_millis(20);
        let (mut client, _tx) = FeedClient::new(config, FailingConnector { attempts: 0 });

        let started = tokio::time::Instant::now();
        assert!(!client.reconnect().await);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_run_survives_disconnect_and_keeps_order() {
        let (first, first_server) = stream_with(b"1.0 A B 1\n2.0 C D 0\n").await;
        drop(first_server); // EOF after the buffered lines
        let (second, _second_server) = stream_with(b"3.0 E F 1\n4.0 UNKNOWN x 1\n").await;

        let connector = ScriptedConnector {
            streams: VecDeque::from([first, second]),
        };
        let (mut client, tx) = FeedClient::new(fast_config(), connector);

        let mut table = DispatchTable::new();
        table.register("A", record);
        table.register("C", record);
        table.register("E", record);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            tx.send(FeedCommand::Shutdown).await.unwrap();
        });

        let mut seen = Vec::new();
        client.run(&table, &mut seen).await;

        assert_eq!(seen, ["A", "C", "E"]);
        let stats = client.stats();
        assert_eq!(stats.connections, 2);
        assert_eq!(stats.events, 4);
        assert_eq!(stats.unhandled, 1);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_run_joins_line_split_across_reads() {
        let (stream, mut server) = tokio::io::duplex(4096);
        let connector = ScriptedConnector {
            streams: VecDeque::from([stream]),
        };
        let (mut client, tx) = FeedClient::new(fast_config(), connector);

        let mut table = DispatchTable::new();
        table.register("RED_ALERT", record);

        tokio::spawn(async move {
            server.write_all(b"1.0 RED_").await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
            server.write_all(b"ALERT x 1\n").await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
            tx.send(FeedCommand::Shutdown).await.unwrap();
        });

        let mut seen = Vec::new();
        client.run(&table, &mut seen).await;

        assert_eq!(seen, ["RED_ALERT"]);
        assert_eq!(client.stats().chunks, 2);
    }

    #[tokio::test]
    async fn test_run_stops_when_senders_dropped() {
        let (mut client, tx) = FeedClient::new(fast_config(), FailingConnector { attempts: 0 });
        drop(tx);

        let table: DispatchTable<Vec<String>> = DispatchTable::new();
        let mut seen = Vec::new();
        client.run(&table, &mut seen).await;

        assert_eq!(client.connector().attempts, 0);
    }

    #[tokio::test]
    async fn test_read_timeout_triggers_reconnect() {
        let (quiet, _quiet_server) = tokio::io::duplex(64);
        let (second, _second_server) = stream_with(b"1.0 A B 1\n").await;
        let connector = ScriptedConnector {
            streams: VecDeque::from([quiet, second]),
        };

        let mut config = fast_config();
        config.read_timeout = Some(Duration::from_millis(30));
        let (mut client, tx) = FeedClient::new(config, connector);

        let mut table = DispatchTable::new();
        table.register("A", record);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            tx.send(FeedCommand::Shutdown).await.unwrap();
        });

        let mut seen = Vec::new();
        client.run(&table, &mut seen).await;

        assert_eq!(seen, ["A"]);
        assert_eq!(client.stats().connections, 2);
    }

    #[tokio::test]
    async fn test_reconnect_command_replaces_live_stream() {
        let (first, mut first_server) = tokio::io::duplex(4096);
        // The tail of the partial line arrives on the replacement stream
        let (second, _second_server) = stream_with(b"ALERT x 1\n2.0 A B 1\n").await;
        let connector = ScriptedConnector {
            streams: VecDeque::from([first, second]),
        };
        let (mut client, tx) = FeedClient::new(fast_config(), connector);

        let mut table = DispatchTable::new();
        table.register("RED_ALERT", record);
        table.register("A", record);

        tokio::spawn(async move {
            first_server.write_all(b"1.0 RED_").await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
            tx.send(FeedCommand::Reconnect).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(FeedCommand::Shutdown).await.unwrap();
        });

        let mut seen = Vec::new();
        client.run(&table, &mut seen).await;

        assert_eq!(seen, ["A"]);
        let stats = client.stats();
        assert_eq!(stats.connections, 2);
        assert_eq!(stats.events, 1);
        assert_eq!(stats.failed_reconnect_cycles, 0);
    }
}
