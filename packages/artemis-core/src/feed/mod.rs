//! Artemis Event Feed
//!
//! This module turns the game server's line-oriented TCP feed into typed
//! events and routes them to handlers.
//!
//! ## Key components:
//! - `event` - The parsed `(timestamp, message, value)` record
//! - `parser` - Split raw bytes into lines and lines into events
//! - `connection` - Open the TCP stream behind a `Connector` seam
//! - `dispatch` - Route events to handlers by message name
//! - `client` - Read loop with bounded, backed-off reconnects

mod client;
mod connection;
mod dispatch;
mod event;
mod parser;

pub use client::{FeedClient, FeedCommand, FeedCommandSender, FeedStats};
pub use connection::{ConnectionState, Connector, TcpConnector};
pub use dispatch::{Dispatch, DispatchTable, Handler};
pub use event::Event;
pub use parser::{parse_chunk, parse_line, try_parse_line, LineParser, MAX_PARTIAL_LINE};
