//! Bridge from an Artemis bridge-simulator event feed to LIFX lights.
//!
//! The `feed` module keeps a TCP connection to the game server alive and turns
//! its line protocol into events; the `lights` module folds those events into
//! a small state machine and sends the winning colour to the bulbs.

pub mod config;
pub mod error;
pub mod feed;
pub mod lights;

pub use config::Config;
pub use error::{ConfigError, FeedError, ParseError, SinkError};
pub use feed::{DispatchTable, Event, FeedClient, FeedCommand, TcpConnector};
pub use lights::{LightController, LightSink};
