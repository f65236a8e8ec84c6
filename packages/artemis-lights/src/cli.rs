use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use artemis_core::Config;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "artemis-lights",
    about = "Drive LIFX lights from an Artemis game server event feed"
)]
pub struct Cli {
    /// JSON config file; flags below override it
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Feed server host
    #[arg(long)]
    pub host: Option<String>,

    /// Feed server port
    #[arg(long)]
    pub port: Option<u16>,

    /// Bulb address to drive instead of discovering (repeatable)
    #[arg(long = "light", value_name = "ADDR")]
    pub lights: Vec<SocketAddr>,

    /// Log light commands instead of sending them
    #[arg(long)]
    pub dry_run: bool,

    /// Fade time for urgent changes, in milliseconds
    #[arg(long)]
    pub fast_ms: Option<u64>,

    /// Fade time for everything else, in milliseconds
    #[arg(long)]
    pub slow_ms: Option<u64>,

    /// Colour temperature sent with every command
    #[arg(long)]
    pub kelvin: Option<u16>,

    /// How long to wait for bulbs to answer discovery, in milliseconds
    #[arg(long)]
    pub discovery_timeout_ms: Option<u64>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.feed.host = host.clone();
        }
        if let Some(port) = self.port {
            config.feed.port = port;
        }
        if !self.lights.is_empty() {
            config.lights.addresses = self.lights.clone();
        }
        if let Some(ms) = self.fast_ms {
            config.transitions.fast = Duration::from_millis(ms);
        }
        if let Some(ms) = self.slow_ms {
            config.transitions.slow = Duration::from_millis(ms);
        }
        if let Some(kelvin) = self.kelvin {
            config.lights.kelvin = kelvin;
        }
        if let Some(ms) = self.discovery_timeout_ms {
            config.lights.discovery_timeout = Duration::from_millis(ms);
        }
    }
}
