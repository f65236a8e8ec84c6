//! LIFX LAN protocol sink
//!
//! Bulbs are found once at startup with a broadcast `GetService`, after which
//! every command is sent as a unicast `SetColor` to each bulb. All packets
//! share the 36-byte little-endian LIFX header.
//!
//! ```text
//! 0      2      4          8                 16       22    23   24        32     34   36
//! | size | prot | source   | target (mac)    | resv   | flg | seq| resv    | type | rsv|
//! ```

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use super::color::LightCommand;
use super::sink::LightSink;
use crate::config::LIFX_PORT;
use crate::error::SinkError;

pub const HEADER_LEN: usize = 36;

const PROTOCOL: u16 = 1024;
const ADDRESSABLE: u16 = 1 << 12;
const TAGGED: u16 = 1 << 13;

const FLAG_RES_REQUIRED: u8 = 1 << 0;
const FLAG_ACK_REQUIRED: u8 = 1 << 1;

/// Message types used by this sink
pub mod message {
    pub const GET_SERVICE: u16 = 2;
    pub const STATE_SERVICE: u16 = 3;
    pub const SET_COLOR: u16 = 102;
}

/// `StateService` service id for the UDP transport
const SERVICE_UDP: u8 = 1;

/// How often `GetService` is repeated while discovery is running
pub const DISCOVERY_RESEND: Duration = Duration::from_millis(200);

/// Broadcast address used for discovery
pub fn broadcast_addr() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, LIFX_PORT))
}

/// Decoded LIFX packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub size: u16,
    pub tagged: bool,
    pub source: u32,
    pub target: [u8; 8],
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    pub message_type: u16,
}

impl Header {
    fn new(message_type: u16, payload_len: usize, source: u32, target: [u8; 8], sequence: u8) -> Self {
        Self {
            size: (HEADER_LEN + payload_len) as u16,
            tagged: target == [0; 8],
            source,
            target,
            ack_required: false,
            res_required: false,
            sequence,
            message_type,
        }
    }

    fn encode(&self, buf: &mut Vec<u8>) {
        let mut protocol = PROTOCOL | ADDRESSABLE;
        if self.tagged {
            protocol |= TAGGED;
        }
        let mut flags = 0;
        if self.res_required {
            flags |= FLAG_RES_REQUIRED;
        }
        if self.ack_required {
            flags |= FLAG_ACK_REQUIRED;
        }

        buf.extend_from_slice(&self.size.to_le_bytes());
        buf.extend_from_slice(&protocol.to_le_bytes());
        buf.extend_from_slice(&self.source.to_le_bytes());
        buf.extend_from_slice(&self.target);
        buf.extend_from_slice(&[0; 6]);
        buf.push(flags);
        buf.push(self.sequence);
        buf.extend_from_slice(&[0; 8]);
        buf.extend_from_slice(&self.message_type.to_le_bytes());
        buf.extend_from_slice(&[0; 2]);
    }

    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);

        let protocol = u16_at(2);
        if protocol & 0x0fff != PROTOCOL {
            return None;
        }

        let mut target = [0; 8];
        target.copy_from_slice(&bytes[8..16]);

        Some(Self {
            size: u16_at(0),
            tagged: protocol & TAGGED != 0,
            source: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            target,
            res_required: bytes[22] & FLAG_RES_REQUIRED != 0,
            ack_required: bytes[22] & FLAG_ACK_REQUIRED != 0,
            sequence: bytes[23],
            message_type: u16_at(32),
        })
    }
}

pub fn encode_get_service(source: u32, sequence: u8) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN);
    Header::new(message::GET_SERVICE, 0, source, [0; 8], sequence).encode(&mut buf);
    buf
}

pub fn encode_set_color(source: u32, sequence: u8, target: [u8; 8], command: &LightCommand) -> Vec<u8> {
    const PAYLOAD_LEN: usize = 13;
    let mut buf = Vec::with_capacity(HEADER_LEN + PAYLOAD_LEN);
    Header::new(message::SET_COLOR, PAYLOAD_LEN, source, target, sequence).encode(&mut buf);

    let color = command.color;
    buf.push(0);
    buf.extend_from_slice(&color.hue.to_le_bytes());
    buf.extend_from_slice(&color.saturation.to_le_bytes());
    buf.extend_from_slice(&color.brightness.to_le_bytes());
    buf.extend_from_slice(&color.kelvin.to_le_bytes());
    buf.extend_from_slice(&command.duration_millis().to_le_bytes());
    buf
}

/// Parse a `StateService` reply into the bulb's target and UDP port.
pub fn decode_state_service(bytes: &[u8]) -> Option<([u8; 8], u16)> {
    let header = Header::decode(bytes)?;
    if header.message_type != message::STATE_SERVICE || bytes.len() < HEADER_LEN + 5 {
        return None;
    }
    let payload = &bytes[HEADER_LEN..];
    if payload[0] != SERVICE_UDP {
        return None;
    }
    let port = u32::from_le_bytes([payload[1], payload[2], payload[3], payload[4]]);
    Some((header.target, u16::try_from(port).ok()?))
}

/// A bulb the sink drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Light {
    pub addr: SocketAddr,
    /// Device MAC padded to 8 bytes; all zeros addresses whatever answers
    pub target: [u8; 8],
}

/// Sink that drives LIFX bulbs over UDP.
pub struct LifxSink {
    socket: UdpSocket,
    lights: Vec<Light>,
    source: u32,
    sequence: u8,
}

impl LifxSink {
    /// Drive the given addresses without discovery.
    pub fn with_addresses(addresses: &[SocketAddr]) -> Result<Self, SinkError> {
        if addresses.is_empty() {
            return Err(SinkError::NoLights);
        }
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        let lights = addresses
            .iter()
            .map(|&addr| Light { addr, target: [0; 8] })
            .collect();
        Ok(Self::from_parts(socket, lights))
    }

    /// Broadcast `GetService` to `broadcast`, repeating it every
    /// `DISCOVERY_RESEND`, and collect replies for `timeout`.
    pub async fn discover(broadcast: SocketAddr, timeout: Duration) -> Result<Self, SinkError> {
        let socket = tokio::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.set_broadcast(true)?;

        let source = session_source();
        let mut sequence = 0u8;
        socket.send_to(&encode_get_service(source, sequence), broadcast).await?;
        tracing::info!(%broadcast, ?timeout, "discovering LIFX lights");

        let start = tokio::time::Instant::now();
        let deadline = start + timeout;
        let mut resend = tokio::time::interval_at(start + DISCOVERY_RESEND, DISCOVERY_RESEND);
        let mut lights: Vec<Light> = Vec::new();
        let mut buf = [0u8; 128];
        loop {
            let (n, from) = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                _ = resend.tick() => {
                    sequence = sequence.wrapping_add(1);
                    let packet = encode_get_service(source, sequence);
                    if let Err(e) = socket.send_to(&packet, broadcast).await {
                        tracing::debug!(error = %e, "GetService resend failed");
                    }
                    continue;
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::debug!(error = %e, "discovery receive failed");
                        continue;
                    }
                },
            };

            let Some((target, port)) = decode_state_service(&buf[..n]) else {
                continue;
            };
            if lights.iter().any(|l| l.target == target) {
                continue;
            }
            let light = Light {
                addr: SocketAddr::new(from.ip(), port),
                target,
            };
            tracing::info!(addr = %light.addr, "found light");
            lights.push(light);
        }

        if lights.is_empty() {
            return Err(SinkError::NoLights);
        }

        let socket = socket.into_std()?;
        socket.set_nonblocking(false)?;
        Ok(Self::from_parts(socket, lights))
    }

    fn from_parts(socket: UdpSocket, lights: Vec<Light>) -> Self {
        Self {
            socket,
            lights,
            source: session_source(),
            sequence: 0,
        }
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }
}

impl LightSink for LifxSink {
    /// Send to every light; the first failure is returned after all were tried.
    fn set_all_lights(&mut self, command: &LightCommand) -> Result<(), SinkError> {
        self.sequence = self.sequence.wrapping_add(1);

        let mut first_error = None;
        for light in &self.lights {
            let packet = encode_set_color(self.source, self.sequence, light.target, command);
            if let Err(e) = self.socket.send_to(&packet, light.addr) {
                tracing::debug!(addr = %light.addr, error = %e, "SetColor send failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(SinkError::Io(e)),
            None => Ok(()),
        }
    }
}

/// Source id stamped on our packets. Values 0 and 1 make bulbs broadcast
/// their replies, so stay above them.
fn session_source() -> u32 {
    std::process::id().max(2)
}
