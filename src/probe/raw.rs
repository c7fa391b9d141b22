//! Half-open handshake timing over a raw IPv4 socket
//!
//! Sends a hand-built SYN and times the first matching reply. The kernel
//! does not know about the connection, so it answers the SYN/ACK with a RST
//! of its own; the ACK sent here only completes the exchange on the wire.

use super::timing::Stopwatch;
use super::Prober;
use crate::error::{AppError, Result};
use crate::models::ProbeRecord;
use crate::packet::{RawPacket, TcpFlags};
use crate::types::ProbeMode;
use async_trait::async_trait;
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use pnet::transport::{
    self, ipv4_packet_iter, TransportChannelType, TransportReceiver, TransportSender,
};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

const TRANSPORT_BUFFER_SIZE: usize = 4096;
const CHANNEL_TYPE_TCP: TransportChannelType =
    TransportChannelType::Layer3(IpNextHeaderProtocols::Tcp);

/// Linux ephemeral port range
const EPHEMERAL_PORTS: std::ops::RangeInclusive<u16> = 32768..=60999;

/// Probe that measures SYN to SYN/ACK without a kernel connection
#[derive(Debug, Clone)]
pub struct RawSynProbe {
    budget: Duration,
}

impl RawSynProbe {
    /// `timeout` bounds the receive loop; without one the default budget applies
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            budget: timeout.unwrap_or(crate::defaults::DEFAULT_RAW_BUDGET),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Open and drop a channel so missing privileges surface before probing
    pub fn check_privileges() -> Result<()> {
        open_channel().map(|_| ())
    }
}

#[async_trait]
impl Prober for RawSynProbe {
    async fn probe(&self, target: SocketAddr) -> Result<ProbeRecord> {
        let dest = match target.ip() {
            IpAddr::V4(dest) => dest,
            IpAddr::V6(_) => {
                return Err(AppError::raw_socket(format!(
                    "raw mode supports IPv4 destinations only, got {}",
                    target.ip()
                )))
            }
        };

        let budget = self.budget;
        let port = target.port();
        tokio::task::spawn_blocking(move || syn_probe(dest, port, budget)).await?
    }

    fn mode(&self) -> ProbeMode {
        ProbeMode::Raw
    }
}

fn open_channel() -> Result<(TransportSender, TransportReceiver)> {
    transport::transport_channel(TRANSPORT_BUFFER_SIZE, CHANNEL_TYPE_TCP).map_err(|e| {
        if e.kind() == io::ErrorKind::PermissionDenied {
            AppError::raw_socket(format!("Operation not permitted: {}", e))
        } else {
            AppError::raw_socket(e.to_string())
        }
    })
}

/// Local address the kernel would route `dest` from
pub fn source_address_for(dest: Ipv4Addr) -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    // Connecting a UDP socket sends nothing; it only picks a route
    socket.connect((dest, 9))?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(source) => Ok(source),
        IpAddr::V6(_) => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "no IPv4 source address for destination",
        )),
    }
}

fn send(tx: &mut TransportSender, bytes: &[u8], dest: Ipv4Addr) -> io::Result<usize> {
    let packet = Ipv4Packet::new(bytes)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "short packet buffer"))?;
    tx.send_to(packet, IpAddr::V4(dest))
}

/// What a received segment means for a SYN sent with `seq`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyVerdict {
    /// Not addressed to this probe; keep listening
    Unrelated,
    /// SYN/ACK acknowledging our sequence number
    Open,
    /// RST, or an acknowledgement of some other sequence number
    Closed,
}

fn judge(reply: &RawPacket, local: (Ipv4Addr, u16), remote: (Ipv4Addr, u16), seq: u32) -> ReplyVerdict {
    if !reply.answers(local, remote) {
        return ReplyVerdict::Unrelated;
    }
    if reply.flags.contains(TcpFlags::RST) || reply.ack_seq != seq.wrapping_add(1) {
        return ReplyVerdict::Closed;
    }
    ReplyVerdict::Open
}

/// First reply that answers the probe, with its verdict.
///
/// `replies` ends when the receive budget runs out; `None` then means
/// nothing answered in time.
fn first_answer<I>(
    replies: I,
    local: (Ipv4Addr, u16),
    remote: (Ipv4Addr, u16),
    seq: u32,
) -> Option<(ReplyVerdict, RawPacket)>
where
    I: IntoIterator<Item = RawPacket>,
{
    replies
        .into_iter()
        .find_map(|reply| match judge(&reply, local, remote, seq) {
            ReplyVerdict::Unrelated => None,
            verdict => Some((verdict, reply)),
        })
}

fn syn_probe(dest: Ipv4Addr, port: u16, budget: Duration) -> Result<ProbeRecord> {
    let address = dest.to_string();

    let source_ip = match source_address_for(dest) {
        Ok(source) => source,
        Err(_) => return Ok(ProbeRecord::failed(address, port)),
    };
    let (mut tx, mut rx) = open_channel()?;

    let local = (source_ip, rand::random_range(EPHEMERAL_PORTS));
    let remote = (dest, port);
    let seq: u32 = rand::random();
    let syn = RawPacket::syn(local, remote, seq, rand::random());
    let bytes = syn.encode();

    let stopwatch = Stopwatch::start();
    if send(&mut tx, &bytes, dest).is_err() {
        return Ok(ProbeRecord::failed(address, port));
    }

    let mut packets = ipv4_packet_iter(&mut rx);
    let replies = std::iter::from_fn(|| loop {
        let remaining = stopwatch.remaining(budget)?;
        match packets.next_with_timeout(remaining) {
            Ok(Some((datagram, _))) => match RawPacket::from_ipv4(&datagram) {
                Ok(reply) => return Some(reply),
                Err(_) => continue,
            },
            Ok(None) | Err(_) => return None,
        }
    });

    match first_answer(replies, local, remote, seq) {
        Some((ReplyVerdict::Open, reply)) => {
            let elapsed = stopwatch.elapsed();
            let _ = send(&mut tx, &syn.ack_for(&reply).encode(), dest);
            Ok(ProbeRecord::success(elapsed, address, port))
        }
        _ => Ok(ProbeRecord::failed(address, port)),
    }
}
