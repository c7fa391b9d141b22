//! IPv4 + TCP packet codec for raw-mode probes
//!
//! Fields are placed through pnet's packet views: a 20-byte IPv4 header, a
//! 20-byte TCP header and an optional payload. Both checksums are computed
//! here rather than by pnet. Decoding accepts headers with options and
//! skips them.

use crate::error::{AppError, Result};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::{Ipv4Packet, MutableIpv4Packet};
use pnet::packet::tcp::{MutableTcpPacket, TcpPacket};
use pnet::packet::Packet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::ops::BitOr;

pub const IPV4_HEADER_LEN: usize = 20;
pub const TCP_HEADER_LEN: usize = 20;
pub const IPPROTO_TCP: u8 = IpNextHeaderProtocols::Tcp.0;

pub const DEFAULT_TTL: u8 = 255;
pub const DEFAULT_WINDOW: u16 = 5840;
pub const DEFAULT_PACKET_ID: u16 = 54321;

/// TCP control bits, OR-combinable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);

    pub const fn empty() -> Self {
        TcpFlags(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        TcpFlags(bits & 0x3f)
    }

    pub const fn bits(&self) -> u8 {
        self.0
    }

    pub const fn contains(&self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        TcpFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(TcpFlags, &str); 6] = [
            (TcpFlags::URG, "URG"),
            (TcpFlags::ACK, "ACK"),
            (TcpFlags::PSH, "PSH"),
            (TcpFlags::RST, "RST"),
            (TcpFlags::SYN, "SYN"),
            (TcpFlags::FIN, "FIN"),
        ];

        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&names.join("|"))
        }
    }
}

/// An IPv4 datagram carrying one TCP segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    pub flags: TcpFlags,
    pub source_ip: Ipv4Addr,
    pub dest_ip: Ipv4Addr,
    pub source_port: u16,
    pub dest_port: u16,
    pub seq: u32,
    pub ack_seq: u32,
    pub window: u16,
    pub ttl: u8,
    pub id: u16,
    /// TCP checksum; filled in by `encode` and read back by `decode`
    pub checksum: u16,
    pub urgent_ptr: u16,
    pub payload: Vec<u8>,
}

impl Default for RawPacket {
    fn default() -> Self {
        Self {
            flags: TcpFlags::SYN,
            source_ip: Ipv4Addr::LOCALHOST,
            dest_ip: Ipv4Addr::LOCALHOST,
            source_port: 0,
            dest_port: 0,
            seq: 0,
            ack_seq: 0,
            window: DEFAULT_WINDOW,
            ttl: DEFAULT_TTL,
            id: DEFAULT_PACKET_ID,
            checksum: 0,
            urgent_ptr: 0,
            payload: Vec::new(),
        }
    }
}

impl RawPacket {
    /// A SYN opening a handshake
    pub fn syn(source: (Ipv4Addr, u16), dest: (Ipv4Addr, u16), seq: u32, id: u16) -> Self {
        Self {
            flags: TcpFlags::SYN,
            source_ip: source.0,
            source_port: source.1,
            dest_ip: dest.0,
            dest_port: dest.1,
            seq,
            id,
            ..Default::default()
        }
    }

    /// The ACK completing a handshake answered by `syn_ack`
    pub fn ack_for(&self, syn_ack: &RawPacket) -> Self {
        Self {
            flags: TcpFlags::ACK,
            seq: syn_ack.ack_seq,
            ack_seq: syn_ack.seq.wrapping_add(1),
            id: self.id.wrapping_add(1),
            ..self.clone()
        }
    }

    pub fn total_len(&self) -> usize {
        IPV4_HEADER_LEN + TCP_HEADER_LEN + self.payload.len()
    }

    /// Serialize to wire bytes, computing both checksums
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.total_len()];
        let (header, segment) = buf.split_at_mut(IPV4_HEADER_LEN);
        self.write_ipv4_header(header);
        self.write_tcp_segment(segment);
        buf
    }

    /// Encode and keep the computed TCP checksum on `self`
    pub fn encode_in_place(&mut self) -> Vec<u8> {
        let bytes = self.encode();
        if let Some(segment) = TcpPacket::new(&bytes[IPV4_HEADER_LEN..]) {
            self.checksum = segment.get_checksum();
        }
        bytes
    }

    /// Parse wire bytes received on a raw socket
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let datagram = Ipv4Packet::new(bytes).ok_or_else(|| {
            AppError::parse(format!(
                "Packet too short for an IPv4 header: {} bytes",
                bytes.len()
            ))
        })?;
        Self::from_ipv4(&datagram)
    }

    /// Read the TCP segment carried by an already framed IPv4 datagram
    pub fn from_ipv4(datagram: &Ipv4Packet<'_>) -> Result<Self> {
        let bytes = datagram.packet();

        let version = datagram.get_version();
        if version != 4 {
            return Err(AppError::parse(format!("Not an IPv4 packet (version {})", version)));
        }

        let ihl = datagram.get_header_length() as usize * 4;
        if ihl < IPV4_HEADER_LEN || bytes.len() < ihl {
            return Err(AppError::parse(format!("Invalid IPv4 header length {}", ihl)));
        }

        let protocol = datagram.get_next_level_protocol();
        if protocol != IpNextHeaderProtocols::Tcp {
            return Err(AppError::parse(format!("Not a TCP segment (protocol {})", protocol.0)));
        }

        // Some kernels hand back datagrams with a zero or host-order length; trust the buffer then
        let declared_len = datagram.get_total_length() as usize;
        let end = if declared_len >= ihl + TCP_HEADER_LEN && declared_len <= bytes.len() {
            declared_len
        } else {
            bytes.len()
        };

        let segment = TcpPacket::new(&bytes[ihl..end]).ok_or_else(|| {
            AppError::parse(format!(
                "Packet too short for a TCP header: {} bytes",
                end - ihl
            ))
        })?;

        let data_offset = segment.get_data_offset() as usize * 4;
        if data_offset < TCP_HEADER_LEN || end - ihl < data_offset {
            return Err(AppError::parse(format!("Invalid TCP data offset {}", data_offset)));
        }

        Ok(Self {
            id: datagram.get_identification(),
            ttl: datagram.get_ttl(),
            source_ip: datagram.get_source(),
            dest_ip: datagram.get_destination(),
            source_port: segment.get_source(),
            dest_port: segment.get_destination(),
            seq: segment.get_sequence(),
            ack_seq: segment.get_acknowledgement(),
            flags: TcpFlags::from_bits(segment.get_flags()),
            window: segment.get_window(),
            checksum: segment.get_checksum(),
            urgent_ptr: segment.get_urgent_ptr(),
            payload: bytes[ihl + data_offset..end].to_vec(),
        })
    }

    /// Whether this segment answers a probe sent from `local` to `remote`
    pub fn answers(&self, local: (Ipv4Addr, u16), remote: (Ipv4Addr, u16)) -> bool {
        self.source_ip == remote.0
            && self.source_port == remote.1
            && self.dest_port == local.1
    }

    /// `buf` is exactly `IPV4_HEADER_LEN` bytes
    fn write_ipv4_header(&self, buf: &mut [u8]) {
        if let Some(mut header) = MutableIpv4Packet::new(buf) {
            header.set_version(4);
            header.set_header_length((IPV4_HEADER_LEN / 4) as u8);
            header.set_total_length(self.total_len() as u16);
            header.set_identification(self.id);
            // flags and fragment offset stay zero
            header.set_ttl(self.ttl);
            header.set_next_level_protocol(IpNextHeaderProtocols::Tcp);
            header.set_source(self.source_ip);
            header.set_destination(self.dest_ip);

            let checksum = internet_checksum(header.packet());
            header.set_checksum(checksum);
        }
    }

    /// `buf` holds the TCP header and payload, zeroed
    fn write_tcp_segment(&self, buf: &mut [u8]) {
        if let Some(mut segment) = MutableTcpPacket::new(buf) {
            segment.set_source(self.source_port);
            segment.set_destination(self.dest_port);
            segment.set_sequence(self.seq);
            segment.set_acknowledgement(self.ack_seq);
            segment.set_data_offset((TCP_HEADER_LEN / 4) as u8);
            segment.set_flags(self.flags.bits());
            segment.set_window(self.window);
            segment.set_urgent_ptr(self.urgent_ptr);
            segment.set_payload(&self.payload);

            let checksum = tcp_checksum(self.source_ip, self.dest_ip, segment.packet());
            segment.set_checksum(checksum);
        }
    }
}

/// Check the IPv4 header checksum and the TCP checksum of encoded bytes
pub fn verify_checksums(bytes: &[u8]) -> bool {
    let Some(datagram) = Ipv4Packet::new(bytes) else {
        return false;
    };
    let ihl = datagram.get_header_length() as usize * 4;
    if ihl < IPV4_HEADER_LEN || bytes.len() < ihl + TCP_HEADER_LEN {
        return false;
    }

    // A valid header sums to 0xffff, so its complement is zero
    if internet_checksum(&bytes[..ihl]) != 0 {
        return false;
    }

    tcp_checksum(datagram.get_source(), datagram.get_destination(), &bytes[ihl..]) == 0
}

/// One's complement of the one's-complement sum of big-endian 16-bit words
pub fn internet_checksum(data: &[u8]) -> u16 {
    fold(sum_words(data, 0))
}

/// TCP checksum over the pseudo-header and `segment`
///
/// `segment` must carry a zero checksum field when computing, or the
/// received checksum when verifying (a valid segment then yields zero).
pub fn tcp_checksum(source: Ipv4Addr, dest: Ipv4Addr, segment: &[u8]) -> u16 {
    let mut pseudo = [0u8; 12];
    pseudo[0..4].copy_from_slice(&source.octets());
    pseudo[4..8].copy_from_slice(&dest.octets());
    pseudo[9] = IPPROTO_TCP;
    pseudo[10..12].copy_from_slice(&(segment.len() as u16).to_be_bytes());

    let sum = sum_words(&pseudo, 0);
    fold(sum_words(segment, sum))
}

fn sum_words(data: &[u8], initial: u32) -> u32 {
    let mut sum = initial;
    let mut chunks = data.chunks_exact(2);
    for chunk in &mut chunks {
        sum = sum.wrapping_add(u16::from_be_bytes([chunk[0], chunk[1]]) as u32);
    }
    if let [last] = chunks.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    sum
}

fn fold(mut sum: u32) -> u16 {
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_syn() -> RawPacket {
        RawPacket::syn(
            (Ipv4Addr::new(192, 168, 1, 10), 40123),
            (Ipv4Addr::new(87, 250, 250, 242), 80),
            0x1234_5678,
            54321,
        )
    }

    #[test]
    fn test_syn_round_trip() {
        let packet = sample_syn();
        let bytes = packet.encode();
        assert_eq!(bytes.len(), 40);

        let decoded = RawPacket::decode(&bytes).unwrap();
        assert_eq!(decoded.source_ip, packet.source_ip);
        assert_eq!(decoded.dest_ip, packet.dest_ip);
        assert_eq!(decoded.source_port, packet.source_port);
        assert_eq!(decoded.dest_port, packet.dest_port);
        assert_eq!(decoded.seq, packet.seq);
        assert_eq!(decoded.ack_seq, packet.ack_seq);
        assert_eq!(decoded.flags, TcpFlags::SYN);
        assert_eq!(decoded.ttl, 255);
        assert_eq!(decoded.id, 54321);
        assert_eq!(decoded.window, DEFAULT_WINDOW);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample_syn().encode();
        assert_eq!(bytes[0], 0x45);
        assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 40);
        assert_eq!(bytes[8], 255);
        assert_eq!(bytes[9], 6);
        // data offset 5, SYN only
        assert_eq!(bytes[32], 0x50);
        assert_eq!(bytes[33], 0x02);
    }

    #[test]
    fn test_checksums_match_pnet() {
        let mut packet = sample_syn();
        packet.payload = b"aaa".to_vec();
        let bytes = packet.encode();
        assert!(verify_checksums(&bytes));

        let ip = Ipv4Packet::new(&bytes).unwrap();
        assert_eq!(ip.get_checksum(), pnet::packet::ipv4::checksum(&ip));

        let tcp = TcpPacket::new(ip.payload()).unwrap();
        let expected = pnet::packet::tcp::ipv4_checksum(&tcp, &packet.source_ip, &packet.dest_ip);
        assert_eq!(tcp.get_checksum(), expected);
    }

    #[test]
    fn test_corrupted_bytes_fail_verification() {
        let mut bytes = sample_syn().encode();
        bytes[30] ^= 0xff;
        assert!(!verify_checksums(&bytes));
    }

    #[test]
    fn test_internet_checksum_odd_length() {
        // 0x0102 + 0x0300 = 0x0402 -> !0x0402
        assert_eq!(internet_checksum(&[0x01, 0x02, 0x03]), !0x0402u16);
        assert_eq!(internet_checksum(&[]), 0xffff);
    }

    #[test]
    fn test_checksum_folds_carries() {
        assert_eq!(internet_checksum(&[0xff, 0xff, 0x00, 0x01]), !0x0001u16);
    }

    #[test]
    fn test_decode_skips_options() {
        let mut bytes = sample_syn().encode();
        // Grow the TCP header to 24 bytes with one NOP-padded option word
        bytes[32] = 6 << 4;
        bytes.splice(40..40, [1u8, 1, 1, 0]);
        let total = bytes.len() as u16;
        bytes[2..4].copy_from_slice(&total.to_be_bytes());

        let decoded = RawPacket::decode(&bytes).unwrap();
        assert_eq!(decoded.source_port, 40123);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(RawPacket::decode(&[0u8; 10]).is_err());

        let mut bytes = sample_syn().encode();
        bytes[0] = 0x65;
        assert!(RawPacket::decode(&bytes).is_err());

        let mut bytes = sample_syn().encode();
        bytes[9] = 17;
        assert!(RawPacket::decode(&bytes).is_err());

        let bytes = sample_syn().encode();
        assert!(RawPacket::decode(&bytes[..30]).is_err());
    }

    #[test]
    fn test_ack_for_syn_ack() {
        let syn = sample_syn();
        let syn_ack = RawPacket {
            flags: TcpFlags::SYN | TcpFlags::ACK,
            source_ip: syn.dest_ip,
            dest_ip: syn.source_ip,
            source_port: syn.dest_port,
            dest_port: syn.source_port,
            seq: 999,
            ack_seq: syn.seq.wrapping_add(1),
            ..Default::default()
        };
        assert!(syn_ack.answers((syn.source_ip, syn.source_port), (syn.dest_ip, syn.dest_port)));

        let ack = syn.ack_for(&syn_ack);
        assert_eq!(ack.flags, TcpFlags::ACK);
        assert_eq!(ack.seq, syn.seq.wrapping_add(1));
        assert_eq!(ack.ack_seq, 1000);
        assert_eq!(ack.dest_port, 80);
    }

    #[test]
    fn test_flags_display() {
        assert_eq!((TcpFlags::SYN | TcpFlags::ACK).to_string(), "ACK|SYN");
        assert_eq!(TcpFlags::empty().to_string(), "-");
        assert!((TcpFlags::RST | TcpFlags::ACK).contains(TcpFlags::RST));
    }

    #[test]
    fn test_encode_in_place_records_checksum() {
        let mut packet = sample_syn();
        let bytes = packet.encode_in_place();
        let decoded = RawPacket::decode(&bytes).unwrap();
        assert_ne!(packet.checksum, 0);
        assert_eq!(decoded.checksum, packet.checksum);
    }
}
