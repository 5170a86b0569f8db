//! ICMPv4 echo encoding and decoding.
//!
//! Wire layout handled here (offsets in bytes):
//!
//! ```text
//! IPv4 header (raw socket input only)
//!   0      version (high nibble) | IHL (low nibble, in 32-bit words)
//!   12..16 source address
//!   IHL*4  start of the ICMP message
//! ICMP echo
//!   0      type (8 = echo request, 0 = echo reply)
//!   1      code (0)
//!   2..4   checksum, big endian
//!   4..6   identifier, big endian
//!   6..8   sequence number, big endian
//!   8..    payload
//! ```
//!
//! Field access goes through the `pnet_packet` views; the IHL rule is
//! [`ip_header_len`].

use crate::checksum::internet_checksum;
use crate::icmp::v4::SequenceNumber;
use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet_packet::icmp::{IcmpCode, IcmpTypes};
use pnet_packet::ipv4::Ipv4Packet;
use pnet_packet::Packet;
use std::net::Ipv4Addr;

/// Payload bytes following the 8-byte echo header.
pub const PAYLOAD_SIZE: usize = 56;

/// Total size of every echo request sent.
pub const PACKET_SIZE: usize = ECHO_HEADER_SIZE + PAYLOAD_SIZE;

const ECHO_HEADER_SIZE: usize = 8;

const IHL_MASK: u8 = 0x0F;
const IHL_WORD_SIZE: usize = 4;
// IHL below 5 words is not a valid IPv4 header.
const MIN_IP_HEADER_LEN: usize = 20;

/// A decoded echo reply addressed to this session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reply {
    pub source: Ipv4Addr,
    pub identifier: u16,
    pub sequence_number: SequenceNumber,
}

/// IPv4 header length in bytes, from the IHL nibble of the first byte.
pub fn ip_header_len(first_byte: u8) -> usize {
    usize::from(first_byte & IHL_MASK) * IHL_WORD_SIZE
}

/// Encodes an echo request of [`PACKET_SIZE`] bytes with a valid checksum.
pub fn build_echo_request(
    sequence_number: SequenceNumber,
    identifier: u16,
    payload: &[u8; PAYLOAD_SIZE],
) -> Vec<u8> {
    debug_assert_eq!(EchoRequestPacket::minimum_packet_size(), ECHO_HEADER_SIZE);
    let mut buf = vec![0u8; PACKET_SIZE];
    // `new` only rejects buffers shorter than the echo header.
    if let Some(mut packet) = MutableEchoRequestPacket::new(&mut buf) {
        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence_number.into());
        packet.set_payload(payload);
        packet.set_checksum(0);
        let checksum = internet_checksum(packet.packet());
        packet.set_checksum(checksum);
    }
    buf
}

/// Decodes a raw IPv4 datagram as an echo reply carrying `expected_identifier`.
///
/// Returns `None` for anything else: truncated datagrams, other ICMP types
/// (errors, echo requests looped back) and replies to other processes.
pub fn parse_reply(datagram: &[u8], expected_identifier: u16) -> Option<Reply> {
    let header_len = ip_header_len(*datagram.first()?);
    if header_len < MIN_IP_HEADER_LEN || datagram.len() < header_len {
        return None;
    }
    let ipv4_packet = Ipv4Packet::new(datagram)?;
    let echo_reply = EchoReplyPacket::new(&datagram[header_len..])?;

    let identifier = echo_reply.get_identifier();
    if echo_reply.get_icmp_type() != IcmpTypes::EchoReply || identifier != expected_identifier {
        return None;
    }
    Some(Reply {
        source: ipv4_packet.get_source(),
        identifier,
        sequence_number: echo_reply.get_sequence_number().into(),
    })
}
