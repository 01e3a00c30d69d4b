use std::net::IpAddr;

use chrono::{DateTime, Utc};
use log::debug;
use pnet::packet::{
    ethernet::{EtherTypes, EthernetPacket},
    ip::IpNextHeaderProtocols,
    ipv4::Ipv4Packet,
    ipv6::Ipv6Packet,
    tcp::TcpPacket,
    udp::UdpPacket,
    Packet,
};

use crate::packet_record::{PacketRecord, TcpFlags};

// Define constants for Linux cooked capture EtherTypes
const SLL_IPV4: u16 = 0x0800;
const SLL_IPV6: u16 = 0x86DD;
// Define constant for 802.1Q VLAN EtherType
const ETHERTYPE_VLAN: u16 = 0x8100;

const SLL_HEADER_LEN: usize = 16;
const VLAN_HEADER_LEN: usize = 4;

/// Link-layer framing of captured packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkLayer {
    Ethernet,
    /// Linux cooked capture (`any` interface).
    LinuxCooked,
    /// Bare IPv4/IPv6 without a link header.
    RawIp,
}

impl LinkLayer {
    /// Maps a libpcap DLT value onto a supported framing.
    pub fn from_dlt(dlt: i32) -> Option<Self> {
        match dlt {
            1 => Some(LinkLayer::Ethernet),
            113 => Some(LinkLayer::LinuxCooked),
            12 | 14 | 101 | 228 | 229 => Some(LinkLayer::RawIp),
            _ => None,
        }
    }
}

/// Turns captured frames into packet records.
///
/// Only packets with an IP layer and a TCP layer (or UDP when enabled) are
/// kept, everything else decodes to `None`.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    link_layer: LinkLayer,
    include_udp: bool,
}

impl Decoder {
    pub fn new(link_layer: LinkLayer, include_udp: bool) -> Self {
        Decoder {
            link_layer,
            include_udp,
        }
    }

    /// Decodes one frame. `wire_length` is the original length of the frame.
    pub fn decode(
        &self,
        data: &[u8],
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        match self.link_layer {
            LinkLayer::Ethernet => self.decode_ethernet(data, timestamp, wire_length),
            LinkLayer::LinuxCooked => self.decode_linux_cooked(data, timestamp, wire_length),
            LinkLayer::RawIp => match data.first().map(|byte| byte >> 4) {
                Some(4) => self.decode_ip(SLL_IPV4, data, timestamp, wire_length),
                Some(6) => self.decode_ip(SLL_IPV6, data, timestamp, wire_length),
                _ => None,
            },
        }
    }

    fn decode_ethernet(
        &self,
        data: &[u8],
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        let ethernet = EthernetPacket::new(data)?;
        match ethernet.get_ethertype() {
            EtherTypes::Ipv4 => self.decode_ip(SLL_IPV4, ethernet.payload(), timestamp, wire_length),
            EtherTypes::Ipv6 => self.decode_ip(SLL_IPV6, ethernet.payload(), timestamp, wire_length),
            EtherTypes::Vlan => self.decode_vlan(ethernet.payload(), timestamp, wire_length),
            other => {
                debug!("Skipping non-IP frame with EtherType 0x{:04x}", other.0);
                None
            }
        }
    }

    fn decode_linux_cooked(
        &self,
        data: &[u8],
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        if data.len() < SLL_HEADER_LEN {
            debug!("Linux cooked capture frame too short");
            return None;
        }
        let ethertype = u16::from_be_bytes([data[14], data[15]]);
        let payload = &data[SLL_HEADER_LEN..];
        if ethertype == ETHERTYPE_VLAN {
            self.decode_vlan(payload, timestamp, wire_length)
        } else {
            self.decode_ip(ethertype, payload, timestamp, wire_length)
        }
    }

    // VLAN header is 4 bytes: 2 bytes for VLAN tag and 2 bytes for inner EtherType
    fn decode_vlan(
        &self,
        data: &[u8],
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        if data.len() < VLAN_HEADER_LEN {
            debug!("VLAN packet too short to contain inner EtherType");
            return None;
        }
        let inner_ethertype = u16::from_be_bytes([data[2], data[3]]);
        self.decode_ip(
            inner_ethertype,
            &data[VLAN_HEADER_LEN..],
            timestamp,
            wire_length,
        )
    }

    fn decode_ip(
        &self,
        ethertype: u16,
        data: &[u8],
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        match ethertype {
            SLL_IPV4 => {
                let ipv4 = Ipv4Packet::new(data)?;
                // Only the first fragment carries the transport header.
                if ipv4.get_fragment_offset() != 0 {
                    debug!(
                        "Skipping IPv4 fragment at offset {}",
                        ipv4.get_fragment_offset()
                    );
                    return None;
                }
                let source = ipv4.get_source().into();
                let destination = ipv4.get_destination().into();
                let protocol = ipv4.get_next_level_protocol();
                if protocol == IpNextHeaderProtocols::Tcp {
                    self.decode_tcp(ipv4.payload(), source, destination, timestamp, wire_length)
                } else if protocol == IpNextHeaderProtocols::Udp {
                    self.decode_udp(ipv4.payload(), source, destination, timestamp, wire_length)
                } else {
                    None
                }
            }
            SLL_IPV6 => {
                let ipv6 = Ipv6Packet::new(data)?;
                let source = ipv6.get_source().into();
                let destination = ipv6.get_destination().into();
                let protocol = ipv6.get_next_header();
                if protocol == IpNextHeaderProtocols::Tcp {
                    self.decode_tcp(ipv6.payload(), source, destination, timestamp, wire_length)
                } else if protocol == IpNextHeaderProtocols::Udp {
                    self.decode_udp(ipv6.payload(), source, destination, timestamp, wire_length)
                } else {
                    None
                }
            }
            _ => {
                debug!("Unsupported EtherType: 0x{:04x}", ethertype);
                None
            }
        }
    }

    fn decode_tcp(
        &self,
        data: &[u8],
        source: IpAddr,
        destination: IpAddr,
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        let tcp = TcpPacket::new(data)?;
        Some(PacketRecord::tcp(
            timestamp,
            (source, tcp.get_source()),
            (destination, tcp.get_destination()),
            wire_length,
            u32::from(tcp.get_data_offset()) * 4,
            TcpFlags::from_bits(tcp.get_flags() as u16),
        ))
    }

    fn decode_udp(
        &self,
        data: &[u8],
        source: IpAddr,
        destination: IpAddr,
        timestamp: DateTime<Utc>,
        wire_length: u32,
    ) -> Option<PacketRecord> {
        if !self.include_udp {
            return None;
        }
        let udp = UdpPacket::new(data)?;
        Some(PacketRecord::udp(
            timestamp,
            (source, udp.get_source()),
            (destination, udp.get_destination()),
            wire_length,
        ))
    }
}
