use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use strum_macros::{Display, EnumString, FromRepr};

/// Transport protocols admitted into the flow engine.
///
/// The display name is what ends up in the `Protocol` column of the export,
/// the downstream preprocessor maps `TCP`/`UDP` back to 6/17.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, FromRepr)]
#[strum(ascii_case_insensitive)]
#[repr(u8)]
pub enum TransportProtocol {
    #[strum(serialize = "TCP")]
    Tcp = 6,
    #[strum(serialize = "UDP")]
    Udp = 17,
}

impl TransportProtocol {
    /// IANA protocol number.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// Parses either a protocol name (`TCP`) or its number (`6`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        value
            .parse::<TransportProtocol>()
            .ok()
            .or_else(|| value.parse::<u8>().ok().and_then(TransportProtocol::from_repr))
    }
}

impl Serialize for TransportProtocol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// TCP control bits carried by a segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub fin: bool,
    pub syn: bool,
    pub rst: bool,
    pub psh: bool,
    pub ack: bool,
    pub urg: bool,
}

impl TcpFlags {
    const FIN: u16 = 0x01;
    const SYN: u16 = 0x02;
    const RST: u16 = 0x04;
    const PSH: u16 = 0x08;
    const ACK: u16 = 0x10;
    const URG: u16 = 0x20;

    /// Builds the flag set from the raw flags field of a TCP header.
    pub fn from_bits(bits: u16) -> Self {
        TcpFlags {
            fin: bits & Self::FIN != 0,
            syn: bits & Self::SYN != 0,
            rst: bits & Self::RST != 0,
            psh: bits & Self::PSH != 0,
            ack: bits & Self::ACK != 0,
            urg: bits & Self::URG != 0,
        }
    }
}

/// A decoded packet as handed to the flow engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketRecord {
    pub timestamp: DateTime<Utc>,
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub destination_ip: IpAddr,
    pub destination_port: u16,
    pub protocol: TransportProtocol,
    /// Length of the whole captured frame on the wire.
    pub length: u32,
    /// 0 for anything that is not TCP.
    pub tcp_header_length: u32,
    /// `None` when the packet has no TCP header.
    pub flags: Option<TcpFlags>,
}

impl PacketRecord {
    /// Creates a TCP packet record.
    pub fn tcp(
        timestamp: DateTime<Utc>,
        source: (IpAddr, u16),
        destination: (IpAddr, u16),
        length: u32,
        tcp_header_length: u32,
        flags: TcpFlags,
    ) -> Self {
        PacketRecord {
            timestamp,
            source_ip: source.0,
            source_port: source.1,
            destination_ip: destination.0,
            destination_port: destination.1,
            protocol: TransportProtocol::Tcp,
            length,
            tcp_header_length,
            flags: Some(flags),
        }
    }

    /// Creates a UDP packet record, which never carries a TCP header.
    pub fn udp(
        timestamp: DateTime<Utc>,
        source: (IpAddr, u16),
        destination: (IpAddr, u16),
        length: u32,
    ) -> Self {
        PacketRecord {
            timestamp,
            source_ip: source.0,
            source_port: source.1,
            destination_ip: destination.0,
            destination_port: destination.1,
            protocol: TransportProtocol::Udp,
            length,
            tcp_header_length: 0,
            flags: None,
        }
    }
}

/// Converts a microsecond UNIX timestamp into a UTC date.
pub fn timestamp_from_micros(timestamp_us: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(
        timestamp_us.div_euclid(1_000_000),
        (timestamp_us.rem_euclid(1_000_000) * 1_000) as u32,
    )
}
