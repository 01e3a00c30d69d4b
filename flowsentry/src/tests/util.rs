use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};

use crate::packet_record::{timestamp_from_micros, PacketRecord, TcpFlags};

/// 2023-11-14 22:13:20 UTC
pub const BASE_TIMESTAMP_US: i64 = 1_700_000_000_000_000;

pub fn ip(last_octet: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet))
}

/// Capture time `seconds` after the base timestamp.
pub fn ts(seconds: f64) -> DateTime<Utc> {
    timestamp_from_micros(BASE_TIMESTAMP_US + (seconds * 1_000_000.0).round() as i64).unwrap()
}

pub fn flags() -> TcpFlags {
    TcpFlags::default()
}

pub fn syn() -> TcpFlags {
    TcpFlags {
        syn: true,
        ..TcpFlags::default()
    }
}

pub fn ack() -> TcpFlags {
    TcpFlags {
        ack: true,
        ..TcpFlags::default()
    }
}

/// TCP segment with a 20 byte header.
pub fn tcp_packet(
    source: (IpAddr, u16),
    destination: (IpAddr, u16),
    seconds: f64,
    length: u32,
    flags: TcpFlags,
) -> PacketRecord {
    PacketRecord::tcp(ts(seconds), source, destination, length, 20, flags)
}

pub fn client() -> (IpAddr, u16) {
    (ip(1), 1000)
}

pub fn server() -> (IpAddr, u16) {
    (ip(2), 80)
}
