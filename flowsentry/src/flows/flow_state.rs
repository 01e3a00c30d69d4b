use chrono::{DateTime, Utc};

use crate::{flow_key::FlowKey, packet_record::PacketRecord};

use super::features::{
    header_stats::HeaderLengthStats, iat_stats::IATStats, packet_stats::PacketLengthStats,
    tcp_flag_stats::TcpFlagStats, util::FlowFeature,
};

/// Mutable state of one bidirectional flow.
///
/// The per-packet length and timestamp sequences are kept in arrival order
/// next to the running aggregates, so every count always equals the length
/// of the matching sequence.
#[derive(Clone, Debug)]
pub struct FlowState {
    /// The key the flow was created under, its source is the forward side.
    pub flow_key: FlowKey,
    /// Timestamp of the packet that created the flow.
    pub start_time: DateTime<Utc>,
    /// Timestamp of the latest packet, never earlier than `start_time`.
    pub end_time: DateTime<Utc>,
    pub fwd_lengths: Vec<u32>,
    pub bwd_lengths: Vec<u32>,
    pub fwd_timestamps: Vec<DateTime<Utc>>,
    pub bwd_timestamps: Vec<DateTime<Utc>>,
    pub packet_len_stats: PacketLengthStats,
    pub iat_stats: IATStats,
    pub header_len_stats: HeaderLengthStats,
    pub tcp_flag_stats: TcpFlagStats,
}

impl FlowState {
    pub fn new(flow_key: FlowKey, timestamp: DateTime<Utc>) -> Self {
        FlowState {
            flow_key,
            start_time: timestamp,
            end_time: timestamp,
            fwd_lengths: Vec::new(),
            bwd_lengths: Vec::new(),
            fwd_timestamps: Vec::new(),
            bwd_timestamps: Vec::new(),
            packet_len_stats: PacketLengthStats::new(),
            iat_stats: IATStats::new(),
            header_len_stats: HeaderLengthStats::new(),
            tcp_flag_stats: TcpFlagStats::new(),
        }
    }

    /// Folds a packet into the flow.
    pub fn update(&mut self, packet: &PacketRecord, is_forward: bool) {
        // A late packet from a skewed capture clock must not shrink the flow.
        if packet.timestamp > self.end_time {
            self.end_time = packet.timestamp;
        }

        if is_forward {
            self.fwd_lengths.push(packet.length);
            self.fwd_timestamps.push(packet.timestamp);
        } else {
            self.bwd_lengths.push(packet.length);
            self.bwd_timestamps.push(packet.timestamp);
        }

        self.packet_len_stats.update(packet, is_forward);
        self.iat_stats.update(packet, is_forward);
        self.header_len_stats.update(packet, is_forward);
        self.tcp_flag_stats.update(packet, is_forward);
    }

    pub fn fwd_packet_count(&self) -> u32 {
        self.packet_len_stats.fwd_packet_len.get_count()
    }

    pub fn bwd_packet_count(&self) -> u32 {
        self.packet_len_stats.bwd_packet_len.get_count()
    }

    pub fn fwd_total_length(&self) -> u64 {
        self.packet_len_stats.fwd_packet_len.get_total() as u64
    }

    pub fn bwd_total_length(&self) -> u64 {
        self.packet_len_stats.bwd_packet_len.get_total() as u64
    }

    /// Flow duration in microseconds.
    pub fn duration_us(&self) -> i64 {
        (self.end_time - self.start_time)
            .num_microseconds()
            .unwrap_or(i64::MAX)
    }
}
