use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::{
    flows::{features::util::safe_per_second_rate, flow_state::FlowState},
    packet_record::TransportProtocol,
};

/// Rendering of the `Timestamp` column.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Export column names, in output order.
pub const COLUMNS: [&str; 26] = [
    "Source IP",
    "Source Port",
    "Destination IP",
    "Destination Port",
    "Protocol",
    "Timestamp",
    "Flow Duration",
    "Total Fwd Packets",
    "Total Bwd Packets",
    "Total Length of Fwd Packets",
    "Total Length of Bwd Packets",
    "Fwd Packet Length Mean",
    "Bwd Packet Length Mean",
    "Flow Packets/s",
    "Fwd IAT Max",
    "Bwd IAT Mean",
    "Fwd Header Length",
    "Bwd Header Length",
    "Min Packet Length",
    "Max Packet Length",
    "FIN Flag Count",
    "SYN Flag Count",
    "RST Flag Count",
    "PSH Flag Count",
    "ACK Flag Count",
    "URG Flag Count",
];

/// Which counter is reported in the `FIN Flag Count` column.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinColumn {
    /// Repeat the RST count, as the feature files the classifier was trained on do.
    #[default]
    Rst,

    /// Report the number of segments that carried FIN.
    Fin,
}

/// Features of one flow at the time of its latest packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSnapshot {
    #[serde(rename = "Source IP")]
    pub src_ip: IpAddr,
    #[serde(rename = "Source Port")]
    pub src_port: u16,
    #[serde(rename = "Destination IP")]
    pub dst_ip: IpAddr,
    #[serde(rename = "Destination Port")]
    pub dst_port: u16,
    #[serde(rename = "Protocol")]
    pub protocol: TransportProtocol,
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Flow Duration")]
    pub flow_duration: f64,
    #[serde(rename = "Total Fwd Packets")]
    pub tot_fwd_pkts: u32,
    #[serde(rename = "Total Bwd Packets")]
    pub tot_bwd_pkts: u32,
    #[serde(rename = "Total Length of Fwd Packets")]
    pub totlen_fwd_pkts: u64,
    #[serde(rename = "Total Length of Bwd Packets")]
    pub totlen_bwd_pkts: u64,
    #[serde(rename = "Fwd Packet Length Mean")]
    pub fwd_pkt_len_mean: f64,
    #[serde(rename = "Bwd Packet Length Mean")]
    pub bwd_pkt_len_mean: f64,
    #[serde(rename = "Flow Packets/s")]
    pub flow_pkts_s: f64,
    #[serde(rename = "Fwd IAT Max")]
    pub fwd_iat_max: f64,
    #[serde(rename = "Bwd IAT Mean")]
    pub bwd_iat_mean: f64,
    #[serde(rename = "Fwd Header Length")]
    pub fwd_header_len: u64,
    #[serde(rename = "Bwd Header Length")]
    pub bwd_header_len: u64,
    #[serde(rename = "Min Packet Length")]
    pub pkt_len_min: u32,
    #[serde(rename = "Max Packet Length")]
    pub pkt_len_max: u32,
    #[serde(rename = "FIN Flag Count")]
    pub fin_flag_cnt: u32,
    #[serde(rename = "SYN Flag Count")]
    pub syn_flag_cnt: u32,
    #[serde(rename = "RST Flag Count")]
    pub rst_flag_cnt: u32,
    #[serde(rename = "PSH Flag Count")]
    pub psh_flag_cnt: u32,
    #[serde(rename = "ACK Flag Count")]
    pub ack_flag_cnt: u32,
    #[serde(rename = "URG Flag Count")]
    pub urg_flag_cnt: u32,
}

/// Computes the snapshot of a flow with the default column layout.
pub fn snapshot(flow: &FlowState) -> FeatureSnapshot {
    snapshot_with(flow, FinColumn::default())
}

/// Computes the snapshot of a flow from its running aggregates.
///
/// Durations and inter-arrival times are kept in microseconds and reported
/// in seconds.
pub fn snapshot_with(flow: &FlowState, fin_column: FinColumn) -> FeatureSnapshot {
    let duration_us = flow.duration_us();
    let lengths = &flow.packet_len_stats;
    let iats = &flow.iat_stats;
    let flags = &flow.tcp_flag_stats;

    let flow_pkts_s = if duration_us > 0 {
        safe_per_second_rate(lengths.flow_count() as f64, duration_us as f64)
    } else {
        0.0
    };

    FeatureSnapshot {
        src_ip: flow.flow_key.source_ip,
        src_port: flow.flow_key.source_port,
        dst_ip: flow.flow_key.destination_ip,
        dst_port: flow.flow_key.destination_port,
        protocol: flow.flow_key.protocol,
        timestamp: flow.start_time.format(TIMESTAMP_FORMAT).to_string(),
        flow_duration: micros_to_secs(duration_us as f64),
        tot_fwd_pkts: flow.fwd_packet_count(),
        tot_bwd_pkts: flow.bwd_packet_count(),
        totlen_fwd_pkts: flow.fwd_total_length(),
        totlen_bwd_pkts: flow.bwd_total_length(),
        fwd_pkt_len_mean: lengths.fwd_packet_len.get_mean(),
        bwd_pkt_len_mean: lengths.bwd_packet_len.get_mean(),
        flow_pkts_s,
        fwd_iat_max: micros_to_secs(iats.fwd_iat.get_max()),
        bwd_iat_mean: micros_to_secs(iats.bwd_iat.get_mean()),
        fwd_header_len: flow.header_len_stats.fwd_header_len,
        bwd_header_len: flow.header_len_stats.bwd_header_len,
        pkt_len_min: lengths.flow_min() as u32,
        pkt_len_max: lengths.flow_max() as u32,
        fin_flag_cnt: match fin_column {
            FinColumn::Rst => flags.rst_flag_count,
            FinColumn::Fin => flags.fin_flag_count,
        },
        syn_flag_cnt: flags.syn_flag_count,
        rst_flag_cnt: flags.rst_flag_count,
        psh_flag_cnt: flags.psh_flag_count,
        ack_flag_cnt: flags.ack_flag_count,
        urg_flag_cnt: flags.urg_flag_count(),
    }
}

fn micros_to_secs(value_us: f64) -> f64 {
    value_us / 1_000_000.0
}
