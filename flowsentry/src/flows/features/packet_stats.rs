use crate::packet_record::PacketRecord;

use super::util::{FeatureStats, FlowFeature};

/// Packet lengths per direction.
#[derive(Clone, Debug)]
pub struct PacketLengthStats {
    pub fwd_packet_len: FeatureStats,
    pub bwd_packet_len: FeatureStats,
}

impl PacketLengthStats {
    pub fn new() -> Self {
        PacketLengthStats {
            fwd_packet_len: FeatureStats::new(),
            bwd_packet_len: FeatureStats::new(),
        }
    }

    /// Smallest packet over both directions, 0 for an empty flow.
    pub fn flow_min(&self) -> f64 {
        match (
            self.fwd_packet_len.get_count() > 0,
            self.bwd_packet_len.get_count() > 0,
        ) {
            (true, true) => self
                .fwd_packet_len
                .get_min()
                .min(self.bwd_packet_len.get_min()),
            (true, false) => self.fwd_packet_len.get_min(),
            (false, true) => self.bwd_packet_len.get_min(),
            (false, false) => 0.0,
        }
    }

    /// Largest packet over both directions, 0 for an empty flow.
    pub fn flow_max(&self) -> f64 {
        match (
            self.fwd_packet_len.get_count() > 0,
            self.bwd_packet_len.get_count() > 0,
        ) {
            (true, true) => self
                .fwd_packet_len
                .get_max()
                .max(self.bwd_packet_len.get_max()),
            (true, false) => self.fwd_packet_len.get_max(),
            (false, true) => self.bwd_packet_len.get_max(),
            (false, false) => 0.0,
        }
    }

    pub fn flow_count(&self) -> u32 {
        self.fwd_packet_len.get_count() + self.bwd_packet_len.get_count()
    }
}

impl FlowFeature for PacketLengthStats {
    fn update(&mut self, packet: &PacketRecord, is_forward: bool) {
        if is_forward {
            self.fwd_packet_len.add_value(packet.length as f64);
        } else {
            self.bwd_packet_len.add_value(packet.length as f64);
        }
    }
}
