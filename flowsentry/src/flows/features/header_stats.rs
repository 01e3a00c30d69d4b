use crate::packet_record::PacketRecord;

use super::util::FlowFeature;

/// Accumulated TCP header bytes per direction.
#[derive(Clone, Debug, Default)]
pub struct HeaderLengthStats {
    pub fwd_header_len: u64,
    pub bwd_header_len: u64,
}

impl HeaderLengthStats {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlowFeature for HeaderLengthStats {
    fn update(&mut self, packet: &PacketRecord, is_forward: bool) {
        if is_forward {
            self.fwd_header_len += u64::from(packet.tcp_header_length);
        } else {
            self.bwd_header_len += u64::from(packet.tcp_header_length);
        }
    }
}
