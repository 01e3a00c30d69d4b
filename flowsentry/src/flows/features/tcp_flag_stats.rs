use crate::packet_record::PacketRecord;

use super::util::FlowFeature;

/// TCP flag tallies.
///
/// SYN, PSH, RST, ACK and FIN are counted over both directions, URG is kept
/// per direction.
#[derive(Clone, Debug, Default)]
pub struct TcpFlagStats {
    pub fin_flag_count: u32,
    pub syn_flag_count: u32,
    pub rst_flag_count: u32,
    pub psh_flag_count: u32,
    pub ack_flag_count: u32,
    pub fwd_urg_flag_count: u32,
    pub bwd_urg_flag_count: u32,
}

impl TcpFlagStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn urg_flag_count(&self) -> u32 {
        self.fwd_urg_flag_count + self.bwd_urg_flag_count
    }
}

impl FlowFeature for TcpFlagStats {
    fn update(&mut self, packet: &PacketRecord, is_forward: bool) {
        let Some(flags) = packet.flags else {
            return;
        };

        self.fin_flag_count += u32::from(flags.fin);
        self.syn_flag_count += u32::from(flags.syn);
        self.rst_flag_count += u32::from(flags.rst);
        self.psh_flag_count += u32::from(flags.psh);
        self.ack_flag_count += u32::from(flags.ack);
        if is_forward {
            self.fwd_urg_flag_count += u32::from(flags.urg);
        } else {
            self.bwd_urg_flag_count += u32::from(flags.urg);
        }
    }
}
