use crate::packet_record::PacketRecord;

use super::util::{FeatureStats, FlowFeature};

/// Inter-arrival times per direction, in microseconds.
#[derive(Clone, Debug)]
pub struct IATStats {
    pub fwd_iat: FeatureStats,
    pub bwd_iat: FeatureStats,
    last_timestamp_fwd_us: Option<i64>,
    last_timestamp_bwd_us: Option<i64>,
}

impl IATStats {
    pub fn new() -> Self {
        IATStats {
            fwd_iat: FeatureStats::new(),
            bwd_iat: FeatureStats::new(),
            last_timestamp_fwd_us: None,
            last_timestamp_bwd_us: None,
        }
    }
}

impl FlowFeature for IATStats {
    fn update(&mut self, packet: &PacketRecord, is_forward: bool) {
        let current_ts_us = packet.timestamp.timestamp_micros();
        let (last_timestamp_us, iat) = if is_forward {
            (&mut self.last_timestamp_fwd_us, &mut self.fwd_iat)
        } else {
            (&mut self.last_timestamp_bwd_us, &mut self.bwd_iat)
        };

        if let Some(last_us) = *last_timestamp_us {
            iat.add_value((current_ts_us - last_us) as f64);
        }
        *last_timestamp_us = Some(current_ts_us);
    }
}
