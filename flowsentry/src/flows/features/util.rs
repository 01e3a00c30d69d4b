use crate::packet_record::PacketRecord;

/// A group of flow statistics that is fed every packet of its flow.
pub trait FlowFeature {
    /// Updates the feature with a new packet
    fn update(&mut self, packet: &PacketRecord, is_forward: bool);
}

/// Running aggregate over a stream of values.
///
/// Keeps the exact total rather than a running mean so that a mean read at
/// any point equals `sum / count` over the values seen so far.
#[derive(Clone, Debug)]
pub struct FeatureStats {
    total: f64,
    min: f64,
    max: f64,
    count: u32,
}

impl FeatureStats {
    pub fn new() -> Self {
        Self {
            total: 0.0,
            min: f64::MAX,
            max: f64::MIN,
            count: 0,
        }
    }

    pub fn get_total(&self) -> f64 {
        self.total
    }

    pub fn get_min(&self) -> f64 {
        if self.count > 0 {
            self.min
        } else {
            0.0
        }
    }

    pub fn get_max(&self) -> f64 {
        if self.count > 0 {
            self.max
        } else {
            0.0
        }
    }

    pub fn get_mean(&self) -> f64 {
        safe_div(self.total, self.count as f64)
    }

    pub fn get_count(&self) -> u32 {
        self.count
    }

    pub fn add_value(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }
}

impl Default for FeatureStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Safely performs floating point division, returning 0.0 if denominator is 0
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Safely calculates per-second rate, handling zero duration
pub fn safe_per_second_rate(value: f64, duration_usec: f64) -> f64 {
    safe_div(value, duration_usec / 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_report_zero() {
        let stats = FeatureStats::new();
        assert_eq!(stats.get_count(), 0);
        assert_eq!(stats.get_min(), 0.0);
        assert_eq!(stats.get_max(), 0.0);
        assert_eq!(stats.get_mean(), 0.0);
    }

    #[test]
    fn test_add_value() {
        let mut stats = FeatureStats::new();
        stats.add_value(60.0);
        stats.add_value(1500.0);
        stats.add_value(40.0);

        assert_eq!(stats.get_count(), 3);
        assert_eq!(stats.get_total(), 1600.0);
        assert_eq!(stats.get_min(), 40.0);
        assert_eq!(stats.get_max(), 1500.0);
        assert_eq!(stats.get_mean(), 1600.0 / 3.0);
    }

    #[test]
    fn test_safe_rates() {
        assert_eq!(safe_div(4.0, 0.0), 0.0);
        assert_eq!(safe_per_second_rate(4.0, 2_000_000.0), 2.0);
        assert_eq!(safe_per_second_rate(4.0, 0.0), 0.0);
    }
}
