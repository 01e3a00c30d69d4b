#[cfg(test)]
mod tests {
    use crate::{
        flow_key::FlowKey,
        flows::flow_state::FlowState,
        packet_record::{PacketRecord, TcpFlags},
        tests::util::{ack, client, flags, server, syn, tcp_packet, ts},
    };

    fn setup_flow(packet: &PacketRecord) -> FlowState {
        FlowState::new(FlowKey::forward(packet), packet.timestamp)
    }

    fn assert_sequences_consistent(flow: &FlowState) {
        assert_eq!(flow.fwd_packet_count() as usize, flow.fwd_lengths.len());
        assert_eq!(flow.fwd_packet_count() as usize, flow.fwd_timestamps.len());
        assert_eq!(flow.bwd_packet_count() as usize, flow.bwd_lengths.len());
        assert_eq!(flow.bwd_packet_count() as usize, flow.bwd_timestamps.len());
    }

    #[test]
    fn test_flow_creation() {
        let packet = tcp_packet(client(), server(), 0.0, 60, syn());
        let flow = setup_flow(&packet);

        assert_eq!(flow.start_time, ts(0.0));
        assert_eq!(flow.end_time, ts(0.0));
        assert_eq!(flow.flow_key.source_ip, client().0);
        assert_eq!(flow.flow_key.destination_ip, server().0);
        assert_eq!(flow.flow_key.source_port, 1000);
        assert_eq!(flow.flow_key.destination_port, 80);
        assert_eq!(flow.fwd_packet_count(), 0);
        assert_eq!(flow.bwd_packet_count(), 0);
        assert_eq!(flow.duration_us(), 0);
        assert_sequences_consistent(&flow);
    }

    #[test]
    fn test_update_forward_and_backward() {
        let first = tcp_packet(client(), server(), 0.0, 60, syn());
        let mut flow = setup_flow(&first);

        flow.update(&first, true);
        flow.update(&tcp_packet(server(), client(), 0.25, 1500, ack()), false);
        flow.update(&tcp_packet(client(), server(), 1.0, 40, ack()), true);

        assert_eq!(flow.fwd_packet_count(), 2);
        assert_eq!(flow.bwd_packet_count(), 1);
        assert_eq!(flow.fwd_total_length(), 100);
        assert_eq!(flow.bwd_total_length(), 1500);
        assert_eq!(flow.fwd_lengths, vec![60, 40]);
        assert_eq!(flow.bwd_lengths, vec![1500]);
        assert_eq!(flow.fwd_timestamps, vec![ts(0.0), ts(1.0)]);
        assert_eq!(flow.bwd_timestamps, vec![ts(0.25)]);
        assert_eq!(flow.end_time, ts(1.0));
        assert_eq!(flow.duration_us(), 1_000_000);
        assert_eq!(flow.header_len_stats.fwd_header_len, 40);
        assert_eq!(flow.header_len_stats.bwd_header_len, 20);
        assert_sequences_consistent(&flow);
    }

    #[test]
    fn test_flag_counts() {
        let first = tcp_packet(client(), server(), 0.0, 60, syn());
        let mut flow = setup_flow(&first);
        let all = TcpFlags {
            fin: true,
            syn: true,
            rst: true,
            psh: true,
            ack: true,
            urg: true,
        };

        flow.update(&first, true);
        flow.update(&tcp_packet(server(), client(), 0.1, 60, all), false);
        flow.update(&tcp_packet(client(), server(), 0.2, 60, all), true);
        flow.update(&tcp_packet(client(), server(), 0.3, 60, flags()), true);

        let stats = &flow.tcp_flag_stats;
        assert_eq!(stats.syn_flag_count, 3);
        assert_eq!(stats.fin_flag_count, 2);
        assert_eq!(stats.rst_flag_count, 2);
        assert_eq!(stats.psh_flag_count, 2);
        assert_eq!(stats.ack_flag_count, 2);
        assert_eq!(stats.fwd_urg_flag_count, 1);
        assert_eq!(stats.bwd_urg_flag_count, 1);
        assert_eq!(stats.urg_flag_count(), 2);
    }

    #[test]
    fn test_udp_packets_carry_no_header_or_flags() {
        let first = PacketRecord::udp(ts(0.0), client(), server(), 120);
        let mut flow = setup_flow(&first);

        flow.update(&first, true);
        flow.update(&PacketRecord::udp(ts(0.5), server(), client(), 80), false);

        assert_eq!(flow.fwd_packet_count(), 1);
        assert_eq!(flow.bwd_packet_count(), 1);
        assert_eq!(flow.header_len_stats.fwd_header_len, 0);
        assert_eq!(flow.header_len_stats.bwd_header_len, 0);
        assert_eq!(flow.tcp_flag_stats.syn_flag_count, 0);
        assert_eq!(flow.tcp_flag_stats.urg_flag_count(), 0);
    }

    #[test]
    fn test_end_time_never_moves_backwards() {
        let first = tcp_packet(client(), server(), 1.0, 60, syn());
        let mut flow = setup_flow(&first);

        flow.update(&first, true);
        flow.update(&tcp_packet(client(), server(), 3.0, 60, ack()), true);
        assert_eq!(flow.end_time, ts(3.0));

        flow.update(&tcp_packet(server(), client(), 2.0, 60, ack()), false);
        assert_eq!(flow.end_time, ts(3.0));
        assert!(flow.end_time >= flow.start_time);
        assert_eq!(flow.duration_us(), 2_000_000);
        assert_sequences_consistent(&flow);
    }
}
