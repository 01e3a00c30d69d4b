#[cfg(test)]
mod tests {
    use crate::{
        capture::{parse_flag, ReplayReader},
        packet_record::TransportProtocol,
        tests::util::{ip, ts, BASE_TIMESTAMP_US},
    };

    fn replay_csv(rows: &[&str]) -> String {
        let mut data = String::from(
            "timestamp,src_ip,src_port,dst_ip,dst_port,protocol,length,tcp_header_length,syn,psh,rst,ack,urg\n",
        );
        for row in rows {
            data.push_str(row);
            data.push('\n');
        }
        data
    }

    fn base_seconds(offset: &str) -> String {
        format!("{}{}", BASE_TIMESTAMP_US / 1_000_000, offset)
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), 1);
        assert_eq!(parse_flag(" 0 "), 0);
        assert_eq!(parse_flag("True"), 0);
        assert_eq!(parse_flag(""), 0);
        assert_eq!(parse_flag("0x02"), 0);
    }

    #[test]
    fn test_read_tcp_rows() {
        let data = replay_csv(&[
            &format!("{},10.0.0.1,1000,10.0.0.2,80,TCP,60,20,1,0,0,0,0", base_seconds(".0")),
            &format!("{},10.0.0.2,80,10.0.0.1,1000,6,1500,32,0,1,0,True,1", base_seconds(".5")),
        ]);
        let mut reader = ReplayReader::new(data.as_bytes(), false);

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.timestamp, ts(0.0));
        assert_eq!(first.source_ip, ip(1));
        assert_eq!(first.destination_port, 80);
        assert_eq!(first.protocol, TransportProtocol::Tcp);
        assert_eq!(first.length, 60);
        assert_eq!(first.tcp_header_length, 20);
        assert!(first.flags.unwrap().syn);

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.timestamp, ts(0.5));
        assert_eq!(second.tcp_header_length, 32);
        let flags = second.flags.unwrap();
        assert!(flags.psh && flags.urg);
        // "True" is not an integer and counts as unset.
        assert!(!flags.ack && !flags.syn && !flags.fin);

        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.rows_read(), 2);
        assert_eq!(reader.rows_filtered(), 0);
    }

    #[test]
    fn test_filtered_and_malformed_rows_are_skipped() {
        let data = replay_csv(&[
            &format!("{},10.0.0.1,5000,10.0.0.2,53,UDP,80,0,,,,,", base_seconds(".0")),
            &format!("{},10.0.0.1,1000,10.0.0.2,80,ICMP,60,0,0,0,0,0,0", base_seconds(".1")),
            &format!("{},not-an-ip,1000,10.0.0.2,80,TCP,60,20,0,0,0,0,0", base_seconds(".2")),
            "yesterday,10.0.0.1,1000,10.0.0.2,80,TCP,60,20,0,0,0,0,0",
            &format!("{},10.0.0.1,1000,10.0.0.2,80,TCP,60,20,0,0,0,1,0", base_seconds(".3")),
        ]);
        let mut reader = ReplayReader::new(data.as_bytes(), false);

        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.timestamp, ts(0.3));
        assert!(record.flags.unwrap().ack);
        assert!(reader.next_record().unwrap().is_none());
        assert_eq!(reader.rows_read(), 5);
        assert_eq!(reader.rows_filtered(), 4);
    }

    #[test]
    fn test_udp_rows_when_enabled() {
        let data = replay_csv(&[&format!(
            "{},10.0.0.1,5000,10.0.0.2,53,17,80,0,,,,,",
            base_seconds(".0")
        )]);
        let mut reader = ReplayReader::new(data.as_bytes(), true);

        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.protocol, TransportProtocol::Udp);
        assert_eq!(record.tcp_header_length, 0);
        assert!(record.flags.is_none());
    }

    #[test]
    fn test_empty_header_length_reads_as_zero() {
        let data = replay_csv(&[&format!(
            "{},10.0.0.1,1000,10.0.0.2,80,TCP,60,,1,0,0,0,0",
            base_seconds(".0")
        )]);
        let mut reader = ReplayReader::new(data.as_bytes(), false);

        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.tcp_header_length, 0);
        assert!(record.flags.unwrap().syn);
        assert_eq!(reader.rows_filtered(), 0);
    }

    #[test]
    fn test_missing_header_length_column_reads_as_zero() {
        let data = format!(
            "timestamp,src_ip,src_port,dst_ip,dst_port,protocol,length,syn\n{},10.0.0.1,1000,10.0.0.2,80,TCP,60,1\n",
            base_seconds(".0")
        );
        let mut reader = ReplayReader::new(data.as_bytes(), false);

        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.tcp_header_length, 0);
        assert!(record.flags.unwrap().syn);
    }
}
