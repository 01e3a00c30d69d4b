pub mod header_stats;
pub mod iat_stats;
pub mod packet_stats;
pub mod tcp_flag_stats;
pub mod util;
