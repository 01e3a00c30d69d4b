use std::{fmt, net::IpAddr};

use crate::packet_record::{PacketRecord, TransportProtocol};

/// Identity of a flow: the endpoint pair in the direction that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub source_ip: IpAddr,
    pub source_port: u16,
    pub destination_ip: IpAddr,
    pub destination_port: u16,
    pub protocol: TransportProtocol,
}

impl FlowKey {
    /// Key with the packet's source as the flow source.
    pub fn forward(packet: &PacketRecord) -> Self {
        FlowKey {
            source_ip: packet.source_ip,
            source_port: packet.source_port,
            destination_ip: packet.destination_ip,
            destination_port: packet.destination_port,
            protocol: packet.protocol,
        }
    }

    /// Key with the packet's destination as the flow source.
    pub fn backward(packet: &PacketRecord) -> Self {
        FlowKey::forward(packet).reversed()
    }

    pub fn reversed(&self) -> Self {
        FlowKey {
            source_ip: self.destination_ip,
            source_port: self.destination_port,
            destination_ip: self.source_ip,
            destination_port: self.source_port,
            protocol: self.protocol,
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}-{}",
            self.source_ip,
            self.source_port,
            self.destination_ip,
            self.destination_port,
            self.protocol.number()
        )
    }
}

/// Resolves the flow a packet belongs to and whether it travels forward.
///
/// The packet is forward traffic on its own key when that key is already
/// known, or when neither orientation is known (so the first packet of a
/// new pair fixes the forward direction). It is backward traffic on the
/// reversed key only when the reversed key exists and the forward one does not.
pub fn resolve<F>(packet: &PacketRecord, contains: F) -> (FlowKey, bool)
where
    F: Fn(&FlowKey) -> bool,
{
    let forward_key = FlowKey::forward(packet);
    if contains(&forward_key) {
        return (forward_key, true);
    }

    let backward_key = FlowKey::backward(packet);
    if contains(&backward_key) {
        (backward_key, false)
    } else {
        (forward_key, true)
    }
}
