//! Translation of node paths into per-switch forwarding rules, and the
//! southbound contract they are sent over.

use crate::network::topology::Topology;
use crate::network::types::{DatapathId, MacAddr, NodeId, PortNo};

/// Priority of every forwarding entry the controller installs.
pub const FLOW_PRIORITY: u16 = 1;

/// A match-and-output forwarding entry for one switch: traffic from
/// `eth_src` to `eth_dst` leaves through `out_port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowRule {
    pub eth_src: MacAddr,
    pub eth_dst: MacAddr,
    pub out_port: PortNo,
    pub priority: u16,
}

/// The southbound transport contract. Implementations deliver messages to
/// switches without awaiting a reply; stats replies come back through the
/// caller's own dispatch path.
pub trait SwitchControl {
    /// Installs (or overwrites) a forwarding entry on the given switch.
    fn install_flow(&self, dpid: DatapathId, rule: FlowRule) -> Result<(), TransportError>;

    /// Asks a switch for counters on all of its ports.
    fn request_port_stats(&self, dpid: DatapathId) -> Result<(), TransportError>;

    /// Asks a switch for counters on all of its flow entries.
    fn request_flow_stats(&self, dpid: DatapathId) -> Result<(), TransportError>;
}

/// A southbound message could not be sent.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The southbound session is gone.
    #[error("southbound channel closed")]
    ChannelClosed,

    /// No connected switch bears this datapath id.
    #[error("unknown datapath {0}")]
    UnknownDatapath(DatapathId),
}

/// An admission could not be programmed onto the switches.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// The path does not start and end at hosts.
    #[error("path endpoints must be hosts")]
    EndpointNotHost,

    /// A rule installation could not be sent. Rules already installed along
    /// the path stay in place.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Installs the forwarding entries for `path` on every switch along it: a
/// forward rule towards the destination host and the symmetric return rule,
/// all at [`FLOW_PRIORITY`].
pub fn program_path<T: SwitchControl>(
    topo: &Topology,
    transport: &T,
    path: &[NodeId],
) -> Result<(), ProgramError> {
    let (Some(&first), Some(&last)) = (path.first(), path.last()) else {
        return Err(ProgramError::EndpointNotHost);
    };
    let src_mac = topo.node(first).mac().ok_or(ProgramError::EndpointNotHost)?;
    let dst_mac = topo.node(last).mac().ok_or(ProgramError::EndpointNotHost)?;
    for w in path.windows(2) {
        let (a, b) = (w[0], w[1]);
        if let Some(dpid) = topo.node(a).dpid() {
            // The ports are guaranteed to exist because the path came from
            // this topology.
            let out_port = topo.out_port(a, b).expect("path edge not in topology");
            transport.install_flow(
                dpid,
                FlowRule {
                    eth_src: src_mac,
                    eth_dst: dst_mac,
                    out_port,
                    priority: FLOW_PRIORITY,
                },
            )?;
        }
        if let Some(dpid) = topo.node(b).dpid() {
            let out_port = topo.out_port(b, a).expect("path edge not in topology");
            transport.install_flow(
                dpid,
                FlowRule {
                    eth_src: dst_mac,
                    eth_dst: src_mac,
                    out_port,
                    priority: FLOW_PRIORITY,
                },
            )?;
        }
    }
    Ok(())
}
