//! The southbound message types and the channel-backed handle the engine
//! sends through. An OpenFlow 1.3 session encodes [`SwitchMsg`] values into
//! `FlowMod` / `PortStatsRequest` / `FlowStatsRequest` frames and feeds
//! decoded replies back as [`SwitchReply`] values.

use tokio::sync::mpsc;

use shunt_core::stats::{FlowStat, PortStat};
use shunt_core::{DatapathId, FlowRule, SwitchControl, TransportError};

/// Controller → switch messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchMsg {
    /// Install (or overwrite) a forwarding entry.
    FlowMod { dpid: DatapathId, rule: FlowRule },
    /// Request counters for all ports.
    PortStatsRequest { dpid: DatapathId },
    /// Request counters for all flow entries.
    FlowStatsRequest { dpid: DatapathId },
}

/// Switch → controller replies, already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchReply {
    /// Switch-features, sent once when a switch connects.
    Features { dpid: DatapathId },
    PortStats {
        dpid: DatapathId,
        stats: Vec<PortStat>,
    },
    FlowStats {
        dpid: DatapathId,
        stats: Vec<FlowStat>,
    },
}

/// Fire-and-forget southbound handle. Sends never block; a closed channel
/// surfaces as [`TransportError::ChannelClosed`].
#[derive(Debug, Clone)]
pub struct OfHandle {
    tx: mpsc::UnboundedSender<SwitchMsg>,
}

/// Creates the southbound handle and the message stream a session consumes.
pub fn channel() -> (OfHandle, mpsc::UnboundedReceiver<SwitchMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OfHandle { tx }, rx)
}

impl OfHandle {
    fn send(&self, msg: SwitchMsg) -> Result<(), TransportError> {
        self.tx.send(msg).map_err(|_| TransportError::ChannelClosed)
    }
}

impl SwitchControl for OfHandle {
    fn install_flow(&self, dpid: DatapathId, rule: FlowRule) -> Result<(), TransportError> {
        self.send(SwitchMsg::FlowMod { dpid, rule })
    }

    fn request_port_stats(&self, dpid: DatapathId) -> Result<(), TransportError> {
        self.send(SwitchMsg::PortStatsRequest { dpid })
    }

    fn request_flow_stats(&self, dpid: DatapathId) -> Result<(), TransportError> {
        self.send(SwitchMsg::FlowStatsRequest { dpid })
    }
}

/// Stands in for an OpenFlow session when none is attached: drains outbound
/// messages to the log and produces no replies.
pub async fn log_drain(
    mut rx: mpsc::UnboundedReceiver<SwitchMsg>,
    replies: mpsc::UnboundedSender<SwitchReply>,
) {
    while let Some(msg) = rx.recv().await {
        tracing::debug!(?msg, "no switch session attached; dropping");
    }
    drop(replies);
}
