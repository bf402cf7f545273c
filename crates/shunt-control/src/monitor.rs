//! The periodic stats tick and the reply dispatcher.

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::southbound::SwitchReply;
use crate::state::AppState;

/// Issues port- and flow-stats requests for every known switch on a fixed
/// tick. A slow cycle delays the next tick instead of overlapping it.
pub async fn run(state: AppState) {
    let period = state.controller().await.config().monitor_interval();
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        state.controller().await.request_stats();
    }
}

/// Applies decoded switch replies to the stats aggregator, one reply at a
/// time. Returns when the reply channel closes.
pub async fn dispatch(state: AppState, mut replies: mpsc::UnboundedReceiver<SwitchReply>) {
    while let Some(reply) = replies.recv().await {
        let mut controller = state.controller().await;
        match reply {
            SwitchReply::Features { dpid } => {
                match controller.topology().switch_by_dpid(dpid) {
                    Some(switch) => tracing::info!(%dpid, name = %switch.name, "switch connected"),
                    None => tracing::warn!(%dpid, "features from a switch not in the topology"),
                }
            }
            SwitchReply::PortStats { dpid, stats } => controller.handle_port_stats(dpid, &stats),
            SwitchReply::FlowStats { dpid, stats } => controller.handle_flow_stats(dpid, &stats),
        }
    }
}
