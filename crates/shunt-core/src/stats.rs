//! Conversion of raw switch counters into per-link utilization readings and
//! per-flow transmit rates.

use rustc_hash::FxHashMap;

use crate::network::topology::Topology;
use crate::network::types::{DatapathId, MacAddr, PortNo};
use crate::registry::FlowRegistry;

/// Bits per Mb. Rates keep the `1024²` convention the capacity figures use.
const MB: f64 = 1024.0 * 1024.0;

/// One entry of a port-stats reply: cumulative counters since the port came
/// up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct PortStat {
    pub port_no: PortNo,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl PortStat {
    fn duration(&self) -> f64 {
        self.duration_sec as f64 + self.duration_nsec as f64 / 1e9
    }
}

/// One entry of a flow-stats reply: cumulative counters for a single
/// match-and-output entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_new::new)]
pub struct FlowStat {
    pub eth_src: MacAddr,
    pub eth_dst: MacAddr,
    pub byte_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

impl FlowStat {
    fn duration(&self) -> f64 {
        self.duration_sec as f64 + self.duration_nsec as f64 / 1e9
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PortSnapshot {
    duration: f64,
    rx_bytes: u64,
    tx_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct FlowSnapshot {
    duration: f64,
    byte_count: u64,
}

/// Turns each switch's cumulative counters into rates by differencing
/// against the previous sample, then writes the rates into the topology's
/// directional utilization attributes and the registry's flow records.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    ports: FxHashMap<(DatapathId, PortNo), PortSnapshot>,
    flows: FxHashMap<(DatapathId, MacAddr, MacAddr), FlowSnapshot>,
}

impl StatsAggregator {
    /// Applies one port-stats reply. For each attached port, the switch's
    /// transmit rate becomes the `switch → peer` utilization and its receive
    /// rate the `peer → switch` utilization.
    pub fn apply_port_stats(&mut self, topo: &mut Topology, dpid: DatapathId, stats: &[PortStat]) {
        let Some(switch) = topo.switch_by_dpid(dpid) else {
            tracing::warn!(%dpid, "port stats from unknown switch");
            return;
        };
        let switch = switch.id;
        for stat in stats {
            let prev = self
                .ports
                .get(&(dpid, stat.port_no))
                .copied()
                .unwrap_or_default();
            let dt = stat.duration() - prev.duration;
            if dt <= 0.0 {
                tracing::debug!(%dpid, port = %stat.port_no, "stale port-stats sample");
                continue;
            }
            let rx_rate = stat.rx_bytes.saturating_sub(prev.rx_bytes) as f64 * 8.0 / dt / MB;
            let tx_rate = stat.tx_bytes.saturating_sub(prev.tx_bytes) as f64 * 8.0 / dt / MB;
            self.ports.insert(
                (dpid, stat.port_no),
                PortSnapshot {
                    duration: stat.duration(),
                    rx_bytes: stat.rx_bytes,
                    tx_bytes: stat.tx_bytes,
                },
            );
            if let Some((peer, _)) = topo.peer_of(dpid, stat.port_no) {
                topo.set_utilization(switch, peer, tx_rate);
                topo.set_utilization(peer, switch, rx_rate);
            }
        }
    }

    /// Applies one flow-stats reply, refreshing the transmit rate of each
    /// registered flow it references. A reference to a pair that is not in
    /// the registry purges that pair's cached counters instead.
    pub fn apply_flow_stats(
        &mut self,
        registry: &mut FlowRegistry,
        topo: &Topology,
        dpid: DatapathId,
        stats: &[FlowStat],
    ) {
        for stat in stats {
            let hosts = topo
                .host_by_mac(stat.eth_src)
                .zip(topo.host_by_mac(stat.eth_dst));
            let Some((src, dst)) = hosts else {
                tracing::debug!(src = %stat.eth_src, dst = %stat.eth_dst, "flow stats for unknown hosts");
                continue;
            };
            let key = (src.id, dst.id);
            if !registry.contains(&key) {
                self.flows
                    .retain(|&(_, s, d), _| !(s == stat.eth_src && d == stat.eth_dst));
                continue;
            }
            let cache_key = (dpid, stat.eth_src, stat.eth_dst);
            let prev = self.flows.get(&cache_key).copied().unwrap_or_default();
            let dt = stat.duration() - prev.duration;
            if dt <= 0.0 {
                continue;
            }
            let rate = stat.byte_count.saturating_sub(prev.byte_count) as f64 * 8.0 / dt / MB;
            self.flows.insert(
                (dpid, stat.eth_src, stat.eth_dst),
                FlowSnapshot {
                    duration: stat.duration(),
                    byte_count: stat.byte_count,
                },
            );
            registry.set_rate(&key, rate);
        }
    }
}
