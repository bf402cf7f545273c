//! Canned topologies and a recording southbound transport for tests.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::network::topology::Topology;
use crate::network::types::{DatapathId, Link, MacAddr, Node};
use crate::program::{FlowRule, SwitchControl, TransportError};
use crate::spec::NetworkSpec;

/// The 7-switch, 19-host mesh: two or three hosts hang off every switch, the
/// switches s2..s7 form a ring, and s1 bridges s2 and s7.
const MESH_LINKS: &[(&str, u32, &str, u32)] = &[
    ("s1", 1, "h1", 1),
    ("s1", 2, "h2", 1),
    ("s1", 3, "h3", 1),
    ("s2", 1, "h4", 1),
    ("s2", 2, "h5", 1),
    ("s3", 1, "h6", 1),
    ("s3", 2, "h7", 1),
    ("s4", 1, "h8", 1),
    ("s4", 2, "h9", 1),
    ("s4", 3, "h10", 1),
    ("s5", 1, "h11", 1),
    ("s5", 2, "h12", 1),
    ("s5", 3, "h13", 1),
    ("s6", 1, "h14", 1),
    ("s6", 2, "h15", 1),
    ("s6", 3, "h16", 1),
    ("s7", 1, "h17", 1),
    ("s7", 2, "h18", 1),
    ("s7", 3, "h19", 1),
    ("s1", 4, "s2", 3),
    ("s1", 5, "s7", 4),
    ("s2", 4, "s3", 3),
    ("s2", 6, "s7", 5),
    ("s3", 4, "s4", 4),
    ("s4", 5, "s5", 4),
    ("s5", 5, "s6", 6),
    ("s6", 7, "s7", 6),
];

/// Generates the default mesh as nodes and links.
pub(crate) fn mesh_config() -> (Vec<Node>, Vec<Link>) {
    NetworkSpec::from_rows(MESH_LINKS)
        .build()
        .expect("mesh link table is valid")
}

/// The default mesh with 100 Mb links.
pub(crate) fn mesh_topology() -> Topology {
    let (nodes, links) = mesh_config();
    Topology::new(&nodes, &links, 100.0).expect("mesh topology is valid")
}

/// A host on each end of a chain of `nr_switches` switches, so the only
/// `h1 → h2` path has `nr_switches + 1` hops.
pub(crate) fn chain_config(nr_switches: usize) -> (Vec<Node>, Vec<Link>) {
    let mut rows = vec![("s1".to_owned(), 1, "h1".to_owned(), 1)];
    for i in 1..nr_switches {
        rows.push((format!("s{i}"), 2, format!("s{}", i + 1), 1));
    }
    rows.push((format!("s{nr_switches}"), 2, "h2".to_owned(), 1));
    let spec = NetworkSpec {
        links: rows
            .into_iter()
            .map(|(a, a_port, b, b_port)| crate::spec::LinkSpec::new(a, a_port, b, b_port))
            .collect(),
    };
    spec.build().expect("chain link table is valid")
}

/// Two disjoint components: `h1-s1-h2` and `h3-s2-h4`.
pub(crate) fn split_config() -> (Vec<Node>, Vec<Link>) {
    NetworkSpec::from_rows(&[
        ("s1", 1, "h1", 1),
        ("s1", 2, "h2", 1),
        ("s2", 1, "h3", 1),
        ("s2", 2, "h4", 1),
    ])
    .build()
    .expect("split link table is valid")
}

/// A southbound transport that records every message. Installed rules are
/// kept per `(switch, eth_src, eth_dst)`, so reinstallation overwrites just
/// as it would on a real switch.
#[derive(Debug, Default)]
pub(crate) struct RecordingSwitch {
    inner: Mutex<RecordingInner>,
}

#[derive(Debug, Default)]
struct RecordingInner {
    rules: FxHashMap<(DatapathId, MacAddr, MacAddr), FlowRule>,
    installs: Vec<(DatapathId, FlowRule)>,
    stats_requests: Vec<(DatapathId, StatsKind)>,
    fail_after: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatsKind {
    Port,
    Flow,
}

impl RecordingSwitch {
    /// Makes every send after the next `n` installs fail.
    pub(crate) fn fail_after(&self, n: usize) {
        self.inner.lock().unwrap().fail_after = Some(n);
    }

    pub(crate) fn nr_installs(&self) -> usize {
        self.inner.lock().unwrap().installs.len()
    }

    pub(crate) fn installs(&self) -> Vec<(DatapathId, FlowRule)> {
        self.inner.lock().unwrap().installs.clone()
    }

    pub(crate) fn rules(&self) -> FxHashMap<(DatapathId, MacAddr, MacAddr), FlowRule> {
        self.inner.lock().unwrap().rules.clone()
    }

    pub(crate) fn rule_for(
        &self,
        dpid: DatapathId,
        eth_src: MacAddr,
        eth_dst: MacAddr,
    ) -> Option<FlowRule> {
        self.inner
            .lock()
            .unwrap()
            .rules
            .get(&(dpid, eth_src, eth_dst))
            .copied()
    }

    pub(crate) fn stats_requests(&self) -> Vec<(DatapathId, StatsKind)> {
        self.inner.lock().unwrap().stats_requests.clone()
    }
}

impl SwitchControl for RecordingSwitch {
    fn install_flow(&self, dpid: DatapathId, rule: FlowRule) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(n) = inner.fail_after {
            if inner.installs.len() >= n {
                return Err(TransportError::ChannelClosed);
            }
        }
        inner.installs.push((dpid, rule));
        inner.rules.insert((dpid, rule.eth_src, rule.eth_dst), rule);
        Ok(())
    }

    fn request_port_stats(&self, dpid: DatapathId) -> Result<(), TransportError> {
        self.inner
            .lock()
            .unwrap()
            .stats_requests
            .push((dpid, StatsKind::Port));
        Ok(())
    }

    fn request_flow_stats(&self, dpid: DatapathId) -> Result<(), TransportError> {
        self.inner
            .lock()
            .unwrap()
            .stats_requests
            .push((dpid, StatsKind::Flow));
        Ok(())
    }
}
