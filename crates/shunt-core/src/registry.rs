//! The controller's record of currently admitted best-effort flows.

use rustc_hash::FxHashMap;

use crate::network::types::NodeId;

/// Key of an active flow: its source and destination hosts.
pub type FlowKey = (NodeId, NodeId);

/// A best-effort flow the controller has admitted: the node path it
/// currently occupies and its most recent transmit rate.
#[derive(Debug, Clone, PartialEq, derive_new::new)]
pub struct FlowRecord {
    pub path: Vec<NodeId>,
    #[new(default)]
    pub rate_mbps: f64,
}

/// Video flows are never registered here; they hold no state once their
/// rules are installed.
#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: FxHashMap<FlowKey, FlowRecord>,
}

impl FlowRegistry {
    delegate::delegate! {
        to self.flows {
            #[call(len)]
            pub fn len(&self) -> usize;

            #[call(is_empty)]
            pub fn is_empty(&self) -> bool;

            /// Removes a flow, returning its record if it was registered.
            #[call(remove)]
            pub fn remove(&mut self, key: &FlowKey) -> Option<FlowRecord>;

            /// Returns the record for a flow, if registered.
            #[call(get)]
            pub fn get(&self, key: &FlowKey) -> Option<&FlowRecord>;
        }
    }

    /// Registers a flow, overwriting any previous record for the same pair.
    pub fn insert(&mut self, key: FlowKey, record: FlowRecord) -> Option<FlowRecord> {
        self.flows.insert(key, record)
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.flows.contains_key(key)
    }

    /// Returns an iterator over all registered flows.
    pub fn iter(&self) -> impl Iterator<Item = (&FlowKey, &FlowRecord)> {
        self.flows.iter()
    }

    /// Replaces the path of a registered flow, keeping its rate.
    pub(crate) fn set_path(&mut self, key: &FlowKey, path: Vec<NodeId>) {
        if let Some(rec) = self.flows.get_mut(key) {
            rec.path = path;
        }
    }

    /// Records the latest transmit rate for a registered flow.
    pub(crate) fn set_rate(&mut self, key: &FlowKey, rate_mbps: f64) {
        if let Some(rec) = self.flows.get_mut(key) {
            rec.rate_mbps = rate_mbps;
        }
    }

    /// Flows whose current path crosses the link `(a, b)` in either
    /// direction, sorted by key so callers see a stable order.
    pub fn flows_crossing(&self, a: NodeId, b: NodeId) -> Vec<(FlowKey, &FlowRecord)> {
        let mut hits = self
            .flows
            .iter()
            .filter(|(_, rec)| {
                rec.path
                    .windows(2)
                    .any(|w| (w[0] == a && w[1] == b) || (w[0] == b && w[1] == a))
            })
            .map(|(&key, rec)| (key, rec))
            .collect::<Vec<_>>();
        hits.sort_by_key(|&(key, _)| key);
        hits
    }
}
