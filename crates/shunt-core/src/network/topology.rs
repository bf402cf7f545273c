//! The attributed topology graph shared by the path engine, the stats
//! aggregator, and the admission controller.

use itertools::Itertools;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::network::types::{Channel, DatapathId, Link, MacAddr, Node, NodeId, PortNo};

/// The network topology: switches and hosts joined by links, with one
/// directed edge per link direction so utilization is tracked per direction.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) graph: DiGraph<Node, Channel>,
    pub(crate) id2idx: FxHashMap<NodeId, NodeIndex>,
    name2id: FxHashMap<String, NodeId>,
    mac2id: FxHashMap<MacAddr, NodeId>,
    dpid2id: FxHashMap<DatapathId, NodeId>,
    ports: FxHashMap<(NodeId, PortNo), (NodeId, PortNo)>,
    links: Vec<Link>,
}

impl Topology {
    delegate::delegate! {
        to self.id2idx {
            #[call(get)]
            pub(crate) fn idx_of(&self, id: &NodeId) -> Option<&NodeIndex>;
        }

        to self.graph {
            #[allow(unused)] // used for testing
            #[call(edge_count)]
            pub(crate) fn nr_edges(&self) -> usize;

            pub(crate) fn find_edge(&self, a: NodeIndex, b: NodeIndex) -> Option<EdgeIndex>;

            /// Returns an iterator over all nodes in the topology.
            #[call(node_weights)]
            pub fn nodes(&self) -> impl Iterator<Item = &Node>;
        }

        to self.links {
            /// Returns an iterator over all links in the topology.
            #[call(iter)]
            pub fn links(&self) -> impl Iterator<Item = &Link>;
        }
    }

    /// Creates a topology from a list of nodes and links, with every channel
    /// given `capacity` Mb. This function returns an error if the given
    /// specification fails to produce a valid topology. The checks are not
    /// exhaustive.
    ///
    /// Correctness properties:
    ///
    /// - Every node must have a unique ID, and IDs must be contiguous.
    /// - Every node must have a unique name.
    /// - Every link must have distinct endpoints declared in `nodes`.
    /// - Every node must be referenced by some link.
    /// - For any two nodes, there must be at most one link between them.
    /// - Every host node should only have one link.
    /// - No port may appear in more than one link.
    pub fn new(nodes: &[Node], links: &[Link], capacity: f64) -> Result<Self, TopologyError> {
        let mut g = DiGraph::new();
        let mut id2idx = FxHashMap::default();
        let mut name2id = FxHashMap::default();
        let mut mac2id = FxHashMap::default();
        let mut dpid2id = FxHashMap::default();
        for (i, n) in nodes.iter().cloned().sorted_by_key(|n| n.id).enumerate() {
            let id = n.id;
            let name = n.name.clone();
            let mac = n.mac();
            let dpid = n.dpid();
            let idx = g.add_node(n);
            if id2idx.insert(id, idx).is_some() {
                // CORRECTNESS: Every node must have a unique ID.
                return Err(TopologyError::DuplicateNodeId(id));
            }
            if id.inner() != i {
                // CORRECTNESS: Node IDs must be contiguous.
                return Err(TopologyError::HoleBeforeId(id));
            }
            if name2id.insert(name.clone(), id).is_some() {
                // CORRECTNESS: Every node must have a unique name.
                return Err(TopologyError::DuplicateNodeName(name));
            }
            if let Some(mac) = mac {
                mac2id.insert(mac, id);
            }
            if let Some(dpid) = dpid {
                dpid2id.insert(dpid, id);
            }
        }
        let idx_of = |id| *id2idx.get(&id).unwrap();
        let mut referenced_nodes = FxHashSet::default();
        let mut ports = FxHashMap::default();
        for Link {
            a,
            a_port,
            b,
            b_port,
        } in links.iter().cloned()
        {
            // CORRECTNESS: Every link must have distinct endpoints in `nodes`.
            if a == b {
                return Err(TopologyError::NodeAdjacentSelf(a));
            }
            if !id2idx.contains_key(&a) {
                return Err(TopologyError::UndeclaredNode(a));
            }
            if !id2idx.contains_key(&b) {
                return Err(TopologyError::UndeclaredNode(b));
            }
            referenced_nodes.insert(a);
            referenced_nodes.insert(b);
            // CORRECTNESS: No port may appear in more than one link.
            if ports.insert((a, a_port), (b, b_port)).is_some() {
                return Err(TopologyError::PortInUse { node: a, port: a_port });
            }
            if ports.insert((b, b_port), (a, a_port)).is_some() {
                return Err(TopologyError::PortInUse { node: b, port: b_port });
            }
            // Channels are unidirectional
            g.add_edge(
                idx_of(a),
                idx_of(b),
                Channel::new(a, b, a_port, b_port, capacity),
            );
            g.add_edge(
                idx_of(b),
                idx_of(a),
                Channel::new(b, a, b_port, a_port, capacity),
            );
        }
        // CORRECTNESS: Every node must be referenced by some link.
        for &id in id2idx.keys() {
            if !referenced_nodes.contains(&id) {
                return Err(TopologyError::IsolatedNode(id));
            }
        }
        for eidx in g.edge_indices() {
            // CORRECTNESS: For any two nodes, there must be at most one link between them.
            let (a, b) = g.edge_endpoints(eidx).unwrap();
            if g.edges_connecting(a, b).count() > 1 {
                return Err(TopologyError::DuplicateLink {
                    n1: g[a].id,
                    n2: g[b].id,
                });
            }
            // CORRECTNESS: Every host node should only have one link.
            let node = &g[a];
            if node.is_host() {
                let nr_outgoing = g.edges(a).count();
                if nr_outgoing > 1 {
                    return Err(TopologyError::TooManyHostLinks {
                        id: node.id,
                        n: nr_outgoing,
                    });
                }
            }
        }
        Ok(Self {
            graph: g,
            id2idx,
            name2id,
            mac2id,
            dpid2id,
            ports,
            links: Vec::from(links),
        })
    }

    /// Returns the node with the given ID.
    ///
    /// Panics if the ID was not declared; IDs handed out by this topology are
    /// always valid.
    pub fn node(&self, id: NodeId) -> &Node {
        let idx = *self.idx_of(&id).expect("unknown node id");
        &self.graph[idx]
    }

    /// Returns the node with the given name, if any.
    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.name2id.get(name).map(|&id| self.node(id))
    }

    /// Returns the host bearing the given MAC, if any.
    pub fn host_by_mac(&self, mac: MacAddr) -> Option<&Node> {
        self.mac2id.get(&mac).map(|&id| self.node(id))
    }

    /// Returns the switch with the given datapath id, if any.
    pub fn switch_by_dpid(&self, dpid: DatapathId) -> Option<&Node> {
        self.dpid2id.get(&dpid).map(|&id| self.node(id))
    }

    /// Returns the datapath ids of all switches, in ascending order.
    pub fn switch_dpids(&self) -> Vec<DatapathId> {
        self.dpid2id.keys().copied().sorted().collect()
    }

    /// Returns the endpoint attached to `(switch, port_no)` and its port on
    /// the other side, or `None` for an unattached port or unknown switch.
    pub fn peer_of(&self, dpid: DatapathId, port: PortNo) -> Option<(NodeId, PortNo)> {
        let &id = self.dpid2id.get(&dpid)?;
        self.ports.get(&(id, port)).copied()
    }

    /// Returns the channel for the `src → dst` direction, if the two nodes
    /// are linked.
    pub fn channel(&self, src: NodeId, dst: NodeId) -> Option<&Channel> {
        let a = *self.idx_of(&src)?;
        let b = *self.idx_of(&dst)?;
        let eidx = self.find_edge(a, b)?;
        Some(&self.graph[eidx])
    }

    pub(crate) fn channel_mut(&mut self, src: NodeId, dst: NodeId) -> Option<&mut Channel> {
        let a = *self.idx_of(&src)?;
        let b = *self.idx_of(&dst)?;
        let eidx = self.find_edge(a, b)?;
        Some(&mut self.graph[eidx])
    }

    /// Most recent utilization of the `src → dst` direction, in Mb.
    pub fn utilization(&self, src: NodeId, dst: NodeId) -> Option<f64> {
        self.channel(src, dst).map(|c| c.used())
    }

    /// Records a utilization reading for the `src → dst` direction. Readings
    /// for unknown edges are dropped.
    pub(crate) fn set_utilization(&mut self, src: NodeId, dst: NodeId, mbps: f64) {
        match self.channel_mut(src, dst) {
            Some(chan) => chan.set_used(mbps),
            None => tracing::warn!(%src, %dst, "utilization reading for unknown edge"),
        }
    }

    /// The egress port on `from` leading to `to`, if the two are linked.
    pub fn out_port(&self, from: NodeId, to: NodeId) -> Option<PortNo> {
        self.channel(from, to).map(|c| c.src_port())
    }
}

/// An error type listing some of the reasons a topology is invalid.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// Duplicate node ID.
    #[error("duplicate node ID {0}")]
    DuplicateNodeId(NodeId),

    /// Node IDs are not contiguous.
    #[error("node IDs not contiguous; hole before {0}")]
    HoleBeforeId(NodeId),

    /// Duplicate node name.
    #[error("duplicate node name {0:?}")]
    DuplicateNodeName(String),

    /// A node is connected to itself.
    #[error("node {0} is connected to itself")]
    NodeAdjacentSelf(NodeId),

    /// A node is referenced by a link but does not exist.
    #[error("node {0} is not declared")]
    UndeclaredNode(NodeId),

    /// Duplicate link between two nodes.
    #[error("duplicate links between {n1} and {n2}")]
    DuplicateLink {
        /// The first node.
        n1: NodeId,
        /// The second node.
        n2: NodeId,
    },

    /// More than one link connected to a host.
    #[error("host {id} has too many links (expected 1, got {n})")]
    TooManyHostLinks {
        /// The host's node ID.
        id: NodeId,
        /// The actual number of links (should be 1).
        n: usize,
    },

    /// A node is not connected to anything else.
    #[error("node {0} is not connected to any other node")]
    IsolatedNode(NodeId),

    /// The same port is named by two links.
    #[error("port {port} on node {node} is used by more than one link")]
    PortInUse {
        /// The node bearing the port.
        node: NodeId,
        /// The port number.
        port: PortNo,
    },
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;
    use crate::testing;

    #[test]
    fn empty_topology_succeeds() {
        assert!(
            Topology::new(&[], &[], 100.0).is_ok(),
            "failed to create empty topology"
        );
    }

    #[test]
    fn default_mesh_works() -> anyhow::Result<()> {
        let (nodes, links) = testing::mesh_config();
        let topo = Topology::new(&nodes, &links, 100.0).context("failed to create topology")?;
        assert_eq!(topo.nodes().count(), 26);
        // 27 links, two directed channels each.
        assert_eq!(topo.nr_edges(), 54);
        Ok(())
    }

    #[test]
    fn duplicate_node_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(0), 2); // error
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let res = Topology::new(&[n1, n2, n3], &[l1, l2], 100.0);
        assert!(matches!(res, Err(TopologyError::DuplicateNodeId(..))));
    }

    #[test]
    fn non_contiguous_node_ids_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(3), 1); // error
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let res = Topology::new(&[n1, n2, n3], &[l1, l2], 100.0);
        assert!(matches!(res, Err(TopologyError::HoleBeforeId(..))));
    }

    #[test]
    fn node_adjacent_self_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let l3 = Link::new(n3.id, PortNo::new(3), n3.id, PortNo::new(4)); // error
        let res = Topology::new(&[n1, n2, n3], &[l1, l2, l3], 100.0);
        assert!(matches!(res, Err(TopologyError::NodeAdjacentSelf(..))));
    }

    #[test]
    fn undeclared_node_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let l3 = Link::new(NodeId::new(3), PortNo::new(1), n3.id, PortNo::new(3));
        let res = Topology::new(&[n1, n2, n3], &[l1, l2, l3], 100.0);
        assert!(matches!(res, Err(TopologyError::UndeclaredNode(..))));
    }

    #[test]
    fn duplicate_links_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let l3 = Link::new(n2.id, PortNo::new(2), n3.id, PortNo::new(3)); // error
        let res = Topology::new(&[n1, n2, n3], &[l1, l2, l3], 100.0);
        assert!(matches!(res, Err(TopologyError::DuplicateLink { .. })));
    }

    #[test]
    fn too_many_host_links_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let n4 = Node::new_switch(NodeId::new(3), 2);
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let l3 = Link::new(n1.id, PortNo::new(2), n4.id, PortNo::new(1)); // error
        let res = Topology::new(&[n1, n2, n3, n4], &[l1, l2, l3], 100.0);
        assert!(matches!(
            res,
            Err(TopologyError::TooManyHostLinks { n: 2, .. })
        ));
    }

    #[test]
    fn isolated_node_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let n4 = Node::new_host(NodeId::new(3), 3); // error
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(2));
        let res = Topology::new(&[n1, n2, n3, n4], &[l1, l2], 100.0);
        assert!(matches!(res, Err(TopologyError::IsolatedNode(..))));
    }

    #[test]
    fn reused_port_fails() {
        let n1 = Node::new_host(NodeId::new(0), 1);
        let n2 = Node::new_host(NodeId::new(1), 2);
        let n3 = Node::new_switch(NodeId::new(2), 1);
        let l1 = Link::new(n1.id, PortNo::new(1), n3.id, PortNo::new(1));
        let l2 = Link::new(n2.id, PortNo::new(1), n3.id, PortNo::new(1)); // error
        let res = Topology::new(&[n1, n2, n3], &[l1, l2], 100.0);
        assert!(matches!(res, Err(TopologyError::PortInUse { .. })));
    }

    #[test]
    fn peer_lookup_follows_the_link_table() {
        let topo = testing::mesh_topology();
        let s1 = topo.node_by_name("s1").unwrap();
        let h1 = topo.node_by_name("h1").unwrap();
        let s2 = topo.node_by_name("s2").unwrap();
        // s1 port 1 attaches h1 port 1; s1 port 4 attaches s2 port 3.
        assert_eq!(
            topo.peer_of(s1.dpid().unwrap(), PortNo::new(1)),
            Some((h1.id, PortNo::new(1)))
        );
        assert_eq!(
            topo.peer_of(s1.dpid().unwrap(), PortNo::new(4)),
            Some((s2.id, PortNo::new(3)))
        );
        // Port 9 is unattached.
        assert_eq!(topo.peer_of(s1.dpid().unwrap(), PortNo::new(9)), None);
    }

    #[test]
    fn utilization_is_per_direction() {
        let mut topo = testing::mesh_topology();
        let s1 = topo.node_by_name("s1").unwrap().id;
        let s2 = topo.node_by_name("s2").unwrap().id;
        topo.set_utilization(s1, s2, 42.0);
        assert_eq!(topo.utilization(s1, s2), Some(42.0));
        assert_eq!(topo.utilization(s2, s1), Some(0.0));
        assert_eq!(topo.channel(s1, s2).unwrap().available(), 58.0);
    }
}
