//! Path enumeration and the per-path metrics admission decisions are made
//! from.

use std::collections::VecDeque;

use petgraph::algo;
use petgraph::graph::NodeIndex;
use petgraph::visit::{VisitMap, Visitable};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::network::topology::Topology;
use crate::network::types::NodeId;

/// Returns a single minimum-hop node path from `src` to `dst`, or `None` if
/// the two are disconnected. Hosts never forward, so only switches are
/// expanded. Ties between equal-length paths are broken by neighbor
/// iteration order, which is stable for a given topology.
pub fn shortest_path(topo: &Topology, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
    let g = &topo.graph;
    let start = *topo.idx_of(&src)?;
    let goal = *topo.idx_of(&dst)?;
    if start == goal {
        return Some(vec![src]);
    }

    let mut discovered = g.visit_map();
    discovered.visit(start);

    let mut queue = VecDeque::new();
    queue.push_back(start);

    let mut prev: FxHashMap<NodeIndex, NodeIndex> = FxHashMap::default();

    while let Some(n) = queue.pop_front() {
        for succ in g.neighbors(n) {
            if discovered.visit(succ) {
                prev.insert(succ, n);
                if succ == goal {
                    let mut path = vec![g[goal].id];
                    let mut cur = goal;
                    while let Some(&p) = prev.get(&cur) {
                        path.push(g[p].id);
                        cur = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                // Hosts never forward traffic.
                if g[succ].is_switch() {
                    queue.push_back(succ);
                }
            }
        }
    }
    None
}

/// Enumerates the simple paths from `src` to `dst` with at most `h_max`
/// hops. When `exclude` is given, any path traversing one of its consecutive
/// edges (in either direction) is dropped.
pub fn all_paths(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    h_max: usize,
    exclude: Option<&[NodeId]>,
) -> Vec<Vec<NodeId>> {
    let (Some(&start), Some(&goal)) = (topo.idx_of(&src), topo.idx_of(&dst)) else {
        return Vec::new();
    };
    let banned: FxHashSet<(NodeId, NodeId)> = exclude
        .map(|filter| {
            filter
                .windows(2)
                .flat_map(|w| [(w[0], w[1]), (w[1], w[0])])
                .collect()
        })
        .unwrap_or_default();
    // `max_intermediate_nodes` excludes the endpoints: a path of k hops has
    // k - 1 interior nodes.
    let max_interior = h_max.saturating_sub(1);
    algo::all_simple_paths::<Vec<_>, _>(&topo.graph, start, goal, 0, Some(max_interior))
        .map(|path| {
            path.into_iter()
                .map(|idx| topo.graph[idx].id)
                .collect::<Vec<_>>()
        })
        .filter(|path| path.windows(2).all(|w| !banned.contains(&(w[0], w[1]))))
        .collect()
}

/// Summary of one candidate path against the admission thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMetrics {
    /// Number of edges on the path.
    pub hop_count: usize,
    /// The tightest forward-direction headroom across all edges, in Mb.
    pub min_bandwidth: f64,
    /// Indices of the edges whose headroom is below the video margin.
    pub exceeded_video_edges: Vec<usize>,
}

impl PathMetrics {
    /// Reads the forward-direction utilization of every edge on `path`.
    ///
    /// `path` must come from one of the enumerators above: every consecutive
    /// pair is linked, and the path is simple.
    pub fn evaluate(topo: &Topology, path: &[NodeId], video_limit: f64) -> Self {
        let mut min_bandwidth = f64::INFINITY;
        let mut exceeded_video_edges = Vec::new();
        for (i, w) in path.windows(2).enumerate() {
            // The edge is guaranteed to exist because the path came from this
            // topology.
            let chan = topo.channel(w[0], w[1]).expect("path edge not in topology");
            let headroom = chan.available();
            if headroom < min_bandwidth {
                min_bandwidth = headroom;
            }
            if headroom < video_limit {
                exceeded_video_edges.push(i);
            }
        }
        Self {
            hop_count: path.len().saturating_sub(1),
            min_bandwidth,
            exceeded_video_edges,
        }
    }
}
