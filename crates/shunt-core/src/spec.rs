//! The declarative topology description: a table of
//! `(endpoint_a, port_a, endpoint_b, port_b)` rows with `s{i}` / `h{i}`
//! endpoint names, from which the node set is derived.

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::network::types::{Link, Node, NodeId, PortNo};

/// A link table describing a static topology.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub links: Vec<LinkSpec>,
}

/// One row of the link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct LinkSpec {
    pub a: String,
    pub a_port: u32,
    pub b: String,
    pub b_port: u32,
}

impl From<(&str, u32, &str, u32)> for LinkSpec {
    fn from((a, a_port, b, b_port): (&str, u32, &str, u32)) -> Self {
        Self::new(a.to_owned(), a_port, b.to_owned(), b_port)
    }
}

impl NetworkSpec {
    /// Builds a spec from `(a, a_port, b, b_port)` rows.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a (&'a str, u32, &'a str, u32)>) -> Self {
        Self {
            links: rows.into_iter().map(|&row| row.into()).collect(),
        }
    }

    /// Derives the node set from the link table and returns nodes and links
    /// ready for [`Topology::new`](crate::network::Topology::new).
    ///
    /// Hosts are assigned the first contiguous run of IDs in index order,
    /// switches the rest; each host's MAC and IP and each switch's datapath
    /// id come from the index in its name.
    pub fn build(&self) -> Result<(Vec<Node>, Vec<Link>), SpecError> {
        let mut hosts = Vec::new();
        let mut switches = Vec::new();
        let mut seen: FxHashMap<String, Endpoint> = FxHashMap::default();
        for row in &self.links {
            for name in [&row.a, &row.b] {
                if seen.contains_key(name) {
                    continue;
                }
                let endpoint = Endpoint::parse(name)?;
                match endpoint.kind {
                    EndpointKind::Host => hosts.push(endpoint.index),
                    EndpointKind::Switch => switches.push(endpoint.index),
                }
                seen.insert(name.clone(), endpoint);
            }
        }
        hosts.sort_unstable();
        hosts.dedup();
        switches.sort_unstable();
        switches.dedup();

        let host_ids: FxHashMap<u64, NodeId> = hosts
            .iter()
            .enumerate()
            .map(|(i, &index)| (index, NodeId::new(i)))
            .collect();
        let switch_ids: FxHashMap<u64, NodeId> = switches
            .iter()
            .enumerate()
            .map(|(i, &index)| (index, NodeId::new(hosts.len() + i)))
            .collect();
        let mut nodes = Vec::with_capacity(hosts.len() + switches.len());
        for (&index, &id) in host_ids.iter().sorted() {
            nodes.push(Node::new_host(id, index));
        }
        for (&index, &id) in switch_ids.iter().sorted() {
            nodes.push(Node::new_switch(id, index));
        }

        let id_of = |name: &String| {
            let endpoint = seen[name];
            match endpoint.kind {
                EndpointKind::Host => host_ids[&endpoint.index],
                EndpointKind::Switch => switch_ids[&endpoint.index],
            }
        };
        let links = self
            .links
            .iter()
            .map(|row| {
                Link::new(
                    id_of(&row.a),
                    PortNo::new(row.a_port),
                    id_of(&row.b),
                    PortNo::new(row.b_port),
                )
            })
            .collect();
        Ok((nodes, links))
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    kind: EndpointKind,
    index: u64,
}

#[derive(Debug, Clone, Copy)]
enum EndpointKind {
    Host,
    Switch,
}

impl Endpoint {
    fn parse(name: &str) -> Result<Self, SpecError> {
        let bad = || SpecError::BadEndpointName(name.to_owned());
        let (prefix, digits) = name.split_at(1.min(name.len()));
        let kind = match prefix {
            "h" => EndpointKind::Host,
            "s" => EndpointKind::Switch,
            _ => return Err(bad()),
        };
        let index: u64 = digits.parse().map_err(|_| bad())?;
        if index == 0 {
            return Err(bad());
        }
        Ok(Self { kind, index })
    }
}

/// An error type for invalid link tables.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    /// An endpoint name is not of the form `s{i}` or `h{i}` with `i ≥ 1`.
    #[error("bad endpoint name {0:?} (expected s<i> or h<i>, 1-indexed)")]
    BadEndpointName(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::types::MacAddr;

    #[test]
    fn builds_nodes_from_names() -> anyhow::Result<()> {
        let spec = NetworkSpec::from_rows(&[
            ("s1", 1, "h1", 1),
            ("s1", 2, "h2", 1),
            ("s2", 1, "h3", 1),
            ("s1", 3, "s2", 2),
        ]);
        let (nodes, links) = spec.build()?;
        assert_eq!(nodes.len(), 5);
        assert_eq!(links.len(), 4);
        // Hosts first, in index order, then switches.
        assert_eq!(nodes[0].name, "h1");
        assert_eq!(nodes[2].name, "h3");
        assert_eq!(nodes[3].name, "s1");
        assert_eq!(nodes[0].mac(), Some(MacAddr::from_host_index(1)));
        assert!(nodes.iter().enumerate().all(|(i, n)| n.id.inner() == i));
        Ok(())
    }

    #[test]
    fn rejects_unknown_prefixes() {
        for name in ["x1", "h", "h0", "s-1", ""] {
            let spec = NetworkSpec::from_rows(&[("s1", 1, "h1", 1)]);
            let mut spec = spec;
            spec.links[0].b = name.to_owned();
            assert!(
                matches!(spec.build(), Err(SpecError::BadEndpointName(..))),
                "accepted {name:?}"
            );
        }
    }

    #[test]
    fn parses_from_toml() -> anyhow::Result<()> {
        let spec: NetworkSpec = toml::from_str(
            r#"
            [[links]]
            a = "s1"
            a_port = 1
            b = "h1"
            b_port = 1

            [[links]]
            a = "s1"
            a_port = 2
            b = "h2"
            b_port = 1
            "#,
        )?;
        assert_eq!(spec.links.len(), 2);
        assert_eq!(spec.links[0], ("s1", 1, "h1", 1).into());
        let (nodes, links) = spec.build()?;
        assert_eq!((nodes.len(), links.len()), (3, 2));
        Ok(())
    }
}
