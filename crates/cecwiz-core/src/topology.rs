//! Topology tree rebuilt from the indentation of a `--show-topology` dump

use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::LazyLock;
use tracing::debug;

use crate::device::PhysicalAddress;
use crate::error::{Error, Result};
use crate::parser::TOPOLOGY_HEADER;

static TOPOLOGY_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)(\w+\.\w+\.\w+\.\w+):").expect("valid regex"));

/// Index of a node inside its [`Topology`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

/// A node in the topology tree
#[derive(Debug, Clone, Serialize)]
pub struct TopologyNode {
    pub physical_address: PhysicalAddress,
    /// Non-owning link back to the parent, `None` for roots
    pub parent: Option<NodeId>,
    /// Children in dump order
    pub children: Vec<NodeId>,
    /// Leading whitespace length of the source line
    #[serde(skip)]
    indent: usize,
}

/// Device topology forest, normally a single tree rooted at `0.0.0.0`
#[derive(Debug, Clone, Default, Serialize)]
pub struct Topology {
    nodes: Vec<TopologyNode>,
    roots: Vec<NodeId>,
}

impl Topology {
    /// Create a new empty topology
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the tree from a `--show-topology` dump.
    ///
    /// Only lines after the `Topology:` header are considered. Each
    /// `<indent><a.b.c.d>:` line is placed relative to the previous one:
    /// deeper lines become its child, equal lines its sibling, and shallower
    /// lines a sibling of its parent. A dedent that does not land exactly on
    /// the parent's indentation (more than one level at once) is rejected.
    pub fn reconstruct(raw: &str) -> Result<Self> {
        let mut topology = Self::new();
        let mut anchor: Option<NodeId> = None;
        let mut in_section = false;

        for (index, line) in raw.lines().enumerate() {
            if !in_section {
                in_section = TOPOLOGY_HEADER.is_match(line);
                continue;
            }

            let Some(caps) = TOPOLOGY_ENTRY.captures(line) else {
                continue;
            };
            let indent = caps[1].len();
            let address: PhysicalAddress = caps[2].parse()?;

            let parent = match anchor {
                None => None,
                Some(previous) => {
                    let previous = topology.node(previous);
                    match indent.cmp(&previous.indent) {
                        Ordering::Greater => anchor,
                        Ordering::Equal => previous.parent,
                        Ordering::Less => match previous.parent {
                            None => None,
                            Some(up) => {
                                let up = topology.node(up);
                                if up.indent != indent {
                                    return Err(Error::UnsupportedIndent {
                                        line: index + 1,
                                        indent,
                                    });
                                }
                                up.parent
                            }
                        },
                    }
                }
            };

            anchor = Some(topology.insert(address, parent, indent));
        }

        debug!(
            nodes = topology.len(),
            roots = topology.roots.len(),
            "Reconstructed topology"
        );
        Ok(topology)
    }

    fn insert(&mut self, address: PhysicalAddress, parent: Option<NodeId>, indent: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TopologyNode {
            physical_address: address,
            parent,
            children: Vec::new(),
            indent,
        });
        match parent {
            Some(parent) => self.nodes[parent.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn node(&self, id: NodeId) -> &TopologyNode {
        &self.nodes[id.0]
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&TopologyNode> {
        self.nodes.get(id.0)
    }

    /// Get all nodes in dump order
    pub fn nodes(&self) -> impl Iterator<Item = &TopologyNode> {
        self.nodes.iter()
    }

    /// Get the root nodes
    pub fn roots(&self) -> Vec<&TopologyNode> {
        self.roots.iter().map(|id| self.node(*id)).collect()
    }

    /// Get children of a node
    pub fn children(&self, id: NodeId) -> Vec<&TopologyNode> {
        self.get(id)
            .map(|node| node.children.iter().map(|c| self.node(*c)).collect())
            .unwrap_or_default()
    }

    /// Get the parent of a node
    pub fn parent(&self, id: NodeId) -> Option<&TopologyNode> {
        self.get(id).and_then(|node| node.parent).map(|p| self.node(p))
    }

    /// Find a node by physical address
    pub fn find(&self, address: &PhysicalAddress) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.physical_address == *address)
            .map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get topology as a nested JSON-serializable structure
    pub fn to_tree(&self) -> Vec<TopologyTree> {
        self.roots.iter().map(|id| self.subtree(*id)).collect()
    }

    fn subtree(&self, id: NodeId) -> TopologyTree {
        let node = self.node(id);
        TopologyTree {
            physical_address: node.physical_address,
            children: node.children.iter().map(|c| self.subtree(*c)).collect(),
        }
    }
}

/// Serializable nested tree for CLI output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyTree {
    pub physical_address: PhysicalAddress,
    pub children: Vec<TopologyTree>,
}
