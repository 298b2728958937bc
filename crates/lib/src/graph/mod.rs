//! Build graph handed to the host build engine.
//!
//! Nodes are files or aliases. A file node optionally carries the [`Action`]
//! that produces it; a node without an action is a source. Edges run from a
//! dependency to its dependent, so a topological order is a valid build
//! order. Nodes are deduplicated by key: registering the same path twice
//! yields the same node.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use thiserror::Error;

/// Handle onto a graph node.
pub type NodeId = NodeIndex;

#[derive(Debug, Error)]
pub enum GraphError {
  #[error("dependency cycle detected at {0}")]
  Cycle(NodeKey),
}

/// Identity of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
  File(PathBuf),
  Alias(String),
}

impl fmt::Display for NodeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      NodeKey::File(path) => write!(f, "{}", path.display()),
      NodeKey::Alias(name) => write!(f, "alias:{}", name),
    }
  }
}

/// Final link step flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
  Program,
  SharedLib,
  Module,
}

/// Settings of one compile or link step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolFlags {
  pub defines: Vec<String>,
  pub include_dirs: Vec<PathBuf>,
  pub cflags: Vec<String>,
  pub lib_dirs: Vec<PathBuf>,
  pub libs: Vec<String>,
  pub link_flags: Vec<String>,
}

/// Default visibility of symbols in compiled objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
  Default,
  Hidden,
}

impl fmt::Display for Visibility {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Visibility::Default => write!(f, "default"),
      Visibility::Hidden => write!(f, "hidden"),
    }
  }
}

/// Link settings that only some artifact types use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkDetails {
  /// ELF soname or Mach-O install name.
  pub soname: Option<String>,
  /// Exported-symbol map (version script or `.def` file).
  pub symbol_map: Option<PathBuf>,
  /// Runtime library search paths, relative to the binary.
  pub rpath: Vec<String>,
  pub stack_size: Option<u64>,
  /// Link for the windowed subsystem instead of the console one.
  pub windowed: bool,
  pub version: Option<String>,
}

/// How a node is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Compile {
    source: PathBuf,
    flags: ToolFlags,
    visibility: Visibility,
  },
  Archive {
    objects: Vec<PathBuf>,
  },
  Link {
    kind: LinkKind,
    objects: Vec<PathBuf>,
    flags: ToolFlags,
    details: LinkDetails,
  },
  /// Written as a side effect of producing `primary` (import libraries).
  SideOutput { primary: PathBuf },
  /// Symbolic link whose content is `points_to`.
  Symlink { points_to: String },
  Copy { source: PathBuf },
  /// Installed by an external sub-build.
  External { tool: String, project: String },
  /// Shell command run after the node's dependencies are up to date.
  Command { command: String },
}

#[derive(Debug, Clone)]
pub struct Node {
  pub key: NodeKey,
  pub action: Option<Action>,
}

impl Node {
  pub fn path(&self) -> Option<&Path> {
    match &self.key {
      NodeKey::File(path) => Some(path),
      NodeKey::Alias(_) => None,
    }
  }
}

#[derive(Debug, Default)]
pub struct ActionGraph {
  graph: DiGraph<Node, ()>,
  index: HashMap<NodeKey, NodeId>,
}

impl ActionGraph {
  pub fn new() -> Self {
    Self::default()
  }

  fn intern(&mut self, key: NodeKey) -> NodeId {
    if let Some(&id) = self.index.get(&key) {
      return id;
    }
    let id = self.graph.add_node(Node {
      key: key.clone(),
      action: None,
    });
    self.index.insert(key, id);
    id
  }

  /// Node for `path`, created as a source if it is new.
  pub fn file(&mut self, path: impl Into<PathBuf>) -> NodeId {
    self.intern(NodeKey::File(path.into()))
  }

  pub fn alias(&mut self, name: &str) -> NodeId {
    self.intern(NodeKey::Alias(name.to_string()))
  }

  /// Node for `path` produced by `action`; a previous action is replaced.
  pub fn produce(&mut self, path: impl Into<PathBuf>, action: Action) -> NodeId {
    let id = self.file(path);
    self.graph[id].action = Some(action);
    id
  }

  /// Alias node carrying `action`, for steps that produce no tracked file.
  pub fn produce_alias(&mut self, name: &str, action: Action) -> NodeId {
    let id = self.alias(name);
    self.graph[id].action = Some(action);
    id
  }

  /// Record that `dependent` needs `dependency`. Duplicate edges are ignored.
  pub fn depend(&mut self, dependent: NodeId, dependency: NodeId) {
    if dependent != dependency {
      self.graph.update_edge(dependency, dependent, ());
    }
  }

  pub fn node(&self, id: NodeId) -> &Node {
    &self.graph[id]
  }

  pub fn lookup(&self, key: &NodeKey) -> Option<NodeId> {
    self.index.get(key).copied()
  }

  pub fn lookup_file(&self, path: &Path) -> Option<NodeId> {
    self.lookup(&NodeKey::File(path.to_path_buf()))
  }

  pub fn node_count(&self) -> usize {
    self.graph.node_count()
  }

  pub fn edge_count(&self) -> usize {
    self.graph.edge_count()
  }

  /// Direct dependencies of `id`.
  pub fn dependencies(&self, id: NodeId) -> Vec<NodeId> {
    let mut deps: Vec<NodeId> = self.graph.neighbors_directed(id, Direction::Incoming).collect();
    deps.sort();
    deps
  }

  /// Every node `id` depends on, directly or not.
  pub fn transitive_dependencies(&self, id: NodeId) -> HashSet<NodeId> {
    let reversed = Reversed(&self.graph);
    let mut dfs = Dfs::new(reversed, id);
    let mut seen = HashSet::new();
    while let Some(next) = dfs.next(reversed) {
      if next != id {
        seen.insert(next);
      }
    }
    seen
  }

  pub fn depends_on(&self, dependent: NodeId, dependency: NodeId) -> bool {
    self.transitive_dependencies(dependent).contains(&dependency)
  }

  /// Nodes ordered dependencies-first.
  pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
    toposort(&self.graph, None).map_err(|cycle| GraphError::Cycle(self.graph[cycle.node_id()].key.clone()))
  }

  pub fn verify_acyclic(&self) -> Result<(), GraphError> {
    self.topological_order().map(|_| ())
  }

  /// Nodes that carry an action.
  pub fn produced(&self) -> impl Iterator<Item = (NodeId, &Node)> {
    self
      .graph
      .node_indices()
      .map(|id| (id, &self.graph[id]))
      .filter(|(_, node)| node.action.is_some())
  }
}
