//! Graph store for the evaluator.
//!
//! Nodes live in an arena and are addressed by stable `NodeId`s, so the
//! term graph may share subterms and contain cycles. Reduction rewrites
//! nodes in place; every rewrite is journaled so a checkpoint can undo the
//! suffix of mutations when the search backtracks.

use smallvec::SmallVec;

use crate::flat::{Literal, QName};

/// Lightweight node handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NULL: NodeId = NodeId(u32::MAX);
}

pub type Args = SmallVec<[NodeId; 2]>;

/// Whether a saturated partial application becomes a function call or a
/// constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    Func,
    Cons,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// Unevaluated (suspended) function application.
    Susp(QName, Args),
    /// Constructor in head normal form; fields may be unevaluated.
    Cons(QName, Args),
    /// Partial application; a head normal form until saturated.
    PartApp {
        kind: PartKind,
        name: QName,
        missing: usize,
        args: Args,
    },
    Lit(Literal),
    /// Redirect left behind when a node has been reduced.
    Ind(NodeId),
    /// Logic variable; `Some` once narrowing has bound it.
    Free(Option<NodeId>),
}

/// Undo record for one checkpoint: journal position and arena size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    journal_len: usize,
    nodes_len: usize,
}

pub struct Graph {
    pub nodes: Vec<Node>,
    journal: Vec<(NodeId, Node)>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(1024),
            journal: Vec::new(),
        }
    }

    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Follows indirections and bound logic variables to the representative
    /// node.
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        loop {
            match &self.nodes[id.0 as usize] {
                Node::Ind(next) => id = *next,
                Node::Free(Some(next)) => id = *next,
                _ => return id,
            }
        }
    }

    /// Rewrites a node in place, journaling the old contents for restore.
    pub fn replace(&mut self, id: NodeId, node: Node) {
        let slot = &mut self.nodes[id.0 as usize];
        let old = std::mem::replace(slot, node);
        self.journal.push((id, old));
    }

    /// Binds a logic variable. Each variable is bound at most once per
    /// search path; unbinding happens only through `restore`.
    pub fn bind(&mut self, var: NodeId, target: NodeId) {
        debug_assert!(matches!(self.get(var), Node::Free(None)));
        self.replace(var, Node::Free(Some(target)));
    }

    pub fn mark(&self) -> Checkpoint {
        Checkpoint {
            journal_len: self.journal.len(),
            nodes_len: self.nodes.len(),
        }
    }

    /// Reverts every mutation journaled after `mark` and drops nodes
    /// created after it. Dropping is safe because surviving nodes that
    /// pointed into the dropped suffix were necessarily mutated to do so,
    /// and those mutations are undone first.
    pub fn restore(&mut self, mark: Checkpoint) {
        while self.journal.len() > mark.journal_len {
            let (id, old) = self.journal.pop().unwrap();
            self.nodes[id.0 as usize] = old;
        }
        self.nodes.truncate(mark.nodes_len);
    }

    /// Forgets undo history. Valid only while no checkpoint is pending.
    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }
}
