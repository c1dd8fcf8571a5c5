//! Rendering of graph terms.
//!
//! `unparse` prints directly from the graph with depth/size budgets and a
//! seen-set so shared and cyclic structures cannot blow up diagnostics.
//! `extract_term` detaches a result into an owned tree for callers that
//! outlive the evaluation.

use std::collections::HashSet;
use std::fmt;

use crate::flat::{Literal, QName};
use crate::graph::{Graph, Node, NodeId};

const UNPARSE_MAX_DEPTH: usize = 32;
const UNPARSE_MAX_NODES: usize = 512;

/// Owned copy of a value reachable from a result node. Unevaluated parts
/// are kept as suspensions; unbound logic variables keep their node
/// identity so shared variables print alike.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Lit(Literal),
    Cons(QName, Vec<Term>),
    Free(u32),
    PartApp(QName, Vec<Term>),
    Susp(QName, Vec<Term>),
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn args(f: &mut fmt::Formatter<'_>, name: &QName, ts: &[Term]) -> fmt::Result {
            if ts.is_empty() {
                write!(f, "{}", name.name)
            } else {
                write!(f, "({}", name.name)?;
                for t in ts {
                    write!(f, " {}", t)?;
                }
                write!(f, ")")
            }
        }
        match self {
            Term::Lit(l) => write!(f, "{}", l),
            Term::Cons(name, ts) => args(f, name, ts),
            Term::PartApp(name, ts) | Term::Susp(name, ts) => args(f, name, ts),
            Term::Free(id) => write!(f, "_x{}", id),
        }
    }
}

/// Detaches the value under `id` into an owned tree. Diverges on cyclic
/// data, the same way printing it would.
pub fn extract_term(graph: &Graph, id: NodeId) -> Term {
    let id = graph.resolve(id);
    match graph.get(id) {
        Node::Lit(l) => Term::Lit(l.clone()),
        Node::Cons(name, fields) => Term::Cons(
            name.clone(),
            fields.iter().map(|f| extract_term(graph, *f)).collect(),
        ),
        Node::PartApp { name, args, .. } => Term::PartApp(
            name.clone(),
            args.iter().map(|a| extract_term(graph, *a)).collect(),
        ),
        Node::Susp(name, args) => Term::Susp(
            name.clone(),
            args.iter().map(|a| extract_term(graph, *a)).collect(),
        ),
        Node::Free(None) => Term::Free(id.0),
        // resolve() chases these.
        Node::Ind(_) | Node::Free(Some(_)) => unreachable!("unresolved node after resolve"),
    }
}

pub fn unparse(graph: &Graph, id: NodeId) -> String {
    let mut budget = UNPARSE_MAX_NODES;
    let mut seen = HashSet::new();
    unparse_rec(graph, id, 0, &mut budget, &mut seen)
}

fn unparse_rec(
    graph: &Graph,
    id: NodeId,
    depth: usize,
    budget: &mut usize,
    seen: &mut HashSet<NodeId>,
) -> String {
    if *budget == 0 || depth > UNPARSE_MAX_DEPTH {
        return "...".to_string();
    }
    *budget -= 1;
    let id = graph.resolve(id);
    if !seen.insert(id) {
        return format!("<shared #{}>", id.0);
    }
    let out = match graph.get(id) {
        Node::Lit(l) => l.to_string(),
        Node::Free(None) => format!("_x{}", id.0),
        Node::Cons(name, fields) => spine(graph, &name.name, fields, depth, budget, seen),
        Node::Susp(name, args) => spine(graph, &name.name, args, depth, budget, seen),
        Node::PartApp { name, args, .. } => spine(graph, &name.name, args, depth, budget, seen),
        Node::Ind(_) | Node::Free(Some(_)) => unreachable!("unresolved node after resolve"),
    };
    seen.remove(&id);
    out
}

fn spine(
    graph: &Graph,
    head: &str,
    args: &[NodeId],
    depth: usize,
    budget: &mut usize,
    seen: &mut HashSet<NodeId>,
) -> String {
    if args.is_empty() {
        return head.to_string();
    }
    let mut out = format!("({}", head);
    for a in args {
        out.push(' ');
        out.push_str(&unparse_rec(graph, *a, depth + 1, budget, seen));
    }
    out.push(')');
    out
}

/// Short tag for diagnostics and snapshot labels.
pub fn node_kind(graph: &Graph, id: NodeId) -> &'static str {
    match graph.get(id) {
        Node::Susp(_, _) => "Susp",
        Node::Cons(_, _) => "Cons",
        Node::PartApp { .. } => "PartApp",
        Node::Lit(_) => "Lit",
        Node::Ind(_) => "Ind",
        Node::Free(None) => "Free",
        Node::Free(Some(_)) => "Bound",
    }
}
