//! Graph-rewriting evaluator.
//!
//! Executes a normalized program by head-normal-form reduction over the
//! graph store. The reduction loop is an explicit machine: pending demand
//! (case dispatch, primitive arguments, normal-form forcing) lives on a
//! frame stack, so a choice point can capture its continuation by cloning
//! that stack. Nondeterminism is handled by a stack of pending
//! alternatives; see `search`.

pub mod prims;
pub mod reduce;
pub mod search;
pub mod snapshot;
pub mod unparse;


pub use search::{execute, execute_with_hook, Outcome, Results};
pub use snapshot::GraphSnapshot;
pub use unparse::{extract_term, unparse, Term};

use rustc_hash::FxHashMap;

use crate::config::ExecConfig;
use crate::error::FatalError;
use crate::flat::{Branch, Function, Pattern, Program, QName, VarIndex};
use crate::graph::{Args, Checkpoint, Graph, NodeId};

/// Local variable index -> graph node, scoped per activation.
pub type Env = FxHashMap<VarIndex, NodeId>;

/// Invoked after each reduction step with a complete snapshot. Returning
/// `false` cancels the run; no further results are produced.
pub trait StepHook {
    fn on_step(&mut self, snapshot: &GraphSnapshot) -> bool;
}

/// Failure of the current search path only. Recovered by the controller.
#[derive(Debug)]
pub(crate) enum PathFail {
    /// No branch matched, or a primitive failed; the path dies silently.
    NoMatch,
    /// A case with zero branches; surfaced as a match-failure outcome.
    EmptyCase(QName),
}

pub(crate) enum EvalAbort {
    Fail(PathFail),
    Fatal(FatalError),
    Cancelled,
}

impl From<FatalError> for EvalAbort {
    fn from(e: FatalError) -> Self {
        EvalAbort::Fatal(e)
    }
}

pub(crate) type EvalResult<T> = Result<T, EvalAbort>;

/// Stage of a (strict) higher-order application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ApplyStage {
    /// Forcing the argument (strict apply only).
    Arg,
    /// Forcing the function position.
    Func,
}

/// One suspended demand on the machine stack. The stack as a whole is the
/// continuation of the current reduction; alternatives clone it so a
/// resumed path picks up exactly where the committed one branched off.
#[derive(Clone)]
pub(crate) enum Frame<'p> {
    /// Dispatch these branches once the scrutinee is in head normal form.
    Case {
        branches: &'p [Branch],
        env: Env,
        redex: NodeId,
        owner: QName,
    },
    /// Normal-form forcing: constructor fields still to force, then the
    /// redex is committed to `value`.
    Nf {
        pending: Vec<NodeId>,
        value: NodeId,
        redex: NodeId,
    },
    /// A primitive whose arguments are forced one by one before dispatch.
    Prim {
        redex: NodeId,
        func: &'p Function,
        args: Args,
        next: usize,
    },
    /// Higher-order application of a partial-application value.
    Apply {
        redex: NodeId,
        func: NodeId,
        arg: NodeId,
        stage: ApplyStage,
    },
}

/// How to continue when an alternative is resumed after restore.
pub(crate) enum ResumeAction<'p> {
    /// Right side of a committed choice: point the redex at it.
    Redirect { redex: NodeId, target: NodeId },
    /// Narrowing: bind the scrutinee variable to this pattern's fresh shape.
    Bind { var: NodeId, pattern: &'p Pattern },
}

pub(crate) struct Alternative<'p> {
    pub mark: Checkpoint,
    /// Continuation at the branch point.
    pub stack: Vec<Frame<'p>>,
    pub action: ResumeAction<'p>,
}

pub struct EvalContext<'p> {
    pub(crate) funcs: FxHashMap<&'p QName, &'p Function>,
    pub graph: Graph,
    pub(crate) stack: Vec<Frame<'p>>,
    pub(crate) alts: Vec<Alternative<'p>>,
    pub(crate) root: NodeId,
    /// Function currently being reduced; names the owner in fatal errors.
    pub(crate) current: QName,
    pub steps: usize,
    pub(crate) step_limit: usize,
    pub(crate) show_graph_level: u8,
    pub(crate) verbosity: u8,
    pub(crate) hook: Option<Box<dyn StepHook>>,
}

impl<'p> EvalContext<'p> {
    pub(crate) fn new(config: &ExecConfig, program: &'p Program) -> Self {
        let mut funcs: FxHashMap<&'p QName, &'p Function> = FxHashMap::default();
        for f in &program.functions {
            funcs.insert(&f.name, f);
        }
        EvalContext {
            funcs,
            graph: Graph::new(),
            stack: Vec::new(),
            alts: Vec::new(),
            root: NodeId::NULL,
            current: QName::new(&program.module, "<entry>"),
            steps: 0,
            step_limit: config.step_limit,
            show_graph_level: config.show_graph_level,
            verbosity: config.verbosity,
            hook: None,
        }
    }

    pub(crate) fn lookup(&self, name: &QName) -> Option<&'p Function> {
        self.funcs.get(name).copied()
    }

    /// Accounts one reduction step: limit check, diagnostics, step hook.
    pub(crate) fn step(&mut self) -> EvalResult<()> {
        self.steps += 1;
        if self.steps >= self.step_limit {
            return Err(EvalAbort::Fatal(FatalError::StepLimit {
                function: self.current.clone(),
                limit: self.step_limit,
            }));
        }
        if self.verbosity >= 3 {
            eprintln!(
                "REDUCE_STEP step={} nodes={} frames={} alts={} in={}",
                self.steps,
                self.graph.nodes.len(),
                self.stack.len(),
                self.alts.len(),
                self.current
            );
        }
        if self.show_graph_level >= 2 {
            if let Some(hook) = self.hook.as_mut() {
                let snap = GraphSnapshot::capture(
                    &self.graph,
                    self.root,
                    self.steps,
                    self.show_graph_level >= 3,
                );
                if !hook.on_step(&snap) {
                    return Err(EvalAbort::Cancelled);
                }
            }
        }
        Ok(())
    }
}
