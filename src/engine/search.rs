//! Choice/search controller.
//!
//! Pending alternatives form an explicit stack of (checkpoint,
//! continuation, resume-action) triples. Delivering the next result pops
//! an alternative, restores its checkpoint, reinstates its continuation
//! frames, applies the resume action and runs the machine on. The result
//! sequence is pull-based: the caller may stop consuming at any point, and
//! exploration is depth-first, left alternative before right, first
//! matching branch before later branches.

use crate::config::ExecConfig;
use crate::engine::reduce::{self, bind_pattern, commit};
use crate::engine::unparse::{extract_term, Term};
use crate::engine::{EvalAbort, EvalContext, GraphSnapshot, PathFail, ResumeAction, StepHook};
use crate::error::FatalError;
use crate::flat::{Function, Program, QName};
use crate::graph::{Args, Node};

/// One element of the result sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Solution(Term),
    /// A case with zero branches was reached in the named function.
    MatchFailure(QName),
}

/// Executes `config.entry` of a normalized program.
///
/// Head-normal-form results are delivered lazily; wrapping the entry body
/// in the normal-form combinator yields fully forced values instead.
pub fn execute<'p>(config: &ExecConfig, program: &'p Program) -> Result<Results<'p>, FatalError> {
    execute_with_hook(config, program, None)
}

pub fn execute_with_hook<'p>(
    config: &ExecConfig,
    program: &'p Program,
    hook: Option<Box<dyn StepHook>>,
) -> Result<Results<'p>, FatalError> {
    config.validate()?;
    let entry = resolve_entry(config, program)?;
    if entry.arity != 0 {
        return Err(FatalError::ArityMismatch {
            function: entry.name.clone(),
            name: entry.name.clone(),
            expected: entry.arity,
            given: 0,
        });
    }
    let mut ctx = EvalContext::new(config, program);
    ctx.hook = hook;
    ctx.current = entry.name.clone();
    ctx.root = ctx.graph.add(Node::Susp(entry.name.clone(), Args::new()));
    Ok(Results {
        ctx,
        started: false,
        finished: false,
    })
}

fn resolve_entry<'p>(
    config: &ExecConfig,
    program: &'p Program,
) -> Result<&'p Function, FatalError> {
    let wanted = &config.entry;
    program
        .functions
        .iter()
        .find(|f| f.name.name == *wanted || f.name.to_string() == *wanted)
        .ok_or_else(|| {
            let name = QName::new(&program.module, wanted);
            FatalError::UnresolvedName {
                function: name.clone(),
                name,
            }
        })
}

pub struct Results<'p> {
    ctx: EvalContext<'p>,
    started: bool,
    finished: bool,
}

impl Results<'_> {
    /// Reduction steps performed so far, across all explored paths.
    pub fn steps(&self) -> usize {
        self.ctx.steps
    }

    /// Alternatives still pending exploration.
    pub fn pending(&self) -> usize {
        self.ctx.alts.len()
    }

    fn result_snapshot(&mut self) {
        if self.ctx.show_graph_level < 1 {
            return;
        }
        if let Some(hook) = self.ctx.hook.as_mut() {
            let snap = GraphSnapshot::capture(
                &self.ctx.graph,
                self.ctx.root,
                self.ctx.steps,
                self.ctx.show_graph_level >= 3,
            );
            if !hook.on_step(&snap) {
                self.finished = true;
            }
        }
    }
}

impl Iterator for Results<'_> {
    type Item = Result<Outcome, FatalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            let attempt = if !self.started {
                self.started = true;
                let root = self.ctx.root;
                self.ctx.stack.clear();
                reduce::run(&mut self.ctx, root)
            } else {
                match self.ctx.alts.pop() {
                    None => {
                        self.finished = true;
                        return None;
                    }
                    Some(alt) => {
                        self.ctx.graph.restore(alt.mark);
                        self.ctx.stack = alt.stack;
                        let resumed = match alt.action {
                            ResumeAction::Redirect { redex, target } => {
                                commit(&mut self.ctx, redex, target).map(|()| target)
                            }
                            ResumeAction::Bind { var, pattern } => {
                                bind_pattern(&mut self.ctx, var, pattern);
                                self.ctx.step().map(|()| var)
                            }
                        };
                        resumed.and_then(|control| reduce::run(&mut self.ctx, control))
                    }
                }
            };
            match attempt {
                Ok(node) => {
                    self.result_snapshot();
                    let term = extract_term(&self.ctx.graph, node);
                    return Some(Ok(Outcome::Solution(term)));
                }
                Err(EvalAbort::Fail(PathFail::NoMatch)) => continue,
                Err(EvalAbort::Fail(PathFail::EmptyCase(func))) => {
                    return Some(Ok(Outcome::MatchFailure(func)));
                }
                Err(EvalAbort::Cancelled) => {
                    self.finished = true;
                    return None;
                }
                Err(EvalAbort::Fatal(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
