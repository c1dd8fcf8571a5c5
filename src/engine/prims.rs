//! External functions.
//!
//! A `Rule::External` body names a primitive by its marker string; dispatch
//! happens here. Strict primitives get their arguments forced through
//! machine frames before `apply_forced` computes the result; conditions
//! like division by zero fail the current search path, never the run.

use num_bigint::BigInt;
use num_traits::Zero;

use crate::engine::reduce::{commit, lit_node};
use crate::engine::{
    Alternative, ApplyStage, EvalAbort, EvalContext, EvalResult, Frame, PathFail, ResumeAction,
};
use crate::error::FatalError;
use crate::flat::{Function, Literal, QName, Rule};
use crate::graph::{Args, Node, NodeId, PartKind};

/// Standard external declarations. Programs built in code can splice these
/// in instead of re-declaring the primitives one by one.
pub fn prelude() -> Vec<Function> {
    vec![
        Function::external(QName::prelude("+"), 2, "prim_plusInt"),
        Function::external(QName::prelude("-"), 2, "prim_minusInt"),
        Function::external(QName::prelude("*"), 2, "prim_timesInt"),
        Function::external(QName::prelude("div"), 2, "prim_divInt"),
        Function::external(QName::prelude("mod"), 2, "prim_modInt"),
        Function::external(QName::prelude("=="), 2, "prim_eqInt"),
        Function::external(QName::prelude("<="), 2, "prim_ltEqInt"),
        Function::external(QName::prelude("eqChar"), 2, "prim_eqChar"),
        Function::external(QName::prelude("?"), 2, "prim_choice"),
        Function::external(QName::prelude("failed"), 0, "prim_failed"),
        Function::external(QName::prelude("apply"), 2, "prim_apply"),
        Function::external(QName::prelude("$!"), 2, "prim_strictApply"),
        Function::external(QName::prelude("normalForm"), 1, "prim_normalForm"),
    ]
}

/// Entry dispatch for a suspended external application. Returns the next
/// control node; strict primitives push a frame and hand control to their
/// first argument.
pub(crate) fn apply_external<'p>(
    ctx: &mut EvalContext<'p>,
    redex: NodeId,
    func: &'p Function,
    marker: &str,
    args: &Args,
) -> EvalResult<NodeId> {
    match marker {
        "prim_choice" => choice(ctx, redex, args),
        "prim_failed" => Err(EvalAbort::Fail(PathFail::NoMatch)),
        "prim_normalForm" => {
            ctx.stack.push(Frame::Nf {
                pending: Vec::new(),
                value: args[0],
                redex,
            });
            Ok(args[0])
        }
        "prim_apply" => {
            ctx.stack.push(Frame::Apply {
                redex,
                func: args[0],
                arg: args[1],
                stage: ApplyStage::Func,
            });
            Ok(args[0])
        }
        "prim_strictApply" => {
            // The argument is forced before the application proceeds.
            ctx.stack.push(Frame::Apply {
                redex,
                func: args[0],
                arg: args[1],
                stage: ApplyStage::Arg,
            });
            Ok(args[1])
        }
        "prim_plusInt" | "prim_minusInt" | "prim_timesInt" | "prim_divInt" | "prim_modInt"
        | "prim_eqInt" | "prim_ltEqInt" | "prim_eqChar" => {
            ctx.stack.push(Frame::Prim {
                redex,
                func,
                args: args.clone(),
                next: 1,
            });
            Ok(args[0])
        }
        _ => Err(EvalAbort::Fatal(FatalError::UnsupportedExternal {
            function: func.name.clone(),
            marker: marker.to_string(),
        })),
    }
}

/// The choice combinator: commit to the left argument, push the right one
/// as a pending alternative carrying the current continuation and a
/// checkpoint taken before the commit.
pub(crate) fn choice(ctx: &mut EvalContext<'_>, redex: NodeId, args: &Args) -> EvalResult<NodeId> {
    if args.len() != 2 {
        return Err(EvalAbort::Fatal(FatalError::ArityMismatch {
            function: ctx.current.clone(),
            name: QName::prelude("?"),
            expected: 2,
            given: args.len(),
        }));
    }
    let mark = ctx.graph.mark();
    ctx.alts.push(Alternative {
        mark,
        stack: ctx.stack.clone(),
        action: ResumeAction::Redirect {
            redex,
            target: args[1],
        },
    });
    commit(ctx, redex, args[0])?;
    Ok(args[0])
}

/// Computes a strict primitive whose arguments are all in head normal form.
pub(crate) fn apply_forced<'p>(
    ctx: &mut EvalContext<'p>,
    redex: NodeId,
    func: &'p Function,
    args: &Args,
) -> EvalResult<NodeId> {
    let marker = match &func.rule {
        Rule::External(m) => m.as_str(),
        Rule::Defined(_, _) => unreachable!("primitive frame for a defined function"),
    };
    let node = match marker {
        "prim_plusInt" | "prim_minusInt" | "prim_timesInt" | "prim_divInt" | "prim_modInt" => {
            let a = int_val(ctx, args[0])?;
            let b = int_val(ctx, args[1])?;
            let value = match marker {
                "prim_plusInt" => a + b,
                "prim_minusInt" => a - b,
                "prim_timesInt" => a * b,
                "prim_divInt" => {
                    if b.is_zero() {
                        return Err(EvalAbort::Fail(PathFail::NoMatch));
                    }
                    div_floor(&a, &b)
                }
                _ => {
                    if b.is_zero() {
                        return Err(EvalAbort::Fail(PathFail::NoMatch));
                    }
                    mod_floor(&a, &b)
                }
            };
            lit_node(ctx, Literal::Int(value))
        }
        "prim_eqInt" | "prim_ltEqInt" => {
            let a = int_val(ctx, args[0])?;
            let b = int_val(ctx, args[1])?;
            let truth = if marker == "prim_eqInt" { a == b } else { a <= b };
            bool_node(ctx, truth)
        }
        "prim_eqChar" => {
            let a = char_val(ctx, args[0])?;
            let b = char_val(ctx, args[1])?;
            bool_node(ctx, a == b)
        }
        _ => unreachable!("non-strict marker in primitive frame"),
    };
    commit(ctx, redex, node)?;
    Ok(node)
}

/// Completes a (strict) higher-order application: the function position is
/// in head normal form and must be a partial application.
pub(crate) fn saturate(
    ctx: &mut EvalContext<'_>,
    redex: NodeId,
    func: NodeId,
    arg: NodeId,
) -> EvalResult<NodeId> {
    match ctx.graph.get(func).clone() {
        Node::PartApp {
            kind,
            name,
            missing,
            args: mut held,
        } => {
            held.push(arg);
            let node = if missing == 1 {
                match kind {
                    PartKind::Cons => Node::Cons(name, held),
                    PartKind::Func => Node::Susp(name, held),
                }
            } else {
                Node::PartApp {
                    kind,
                    name,
                    missing: missing - 1,
                    args: held,
                }
            };
            let id = ctx.graph.add(node);
            commit(ctx, redex, id)?;
            Ok(id)
        }
        // Applying a non-function head normal form: stuck, path fails.
        _ => Err(EvalAbort::Fail(PathFail::NoMatch)),
    }
}

/// Reads a forced argument as an integer. A non-integer head normal form
/// (including an unbound variable) leaves the primitive stuck, failing the
/// path.
fn int_val(ctx: &EvalContext<'_>, id: NodeId) -> EvalResult<BigInt> {
    let id = ctx.graph.resolve(id);
    match ctx.graph.get(id) {
        Node::Lit(Literal::Int(i)) => Ok(i.clone()),
        _ => Err(EvalAbort::Fail(PathFail::NoMatch)),
    }
}

fn char_val(ctx: &EvalContext<'_>, id: NodeId) -> EvalResult<char> {
    let id = ctx.graph.resolve(id);
    match ctx.graph.get(id) {
        Node::Lit(Literal::Char(c)) => Ok(*c),
        _ => Err(EvalAbort::Fail(PathFail::NoMatch)),
    }
}

fn bool_node(ctx: &mut EvalContext<'_>, truth: bool) -> NodeId {
    let name = QName::prelude(if truth { "True" } else { "False" });
    ctx.graph.add(Node::Cons(name, Args::new()))
}

fn div_floor(a: &BigInt, b: &BigInt) -> BigInt {
    let q = a / b;
    let r = a % b;
    if !r.is_zero() && r.sign() != b.sign() {
        q - 1
    } else {
        q
    }
}

fn mod_floor(a: &BigInt, b: &BigInt) -> BigInt {
    let r = a % b;
    if !r.is_zero() && r.sign() != b.sign() {
        r + b
    } else {
        r
    }
}
