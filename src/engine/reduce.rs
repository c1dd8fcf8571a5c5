//! Head-normal-form reduction machine.
//!
//! `run` drives a resolve-then-dispatch loop with an explicit frame stack.
//! Suspensions are replaced in place by an indirection to their result, so
//! a node shared through many references is reduced at most once per
//! search path. Demand arises only from case scrutinees, strict/primitive
//! argument positions and normal-form forcing; everything else is
//! instantiated unevaluated.

use crate::engine::{
    prims, Alternative, ApplyStage, Env, EvalAbort, EvalContext, EvalResult, Frame, PathFail,
    ResumeAction,
};
use crate::error::FatalError;
use crate::flat::{Branch, CallKind, Expr, Literal, Pattern, QName, Rule, VarIndex};
use crate::graph::{Args, Node, NodeId, PartKind};

/// Runs the machine until the control node is in head normal form and the
/// frame stack is empty. Called with an empty stack to force the root, and
/// with a resumed alternative's stack to continue a branched-off path.
pub(crate) fn run(ctx: &mut EvalContext<'_>, start: NodeId) -> EvalResult<NodeId> {
    let mut curr = start;
    if ctx.verbosity >= 3 {
        eprintln!("REDUCE_BEGIN root={} frames={}", curr.0, ctx.stack.len());
    }
    loop {
        curr = ctx.graph.resolve(curr);
        if let Node::Susp(name, args) = ctx.graph.get(curr) {
            let name = name.clone();
            let args = args.clone();
            curr = apply(ctx, curr, &name, &args)?;
            continue;
        }
        // Head normal form: literal, constructor, partial application or
        // unbound logic variable. Hand it to the suspended demand.
        match ctx.stack.pop() {
            None => return Ok(curr),
            Some(frame) => curr = resume_frame(ctx, frame, curr)?,
        }
    }
}

/// Rewrites `redex` to an indirection onto `target` and accounts the step.
pub(crate) fn commit(ctx: &mut EvalContext<'_>, redex: NodeId, target: NodeId) -> EvalResult<()> {
    ctx.graph.replace(redex, Node::Ind(target));
    ctx.step()
}

fn apply(
    ctx: &mut EvalContext<'_>,
    redex: NodeId,
    name: &QName,
    args: &Args,
) -> EvalResult<NodeId> {
    // The choice combinator is recognized ahead of program lookup so `Or`
    // works without a declaration for it.
    if name.module == "Prelude" && name.name == "?" {
        return prims::choice(ctx, redex, args);
    }
    let func = ctx.lookup(name).ok_or_else(|| FatalError::UnresolvedName {
        function: ctx.current.clone(),
        name: name.clone(),
    })?;
    if args.len() != func.arity {
        return Err(EvalAbort::Fatal(FatalError::ArityMismatch {
            function: ctx.current.clone(),
            name: name.clone(),
            expected: func.arity,
            given: args.len(),
        }));
    }
    match &func.rule {
        Rule::External(marker) => {
            let marker = marker.clone();
            prims::apply_external(ctx, redex, func, &marker, args)
        }
        Rule::Defined(params, body) => {
            let mut env = Env::default();
            for (p, a) in params.iter().zip(args.iter()) {
                env.insert(*p, *a);
            }
            ctx.current = func.name.clone();
            enter_body(ctx, body, env, redex)
        }
    }
}

/// Walks a function (or branch) body down to the next demand. Binding
/// constructs allocate as they are passed; a case pushes a dispatch frame
/// and returns its scrutinee as the new control; anything else is
/// instantiated, the redex committed onto it, and reduction continues
/// there.
fn enter_body<'p>(
    ctx: &mut EvalContext<'p>,
    body: &'p Expr,
    env: Env,
    redex: NodeId,
) -> EvalResult<NodeId> {
    let mut expr = body;
    let mut env = env;
    loop {
        match expr {
            Expr::Typed(e, _) => expr = &**e,
            Expr::Let(binds, inner) => {
                env = alloc_lets(ctx, binds, &env)?;
                expr = &**inner;
            }
            Expr::Free(vs, inner) => {
                env = alloc_free(ctx, vs, &env);
                expr = &**inner;
            }
            Expr::Case(scrut, branches) => {
                let s = instantiate(ctx, scrut, &env)?;
                ctx.stack.push(Frame::Case {
                    branches,
                    env,
                    redex,
                    owner: ctx.current.clone(),
                });
                return Ok(s);
            }
            _ => {
                let id = instantiate(ctx, expr, &env)?;
                commit(ctx, redex, id)?;
                return Ok(id);
            }
        }
    }
}

/// Continues the suspended demand on top of the stack, now that `curr` is
/// in head normal form.
fn resume_frame<'p>(
    ctx: &mut EvalContext<'p>,
    frame: Frame<'p>,
    curr: NodeId,
) -> EvalResult<NodeId> {
    match frame {
        Frame::Case {
            branches,
            env,
            redex,
            owner,
        } => dispatch_case(ctx, branches, env, redex, owner, curr),
        Frame::Nf {
            mut pending,
            value,
            redex,
        } => {
            if let Node::Cons(_, fields) = ctx.graph.get(curr) {
                // Leftmost field forced first.
                pending.extend(fields.iter().rev().map(|f| *f));
            }
            match pending.pop() {
                Some(next) => {
                    ctx.stack.push(Frame::Nf {
                        pending,
                        value,
                        redex,
                    });
                    Ok(next)
                }
                None => {
                    commit(ctx, redex, value)?;
                    Ok(value)
                }
            }
        }
        Frame::Prim {
            redex,
            func,
            args,
            next,
        } => {
            if next < args.len() {
                let control = args[next];
                ctx.stack.push(Frame::Prim {
                    redex,
                    func,
                    args,
                    next: next + 1,
                });
                Ok(control)
            } else {
                prims::apply_forced(ctx, redex, func, &args)
            }
        }
        Frame::Apply {
            redex,
            func,
            arg,
            stage,
        } => match stage {
            ApplyStage::Arg => {
                ctx.stack.push(Frame::Apply {
                    redex,
                    func,
                    arg,
                    stage: ApplyStage::Func,
                });
                Ok(func)
            }
            ApplyStage::Func => prims::saturate(ctx, redex, curr, arg),
        },
    }
}

fn dispatch_case<'p>(
    ctx: &mut EvalContext<'p>,
    branches: &'p [Branch],
    env: Env,
    redex: NodeId,
    owner: QName,
    scrut: NodeId,
) -> EvalResult<NodeId> {
    ctx.current = owner.clone();
    match ctx.graph.get(scrut).clone() {
        Node::Cons(cname, fields) => {
            for br in branches {
                if let Pattern::Cons(pname, vars) = &br.pattern {
                    if *pname == cname {
                        let mut env = env;
                        for (v, f) in vars.iter().zip(fields.iter()) {
                            env.insert(*v, *f);
                        }
                        return enter_body(ctx, &br.body, env, redex);
                    }
                }
            }
            no_match(&owner, branches)
        }
        Node::Lit(lit) => {
            for br in branches {
                if let Pattern::Lit(plit) = &br.pattern {
                    if *plit == lit {
                        return enter_body(ctx, &br.body, env, redex);
                    }
                }
            }
            no_match(&owner, branches)
        }
        Node::Free(None) => narrow(ctx, branches, env, redex, owner, scrut),
        // Partial applications can be scrutinized but match nothing.
        _ => no_match(&owner, branches),
    }
}

fn no_match(owner: &QName, branches: &[Branch]) -> EvalResult<NodeId> {
    if branches.is_empty() {
        Err(EvalAbort::Fail(PathFail::EmptyCase(owner.clone())))
    } else {
        Err(EvalAbort::Fail(PathFail::NoMatch))
    }
}

/// Case dispatch over an unbound logic variable: bind it to a fresh shape
/// per branch pattern actually written (closed world), push all branches
/// but the first as pending alternatives, proceed with the first. The
/// dispatch frame is re-pushed so the next machine iteration matches the
/// freshly bound shape through the ordinary path.
fn narrow<'p>(
    ctx: &mut EvalContext<'p>,
    branches: &'p [Branch],
    env: Env,
    redex: NodeId,
    owner: QName,
    var: NodeId,
) -> EvalResult<NodeId> {
    if branches.is_empty() {
        return Err(EvalAbort::Fail(PathFail::EmptyCase(owner)));
    }
    ctx.stack.push(Frame::Case {
        branches,
        env,
        redex,
        owner,
    });
    let mark = ctx.graph.mark();
    // Reversed so the next alternative popped is the next branch in order.
    for br in branches.iter().skip(1).rev() {
        ctx.alts.push(Alternative {
            mark,
            stack: ctx.stack.clone(),
            action: ResumeAction::Bind {
                var,
                pattern: &br.pattern,
            },
        });
    }
    bind_pattern(ctx, var, &branches[0].pattern);
    ctx.step()?;
    Ok(var)
}

/// Binds `var` to a fresh instance of `pattern`: a constructor over fresh
/// unbound variables, or the pattern literal.
pub(crate) fn bind_pattern(ctx: &mut EvalContext<'_>, var: NodeId, pattern: &Pattern) {
    let shape = match pattern {
        Pattern::Cons(name, vars) => {
            let fields: Args = vars.iter().map(|_| ctx.graph.add(Node::Free(None))).collect();
            ctx.graph.add(Node::Cons(name.clone(), fields))
        }
        Pattern::Lit(lit) => ctx.graph.add(Node::Lit(lit.clone())),
    };
    ctx.graph.bind(var, shape);
}

/// Builds the graph for an expression without reducing anything. Only flat
/// expressions can occur here once the program has been lifted; a case in
/// argument position means the input skipped the lifting pass.
pub(crate) fn instantiate<'p>(
    ctx: &mut EvalContext<'p>,
    expr: &'p Expr,
    env: &Env,
) -> EvalResult<NodeId> {
    match expr {
        Expr::Var(v) => env.get(v).copied().ok_or_else(|| {
            EvalAbort::Fatal(FatalError::UnboundVariable {
                function: ctx.current.clone(),
                index: *v,
            })
        }),
        Expr::Lit(l) => Ok(ctx.graph.add(Node::Lit(l.clone()))),
        Expr::Call(kind, name, args) => {
            let mut nodes = Args::new();
            for a in args {
                nodes.push(instantiate(ctx, a, env)?);
            }
            match kind {
                CallKind::Cons => Ok(ctx.graph.add(Node::Cons(name.clone(), nodes))),
                CallKind::Func => {
                    check_arity(ctx, name, nodes.len(), 0)?;
                    Ok(ctx.graph.add(Node::Susp(name.clone(), nodes)))
                }
                CallKind::PartFunc(missing) => {
                    check_arity(ctx, name, nodes.len(), *missing)?;
                    Ok(ctx.graph.add(Node::PartApp {
                        kind: PartKind::Func,
                        name: name.clone(),
                        missing: *missing,
                        args: nodes,
                    }))
                }
                CallKind::PartCons(missing) => Ok(ctx.graph.add(Node::PartApp {
                    kind: PartKind::Cons,
                    name: name.clone(),
                    missing: *missing,
                    args: nodes,
                })),
            }
        }
        Expr::Or(l, r) => {
            let ln = instantiate(ctx, l, env)?;
            let rn = instantiate(ctx, r, env)?;
            let mut args = Args::new();
            args.push(ln);
            args.push(rn);
            Ok(ctx.graph.add(Node::Susp(QName::prelude("?"), args)))
        }
        Expr::Let(binds, body) => {
            let env = alloc_lets(ctx, binds, env)?;
            instantiate(ctx, body, &env)
        }
        Expr::Free(vs, body) => {
            let env = alloc_free(ctx, vs, env);
            instantiate(ctx, body, &env)
        }
        Expr::Typed(e, _) => instantiate(ctx, e, env),
        Expr::Case(_, _) => Err(EvalAbort::Fatal(FatalError::UnliftedCase {
            function: ctx.current.clone(),
        })),
    }
}

fn check_arity(
    ctx: &EvalContext<'_>,
    name: &QName,
    given: usize,
    missing: usize,
) -> EvalResult<()> {
    if name.module == "Prelude" && name.name == "?" {
        return Ok(());
    }
    let func = ctx.lookup(name).ok_or_else(|| FatalError::UnresolvedName {
        function: ctx.current.clone(),
        name: name.clone(),
    })?;
    if given + missing != func.arity {
        return Err(EvalAbort::Fatal(FatalError::ArityMismatch {
            function: ctx.current.clone(),
            name: name.clone(),
            expected: func.arity.saturating_sub(missing),
            given,
        }));
    }
    Ok(())
}

/// Allocates let bindings. Right-hand sides may reference every name of
/// the same let, so each binding starts as a placeholder indirection that
/// is patched to its instantiated expression before anything resolves it.
fn alloc_lets<'p>(
    ctx: &mut EvalContext<'p>,
    binds: &'p [(VarIndex, Expr)],
    env: &Env,
) -> EvalResult<Env> {
    let mut env = env.clone();
    let holes: Vec<NodeId> = binds
        .iter()
        .map(|_| ctx.graph.add(Node::Ind(NodeId::NULL)))
        .collect();
    for ((v, _), hole) in binds.iter().zip(&holes) {
        env.insert(*v, *hole);
    }
    for ((_, rhs), hole) in binds.iter().zip(&holes) {
        let id = instantiate(ctx, rhs, &env)?;
        ctx.graph.replace(*hole, Node::Ind(id));
    }
    Ok(env)
}

fn alloc_free(ctx: &mut EvalContext<'_>, vs: &[VarIndex], env: &Env) -> Env {
    let mut env = env.clone();
    for v in vs {
        let node = ctx.graph.add(Node::Free(None));
        env.insert(*v, node);
    }
    env
}

/// Convenience for primitives producing literals.
pub(crate) fn lit_node(ctx: &mut EvalContext<'_>, lit: Literal) -> NodeId {
    ctx.graph.add(Node::Lit(lit))
}
