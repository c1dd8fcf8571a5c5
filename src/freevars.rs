//! Free-variable analysis.
//!
//! The result order matters: it fixes the parameter order of functions the
//! lifting pass synthesizes, so occurrences are reported deduplicated in
//! first-occurrence order.

use crate::flat::{Branch, Expr, VarIndex};

/// Free variables of `expr`, deduplicated, in first-occurrence order.
pub fn free_vars(expr: &Expr) -> Vec<VarIndex> {
    let mut acc = Vec::new();
    let mut bound = Vec::new();
    collect(expr, &mut bound, &mut acc);
    acc
}

fn collect(expr: &Expr, bound: &mut Vec<VarIndex>, acc: &mut Vec<VarIndex>) {
    match expr {
        Expr::Var(v) => {
            if !bound.contains(v) && !acc.contains(v) {
                acc.push(*v);
            }
        }
        Expr::Lit(_) => {}
        Expr::Call(_, _, args) => {
            for a in args {
                collect(a, bound, acc);
            }
        }
        Expr::Or(l, r) => {
            collect(l, bound, acc);
            collect(r, bound, acc);
        }
        Expr::Typed(e, _) => collect(e, bound, acc),
        Expr::Free(vs, body) => {
            let depth = bound.len();
            bound.extend_from_slice(vs);
            collect(body, bound, acc);
            bound.truncate(depth);
        }
        Expr::Let(binds, body) => {
            // The bound names scope over the right-hand sides as well, so
            // the subtraction applies uniformly across body and bindings.
            let depth = bound.len();
            bound.extend(binds.iter().map(|(v, _)| *v));
            collect(body, bound, acc);
            for (_, rhs) in binds {
                collect(rhs, bound, acc);
            }
            bound.truncate(depth);
        }
        Expr::Case(scrut, branches) => {
            collect(scrut, bound, acc);
            for br in branches {
                let depth = bound.len();
                bound.extend_from_slice(br.pattern.bound_vars());
                collect(&br.body, bound, acc);
                bound.truncate(depth);
            }
        }
    }
}

/// Free variables of a branch body, pattern binders excluded.
pub fn branch_free_vars(branch: &Branch) -> Vec<VarIndex> {
    let mut acc = Vec::new();
    let mut bound = branch.pattern.bound_vars().to_vec();
    collect(&branch.body, &mut bound, &mut acc);
    acc
}

/// Largest variable index occurring anywhere in `expr`, binders and pattern
/// variables included. Used to pick indices that collide with nothing.
pub fn max_var_index(expr: &Expr) -> Option<VarIndex> {
    fn walk(expr: &Expr, max: &mut Option<VarIndex>) {
        let mut note = |v: VarIndex, max: &mut Option<VarIndex>| {
            *max = Some(max.map_or(v, |m| m.max(v)));
        };
        match expr {
            Expr::Var(v) => note(*v, max),
            Expr::Lit(_) => {}
            Expr::Call(_, _, args) => args.iter().for_each(|a| walk(a, max)),
            Expr::Or(l, r) => {
                walk(l, max);
                walk(r, max);
            }
            Expr::Typed(e, _) => walk(e, max),
            Expr::Free(vs, body) => {
                vs.iter().for_each(|v| note(*v, max));
                walk(body, max);
            }
            Expr::Let(binds, body) => {
                for (v, rhs) in binds {
                    note(*v, max);
                    walk(rhs, max);
                }
                walk(body, max);
            }
            Expr::Case(scrut, branches) => {
                walk(scrut, max);
                for br in branches {
                    br.pattern.bound_vars().iter().for_each(|v| note(*v, max));
                    walk(&br.body, max);
                }
            }
        }
    }
    let mut max = None;
    walk(expr, &mut max);
    max
}
