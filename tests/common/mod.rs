#![allow(dead_code)]

use graft::config::ExecConfig;
use graft::engine::prims::prelude;
use graft::engine::{execute, Outcome};
use graft::flat::{Branch, Expr, Function, Pattern, Program, QName};

/// A test module with the standard externals spliced in.
pub fn program(module: &str, funcs: Vec<Function>) -> Program {
    let mut p = Program::new(module);
    p.functions = prelude();
    p.functions.extend(funcs);
    p
}

pub fn var(i: usize) -> Expr {
    Expr::Var(i)
}

pub fn plus(a: Expr, b: Expr) -> Expr {
    Expr::func(QName::prelude("+"), vec![a, b])
}

pub fn or(a: Expr, b: Expr) -> Expr {
    Expr::Or(Box::new(a), Box::new(b))
}

pub fn pair(module: &str, a: Expr, b: Expr) -> Expr {
    Expr::cons(QName::new(module, "Pair"), vec![a, b])
}

pub fn normal_form(e: Expr) -> Expr {
    Expr::func(QName::prelude("normalForm"), vec![e])
}

pub fn bool_branches(then: Expr, otherwise: Expr) -> Vec<Branch> {
    vec![
        Branch {
            pattern: Pattern::Cons(QName::prelude("True"), vec![]),
            body: then,
        },
        Branch {
            pattern: Pattern::Cons(QName::prelude("False"), vec![]),
            body: otherwise,
        },
    ]
}

pub fn case_of(scrut: Expr, branches: Vec<Branch>) -> Expr {
    Expr::Case(Box::new(scrut), branches)
}

pub fn lit_branch(n: i64, body: Expr) -> Branch {
    Branch {
        pattern: Pattern::Lit(graft::flat::Literal::Int(n.into())),
        body,
    }
}

/// Runs `entry` and renders each outcome, in delivery order.
pub fn run(p: &Program, entry: &str) -> Vec<String> {
    let mut cfg = ExecConfig::default();
    cfg.entry = entry.to_string();
    execute(&cfg, p)
        .expect("startup")
        .map(|r| match r.expect("no fatal error") {
            Outcome::Solution(t) => t.to_string(),
            Outcome::MatchFailure(f) => format!("<match failure in {}>", f),
        })
        .collect()
}

/// Result multiset: delivery order forgotten.
pub fn multiset(p: &Program, entry: &str) -> Vec<String> {
    let mut v = run(p, entry);
    v.sort();
    v
}
