//! Human-readable program rendering for the reporting collaborator.

use std::fmt::Write;

use crate::flat::{Branch, CallKind, Expr, Function, Pattern, Program, Rule, Visibility};

/// Renders a whole program, one function per paragraph.
pub fn program(p: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "module {}", p.module);
    if !p.imports.is_empty() {
        let _ = writeln!(out, "imports: {}", p.imports.join(", "));
    }
    for t in &p.types {
        let cons: Vec<String> = t
            .constructors
            .iter()
            .map(|c| format!("{}/{}", c.name.name, c.arity))
            .collect();
        let _ = writeln!(out, "data {} = {}", t.name, cons.join(" | "));
    }
    for f in &p.functions {
        out.push('\n');
        out.push_str(&function(f));
    }
    out
}

pub fn function(f: &Function) -> String {
    let mut out = String::new();
    let vis = match f.visibility {
        Visibility::Public => "public",
        Visibility::Private => "private",
    };
    let _ = writeln!(out, "{} :: {}  -- arity {}, {}", f.name, f.result_type.0, f.arity, vis);
    match &f.rule {
        Rule::External(marker) => {
            let _ = writeln!(out, "{} external \"{}\"", f.name.name, marker);
        }
        Rule::Defined(params, body) => {
            let ps: Vec<String> = params.iter().map(|v| format!("x{}", v)).collect();
            let _ = writeln!(out, "{} {} =", f.name.name, ps.join(" "));
            expr(body, 1, &mut out);
        }
    }
    out
}

fn indent(depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn expr(e: &Expr, depth: usize, out: &mut String) {
    indent(depth, out);
    match e {
        Expr::Var(v) => {
            let _ = writeln!(out, "x{}", v);
        }
        Expr::Lit(l) => {
            let _ = writeln!(out, "{}", l);
        }
        Expr::Call(kind, name, args) => {
            let tag = match kind {
                CallKind::Func => "",
                CallKind::Cons => "!",
                CallKind::PartFunc(_) | CallKind::PartCons(_) => "~",
            };
            let _ = writeln!(out, "{}{}", tag, name);
            for a in args {
                expr(a, depth + 1, out);
            }
        }
        Expr::Case(scrut, branches) => {
            let _ = writeln!(out, "case");
            expr(scrut, depth + 1, out);
            indent(depth, out);
            let _ = writeln!(out, "of");
            for br in branches {
                branch(br, depth + 1, out);
            }
        }
        Expr::Let(binds, body) => {
            let _ = writeln!(out, "let");
            for (v, rhs) in binds {
                indent(depth + 1, out);
                let _ = writeln!(out, "x{} =", v);
                expr(rhs, depth + 2, out);
            }
            indent(depth, out);
            let _ = writeln!(out, "in");
            expr(body, depth + 1, out);
        }
        Expr::Free(vs, body) => {
            let names: Vec<String> = vs.iter().map(|v| format!("x{}", v)).collect();
            let _ = writeln!(out, "free {}", names.join(" "));
            expr(body, depth + 1, out);
        }
        Expr::Or(l, r) => {
            let _ = writeln!(out, "?");
            expr(l, depth + 1, out);
            expr(r, depth + 1, out);
        }
        Expr::Typed(inner, ty) => {
            let _ = writeln!(out, ":: {}", ty.0);
            expr(inner, depth + 1, out);
        }
    }
}

fn branch(br: &Branch, depth: usize, out: &mut String) {
    indent(depth, out);
    match &br.pattern {
        Pattern::Cons(name, vars) => {
            let vs: Vec<String> = vars.iter().map(|v| format!("x{}", v)).collect();
            let _ = writeln!(out, "{} {} ->", name.name, vs.join(" "));
        }
        Pattern::Lit(l) => {
            let _ = writeln!(out, "{} ->", l);
        }
    }
    expr(&br.body, depth + 1, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::QName;

    #[test]
    fn test_program_rendering_mentions_functions() {
        let mut p = Program::new("Demo");
        p.functions.push(crate::flat::Function::defined(
            QName::new("Demo", "two"),
            vec![],
            Expr::int(2),
        ));
        let text = program(&p);
        assert!(text.contains("module Demo"));
        assert!(text.contains("Demo.two"));
        assert!(text.contains("2"));
    }
}
