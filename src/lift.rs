//! Lifting pass.
//!
//! Rewrites nested `Case`/`Let`/`Free`/`Or` constructs into calls to fresh
//! top-level functions over their free variables, so downstream stages only
//! ever see flat function bodies. The pass is a pure function of
//! (options, program); all state lives in an explicit context threaded
//! through the recursion.

use crate::flat::{
    Branch, Expr, Function, Program, QName, Rule, TypeAnn, VarIndex, Visibility,
};
use crate::freevars::{branch_free_vars, free_vars, max_var_index};
use crate::names::{LiftTag, NameAlloc};

#[derive(Debug, Clone, Copy)]
pub struct LiftOptions {
    /// Extract case expressions from branch bodies.
    pub lift_case: bool,
    /// Extract non-variable scrutinees into a trailing parameter.
    pub lift_complex_scrutinee: bool,
}

impl Default for LiftOptions {
    fn default() -> Self {
        LiftOptions {
            lift_case: true,
            lift_complex_scrutinee: true,
        }
    }
}

/// A synthesized function whose body has not itself been lifted yet.
struct SynthFn {
    name: QName,
    params: Vec<VarIndex>,
    body: Expr,
}

struct LiftCtx<'a> {
    opts: &'a LiftOptions,
    names: &'a mut NameAlloc,
    /// Unqualified name of the original function being processed; all
    /// synthesized names derive from it.
    base: String,
    counter: usize,
    pending: Vec<SynthFn>,
}

/// Lifts every function of `program`. Synthesized functions are appended
/// directly after their originator, in creation order.
pub fn lift_program(opts: &LiftOptions, program: &Program) -> Program {
    let mut names = NameAlloc::new(program);
    let mut functions = Vec::with_capacity(program.functions.len());

    for func in &program.functions {
        match &func.rule {
            Rule::External(_) => functions.push(func.clone()),
            Rule::Defined(params, body) => {
                let mut ctx = LiftCtx {
                    opts,
                    names: &mut names,
                    base: func.name.name.clone(),
                    counter: 0,
                    pending: Vec::new(),
                };
                let body = ctx.lift(body, false);
                functions.push(Function {
                    rule: Rule::Defined(params.clone(), body),
                    ..func.clone()
                });
                // Synthesized bodies are recursively lifted before emission;
                // lifting one may append further synthesized functions.
                let mut i = 0;
                while i < ctx.pending.len() {
                    let raw = ctx.pending[i].body.clone();
                    let lifted = ctx.lift(&raw, false);
                    let synth = &ctx.pending[i];
                    functions.push(Function {
                        name: synth.name.clone(),
                        arity: synth.params.len(),
                        visibility: Visibility::Private,
                        result_type: TypeAnn::unknown(),
                        rule: Rule::Defined(synth.params.clone(), lifted),
                    });
                    i += 1;
                }
            }
        }
    }

    Program {
        module: program.module.clone(),
        imports: program.imports.clone(),
        types: program.types.clone(),
        functions,
        ops: program.ops.clone(),
    }
}

impl LiftCtx<'_> {
    /// Rewrites one expression. `nested` means the expression occurs where a
    /// control construct cannot be represented inline and must be extracted
    /// if it is one.
    fn lift(&mut self, expr: &Expr, nested: bool) -> Expr {
        match expr {
            Expr::Var(_) | Expr::Lit(_) => expr.clone(),

            Expr::Call(kind, name, args) => {
                let args = args.iter().map(|a| self.lift(a, true)).collect();
                Expr::Call(*kind, name.clone(), args)
            }

            Expr::Case(scrut, branches) => self.lift_case(expr, scrut, branches, nested),

            Expr::Let(binds, body) => {
                if nested {
                    self.extract(LiftTag::Let, expr)
                } else {
                    let binds = binds
                        .iter()
                        .map(|(v, rhs)| (*v, self.lift(rhs, true)))
                        .collect();
                    Expr::Let(binds, Box::new(self.lift(body, true)))
                }
            }

            Expr::Free(vs, body) => {
                if nested {
                    self.extract(LiftTag::Free, expr)
                } else {
                    Expr::Free(vs.clone(), Box::new(self.lift(body, true)))
                }
            }

            // A choice point itself is never extracted; its arms are.
            Expr::Or(l, r) => Expr::Or(
                Box::new(self.lift(l, true)),
                Box::new(self.lift(r, true)),
            ),

            Expr::Typed(e, ty) => Expr::Typed(Box::new(self.lift(e, nested)), ty.clone()),
        }
    }

    fn lift_case(
        &mut self,
        whole: &Expr,
        scrut: &Expr,
        branches: &[Branch],
        nested: bool,
    ) -> Expr {
        let scrut_is_var = matches!(scrut, Expr::Var(_));

        if !scrut_is_var && self.opts.lift_complex_scrutinee {
            // Move the branches into a fresh function that scrutinizes a
            // trailing parameter; the lifted scrutinee is passed at the site.
            let lifted_scrut = self.lift(scrut, true);

            let mut free: Vec<VarIndex> = Vec::new();
            for br in branches {
                for v in branch_free_vars(br) {
                    if !free.contains(&v) {
                        free.push(v);
                    }
                }
            }
            let scrut_param = max_var_index(whole).map_or(0, |m| m + 1);

            let case_body = Expr::Case(Box::new(Expr::Var(scrut_param)), branches.to_vec());
            let mut params = free.clone();
            params.push(scrut_param);
            let name = self.synth(LiftTag::ComplexCase, params, case_body);

            let mut args: Vec<Expr> = free.into_iter().map(Expr::Var).collect();
            args.push(lifted_scrut);
            Expr::func(name, args)
        } else if nested {
            self.extract(LiftTag::Case, whole)
        } else {
            let scrut = self.lift(scrut, true);
            let lift_bodies = self.opts.lift_case;
            let branches = branches
                .iter()
                .map(|br| Branch {
                    pattern: br.pattern.clone(),
                    body: self.lift(&br.body, lift_bodies),
                })
                .collect();
            Expr::Case(Box::new(scrut), branches)
        }
    }

    /// Replaces `expr` with a call to a fresh function over its free
    /// variables, the expression itself becoming that function's body.
    fn extract(&mut self, tag: LiftTag, expr: &Expr) -> Expr {
        let free = free_vars(expr);
        let name = self.synth(tag, free.clone(), expr.clone());
        Expr::func(name, free.into_iter().map(Expr::Var).collect())
    }

    fn synth(&mut self, tag: LiftTag, params: Vec<VarIndex>, body: Expr) -> QName {
        let name = self.names.fresh(&self.base, tag, &mut self.counter);
        self.pending.push(SynthFn {
            name: name.clone(),
            params,
            body,
        });
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::{Literal, Pattern};

    fn bool_case(scrut: Expr) -> Expr {
        Expr::Case(
            Box::new(scrut),
            vec![
                Branch {
                    pattern: Pattern::Cons(QName::prelude("True"), vec![]),
                    body: Expr::int(1),
                },
                Branch {
                    pattern: Pattern::Cons(QName::prelude("False"), vec![]),
                    body: Expr::int(0),
                },
            ],
        )
    }

    fn program_of(funcs: Vec<Function>) -> Program {
        let mut p = Program::new("M");
        p.functions = funcs;
        p
    }

    #[test]
    fn test_case_as_call_argument_is_extracted() {
        // f x0 = id (case x0 of True -> 1; False -> 0)
        let body = Expr::func(QName::new("M", "id"), vec![bool_case(Expr::Var(0))]);
        let prog = program_of(vec![Function::defined(
            QName::new("M", "f"),
            vec![0],
            body,
        )]);

        let lifted = lift_program(&LiftOptions::default(), &prog);
        assert_eq!(lifted.functions.len(), 2);

        let synth = &lifted.functions[1];
        assert_eq!(synth.name.name, "f_CASE0");
        assert_eq!(synth.visibility, Visibility::Private);
        match &synth.rule {
            Rule::Defined(params, body) => {
                assert_eq!(params, &vec![0]);
                assert!(matches!(body, Expr::Case(_, _)));
            }
            _ => panic!("synthesized function must have a defined rule"),
        }

        match &lifted.functions[0].rule {
            Rule::Defined(_, Expr::Call(_, _, args)) => {
                assert_eq!(
                    args[0],
                    Expr::func(QName::new("M", "f_CASE0"), vec![Expr::Var(0)])
                );
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_complex_scrutinee_gets_trailing_parameter() {
        // f x0 = case (id x0) of True -> 1; False -> 0
        let body = bool_case(Expr::func(QName::new("M", "id"), vec![Expr::Var(0)]));
        let prog = program_of(vec![Function::defined(
            QName::new("M", "f"),
            vec![0],
            body,
        )]);

        let lifted = lift_program(&LiftOptions::default(), &prog);
        let synth = &lifted.functions[1];
        assert_eq!(synth.name.name, "f_COMPLEXCASE0");
        match &synth.rule {
            Rule::Defined(params, Expr::Case(scrut, _)) => {
                // No free variables in the branches, only the scrutinee slot.
                assert_eq!(params.len(), 1);
                assert_eq!(**scrut, Expr::Var(params[0]));
            }
            other => panic!("unexpected rule {:?}", other),
        }
        match &lifted.functions[0].rule {
            Rule::Defined(_, Expr::Call(_, name, args)) => {
                assert_eq!(name.name, "f_COMPLEXCASE0");
                assert_eq!(args.len(), 1);
                assert!(matches!(args[0], Expr::Call(_, _, _)));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_top_level_let_keeps_shape() {
        // f = let x0 = 5 in add x0 x0
        let body = Expr::Let(
            vec![(0, Expr::int(5))],
            Box::new(Expr::func(
                QName::new("M", "add"),
                vec![Expr::Var(0), Expr::Var(0)],
            )),
        );
        let prog = program_of(vec![Function::defined(QName::new("M", "f"), vec![], body)]);
        let lifted = lift_program(&LiftOptions::default(), &prog);
        assert_eq!(lifted.functions.len(), 1);
        assert!(matches!(
            lifted.functions[0].rule,
            Rule::Defined(_, Expr::Let(_, _))
        ));
    }

    #[test]
    fn test_nested_let_in_argument_is_extracted() {
        // f x0 = id (let x1 = x0 in x1)
        let body = Expr::func(
            QName::new("M", "id"),
            vec![Expr::Let(vec![(1, Expr::Var(0))], Box::new(Expr::Var(1)))],
        );
        let prog = program_of(vec![Function::defined(
            QName::new("M", "f"),
            vec![0],
            body,
        )]);
        let lifted = lift_program(&LiftOptions::default(), &prog);
        assert_eq!(lifted.functions.len(), 2);
        assert_eq!(lifted.functions[1].name.name, "f_LET0");
    }

    #[test]
    fn test_choice_arms_are_lifted_but_choice_stays() {
        // f x0 = (let x1 = x0 in x1) ? x0
        let body = Expr::Or(
            Box::new(Expr::Let(vec![(1, Expr::Var(0))], Box::new(Expr::Var(1)))),
            Box::new(Expr::Var(0)),
        );
        let prog = program_of(vec![Function::defined(
            QName::new("M", "f"),
            vec![0],
            body,
        )]);
        let lifted = lift_program(&LiftOptions::default(), &prog);
        match &lifted.functions[0].rule {
            Rule::Defined(_, Expr::Or(l, _)) => {
                assert!(matches!(**l, Expr::Call(_, _, _)));
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(lifted.functions[1].name.name, "f_LET0");
    }

    #[test]
    fn test_typed_wrapper_is_preserved() {
        let body = Expr::Typed(Box::new(Expr::Var(0)), TypeAnn("Int".into()));
        let prog = program_of(vec![Function::defined(
            QName::new("M", "f"),
            vec![0],
            body.clone(),
        )]);
        let lifted = lift_program(&LiftOptions::default(), &prog);
        assert!(matches!(
            &lifted.functions[0].rule,
            Rule::Defined(_, Expr::Typed(_, ty)) if ty.0 == "Int"
        ));
    }

    #[test]
    fn test_pattern_literals_survive_unchanged() {
        let case = Expr::Case(
            Box::new(Expr::Var(0)),
            vec![Branch {
                pattern: Pattern::Lit(Literal::Int(3.into())),
                body: Expr::int(1),
            }],
        );
        let prog = program_of(vec![Function::defined(
            QName::new("M", "f"),
            vec![0],
            case.clone(),
        )]);
        let lifted = lift_program(&LiftOptions::default(), &prog);
        match &lifted.functions[0].rule {
            Rule::Defined(_, Expr::Case(_, branches)) => {
                assert_eq!(branches[0].pattern, Pattern::Lit(Literal::Int(3.into())));
            }
            other => panic!("unexpected body {:?}", other),
        }
    }
}
