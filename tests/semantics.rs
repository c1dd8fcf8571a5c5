mod common;

use common::*;
use graft::flat::{Expr, Function, Literal, Pattern, Program, QName, TypeDecl, Visibility};
use graft::lift::{lift_program, LiftOptions};

fn option_matrix() -> Vec<LiftOptions> {
    vec![
        LiftOptions::default(),
        LiftOptions {
            lift_case: false,
            lift_complex_scrutinee: true,
        },
        LiftOptions {
            lift_case: true,
            lift_complex_scrutinee: false,
        },
        LiftOptions {
            lift_case: false,
            lift_complex_scrutinee: false,
        },
    ]
}

/// The multiset of results must be identical before and after lifting,
/// for every option combination. The unlifted programs here keep their
/// nesting in body positions, which the evaluator handles directly.
fn assert_equivalent(p: &Program, entry: &str, expected: &[&str]) {
    let mut want: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    want.sort();
    assert_eq!(multiset(p, entry), want, "unlifted program");
    for opts in option_matrix() {
        let lifted = lift_program(&opts, p);
        assert_eq!(multiset(&lifted, entry), want, "lifted with {:?}", opts);
    }
}

#[test]
fn test_equivalence_choice_in_scrutinee() {
    // main = case (True ? False) of { True -> 1; False -> 0 }
    let m = "E";
    let true_c = Expr::cons(QName::prelude("True"), vec![]);
    let false_c = Expr::cons(QName::prelude("False"), vec![]);
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        case_of(or(true_c, false_c), bool_branches(Expr::int(1), Expr::int(0))),
    );
    let p = program(m, vec![main]);
    assert_equivalent(&p, "main", &["1", "0"]);
}

#[test]
fn test_equivalence_nested_cases_with_narrowing() {
    // main = let x, y free in
    //          case x of { True  -> case y of { True -> 11; False -> 10 }
    //                    ; False -> 0 }
    let m = "E";
    let inner = case_of(var(1), bool_branches(Expr::int(11), Expr::int(10)));
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        Expr::Free(
            vec![0, 1],
            Box::new(case_of(var(0), bool_branches(inner, Expr::int(0)))),
        ),
    );
    let p = program(m, vec![main]);
    assert_equivalent(&p, "main", &["11", "10", "0"]);
}

#[test]
fn test_equivalence_let_and_choice_in_branch_body() {
    // main = let x free in
    //          case x of { True  -> let z = 1 ? 2 in z + 10
    //                    ; False -> 3 }
    let m = "E";
    let then = Expr::Let(
        vec![(2, or(Expr::int(1), Expr::int(2)))],
        Box::new(plus(var(2), Expr::int(10))),
    );
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        Expr::Free(
            vec![0],
            Box::new(case_of(var(0), bool_branches(then, Expr::int(3)))),
        ),
    );
    let p = program(m, vec![main]);
    assert_equivalent(&p, "main", &["11", "12", "3"]);
}

#[test]
fn test_equivalence_deep_nesting() {
    // main = let w = (case (1 ? 2) of { 1 -> 5; 2 -> 6 })  -- via helper
    //        in case w of { 5 -> let u = w + 1 in u ? 0; 6 -> 7 }
    // The scrutinee choice, the inner let and the choice in the branch
    // body multiply out to [6, 0, 7].
    let m = "E";
    let helper = Function::defined(
        QName::new(m, "sel"),
        vec![],
        case_of(
            or(Expr::int(1), Expr::int(2)),
            vec![lit_branch(1, Expr::int(5)), lit_branch(2, Expr::int(6))],
        ),
    );
    let then = Expr::Let(
        vec![(1, plus(var(0), Expr::int(1)))],
        Box::new(or(var(1), Expr::int(0))),
    );
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        Expr::Let(
            vec![(0, Expr::func(QName::new(m, "sel"), vec![]))],
            Box::new(case_of(
                var(0),
                vec![lit_branch(5, then), lit_branch(6, Expr::int(7))],
            )),
        ),
    );
    let p = program(m, vec![helper, main]);
    assert_equivalent(&p, "main", &["6", "0", "7"]);
}

#[test]
fn test_choice_results_are_ordered_and_reproducible() {
    // main = (1 ? 2) ? 3
    let m = "E";
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        or(or(Expr::int(1), Expr::int(2)), Expr::int(3)),
    );
    let p = program(m, vec![main]);
    let lifted = lift_program(&LiftOptions::default(), &p);
    for _ in 0..3 {
        assert_eq!(run(&p, "main"), vec!["1", "2", "3"]);
        assert_eq!(run(&lifted, "main"), vec!["1", "2", "3"]);
    }
}

#[test]
fn test_shared_binding_evaluates_once_after_lifting() {
    // main = let y = 1 ? 2 in case True of { True -> normalForm (Pair y y) }
    // The branch body is extracted into a fresh function with y as its
    // parameter; sharing must survive the parameter passing, so the pair
    // never mixes the two alternatives.
    let m = "E";
    let branch_body = normal_form(pair(m, var(0), var(0)));
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        Expr::Let(
            vec![(0, or(Expr::int(1), Expr::int(2)))],
            Box::new(case_of(
                Expr::cons(QName::prelude("True"), vec![]),
                vec![graft::flat::Branch {
                    pattern: Pattern::Cons(QName::prelude("True"), vec![]),
                    body: branch_body,
                }],
            )),
        ),
    );
    let p = program(m, vec![main]);
    let lifted = lift_program(&LiftOptions::default(), &p);
    assert!(
        lifted.functions.iter().any(|f| f.name.name == "main_CASE0"
            || f.name.name == "main_COMPLEXCASE0"),
        "branch body or scrutinee must have been extracted"
    );
    for prog in [&p, &lifted] {
        assert_eq!(run(prog, "main"), vec!["(Pair 1 1)", "(Pair 2 2)"]);
    }
}

#[test]
fn test_let_binding_to_head_normal_form() {
    // main = let y = 5 in y + y
    let m = "E";
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        Expr::Let(vec![(0, Expr::int(5))], Box::new(plus(var(0), var(0)))),
    );
    let p = program(m, vec![main]);
    assert_equivalent(&p, "main", &["10"]);
}

#[test]
fn test_narrowing_is_closed_world_over_branches() {
    // data Color = Red | Green | Blue, but the case writes two branches:
    // narrowing must try exactly those two, not the declared third.
    let m = "E";
    let mut p = program(
        m,
        vec![Function::defined(
            QName::new(m, "main"),
            vec![],
            Expr::Free(
                vec![0],
                Box::new(case_of(
                    var(0),
                    vec![
                        graft::flat::Branch {
                            pattern: Pattern::Cons(QName::new(m, "Red"), vec![]),
                            body: Expr::int(1),
                        },
                        graft::flat::Branch {
                            pattern: Pattern::Cons(QName::new(m, "Green"), vec![]),
                            body: Expr::int(2),
                        },
                    ],
                )),
            ),
        )],
    );
    p.types.push(TypeDecl {
        name: QName::new(m, "Color"),
        visibility: Visibility::Public,
        constructors: vec![
            graft::flat::ConsDecl {
                name: QName::new(m, "Red"),
                arity: 0,
            },
            graft::flat::ConsDecl {
                name: QName::new(m, "Green"),
                arity: 0,
            },
            graft::flat::ConsDecl {
                name: QName::new(m, "Blue"),
                arity: 0,
            },
        ],
    });
    assert_eq!(run(&p, "main"), vec!["1", "2"]);
    let lifted = lift_program(&LiftOptions::default(), &p);
    assert_eq!(run(&lifted, "main"), vec!["1", "2"]);
}

#[test]
fn test_peano_narrowing_enumerates_addends() {
    // add x y = case x of { Z -> y; S n -> S (add n y) }
    // main = let x, y free in
    //          case (add x y) of { S n -> case n of { S m -> case m of
    //            { Z -> normalForm (Pair x y) } } }
    // i.e. all x, y with x + y == 2. Matching the sum against S (S Z)
    // keeps the search finite.
    let m = "E";
    let s = |e: Expr| Expr::cons(QName::new(m, "S"), vec![e]);
    let add = Function::defined(
        QName::new(m, "add"),
        vec![0, 1],
        case_of(
            var(0),
            vec![
                graft::flat::Branch {
                    pattern: Pattern::Cons(QName::new(m, "Z"), vec![]),
                    body: var(1),
                },
                graft::flat::Branch {
                    pattern: Pattern::Cons(QName::new(m, "S"), vec![2]),
                    body: s(Expr::func(QName::new(m, "add"), vec![var(2), var(1)])),
                },
            ],
        ),
    );
    // two = S (S Z); pairs (x, y) with x + y == two
    let innermost = |x: usize, y: usize| {
        normal_form(pair(m, var(x), var(y)))
    };
    let body = Expr::Free(
        vec![0, 1],
        Box::new(case_of(
            Expr::func(QName::new(m, "add"), vec![var(0), var(1)]),
            vec![graft::flat::Branch {
                pattern: Pattern::Cons(QName::new(m, "S"), vec![2]),
                body: case_of(
                    var(2),
                    vec![graft::flat::Branch {
                        pattern: Pattern::Cons(QName::new(m, "S"), vec![3]),
                        body: case_of(
                            var(3),
                            vec![graft::flat::Branch {
                                pattern: Pattern::Cons(QName::new(m, "Z"), vec![]),
                                body: innermost(0, 1),
                            }],
                        ),
                    }],
                ),
            }],
        )),
    );
    let main = Function::defined(QName::new(m, "main"), vec![], body);
    let p = program(m, vec![add, main]);
    // x narrows to Z, S Z, S (S Z); y is forced to make up the rest.
    let expected = vec![
        "(Pair (S (S Z)) Z)".to_string(),
        "(Pair (S Z) (S Z))".to_string(),
        "(Pair Z (S (S Z)))".to_string(),
    ];
    let mut want = expected.clone();
    want.sort();
    assert_eq!(multiset(&p, "main"), want);
    let lifted = lift_program(&LiftOptions::default(), &p);
    assert_eq!(multiset(&lifted, "main"), want);
}

#[test]
fn test_match_failure_is_reported_not_fatal() {
    // stuckCase = let x free in case x of {}
    // main = stuckCase ? 9
    let m = "E";
    let stuck = Function::defined(
        QName::new(m, "stuckCase"),
        vec![],
        Expr::Free(vec![0], Box::new(case_of(var(0), vec![]))),
    );
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        or(Expr::func(QName::new(m, "stuckCase"), vec![]), Expr::int(9)),
    );
    let p = program(m, vec![stuck, main]);
    let got = run(&p, "main");
    assert_eq!(
        got,
        vec!["<match failure in E.stuckCase>".to_string(), "9".to_string()]
    );
}

#[test]
fn test_literal_pattern_equivalence_with_chars() {
    // main = case ('a' ? 'b') of { 'a' -> 1; 'b' -> 2 }
    let m = "E";
    let ch = |c: char| Expr::Lit(Literal::Char(c));
    let main = Function::defined(
        QName::new(m, "main"),
        vec![],
        case_of(
            or(ch('a'), ch('b')),
            vec![
                graft::flat::Branch {
                    pattern: Pattern::Lit(Literal::Char('a')),
                    body: Expr::int(1),
                },
                graft::flat::Branch {
                    pattern: Pattern::Lit(Literal::Char('b')),
                    body: Expr::int(2),
                },
            ],
        ),
    );
    let p = program(m, vec![main]);
    assert_equivalent(&p, "main", &["1", "2"]);
}
