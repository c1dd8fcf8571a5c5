//! Flat program representation.
//!
//! This is the exchange format between the front end, the lifting pass and
//! the evaluator: a module with its functions, where every function body is
//! an expression tree over de-Bruijn-free integer variable indices. Values
//! of these types are built once and never mutated afterwards.

use std::fmt;

use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

pub type VarIndex = usize;

/// A module-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub module: String,
    pub name: String,
}

impl QName {
    pub fn new(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
        }
    }

    pub fn prelude(name: &str) -> Self {
        Self::new("Prelude", name)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(BigInt),
    Float(f64),
    Char(char),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::Char(c) => write!(f, "{:?}", c),
        }
    }
}

/// How an application node uses its name.
///
/// `PartFunc`/`PartCons` carry the number of arguments still missing; a
/// partial application is a value until saturated through `prim_apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallKind {
    Func,
    Cons,
    PartFunc(usize),
    PartCons(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Var(VarIndex),
    Lit(Literal),
    Call(CallKind, QName, Vec<Expr>),
    Case(Box<Expr>, Vec<Branch>),
    Let(Vec<(VarIndex, Expr)>, Box<Expr>),
    Free(Vec<VarIndex>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Typed(Box<Expr>, TypeAnn),
}

impl Expr {
    pub fn int(n: i64) -> Expr {
        Expr::Lit(Literal::Int(BigInt::from(n)))
    }

    pub fn func(name: QName, args: Vec<Expr>) -> Expr {
        Expr::Call(CallKind::Func, name, args)
    }

    pub fn cons(name: QName, args: Vec<Expr>) -> Expr {
        Expr::Call(CallKind::Cons, name, args)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Cons(QName, Vec<VarIndex>),
    Lit(Literal),
}

impl Pattern {
    /// Variables bound by this pattern in the branch body.
    pub fn bound_vars(&self) -> &[VarIndex] {
        match self {
            Pattern::Cons(_, vars) => vars,
            Pattern::Lit(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub pattern: Pattern,
    pub body: Expr,
}

/// Opaque type annotation. Carried through lifting and persistence verbatim,
/// never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAnn(pub String);

impl TypeAnn {
    pub fn unknown() -> Self {
        TypeAnn("_".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rule {
    /// Parameter variable indices and the body expression.
    Defined(Vec<VarIndex>, Expr),
    /// Implemented by the evaluator; the marker selects the primitive.
    External(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: QName,
    pub arity: usize,
    pub visibility: Visibility,
    pub result_type: TypeAnn,
    pub rule: Rule,
}

impl Function {
    pub fn defined(name: QName, params: Vec<VarIndex>, body: Expr) -> Self {
        Function {
            name,
            arity: params.len(),
            visibility: Visibility::Public,
            result_type: TypeAnn::unknown(),
            rule: Rule::Defined(params, body),
        }
    }

    pub fn external(name: QName, arity: usize, marker: &str) -> Self {
        Function {
            name,
            arity,
            visibility: Visibility::Public,
            result_type: TypeAnn::unknown(),
            rule: Rule::External(marker.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsDecl {
    pub name: QName,
    pub arity: usize,
}

/// Datatype declaration. The constructor list is carried for completeness of
/// the exchange format; the evaluator never consults it (narrowing is
/// closed-world over the branch patterns actually written).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: QName,
    pub visibility: Visibility,
    pub constructors: Vec<ConsDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fixity {
    InfixL,
    InfixR,
    InfixN,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpDecl {
    pub name: QName,
    pub fixity: Fixity,
    pub precedence: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub module: String,
    pub imports: Vec<String>,
    pub types: Vec<TypeDecl>,
    pub functions: Vec<Function>,
    pub ops: Vec<OpDecl>,
}

impl Program {
    pub fn new(module: &str) -> Self {
        Program {
            module: module.to_string(),
            imports: Vec::new(),
            types: Vec::new(),
            functions: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn function(&self, name: &QName) -> Option<&Function> {
        self.functions.iter().find(|f| &f.name == name)
    }
}
