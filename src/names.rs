//! Fresh top-level name allocation for the lifting pass.

use rustc_hash::FxHashSet;

use crate::flat::{Program, QName};

/// Suffix tag identifying which construct a synthesized function replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiftTag {
    Case,
    ComplexCase,
    Let,
    Free,
}

impl LiftTag {
    pub fn as_str(self) -> &'static str {
        match self {
            LiftTag::Case => "CASE",
            LiftTag::ComplexCase => "COMPLEXCASE",
            LiftTag::Let => "LET",
            LiftTag::Free => "FREE",
        }
    }
}

/// Allocates `<base>_<TAG><n>` names that are unique within the module.
///
/// The taken set is seeded with every function name of the input program and
/// grows with each allocation, so generated names collide neither with
/// pre-existing names nor with each other. The caller-owned counter advances
/// on every attempt; the taken set is finite, so the retry loop terminates.
pub struct NameAlloc {
    module: String,
    taken: FxHashSet<String>,
}

impl NameAlloc {
    pub fn new(program: &Program) -> Self {
        let taken = program
            .functions
            .iter()
            .map(|f| f.name.name.clone())
            .collect();
        NameAlloc {
            module: program.module.clone(),
            taken,
        }
    }

    pub fn fresh(&mut self, base: &str, tag: LiftTag, counter: &mut usize) -> QName {
        loop {
            let candidate = format!("{}_{}{}", base, tag.as_str(), *counter);
            *counter += 1;
            if self.taken.insert(candidate.clone()) {
                return QName {
                    module: self.module.clone(),
                    name: candidate,
                };
            }
        }
    }
}
