//! Persistence collaborator.
//!
//! Normalized programs are serialized as JSON under a fixed file-suffix
//! convention. The core stays encoding-agnostic; everything here goes
//! through the serde derives on the flat model.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::flat::Program;

/// Suffix for normalized (lifted) program files.
pub const NORMALIZED_SUFFIX: &str = ".norm.json";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Writes `program` to `<dir>/<module><NORMALIZED_SUFFIX>` and returns the
/// path written.
pub fn save_program(dir: &Path, program: &Program) -> Result<PathBuf, PersistError> {
    let path = dir.join(format!("{}{}", program.module, NORMALIZED_SUFFIX));
    let text = serde_json::to_string_pretty(program)?;
    fs::write(&path, text)?;
    Ok(path)
}

pub fn load_program(path: &Path) -> Result<Program, PersistError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flat::{Expr, Function, QName};

    #[test]
    fn test_round_trip_preserves_program() {
        let mut program = Program::new("Demo");
        program.imports.push("Prelude".to_string());
        program.functions.push(Function::defined(
            QName::new("Demo", "main"),
            vec![],
            Expr::Or(Box::new(Expr::int(1)), Box::new(Expr::int(2))),
        ));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = save_program(dir.path(), &program).expect("save");
        assert!(path.to_string_lossy().ends_with(NORMALIZED_SUFFIX));

        let loaded = load_program(&path).expect("load");
        assert_eq!(loaded, program);
    }
}
