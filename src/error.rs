//! Fatal error taxonomy.
//!
//! Everything here aborts the whole invocation. Runtime failures of a
//! single search path (match failure, failed primitives) are not errors;
//! the search controller recovers from them silently.

use thiserror::Error;

use crate::config::ConfigError;
use crate::flat::QName;

#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{function}: unresolved name `{name}`")]
    UnresolvedName { function: QName, name: QName },

    #[error("{function}: `{name}` applied to {given} argument(s), expected {expected}")]
    ArityMismatch {
        function: QName,
        name: QName,
        expected: usize,
        given: usize,
    },

    #[error("{function}: unbound local variable {index}")]
    UnboundVariable { function: QName, index: usize },

    #[error("{function}: case expression in argument position; program is not in lifted form")]
    UnliftedCase { function: QName },

    #[error("{function}: unsupported external marker `{marker}`")]
    UnsupportedExternal { function: QName, marker: String },

    #[error("{function}: step limit of {limit} reductions exceeded")]
    StepLimit { function: QName, limit: usize },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
