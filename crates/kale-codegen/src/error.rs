use cranelift_module::ModuleError;

/// Everything that can abort compilation of a top-level form.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unbound variable `{0}`")]
    UnboundVariable(String),

    #[error("`{0}` is a function and cannot be used as a value")]
    NotAValue(String),

    #[error("`{name}` takes {expected} argument(s) but was called with {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot capture `{0}`: it is not a value of the enclosing routine")]
    Capture(String),

    #[error("a {0} cannot be called")]
    UnsupportedForm(&'static str),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type Result<T, E = CompileError> = std::result::Result<T, E>;
