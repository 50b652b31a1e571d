//! Closure conversion and code generation for kale.
//!
//! The [`Compiler`] walks a parsed [`kale_parser::Form`] tree and emits
//! Cranelift IR into any [`cranelift_module::Module`]. `letrec` functions
//! become direct-call routines that receive their captured variables as extra
//! trailing parameters; `lambda` becomes a routine plus a heap closure
//! carrying a copy of the captured values. Calls through closure values go
//! through one generated trampoline per argument count.
//!
//! [`backend`] builds the JIT and object-file modules and turns a finished
//! compilation into something runnable.

pub mod abi;
pub mod backend;
pub mod capture;
pub mod compiler;
pub mod error;
pub mod free_vars;
pub mod options;
pub mod scope;
pub mod trampoline;

pub use backend::{jit_module, object_module, Program};
pub use compiler::Compiler;
pub use error::CompileError;
pub use options::CompileOptions;
