//! Parser for the kale language.
//!
//! Converts reader output (`Datum` trees) into the closed set of `Form`
//! nodes consumed by the code generator.

pub mod form;
pub mod parser;

pub use form::{Form, FunctionBinding, VariableBinding};
pub use parser::{parse, ParseError};
