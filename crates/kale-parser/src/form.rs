//! Form tree for the kale language.
//!
//! Each non-leaf form owns its children; there is no sharing. The tree is
//! built once by the parser and only rewritten afterwards by the letrec
//! capture pass in the code generator.

use kale_reader::{Datum, Symbol};

#[derive(Debug, Clone, PartialEq)]
pub enum Form {
    Number(f64),
    Symbol(Symbol),
    If {
        cond: Box<Form>,
        then: Box<Form>,
        otherwise: Box<Form>,
    },
    /// Sequential bindings: each definition sees the binders before it.
    Let {
        bindings: Vec<VariableBinding>,
        body: Box<Form>,
    },
    /// Mutually recursive local functions.
    Letrec {
        bindings: Vec<FunctionBinding>,
        body: Box<Form>,
    },
    Quote(Datum),
    Application {
        callee: Box<Form>,
        args: Vec<Form>,
    },
    Lambda {
        params: Vec<Symbol>,
        body: Box<Form>,
    },
}

/// `(binder definition)` inside a `let`.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableBinding {
    pub binder: Symbol,
    pub definition: Form,
}

/// `(binder (parameters...) definition)` inside a `letrec`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionBinding {
    pub binder: Symbol,
    pub parameters: Vec<Symbol>,
    pub definition: Form,
}

impl Form {
    pub fn apply(callee: Form, args: Vec<Form>) -> Form {
        Form::Application {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn if_(cond: Form, then: Form, otherwise: Form) -> Form {
        Form::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn lambda(params: Vec<Symbol>, body: Form) -> Form {
        Form::Lambda {
            params,
            body: Box::new(body),
        }
    }

    pub fn let_(bindings: Vec<VariableBinding>, body: Form) -> Form {
        Form::Let {
            bindings,
            body: Box::new(body),
        }
    }

    pub fn letrec(bindings: Vec<FunctionBinding>, body: Form) -> Form {
        Form::Letrec {
            bindings,
            body: Box::new(body),
        }
    }

    /// The symbol this form references, if it is a bare symbol.
    pub fn as_symbol(&self) -> Option<Symbol> {
        match self {
            Form::Symbol(s) => Some(*s),
            _ => None,
        }
    }

    /// Short node-kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Form::Number(_) => "number",
            Form::Symbol(_) => "symbol",
            Form::If { .. } => "if",
            Form::Let { .. } => "let",
            Form::Letrec { .. } => "letrec",
            Form::Quote(_) => "quote",
            Form::Application { .. } => "application",
            Form::Lambda { .. } => "lambda",
        }
    }
}
