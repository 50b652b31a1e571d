//! Parser from s-expressions to forms.
//!
//! Special forms are recognised by comparing the head symbol's interned
//! handle against the keyword handles, never by string comparison:
//! - `(if cond then else)`
//! - `(let ((x e) ...) body)`
//! - `(letrec ((f (p ...) e) ...) body)`
//! - `(quote datum)`
//! - `(lambda (p ...) body)`
//!
//! Any other list is an application. `nil` in code position is the quoted
//! empty list.

use kale_reader::{Datum, Interner, Symbol};

use crate::form::{Form, FunctionBinding, VariableBinding};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error: {msg}")]
pub struct ParseError {
    pub msg: String,
}

/// Convenience function to parse a single datum into a form.
pub fn parse(datum: &Datum, interner: &mut Interner) -> Result<Form, ParseError> {
    Parser::new(interner).parse(datum)
}

struct Keywords {
    if_: Symbol,
    let_: Symbol,
    letrec: Symbol,
    quote: Symbol,
    lambda: Symbol,
}

pub struct Parser<'i> {
    keywords: Keywords,
    interner: &'i Interner,
}

impl<'i> Parser<'i> {
    pub fn new(interner: &'i mut Interner) -> Self {
        let keywords = Keywords {
            if_: interner.intern("if"),
            let_: interner.intern("let"),
            letrec: interner.intern("letrec"),
            quote: interner.intern("quote"),
            lambda: interner.intern("lambda"),
        };
        Parser { keywords, interner }
    }

    fn error(&self, msg: impl Into<String>) -> ParseError {
        ParseError { msg: msg.into() }
    }

    fn show(&self, datum: &Datum) -> String {
        datum.display(self.interner).to_string()
    }

    pub fn parse(&self, datum: &Datum) -> Result<Form, ParseError> {
        match datum {
            Datum::Number(n) => Ok(Form::Number(*n)),
            Datum::Symbol(s) => Ok(Form::Symbol(*s)),
            Datum::Nil => Ok(Form::Quote(Datum::Nil)),
            Datum::Pair(head, _) => {
                let items = datum
                    .as_list()
                    .ok_or_else(|| self.error(format!("improper list in code: {}", self.show(datum))))?;
                let args = &items[1..];
                match head.as_ref() {
                    Datum::Symbol(s) if *s == self.keywords.if_ => self.parse_if(datum, args),
                    Datum::Symbol(s) if *s == self.keywords.let_ => self.parse_let(datum, args),
                    Datum::Symbol(s) if *s == self.keywords.letrec => self.parse_letrec(datum, args),
                    Datum::Symbol(s) if *s == self.keywords.quote => self.parse_quote(datum, args),
                    Datum::Symbol(s) if *s == self.keywords.lambda => self.parse_lambda(datum, args),
                    _ => self.parse_application(head, args),
                }
            }
        }
    }

    fn expect_arity(&self, whole: &Datum, args: &[&Datum], n: usize) -> Result<(), ParseError> {
        if args.len() != n {
            return Err(self.error(format!(
                "expected {} operand(s), found {}: {}",
                n,
                args.len(),
                self.show(whole)
            )));
        }
        Ok(())
    }

    fn parse_if(&self, whole: &Datum, args: &[&Datum]) -> Result<Form, ParseError> {
        self.expect_arity(whole, args, 3)?;
        Ok(Form::if_(
            self.parse(args[0])?,
            self.parse(args[1])?,
            self.parse(args[2])?,
        ))
    }

    fn parse_let(&self, whole: &Datum, args: &[&Datum]) -> Result<Form, ParseError> {
        self.expect_arity(whole, args, 2)?;
        let mut bindings = Vec::new();
        for binding in self.list_of(args[0], "let bindings")? {
            let parts = self.list_of(binding, "let binding")?;
            if parts.len() != 2 {
                return Err(self.error(format!("malformed let binding: {}", self.show(binding))));
            }
            bindings.push(VariableBinding {
                binder: self.symbol(parts[0], "let binder")?,
                definition: self.parse(parts[1])?,
            });
        }
        Ok(Form::let_(bindings, self.parse(args[1])?))
    }

    fn parse_letrec(&self, whole: &Datum, args: &[&Datum]) -> Result<Form, ParseError> {
        self.expect_arity(whole, args, 2)?;
        let mut bindings = Vec::new();
        for binding in self.list_of(args[0], "letrec bindings")? {
            let parts = self.list_of(binding, "letrec binding")?;
            if parts.len() != 3 {
                return Err(self.error(format!(
                    "malformed letrec binding: {}",
                    self.show(binding)
                )));
            }
            bindings.push(FunctionBinding {
                binder: self.symbol(parts[0], "letrec binder")?,
                parameters: self.parameters(parts[1])?,
                definition: self.parse(parts[2])?,
            });
        }
        Ok(Form::letrec(bindings, self.parse(args[1])?))
    }

    fn parse_quote(&self, whole: &Datum, args: &[&Datum]) -> Result<Form, ParseError> {
        self.expect_arity(whole, args, 1)?;
        Ok(Form::Quote(args[0].clone()))
    }

    fn parse_lambda(&self, whole: &Datum, args: &[&Datum]) -> Result<Form, ParseError> {
        self.expect_arity(whole, args, 2)?;
        Ok(Form::lambda(self.parameters(args[0])?, self.parse(args[1])?))
    }

    fn parse_application(&self, head: &Datum, args: &[&Datum]) -> Result<Form, ParseError> {
        let callee = self.parse(head)?;
        let args = args
            .iter()
            .map(|a| self.parse(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Form::apply(callee, args))
    }

    fn list_of<'d>(&self, datum: &'d Datum, what: &str) -> Result<Vec<&'d Datum>, ParseError> {
        datum
            .as_list()
            .ok_or_else(|| self.error(format!("{} must be a list: {}", what, self.show(datum))))
    }

    fn symbol(&self, datum: &Datum, what: &str) -> Result<Symbol, ParseError> {
        match datum {
            Datum::Symbol(s) => Ok(*s),
            other => Err(self.error(format!("{} must be a symbol: {}", what, self.show(other)))),
        }
    }

    fn parameters(&self, datum: &Datum) -> Result<Vec<Symbol>, ParseError> {
        let params = self
            .list_of(datum, "parameter list")?
            .into_iter()
            .map(|p| self.symbol(p, "parameter"))
            .collect::<Result<Vec<_>, _>>()?;
        for (i, p) in params.iter().enumerate() {
            if params[..i].contains(p) {
                return Err(self.error(format!(
                    "duplicate parameter `{}`",
                    self.interner.name(*p)
                )));
            }
        }
        Ok(params)
    }
}
