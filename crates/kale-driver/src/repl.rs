//! Interactive loop: read forms, compile each into a fresh JIT program, print
//! its value.

use std::io::{BufRead, Write};

use eyre::Result;
use kale_codegen::CompileOptions;
use kale_reader::Interner;

const PROMPT: &str = "kale> ";
const CONTINUE: &str = "  ... ";

/// Run the loop until `input` is exhausted. Errors in a form are printed and
/// the loop carries on with the next one.
pub fn run(mut input: impl BufRead, out: &mut impl Write, options: CompileOptions) -> Result<()> {
    let mut pending = String::new();
    loop {
        write!(out, "{}", if pending.is_empty() { PROMPT } else { CONTINUE })?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }
        pending.push_str(&line);

        let mut interner = Interner::new();
        let data = match kale_reader::read_all(&pending, &mut interner) {
            Ok(data) => data,
            Err(e) if e.is_incomplete() => continue,
            Err(e) => {
                writeln!(out, "error: read error: {}", e)?;
                pending.clear();
                continue;
            }
        };
        pending.clear();

        for datum in &data {
            let result = kale_parser::parse(datum, &mut interner)
                .map_err(eyre::Report::from)
                .and_then(|mut form| {
                    crate::eval(std::slice::from_mut(&mut form), &mut interner, options)
                });
            match result {
                Ok(value) => writeln!(out, "{}", value)?,
                Err(e) => writeln!(out, "error: {:#}", e)?,
            }
        }
    }
}
