/// Knobs for a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Run Cranelift's `speed` optimization pipeline instead of `none`.
    pub optimize: bool,
    /// Log every generated routine's IR under the `kale_codegen::ir` target.
    pub dump_ir: bool,
    /// Run the IR verifier on each routine.
    pub verify: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            optimize: false,
            dump_ir: false,
            verify: true,
        }
    }
}

impl CompileOptions {
    pub fn optimized() -> Self {
        CompileOptions {
            optimize: true,
            ..Self::default()
        }
    }

    pub(crate) fn opt_level(&self) -> &'static str {
        if self.optimize {
            "speed"
        } else {
            "none"
        }
    }
}
