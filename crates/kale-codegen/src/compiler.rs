//! Code generation: forms → Cranelift IR.
//!
//! The compiler walks a [`Form`] tree once, emitting IR into the routine
//! currently under construction. Nested routines (letrec functions, lambda
//! bodies, trampolines) are built with their own `FunctionBuilder` and defined
//! in the module as soon as they are finished, while the enclosing routine's
//! builder stays open.
//!
//! # Value representation
//!
//! | kale        | Cranelift                         |
//! |-------------|-----------------------------------|
//! | any value   | `(tag: I64, data: I64)`           |
//! | routine     | `([env: PTR,] values...) -> value` |
//! | env array   | `PTR` to `n` 16-byte values       |
//!
//! # Closure conversion
//!
//! - `letrec` functions are direct-call routines. Variables they capture are
//!   appended to their parameter lists and every direct call to them is
//!   rewritten to pass those variables (see [`crate::capture`]).
//! - `lambda` becomes a routine taking the environment pointer first, plus a
//!   `kale_make_closure` call that copies the captured values.

use std::collections::HashMap;

use cranelift_codegen::ir::{
    types, Function, InstBuilder, StackSlotData, StackSlotKind, UserFuncName, Value,
};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{DataDescription, DataId, FuncId, Linkage, Module};
use kale_parser::{Form, FunctionBinding, VariableBinding};
use kale_reader::{Datum, Interner, Symbol};
use tracing::{debug, trace};

use crate::abi::{self, PTR, TAG_NIL};
use crate::backend::Program;
use crate::capture;
use crate::error::{CompileError, Result};
use crate::free_vars::{self, FreeVars};
use crate::options::CompileOptions;
use crate::scope::{Entry, FunctionRef, ScopeEnv};
use crate::trampoline::{trampoline_name, TrampolineCache};

/// Name of the routine that evaluates the top-level forms.
pub const ENTRY_NAME: &str = "kale_main";

/// A kale value inside generated code.
#[derive(Debug, Clone, Copy)]
pub struct Tagged {
    pub tag: Value,
    pub data: Value,
}

impl Tagged {
    fn from_results(results: &[Value]) -> Self {
        Tagged {
            tag: results[0],
            data: results[1],
        }
    }
}

/// A value bound in scope. IR values only mean something inside the routine
/// that defines them.
#[derive(Debug, Clone, Copy)]
pub struct Local {
    routine: Option<FuncId>,
    value: Tagged,
}

/// Top-level compiler that holds the Cranelift module and all metadata.
pub struct Compiler<'i, M: Module> {
    module: M,
    interner: &'i mut Interner,
    options: CompileOptions,
    /// Runtime extern functions (kale_* → FuncId).
    runtime_funcs: HashMap<&'static str, FuncId>,
    scopes: ScopeEnv<Local>,
    trampolines: TrampolineCache,
    /// Data objects holding the names of quoted symbols.
    symbol_names: HashMap<Symbol, (DataId, usize)>,
    /// Routine whose body is being generated.
    routine: Option<FuncId>,
    /// Counter for unique routine names.
    routine_counter: u32,
    entry: Option<FuncId>,
}

impl<'i, M: Module> Compiler<'i, M> {
    /// Declare the runtime primitives in `module` and install the globals.
    pub fn new(module: M, interner: &'i mut Interner, options: CompileOptions) -> Result<Self> {
        let globals: Vec<(Symbol, &abi::Global)> = abi::GLOBALS
            .iter()
            .map(|g| (interner.intern(g.name), g))
            .collect();

        let mut compiler = Compiler {
            module,
            interner,
            options,
            runtime_funcs: HashMap::new(),
            scopes: ScopeEnv::new(),
            trampolines: TrampolineCache::new(),
            symbol_names: HashMap::new(),
            routine: None,
            routine_counter: 0,
            entry: None,
        };
        compiler.declare_all_runtime_funcs()?;
        for (sym, global) in globals {
            let id = compiler.runtime_func(global.link_name)?;
            compiler.scopes.define_global(
                sym,
                Entry::Function(FunctionRef {
                    id,
                    arity: global.arity,
                }),
            );
        }
        Ok(compiler)
    }

    /// Compile a single top-level form into the entry routine.
    pub fn compile(&mut self, form: &mut Form) -> Result<FuncId> {
        self.compile_program(std::slice::from_mut(form))
    }

    /// Compile a sequence of top-level forms into the entry routine. Each is
    /// evaluated in order; the routine returns the value of the last one, or
    /// nil when there are none.
    pub fn compile_program(&mut self, forms: &mut [Form]) -> Result<FuncId> {
        let count = forms.len();
        let id = self.declare_routine(ENTRY_NAME, Linkage::Export, false, 0)?;
        self.gen_routine(id, ENTRY_NAME, None, &[], |this, fb| {
            let mut last = this.nil(fb);
            for form in forms.iter_mut() {
                last = this.with_scope(|this| this.gen(fb, form))?;
            }
            Ok(last)
        })?;
        debug!(forms = count, "compiled entry routine");
        self.entry = Some(id);
        Ok(id)
    }

    /// Hand the finished module and its entry routine to the backend.
    pub fn finalize(self) -> Result<Program<M>> {
        let entry = self
            .entry
            .ok_or_else(|| CompileError::Backend("nothing has been compiled".to_string()))?;
        Ok(Program::new(self.module, entry))
    }

    pub fn trampolines(&self) -> &TrampolineCache {
        &self.trampolines
    }

    /// Number of open lexical scopes; zero between top-level compilations.
    pub fn scope_depth(&self) -> usize {
        self.scopes.depth()
    }

    pub fn module(&self) -> &M {
        &self.module
    }

    // ─── Runtime function declaration ──────────────────────────────

    fn declare_all_runtime_funcs(&mut self) -> Result<()> {
        for f in abi::RUNTIME_FUNCS {
            let mut sig = self.module.make_signature();
            abi::fill_signature(&mut sig, f.params, f.returns);
            let id = self.module.declare_function(f.name, Linkage::Import, &sig)?;
            self.runtime_funcs.insert(f.name, id);
        }
        Ok(())
    }

    fn runtime_func(&self, name: &str) -> Result<FuncId> {
        self.runtime_funcs
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::Backend(format!("runtime function `{}` not declared", name)))
    }

    fn call_runtime(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        name: &str,
        args: &[Value],
    ) -> Result<Vec<Value>> {
        let id = self.runtime_func(name)?;
        let func_ref = self.module.declare_func_in_func(id, fb.func);
        let call = fb.ins().call(func_ref, args);
        Ok(fb.inst_results(call).to_vec())
    }

    fn call_runtime_value(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        name: &str,
        args: &[Value],
    ) -> Result<Tagged> {
        let results = self.call_runtime(fb, name, args)?;
        Ok(Tagged::from_results(&results))
    }

    // ─── Routines ──────────────────────────────────────────────────

    fn routine_name(&mut self, base: &str) -> String {
        self.routine_counter += 1;
        let base: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("kale_{}_{}", base, self.routine_counter)
    }

    fn declare_routine(
        &mut self,
        name: &str,
        linkage: Linkage,
        with_env: bool,
        arity: usize,
    ) -> Result<FuncId> {
        let mut sig = self.module.make_signature();
        abi::fill_routine_signature(&mut sig, with_env, arity);
        Ok(self.module.declare_function(name, linkage, &sig)?)
    }

    fn new_function(&self, id: FuncId) -> Function {
        let mut func = Function::new();
        func.signature = self
            .module
            .declarations()
            .get_function_decl(id)
            .signature
            .clone();
        func.name = UserFuncName::user(0, id.as_u32());
        func
    }

    /// Build and define routine `id`. Its environment slots (when
    /// `captured` is given) and parameters are bound in a fresh scope before
    /// `body` generates the return value.
    fn gen_routine(
        &mut self,
        id: FuncId,
        name: &str,
        captured: Option<&[Symbol]>,
        params: &[Symbol],
        body: impl FnOnce(&mut Self, &mut FunctionBuilder<'_>) -> Result<Tagged>,
    ) -> Result<()> {
        let mut func = self.new_function(id);
        let mut func_builder_ctx = FunctionBuilderContext::new();
        let mut fb = FunctionBuilder::new(&mut func, &mut func_builder_ctx);

        let entry_block = fb.create_block();
        fb.append_block_params_for_function_params(entry_block);
        fb.switch_to_block(entry_block);
        fb.seal_block(entry_block);
        let args = fb.block_params(entry_block).to_vec();

        let outer = self.routine.replace(id);
        let result = self.with_scope(|this| {
            let mut next = 0;
            if let Some(captured) = captured {
                let env = args[0];
                next = 1;
                for (i, &sym) in captured.iter().enumerate() {
                    let slot = fb.ins().iconst(types::I64, i as i64);
                    let value = this.call_runtime_value(&mut fb, "kale_env_slot", &[env, slot])?;
                    this.bind_value(sym, value);
                }
            }
            for &param in params {
                let value = Tagged {
                    tag: args[next],
                    data: args[next + 1],
                };
                next += 2;
                this.bind_value(param, value);
            }
            let ret = body(this, &mut fb)?;
            fb.ins().return_(&[ret.tag, ret.data]);
            Ok(())
        });
        self.routine = outer;
        result?;

        fb.finalize();
        self.define(id, name, func)
    }

    fn define(&mut self, id: FuncId, name: &str, func: Function) -> Result<()> {
        if self.options.dump_ir {
            debug!(target: "kale_codegen::ir", "{}:\n{}", name, func.display());
        }
        let mut ctx = Context::for_function(func);
        self.module.define_function(id, &mut ctx)?;
        Ok(())
    }

    // ─── Scopes ────────────────────────────────────────────────────

    /// Run `f` inside a new scope. The scope is popped whether or not `f`
    /// succeeds.
    fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    fn bind_value(&mut self, sym: Symbol, value: Tagged) {
        let local = Local {
            routine: self.routine,
            value,
        };
        self.scopes.bind(sym, Entry::Value(local));
    }

    fn name(&self, sym: Symbol) -> String {
        self.interner.name(sym).to_string()
    }

    fn names(&self, syms: &[Symbol]) -> Vec<String> {
        syms.iter().map(|&s| self.name(s)).collect()
    }

    fn value_of(&self, sym: Symbol) -> Result<Tagged> {
        match self.scopes.lookup(sym) {
            None => Err(CompileError::UnboundVariable(self.name(sym))),
            Some(Entry::Function(_)) => Err(CompileError::NotAValue(self.name(sym))),
            Some(Entry::Value(local)) if local.routine == self.routine => Ok(local.value),
            Some(Entry::Value(_)) => Err(CompileError::Capture(self.name(sym))),
        }
    }

    /// The current value of a variable being stored into a closure
    /// environment.
    fn captured_value(&self, sym: Symbol) -> Result<Tagged> {
        match self.value_of(sym) {
            Err(CompileError::NotAValue(name)) => Err(CompileError::Capture(name)),
            other => other,
        }
    }

    /// Keep the free variables that name run-time values. Ones naming
    /// compiled functions are called directly by name and need no capture.
    fn value_captures(&self, free: FreeVars) -> Result<Vec<Symbol>> {
        let mut captures = Vec::with_capacity(free.len());
        for sym in free {
            match self.scopes.lookup(sym) {
                None => return Err(CompileError::UnboundVariable(self.name(sym))),
                Some(Entry::Value(_)) => captures.push(sym),
                Some(Entry::Function(_)) => {}
            }
        }
        Ok(captures)
    }

    // ─── Forms ─────────────────────────────────────────────────────

    pub fn gen(&mut self, fb: &mut FunctionBuilder<'_>, form: &mut Form) -> Result<Tagged> {
        trace!(kind = form.kind_name(), depth = self.scopes.depth(), "visit");
        match form {
            Form::Number(n) => self.gen_number(fb, *n),
            Form::Symbol(sym) => self.value_of(*sym),
            Form::If {
                cond,
                then,
                otherwise,
            } => self.gen_if(fb, cond, then, otherwise),
            Form::Let { bindings, body } => self.gen_let(fb, bindings, body),
            Form::Letrec { bindings, body } => self.gen_letrec(fb, bindings, body),
            Form::Quote(datum) => self.gen_datum(fb, datum),
            Form::Application { callee, args } => self.gen_application(fb, callee, args),
            Form::Lambda { params, body } => self.gen_lambda(fb, params, body),
        }
    }

    fn nil(&mut self, fb: &mut FunctionBuilder<'_>) -> Tagged {
        let tag = fb.ins().iconst(types::I64, TAG_NIL);
        let data = fb.ins().iconst(types::I64, 0);
        Tagged { tag, data }
    }

    fn gen_number(&mut self, fb: &mut FunctionBuilder<'_>, n: f64) -> Result<Tagged> {
        let v = fb.ins().f64const(n);
        self.call_runtime_value(fb, "kale_make_number", &[v])
    }

    fn gen_if(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        cond: &mut Form,
        then: &mut Form,
        otherwise: &mut Form,
    ) -> Result<Tagged> {
        let c = self.gen(fb, cond)?;
        let is_nil = self.call_runtime(fb, "kale_is_nil", &[c.tag, c.data])?[0];

        let then_block = fb.create_block();
        let else_block = fb.create_block();
        let merge_block = fb.create_block();
        fb.append_block_param(merge_block, types::I64);
        fb.append_block_param(merge_block, types::I64);

        // Only nil is false.
        fb.ins().brif(is_nil, else_block, &[], then_block, &[]);

        fb.switch_to_block(then_block);
        fb.seal_block(then_block);
        let t = self.gen(fb, then)?;
        fb.ins().jump(merge_block, &[t.tag, t.data]);

        fb.switch_to_block(else_block);
        fb.seal_block(else_block);
        let e = self.gen(fb, otherwise)?;
        fb.ins().jump(merge_block, &[e.tag, e.data]);

        fb.switch_to_block(merge_block);
        fb.seal_block(merge_block);
        Ok(Tagged::from_results(fb.block_params(merge_block)))
    }

    fn gen_let(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        bindings: &mut [VariableBinding],
        body: &mut Form,
    ) -> Result<Tagged> {
        self.with_scope(|this| {
            for binding in bindings.iter_mut() {
                let value = this.gen(fb, &mut binding.definition)?;
                this.bind_value(binding.binder, value);
            }
            this.gen(fb, body)
        })
    }

    fn gen_letrec(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        bindings: &mut [FunctionBinding],
        body: &mut Form,
    ) -> Result<Tagged> {
        let scopes = &self.scopes;
        let free = free_vars::letrec_free_vars(bindings, &|s| scopes.is_global(s));
        let captures = self.value_captures(free)?;

        self.with_scope(|this| {
            // Captures travel under fresh names so that no parameter, `let`
            // or `lambda` between a call site and the letrec can shadow them.
            let mut hidden = Vec::with_capacity(captures.len());
            for &sym in &captures {
                let value = this.value_of(sym)?;
                let base = this.name(sym);
                let fresh = this.interner.gensym(&base);
                this.bind_value(fresh, value);
                hidden.push(fresh);
            }

            // Rewrite before anything is generated: every sibling definition
            // and the body pass the captures to each binder.
            let declared: Vec<usize> = bindings.iter().map(|b| b.parameters.len()).collect();
            if !hidden.is_empty() {
                let binders: Vec<Symbol> = bindings.iter().map(|b| b.binder).collect();
                for target in binders {
                    for binding in bindings.iter_mut() {
                        capture::inject_into_binding(binding, target, &hidden);
                    }
                    capture::inject_captures(body, target, &hidden);
                }
                for binding in bindings.iter_mut() {
                    binding.parameters.extend_from_slice(&hidden);
                }
            }

            let mut routines = Vec::with_capacity(bindings.len());
            for binding in bindings.iter() {
                let base = this.name(binding.binder);
                let name = this.routine_name(&base);
                let arity = binding.parameters.len();
                let id = this.declare_routine(&name, Linkage::Local, false, arity)?;
                this.scopes
                    .bind(binding.binder, Entry::Function(FunctionRef { id, arity }));
                routines.push((id, name));
            }

            for ((binding, (id, name)), &declared) in
                bindings.iter_mut().zip(&routines).zip(&declared)
            {
                debug!(
                    routine = %name,
                    arity = binding.parameters.len(),
                    captures = ?this.names(&captures),
                    "generating letrec routine"
                );
                let FunctionBinding {
                    parameters,
                    definition,
                    ..
                } = binding;
                // A declared parameter wins over a capture of the same name.
                let renamed: Vec<(Symbol, Symbol)> = captures
                    .iter()
                    .copied()
                    .zip(hidden.iter().copied())
                    .filter(|(sym, _)| !parameters[..declared].contains(sym))
                    .collect();
                this.gen_routine(*id, name, None, parameters, |this, fb| {
                    for (sym, fresh) in renamed {
                        let value = this.value_of(fresh)?;
                        this.bind_value(sym, value);
                    }
                    this.gen(fb, definition)
                })?;
            }

            this.gen(fb, body)
        })
    }

    fn gen_datum(&mut self, fb: &mut FunctionBuilder<'_>, datum: &Datum) -> Result<Tagged> {
        match datum {
            Datum::Nil => Ok(self.nil(fb)),
            Datum::Number(n) => self.gen_number(fb, *n),
            Datum::Symbol(sym) => self.gen_symbol_literal(fb, *sym),
            Datum::Pair(car, cdr) => {
                let car = self.gen_datum(fb, car)?;
                let cdr = self.gen_datum(fb, cdr)?;
                self.call_runtime_value(fb, "kale_cons", &[car.tag, car.data, cdr.tag, cdr.data])
            }
        }
    }

    fn gen_symbol_literal(&mut self, fb: &mut FunctionBuilder<'_>, sym: Symbol) -> Result<Tagged> {
        let (data_id, len) = self.symbol_name_data(sym)?;
        let gv = self.module.declare_data_in_func(data_id, fb.func);
        let ptr = fb.ins().global_value(PTR, gv);
        let len = fb.ins().iconst(types::I64, len as i64);
        self.call_runtime_value(fb, "kale_make_symbol", &[ptr, len])
    }

    /// Declare the name of `sym` as a data object, once per symbol.
    fn symbol_name_data(&mut self, sym: Symbol) -> Result<(DataId, usize)> {
        if let Some(&entry) = self.symbol_names.get(&sym) {
            return Ok(entry);
        }
        let name = self.interner.name(sym);
        let data_id = self.module.declare_data(
            &format!("kale_sym_{}", sym.index()),
            Linkage::Local,
            false,
            false,
        )?;
        let mut desc = DataDescription::new();
        desc.define(name.as_bytes().to_vec().into_boxed_slice());
        self.module.define_data(data_id, &desc)?;
        let entry = (data_id, name.len());
        self.symbol_names.insert(sym, entry);
        Ok(entry)
    }

    fn gen_application(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        callee: &mut Form,
        args: &mut [Form],
    ) -> Result<Tagged> {
        if let Some(sym) = callee.as_symbol() {
            if let Some(&Entry::Function(function)) = self.scopes.lookup(sym) {
                return self.gen_direct_call(fb, sym, function, args);
            }
        }
        if matches!(callee, Form::Number(_) | Form::Quote(_)) {
            return Err(CompileError::UnsupportedForm(callee.kind_name()));
        }

        let closure = self.gen(fb, callee)?;
        let mut call_args = vec![closure.tag, closure.data];
        for arg in args.iter_mut() {
            let v = self.gen(fb, arg)?;
            call_args.push(v.tag);
            call_args.push(v.data);
        }
        let trampoline = self.closure_trampoline(args.len())?;
        let func_ref = self.module.declare_func_in_func(trampoline, fb.func);
        let call = fb.ins().call(func_ref, &call_args);
        Ok(Tagged::from_results(fb.inst_results(call)))
    }

    fn gen_direct_call(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        sym: Symbol,
        function: FunctionRef,
        args: &mut [Form],
    ) -> Result<Tagged> {
        if args.len() != function.arity {
            return Err(CompileError::ArityMismatch {
                name: self.name(sym),
                expected: function.arity,
                found: args.len(),
            });
        }
        let mut call_args = Vec::with_capacity(args.len() * 2);
        for arg in args.iter_mut() {
            let v = self.gen(fb, arg)?;
            call_args.push(v.tag);
            call_args.push(v.data);
        }
        let func_ref = self.module.declare_func_in_func(function.id, fb.func);
        let call = fb.ins().call(func_ref, &call_args);
        Ok(Tagged::from_results(fb.inst_results(call)))
    }

    fn gen_lambda(
        &mut self,
        fb: &mut FunctionBuilder<'_>,
        params: &[Symbol],
        body: &mut Form,
    ) -> Result<Tagged> {
        let scopes = &self.scopes;
        let free = free_vars::lambda_free_vars(params, body, &|s| scopes.is_global(s));
        let captures = self.value_captures(free)?;

        let name = self.routine_name("lambda");
        let id = self.declare_routine(&name, Linkage::Local, true, params.len())?;
        debug!(
            routine = %name,
            arity = params.len(),
            captures = ?self.names(&captures),
            "generating closure routine"
        );
        self.gen_routine(id, &name, Some(captures.as_slice()), params, |this, fb| {
            this.gen(fb, body)
        })?;

        // Back in the enclosing routine: copy the captured values into a
        // stack array for kale_make_closure.
        let env = if captures.is_empty() {
            fb.ins().iconst(PTR, 0)
        } else {
            let slot = fb.create_sized_stack_slot(StackSlotData::new(
                StackSlotKind::ExplicitSlot,
                (captures.len() * 16) as u32,
                3, // 8-byte alignment
            ));
            for (i, &sym) in captures.iter().enumerate() {
                let value = self.captured_value(sym)?;
                let offset = (i * 16) as i32;
                fb.ins().stack_store(value.tag, slot, offset);
                fb.ins().stack_store(value.data, slot, offset + 8);
            }
            fb.ins().stack_addr(PTR, slot, 0)
        };
        let func_ref = self.module.declare_func_in_func(id, fb.func);
        let code = fb.ins().func_addr(PTR, func_ref);
        let count = fb.ins().iconst(types::I64, captures.len() as i64);
        let arity = fb.ins().iconst(types::I64, params.len() as i64);
        self.call_runtime_value(fb, "kale_make_closure", &[code, env, count, arity])
    }

    // ─── Closure-call trampolines ──────────────────────────────────

    /// The trampoline for `arity` arguments, generating it on first use.
    fn closure_trampoline(&mut self, arity: usize) -> Result<FuncId> {
        if let Some(id) = self.trampolines.get(arity) {
            return Ok(id);
        }
        let name = trampoline_name(arity);
        let id = self.declare_routine(&name, Linkage::Local, false, arity + 1)?;
        self.gen_trampoline(id, &name, arity)?;
        debug!(routine = %name, arity, "generated closure-call trampoline");
        Ok(self.trampolines.insert(arity, id))
    }

    /// `(closure, args...)`: check the closure's arity, then call its code
    /// with its environment followed by the arguments.
    fn gen_trampoline(&mut self, id: FuncId, name: &str, arity: usize) -> Result<()> {
        let mut func = self.new_function(id);
        let mut func_builder_ctx = FunctionBuilderContext::new();
        let mut fb = FunctionBuilder::new(&mut func, &mut func_builder_ctx);

        let entry_block = fb.create_block();
        fb.append_block_params_for_function_params(entry_block);
        fb.switch_to_block(entry_block);
        fb.seal_block(entry_block);
        let args = fb.block_params(entry_block).to_vec();
        let (tag, data) = (args[0], args[1]);

        let n = fb.ins().iconst(types::I64, arity as i64);
        let code = self.call_runtime(&mut fb, "kale_closure_code", &[tag, data, n])?[0];
        let env = self.call_runtime(&mut fb, "kale_closure_env", &[tag, data])?[0];

        let mut sig = self.module.make_signature();
        abi::fill_routine_signature(&mut sig, true, arity);
        let sig_ref = fb.import_signature(sig);

        let mut call_args = vec![env];
        call_args.extend_from_slice(&args[2..]);
        let call = fb.ins().call_indirect(sig_ref, code, &call_args);
        let results = fb.inst_results(call).to_vec();
        fb.ins().return_(&results);

        fb.finalize();
        self.define(id, name, func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::jit_module;
    use cranelift_jit::JITModule;

    fn parse(src: &str, interner: &mut Interner) -> Form {
        let datum = kale_reader::read(src, interner).unwrap();
        kale_parser::parse(&datum, interner).unwrap()
    }

    fn compile(src: &str) -> (Result<FuncId>, usize, usize) {
        let mut interner = Interner::new();
        let mut form = parse(src, &mut interner);
        let options = CompileOptions::default();
        let module: JITModule = jit_module(&options).unwrap();
        let mut compiler = Compiler::new(module, &mut interner, options).unwrap();
        let result = compiler.compile(&mut form);
        (result, compiler.scope_depth(), compiler.trampolines().len())
    }

    #[test]
    fn scopes_are_released_on_error() {
        let (result, depth, _) = compile("(let ((x 1)) (letrec ((f () (g))) (f)))");
        assert!(matches!(result, Err(CompileError::UnboundVariable(ref n)) if n == "g"));
        assert_eq!(depth, 0);
    }

    #[test]
    fn function_in_value_position_is_not_a_value() {
        let (result, _, _) = compile("(let ((f car)) f)");
        assert!(matches!(result, Err(CompileError::NotAValue(ref n)) if n == "car"));
    }

    #[test]
    fn literal_callee_is_unsupported() {
        let (result, _, _) = compile("(1 2)");
        assert!(matches!(result, Err(CompileError::UnsupportedForm("number"))));
        let (result, _, _) = compile("('(a) 2)");
        assert!(matches!(result, Err(CompileError::UnsupportedForm("quote"))));
    }

    #[test]
    fn direct_calls_need_no_trampoline() {
        let (result, _, trampolines) = compile("(add 1 (car '(2)))");
        assert!(result.is_ok());
        assert_eq!(trampolines, 0);
    }

    #[test]
    fn routine_names_are_sanitized() {
        let mut interner = Interner::new();
        let options = CompileOptions::default();
        let module: JITModule = jit_module(&options).unwrap();
        let mut compiler = Compiler::new(module, &mut interner, options).unwrap();
        assert_eq!(compiler.routine_name("even?"), "kale_even__1");
        assert_eq!(compiler.routine_name("lambda"), "kale_lambda_2");
    }
}
