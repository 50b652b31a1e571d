//! Cranelift backends: in-process JIT and relocatable object files.
//!
//! Both target the host. The JIT resolves runtime primitives against the
//! `kale-runtime` functions linked into the current process; object files
//! leave them undefined for the linker to find in `libkale_runtime.a`.

use cranelift_codegen::ir::{types, AbiParam, Function, InstBuilder, UserFuncName};
use cranelift_codegen::isa::{self, OwnedTargetIsa};
use cranelift_codegen::settings::{self, Configurable};
use cranelift_codegen::Context;
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{default_libcall_names, FuncId, Linkage, Module};
use cranelift_object::{ObjectBuilder, ObjectModule};
use kale_runtime::KaleValue;
use target_lexicon::Triple;
use tracing::debug;

use crate::abi::{self, Word, PTR};
use crate::error::{CompileError, Result};
use crate::options::CompileOptions;

// ─── ISA ──────────────────────────────────────────────────────────────

fn set_flag(builder: &mut settings::Builder, name: &str, value: &str) -> Result<()> {
    builder
        .set(name, value)
        .map_err(|e| CompileError::Backend(format!("invalid setting {}={}: {}", name, value, e)))
}

fn bool_flag(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

fn host_isa(options: &CompileOptions, pic: bool) -> Result<OwnedTargetIsa> {
    let mut flags = settings::builder();
    set_flag(&mut flags, "opt_level", options.opt_level())?;
    set_flag(&mut flags, "is_pic", bool_flag(pic))?;
    set_flag(&mut flags, "use_colocated_libcalls", "false")?;
    set_flag(&mut flags, "enable_verifier", bool_flag(options.verify))?;

    let triple = Triple::host();
    debug!(%triple, opt_level = options.opt_level(), pic, "building target ISA");
    isa::lookup(triple)
        .map_err(|e| CompileError::Backend(format!("unsupported host: {}", e)))?
        .finish(settings::Flags::new(flags))
        .map_err(|e| CompileError::Backend(format!("failed to build ISA: {}", e)))
}

/// A JIT module for the host with every runtime primitive registered.
pub fn jit_module(options: &CompileOptions) -> Result<JITModule> {
    let isa = host_isa(options, false)?;
    let mut builder = JITBuilder::with_isa(isa, default_libcall_names());
    for (name, addr) in kale_runtime::exported_symbols() {
        builder.symbol(name, addr);
    }
    Ok(JITModule::new(builder))
}

/// An object-file module for the host named `name`.
pub fn object_module(options: &CompileOptions, name: &str) -> Result<ObjectModule> {
    let isa = host_isa(options, true)?;
    let builder = ObjectBuilder::new(isa, name, default_libcall_names())?;
    Ok(ObjectModule::new(builder))
}

// ─── Programs ─────────────────────────────────────────────────────────

/// A finished compilation: the module and its entry routine.
pub struct Program<M: Module> {
    module: M,
    entry: FuncId,
}

impl<M: Module> Program<M> {
    pub(crate) fn new(module: M, entry: FuncId) -> Self {
        Program { module, entry }
    }

    pub fn entry(&self) -> FuncId {
        self.entry
    }
}

impl Program<JITModule> {
    /// Finalize the code and run the entry routine in this process.
    pub fn run(mut self) -> Result<KaleValue> {
        self.module.finalize_definitions()?;
        let code = self.module.get_finalized_function(self.entry);
        // Safety: the entry routine takes nothing and returns `(tag, data)`,
        // which is how the C ABI returns a `KaleValue`.
        let main: extern "C" fn() -> KaleValue = unsafe { std::mem::transmute(code) };
        Ok(main())
    }
}

impl Program<ObjectModule> {
    /// Add a C `main` that runs the entry routine and prints its value, and
    /// return the object file bytes.
    pub fn emit(self) -> Result<Vec<u8>> {
        let Program { mut module, entry } = self;
        compile_c_main(&mut module, entry)?;
        let product = module.finish();
        product
            .emit()
            .map_err(|e| CompileError::Backend(format!("failed to emit object file: {}", e)))
    }
}

/// Compile the C `main` entry point that calls the entry routine.
fn compile_c_main(module: &mut ObjectModule, entry: FuncId) -> Result<()> {
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(types::I32)); // argc
    sig.params.push(AbiParam::new(PTR)); // argv
    sig.returns.push(AbiParam::new(types::I32)); // exit code
    let func_id = module.declare_function("main", Linkage::Export, &sig)?;

    let mut print_sig = module.make_signature();
    abi::fill_signature(&mut print_sig, &[Word::Value], &[Word::Value]);
    let print_id = module.declare_function("kale_print", Linkage::Import, &print_sig)?;

    let mut func = Function::new();
    func.signature = sig;
    func.name = UserFuncName::user(0, func_id.as_u32());

    // Declare references before creating the builder (avoids borrow conflict)
    let entry_ref = module.declare_func_in_func(entry, &mut func);
    let print_ref = module.declare_func_in_func(print_id, &mut func);

    let mut func_builder_ctx = FunctionBuilderContext::new();
    let mut builder = FunctionBuilder::new(&mut func, &mut func_builder_ctx);

    let entry_block = builder.create_block();
    builder.append_block_params_for_function_params(entry_block);
    builder.switch_to_block(entry_block);
    builder.seal_block(entry_block);

    let call = builder.ins().call(entry_ref, &[]);
    let result = builder.inst_results(call).to_vec();
    builder.ins().call(print_ref, &result);

    let zero = builder.ins().iconst(types::I32, 0);
    builder.ins().return_(&[zero]);
    builder.finalize();

    let mut ctx = Context::for_function(func);
    module.define_function(func_id, &mut ctx)?;
    Ok(())
}
