mod repl;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command as Process;

use clap::{Parser, Subcommand};
use eyre::{bail, Result, WrapErr};
use kale_codegen::{jit_module, object_module, CompileOptions, Compiler};
use kale_parser::Form;
use kale_reader::Interner;
use kale_runtime::KaleValue;
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Compiler for the kale language
#[derive(Parser, Debug)]
#[command(name = "kale", version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print each datum in a file
    Read { file: PathBuf },
    /// Print each parsed form in a file
    Parse { file: PathBuf },
    /// JIT-compile a file and print the value of its last form
    Run {
        file: PathBuf,
        /// Optimize generated code
        #[arg(short = 'O', long)]
        optimize: bool,
        /// Log the IR of every generated routine
        #[arg(long)]
        dump_ir: bool,
    },
    /// Compile a file to a native executable
    Build {
        file: PathBuf,
        /// Output path (default: the input without its extension)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Optimize generated code
        #[arg(short = 'O', long)]
        optimize: bool,
    },
    /// Read, compile and run forms from standard input
    Repl {
        /// Optimize generated code
        #[arg(short = 'O', long)]
        optimize: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let dump_ir = matches!(args.command, Command::Run { dump_ir: true, .. });
    init_tracing(dump_ir)?;

    match args.command {
        Command::Read { file } => cmd_read(&read_source(&file)?),
        Command::Parse { file } => cmd_parse(&read_source(&file)?),
        Command::Run {
            file,
            optimize,
            dump_ir,
        } => {
            let options = CompileOptions {
                optimize,
                dump_ir,
                ..CompileOptions::default()
            };
            cmd_run(&read_source(&file)?, options)
        }
        Command::Build {
            file,
            output,
            optimize,
        } => {
            let output = output.unwrap_or_else(|| default_output_path(&file));
            let options = CompileOptions {
                optimize,
                ..CompileOptions::default()
            };
            cmd_build(&read_source(&file)?, &output, options)
        }
        Command::Repl { optimize } => {
            let options = CompileOptions {
                optimize,
                ..CompileOptions::default()
            };
            let stdin = std::io::stdin();
            repl::run(stdin.lock(), &mut std::io::stdout(), options)
        }
    }
}

/// Log filter from `KALE_LOG` (default `warn`). `--dump-ir` turns on the IR
/// target on top of it.
fn init_tracing(dump_ir: bool) -> Result<()> {
    let mut filter = EnvFilter::try_from_env("KALE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    if dump_ir {
        filter = filter.add_directive("kale_codegen::ir=debug".parse()?);
    }
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()?;
    Ok(())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let stem = if stem.is_empty() {
        OsStr::new("a.out")
    } else {
        stem
    };
    input.parent().unwrap_or(Path::new(".")).join(stem)
}

// ─── Shared pipeline helpers ─────────────────────────────────────────

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).wrap_err_with(|| format!("Error reading {}", file.display()))
}

/// Read and parse every top-level form in `source`.
pub(crate) fn parse_source(source: &str, interner: &mut Interner) -> Result<Vec<Form>> {
    let data = kale_reader::read_all(source, interner).wrap_err("Read error")?;
    let forms = data
        .iter()
        .map(|d| kale_parser::parse(d, interner))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(forms = forms.len(), "parsed source");
    Ok(forms)
}

/// JIT-compile `forms` as one program and run it.
pub(crate) fn eval(
    forms: &mut [Form],
    interner: &mut Interner,
    options: CompileOptions,
) -> Result<KaleValue> {
    let module = jit_module(&options)?;
    let mut compiler = Compiler::new(module, interner, options)?;
    compiler.compile_program(forms)?;
    Ok(compiler.finalize()?.run()?)
}

// ─── Commands ────────────────────────────────────────────────────────

fn cmd_read(source: &str) -> Result<()> {
    let mut interner = Interner::new();
    let data = kale_reader::read_all(source, &mut interner).wrap_err("Read error")?;
    for datum in &data {
        println!("{}", datum.display(&interner));
    }
    println!("({} data)", data.len());
    Ok(())
}

fn cmd_parse(source: &str) -> Result<()> {
    let mut interner = Interner::new();
    let forms = parse_source(source, &mut interner)?;
    for form in &forms {
        println!("{:#?}", form);
    }
    println!("({} forms)", forms.len());
    Ok(())
}

fn cmd_run(source: &str, options: CompileOptions) -> Result<()> {
    let mut interner = Interner::new();
    let mut forms = parse_source(source, &mut interner)?;
    let value = eval(&mut forms, &mut interner, options)?;
    println!("{}", value);
    Ok(())
}

fn cmd_build(source: &str, output_path: &Path, options: CompileOptions) -> Result<()> {
    let mut interner = Interner::new();
    let mut forms = parse_source(source, &mut interner)?;

    // Generate object file
    let name = output_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("kale");
    let module = object_module(&options, name)?;
    let mut compiler = Compiler::new(module, &mut interner, options)?;
    compiler.compile_program(&mut forms)?;
    let obj_bytes = compiler.finalize()?.emit()?;

    // Write .o file
    let obj_path = output_path.with_extension("o");
    fs::write(&obj_path, &obj_bytes)
        .wrap_err_with(|| format!("Error writing {}", obj_path.display()))?;
    info!(path = %obj_path.display(), bytes = obj_bytes.len(), "wrote object file");

    // Find the runtime library
    let runtime_lib = find_runtime_lib();

    // Link
    let status = Process::new("cc")
        .arg(&obj_path)
        .arg(&runtime_lib)
        .arg("-o")
        .arg(output_path)
        .args(["-lpthread", "-ldl", "-lm"])
        .status();

    // Clean up .o file, warn on failure
    if let Err(e) = fs::remove_file(&obj_path) {
        warn!("failed to clean up {}: {}", obj_path.display(), e);
    }

    match status {
        Ok(s) if s.success() => {
            eprintln!("Built: {}", output_path.display());
            Ok(())
        }
        Ok(s) => bail!("Linker failed with exit code: {}", s),
        Err(e) => Err(e).wrap_err("Failed to run linker"),
    }
}

fn find_runtime_lib() -> PathBuf {
    // Look for libkale_runtime.a in target/debug or target/release
    let candidates = [
        "target/debug/libkale_runtime.a",
        "target/release/libkale_runtime.a",
    ];
    for c in &candidates {
        if Path::new(c).exists() {
            return PathBuf::from(c);
        }
    }
    // Try the cargo-built location next to the executable
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.to_path_buf()));
    if let Some(dir) = exe_dir {
        let lib = dir.join("libkale_runtime.a");
        if lib.exists() {
            return lib;
        }
    }
    warn!("could not find libkale_runtime.a, trying system path");
    PathBuf::from("libkale_runtime.a")
}
