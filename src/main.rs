use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod breakpoint;
mod cli;
mod command;
mod debugger;
mod defs;
mod error;
mod ptrace_engine;
mod registers;
#[cfg(test)]
mod testing;
mod utils;

use crate::cli::QuitPolicy;
use crate::command::{dispatch, Flow};
use crate::debugger::Debugger;
use crate::defs::{Result, Tracee};
use crate::ptrace_engine::PtraceProcess;

#[derive(Parser)]
#[command(name = "minidbg", version)]
#[command(about = "A minimal ptrace debugger for x86-64 Linux", long_about = None)]
pub struct Opts {
    /// Keep address space layout randomization enabled in the target
    #[arg(long, default_value_t = false)]
    keep_aslr: bool,

    /// What to do with a live target on quit: kill or detach
    #[arg(long, default_value = "kill")]
    on_quit: QuitPolicy,

    /// File to load line history from and save it to
    #[arg(long)]
    history: Option<PathBuf>,

    #[arg(long, default_value = "minidbg> ")]
    prompt: String,

    /// Path to the binary to be debugged
    program: PathBuf,

    /// Arguments passed to the binary
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    let opts = Opts::parse();

    println!("Debugging {}", opts.program.display());
    let mut cmd = Command::new(&opts.program);
    cmd.args(&opts.args);
    let process = PtraceProcess::spawn(cmd, !opts.keep_aslr)?;
    println!("Child pid: {}", process.pid());

    let name = opts.program.display().to_string();
    let (debugger, status) = Debugger::attach(process, name)?;
    println!("{}", status);

    supervise(debugger, opts.on_quit, |debugger| run_repl(debugger, &opts))
}

/// Runs `repl`, then applies the quit policy whether or not it failed.
fn supervise<T, F>(mut debugger: Debugger<T>, policy: QuitPolicy, repl: F) -> Result<()>
where
    T: Tracee,
    F: FnOnce(&mut Debugger<T>) -> Result<()>,
{
    let outcome = repl(&mut debugger);
    debug!(program = debugger.name(), state = ?debugger.state(), ?policy, "quitting");
    let shutdown = debugger.shutdown(policy);
    outcome.and(shutdown)
}

fn run_repl<T: Tracee>(debugger: &mut Debugger<T>, opts: &Opts) -> Result<()> {
    let mut editor = DefaultEditor::new()?;
    if let Some(path) = &opts.history {
        if let Err(err) = editor.load_history(path) {
            debug!(?path, %err, "no history loaded");
        }
    }

    let stdout = io::stdout();
    loop {
        let line = match editor.readline(&opts.prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        };
        if !line.trim().is_empty() {
            editor.add_history_entry(line.as_str())?;
        }

        let mut out = stdout.lock();
        match dispatch(debugger, &line, &mut out) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(err) => writeln!(out, "{}", err)?,
        }
        out.flush()?;
    }

    if let Some(path) = &opts.history {
        if let Err(err) = editor.save_history(path) {
            warn!(?path, %err, "could not save history");
        }
    }
    Ok(())
}
