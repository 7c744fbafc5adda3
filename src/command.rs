use std::io::Write;

use tracing::debug;

use crate::debugger::Debugger;
use crate::defs::{Result, Tracee};
use crate::error::Error;
use crate::registers::Register;
use crate::utils::{parse_address, parse_index, parse_value};

pub const HELP: &str = "\
Available commands:
  continue
  breakpoint [address]
  breakpoint enable|disable index
  register [reg_name [value]]
  memory address [value]
  quit
  help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    ListBreakpoints,
    SetBreakpoint(u64),
    EnableBreakpoint(usize),
    DisableBreakpoint(usize),
    DumpRegisters,
    ReadRegister(Register),
    WriteRegister(Register, u64),
    ReadMemory(u64),
    WriteMemory(u64, u64),
    Quit,
    Help,
}

/// Whether the REPL keeps going after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn tokenize(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// `word` abbreviates `name`
fn is_prefix(word: &str, name: &str) -> bool {
    !word.is_empty() && name.starts_with(word)
}

impl Command {
    /// Parses one tokenized line; no tokens is no command.
    pub fn parse(words: &[&str]) -> Result<Option<Self>> {
        let (head, args) = match words.split_first() {
            Some(split) => split,
            None => return Ok(None),
        };
        let command = if is_prefix(head, "continue") {
            Self::Continue
        } else if is_prefix(head, "breakpoint") {
            match args {
                [] => Self::ListBreakpoints,
                [address] => Self::SetBreakpoint(parse_address(address)?),
                [action, index] if is_prefix(action, "enable") => {
                    Self::EnableBreakpoint(parse_index(index)?)
                }
                [action, index] if is_prefix(action, "disable") => {
                    Self::DisableBreakpoint(parse_index(index)?)
                }
                [action, _] => return Err(Error::UnknownCommand(action.to_string())),
                _ => {
                    return Err(Error::Usage(
                        "breakpoint [address] | breakpoint enable|disable index",
                    ))
                }
            }
        } else if is_prefix(head, "register") {
            match args {
                [] => Self::DumpRegisters,
                [name] => Self::ReadRegister(register(name)?),
                [name, value] => Self::WriteRegister(register(name)?, parse_value(value)?),
                _ => return Err(Error::Usage("register [reg_name [value]]")),
            }
        } else if is_prefix(head, "memory") {
            match args {
                [address] => Self::ReadMemory(parse_address(address)?),
                [address, value] => {
                    Self::WriteMemory(parse_address(address)?, parse_value(value)?)
                }
                _ => return Err(Error::Usage("memory address [value]")),
            }
        } else if is_prefix(head, "quit") {
            Self::Quit
        } else if is_prefix(head, "help") {
            Self::Help
        } else {
            return Err(Error::UnknownCommand(head.to_string()));
        };
        Ok(Some(command))
    }
}

fn register(name: &str) -> Result<Register> {
    Register::from_name(name).ok_or_else(|| Error::UnknownRegister(name.to_owned()))
}

/// Runs one line of user input against the debugger, writing its output to `out`.
pub fn dispatch<T: Tracee, W: Write>(
    debugger: &mut Debugger<T>,
    line: &str,
    out: &mut W,
) -> Result<Flow> {
    let command = match Command::parse(&tokenize(line))? {
        Some(command) => command,
        None => return Ok(Flow::Continue),
    };
    debug!(?command);
    match command {
        Command::Continue => {
            let status = debugger.continue_execution()?;
            writeln!(out, "{}", status)?;
        }
        Command::ListBreakpoints => {
            for entry in debugger.list_breakpoints() {
                let state = if entry.enabled { "enabled" } else { "disabled" };
                writeln!(out, "{}: 0x{:x} {}", entry.index, entry.address, state)?;
            }
        }
        Command::SetBreakpoint(address) => {
            debugger.set_breakpoint(address)?;
            writeln!(out, "Set breakpoint at address 0x{:x}", address)?;
        }
        Command::EnableBreakpoint(index) => debugger.enable_breakpoint(index)?,
        Command::DisableBreakpoint(index) => debugger.disable_breakpoint(index)?,
        Command::DumpRegisters => {
            for (info, value) in debugger.registers()? {
                writeln!(out, "{:>8} 0x{:016x}", info.reg.name(), value)?;
            }
        }
        Command::ReadRegister(reg) => {
            writeln!(out, "0x{:016x}", debugger.get_register(reg)?)?;
        }
        Command::WriteRegister(reg, value) => debugger.set_register(reg, value)?,
        Command::ReadMemory(address) => {
            writeln!(out, "0x{:x}", debugger.read_memory(address)?)?;
        }
        Command::WriteMemory(address, value) => debugger.write_memory(address, value)?,
        Command::Quit => return Ok(Flow::Quit),
        Command::Help => writeln!(out, "{}", HELP)?,
    }
    Ok(Flow::Continue)
}
