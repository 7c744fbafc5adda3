//! nix ptrace backend
//!
//! Refs:
//! - A debugger using ptrace: https://blog.tartanllama.xyz/writing-a-linux-debugger-setup/
//! - ptrace(2), personality(2)

use std::os::unix::process::CommandExt;
use std::process::Command;

use nix::errno::Errno;
use nix::libc;
use nix::sys::personality::{self, Persona};
use nix::sys::ptrace;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::defs::{Registers, Result, Tracee};
use crate::error::trace_op;

/// A process traced by us through ptrace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtraceProcess(pub Pid);

impl PtraceProcess {
    /// Starts `cmd` as a tracee. The child requests tracing before exec, so it
    /// stops with SIGTRAP before its first instruction.
    pub fn spawn(mut cmd: Command, disable_aslr: bool) -> Result<Self> {
        unsafe {
            cmd.pre_exec(move || {
                if disable_aslr {
                    let persona = personality::get()?;
                    personality::set(persona | Persona::ADDR_NO_RANDOMIZE)?;
                }
                ptrace::traceme().map_err(|errno| errno.into())
            });
        }
        let child = cmd.spawn()?;
        let pid = Pid::from_raw(child.id() as i32);
        debug!(%pid, disable_aslr, "spawned tracee");
        Ok(Self(pid))
    }
}

impl Tracee for PtraceProcess {
    fn pid(&self) -> Pid {
        self.0
    }

    fn read_word(&self, address: u64) -> Result<u64> {
        let word = ptrace::read(self.0, address as ptrace::AddressType)
            .map_err(trace_op("PTRACE_PEEKDATA"))?;
        Ok(word as u64)
    }

    fn write_word(&self, address: u64, word: u64) -> Result<()> {
        ptrace::write(self.0, address as ptrace::AddressType, word as libc::c_long)
            .map_err(trace_op("PTRACE_POKEDATA"))
    }

    fn get_registers(&self) -> Result<Registers> {
        ptrace::getregs(self.0).map_err(trace_op("PTRACE_GETREGS"))
    }

    fn set_registers(&self, regs: Registers) -> Result<()> {
        ptrace::setregs(self.0, regs).map_err(trace_op("PTRACE_SETREGS"))
    }

    fn step(&self) -> Result<()> {
        ptrace::step(self.0, None).map_err(trace_op("PTRACE_SINGLESTEP"))
    }

    fn cont(&self) -> Result<()> {
        ptrace::cont(self.0, None).map_err(trace_op("PTRACE_CONT"))
    }

    fn wait(&self) -> Result<i32> {
        // nix's WaitStatus drops the raw value, which status reports need
        let mut status: libc::c_int = 0;
        let res = unsafe { libc::waitpid(self.0.as_raw(), &mut status, 0) };
        Errno::result(res).map_err(trace_op("waitpid"))?;
        Ok(status)
    }

    fn kill(&self) -> Result<()> {
        signal::kill(self.0, Signal::SIGKILL).map_err(trace_op("kill"))
    }

    fn detach(&self) -> Result<()> {
        ptrace::detach(self.0, None).map_err(trace_op("PTRACE_DETACH"))
    }
}
