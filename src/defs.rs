use std::fmt;

use nix::libc;
use nix::unistd::Pid;

use crate::error;

pub use gimli::Register as DwarfRegister;

/// The kernel's register-save area for a stopped x86-64 process.
pub type Registers = libc::user_regs_struct;

pub type Result<T> = std::result::Result<T, error::Error>;

/// Process-control primitives for a single stopped tracee.
///
/// Handles are cheap to clone; every clone controls the same process. Every
/// failure of an underlying primitive is reported as `Error::TraceOpFailed`.
pub trait Tracee: Clone {
    fn pid(&self) -> Pid;

    /// Reads the machine word at `address`
    fn read_word(&self, address: u64) -> Result<u64>;

    /// Writes the machine word at `address`
    fn write_word(&self, address: u64, word: u64) -> Result<()>;

    /// Reads the whole register-save area
    fn get_registers(&self) -> Result<Registers>;

    /// Writes the whole register-save area back
    fn set_registers(&self, regs: Registers) -> Result<()>;

    /// Executes exactly one instruction. Must be followed by `wait`.
    fn step(&self) -> Result<()>;

    /// Resumes until the next stop. Must be followed by `wait`.
    fn cont(&self) -> Result<()>;

    /// Blocks until the tracee changes state and returns the raw wait status.
    fn wait(&self) -> Result<i32>;

    fn kill(&self) -> Result<()>;

    fn detach(&self) -> Result<()>;
}

/// A classified wait status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopStatus {
    /// Exited(exit_code)
    Exited(i32),
    /// Killed by a signal
    Signaled(i32),
    /// Stopped by a signal
    Stopped(i32),
    Continued,
    /// Some unknown status
    Unknown(i32),
}

impl StopStatus {
    pub fn from_raw(raw: i32) -> Self {
        if libc::WIFEXITED(raw) {
            Self::Exited(libc::WEXITSTATUS(raw))
        } else if libc::WIFSIGNALED(raw) {
            Self::Signaled(libc::WTERMSIG(raw))
        } else if libc::WIFSTOPPED(raw) {
            Self::Stopped(libc::WSTOPSIG(raw))
        } else if libc::WIFCONTINUED(raw) {
            Self::Continued
        } else {
            Self::Unknown(raw)
        }
    }

    /// True when the process is gone and no further control is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited(_) | Self::Signaled(_))
    }
}

impl fmt::Display for StopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "Child exited, status={}", code),
            Self::Signaled(sig) => write!(f, "Child killed by signal {}", sig),
            Self::Stopped(sig) => write!(f, "Child stopped by signal {}", sig),
            Self::Continued => write!(f, "Child continued"),
            Self::Unknown(raw) => write!(f, "Unexpected status=0x{:x}", raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Stopped,
    Running,
    Exited,
    Terminated,
}

impl TargetState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited | Self::Terminated)
    }
}
