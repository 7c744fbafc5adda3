//! Debug engine for a single traced process.
//!
//! Refs:
//! - A debugger using ptrace: https://blog.tartanllama.xyz/writing-a-linux-debugger-breakpoints/

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::breakpoint::Breakpoint;
use crate::cli::QuitPolicy;
use crate::defs::{Result, StopStatus, TargetState, Tracee};
use crate::error::Error;
use crate::registers::{Register, RegisterFile, RegisterInfo};

/// One row of a breakpoint listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointEntry {
    pub index: usize,
    pub address: u64,
    pub enabled: bool,
}

pub struct Debugger<T: Tracee> {
    tracee: T,
    name: String,
    registers: RegisterFile<T>,
    /// ordered by address so listings are stable
    breakpoints: BTreeMap<u64, Breakpoint<T>>,
    state: TargetState,
}

impl<T: Tracee> Debugger<T> {
    /// Takes control of a tracee that is about to report its first stop and
    /// blocks until it does.
    pub fn attach(tracee: T, name: impl Into<String>) -> Result<(Self, StopStatus)> {
        let registers = RegisterFile::new(tracee.clone());
        let mut debugger = Self {
            tracee,
            name: name.into(),
            registers,
            breakpoints: BTreeMap::new(),
            state: TargetState::Running,
        };
        let status = debugger.wait_for_stop()?;
        debug!(pid = %debugger.tracee.pid(), program = %debugger.name, ?status, "attached");
        Ok((debugger, status))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> TargetState {
        self.state
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state.is_terminal() {
            return Err(Error::TargetExited);
        }
        Ok(())
    }

    /// Waits for the next state change and records it.
    fn wait_for_stop(&mut self) -> Result<StopStatus> {
        let status = StopStatus::from_raw(self.tracee.wait()?);
        self.state = match status {
            StopStatus::Exited(_) => TargetState::Exited,
            StopStatus::Signaled(_) => TargetState::Terminated,
            StopStatus::Continued => TargetState::Running,
            StopStatus::Stopped(_) | StopStatus::Unknown(_) => TargetState::Stopped,
        };
        if self.state.is_terminal() {
            // nothing left to restore into
            for bp in self.breakpoints.values_mut() {
                bp.disarm();
            }
            self.breakpoints.clear();
            debug!(?status, "target is gone");
        }
        Ok(status)
    }

    /// Installs and enables a breakpoint at `address`, replacing any existing one.
    pub fn set_breakpoint(&mut self, address: u64) -> Result<()> {
        self.ensure_live()?;
        // The old breakpoint must restore memory before the new one snapshots it.
        if let Some(old) = self.breakpoints.remove(&address) {
            drop(old);
        }
        let mut bp = Breakpoint::new(self.tracee.clone(), address)?;
        bp.enable()?;
        self.breakpoints.insert(address, bp);
        debug!(address, "breakpoint set");
        Ok(())
    }

    pub fn list_breakpoints(&self) -> Vec<BreakpointEntry> {
        self.breakpoints
            .values()
            .enumerate()
            .map(|(index, bp)| BreakpointEntry {
                index,
                address: bp.address(),
                enabled: bp.is_enabled(),
            })
            .collect()
    }

    fn breakpoint_by_index(&mut self, index: usize) -> Result<&mut Breakpoint<T>> {
        self.ensure_live()?;
        let count = self.breakpoints.len();
        self.breakpoints
            .values_mut()
            .nth(index)
            .ok_or(Error::IndexOutOfRange { index, count })
    }

    pub fn enable_breakpoint(&mut self, index: usize) -> Result<()> {
        self.breakpoint_by_index(index)?.enable()
    }

    pub fn disable_breakpoint(&mut self, index: usize) -> Result<()> {
        self.breakpoint_by_index(index)?.disable()
    }

    /// Resumes the tracee, stepping over the breakpoint it is stopped on.
    ///
    /// When the previous stop was a hit on an enabled breakpoint the original
    /// instruction is executed exactly once with its own bytes and the trap is
    /// re-armed before the tracee runs freely again.
    #[tracing::instrument(skip(self), fields(pid = %self.tracee.pid()))]
    pub fn continue_execution(&mut self) -> Result<StopStatus> {
        self.ensure_live()?;
        if let Some(status) = self.step_over_breakpoint()? {
            return Ok(status);
        }
        self.tracee.cont()?;
        self.state = TargetState::Running;
        let status = self.wait_for_stop()?;
        debug!(?status, "stopped");
        Ok(status)
    }

    /// Returns the status of the single-step only when the tracee did not
    /// survive it.
    fn step_over_breakpoint(&mut self) -> Result<Option<StopStatus>> {
        let pc = self.registers.program_counter()?;
        let candidate = pc.wrapping_sub(Breakpoint::<T>::instr_len());
        let enabled = match self.breakpoints.get(&candidate) {
            Some(bp) => bp.is_enabled(),
            None => return Ok(None),
        };
        self.registers.set_program_counter(candidate)?;
        if !enabled {
            return Ok(None);
        }

        debug!(address = candidate, "stepping over breakpoint");
        if let Some(bp) = self.breakpoints.get_mut(&candidate) {
            bp.disable()?;
        }
        self.tracee.step()?;
        self.state = TargetState::Running;
        let status = self.wait_for_stop()?;
        if status.is_terminal() {
            warn!(?status, "target ended during single-step");
            return Ok(Some(status));
        }
        if let Some(bp) = self.breakpoints.get_mut(&candidate) {
            bp.enable()?;
        }
        Ok(None)
    }

    pub fn get_register(&self, reg: Register) -> Result<u64> {
        self.ensure_live()?;
        self.registers.get(reg)
    }

    pub fn set_register(&self, reg: Register, value: u64) -> Result<()> {
        self.ensure_live()?;
        debug!(reg = reg.name(), dwarf = ?reg.dwarf().map(|r| r.0), value, "register write");
        self.registers.set(reg, value)
    }

    pub fn registers(&self) -> Result<Vec<(&'static RegisterInfo, u64)>> {
        self.ensure_live()?;
        self.registers.snapshot()
    }

    /// Raw read; a live breakpoint shows up as its trap byte.
    pub fn read_memory(&self, address: u64) -> Result<u64> {
        self.ensure_live()?;
        self.tracee.read_word(address)
    }

    /// Raw write; overwriting a live trap byte is the caller's business.
    pub fn write_memory(&self, address: u64, word: u64) -> Result<()> {
        self.ensure_live()?;
        self.tracee.write_word(address, word)
    }

    /// Releases the tracee according to `policy`. Breakpoints are removed
    /// first so a detached tracee runs its original code.
    pub fn shutdown(mut self, policy: QuitPolicy) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        if policy == QuitPolicy::Detach {
            // a detached tracee stopped on a hit must restart at the breakpoint
            let pc = self.registers.program_counter()?;
            let candidate = pc.wrapping_sub(Breakpoint::<T>::instr_len());
            if self.breakpoints.get(&candidate).is_some_and(|bp| bp.is_enabled()) {
                self.registers.set_program_counter(candidate)?;
            }
        }
        // dropping restores the original bytes
        self.breakpoints.clear();
        match policy {
            QuitPolicy::Kill => {
                self.tracee.kill()?;
                let status = self.wait_for_stop()?;
                debug!(?status, "target killed");
            }
            QuitPolicy::Detach => {
                self.tracee.detach()?;
                self.state = TargetState::Running;
                debug!("target detached");
            }
        }
        Ok(())
    }
}
