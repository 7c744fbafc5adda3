use tracing::{debug, warn};

use crate::defs::{Result, Tracee};

/// `int3`
pub const TRAP_OPCODE: u8 = 0xcc;

/// A software breakpoint patched into the tracee's text.
///
/// The original word is captured once, on creation, before anything is
/// written. Dropping an enabled breakpoint restores the original byte.
#[derive(Debug)]
pub struct Breakpoint<T: Tracee> {
    tracee: T,
    /// address of the breakpoint
    address: u64,
    /// the word that was at the bp address before it was patched
    saved_word: u64,
    enabled: bool,
}

impl<T: Tracee> Breakpoint<T> {
    pub fn new(tracee: T, address: u64) -> Result<Self> {
        let saved_word = tracee.read_word(address)?;
        Ok(Self {
            tracee,
            address,
            saved_word,
            enabled: false,
        })
    }

    /// Length of the trap instruction, which is how far past the breakpoint
    /// the program counter is when it is hit.
    pub const fn instr_len() -> u64 {
        1
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    #[cfg(test)]
    pub fn saved_word(&self) -> u64 {
        self.saved_word
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) -> Result<()> {
        // Patch only the low byte so neighbouring breakpoints in the same word survive.
        let current = self.tracee.read_word(self.address)?;
        let patched = (current & !0xff) | u64::from(TRAP_OPCODE);
        self.tracee.write_word(self.address, patched)?;
        self.enabled = true;
        debug!(address = self.address, "breakpoint enabled");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let current = self.tracee.read_word(self.address)?;
        let restored = (current & !0xff) | (self.saved_word & 0xff);
        self.tracee.write_word(self.address, restored)?;
        self.enabled = false;
        debug!(address = self.address, "breakpoint disabled");
        Ok(())
    }

    /// Forgets the patch without touching memory. Used once the tracee's
    /// address space is gone.
    pub fn disarm(&mut self) {
        self.enabled = false;
    }
}

impl<T: Tracee> Drop for Breakpoint<T> {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(err) = self.disable() {
                warn!(address = self.address, %err, "could not restore original byte");
            }
        }
    }
}
