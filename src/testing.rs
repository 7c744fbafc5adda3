//! In-memory tracee used by the unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use nix::errno::Errno;
use nix::unistd::Pid;

use crate::defs::{Registers, Result, Tracee};
use crate::error::trace_op;

/// Raw wait status of a SIGTRAP stop.
pub const SIGTRAP_STOP: i32 = 0x57f;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Read(u64),
    Write(u64, u64),
    GetRegs,
    SetRegs,
    Step,
    Cont,
    Wait,
    Kill,
    Detach,
}

pub struct FakeState {
    pub memory: BTreeMap<u64, u8>,
    pub regs: Registers,
    pub ops: Vec<Op>,
    /// Scripted raw statuses returned by `wait`; a SIGTRAP stop once drained.
    pub stops: VecDeque<i32>,
    /// Byte found at the program counter at each single-step.
    pub stepped: Vec<(u64, u8)>,
}

#[derive(Clone)]
pub struct FakeTracee(Rc<RefCell<FakeState>>);

impl FakeTracee {
    pub fn new() -> Self {
        // SAFETY: user_regs_struct is plain integers.
        let regs: Registers = unsafe { std::mem::zeroed() };
        Self(Rc::new(RefCell::new(FakeState {
            memory: BTreeMap::new(),
            regs,
            ops: vec![],
            stops: VecDeque::new(),
            stepped: vec![],
        })))
    }

    /// Maps `len` bytes at `start`, each byte set to the low bits of its address.
    pub fn with_mapping(self, start: u64, len: u64) -> Self {
        {
            let mut state = self.0.borrow_mut();
            for addr in start..start + len {
                state.memory.insert(addr, addr as u8);
            }
        }
        self
    }

    pub fn state(&self) -> std::cell::RefMut<'_, FakeState> {
        self.0.borrow_mut()
    }

    pub fn byte_at(&self, address: u64) -> u8 {
        self.0.borrow().memory[&address]
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.borrow().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.0.borrow_mut().ops.clear();
    }

    pub fn push_stop(&self, raw: i32) {
        self.0.borrow_mut().stops.push_back(raw);
    }

    pub fn set_rip(&self, rip: u64) {
        self.0.borrow_mut().regs.rip = rip;
    }

    pub fn rip(&self) -> u64 {
        self.0.borrow().regs.rip
    }
}

impl std::fmt::Debug for FakeTracee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FakeTracee").field(&self.pid()).finish()
    }
}

impl Tracee for FakeTracee {
    fn pid(&self) -> Pid {
        Pid::from_raw(4242)
    }

    fn read_word(&self, address: u64) -> Result<u64> {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::Read(address));
        let mut bytes = [0u8; 8];
        for (offset, byte) in bytes.iter_mut().enumerate() {
            *byte = *state
                .memory
                .get(&(address + offset as u64))
                .ok_or(Errno::EIO)
                .map_err(trace_op("PTRACE_PEEKDATA"))?;
        }
        Ok(u64::from_le_bytes(bytes))
    }

    fn write_word(&self, address: u64, word: u64) -> Result<()> {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::Write(address, word));
        for offset in 0..8 {
            if !state.memory.contains_key(&(address + offset)) {
                return Err(trace_op("PTRACE_POKEDATA")(Errno::EIO));
            }
        }
        for (offset, byte) in word.to_le_bytes().iter().enumerate() {
            state.memory.insert(address + offset as u64, *byte);
        }
        Ok(())
    }

    fn get_registers(&self) -> Result<Registers> {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::GetRegs);
        Ok(state.regs)
    }

    fn set_registers(&self, regs: Registers) -> Result<()> {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::SetRegs);
        state.regs = regs;
        Ok(())
    }

    fn step(&self) -> Result<()> {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::Step);
        let rip = state.regs.rip;
        let byte = state.memory.get(&rip).copied().unwrap_or(0);
        state.stepped.push((rip, byte));
        state.regs.rip += 1;
        Ok(())
    }

    fn cont(&self) -> Result<()> {
        self.0.borrow_mut().ops.push(Op::Cont);
        Ok(())
    }

    fn wait(&self) -> Result<i32> {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::Wait);
        Ok(state.stops.pop_front().unwrap_or(SIGTRAP_STOP))
    }

    fn kill(&self) -> Result<()> {
        self.0.borrow_mut().ops.push(Op::Kill);
        Ok(())
    }

    fn detach(&self) -> Result<()> {
        self.0.borrow_mut().ops.push(Op::Detach);
        Ok(())
    }
}
