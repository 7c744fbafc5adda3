//! x86-64 register file of the tracee.
//!
//! The kernel exposes the registers as one `user_regs_struct`. Every logical
//! register is mapped to its named field here, so the layout is only relied
//! upon through [`Register::slot`].
//!
//! Refs:
//! - System V x86-64 psABI, DWARF register number mapping (fig. 3.36)

use gimli::X86_64;

use crate::defs::{DwarfRegister, Registers, Result, Tracee};

/// Logical registers, in the order of the kernel's register-save area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    R15,
    R14,
    R13,
    R12,
    Rbp,
    Rbx,
    R11,
    R10,
    R9,
    R8,
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    OrigRax,
    Rip,
    Cs,
    // rflags; eflags is its low 32 bits
    Eflags,
    Rsp,
    Ss,
    FsBase,
    GsBase,
    Ds,
    Es,
    Fs,
    Gs,
}

pub const REGISTER_COUNT: usize = 27;

#[derive(Debug)]
pub struct RegisterInfo {
    pub reg: Register,
    pub dwarf: Option<DwarfRegister>,
    pub name: &'static str,
}

/// Display order used by the register dump.
pub static REGISTERS: [RegisterInfo; REGISTER_COUNT] = [
    info(Register::Rax, Some(X86_64::RAX), "rax"),
    info(Register::Rbx, Some(X86_64::RBX), "rbx"),
    info(Register::Rcx, Some(X86_64::RCX), "rcx"),
    info(Register::Rdx, Some(X86_64::RDX), "rdx"),
    info(Register::Rsi, Some(X86_64::RSI), "rsi"),
    info(Register::Rdi, Some(X86_64::RDI), "rdi"),
    info(Register::Rbp, Some(X86_64::RBP), "rbp"),
    info(Register::Rsp, Some(X86_64::RSP), "rsp"),
    info(Register::R8, Some(X86_64::R8), "r8"),
    info(Register::R9, Some(X86_64::R9), "r9"),
    info(Register::R10, Some(X86_64::R10), "r10"),
    info(Register::R11, Some(X86_64::R11), "r11"),
    info(Register::R12, Some(X86_64::R12), "r12"),
    info(Register::R13, Some(X86_64::R13), "r13"),
    info(Register::R14, Some(X86_64::R14), "r14"),
    info(Register::R15, Some(X86_64::R15), "r15"),
    info(Register::Rip, None, "rip"),
    info(Register::Eflags, Some(X86_64::RFLAGS), "eflags"),
    info(Register::Cs, Some(X86_64::CS), "cs"),
    info(Register::OrigRax, None, "orig_rax"),
    info(Register::FsBase, Some(X86_64::FS_BASE), "fs_base"),
    info(Register::GsBase, Some(X86_64::GS_BASE), "gs_base"),
    info(Register::Fs, Some(X86_64::FS), "fs"),
    info(Register::Gs, Some(X86_64::GS), "gs"),
    info(Register::Ss, Some(X86_64::SS), "ss"),
    info(Register::Ds, Some(X86_64::DS), "ds"),
    info(Register::Es, Some(X86_64::ES), "es"),
];

const fn info(reg: Register, dwarf: Option<DwarfRegister>, name: &'static str) -> RegisterInfo {
    RegisterInfo { reg, dwarf, name }
}

impl Register {
    pub fn info(self) -> &'static RegisterInfo {
        // every variant has exactly one row
        REGISTERS
            .iter()
            .find(|ri| ri.reg == self)
            .unwrap_or(&REGISTERS[0])
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn dwarf(self) -> Option<DwarfRegister> {
        self.info().dwarf
    }

    pub fn from_name(name: &str) -> Option<Self> {
        REGISTERS.iter().find(|ri| ri.name == name).map(|ri| ri.reg)
    }

    #[cfg(test)]
    pub fn from_dwarf(number: DwarfRegister) -> Option<Self> {
        REGISTERS
            .iter()
            .find(|ri| ri.dwarf == Some(number))
            .map(|ri| ri.reg)
    }

    /// Position of the register in the kernel's register-save area.
    #[cfg(test)]
    pub fn layout_index(self) -> usize {
        self as usize
    }

    pub fn slot(self, regs: &mut Registers) -> &mut u64 {
        match self {
            Register::R15 => &mut regs.r15,
            Register::R14 => &mut regs.r14,
            Register::R13 => &mut regs.r13,
            Register::R12 => &mut regs.r12,
            Register::Rbp => &mut regs.rbp,
            Register::Rbx => &mut regs.rbx,
            Register::R11 => &mut regs.r11,
            Register::R10 => &mut regs.r10,
            Register::R9 => &mut regs.r9,
            Register::R8 => &mut regs.r8,
            Register::Rax => &mut regs.rax,
            Register::Rcx => &mut regs.rcx,
            Register::Rdx => &mut regs.rdx,
            Register::Rsi => &mut regs.rsi,
            Register::Rdi => &mut regs.rdi,
            Register::OrigRax => &mut regs.orig_rax,
            Register::Rip => &mut regs.rip,
            Register::Cs => &mut regs.cs,
            Register::Eflags => &mut regs.eflags,
            Register::Rsp => &mut regs.rsp,
            Register::Ss => &mut regs.ss,
            Register::FsBase => &mut regs.fs_base,
            Register::GsBase => &mut regs.gs_base,
            Register::Ds => &mut regs.ds,
            Register::Es => &mut regs.es,
            Register::Fs => &mut regs.fs,
            Register::Gs => &mut regs.gs,
        }
    }

    pub fn read(self, regs: &Registers) -> u64 {
        let mut copy = *regs;
        *self.slot(&mut copy)
    }
}

/// Register access for one tracee. Every call reads the whole save area.
#[derive(Debug, Clone)]
pub struct RegisterFile<T: Tracee> {
    tracee: T,
}

impl<T: Tracee> RegisterFile<T> {
    pub fn new(tracee: T) -> Self {
        Self { tracee }
    }

    pub fn get(&self, reg: Register) -> Result<u64> {
        let regs = self.tracee.get_registers()?;
        Ok(reg.read(&regs))
    }

    pub fn set(&self, reg: Register, value: u64) -> Result<()> {
        let mut regs = self.tracee.get_registers()?;
        *reg.slot(&mut regs) = value;
        self.tracee.set_registers(regs)
    }

    /// All registers in display order, from a single read.
    pub fn snapshot(&self) -> Result<Vec<(&'static RegisterInfo, u64)>> {
        let regs = self.tracee.get_registers()?;
        Ok(REGISTERS.iter().map(|ri| (ri, ri.reg.read(&regs))).collect())
    }

    pub fn program_counter(&self) -> Result<u64> {
        self.get(Register::Rip)
    }

    pub fn set_program_counter(&self, pc: u64) -> Result<()> {
        self.set(Register::Rip, pc)
    }
}
