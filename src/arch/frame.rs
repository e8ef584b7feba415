// Register frame shared with trap.S. Offsets are in bytes; trap.S hard-codes
// the same numbers.

use core::mem::{offset_of, size_of};

/// General-purpose user state: the saved program counter plus x1..x31.
///
/// This is also the alarm frame: a diversion copies the whole value out and
/// acknowledgement copies it back, so the two directions cannot disagree.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserRegs {
    pub epc: usize,
    pub ra: usize,
    pub sp: usize,
    pub gp: usize,
    pub tp: usize,
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    pub s0: usize,
    pub s1: usize,
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
    pub a6: usize,
    pub a7: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
    pub t3: usize,
    pub t4: usize,
    pub t5: usize,
    pub t6: usize,
}

impl UserRegs {
    /// System-call argument `n` (`a0`..`a5`).
    ///
    /// # Panics
    ///
    /// If `n > 5`. Call numbers fix their argument count, so this is a kernel bug.
    pub fn arg(&self, n: usize) -> usize {
        match n {
            0 => self.a0,
            1 => self.a1,
            2 => self.a2,
            3 => self.a3,
            4 => self.a4,
            5 => self.a5,
            _ => panic!("syscall argument {n} out of range"),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    /// Kernel page table token
    pub kernel_satp: usize,
    /// Top of the process's kernel stack
    pub kernel_sp: usize,
    /// Address of the user-trap handler
    pub kernel_trap: usize,
    /// Hart the process last ran on; reloaded into `tp`
    pub kernel_hartid: usize,
    pub regs: UserRegs,
}

pub const OFF_KERNEL_SATP: usize = 0;
pub const OFF_KERNEL_SP: usize = 8;
pub const OFF_KERNEL_TRAP: usize = 16;
pub const OFF_KERNEL_HARTID: usize = 24;
pub const OFF_EPC: usize = 32;
pub const OFF_RA: usize = 40;
pub const OFF_SP: usize = 48;
pub const OFF_GP: usize = 56;
pub const OFF_TP: usize = 64;
pub const OFF_T0: usize = 72;
pub const OFF_T1: usize = 80;
pub const OFF_T2: usize = 88;
pub const OFF_S0: usize = 96;
pub const OFF_S1: usize = 104;
pub const OFF_A0: usize = 112;
pub const OFF_A1: usize = 120;
pub const OFF_A2: usize = 128;
pub const OFF_A3: usize = 136;
pub const OFF_A4: usize = 144;
pub const OFF_A5: usize = 152;
pub const OFF_A6: usize = 160;
pub const OFF_A7: usize = 168;
pub const OFF_S2: usize = 176;
pub const OFF_S3: usize = 184;
pub const OFF_S4: usize = 192;
pub const OFF_S5: usize = 200;
pub const OFF_S6: usize = 208;
pub const OFF_S7: usize = 216;
pub const OFF_S8: usize = 224;
pub const OFF_S9: usize = 232;
pub const OFF_S10: usize = 240;
pub const OFF_S11: usize = 248;
pub const OFF_T3: usize = 256;
pub const OFF_T4: usize = 264;
pub const OFF_T5: usize = 272;
pub const OFF_T6: usize = 280;

pub const FRAME_SIZE: usize = 288;

const _: () = {
    assert!(offset_of!(TrapFrame, kernel_satp) == OFF_KERNEL_SATP);
    assert!(offset_of!(TrapFrame, kernel_sp) == OFF_KERNEL_SP);
    assert!(offset_of!(TrapFrame, kernel_trap) == OFF_KERNEL_TRAP);
    assert!(offset_of!(TrapFrame, kernel_hartid) == OFF_KERNEL_HARTID);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, epc) == OFF_EPC);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, ra) == OFF_RA);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, sp) == OFF_SP);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, gp) == OFF_GP);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, tp) == OFF_TP);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t0) == OFF_T0);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t1) == OFF_T1);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t2) == OFF_T2);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s0) == OFF_S0);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s1) == OFF_S1);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a0) == OFF_A0);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a1) == OFF_A1);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a2) == OFF_A2);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a3) == OFF_A3);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a4) == OFF_A4);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a5) == OFF_A5);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a6) == OFF_A6);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, a7) == OFF_A7);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s2) == OFF_S2);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s3) == OFF_S3);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s4) == OFF_S4);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s5) == OFF_S5);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s6) == OFF_S6);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s7) == OFF_S7);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s8) == OFF_S8);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s9) == OFF_S9);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s10) == OFF_S10);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, s11) == OFF_S11);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t3) == OFF_T3);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t4) == OFF_T4);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t5) == OFF_T5);
    assert!(offset_of!(TrapFrame, regs) + offset_of!(UserRegs, t6) == OFF_T6);
    assert!(size_of::<TrapFrame>() == FRAME_SIZE);
    assert!(size_of::<TrapFrame>() <= crate::config::PAGE_SIZE);
};
