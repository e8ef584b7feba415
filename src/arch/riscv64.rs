use core::arch::asm;

use riscv::register::stvec::{self, Stvec, TrapMode};
use riscv::register::{satp, scause, sepc, sie, sstatus, stval, time};

use super::hart::{Hart, Sstatus};
use super::trap::TrapVectors;
use crate::config::TRAMPOLINE;

extern "C" {
    fn trampoline();
    fn uservec();
    fn userret();
    pub fn kernelvec();
}

/// The hart this code is running on.
#[derive(Debug, Clone, Copy, Default)]
pub struct Riscv64Hart;

impl Hart for Riscv64Hart {
    fn id(&self) -> usize {
        let id: usize;
        unsafe { asm!("mv {}, tp", out(reg) id, options(nomem, nostack)) };
        id
    }

    fn scause(&self) -> usize {
        scause::read().bits()
    }

    fn stval(&self) -> usize {
        stval::read()
    }

    fn sepc(&self) -> usize {
        sepc::read()
    }

    fn set_sepc(&self, pc: usize) {
        #[allow(unused_unsafe)]
        unsafe {
            sepc::write(pc);
        }
    }

    fn sstatus(&self) -> Sstatus {
        Sstatus::from_bits_retain(sstatus::read().bits())
    }

    fn set_sstatus(&self, status: Sstatus) {
        #[allow(unused_unsafe)]
        unsafe {
            sstatus::write(sstatus::Sstatus::from_bits(status.bits()));
        }
    }

    fn set_stvec(&self, vector: usize) {
        #[allow(unused_unsafe)]
        unsafe {
            stvec::write(Stvec::new(vector, TrapMode::Direct));
        }
    }

    fn satp(&self) -> usize {
        satp::read().bits()
    }

    fn time(&self) -> u64 {
        time::read64()
    }

    fn set_timecmp(&self, deadline: u64) {
        // stimecmp (Sstc) has no accessor in the riscv crate
        unsafe { asm!("csrw 0x14d, {}", in(reg) deadline, options(nostack)) };
    }
}

impl TrapVectors {
    /// Vectors of the running kernel. `uservec`/`userret` are translated to
    /// their trampoline-page addresses, the only mapping user page tables
    /// share with the kernel.
    pub fn current(usertrap: usize) -> Self {
        let base = trampoline as usize;
        Self {
            kernelvec: kernelvec as usize,
            uservec: TRAMPOLINE + (uservec as usize - base),
            userret: TRAMPOLINE + (userret as usize - base),
            usertrap,
        }
    }
}

/// Enable supervisor timer and external interrupts in `sie`.
pub fn enable_device_interrupts() {
    #[allow(unused_unsafe)]
    unsafe {
        sie::set_stimer();
        sie::set_sext();
    }
}

/// Jump to `userret` in the trampoline, which switches to the user page
/// table `satp`, restores user registers from the trapframe and `sret`s.
///
/// # Safety
///
/// The hart must have been prepared by
/// [`prepare_user_return`](super::trap::prepare_user_return), and the
/// trapframe must be mapped at `TRAPFRAME` in the page table `satp` names.
pub unsafe fn enter_user(userret: usize, satp: usize) -> ! {
    asm!("jr {0}", in(reg) userret, in("a0") satp, options(noreturn));
}
