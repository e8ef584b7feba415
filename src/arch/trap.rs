//! Traps from user mode (`uservec` -> `usertrap`) and from the kernel (`kernelvec`).

use super::cause::{Exception, TrapCause};
use super::hart::{Hart, Sstatus};
use super::interrupt::{dev_intr, DevIntr};
use crate::config::ECALL_LEN;
use crate::drivers::Devices;
use crate::kernel::clock::Timekeeper;
use crate::kernel::proc::{Proc, Scheduler};
use crate::kernel::syscall::Syscalls;

/// Everything a trap may call out to.
pub trait Kernel: Scheduler + Devices + Syscalls {}

impl<K: Scheduler + Devices + Syscalls + ?Sized> Kernel for K {}

/// Addresses the dispatcher installs in `stvec` and in the trapframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapVectors {
    /// Supervisor-mode trap entry
    pub kernelvec: usize,
    /// User-mode trap entry, as mapped in the trampoline page
    pub uservec: usize,
    /// Return to user mode, as mapped in the trampoline page
    pub userret: usize,
    /// Kernel handler `uservec` jumps to
    pub usertrap: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTrapOutcome {
    /// Return to user space
    Resume,
    /// The process must exit with this status
    Exit(i32),
}

/// What `userret` needs after [`prepare_user_return`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserReturn {
    /// Trampoline address of `userret`
    pub userret: usize,
    /// User page table, passed to `userret` in `a0`
    pub satp: usize,
}

fn current<K: Scheduler + ?Sized>(kernel: &mut K) -> &mut Proc {
    match kernel.current() {
        Some(p) => p,
        None => panic!("usertrap: no current process"),
    }
}

/// Handle an interrupt, exception or system call from user space.
pub fn user_trap<H, K>(
    hart: &H,
    kernel: &mut K,
    clock: &Timekeeper,
    vectors: &TrapVectors,
) -> UserTrapOutcome
where
    H: Hart + ?Sized,
    K: Kernel + ?Sized,
{
    if hart.sstatus().contains(Sstatus::SPP) {
        panic!("usertrap: not from user mode");
    }

    // We're in the kernel now; further traps go to kernel_trap.
    hart.set_stvec(vectors.kernelvec);

    let p = current(kernel);
    p.trapframe().regs.epc = hart.sepc();

    let scause = hart.scause();
    let mut which = DevIntr::Unknown;

    if TrapCause::from_bits(scause) == TrapCause::Exception(Exception::UserEnvCall) {
        if p.killed() {
            return UserTrapOutcome::Exit(-1);
        }

        // Return to the instruction after the ecall.
        p.trapframe().regs.epc += ECALL_LEN;

        // sepc, scause and sstatus are consumed; a trap may clobber them now.
        hart.intr_on();

        kernel.syscall();
    } else {
        which = dev_intr(hart, kernel, clock);
        if which == DevIntr::Unknown {
            let p = current(kernel);
            log::warn!(
                "usertrap: unexpected scause {:#x} ({}) pid={} sepc={:#x} stval={:#x}",
                scause,
                TrapCause::from_bits(scause),
                p.pid,
                hart.sepc(),
                hart.stval()
            );
            p.set_killed();
        }
    }

    let p = current(kernel);
    if p.killed() {
        return UserTrapOutcome::Exit(-1);
    }

    if which == DevIntr::Timer {
        p.alarm_tick();
        kernel.yield_cpu();
    }

    UserTrapOutcome::Resume
}

/// Set up the hart and the trapframe for `userret`.
///
/// Interrupts stay off from here until `sret`: `stvec` now points at
/// `uservec`, which must not run while still in the kernel.
pub fn prepare_user_return<H: Hart + ?Sized>(
    hart: &H,
    vectors: &TrapVectors,
    p: &mut Proc,
) -> UserReturn {
    hart.intr_off();

    hart.set_stvec(vectors.uservec);

    let kernel_sp = p.kstack_top();
    let satp = p.satp();
    let tf = p.trapframe();
    tf.kernel_satp = hart.satp();
    tf.kernel_sp = kernel_sp;
    tf.kernel_trap = vectors.usertrap;
    tf.kernel_hartid = hart.id();

    // sret to user mode with interrupts enabled
    let mut status = hart.sstatus();
    status.remove(Sstatus::SPP);
    status.insert(Sstatus::SPIE);
    hart.set_sstatus(status);

    hart.set_sepc(tf.regs.epc);

    UserReturn {
        userret: vectors.userret,
        satp,
    }
}

/// Handle an interrupt taken in supervisor mode, on whatever kernel stack was
/// current.
pub fn kernel_trap<H, K>(hart: &H, kernel: &mut K, clock: &Timekeeper)
where
    H: Hart + ?Sized,
    K: Scheduler + Devices + ?Sized,
{
    let sepc = hart.sepc();
    let sstatus = hart.sstatus();
    let scause = hart.scause();

    if !sstatus.contains(Sstatus::SPP) {
        panic!("kerneltrap: not from supervisor mode");
    }
    if hart.intr_get() {
        panic!("kerneltrap: interrupts enabled");
    }

    let which = dev_intr(hart, kernel, clock);
    if which == DevIntr::Unknown {
        let cause = TrapCause::from_bits(scause);
        let stval = hart.stval();
        log::error!("kerneltrap: {cause} scause={scause:#x} sepc={sepc:#x} stval={stval:#x}");
        panic!("kerneltrap: {cause} scause={scause:#x} sepc={sepc:#x} stval={stval:#x}");
    }

    if which == DevIntr::Timer && kernel.current().is_some() {
        kernel.yield_cpu();
    }

    // yield_cpu may have taken traps that overwrote these
    hart.set_sepc(sepc);
    hart.set_sstatus(sstatus);
}

/// `usertrap`: handle a trap from user space, then return to it.
///
/// Exits the process instead if it was killed.
#[cfg(target_arch = "riscv64")]
pub fn user_trap_entry<K: Kernel + ?Sized>(
    kernel: &mut K,
    clock: &Timekeeper,
    vectors: &TrapVectors,
) -> ! {
    let hart = super::riscv64::Riscv64Hart;
    if let UserTrapOutcome::Exit(status) = user_trap(&hart, kernel, clock, vectors) {
        kernel.exit(status);
    }
    user_trap_return(kernel, vectors)
}

/// Return to user space in the current process.
#[cfg(target_arch = "riscv64")]
pub fn user_trap_return<K: Kernel + ?Sized>(kernel: &mut K, vectors: &TrapVectors) -> ! {
    let hart = super::riscv64::Riscv64Hart;
    let Some(p) = kernel.current() else {
        panic!("usertrapret: no current process");
    };
    let ret = prepare_user_return(&hart, vectors, p);
    // Safety: the hart and trapframe were just set up for userret
    unsafe { super::riscv64::enter_user(ret.userret, ret.satp) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::frame::TrapFrame;
    use crate::config::{make_satp, KSTACK_SIZE, UART0_IRQ};
    use crate::error::SysError;
    use crate::kernel::alarm::AlarmState;
    use crate::kernel::syscall::SYS_SLEEP;
    use crate::testing::{init_logger, MockHart, MockKernel, KSTACK, PAGETABLE};
    use std::rc::Rc;

    const TIMER: usize = 0x8000_0000_0000_0005;
    const EXTERNAL: usize = 0x8000_0000_0000_0009;
    const ECALL: usize = 8;
    const LOAD_PAGE_FAULT: usize = 13;

    const VECTORS: TrapVectors = TrapVectors {
        kernelvec: 0x8000_1000,
        uservec: 0x3f_ffff_f000,
        userret: 0x3f_ffff_f09c,
        usertrap: 0x8000_2000,
    };

    fn setup() -> (Rc<MockHart>, MockKernel, Timekeeper) {
        init_logger();
        let hart = Rc::new(MockHart::new(0));
        let k = MockKernel::new(hart.clone());
        (hart, k, Timekeeper::new(0, 1_000))
    }

    fn in_kernel(hart: &MockHart) {
        hart.set_sstatus(Sstatus::SPP | Sstatus::SPIE);
    }

    #[test]
    fn ecall_runs_syscall_once_with_interrupts_on() {
        let (hart, mut k, clock) = setup();
        hart.raise(ECALL, 0x1000, 0);

        let out = user_trap(&*hart, &mut k, &clock, &VECTORS);

        assert_eq!(out, UserTrapOutcome::Resume);
        assert_eq!(k.regs().epc, 0x1004);
        assert_eq!(k.syscalls, 1);
        assert_eq!(k.syscall_intr, [true]);
        assert_eq!(hart.stvec.get(), VECTORS.kernelvec);
        assert_eq!(k.yields, 0);
    }

    #[test]
    fn ecall_from_killed_process_exits_before_syscall() {
        let (hart, mut k, clock) = setup();
        k.proc().set_killed();
        hart.raise(ECALL, 0x1000, 0);

        assert_eq!(user_trap(&*hart, &mut k, &clock, &VECTORS), UserTrapOutcome::Exit(-1));
        assert_eq!(k.syscalls, 0);
        assert_eq!(k.regs().epc, 0x1000);
    }

    #[test]
    fn killed_during_syscall_exits() {
        let (hart, mut k, _) = setup();
        let clock = Rc::new(Timekeeper::new(0, 1_000));
        k.clock = Some(clock.clone());
        k.ticker = Some(MockHart::new(0));
        k.kill_after_sleeps = Some(1);
        k.regs().a7 = SYS_SLEEP;
        k.regs().a0 = 5;
        hart.raise(ECALL, 0x1000, 0);

        assert_eq!(user_trap(&*hart, &mut k, &clock, &VECTORS), UserTrapOutcome::Exit(-1));
        assert_eq!(k.syscalls, 1);
        assert_eq!(k.sleeps, 1);
        assert_eq!(k.regs().a0, SysError::Killed.as_usize());
        assert_eq!(k.yields, 0);
    }

    #[test]
    fn unknown_user_trap_kills() {
        let (hart, mut k, clock) = setup();
        hart.raise(LOAD_PAGE_FAULT, 0x1000, 0xdead_0000);

        assert_eq!(user_trap(&*hart, &mut k, &clock, &VECTORS), UserTrapOutcome::Exit(-1));
        assert!(k.proc().killed());
        assert_eq!(k.syscalls, 0);
    }

    #[test]
    fn kill_from_elsewhere_is_noticed_after_interrupt() {
        let (hart, mut k, clock) = setup();
        k.proc().set_killed();
        k.plic.pending.borrow_mut().push_back(UART0_IRQ);
        hart.raise(EXTERNAL, 0x1000, 0);

        assert_eq!(user_trap(&*hart, &mut k, &clock, &VECTORS), UserTrapOutcome::Exit(-1));
        assert_eq!(k.uart_intrs, 1);
    }

    #[test]
    fn device_interrupt_resumes_without_yield() {
        let (hart, mut k, clock) = setup();
        k.plic.pending.borrow_mut().push_back(UART0_IRQ);
        hart.raise(EXTERNAL, 0x1000, 0);

        assert_eq!(user_trap(&*hart, &mut k, &clock, &VECTORS), UserTrapOutcome::Resume);
        assert_eq!(k.regs().epc, 0x1000);
        assert_eq!(k.yields, 0);
    }

    #[test]
    fn timer_ticks_alarm_and_yields() {
        let (hart, mut k, clock) = setup();
        k.proc().configure_alarm(2, 0x4000);
        hart.raise(TIMER, 0x1000, 0);

        user_trap(&*hart, &mut k, &clock, &VECTORS);
        assert_eq!(k.yields, 1);
        assert_eq!(k.regs().epc, 0x1000);

        hart.raise(TIMER, 0x1008, 0);
        user_trap(&*hart, &mut k, &clock, &VECTORS);
        assert_eq!(k.yields, 2);
        assert_eq!(k.regs().epc, 0x4000);
        assert_eq!(k.proc().alarm().saved().map(|r| r.epc), Some(0x1008));
        assert_eq!(clock.ticks(&*hart), 2);
    }

    #[test]
    fn timer_on_killed_process_exits_before_alarm() {
        let (hart, mut k, clock) = setup();
        k.proc().configure_alarm(1, 0x4000);
        k.proc().set_killed();
        hart.raise(TIMER, 0x1000, 0);

        assert_eq!(user_trap(&*hart, &mut k, &clock, &VECTORS), UserTrapOutcome::Exit(-1));
        assert_eq!(k.yields, 0);
        assert_eq!(k.regs().epc, 0x1000);
        assert_eq!(k.proc().alarm().state(), AlarmState::Idle);
        assert_eq!(k.proc().alarm().saved(), None);
        // the tick itself still counts
        assert_eq!(clock.ticks(&*hart), 1);
    }

    #[test]
    #[should_panic(expected = "usertrap: not from user mode")]
    fn user_trap_from_supervisor_is_fatal() {
        let (hart, mut k, clock) = setup();
        in_kernel(&hart);
        hart.raise(ECALL, 0x1000, 0);
        user_trap(&*hart, &mut k, &clock, &VECTORS);
    }

    #[test]
    fn user_return_fills_kernel_context() {
        let hart = MockHart::new(3);
        hart.satp.set(0x8000_0000_0008_0200);
        hart.set_sstatus(Sstatus::SPP | Sstatus::SIE | Sstatus::from_bits_retain(1 << 18));
        let mut k = MockKernel::new(Rc::new(MockHart::new(3)));
        k.regs().epc = 0x1234;

        let ret = prepare_user_return(&hart, &VECTORS, k.proc());

        assert_eq!(ret, UserReturn { userret: VECTORS.userret, satp: make_satp(PAGETABLE) });
        assert_eq!(hart.stvec.get(), VECTORS.uservec);
        assert_eq!(hart.sepc.get(), 0x1234);
        assert_eq!(
            hart.sstatus(),
            Sstatus::SPIE | Sstatus::from_bits_retain(1 << 18),
            "user mode, interrupts on after sret, off until then"
        );

        let tf: TrapFrame = *k.proc().trapframe();
        assert_eq!(tf.kernel_satp, 0x8000_0000_0008_0200);
        assert_eq!(tf.kernel_sp, KSTACK + KSTACK_SIZE);
        assert_eq!(tf.kernel_trap, VECTORS.usertrap);
        assert_eq!(tf.kernel_hartid, 3);
    }

    #[test]
    fn alarm_diversion_survives_user_return() {
        let (hart, mut k, clock) = setup();
        k.proc().configure_alarm(1, 0x4000);
        hart.raise(TIMER, 0x1000, 0);

        user_trap(&*hart, &mut k, &clock, &VECTORS);
        prepare_user_return(&*hart, &VECTORS, k.proc());
        assert_eq!(hart.sepc.get(), 0x4000);
    }

    #[test]
    fn kernel_timer_yields_and_restores_state() {
        let (hart, mut k, clock) = setup();
        in_kernel(&hart);
        hart.raise(TIMER, 0x8000_5000, 0);

        kernel_trap(&*hart, &mut k, &clock);

        assert_eq!(k.yields, 1);
        assert_eq!(hart.sepc.get(), 0x8000_5000);
        assert_eq!(hart.sstatus(), Sstatus::SPP | Sstatus::SPIE);
        // kernel traps never charge the alarm
        assert_eq!(k.proc().alarm().state(), AlarmState::Disabled);
        assert_eq!(clock.ticks(&*hart), 1);
    }

    #[test]
    fn kernel_timer_without_process_does_not_yield() {
        let hart = Rc::new(MockHart::new(0));
        let mut k = MockKernel::idle(hart.clone());
        let clock = Timekeeper::new(0, 1_000);
        in_kernel(&hart);
        hart.raise(TIMER, 0x8000_5000, 0);

        kernel_trap(&*hart, &mut k, &clock);
        assert_eq!(k.yields, 0);
    }

    #[test]
    fn kernel_device_interrupt() {
        let (hart, mut k, clock) = setup();
        in_kernel(&hart);
        k.plic.pending.borrow_mut().push_back(UART0_IRQ);
        hart.raise(EXTERNAL, 0x8000_5000, 0);

        kernel_trap(&*hart, &mut k, &clock);
        assert_eq!(k.uart_intrs, 1);
        assert_eq!(k.yields, 0);
    }

    #[test]
    #[should_panic(expected = "kerneltrap: load page fault scause=0xd")]
    fn unknown_kernel_trap_is_fatal() {
        let (hart, mut k, clock) = setup();
        in_kernel(&hart);
        hart.raise(LOAD_PAGE_FAULT, 0x8000_5000, 0x10);
        kernel_trap(&*hart, &mut k, &clock);
    }

    #[test]
    #[should_panic(expected = "kerneltrap: not from supervisor mode")]
    fn kernel_trap_from_user_is_fatal() {
        let (hart, mut k, clock) = setup();
        hart.raise(TIMER, 0x1000, 0);
        kernel_trap(&*hart, &mut k, &clock);
    }

    #[test]
    #[should_panic(expected = "kerneltrap: interrupts enabled")]
    fn kernel_trap_with_interrupts_on_is_fatal() {
        let (hart, mut k, clock) = setup();
        hart.set_sstatus(Sstatus::SPP | Sstatus::SIE);
        hart.raise(TIMER, 0x8000_5000, 0);
        kernel_trap(&*hart, &mut k, &clock);
    }
}
