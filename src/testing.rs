//! Host-side stand-ins for the hart and the rest of the kernel.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::ptr::NonNull;
use std::rc::Rc;

use spin::{Mutex, MutexGuard};

use crate::arch::frame::{TrapFrame, UserRegs};
use crate::arch::hart::{Hart, Sstatus};
use crate::drivers::plic::InterruptController;
use crate::drivers::Devices;
use crate::kernel::clock::Timekeeper;
use crate::kernel::proc::{Channel, Proc, Scheduler, Sleep, Wakeup};
use crate::kernel::syscall::{self, Syscalls};

pub const KSTACK: usize = 0x3f_ffff_c000;
pub const PAGETABLE: usize = 0x8765_4000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// CSRs as plain cells. Starts in user mode with interrupts off.
#[derive(Debug, Default)]
pub struct MockHart {
    pub id: usize,
    pub scause: Cell<usize>,
    pub stval: Cell<usize>,
    pub sepc: Cell<usize>,
    pub sstatus: Cell<Sstatus>,
    pub stvec: Cell<usize>,
    pub satp: Cell<usize>,
    pub time: Cell<u64>,
    pub timecmp: Cell<Option<u64>>,
}

impl MockHart {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            sstatus: Cell::new(Sstatus::empty()),
            ..Default::default()
        }
    }

    /// Latch a trap: `scause`, `sepc` and `stval` as the hardware would.
    pub fn raise(&self, scause: usize, sepc: usize, stval: usize) {
        self.scause.set(scause);
        self.sepc.set(sepc);
        self.stval.set(stval);
    }
}

impl Hart for MockHart {
    fn id(&self) -> usize {
        self.id
    }
    fn scause(&self) -> usize {
        self.scause.get()
    }
    fn stval(&self) -> usize {
        self.stval.get()
    }
    fn sepc(&self) -> usize {
        self.sepc.get()
    }
    fn set_sepc(&self, pc: usize) {
        self.sepc.set(pc)
    }
    fn sstatus(&self) -> Sstatus {
        self.sstatus.get()
    }
    fn set_sstatus(&self, status: Sstatus) {
        self.sstatus.set(status)
    }
    fn set_stvec(&self, vector: usize) {
        self.stvec.set(vector)
    }
    fn satp(&self) -> usize {
        self.satp.get()
    }
    fn time(&self) -> u64 {
        self.time.get()
    }
    fn set_timecmp(&self, deadline: u64) {
        self.timecmp.set(Some(deadline))
    }
}

/// Interrupt controller fed from a queue. `0` means nothing pending.
#[derive(Debug, Default)]
pub struct MockPlic {
    pub pending: RefCell<VecDeque<u32>>,
    pub claimed: RefCell<Vec<(usize, u32)>>,
    pub completed: RefCell<Vec<(usize, u32)>>,
}

impl InterruptController for MockPlic {
    fn claim(&self, hart: usize) -> Option<u32> {
        let irq = self.pending.borrow_mut().pop_front().filter(|&irq| irq != 0)?;
        self.claimed.borrow_mut().push((hart, irq));
        Some(irq)
    }

    fn complete(&self, hart: usize, irq: u32) {
        self.completed.borrow_mut().push((hart, irq));
    }
}

/// Scheduler, device and syscall collaborators with a single process.
pub struct MockKernel {
    pub hart: Rc<MockHart>,
    pub proc: Option<Proc>,
    pub plic: MockPlic,
    pub yields: usize,
    pub syscalls: usize,
    /// Whether interrupts were enabled during each syscall
    pub syscall_intr: Vec<bool>,
    pub uart_intrs: usize,
    pub disk_intrs: usize,
    pub wakeups: RefCell<Vec<Channel>>,
    /// When set, syscalls are routed through [`syscall::dispatch`]
    pub clock: Option<Rc<Timekeeper>>,
    /// Advance `clock` from this hart on every sleep
    pub ticker: Option<MockHart>,
    pub sleeps: usize,
    pub kill_after_sleeps: Option<usize>,
}

impl MockKernel {
    pub fn new(hart: Rc<MockHart>) -> Self {
        let frame = NonNull::from(Box::leak(Box::new(TrapFrame::default())));
        // Safety: the leaked frame lives forever and only this process uses it
        let proc = unsafe { Proc::new(1, frame, KSTACK, PAGETABLE) };
        Self {
            hart,
            proc: Some(proc),
            plic: MockPlic::default(),
            yields: 0,
            syscalls: 0,
            syscall_intr: Vec::new(),
            uart_intrs: 0,
            disk_intrs: 0,
            wakeups: RefCell::new(Vec::new()),
            clock: None,
            ticker: None,
            sleeps: 0,
            kill_after_sleeps: None,
        }
    }

    pub fn idle(hart: Rc<MockHart>) -> Self {
        Self { proc: None, ..Self::new(hart) }
    }

    pub fn proc(&mut self) -> &mut Proc {
        self.proc.as_mut().expect("no process")
    }

    pub fn regs(&mut self) -> &mut UserRegs {
        &mut self.proc().trapframe().regs
    }
}

impl Wakeup for MockKernel {
    fn wakeup(&self, chan: Channel) {
        self.wakeups.borrow_mut().push(chan);
    }
}

impl Scheduler for MockKernel {
    fn current(&mut self) -> Option<&mut Proc> {
        self.proc.as_mut()
    }

    fn yield_cpu(&mut self) {
        self.yields += 1;
    }

    fn exit(&mut self, status: i32) -> ! {
        panic!("exit({status})")
    }
}

impl Sleep for MockKernel {
    fn killed(&mut self) -> bool {
        self.proc.as_ref().is_some_and(Proc::killed)
    }

    fn sleep<'a, T>(
        &mut self,
        _chan: Channel,
        guard: MutexGuard<'a, T>,
        lock: &'a Mutex<T>,
    ) -> MutexGuard<'a, T> {
        drop(guard);
        self.sleeps += 1;
        if self.kill_after_sleeps == Some(self.sleeps) {
            self.proc().set_killed();
        }
        if let (Some(clock), Some(ticker)) = (self.clock.clone(), self.ticker.as_ref()) {
            clock.advance(ticker, &*self);
        }
        lock.lock()
    }
}

impl Devices for MockKernel {
    type Irq = MockPlic;

    fn irq_controller(&self) -> &MockPlic {
        &self.plic
    }

    fn uart_intr(&mut self) {
        self.uart_intrs += 1;
    }

    fn disk_intr(&mut self) {
        self.disk_intrs += 1;
    }
}

impl Syscalls for MockKernel {
    fn syscall(&mut self) {
        self.syscalls += 1;
        self.syscall_intr.push(self.hart.intr_get());
        if let Some(clock) = self.clock.clone() {
            let hart = self.hart.clone();
            syscall::dispatch(&*hart, &clock, self);
        }
    }
}
