use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::{Mutex, MutexGuard};

use super::alarm::Alarm;
use crate::arch::frame::TrapFrame;
use crate::config::{make_satp, KSTACK_SIZE};

/// Address of whatever a sleeper is waiting on.
pub type Channel = usize;

pub trait Wakeup {
    /// Wake every process sleeping on `chan`.
    fn wakeup(&self, chan: Channel);
}

pub trait Scheduler: Wakeup {
    /// Process running on this hart, if any.
    fn current(&mut self) -> Option<&mut Proc>;

    /// Give up the hart; returns when this process is scheduled again.
    fn yield_cpu(&mut self);

    /// Terminate the current process. Never returns.
    fn exit(&mut self, status: i32) -> !;
}

pub trait Sleep {
    /// Whether the sleeping process has been killed.
    fn killed(&mut self) -> bool;

    /// Atomically release `guard` and sleep on `chan`; reacquire `lock`
    /// before returning.
    fn sleep<'a, T>(
        &mut self,
        chan: Channel,
        guard: MutexGuard<'a, T>,
        lock: &'a Mutex<T>,
    ) -> MutexGuard<'a, T>;
}

pub struct Proc {
    pub pid: usize,
    killed: AtomicBool,
    trapframe: NonNull<TrapFrame>,
    kstack: usize,
    pagetable: usize,
    alarm: Alarm,
}

impl Proc {
    /// # Safety
    ///
    /// `trapframe` must stay valid for the life of the process and must not
    /// be accessed by anything but this record while the process is in the
    /// kernel.
    pub unsafe fn new(
        pid: usize,
        trapframe: NonNull<TrapFrame>,
        kstack: usize,
        pagetable: usize,
    ) -> Self {
        Self {
            pid,
            killed: AtomicBool::new(false),
            trapframe,
            kstack,
            pagetable,
            alarm: Alarm::new(),
        }
    }

    pub fn trapframe(&mut self) -> &mut TrapFrame {
        // Safety: guaranteed by the contract of `Proc::new`
        unsafe { self.trapframe.as_mut() }
    }

    pub fn killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    /// Mark the process for termination at its next kill check.
    pub fn set_killed(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn kstack_top(&self) -> usize {
        self.kstack + KSTACK_SIZE
    }

    /// `satp` value for the user page table.
    pub fn satp(&self) -> usize {
        make_satp(self.pagetable)
    }

    pub fn alarm(&self) -> &Alarm {
        &self.alarm
    }

    /// Charge a timer tick to the alarm; may divert the saved frame.
    pub fn alarm_tick(&mut self) -> bool {
        // Safety: see `trapframe`
        let tf = unsafe { self.trapframe.as_mut() };
        self.alarm.on_tick(&mut tf.regs)
    }

    pub fn configure_alarm(&mut self, interval: usize, handler: usize) {
        self.alarm.configure(interval, handler);
    }

    /// Undo the outstanding diversion; returns the value for `a0`.
    pub fn acknowledge_alarm(&mut self) -> usize {
        // Safety: see `trapframe`
        let tf = unsafe { self.trapframe.as_mut() };
        self.alarm.acknowledge(&mut tf.regs)
    }
}

impl core::fmt::Debug for Proc {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Proc")
            .field("pid", &self.pid)
            .field("killed", &self.killed())
            .field("alarm", &self.alarm.state())
            .finish()
    }
}
