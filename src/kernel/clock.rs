use spin::Mutex;

use super::proc::{Channel, Sleep, Wakeup};
use crate::arch::hart::{Hart, NoInterrupts};
use crate::arch::timer;
use crate::error::SysError;

/// Ticks since boot, advanced by a single designated hart.
///
/// Every hart takes its own timer interrupt, so counting on all of them
/// would multiply the rate by the number of harts.
pub struct Timekeeper {
    ticks: Mutex<u64>,
    timekeeper_hart: usize,
    interval: u64,
}

impl Timekeeper {
    pub const fn new(timekeeper_hart: usize, interval: u64) -> Self {
        Self {
            ticks: Mutex::new(0),
            timekeeper_hart,
            interval,
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Timer interrupt on `hart`. Counts and wakes sleepers on the designated
    /// hart only; re-arms the timer everywhere.
    pub fn advance<H, W>(&self, hart: &H, waker: &W)
    where
        H: Hart + ?Sized,
        W: Wakeup + ?Sized,
    {
        if hart.id() == self.timekeeper_hart {
            let mut ticks = self.ticks.lock();
            *ticks += 1;
            waker.wakeup(self.channel());
        }
        timer::arm_next(hart, self.interval);
    }

    pub fn ticks<H: Hart + ?Sized>(&self, hart: &H) -> u64 {
        let _intr = NoInterrupts::new(hart);
        *self.ticks.lock()
    }

    /// Sleepers waiting for the next tick sleep here.
    pub fn channel(&self) -> Channel {
        &self.ticks as *const Mutex<u64> as Channel
    }

    /// Block the calling process for `n` ticks.
    pub fn sleep<H, S>(&self, hart: &H, n: u64, waiter: &mut S) -> Result<(), SysError>
    where
        H: Hart + ?Sized,
        S: Sleep + ?Sized,
    {
        let _intr = NoInterrupts::new(hart);
        let mut ticks = self.ticks.lock();
        let start = *ticks;
        while *ticks - start < n {
            if waiter.killed() {
                return Err(SysError::Killed);
            }
            ticks = waiter.sleep(self.channel(), ticks, &self.ticks);
        }
        Ok(())
    }
}
