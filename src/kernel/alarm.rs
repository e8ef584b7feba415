//! Periodic user alarms. At most one diversion is outstanding per process;
//! ticks that arrive while the handler runs are not counted.

use crate::arch::frame::UserRegs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// Interval is zero
    Disabled,
    /// Counting ticks toward the next diversion
    Idle,
    /// A diversion is outstanding; waiting for acknowledgement
    Suspended,
}

#[derive(Debug, Clone)]
pub struct Alarm {
    interval: usize,
    handler: usize,
    elapsed: usize,
    permitted: bool,
    saved: UserRegs,
}

impl Alarm {
    pub fn new() -> Self {
        Self {
            interval: 0,
            handler: 0,
            elapsed: 0,
            permitted: true,
            saved: UserRegs::default(),
        }
    }

    pub fn state(&self) -> AlarmState {
        if !self.permitted {
            AlarmState::Suspended
        } else if self.interval == 0 {
            AlarmState::Disabled
        } else {
            AlarmState::Idle
        }
    }

    pub fn interval(&self) -> usize {
        self.interval
    }

    pub fn handler(&self) -> usize {
        self.handler
    }

    /// Ticks counted since the last diversion or reconfiguration.
    pub fn elapsed(&self) -> usize {
        self.elapsed
    }

    /// State captured when the outstanding diversion was taken.
    pub fn saved(&self) -> Option<&UserRegs> {
        (!self.permitted).then_some(&self.saved)
    }

    /// Set the interval (0 disables) and the handler entry point.
    ///
    /// An outstanding diversion stays outstanding.
    pub fn configure(&mut self, interval: usize, handler: usize) {
        self.interval = interval;
        self.handler = handler;
        self.elapsed = 0;
        log::debug!("alarm: interval={interval} handler={handler:#x}");
    }

    /// Charge one timer tick. Returns `true` if `regs` now resumes in the
    /// handler.
    pub fn on_tick(&mut self, regs: &mut UserRegs) -> bool {
        if self.state() != AlarmState::Idle {
            return false;
        }

        self.elapsed += 1;
        if self.elapsed < self.interval {
            return false;
        }

        self.permitted = false;
        self.elapsed = 0;
        self.saved = *regs;
        regs.epc = self.handler;
        log::trace!("alarm: diverting {:#x} -> {:#x}", self.saved.epc, self.handler);
        true
    }

    /// Reverse the outstanding diversion.
    ///
    /// Returns the restored `a0`, so a system-call layer that stores the
    /// result in `a0` leaves the restored frame untouched. Without an
    /// outstanding diversion nothing changes and the current `a0` is returned.
    pub fn acknowledge(&mut self, regs: &mut UserRegs) -> usize {
        if self.permitted {
            log::debug!("alarm: acknowledge without an outstanding diversion");
            return regs.a0;
        }

        *regs = self.saved;
        self.permitted = true;
        regs.a0
    }
}

impl Default for Alarm {
    fn default() -> Self {
        Self::new()
    }
}
