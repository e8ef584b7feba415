use super::clock::Timekeeper;
use super::proc::{Proc, Scheduler, Sleep};
use crate::arch::hart::Hart;
use crate::error::SysError;

pub const SYS_SLEEP: usize = 13;
pub const SYS_UPTIME: usize = 14;
pub const SYS_SIGALARM: usize = 22;
pub const SYS_SIGRETURN: usize = 23;

/// The system-call layer, entered from the user trap path with interrupts
/// enabled. Arguments and the result travel in the current trapframe.
pub trait Syscalls {
    fn syscall(&mut self);
}

/// Run the call numbered in `a7` and store the result in `a0`.
pub fn dispatch<H, S>(hart: &H, clock: &Timekeeper, sched: &mut S)
where
    H: Hart + ?Sized,
    S: Scheduler + Sleep + ?Sized,
{
    let Some(p) = sched.current() else {
        log::error!("syscall: no current process");
        return;
    };
    let num = p.trapframe().regs.a7;
    let pid = p.pid;

    let result = match num {
        SYS_SLEEP => sys_sleep(hart, clock, sched),
        SYS_UPTIME => sys_uptime(hart, clock),
        SYS_SIGALARM => current(sched).and_then(sys_sigalarm),
        SYS_SIGRETURN => current(sched).and_then(sys_sigreturn),
        _ => {
            log::warn!("pid {pid}: unknown sys call {num}");
            Err(SysError::NoSys)
        }
    };

    if let Ok(p) = current(sched) {
        p.trapframe().regs.a0 = result.unwrap_or_else(SysError::as_usize);
    }
}

fn current<S: Scheduler + ?Sized>(sched: &mut S) -> Result<&mut Proc, SysError> {
    sched.current().ok_or(SysError::NoProcess)
}

/// `sigalarm(ticks, handler)`: call `handler` every `ticks` ticks; 0 stops.
pub fn sys_sigalarm(p: &mut Proc) -> Result<usize, SysError> {
    let regs = &p.trapframe().regs;
    let ticks = regs.arg(0) as isize;
    let handler = regs.arg(1);
    if ticks < 0 {
        return Err(SysError::InvalidArgument);
    }
    p.configure_alarm(ticks as usize, handler);
    Ok(0)
}

/// `sigreturn()`: resume where the alarm interrupted.
///
/// The result is the restored `a0`, so storing it leaves the frame as it was.
pub fn sys_sigreturn(p: &mut Proc) -> Result<usize, SysError> {
    Ok(p.acknowledge_alarm())
}

pub fn sys_uptime<H: Hart + ?Sized>(hart: &H, clock: &Timekeeper) -> Result<usize, SysError> {
    Ok(clock.ticks(hart) as usize)
}

/// `sleep(n)`: block for `n` ticks.
pub fn sys_sleep<H, S>(hart: &H, clock: &Timekeeper, sched: &mut S) -> Result<usize, SysError>
where
    H: Hart + ?Sized,
    S: Scheduler + Sleep + ?Sized,
{
    let n = current(sched)?.trapframe().regs.arg(0) as isize;
    if n < 0 {
        return Err(SysError::InvalidArgument);
    }
    clock.sleep(hart, n as u64, sched)?;
    Ok(0)
}
