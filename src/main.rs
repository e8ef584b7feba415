#![no_std]
#![no_main]

mod panic_handler;

use core::arch::asm;

use log::{info, warn};
use riscv_rt::entry;
use spin::{Mutex, MutexGuard};

use rvtrap::arch::hart::Hart;
use rvtrap::arch::riscv64::{self, Riscv64Hart};
use rvtrap::arch::{kernel_trap, timer, user_trap_entry, TrapVectors};
use rvtrap::config::{PLIC_BASE, TIMEKEEPER_HART, TIMER_INTERVAL, UART0_BASE};
use rvtrap::drivers::plic::Plic;
use rvtrap::drivers::uart::Uart;
use rvtrap::drivers::Devices;
use rvtrap::kernel::clock::Timekeeper;
use rvtrap::kernel::logger::UartLogger;
use rvtrap::kernel::proc::{Channel, Proc, Scheduler, Sleep, Wakeup};
use rvtrap::kernel::syscall::{self, Syscalls};

static CLOCK: Timekeeper = Timekeeper::new(TIMEKEEPER_HART, TIMER_INTERVAL);
static PLIC: Plic = unsafe { Plic::new(PLIC_BASE) };
static LOGGER: UartLogger<Uart, Riscv64Hart> =
    UartLogger::new(unsafe { Uart::new(UART0_BASE) }, Riscv64Hart);

/// Log uptime this often while idle
const REPORT_TICKS: u64 = 10;

/// Kernel services for a boot image without user processes: the hart only
/// idles and serves interrupts.
struct BootKernel;

impl Wakeup for BootKernel {
    // the only sleeper is the idle loop, which polls after every interrupt
    fn wakeup(&self, _chan: Channel) {}
}

impl Scheduler for BootKernel {
    fn current(&mut self) -> Option<&mut Proc> {
        None
    }

    fn yield_cpu(&mut self) {}

    fn exit(&mut self, status: i32) -> ! {
        panic!("exit({status}) without a process");
    }
}

impl Sleep for BootKernel {
    fn killed(&mut self) -> bool {
        false
    }

    fn sleep<'a, T>(
        &mut self,
        _chan: Channel,
        guard: MutexGuard<'a, T>,
        lock: &'a Mutex<T>,
    ) -> MutexGuard<'a, T> {
        drop(guard);
        let hart = Riscv64Hart;
        hart.intr_on();
        #[allow(unused_unsafe)]
        unsafe {
            riscv::asm::wfi();
        }
        hart.intr_off();
        lock.lock()
    }
}

impl Devices for BootKernel {
    type Irq = Plic;

    fn irq_controller(&self) -> &Plic {
        &PLIC
    }

    fn uart_intr(&mut self) {
        LOGGER.with_output(|uart| uart.handle_interrupt());
    }

    fn disk_intr(&mut self) {
        warn!("virtio disk interrupt with no disk driver");
    }
}

impl Syscalls for BootKernel {
    fn syscall(&mut self) {
        syscall::dispatch(&Riscv64Hart, &CLOCK, self);
    }
}

fn vectors() -> TrapVectors {
    TrapVectors::current(usertrap as usize)
}

/// Called by `kernelvec`.
#[no_mangle]
pub extern "C" fn kerneltrap() {
    kernel_trap(&Riscv64Hart, &mut BootKernel, &CLOCK);
}

/// Jumped to by `uservec`, on the process's kernel stack.
#[no_mangle]
pub extern "C" fn usertrap() -> ! {
    user_trap_entry(&mut BootKernel, &CLOCK, &vectors())
}

#[entry]
fn main(hartid: usize) -> ! {
    // Hart::id reads tp
    unsafe { asm!("mv tp, {}", in(reg) hartid) };
    let hart = Riscv64Hart;

    LOGGER.with_output(|uart| uart.init());
    if LOGGER.init(log::STATIC_MAX_LEVEL).is_err() {
        panic!("logger already set");
    }
    info!("rvtrap: hart {hartid} booting");

    hart.set_stvec(vectors().kernelvec);
    PLIC.init();
    PLIC.init_hart(hartid);
    timer::init_timer(&hart, CLOCK.interval());
    riscv64::enable_device_interrupts();
    hart.intr_on();
    info!("trap vectors installed, timer every {} cycles", CLOCK.interval());

    let mut kernel = BootKernel;
    loop {
        if let Err(e) = CLOCK.sleep(&hart, REPORT_TICKS, &mut kernel) {
            warn!("idle sleep: {e}");
        }
        info!("uptime: {} ticks", CLOCK.ticks(&hart));
    }
}
