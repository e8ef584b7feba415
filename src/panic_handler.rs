use core::fmt::Write;
use core::panic::PanicInfo;

use riscv::register::{scause, sepc, sstatus, stval};
use rvtrap::arch::TrapCause;
use rvtrap::config::UART0_BASE;
use rvtrap::drivers::uart::Uart;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    #[allow(unused_unsafe)]
    unsafe {
        // Lock down interrupts deterministically
        sstatus::clear_sie();
    }

    // Not through the logger: its lock may be held by whoever panicked
    let mut uart = unsafe { Uart::new(UART0_BASE) };

    uart.puts("=== PANIC ===\n");

    if let Some(location) = info.location() {
        uart.puts("File: "); uart.puts(location.file()); uart.puts("\n");
        uart.puts("Line: "); uart.put_dec(location.line() as usize); uart.puts("\n");
    }
    let _ = writeln!(uart, "{}", info.message());

    let cause = scause::read().bits();
    uart.puts("Raw scause bits: 0x"); uart.put_hex(cause); uart.puts("\n");
    let _ = writeln!(uart, "Cause: {}", TrapCause::from_bits(cause));

    uart.puts("sepc (PC): 0x"); uart.put_hex(sepc::read()); uart.puts("\n");
    uart.puts("stval    : 0x"); uart.put_hex(stval::read()); uart.puts("\n");

    loop {
        #[allow(unused_unsafe)]
        unsafe {
            riscv::asm::wfi();
        }
    }
}
