//! 16550 UART as wired on the QEMU `virt` board.

use core::fmt;
use core::ptr::{read_volatile, write_volatile};

const RHR: usize = 0; // Receive Holding Reg (read)
const THR: usize = 0; // Transmit Holding Reg (write)
const IER: usize = 1; // Interrupt Enable Reg
const FCR: usize = 2; // FIFO Control Reg
const LCR: usize = 3; // Line Control Reg
const LSR: usize = 5; // Line Status Reg

const IER_RX_ENABLE: u8 = 1 << 0;
const FCR_FIFO_ENABLE: u8 = 1 << 0;
const FCR_FIFO_CLEAR: u8 = 3 << 1;
const LCR_EIGHT_BITS: u8 = 3;
const LCR_BAUD_LATCH: u8 = 1 << 7;
const LSR_RX_READY: u8 = 1 << 0;
const LSR_TX_EMPTY: u8 = 1 << 5; // THR & TSR empty

pub struct Uart {
    base: usize,
}

impl Uart {
    /// # Safety
    ///
    /// `base` must be the MMIO base of a 16550-compatible UART.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[inline(always)]
    fn read(&self, reg: usize) -> u8 {
        unsafe { read_volatile((self.base + reg) as *const u8) }
    }

    #[inline(always)]
    fn write(&self, reg: usize, val: u8) {
        unsafe { write_volatile((self.base + reg) as *mut u8, val) }
    }

    /// 38.4K baud, 8N1, FIFOs on, receive interrupts on.
    pub fn init(&self) {
        self.write(IER, 0);
        self.write(LCR, LCR_BAUD_LATCH);
        self.write(0, 0x03); // divisor LSB
        self.write(1, 0x00); // divisor MSB
        self.write(LCR, LCR_EIGHT_BITS);
        self.write(FCR, FCR_FIFO_ENABLE | FCR_FIFO_CLEAR);
        self.write(IER, IER_RX_ENABLE);
    }

    #[inline(always)]
    pub fn putc(&self, byte: u8) {
        while self.read(LSR) & LSR_TX_EMPTY == 0 {}
        self.write(THR, byte);
    }

    pub fn puts(&self, s: &str) {
        for c in s.bytes() {
            self.putc(c);
        }
    }

    pub fn put_hex(&self, val: usize) {
        let mut buf = [0u8; 16];
        self.put_digits(&mut buf, val, 16);
    }

    pub fn put_dec(&self, val: usize) {
        let mut buf = [0u8; 20];
        self.put_digits(&mut buf, val, 10);
    }

    fn put_digits(&self, buf: &mut [u8], val: usize, radix: usize) {
        let n = format_digits(buf, val, radix);
        for &ch in buf[..n].iter().rev() {
            self.putc(ch);
        }
    }

    pub fn getc(&self) -> Option<u8> {
        (self.read(LSR) & LSR_RX_READY != 0).then(|| self.read(RHR))
    }

    /// Drain the receive FIFO, echoing each byte. Returns the count.
    pub fn handle_interrupt(&self) -> usize {
        let mut n = 0;
        while let Some(c) = self.getc() {
            self.putc(if c == b'\r' { b'\n' } else { c });
            n += 1;
        }
        n
    }
}

/// Least significant digit first; returns the digit count.
fn format_digits(buf: &mut [u8], mut val: usize, radix: usize) -> usize {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";

    if val == 0 {
        buf[0] = b'0';
        return 1;
    }
    let mut i = 0;
    while val > 0 {
        buf[i] = DIGITS[val % radix];
        val /= radix;
        i += 1;
    }
    i
}

impl fmt::Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.puts(s);
        Ok(())
    }
}
