//! Platform-Level Interrupt Controller, supervisor contexts only.

use core::ptr::{read_volatile, write_volatile};

use crate::config::{UART0_IRQ, VIRTIO0_IRQ};

/// Claim/complete interface to an external interrupt controller.
///
/// Every successful `claim` must be followed by exactly one `complete` of the
/// same id, or the source stays masked.
pub trait InterruptController {
    /// Highest-priority pending source for `hart`, or `None`.
    fn claim(&self, hart: usize) -> Option<u32>;
    fn complete(&self, hart: usize, irq: u32);
}

const PRIORITY: usize = 0x0;
const SENABLE: usize = 0x2080;
const SENABLE_STRIDE: usize = 0x100;
const SPRIORITY: usize = 0x20_1000;
const SCLAIM: usize = 0x20_1004;
const CONTEXT_STRIDE: usize = 0x2000;

const fn priority_offset(irq: u32) -> usize {
    PRIORITY + irq as usize * 4
}

const fn senable_offset(hart: usize) -> usize {
    SENABLE + hart * SENABLE_STRIDE
}

const fn spriority_offset(hart: usize) -> usize {
    SPRIORITY + hart * CONTEXT_STRIDE
}

const fn sclaim_offset(hart: usize) -> usize {
    SCLAIM + hart * CONTEXT_STRIDE
}

pub struct Plic {
    base: usize,
}

impl Plic {
    /// # Safety
    ///
    /// `base` must be the MMIO base of a PLIC laid out like the QEMU `virt`
    /// one (S-mode context of hart `n` is context `2n + 1`).
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn reg(&self, offset: usize) -> *mut u32 {
        (self.base + offset) as *mut u32
    }

    pub fn set_priority(&self, irq: u32, priority: u32) {
        unsafe { write_volatile(self.reg(priority_offset(irq)), priority) }
    }

    /// Global setup, once: give the devices we handle a nonzero priority.
    pub fn init(&self) {
        self.set_priority(UART0_IRQ, 1);
        self.set_priority(VIRTIO0_IRQ, 1);
    }

    /// Per-hart setup: enable our devices and accept any priority.
    pub fn init_hart(&self, hart: usize) {
        unsafe {
            write_volatile(
                self.reg(senable_offset(hart)),
                (1 << UART0_IRQ) | (1 << VIRTIO0_IRQ),
            );
            write_volatile(self.reg(spriority_offset(hart)), 0);
        }
    }
}

impl InterruptController for Plic {
    fn claim(&self, hart: usize) -> Option<u32> {
        let irq = unsafe { read_volatile(self.reg(sclaim_offset(hart))) };
        (irq != 0).then_some(irq)
    }

    fn complete(&self, hart: usize, irq: u32) {
        unsafe { write_volatile(self.reg(sclaim_offset(hart)), irq) }
    }
}
