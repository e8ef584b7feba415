//! Platform constants for the QEMU `virt` board with Sv39 paging.

pub const PAGE_SIZE: usize = 4096;

/// One beyond the highest user virtual address. Sv39 allows 39 bits, but the
/// top bit is kept clear to avoid sign-extending addresses.
pub const MAXVA: usize = 1 << (9 + 9 + 9 + 12 - 1);

/// Trampoline page, mapped at the same address in every page table.
pub const TRAMPOLINE: usize = MAXVA - PAGE_SIZE;

/// Trapframe page, just below the trampoline in user page tables.
/// `trap.S` hard-codes this value.
pub const TRAPFRAME: usize = TRAMPOLINE - PAGE_SIZE;

pub const KSTACK_SIZE: usize = PAGE_SIZE;

pub const UART0_BASE: usize = 0x1000_0000;
pub const UART0_IRQ: u32 = 10;
pub const VIRTIO0_IRQ: u32 = 1;

pub const PLIC_BASE: usize = 0x0c00_0000;

/// The only hart that advances the shared tick counter.
pub const TIMEKEEPER_HART: usize = 0;

/// `time` ticks between timer interrupts; about 1/10th of a second at 10 MHz.
pub const TIMER_INTERVAL: u64 = 1_000_000;

/// Width of the `ecall` instruction.
pub const ECALL_LEN: usize = 4;

const SATP_SV39: usize = 8 << 60;

/// `satp` token selecting Sv39 with the given root page-table physical address.
#[inline]
pub const fn make_satp(root: usize) -> usize {
    SATP_SV39 | (root >> 12)
}
