use bitflags::bitflags;

bitflags! {
    /// `sstatus` bits the trap code cares about. Other bits pass through.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Sstatus: usize {
        /// Supervisor interrupt enable
        const SIE = 1 << 1;
        /// Interrupt enable before the trap; restored by `sret`
        const SPIE = 1 << 5;
        /// Privilege before the trap: set = supervisor, clear = user
        const SPP = 1 << 8;
    }
}

/// Register-level interface to one hart.
///
/// Methods take `&self`: CSRs are hart-local and the kernel never hands a
/// `Hart` to another hart.
pub trait Hart {
    /// Hart identifier (kept in `tp` while in the kernel)
    fn id(&self) -> usize;

    fn scause(&self) -> usize;
    fn stval(&self) -> usize;
    fn sepc(&self) -> usize;
    fn set_sepc(&self, pc: usize);
    fn sstatus(&self) -> Sstatus;
    fn set_sstatus(&self, status: Sstatus);
    /// Install a direct-mode trap vector
    fn set_stvec(&self, vector: usize);
    fn satp(&self) -> usize;
    fn time(&self) -> u64;
    /// Program the next timer interrupt; also clears a pending one
    fn set_timecmp(&self, deadline: u64);

    fn intr_on(&self) {
        self.set_sstatus(self.sstatus() | Sstatus::SIE);
    }

    fn intr_off(&self) {
        self.set_sstatus(self.sstatus() - Sstatus::SIE);
    }

    fn intr_get(&self) -> bool {
        self.sstatus().contains(Sstatus::SIE)
    }
}

/// Masks supervisor interrupts until dropped.
///
/// Guards nest: only the outermost one turns interrupts back on, and only
/// if they were on when it was created.
pub struct NoInterrupts<'a, H: Hart + ?Sized> {
    hart: &'a H,
    was_on: bool,
}

impl<'a, H: Hart + ?Sized> NoInterrupts<'a, H> {
    pub fn new(hart: &'a H) -> Self {
        let was_on = hart.intr_get();
        hart.intr_off();
        Self { hart, was_on }
    }
}

impl<H: Hart + ?Sized> Drop for NoInterrupts<'_, H> {
    fn drop(&mut self) {
        if self.was_on {
            self.hart.intr_on();
        }
    }
}
