use core::fmt::Write;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::arch::hart::{Hart, NoInterrupts};

/// `log` backend writing one line per record to a character device.
///
/// Interrupts are masked while the device lock is held: a trap taken on this
/// hart that logs would otherwise spin on a lock its own hart holds.
pub struct UartLogger<W, H> {
    out: Mutex<W>,
    hart: H,
}

impl<W: Write, H: Hart> UartLogger<W, H> {
    pub const fn new(out: W, hart: H) -> Self {
        Self {
            out: Mutex::new(out),
            hart,
        }
    }

    /// Run `f` on the device with the lock held and interrupts masked.
    pub fn with_output<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        let _intr = NoInterrupts::new(&self.hart);
        f(&mut self.out.lock())
    }

    pub fn write_record(&self, record: &Record) {
        self.with_output(|out| {
            let _ = writeln!(
                out,
                "[{:5} {}] {}",
                record.level(),
                record.target(),
                record.args()
            );
        });
    }
}

impl<W, H> UartLogger<W, H>
where
    W: Write + Send + 'static,
    H: Hart + Send + Sync + 'static,
{
    pub fn init(&'static self, level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl<W, H> Log for UartLogger<W, H>
where
    W: Write + Send,
    H: Hart + Send + Sync,
{
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.write_record(record);
    }

    fn flush(&self) {}
}
