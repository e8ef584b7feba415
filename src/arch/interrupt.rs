//! Routing of device and timer interrupts.

use super::cause::TrapCause;
use super::hart::Hart;
use crate::config::{UART0_IRQ, VIRTIO0_IRQ};
use crate::drivers::plic::InterruptController;
use crate::drivers::Devices;
use crate::kernel::clock::Timekeeper;
use crate::kernel::proc::Wakeup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevIntr {
    /// Not an interrupt we handle; the caller decides what that means
    Unknown,
    /// External interrupt, handled (or spurious)
    Device,
    /// Timer tick
    Timer,
}

/// Handle the interrupt latched in `scause`, if it is one we know.
pub fn dev_intr<H, K>(hart: &H, kernel: &mut K, clock: &Timekeeper) -> DevIntr
where
    H: Hart + ?Sized,
    K: Devices + Wakeup + ?Sized,
{
    match TrapCause::from_bits(hart.scause()) {
        TrapCause::ExternalInterrupt => {
            let irq = kernel.irq_controller().claim(hart.id());

            match irq {
                Some(UART0_IRQ) => kernel.uart_intr(),
                Some(VIRTIO0_IRQ) => kernel.disk_intr(),
                Some(irq) => log::warn!("unexpected interrupt irq={irq}"),
                None => {}
            }

            if let Some(irq) = irq {
                kernel.irq_controller().complete(hart.id(), irq);
            }
            DevIntr::Device
        }
        TrapCause::TimerInterrupt => {
            clock.advance(hart, &*kernel);
            DevIntr::Timer
        }
        _ => DevIntr::Unknown,
    }
}
