pub mod plic;
pub mod uart;

use plic::InterruptController;

/// Device-side collaborators of the interrupt router.
pub trait Devices {
    type Irq: InterruptController + ?Sized;

    fn irq_controller(&self) -> &Self::Irq;

    /// UART raised an interrupt (input arrived, or output space freed).
    fn uart_intr(&mut self);

    /// virtio disk completed a request.
    fn disk_intr(&mut self);
}
