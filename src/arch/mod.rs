pub mod cause;
pub mod frame;
pub mod hart;
pub mod interrupt;
pub mod timer;
pub mod trap;

#[cfg(target_arch = "riscv64")]
pub mod riscv64;

pub use cause::TrapCause;
pub use frame::{TrapFrame, UserRegs};
pub use hart::{Hart, NoInterrupts, Sstatus};
pub use trap::{kernel_trap, prepare_user_return, user_trap, Kernel, TrapVectors, UserTrapOutcome};
#[cfg(target_arch = "riscv64")]
pub use trap::{user_trap_entry, user_trap_return};

#[cfg(target_arch = "riscv64")]
pub use riscv64::Riscv64Hart;
