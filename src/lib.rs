//! Supervisor-mode trap handling for a small RISC-V kernel.

#![cfg_attr(not(test), no_std)]

pub mod arch;
pub mod config;
pub mod drivers;
pub mod error;
pub mod kernel;

#[cfg(test)]
mod testing;

pub use error::SysError;
