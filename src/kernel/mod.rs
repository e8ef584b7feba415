pub mod alarm;
pub mod clock;
pub mod logger;
pub mod proc;
pub mod syscall;
