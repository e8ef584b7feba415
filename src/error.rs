use core::fmt;

/// Errors returned by system calls.
///
/// Encoded as a negative errno in `a0`, the way user code expects.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SysError {
    /// No process is running on this hart
    NoProcess = 3,
    /// The process was killed while blocked
    Killed = 4,
    InvalidArgument = 22,
    NoSys = 38,
}

impl SysError {
    pub fn as_isize(self) -> isize {
        -(self as i32 as isize)
    }

    /// Register encoding of the error.
    pub fn as_usize(self) -> usize {
        self.as_isize() as usize
    }
}

impl fmt::Display for SysError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SysError::NoProcess => "no current process",
            SysError::Killed => "process killed",
            SysError::InvalidArgument => "invalid argument",
            SysError::NoSys => "function not implemented",
        };
        f.write_str(msg)
    }
}
