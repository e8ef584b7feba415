use core::fmt;

/// Interrupt flag: the most significant bit of `scause`.
pub const INTERRUPT_BIT: usize = 1 << (usize::BITS - 1);

const S_TIMER: usize = 5;
const S_EXTERNAL: usize = 9;

/// Synchronous exception codes a supervisor can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    InstructionMisaligned,
    InstructionFault,
    IllegalInstruction,
    Breakpoint,
    LoadMisaligned,
    LoadFault,
    StoreMisaligned,
    StoreFault,
    UserEnvCall,
    SupervisorEnvCall,
    InstructionPageFault,
    LoadPageFault,
    StorePageFault,
}

impl Exception {
    pub const fn from_code(code: usize) -> Option<Self> {
        Some(match code {
            0 => Exception::InstructionMisaligned,
            1 => Exception::InstructionFault,
            2 => Exception::IllegalInstruction,
            3 => Exception::Breakpoint,
            4 => Exception::LoadMisaligned,
            5 => Exception::LoadFault,
            6 => Exception::StoreMisaligned,
            7 => Exception::StoreFault,
            8 => Exception::UserEnvCall,
            9 => Exception::SupervisorEnvCall,
            12 => Exception::InstructionPageFault,
            13 => Exception::LoadPageFault,
            15 => Exception::StorePageFault,
            _ => return None,
        })
    }

    pub const fn description(self) -> &'static str {
        match self {
            Exception::InstructionMisaligned => "instruction address misaligned",
            Exception::InstructionFault => "instruction access fault",
            Exception::IllegalInstruction => "illegal instruction",
            Exception::Breakpoint => "breakpoint",
            Exception::LoadMisaligned => "load address misaligned",
            Exception::LoadFault => "load access fault",
            Exception::StoreMisaligned => "store/AMO address misaligned",
            Exception::StoreFault => "store/AMO access fault",
            Exception::UserEnvCall => "environment call from U-mode",
            Exception::SupervisorEnvCall => "environment call from S-mode",
            Exception::InstructionPageFault => "instruction page fault",
            Exception::LoadPageFault => "load page fault",
            Exception::StorePageFault => "store/AMO page fault",
        }
    }
}

/// Why a trap was taken.
///
/// [`TrapCause::from_bits`] is the only place raw cause values are inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapCause {
    Exception(Exception),
    /// Supervisor timer interrupt (`stimecmp` reached)
    TimerInterrupt,
    /// Supervisor external interrupt, via the PLIC
    ExternalInterrupt,
    /// Anything else; carries the raw `scause`
    Unrecognized(usize),
}

impl TrapCause {
    pub const fn from_bits(scause: usize) -> Self {
        let code = scause & !INTERRUPT_BIT;
        if scause & INTERRUPT_BIT != 0 {
            match code {
                S_TIMER => TrapCause::TimerInterrupt,
                S_EXTERNAL => TrapCause::ExternalInterrupt,
                _ => TrapCause::Unrecognized(scause),
            }
        } else {
            match Exception::from_code(code) {
                Some(e) => TrapCause::Exception(e),
                None => TrapCause::Unrecognized(scause),
            }
        }
    }

    pub const fn is_interrupt(self) -> bool {
        match self {
            TrapCause::TimerInterrupt | TrapCause::ExternalInterrupt => true,
            TrapCause::Exception(_) => false,
            TrapCause::Unrecognized(bits) => bits & INTERRUPT_BIT != 0,
        }
    }
}

impl fmt::Display for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrapCause::Exception(e) => f.write_str(e.description()),
            TrapCause::TimerInterrupt => f.write_str("supervisor timer interrupt"),
            TrapCause::ExternalInterrupt => f.write_str("supervisor external interrupt"),
            TrapCause::Unrecognized(bits) if self.is_interrupt() => {
                write!(f, "unknown interrupt (code {})", bits & !INTERRUPT_BIT)
            }
            TrapCause::Unrecognized(bits) => write!(f, "unknown exception (code {bits})"),
        }
    }
}
