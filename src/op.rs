use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use strum_macros::{EnumIter, EnumString};
use thiserror::Error;

/// Operand addressing modes, encoded into two bits of the code word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Addressing {
    Immediate = 0,
    Direct = 1,
    RegisterIndirect = 2,
    Register = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Register {
    R0 = 0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Register {
    /// Decodes a register name of the form `rN`, N in 0..=7.
    pub fn from_name(name: &str) -> Option<Register> {
        let digit = name.strip_prefix('r')?;
        if digit.len() != 1 {
            return None;
        }
        let digit = digit.bytes().next()?;
        if !digit.is_ascii_digit() {
            return None;
        }
        Register::from_u8(digit - b'0')
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Mnemonic {
    Mov,
    Cmp,
    Add,
    Sub,
    Lea,
    Clr,
    Not,
    Inc,
    Dec,
    Jmp,
    Bne,
    Jsr,
    Red,
    Prn,
    Rts,
    Stop,
}

/// Permitted addressing modes per operand slot. An empty slice means the
/// slot does not exist for the operation.
pub struct OperandSpec {
    pub src: &'static [Addressing],
    pub dest: &'static [Addressing],
}

impl OperandSpec {
    pub fn count(&self) -> usize {
        match (self.src.is_empty(), self.dest.is_empty()) {
            (false, false) => 2,
            (true, false) => 1,
            _ => 0,
        }
    }
}

const ANY: &[Addressing] = &[
    Addressing::Immediate,
    Addressing::Direct,
    Addressing::RegisterIndirect,
    Addressing::Register,
];
const MEMORY_OR_REGISTER: &[Addressing] = &[
    Addressing::Direct,
    Addressing::RegisterIndirect,
    Addressing::Register,
];
const JUMP_TARGET: &[Addressing] = &[Addressing::Direct, Addressing::RegisterIndirect];
const NO_OPERAND: &[Addressing] = &[];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OperandError {
    #[error("Operation requires {expected} operand(s) (got {got})")]
    Count { expected: usize, got: usize },
    #[error("Invalid addressing mode for first operand.")]
    First,
    #[error("Invalid addressing mode for second operand.")]
    Second,
}

impl Mnemonic {
    pub fn opcode(self) -> u8 {
        match self {
            Mnemonic::Mov => 0,
            Mnemonic::Cmp => 1,
            Mnemonic::Add | Mnemonic::Sub => 2,
            Mnemonic::Lea => 4,
            Mnemonic::Clr | Mnemonic::Not | Mnemonic::Inc | Mnemonic::Dec => 5,
            Mnemonic::Jmp | Mnemonic::Bne | Mnemonic::Jsr => 9,
            Mnemonic::Red => 11,
            Mnemonic::Prn => 12,
            Mnemonic::Rts => 14,
            Mnemonic::Stop => 15,
        }
    }

    pub fn funct(self) -> u8 {
        match self {
            Mnemonic::Add | Mnemonic::Clr | Mnemonic::Jmp => 1,
            Mnemonic::Sub | Mnemonic::Not | Mnemonic::Bne => 2,
            Mnemonic::Inc | Mnemonic::Jsr => 3,
            Mnemonic::Dec => 4,
            _ => 0,
        }
    }

    pub fn operands(self) -> OperandSpec {
        let (src, dest) = match self {
            Mnemonic::Mov | Mnemonic::Add | Mnemonic::Sub => (ANY, MEMORY_OR_REGISTER),
            Mnemonic::Cmp => (ANY, ANY),
            Mnemonic::Lea => (JUMP_TARGET, MEMORY_OR_REGISTER),
            Mnemonic::Clr | Mnemonic::Not | Mnemonic::Inc | Mnemonic::Dec | Mnemonic::Red => {
                (NO_OPERAND, MEMORY_OR_REGISTER)
            }
            Mnemonic::Jmp | Mnemonic::Bne | Mnemonic::Jsr => (NO_OPERAND, JUMP_TARGET),
            Mnemonic::Prn => (NO_OPERAND, ANY),
            Mnemonic::Rts | Mnemonic::Stop => (NO_OPERAND, NO_OPERAND),
        };
        OperandSpec { src, dest }
    }

    /// Validates operand count and addressing modes against the table.
    pub fn check_operands(self, modes: &[Addressing]) -> Result<(), OperandError> {
        let spec = self.operands();
        if modes.len() != spec.count() {
            return Err(OperandError::Count {
                expected: spec.count(),
                got: modes.len(),
            });
        }
        match modes {
            [src, dest] => {
                if !spec.src.contains(src) {
                    return Err(OperandError::First);
                }
                if !spec.dest.contains(dest) {
                    return Err(OperandError::Second);
                }
            }
            [dest] => {
                if !spec.dest.contains(dest) {
                    return Err(OperandError::First);
                }
            }
            _ => {}
        }
        Ok(())
    }
}
