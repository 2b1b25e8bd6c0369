//! Machine words and their packed 15-bit encoding. The logical layout keeps
//! the full field structure; packing ORs the fields into the low 15 bits,
//! where `funct` and the destination fields share positions. For words with
//! a nonzero `funct` that form is the authoritative one.

use crate::op::{Mnemonic, Register};
use crate::parser::Operand;

/// Absolute / relocatable / external marker in the low three bits of every
/// emitted word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Are {
    External = 1,
    Relocatable = 2,
    Absolute = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeWord {
    pub are: Are,
    pub opcode: u8,
    pub funct: u8,
    pub src_addressing: u8,
    pub src_register: u8,
    pub dest_addressing: u8,
    pub dest_register: u8,
}

impl CodeWord {
    /// Builds the first word of an instruction. Only plain register
    /// operands fill the register fields; register-indirect operands keep
    /// them 0 and carry the index in an extra word. A single operand is a
    /// destination.
    pub fn build(mnemonic: Mnemonic, operands: &[Operand]) -> CodeWord {
        let (src, dest) = match operands {
            [src, dest] => (Some(src), Some(dest)),
            [dest] => (None, Some(dest)),
            _ => (None, None),
        };
        let addressing = |operand: Option<&Operand>| operand.map_or(0, |o| o.addressing() as u8);
        let register = |operand: Option<&Operand>| match operand {
            Some(Operand::Register(r)) => r.index(),
            _ => 0,
        };
        CodeWord {
            are: Are::Absolute,
            opcode: mnemonic.opcode(),
            funct: mnemonic.funct(),
            src_addressing: addressing(src),
            src_register: register(src),
            dest_addressing: addressing(dest),
            dest_register: register(dest),
        }
    }

    pub fn pack(&self) -> u16 {
        let mut word = u32::from(self.are as u8);
        word |= u32::from(self.dest_register & 0x7) << 3;
        word |= u32::from(self.funct & 0x1F) << 3;
        word |= u32::from(self.dest_addressing & 0x3) << 6;
        word |= u32::from(self.src_register & 0x7) << 8;
        word |= u32::from(self.src_addressing & 0x3) << 11;
        word |= u32::from(self.opcode & 0x3F) << 13;
        (word & 0x7FFF) as u16
    }
}

/// Operand payload word: three ARE bits plus a 12-bit payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataWord {
    pub are: Are,
    pub value: u16,
}

/// Which operand slot a register payload belongs to; the destination field
/// sits three bits above the source field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Source,
    Dest,
}

impl DataWord {
    pub fn immediate(value: i32) -> DataWord {
        DataWord {
            are: Are::Absolute,
            value: (value & 0xFFF) as u16,
        }
    }

    pub fn register(position: Position, register: Register) -> DataWord {
        let index = u16::from(register.index());
        DataWord {
            are: Are::Absolute,
            value: match position {
                Position::Source => index,
                Position::Dest => index << 3,
            },
        }
    }

    pub fn register_pair(src: Register, dest: Register) -> DataWord {
        DataWord {
            are: Are::Absolute,
            value: u16::from(src.index()) | u16::from(dest.index()) << 3,
        }
    }

    pub fn direct(value: i32, external: bool) -> DataWord {
        DataWord {
            are: if external {
                Are::External
            } else {
                Are::Relocatable
            },
            value: (value & 0xFFF) as u16,
        }
    }

    pub fn pack(&self) -> u16 {
        ((self.value & 0xFFF) << 3) | self.are as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineWord {
    /// First word of an instruction; `length` is the total number of image
    /// slots the instruction occupies, extra operand words included.
    Code { length: u8, word: CodeWord },
    Data(DataWord),
}

impl MachineWord {
    pub fn length(&self) -> u8 {
        match self {
            MachineWord::Code { length, .. } => *length,
            MachineWord::Data(_) => 0,
        }
    }

    pub fn pack(&self) -> u16 {
        match self {
            MachineWord::Code { word, .. } => word.pack(),
            MachineWord::Data(word) => word.pack(),
        }
    }
}

/// The extra image slots an operand list occupies after the code word, in
/// order. Shared by both passes so IC advances identically in each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtraWord {
    Emitted(DataWord),
    /// Direct operand: the slot stays reserved until the second pass
    /// resolves the named symbol.
    Pending(String),
}

pub fn operand_words(operands: &[Operand]) -> Vec<ExtraWord> {
    // Two register-style operands share one payload word.
    if let [src, dest] = operands {
        if let (Some(s), Some(d)) = (src.register(), dest.register()) {
            return vec![ExtraWord::Emitted(DataWord::register_pair(s, d))];
        }
    }
    let placed: Vec<(&Operand, Position)> = match operands {
        [src, dest] => vec![(src, Position::Source), (dest, Position::Dest)],
        [dest] => vec![(dest, Position::Dest)],
        _ => Vec::new(),
    };
    let mut words = Vec::new();
    for (operand, position) in placed {
        match operand {
            Operand::Immediate(value) => words.push(ExtraWord::Emitted(DataWord::immediate(*value))),
            // a plain register lives in the code word's register field
            Operand::Register(_) => {}
            Operand::RegisterIndirect(register) => {
                words.push(ExtraWord::Emitted(DataWord::register(position, *register)));
            }
            Operand::Direct(name) => words.push(ExtraWord::Pending(name.clone())),
        }
    }
    words
}
