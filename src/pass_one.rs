//! First pass: walks the macro-expanded source line by line, resolves label
//! definitions, fills the code and data images, and leaves reserved slots
//! for direct-address operands whose symbols are not yet known.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::diag::Diagnostics;
use crate::op::Mnemonic;
use crate::parser::{self, LineError, Operand, SourceLine, StatementBody};
use crate::symbols::{SymbolKind, SymbolTable};
use crate::word::{operand_words, CodeWord, ExtraWord, MachineWord};
use crate::{IC_INIT, IMAGE_CAPACITY, MAX_LINE_LENGTH};

/// Everything the first pass hands to the second pass and the writer.
#[derive(Debug)]
pub struct PassOne {
    pub code_image: Vec<Option<MachineWord>>,
    pub data_image: Vec<i32>,
    pub symbols: SymbolTable,
    pub icf: i32,
    pub dcf: i32,
    /// Line numbers that failed; the second pass skips them so its IC stays
    /// in lockstep with the slots that were actually emitted.
    pub failed_lines: HashSet<usize>,
}

struct FirstPass {
    ic: i32,
    dc: i32,
    code_image: Vec<Option<MachineWord>>,
    data_image: Vec<i32>,
    symbols: SymbolTable,
    failed_lines: HashSet<usize>,
}

pub fn pass_one(source: &str, diag: &mut Diagnostics) -> Result<PassOne> {
    let mut pass = FirstPass {
        ic: IC_INIT,
        dc: 0,
        code_image: Vec::new(),
        data_image: Vec::new(),
        symbols: SymbolTable::new(),
        failed_lines: HashSet::new(),
    };

    for (index, content) in source.lines().enumerate() {
        let line_number = index + 1;
        if let Err(error) = pass.process_line(content) {
            diag.error(line_number, &error);
            pass.failed_lines.insert(line_number);
        }
        if pass.code_image.len() + pass.data_image.len() > IMAGE_CAPACITY {
            diag.error(
                line_number,
                format!("Memory image overflow: more than {IMAGE_CAPACITY} words required."),
            );
            bail!("memory image overflow");
        }
    }

    let icf = pass.ic;
    let dcf = pass.dc;
    // Data symbols are addressed past the end of the code segment.
    pass.symbols.rebase(SymbolKind::Data, icf);

    Ok(PassOne {
        code_image: pass.code_image,
        data_image: pass.data_image,
        symbols: pass.symbols,
        icf,
        dcf,
        failed_lines: pass.failed_lines,
    })
}

impl FirstPass {
    fn process_line(&mut self, content: &str) -> Result<(), LineError> {
        if content.len() > MAX_LINE_LENGTH {
            return Err(LineError::LineTooLong);
        }
        let (label, body) = match parser::parse_line(content)? {
            SourceLine::Blank => return Ok(()),
            SourceLine::Statement { label, body } => (label, body),
        };
        match body {
            StatementBody::Data(values) => {
                if let Some(name) = label {
                    self.define(&name, self.dc, SymbolKind::Data)?;
                }
                for value in values {
                    self.data_image.push(value);
                    self.dc += 1;
                }
            }
            StatementBody::StringLit(bytes) => {
                if let Some(name) = label {
                    self.define(&name, self.dc, SymbolKind::Data)?;
                }
                for byte in bytes {
                    self.data_image.push(i32::from(byte));
                    self.dc += 1;
                }
                self.data_image.push(0);
                self.dc += 1;
            }
            StatementBody::Extern(name) => {
                // A label on an .extern line is legal but ignored.
                self.define(&name, 0, SymbolKind::External)?;
            }
            StatementBody::Entry(_) => {
                if label.is_some() {
                    return Err(LineError::LabeledEntry);
                }
                // Promotion happens in the second pass.
            }
            StatementBody::Instruction { mnemonic, operands } => {
                if let Some(name) = label {
                    self.define(&name, self.ic, SymbolKind::Code)?;
                }
                self.encode_instruction(mnemonic, &operands)?;
            }
        }
        Ok(())
    }

    fn encode_instruction(
        &mut self,
        mnemonic: Mnemonic,
        operands: &[Operand],
    ) -> Result<(), LineError> {
        let modes: Vec<_> = operands.iter().map(Operand::addressing).collect();
        mnemonic.check_operands(&modes)?;

        let word = CodeWord::build(mnemonic, operands);
        let extras = operand_words(operands);
        let length = (1 + extras.len()) as u8;
        self.code_image.push(Some(MachineWord::Code { length, word }));
        for extra in extras {
            match extra {
                ExtraWord::Emitted(data) => self.code_image.push(Some(MachineWord::Data(data))),
                ExtraWord::Pending(_) => self.code_image.push(None),
            }
        }
        self.ic += i32::from(length);
        Ok(())
    }

    fn define(&mut self, name: &str, value: i32, kind: SymbolKind) -> Result<(), LineError> {
        let primary = [SymbolKind::Code, SymbolKind::Data, SymbolKind::External];
        if self.symbols.find(name, &primary).is_some() {
            return Err(LineError::DuplicateSymbol(name.to_owned()));
        }
        self.symbols.insert(name, value, kind);
        Ok(())
    }
}
