//! Second pass: re-reads the expanded source with a parallel instruction
//! counter, fills the slots reserved for direct-address operands, and
//! promotes `.entry` declarations now that every symbol is known.

use crate::diag::Diagnostics;
use crate::parser::{self, LineError, SourceLine, StatementBody};
use crate::pass_one::PassOne;
use crate::symbols::SymbolKind;
use crate::word::{operand_words, DataWord, ExtraWord, MachineWord};
use crate::IC_INIT;

pub fn pass_two(source: &str, pass: &mut PassOne, diag: &mut Diagnostics) {
    let mut ic = IC_INIT;
    for (index, content) in source.lines().enumerate() {
        let line_number = index + 1;
        if pass.failed_lines.contains(&line_number) {
            continue;
        }
        let Ok(parsed) = parser::parse_line(content) else {
            continue;
        };
        let SourceLine::Statement { body, .. } = parsed else {
            continue;
        };
        match body {
            StatementBody::Entry(name) => promote_entry(&name, line_number, pass, diag),
            StatementBody::Data(_) | StatementBody::StringLit(_) | StatementBody::Extern(_) => {}
            StatementBody::Instruction { operands, .. } => {
                let extras = operand_words(&operands);
                for (offset, extra) in extras.iter().enumerate() {
                    if let ExtraWord::Pending(name) = extra {
                        patch_direct(ic + 1 + offset as i32, name, line_number, pass, diag);
                    }
                }
                ic += 1 + extras.len() as i32;
            }
        }
    }
}

/// Resolves a reserved operand slot. Internal symbols patch in as
/// relocatable words; external ones emit a zero payload and record the use
/// site for the `.ext` listing.
fn patch_direct(
    address: i32,
    name: &str,
    line_number: usize,
    pass: &mut PassOne,
    diag: &mut Diagnostics,
) {
    let resolvable = [SymbolKind::Data, SymbolKind::Code, SymbolKind::External];
    let Some(symbol) = pass.symbols.find(name, &resolvable) else {
        diag.error(line_number, LineError::UndefinedSymbol(name.to_owned()));
        return;
    };
    let (value, external) = (symbol.value, symbol.kind == SymbolKind::External);
    let slot = (address - IC_INIT) as usize;
    pass.code_image[slot] = Some(MachineWord::Data(DataWord::direct(value, external)));
    if external {
        pass.symbols
            .insert(name, address, SymbolKind::ExternalReference);
    }
}

fn promote_entry(name: &str, line_number: usize, pass: &mut PassOne, diag: &mut Diagnostics) {
    if pass.symbols.find(name, &[SymbolKind::Entry]).is_some() {
        return;
    }
    let defined = pass
        .symbols
        .find(name, &[SymbolKind::Data, SymbolKind::Code])
        .map(|symbol| symbol.value);
    if let Some(value) = defined {
        pass.symbols.insert(name, value, SymbolKind::Entry);
        return;
    }
    if pass.symbols.find(name, &[SymbolKind::External]).is_some() {
        diag.error(line_number, LineError::EntryIsExternal(name.to_owned()));
    } else {
        diag.error(line_number, LineError::UndefinedEntry(name.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass_one::pass_one;
    use crate::word::Are;

    fn run(source: &str) -> (PassOne, Diagnostics) {
        let mut diag = Diagnostics::new("test.as");
        let mut pass = pass_one(source, &mut diag).unwrap();
        pass_two(source, &mut pass, &mut diag);
        (pass, diag)
    }

    #[test]
    fn forward_reference_is_patched_relocatable() {
        let (pass, diag) = run("mov r1, X\nstop\nX: .data 7\n");
        assert!(!diag.has_errors());
        assert_eq!(
            pass.code_image[1],
            Some(MachineWord::Data(DataWord {
                are: Are::Relocatable,
                value: 103
            }))
        );
    }

    #[test]
    fn external_reference_is_recorded() {
        let (pass, diag) = run(".extern K\njmp K\nstop\n");
        assert!(!diag.has_errors());
        assert_eq!(
            pass.code_image[1],
            Some(MachineWord::Data(DataWord {
                are: Are::External,
                value: 0
            }))
        );
        let refs: Vec<_> = pass
            .symbols
            .of_kind(SymbolKind::ExternalReference)
            .collect();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "K");
        assert_eq!(refs[0].value, 101);
    }

    #[test]
    fn every_code_slot_is_filled_after_pass_two() {
        let (pass, diag) = run("mov #3, X\ncmp X, Y\nstop\nX: .data 1\nY: .data 2\n");
        assert!(!diag.has_errors());
        assert!(pass.code_image.iter().all(Option::is_some));
        assert_eq!(pass.code_image.len() as i32, pass.icf - IC_INIT);
    }

    #[test]
    fn entry_is_promoted_with_matching_value() {
        let (pass, diag) = run("MAIN: inc r1\nstop\n.entry MAIN\n");
        assert!(!diag.has_errors());
        let entry = pass.symbols.find("MAIN", &[SymbolKind::Entry]).unwrap();
        assert_eq!(entry.value, 100);
        // the primary definition is still there
        assert!(pass.symbols.find("MAIN", &[SymbolKind::Code]).is_some());
    }

    #[test]
    fn entry_of_external_is_an_error() {
        let (_, diag) = run(".extern K\n.entry K\nstop\n");
        assert!(diag.has_errors());
        assert!(diag.errors()[0].contains("external or entry"));
    }

    #[test]
    fn entry_of_undefined_symbol_is_an_error() {
        let (_, diag) = run(".entry NOPE\nstop\n");
        assert!(diag.has_errors());
        assert!(diag.errors()[0].contains("undefined"));
    }

    #[test]
    fn undefined_direct_operand_is_an_error() {
        let (_, diag) = run("jmp NOWHERE\nstop\n");
        assert!(diag.has_errors());
        assert!(diag.errors()[0].contains("NOWHERE"));
    }

    #[test]
    fn repeated_entry_is_promoted_once() {
        let (pass, diag) = run("MAIN: stop\n.entry MAIN\n.entry MAIN\n");
        assert!(!diag.has_errors());
        assert_eq!(pass.symbols.of_kind(SymbolKind::Entry).count(), 1);
    }

    #[test]
    fn failed_first_pass_lines_do_not_desync_ic() {
        // line 2 fails in pass one and emits no slots; the jmp target word
        // must still land at address 102.
        let (pass, diag) = run("inc r0\nfoo r1\njmp END\nEND: stop\n");
        assert!(diag.has_errors());
        assert_eq!(
            pass.code_image[2],
            Some(MachineWord::Data(DataWord {
                are: Are::Relocatable,
                value: 103
            }))
        );
    }
}
