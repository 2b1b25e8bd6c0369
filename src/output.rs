//! Renders the finalized images and symbol table into the textual object
//! format: `.ob` for the machine words, `.ext` for external use sites,
//! `.ent` for exported symbols.

use anyhow::{bail, Result};
use itertools::Itertools;

use crate::pass_one::PassOne;
use crate::symbols::SymbolKind;
use crate::IC_INIT;

/// The `.ob` listing: a `"<code words> <data words>"` header, then one
/// `"{address:07} {value:06o}"` line per image slot, code before data.
pub fn render_object(pass: &PassOne) -> Result<String> {
    let mut lines = Vec::with_capacity(1 + pass.code_image.len() + pass.data_image.len());
    lines.push(format!("{} {}", pass.icf - IC_INIT, pass.dcf));
    for (offset, slot) in pass.code_image.iter().enumerate() {
        let Some(word) = slot else {
            bail!("unresolved operand slot at address {}", IC_INIT + offset as i32);
        };
        lines.push(format!("{:07} {:06o}", IC_INIT + offset as i32, word.pack()));
    }
    for (offset, value) in pass.data_image.iter().enumerate() {
        lines.push(format!(
            "{:07} {:06o}",
            pass.icf + offset as i32,
            value & 0x7FFF
        ));
    }
    Ok(lines.iter().join("\n"))
}

/// The `.ext` / `.ent` listings: one `"{name} {value:07}"` line per entry,
/// ascending by value. Empty when there is nothing to list.
pub fn render_symbol_listing(pass: &PassOne, kind: SymbolKind) -> String {
    pass.symbols
        .of_kind(kind)
        .map(|symbol| format!("{} {:07}", symbol.name, symbol.value))
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Diagnostics;
    use crate::pass_one::pass_one;
    use crate::pass_two::pass_two;

    fn assemble(source: &str) -> PassOne {
        let mut diag = Diagnostics::new("test.as");
        let mut pass = pass_one(source, &mut diag).unwrap();
        pass_two(source, &mut pass, &mut diag);
        assert!(!diag.has_errors(), "unexpected errors: {:?}", diag.errors());
        pass
    }

    #[test]
    fn data_only_program() {
        let pass = assemble(".data 1,2,3\n");
        let object = render_object(&pass).unwrap();
        assert_eq!(
            object,
            "0 3\n0000100 000001\n0000101 000002\n0000102 000003"
        );
    }

    #[test]
    fn negative_data_is_masked_to_fifteen_bits() {
        let pass = assemble(".data -5\n");
        let object = render_object(&pass).unwrap();
        assert_eq!(object, "0 1\n0000100 077773");
    }

    #[test]
    fn immediate_word_rendering() {
        let pass = assemble("mov #-5, r3\nstop\n");
        let object = render_object(&pass).unwrap();
        let lines: Vec<&str> = object.lines().collect();
        assert_eq!(lines[0], "3 0");
        // -5 masked to 12 bits, shifted past the ARE bits: 0xFFB << 3 | 4
        assert_eq!(lines[2], "0000101 077734");
    }

    #[test]
    fn external_listing() {
        let pass = assemble(".extern K\njmp K\nstop\n");
        assert_eq!(
            render_symbol_listing(&pass, SymbolKind::ExternalReference),
            "K 0000101"
        );
        assert_eq!(render_symbol_listing(&pass, SymbolKind::Entry), "");
    }

    #[test]
    fn entry_listing_is_sorted_by_value() {
        let pass = assemble("A: inc r1\nB: stop\n.entry B\n.entry A\n");
        assert_eq!(
            render_symbol_listing(&pass, SymbolKind::Entry),
            "A 0000100\nB 0000101"
        );
    }

    #[test]
    fn unresolved_slot_is_an_internal_error() {
        let mut diag = Diagnostics::new("test.as");
        let pass = pass_one("jmp X\nX: stop\n", &mut diag).unwrap();
        // second pass not run: the reserved slot is still empty
        assert!(render_object(&pass).is_err());
    }
}
