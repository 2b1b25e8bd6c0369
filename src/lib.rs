use std::fs;

use anyhow::Result;

pub mod diag;
pub mod macros;
pub mod op;
pub mod output;
pub mod parser;
pub mod pass_one;
pub mod pass_two;
pub mod symbols;
pub mod word;

pub use diag::Diagnostics;

use symbols::SymbolKind;

/// Initial value of the instruction counter.
pub const IC_INIT: i32 = 100;
/// Maximum source line length, excluding the terminator.
pub const MAX_LINE_LENGTH: usize = 80;
/// Total machine-image slots available to one translation unit.
pub const IMAGE_CAPACITY: usize = 1200;

/// Rendered output files for one successfully assembled translation unit.
#[derive(Debug)]
pub struct Assembly {
    pub object: String,
    pub externals: String,
    pub entries: String,
}

/// Assembles macro-expanded source text. Returns `None` when any line
/// failed; diagnostics have already been reported through `diag`. Later
/// phases still run after line errors so that further problems surface in
/// the same run.
pub fn assemble_source(expanded: &str, diag: &mut Diagnostics) -> Result<Option<Assembly>> {
    let mut pass = match pass_one::pass_one(expanded, diag) {
        Ok(pass) => pass,
        // image overflow: already reported, nothing more to diagnose
        Err(_) => return Ok(None),
    };
    pass_two::pass_two(expanded, &mut pass, diag);
    if diag.has_errors() {
        return Ok(None);
    }
    Ok(Some(Assembly {
        object: output::render_object(&pass)?,
        externals: output::render_symbol_listing(&pass, SymbolKind::ExternalReference),
        entries: output::render_symbol_listing(&pass, SymbolKind::Entry),
    }))
}

/// Runs the whole pipeline for one base name: expand `<base>.as` into
/// `<base>.am`, assemble it, and write `<base>.ob` / `.ext` / `.ent` when
/// everything succeeded. Returns whether the file assembled cleanly.
pub fn process_file(base: &str) -> bool {
    let as_name = format!("{base}.as");
    let mut diag = Diagnostics::new(&as_name);

    let source = match fs::read_to_string(&as_name) {
        Ok(source) => source,
        Err(error) => {
            diag.notice(format!(
                "File {as_name} is inaccessible for reading: {error}. Skipping it."
            ));
            return false;
        }
    };

    let expanded = macros::expand(&source, &mut diag);
    let am_name = format!("{base}.am");
    if let Err(error) = fs::write(&am_name, &expanded) {
        diag.notice(format!("Can't create file {am_name}: {error}. Skipping it."));
        return false;
    }

    match assemble_source(&expanded, &mut diag) {
        Ok(Some(assembly)) => write_outputs(base, &assembly, &mut diag),
        Ok(None) => false,
        Err(error) => {
            diag.notice(format!("{base}: {error:#}"));
            false
        }
    }
}

fn write_outputs(base: &str, assembly: &Assembly, diag: &mut Diagnostics) -> bool {
    let files = [
        (format!("{base}.ob"), &assembly.object),
        (format!("{base}.ext"), &assembly.externals),
        (format!("{base}.ent"), &assembly.entries),
    ];
    for (name, contents) in files {
        if let Err(error) = fs::write(&name, contents) {
            diag.notice(format!("Can't create file {name}: {error}."));
            return false;
        }
    }
    true
}
