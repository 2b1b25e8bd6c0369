//! Macro pre-processor. Recognizes `macr <name>` / `endmacr` blocks in the
//! `.as` source and rewrites every invocation site with a verbatim copy of
//! the stored body. Bodies are not re-scanned, so expansion is exactly one
//! level deep and running the expander over its own output is the identity.

use std::collections::HashMap;

use crate::diag::Diagnostics;

/// Lines retained per macro body; overflow is dropped with a notice.
pub const MACRO_BODY_CAP: usize = 82;

enum Mode {
    Copy,
    /// Collecting body lines for the named macro; `None` when the
    /// definition redefines an existing name and is being discarded.
    Collect(Option<String>),
}

pub fn expand(source: &str, diag: &mut Diagnostics) -> String {
    let mut macros: HashMap<String, Vec<String>> = HashMap::new();
    let mut output = String::new();
    let mut mode = Mode::Copy;

    for line in source.lines() {
        let mut tokens = line.split_whitespace();
        let head = tokens.next();

        match head {
            Some("macr") => {
                match tokens.next() {
                    Some(name) if !macros.contains_key(name) => {
                        macros.insert(name.to_owned(), Vec::new());
                        mode = Mode::Collect(Some(name.to_owned()));
                    }
                    Some(_) => mode = Mode::Collect(None),
                    None => {
                        diag.notice("Macro definition is missing a name");
                        mode = Mode::Collect(None);
                    }
                }
                continue;
            }
            Some("endmacr") => {
                mode = Mode::Copy;
                continue;
            }
            _ => {}
        }

        if let Mode::Collect(target) = &mode {
            if let Some(name) = target {
                if let Some(body) = macros.get_mut(name) {
                    if body.len() < MACRO_BODY_CAP {
                        body.push(line.to_owned());
                    } else {
                        diag.notice(format!("Macro {name} exceeded maximum number of lines"));
                    }
                }
            }
            continue;
        }

        match head.and_then(|token| macros.get(token)) {
            Some(body) => {
                for body_line in body {
                    output.push_str(body_line);
                    output.push('\n');
                }
            }
            None => {
                output.push_str(line);
                output.push('\n');
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_ok(source: &str) -> String {
        let mut diag = Diagnostics::new("test.as");
        let out = expand(source, &mut diag);
        assert!(!diag.has_errors());
        out
    }

    #[test]
    fn definition_is_removed_and_invocations_replaced() {
        let source = "macr M\ninc r0\ninc r1\nendmacr\nM\nstop\nM\n";
        assert_eq!(expand_ok(source), "inc r0\ninc r1\nstop\ninc r0\ninc r1\n");
    }

    #[test]
    fn non_macro_lines_pass_through_verbatim() {
        let source = "START: mov #-5, r3\n\tstop\n";
        assert_eq!(expand_ok(source), source);
    }

    #[test]
    fn invocation_must_be_first_token() {
        let source = "macr M\ninc r0\nendmacr\nmov M, r1\n";
        assert_eq!(expand_ok(source), "mov M, r1\n");
    }

    #[test]
    fn whole_invocation_line_is_replaced() {
        let source = "macr M\ninc r0\nendmacr\nM trailing junk\n";
        assert_eq!(expand_ok(source), "inc r0\n");
    }

    #[test]
    fn first_definition_wins() {
        let source = "macr M\ninc r0\nendmacr\nmacr M\ndec r0\nendmacr\nM\n";
        assert_eq!(expand_ok(source), "inc r0\n");
    }

    #[test]
    fn no_reexpansion_of_bodies() {
        // A's body invokes B, but bodies are emitted verbatim.
        let source = "macr B\nstop\nendmacr\nmacr A\nB\nendmacr\nA\n";
        assert_eq!(expand_ok(source), "B\n");
    }

    #[test]
    fn expansion_is_idempotent() {
        let source = "macr M\ninc r0\ninc r1\nendmacr\nM\nstop\nM\n";
        let once = expand_ok(source);
        let twice = expand_ok(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn body_overflow_is_dropped_with_a_notice() {
        let mut source = String::from("macr M\n");
        for i in 0..(MACRO_BODY_CAP + 5) {
            source.push_str(&format!("inc r{}\n", i % 8));
        }
        source.push_str("endmacr\nM\n");
        let mut diag = Diagnostics::new("test.as");
        let out = expand(&source, &mut diag);
        assert_eq!(out.lines().count(), MACRO_BODY_CAP);
        assert!(!diag.has_errors());
    }
}
