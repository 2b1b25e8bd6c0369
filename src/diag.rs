use std::fmt::Display;

/// Per-file diagnostic collector. Errors are mirrored to stderr as they are
/// reported and retained so the driver can decide whether to emit output.
#[derive(Debug)]
pub struct Diagnostics {
    file_name: String,
    errors: Vec<String>,
}

impl Diagnostics {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            errors: Vec::new(),
        }
    }

    /// Reports a line-anchored error and marks the file as failed.
    pub fn error(&mut self, line_number: usize, message: impl Display) {
        let rendered = format!("Error In {}:{}: {}", self.file_name, line_number, message);
        eprintln!("{rendered}");
        self.errors.push(rendered);
    }

    /// Prints a message that does not fail the file (macro body overflow,
    /// skipped-file notices).
    pub fn notice(&mut self, message: impl Display) {
        eprintln!("{message}");
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_format_carries_file_and_line() {
        let mut diag = Diagnostics::new("prog.as");
        diag.error(12, "Unrecognized instruction: foo.");
        assert!(diag.has_errors());
        assert_eq!(
            diag.errors(),
            &["Error In prog.as:12: Unrecognized instruction: foo.".to_owned()]
        );
    }

    #[test]
    fn notices_do_not_fail_the_file() {
        let mut diag = Diagnostics::new("prog.as");
        diag.notice("Macro M exceeded maximum number of lines");
        assert!(!diag.has_errors());
    }
}
