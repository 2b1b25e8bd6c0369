use clap::Parser;

/// Two-pass assembler. Each argument is a base name: `<name>.as` is read
/// and `<name>.am`, `<name>.ob`, `<name>.ext`, `<name>.ent` are produced.
#[derive(Parser, Debug)]
#[command(name = "assembler")]
struct Args {
    /// Input base names, without the .as extension.
    #[arg(required = true)]
    files: Vec<String>,
}

fn main() {
    let args = Args::parse();
    for base in &args.files {
        // Per-file failures are reported on stderr; processing continues
        // with the next file and the exit status stays 0.
        obasm::process_file(base);
    }
}
