use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric0, digit1, one_of},
    combinator::{all_consuming, map, map_res, opt, recognize},
    sequence::{pair, preceded},
    IResult,
};
use num_traits::FromPrimitive;
use once_cell::sync::OnceCell;
use regex::Regex;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::op::{Addressing, Mnemonic, OperandError, Register};

pub const MAX_LABEL_LENGTH: usize = 31;

static LABEL_REGEX: OnceCell<Regex> = OnceCell::new();
static LABEL_REGEX_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9]*$";

fn label_regex() -> &'static Regex {
    LABEL_REGEX.get_or_init(|| Regex::new(LABEL_REGEX_PATTERN).expect("Invalid label regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DirectiveKind {
    Data,
    String,
    Entry,
    Extern,
}

/// A label may not shadow a mnemonic, a register, a directive name, or the
/// register-indirect spelling of a register.
pub fn is_reserved_word(name: &str) -> bool {
    Mnemonic::from_str(name).is_ok()
        || Register::from_name(name).is_some()
        || DirectiveKind::from_str(name).is_ok()
        || name
            .strip_prefix('*')
            .map_or(false, |rest| Register::from_name(rest).is_some())
}

pub fn is_valid_label_name(name: &str) -> bool {
    name.len() <= MAX_LABEL_LENGTH && label_regex().is_match(name) && !is_reserved_word(name)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("Line too long to process. Maximum line length should be 80.")]
    LineTooLong,
    #[error("Illegal label name: {0}")]
    IllegalLabel(String),
    #[error("Label must be followed by an instruction or directive.")]
    DanglingLabel,
    #[error("Invalid instruction name: .{0}")]
    UnknownDirective(String),
    #[error("Unrecognized instruction: {0}.")]
    UnknownMnemonic(String),
    #[error("Unexpected comma after {0}.")]
    LeadingComma(&'static str),
    #[error("Missing operand after comma.")]
    DanglingComma,
    #[error("Multiple consecutive commas.")]
    ConsecutiveCommas,
    #[error("Expecting ',' between operands")]
    ExpectingComma,
    #[error("Too many operands for operation (got {0})")]
    TooManyOperands(usize),
    #[error("Invalid operand: {0}")]
    BadOperand(String),
    #[error("Expected integer for .data instruction (got '{0}')")]
    ExpectedInteger(String),
    #[error("Missing opening quote of string")]
    MissingOpenQuote,
    #[error("Missing closing quote of string")]
    MissingCloseQuote,
    #[error("Unexpected text after end of string")]
    TextAfterString,
    #[error("You have to specify a label name for .{0} instruction.")]
    MissingSymbolArg(DirectiveKind),
    #[error("Expected a single label name for .{0} instruction.")]
    ExtraSymbolArg(DirectiveKind),
    #[error("Invalid label name for .{kind} instruction: {name}")]
    BadSymbolArg { kind: DirectiveKind, name: String },
    #[error("Symbol {0} is already defined.")]
    DuplicateSymbol(String),
    #[error("Can't define a label to an entry instruction.")]
    LabeledEntry,
    #[error("The symbol {0} not found")]
    UndefinedSymbol(String),
    #[error("The symbol {0} can be either external or entry, but not both.")]
    EntryIsExternal(String),
    #[error("The symbol {0} for .entry is undefined.")]
    UndefinedEntry(String),
    #[error(transparent)]
    Operands(#[from] OperandError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Immediate(i32),
    Direct(String),
    RegisterIndirect(Register),
    Register(Register),
}

impl Operand {
    pub fn addressing(&self) -> Addressing {
        match self {
            Operand::Immediate(_) => Addressing::Immediate,
            Operand::Direct(_) => Addressing::Direct,
            Operand::RegisterIndirect(_) => Addressing::RegisterIndirect,
            Operand::Register(_) => Addressing::Register,
        }
    }

    /// The register carried by a register or register-indirect operand.
    pub fn register(&self) -> Option<Register> {
        match self {
            Operand::Register(r) | Operand::RegisterIndirect(r) => Some(*r),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SourceLine {
    /// Empty line or comment.
    Blank,
    Statement {
        label: Option<String>,
        body: StatementBody,
    },
}

#[derive(Debug, PartialEq, Eq)]
pub enum StatementBody {
    Data(Vec<i32>),
    StringLit(Vec<u8>),
    Entry(String),
    Extern(String),
    Instruction {
        mnemonic: Mnemonic,
        operands: Vec<Operand>,
    },
}

fn register(i: &str) -> IResult<&str, Register> {
    map_res(preceded(tag("r"), one_of("01234567")), |d: char| {
        Register::from_u8(d as u8 - b'0').ok_or("register out of range")
    })(i)
}

fn integer(i: &str) -> IResult<&str, i32> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i32>()
    })(i)
}

fn label_name(i: &str) -> IResult<&str, &str> {
    recognize(pair(alpha1, alphanumeric0))(i)
}

/// Classifies a single comma-free operand token by addressing mode.
pub fn parse_operand(text: &str) -> Result<Operand, LineError> {
    // every branch must consume the whole token so that alt can fall
    // through, e.g. from register "r3" to a label such as "r3x"
    let parsed = alt((
        all_consuming(map(preceded(tag("#"), integer), Operand::Immediate)),
        all_consuming(map(preceded(tag("*"), register), Operand::RegisterIndirect)),
        all_consuming(map(register, Operand::Register)),
        all_consuming(map(label_name, |name: &str| Operand::Direct(name.to_owned()))),
    ))(text);
    match parsed {
        Ok((_, operand)) => {
            if let Operand::Direct(name) = &operand {
                if !is_valid_label_name(name) {
                    return Err(LineError::BadOperand(text.to_owned()));
                }
            }
            Ok(operand)
        }
        Err(_) => Err(LineError::BadOperand(text.to_owned())),
    }
}

fn parse_operands(args: &str) -> Result<Vec<Operand>, LineError> {
    let args = args.trim();
    if args.is_empty() {
        return Ok(Vec::new());
    }
    if args.starts_with(',') {
        return Err(LineError::LeadingComma("command"));
    }
    if args.ends_with(',') {
        return Err(LineError::DanglingComma);
    }
    let mut operands = Vec::new();
    for piece in args.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(LineError::ConsecutiveCommas);
        }
        if piece.split_whitespace().count() > 1 {
            return Err(LineError::ExpectingComma);
        }
        operands.push(parse_operand(piece)?);
    }
    if operands.len() > 2 {
        return Err(LineError::TooManyOperands(operands.len()));
    }
    Ok(operands)
}

fn parse_data_items(args: &str) -> Result<Vec<i32>, LineError> {
    let args = args.trim();
    if args.starts_with(',') {
        return Err(LineError::LeadingComma(".data instruction"));
    }
    if args.ends_with(',') {
        return Err(LineError::DanglingComma);
    }
    if args.is_empty() {
        return Err(LineError::ExpectedInteger(String::new()));
    }
    let mut values = Vec::new();
    for piece in args.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(LineError::ConsecutiveCommas);
        }
        match all_consuming(integer)(piece) {
            Ok((_, value)) => values.push(value),
            Err(_) => return Err(LineError::ExpectedInteger(piece.to_owned())),
        }
    }
    Ok(values)
}

/// Extracts the bytes of a single double-quoted literal. The closing quote
/// is the last quote on the line; anything after it is an error.
fn parse_string_literal(args: &str) -> Result<Vec<u8>, LineError> {
    let args = args.trim();
    let Some(rest) = args.strip_prefix('"') else {
        return Err(LineError::MissingOpenQuote);
    };
    let Some(close) = rest.rfind('"') else {
        return Err(LineError::MissingCloseQuote);
    };
    if !rest[close + 1..].trim().is_empty() {
        return Err(LineError::TextAfterString);
    }
    Ok(rest[..close].bytes().collect())
}

fn parse_symbol_arg(kind: DirectiveKind, args: &str) -> Result<String, LineError> {
    let mut tokens = args.split_whitespace();
    let Some(name) = tokens.next() else {
        return Err(LineError::MissingSymbolArg(kind));
    };
    if tokens.next().is_some() {
        return Err(LineError::ExtraSymbolArg(kind));
    }
    if !is_valid_label_name(name) {
        return Err(LineError::BadSymbolArg {
            kind,
            name: name.to_owned(),
        });
    }
    Ok(name.to_owned())
}

/// Splits off a leading label. A label is a single token immediately
/// followed by `:`; a colon after whitespace (or inside a string literal)
/// does not start one.
fn split_label(trimmed: &str) -> Result<(Option<String>, &str), LineError> {
    match trimmed.find(|c: char| c.is_whitespace() || c == ':') {
        Some(idx) if trimmed[idx..].starts_with(':') => {
            let candidate = &trimmed[..idx];
            if !is_valid_label_name(candidate) {
                return Err(LineError::IllegalLabel(candidate.to_owned()));
            }
            Ok((Some(candidate.to_owned()), &trimmed[idx + 1..]))
        }
        _ => Ok((None, trimmed)),
    }
}

fn split_token(s: &str) -> (&str, &str) {
    match s.find(|c: char| c.is_whitespace()) {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s, ""),
    }
}

pub fn parse_line(content: &str) -> Result<SourceLine, LineError> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() || trimmed.starts_with(';') {
        return Ok(SourceLine::Blank);
    }
    let (label, rest) = split_label(trimmed)?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return Err(LineError::DanglingLabel);
    }
    let body = if let Some(after_dot) = rest.strip_prefix('.') {
        let (name, args) = split_token(after_dot);
        let kind = DirectiveKind::from_str(name)
            .map_err(|_| LineError::UnknownDirective(name.to_owned()))?;
        match kind {
            DirectiveKind::Data => StatementBody::Data(parse_data_items(args)?),
            DirectiveKind::String => StatementBody::StringLit(parse_string_literal(args)?),
            DirectiveKind::Entry => StatementBody::Entry(parse_symbol_arg(kind, args)?),
            DirectiveKind::Extern => StatementBody::Extern(parse_symbol_arg(kind, args)?),
        }
    } else {
        let (head, args) = split_token(rest);
        let mnemonic =
            Mnemonic::from_str(head).map_err(|_| LineError::UnknownMnemonic(head.to_owned()))?;
        StatementBody::Instruction {
            mnemonic,
            operands: parse_operands(args)?,
        }
    };
    Ok(SourceLine::Statement { label, body })
}
