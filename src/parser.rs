// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Line parser producing one LineAst per source line.

use crate::instructions::{Arity, Opcode};
use crate::tokenizer::{register_index, Scanner};

pub const MAX_LABEL_LEN: usize = 31;
pub const MAX_INST_OPERANDS: usize = 2;
pub const SOURCE_OPERAND: usize = 0;
pub const DESTINATION_OPERAND: usize = 1;

const MIN_OPERAND_VALUE: i32 = -2048;
const MAX_OPERAND_VALUE: i32 = 2047;

/// One parsed source line: the optional pre-line label plus the line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAst {
    pub label: Option<String>,
    pub body: LineBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineBody {
    Empty,
    Note,
    Directive(Directive),
    Instruction(Instruction),
    ConstantDef { name: String, value: i16 },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Data(Vec<DataItem>),
    Str(String),
    Entry(String),
    Extern(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataItem {
    Number(i16),
    Constant(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Source operand in slot 0, destination in slot 1. Unused slots stay
    /// `Operand::None`; a one-operand opcode fills only the destination.
    pub operands: [Operand; MAX_INST_OPERANDS],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    Number(i16),
    Constant(String),
    Register(u8),
    Label(String),
    LabelIndex { label: String, index: IndexValue },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexValue {
    Number(i16),
    Constant(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Data,
    Str,
    Entry,
    Extern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelPosition {
    PreLine,
    Operand,
}

pub fn directive_kind(word: &str) -> Option<DirectiveKind> {
    match word {
        ".data" => Some(DirectiveKind::Data),
        ".string" => Some(DirectiveKind::Str),
        ".entry" => Some(DirectiveKind::Entry),
        ".extern" => Some(DirectiveKind::Extern),
        _ => None,
    }
}

pub fn is_directive_name(word: &str) -> bool {
    directive_kind(word).is_some()
}

/// Signed base-10 number that fits 12-bit two's complement. Strings longer
/// than 5 characters or with trailing junk are rejected.
pub fn parse_number(word: &str) -> Option<i16> {
    if word.len() > 5 {
        return None;
    }
    let value: i32 = word.parse().ok()?;
    if (MIN_OPERAND_VALUE..=MAX_OPERAND_VALUE).contains(&value) {
        Some(value as i16)
    } else {
        None
    }
}

fn is_reserved_word(word: &str) -> bool {
    register_index(word).is_some()
        || is_directive_name(word)
        || Opcode::from_mnemonic(word).is_some()
}

/// Label syntax: alphabetic first character, alphanumeric rest, at most 31
/// characters, not a reserved word. A pre-line label additionally carries a
/// trailing `:`.
pub fn is_label_token(word: &str, position: LabelPosition) -> bool {
    let name = match position {
        LabelPosition::PreLine => {
            if !word.ends_with(':') {
                return false;
            }
            &word[..word.len() - 1]
        }
        LabelPosition::Operand => word,
    };
    if name.is_empty() || name.len() > MAX_LABEL_LEN {
        return false;
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    if !bytes.iter().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    !is_reserved_word(name)
}

pub fn parse_line(line: &str) -> LineAst {
    if line.as_bytes().first() == Some(&b';') {
        return LineAst {
            label: None,
            body: LineBody::Note,
        };
    }

    let mut scan = Scanner::new(line);
    let Some(first) = scan.next_word() else {
        return LineAst {
            label: None,
            body: LineBody::Empty,
        };
    };

    let mut label = None;
    let word;
    if is_label_token(&first, LabelPosition::PreLine) {
        label = Some(first[..first.len() - 1].to_string());
        match scan.next_word() {
            Some(next) => word = next,
            None => {
                return LineAst {
                    label,
                    body: err("the line contains only label name"),
                }
            }
        }
    } else {
        word = first;
    }

    let body = if is_label_token(&word, LabelPosition::PreLine) {
        err("a label is in an invalid place")
    } else if let Some(kind) = directive_kind(&word) {
        parse_directive(&mut scan, kind)
    } else if let Some(opcode) = Opcode::from_mnemonic(&word) {
        parse_instruction(&mut scan, opcode)
    } else if word == ".define" {
        if label.is_some() {
            err("a label must not be defined in a constant definition line")
        } else {
            parse_constant_def(&mut scan)
        }
    } else if label.is_some() {
        err("after defining a label there must be an instruction or directive")
    } else {
        err("the first word must be an instruction or directive or .define or label name")
    };

    LineAst { label, body }
}

fn err(detail: &str) -> LineBody {
    LineBody::Error(detail.to_string())
}

fn leading_comma(scan: &mut Scanner) -> bool {
    scan.skip_whitespace();
    scan.peek() == Some(b',')
}

fn trailing_junk(scan: &mut Scanner) -> bool {
    scan.skip_whitespace();
    !scan.at_end()
}

fn parse_directive(scan: &mut Scanner, kind: DirectiveKind) -> LineBody {
    if leading_comma(scan) {
        return err("there is a comma, after an instruction/directive/define");
    }
    if scan.at_end() {
        return err("a directive word must be followed by an operand");
    }
    match kind {
        DirectiveKind::Entry | DirectiveKind::Extern => {
            let Some(word) = scan.next_word() else {
                return err("a directive word must be followed by an operand");
            };
            if !is_label_token(&word, LabelPosition::Operand) {
                return err("an operand of entry and extern must be a proper name of a label");
            }
            if trailing_junk(scan) {
                return err("unexpected characters after operands");
            }
            match kind {
                DirectiveKind::Entry => LineBody::Directive(Directive::Entry(word)),
                _ => LineBody::Directive(Directive::Extern(word)),
            }
        }
        DirectiveKind::Str => parse_string_operand(scan),
        DirectiveKind::Data => parse_data_operands(scan),
    }
}

fn parse_string_operand(scan: &mut Scanner) -> LineBody {
    if scan.peek() != Some(b'"') {
        return err("after the string directive the operand must start with the character \"");
    }
    scan.bump();
    let Some(word) = scan.next_word() else {
        return err("a string directive must have at least one character after the quotation marks");
    };
    if !word.ends_with('"') {
        return err("in the operand of the directive string there is no closing hyphen");
    }
    let mut text = String::new();
    for &c in &word.as_bytes()[..word.len() - 1] {
        if (0x20..=0x7e).contains(&c) {
            text.push(c as char);
        } else {
            return err(
                "the operand of the string directive must include only alphabetic letters between the 2 hyphenes",
            );
        }
    }
    if trailing_junk(scan) {
        return err("unexpected characters after operands");
    }
    LineBody::Directive(Directive::Str(text))
}

fn parse_data_operands(scan: &mut Scanner) -> LineBody {
    let mut items = Vec::new();
    let mut comma_cnt = 0;
    loop {
        match scan.peek() {
            None => break,
            Some(c) if c.is_ascii_whitespace() => {
                scan.bump();
            }
            Some(b',') => {
                if comma_cnt > 0 {
                    return err("there are 2 commas between a number and another number");
                }
                comma_cnt += 1;
                scan.bump();
            }
            Some(_) => {
                let Some(word) = scan.next_word() else {
                    break;
                };
                if let Some(num) = parse_number(&word) {
                    items.push(DataItem::Number(num));
                } else if is_label_token(&word, LabelPosition::Operand) {
                    items.push(DataItem::Constant(word));
                } else {
                    return err(
                        "for the data directive, you can only enter integers that can be represented in 12 bits by the 2's complement method or or words that meet the syntax requirements of a label",
                    );
                }
                comma_cnt = 0;
            }
        }
    }
    if comma_cnt != 0 {
        return err("there is a comma after the last number");
    }
    LineBody::Directive(Directive::Data(items))
}

fn parse_instruction(scan: &mut Scanner, opcode: Opcode) -> LineBody {
    if leading_comma(scan) {
        return err("there is a comma, after an instruction/directive/define");
    }

    let mut operands = [Operand::None, Operand::None];
    let first_slot = match opcode.arity() {
        Arity::Zero => MAX_INST_OPERANDS,
        Arity::One => DESTINATION_OPERAND,
        Arity::Two => SOURCE_OPERAND,
    };

    for slot in first_slot..MAX_INST_OPERANDS {
        let Some(word) = scan.next_word() else {
            return err("missing operand");
        };
        match classify_operand(&word, opcode, slot) {
            Ok(operand) => operands[slot] = operand,
            Err(detail) => return err(detail),
        }

        if slot == SOURCE_OPERAND {
            let mut comma_flag = 0;
            loop {
                match scan.peek() {
                    Some(c) if c.is_ascii_whitespace() => {
                        scan.bump();
                    }
                    Some(b',') => {
                        if comma_flag > 0 {
                            return err("multiple commas between 2 operands");
                        }
                        comma_flag += 1;
                        scan.bump();
                    }
                    _ => break,
                }
            }
            if scan.at_end() {
                return err("missing operand");
            }
        }
    }

    if trailing_junk(scan) {
        return err("unexpected characters after operands");
    }
    LineBody::Instruction(Instruction { opcode, operands })
}

fn classify_operand(word: &str, opcode: Opcode, slot: usize) -> Result<Operand, &'static str> {
    const INAPPROPRIATE: &str = "the operation type received an operand of an inappropriate type";
    let label_only_dest = matches!(opcode, Opcode::Jmp | Opcode::Bne | Opcode::Jsr);

    if let Some(rest) = word.strip_prefix('#') {
        let immediate_dest_ok = matches!(opcode, Opcode::Cmp | Opcode::Prn);
        if (slot == DESTINATION_OPERAND && !immediate_dest_ok)
            || (slot == SOURCE_OPERAND && opcode == Opcode::Lea)
        {
            return Err(INAPPROPRIATE);
        }
        if rest.is_empty() {
            return Err("# must be followed by a number or constant");
        }
        if let Some(num) = parse_number(rest) {
            return Ok(Operand::Number(num));
        }
        if is_label_token(rest, LabelPosition::Operand) {
            return Ok(Operand::Constant(rest.to_string()));
        }
        return Err("# must be followed by a constant or a number");
    }

    if is_label_token(word, LabelPosition::Operand) {
        return Ok(Operand::Label(word.to_string()));
    }

    if let Some((label, index)) = parse_label_with_index(word) {
        if slot == DESTINATION_OPERAND && label_only_dest {
            return Err(INAPPROPRIATE);
        }
        return Ok(Operand::LabelIndex { label, index });
    }

    if let Some(reg) = register_index(word) {
        if slot == SOURCE_OPERAND && opcode == Opcode::Lea {
            return Err(INAPPROPRIATE);
        }
        if slot == DESTINATION_OPERAND && label_only_dest {
            return Err(INAPPROPRIATE);
        }
        return Ok(Operand::Register(reg));
    }

    Err(INAPPROPRIATE)
}

fn parse_label_with_index(word: &str) -> Option<(String, IndexValue)> {
    let open = word.find('[')?;
    if open == 0 {
        return None;
    }
    let label = &word[..open];
    if !is_label_token(label, LabelPosition::Operand) {
        return None;
    }
    let rest = &word[open + 1..];
    let close = rest.find(']')?;
    if close != rest.len() - 1 {
        return None;
    }
    let index = &rest[..close];
    if let Some(num) = parse_number(index) {
        return Some((label.to_string(), IndexValue::Number(num)));
    }
    if is_label_token(index, LabelPosition::Operand) {
        return Some((label.to_string(), IndexValue::Constant(index.to_string())));
    }
    None
}

fn parse_constant_def(scan: &mut Scanner) -> LineBody {
    if leading_comma(scan) {
        return err("there is a comma, after an instruction/directive/define");
    }
    if scan.at_end() {
        return err("a constant definition is missing after the word define");
    }
    let Some(name) = scan.next_word() else {
        return err("a constant definition is missing after the word define");
    };
    if !is_label_token(&name, LabelPosition::Operand) {
        return err("the first word after .define does not follow the syntax rules for a label");
    }
    scan.skip_whitespace();
    if scan.peek() != Some(b'=') {
        return err("missing the equality sign in a constant definition statment");
    }
    scan.bump();
    scan.skip_whitespace();
    if scan.at_end() {
        return err("missing a number in a constant definition statement");
    }
    let Some(num_word) = scan.next_word() else {
        return err("missing a number in a constant definition statement");
    };
    let Some(value) = parse_number(&num_word) else {
        return err("a no valid number is given in a constant definition statement");
    };
    if trailing_junk(scan) {
        return err("unexpected characters after operands");
    }
    LineBody::ConstantDef { name, value }
}
