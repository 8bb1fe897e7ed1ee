// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Second pass: encode every line into 14-bit words and resolve symbols.

use crate::parser::{
    parse_line, DataItem, Directive, IndexValue, Instruction, LineBody, Operand,
    DESTINATION_OPERAND, SOURCE_OPERAND,
};
use crate::report::{Diagnostic, PassCounts};
use crate::symbol_table::SymbolKind;
use crate::translation_unit::{TranslationUnit, Word};

/// Re-walks the expanded source and fills the instruction and data images.
/// The parser is deterministic, so the word positions match the counts the
/// first pass computed. Runs only after an error-free first pass.
pub fn second_pass(
    lines: &[String],
    file_name: &str,
    unit: &mut TranslationUnit,
    diagnostics: &mut Vec<Diagnostic>,
) -> PassCounts {
    let mut encoder = Encoder {
        unit,
        diagnostics,
        file_name,
        counts: PassCounts::default(),
        code_overflow: false,
        data_overflow: false,
    };

    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx as u32 + 1;
        encoder.counts.lines += 1;
        let ast = parse_line(line);
        match &ast.body {
            LineBody::Instruction(inst) => encoder.encode_instruction(inst, line_num),
            LineBody::Directive(Directive::Data(items)) => encoder.encode_data(items, line_num),
            LineBody::Directive(Directive::Str(text)) => encoder.encode_string(text, line_num),
            _ => {}
        }
    }

    encoder.counts
}

struct Encoder<'a> {
    unit: &'a mut TranslationUnit,
    diagnostics: &'a mut Vec<Diagnostic>,
    file_name: &'a str,
    counts: PassCounts,
    code_overflow: bool,
    data_overflow: bool,
}

impl Encoder<'_> {
    fn error(&mut self, line_num: u32, detail: &str) {
        self.diagnostics
            .push(Diagnostic::at_line(self.file_name, line_num, detail));
        self.counts.errors += 1;
    }

    fn emit_code(&mut self, line_num: u32, word: Word) {
        if !self.unit.code.push(word) && !self.code_overflow {
            self.code_overflow = true;
            self.error(line_num, "the program is too large for the memory image");
        }
    }

    fn emit_data(&mut self, line_num: u32, word: Word) {
        if !self.unit.data.push(word) && !self.data_overflow {
            self.data_overflow = true;
            self.error(line_num, "the program is too large for the memory image");
        }
    }

    fn encode_instruction(&mut self, inst: &Instruction, line_num: u32) {
        let mut first = inst.opcode.index() << 6;
        first |= addressing_mode(&inst.operands[SOURCE_OPERAND]) << 4;
        first |= addressing_mode(&inst.operands[DESTINATION_OPERAND]) << 2;
        self.emit_code(line_num, first);

        if let (Operand::Register(src), Operand::Register(dst)) =
            (&inst.operands[SOURCE_OPERAND], &inst.operands[DESTINATION_OPERAND])
        {
            let word = ((*src as Word) << 5) | ((*dst as Word) << 2);
            self.emit_code(line_num, word);
            return;
        }

        for (slot, operand) in inst.operands.iter().enumerate() {
            match operand {
                Operand::None => {}
                Operand::Number(num) => {
                    self.emit_code(line_num, operand_word(*num));
                }
                Operand::Constant(name) => match self.resolve_constant(name, line_num) {
                    Ok(value) => self.emit_code(line_num, operand_word(value)),
                    Err(detail) => self.error(line_num, detail),
                },
                Operand::Register(reg) => {
                    let word = if slot == SOURCE_OPERAND {
                        (*reg as Word) << 5
                    } else {
                        (*reg as Word) << 2
                    };
                    self.emit_code(line_num, word);
                }
                Operand::Label(name) => {
                    if let Err(detail) = self.encode_label_word(name, line_num) {
                        self.error(line_num, detail);
                    }
                }
                Operand::LabelIndex { label, index } => {
                    match self.encode_label_word(label, line_num) {
                        Ok(()) => match index {
                            IndexValue::Number(num) => {
                                self.emit_code(line_num, operand_word(*num));
                            }
                            IndexValue::Constant(name) => {
                                match self.resolve_constant(name, line_num) {
                                    Ok(value) => {
                                        self.emit_code(line_num, operand_word(value));
                                    }
                                    Err(detail) => self.error(line_num, detail),
                                }
                            }
                        },
                        Err(detail) => self.error(line_num, detail),
                    }
                }
            }
        }
    }

    fn encode_data(&mut self, items: &[DataItem], line_num: u32) {
        for item in items {
            match item {
                DataItem::Number(num) => self.emit_data(line_num, *num as Word),
                DataItem::Constant(name) => match self.resolve_constant(name, line_num) {
                    Ok(value) => self.emit_data(line_num, value as Word),
                    Err(detail) => self.error(line_num, detail),
                },
            }
        }
    }

    fn encode_string(&mut self, text: &str, line_num: u32) {
        for byte in text.bytes() {
            self.emit_data(line_num, byte as Word);
        }
        self.emit_data(line_num, 0);
    }

    /// A constant must exist with kind `Const` and be defined on an earlier
    /// line than the one using it.
    fn resolve_constant(&self, name: &str, line_num: u32) -> Result<i16, &'static str> {
        match self.unit.symbols.lookup(name) {
            Some(sym) if sym.kind == SymbolKind::Const => {
                if sym.address < line_num as usize {
                    Ok(sym.value)
                } else {
                    Err("using a constant whose definition is done at a later stage in the file")
                }
            }
            _ => Err("using a constant that was not defined in the file"),
        }
    }

    fn encode_label_word(&mut self, name: &str, line_num: u32) -> Result<(), &'static str> {
        let found = self
            .unit
            .symbols
            .lookup(name)
            .map(|sym| (sym.kind, sym.address));
        match found {
            Some((SymbolKind::Extern, _)) => {
                let address = self.unit.ic();
                self.emit_code(line_num, 0b01);
                self.unit.externals.record(name, address);
                Ok(())
            }
            Some((_, address)) => {
                self.emit_code(line_num, ((address as Word) << 2) | 0b10);
                Ok(())
            }
            None => Err("using a label that was not defined in the file"),
        }
    }
}

fn addressing_mode(operand: &Operand) -> Word {
    match operand {
        Operand::None | Operand::Number(_) | Operand::Constant(_) => 0,
        Operand::Label(_) => 1,
        Operand::LabelIndex { .. } => 2,
        Operand::Register(_) => 3,
    }
}

/// Operand-word payload: 12-bit two's complement value in bits 2..13,
/// A/R/E left absolute.
fn operand_word(value: i16) -> Word {
    ((value as Word) & 0x0fff) << 2
}
