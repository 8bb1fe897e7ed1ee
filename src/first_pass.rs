// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// First pass: label collection, address assignment and the entry list.

use crate::macro_processor::MacroTable;
use crate::parser::{parse_line, Directive, Instruction, LineBody, Operand};
use crate::report::{Diagnostic, PassCounts};
use crate::symbol_table::{SymbolKind, SymbolTable};
use crate::translation_unit::{TranslationUnit, IC_BASE};

/// Streams the expanded source, builds the symbol table and computes the
/// final instruction and data counters. Data symbols are relocated past the
/// instruction image at the end, and the entry list is built newest-first.
pub fn first_pass(
    lines: &[String],
    file_name: &str,
    unit: &mut TranslationUnit,
    macros: &MacroTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> PassCounts {
    let mut counts = PassCounts::default();
    let mut ic = IC_BASE;
    let mut dc = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx as u32 + 1;
        counts.lines += 1;

        let ast = parse_line(line);
        let line_error = |diagnostics: &mut Vec<Diagnostic>, detail: &str| {
            diagnostics.push(Diagnostic::at_line(file_name, line_num, detail));
        };

        match &ast.body {
            LineBody::Empty | LineBody::Note => {}
            LineBody::Error(detail) => {
                line_error(diagnostics, detail);
                counts.errors += 1;
            }
            LineBody::Instruction(inst) => {
                if let Some(label) = &ast.label {
                    if let Err(detail) =
                        define_label(&mut unit.symbols, macros, label, false, ic, dc)
                    {
                        line_error(diagnostics, detail);
                        counts.errors += 1;
                        continue;
                    }
                }
                ic += instruction_words(inst);
            }
            LineBody::Directive(Directive::Data(items)) => {
                if let Some(label) = &ast.label {
                    if let Err(detail) =
                        define_label(&mut unit.symbols, macros, label, true, ic, dc)
                    {
                        line_error(diagnostics, detail);
                        counts.errors += 1;
                        continue;
                    }
                }
                dc += items.len();
            }
            LineBody::Directive(Directive::Str(text)) => {
                if let Some(label) = &ast.label {
                    if let Err(detail) =
                        define_label(&mut unit.symbols, macros, label, true, ic, dc)
                    {
                        line_error(diagnostics, detail);
                        counts.errors += 1;
                        continue;
                    }
                }
                dc += text.len() + 1;
            }
            LineBody::Directive(Directive::Entry(name)) => {
                // A label on an .entry line is parsed but has no effect.
                if let Err(detail) = record_entry(&mut unit.symbols, macros, name) {
                    line_error(diagnostics, detail);
                    counts.errors += 1;
                }
            }
            LineBody::Directive(Directive::Extern(name)) => {
                if let Err(detail) = record_extern(&mut unit.symbols, macros, name) {
                    line_error(diagnostics, detail);
                    counts.errors += 1;
                }
            }
            LineBody::ConstantDef { name, value } => {
                if macros.contains(name) {
                    line_error(diagnostics, "redefining a name for a macro and constant");
                    counts.errors += 1;
                } else if unit.symbols.lookup(name).is_some() {
                    line_error(diagnostics, "redefenition of symbol");
                    counts.errors += 1;
                } else {
                    unit.symbols
                        .insert(name, SymbolKind::Const, line_num as usize, *value);
                }
            }
        }
    }

    for sym in unit.symbols.iter() {
        if sym.kind == SymbolKind::EntryPending {
            diagnostics.push(Diagnostic::for_file(
                file_name,
                format!(
                    "the symbol: {} was defined as an entry but did not receive a value",
                    sym.name
                ),
            ));
            counts.errors += 1;
        }
    }

    for sym in unit.symbols.iter_mut() {
        if sym.kind.is_data() {
            sym.address += ic;
        }
    }

    for sym in unit.symbols.iter() {
        if sym.kind.is_entry() {
            unit.entries.insert(0, sym.name.clone());
        }
    }

    counts
}

/// Words an instruction occupies: the opcode word plus its operand words.
/// Two register operands share a word; a label-with-index operand takes two.
pub fn instruction_words(inst: &Instruction) -> usize {
    if let (Operand::Register(_), Operand::Register(_)) = (&inst.operands[0], &inst.operands[1]) {
        return 2;
    }
    let mut words = 1;
    for operand in &inst.operands {
        words += match operand {
            Operand::None => 0,
            Operand::LabelIndex { .. } => 2,
            _ => 1,
        };
    }
    words
}

fn define_label(
    symbols: &mut SymbolTable,
    macros: &MacroTable,
    name: &str,
    directive_line: bool,
    ic: usize,
    dc: usize,
) -> Result<(), &'static str> {
    if macros.contains(name) {
        return Err("redefining a name for a macro and symbol");
    }
    if let Some(sym) = symbols.lookup_mut(name) {
        if sym.kind == SymbolKind::EntryPending {
            if directive_line {
                sym.kind = SymbolKind::DataEntry;
                sym.address = dc;
            } else {
                sym.kind = SymbolKind::InstEntry;
                sym.address = ic;
            }
            return Ok(());
        }
        return Err("redefenition of symbol");
    }
    if directive_line {
        symbols.insert(name, SymbolKind::Data, dc, 0);
    } else {
        symbols.insert(name, SymbolKind::Inst, ic, 0);
    }
    Ok(())
}

fn record_entry(
    symbols: &mut SymbolTable,
    macros: &MacroTable,
    name: &str,
) -> Result<(), &'static str> {
    if macros.contains(name) {
        return Err("redefining a name for a macro and symbol");
    }
    if let Some(sym) = symbols.lookup_mut(name) {
        return match sym.kind {
            SymbolKind::Data => {
                sym.kind = SymbolKind::DataEntry;
                Ok(())
            }
            SymbolKind::Inst => {
                sym.kind = SymbolKind::InstEntry;
                Ok(())
            }
            SymbolKind::EntryPending => Ok(()),
            _ => Err("redefenition of symbol"),
        };
    }
    symbols.insert(name, SymbolKind::EntryPending, 0, 0);
    Ok(())
}

fn record_extern(
    symbols: &mut SymbolTable,
    macros: &MacroTable,
    name: &str,
) -> Result<(), &'static str> {
    if macros.contains(name) {
        return Err("redefining a name for a macro and symbol");
    }
    if symbols.lookup(name).is_some() {
        return Err("redefenition of symbol");
    }
    symbols.insert(name, SymbolKind::Extern, 0, 0);
    Ok(())
}
