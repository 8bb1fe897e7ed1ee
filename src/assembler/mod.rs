// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Assembler pipeline driver and output file generation.

use std::fs::{self, File};
use std::io::{self, BufRead, BufWriter, Write};

use clap::Parser;

use crate::first_pass::first_pass;
use crate::macro_processor::MacroProcessor;
use crate::report::Diagnostic;
use crate::second_pass::second_pass;
use crate::translation_unit::TranslationUnit;

pub mod cli;

#[cfg(test)]
mod tests;

/// Outcome of one input stem: the diagnostics it produced and whether every
/// stage completed.
pub struct FileReport {
    stem: String,
    diagnostics: Vec<Diagnostic>,
    succeeded: bool,
}

impl FileReport {
    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }
}

pub fn run() -> Vec<FileReport> {
    let cli = cli::Cli::parse();
    run_with_stems(&cli.stems)
}

/// Processes every stem in order; one file's failure never stops the rest.
pub fn run_with_stems(stems: &[String]) -> Vec<FileReport> {
    stems.iter().map(|stem| process_stem(stem)).collect()
}

pub fn process_stem(stem: &str) -> FileReport {
    let mut diagnostics = Vec::new();
    let succeeded = assemble_stem(stem, &mut diagnostics);
    FileReport {
        stem: stem.to_string(),
        diagnostics,
        succeeded,
    }
}

fn assemble_stem(stem: &str, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let as_name = format!("{stem}.as");
    let am_name = format!("{stem}.am");

    let source = match read_source_lines(&as_name) {
        Ok(lines) => lines,
        Err(_) => {
            diagnostics.push(Diagnostic::for_file(&as_name, "cannot be opened"));
            return false;
        }
    };

    let mut processor = MacroProcessor::new();
    let expanded = match processor.expand(&source) {
        Ok(lines) => lines,
        Err(err) => {
            diagnostics.push(match err.line() {
                Some(line) => Diagnostic::at_line(&as_name, line, err.detail()),
                None => Diagnostic::for_file(&as_name, err.detail()),
            });
            return false;
        }
    };
    let macros = processor.into_table();

    if write_lines(&am_name, &expanded).is_err() {
        diagnostics.push(Diagnostic::for_file(&am_name, "cannot be opened"));
        let _ = fs::remove_file(&am_name);
        return false;
    }

    let mut unit = TranslationUnit::new();
    let pass1 = first_pass(&expanded, &am_name, &mut unit, &macros, diagnostics);
    if pass1.errors > 0 {
        return false;
    }

    let pass2 = second_pass(&expanded, &am_name, &mut unit, diagnostics);
    if pass2.errors > 0 {
        return false;
    }

    emit_outputs(stem, &unit, diagnostics)
}

fn emit_outputs(stem: &str, unit: &TranslationUnit, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let ob_name = format!("{stem}.ob");
    if write_output(&ob_name, |out| unit.write_object_file(out)).is_err() {
        diagnostics.push(Diagnostic::for_file(&ob_name, "cannot be opened"));
        let _ = fs::remove_file(&ob_name);
        return false;
    }

    if !unit.entries.is_empty() {
        let ent_name = format!("{stem}.ent");
        if write_output(&ent_name, |out| unit.write_entries_file(out)).is_err() {
            diagnostics.push(Diagnostic::for_file(&ent_name, "cannot be opened"));
            let _ = fs::remove_file(&ent_name);
            return false;
        }
    }

    if !unit.externals.is_empty() {
        let ext_name = format!("{stem}.ext");
        if write_output(&ext_name, |out| unit.write_externals_file(out)).is_err() {
            diagnostics.push(Diagnostic::for_file(&ext_name, "cannot be opened"));
            let _ = fs::remove_file(&ext_name);
            return false;
        }
    }

    true
}

fn read_source_lines(path: &str) -> io::Result<Vec<String>> {
    let file = File::open(path)?;
    let mut reader = io::BufReader::new(file);
    let mut lines = Vec::new();
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        lines.push(line.clone());
    }
    Ok(lines)
}

fn write_lines(path: &str, lines: &[String]) -> io::Result<()> {
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

fn write_output<F>(path: &str, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path)?;
    let mut out = BufWriter::new(file);
    write(&mut out)?;
    out.flush()
}
