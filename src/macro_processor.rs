// Macro pre-processor implementing mcr/endmcr expansion.

use std::error;
use std::fmt;

use crate::instructions::is_mnemonic;
use crate::parser::is_directive_name;
use crate::tokenizer::Scanner;

/// Longest legal source line, terminator excluded.
pub const MAX_SOURCE_LINE: usize = 80;

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub body: Vec<String>,
}

/// Macro definitions in insertion order.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: Vec<Macro>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&Macro> {
        self.macros.iter().find(|mac| mac.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn insert(&mut self, name: &str) -> usize {
        self.macros.push(Macro {
            name: name.to_string(),
            body: Vec::new(),
        });
        self.macros.len() - 1
    }
}

/// Fatal pre-processing error; the file is skipped and no `.am` is produced.
#[derive(Debug, Clone)]
pub struct MacroError {
    line: Option<u32>,
    detail: String,
}

impl MacroError {
    fn at_line(line: u32, detail: &str) -> Self {
        Self {
            line: Some(line),
            detail: detail.to_string(),
        }
    }

    fn for_file(detail: &str) -> Self {
        Self {
            line: None,
            detail: detail.to_string(),
        }
    }

    pub fn line(&self) -> Option<u32> {
        self.line
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl error::Error for MacroError {}

pub struct MacroProcessor {
    table: MacroTable,
}

impl MacroProcessor {
    pub fn new() -> Self {
        Self {
            table: MacroTable::new(),
        }
    }

    /// Streams the `.as` lines and produces the `.am` lines: definitions are
    /// removed, invocations are replaced by the stored body, everything else
    /// passes through verbatim. Bodies are spliced without re-scanning, so
    /// expansion never recurses.
    pub fn expand(&mut self, lines: &[String]) -> Result<Vec<String>, MacroError> {
        let mut out = Vec::new();
        let mut recording: Option<usize> = None;

        for (idx, line) in lines.iter().enumerate() {
            let line_num = idx as u32 + 1;
            if line.len() > MAX_SOURCE_LINE {
                return Err(MacroError::at_line(
                    line_num,
                    "the line contains over 80 characters",
                ));
            }

            let mut scan = Scanner::new(line);
            let first = scan.next_word();

            match recording {
                Some(ix) => match first.as_deref() {
                    Some("endmcr") => {
                        if scan.next_word().is_some() {
                            return Err(MacroError::at_line(
                                line_num,
                                "text exists on the same line after endmcr",
                            ));
                        }
                        recording = None;
                    }
                    Some("mcr") => {
                        return Err(MacroError::at_line(
                            line_num,
                            "a macro definition cannot start inside another macro definition",
                        ));
                    }
                    _ => self.table.macros[ix].body.push(line.clone()),
                },
                None => match first.as_deref() {
                    None => out.push(line.clone()),
                    Some(word) if word.starts_with(';') => out.push(line.clone()),
                    Some("mcr") => {
                        let Some(name) = scan.next_word() else {
                            return Err(MacroError::at_line(
                                line_num,
                                "defining a macro without giving a name",
                            ));
                        };
                        if scan.next_word().is_some() {
                            return Err(MacroError::at_line(
                                line_num,
                                "there are words in the line of the macro definition except the macro name and mcr",
                            ));
                        }
                        if is_directive_name(&name) || is_mnemonic(&name) {
                            return Err(MacroError::at_line(
                                line_num,
                                "the macro was given the name of a directive or instruction",
                            ));
                        }
                        if self.table.contains(&name) {
                            return Err(MacroError::at_line(
                                line_num,
                                "attempt to define a macro with the name of a macro that already exists",
                            ));
                        }
                        recording = Some(self.table.insert(&name));
                    }
                    Some("endmcr") => {
                        return Err(MacroError::at_line(line_num, "endmcr without mcr"));
                    }
                    Some(word) => {
                        if let Some(mac) = self.table.lookup(word) {
                            out.extend(mac.body.iter().cloned());
                        } else {
                            out.push(line.clone());
                        }
                    }
                },
            }
        }

        if recording.is_some() {
            return Err(MacroError::for_file(
                "a macro is defined without closing, i.e. without endmcr",
            ));
        }

        Ok(out)
    }

    pub fn table(&self) -> &MacroTable {
        &self.table
    }

    pub fn into_table(self) -> MacroTable {
        self.table
    }
}

impl Default for MacroProcessor {
    fn default() -> Self {
        Self::new()
    }
}
