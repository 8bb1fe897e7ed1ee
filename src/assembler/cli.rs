// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Command-line interface parsing.

use clap::Parser;

pub const VERSION: &str = "1.0";

const LONG_ABOUT: &str = "Two-pass assembler for the 14-bit word machine with an mcr/endmcr macro pre-processor.

Each STEM names a source file STEM.as. The assembler writes STEM.am (the
macro-expanded source) and, when assembly succeeds, STEM.ob plus STEM.ent and
STEM.ext when the program exports entry symbols or references external
symbols. Inputs are processed independently and in order; a failing file does
not stop the run.";

#[derive(Parser, Debug)]
#[command(
    name = "asm14",
    version = VERSION,
    about = "Two-pass assembler for the 14-bit word machine",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    #[arg(
        value_name = "STEM",
        required = true,
        long_help = "Input file stem (repeatable). The assembler reads STEM.as."
    )]
    pub stems: Vec<String>,
}
