// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asm14.

fn main() {
    let reports = asm14::assembler::run();
    let mut failed = false;
    for report in &reports {
        for diag in report.diagnostics() {
            eprintln!("{diag}");
        }
        if !report.succeeded() {
            failed = true;
        }
    }
    if failed {
        std::process::exit(1);
    }
}
