use super::{process_stem, run_with_stems, FileReport};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{SystemTime, UNIX_EPOCH};

fn create_temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("target")
        .join(format!("test-{label}-{}-{nanos}", process::id()));
    fs::create_dir_all(&dir).expect("Create temp dir");
    dir
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("Write test file");
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|_| panic!("Read {path:?}"))
}

fn stem_path(dir: &Path, stem: &str) -> String {
    dir.join(stem).to_string_lossy().to_string()
}

fn assemble(dir: &Path, stem: &str, source: &str) -> FileReport {
    write_file(&dir.join(format!("{stem}.as")), source);
    process_stem(&stem_path(dir, stem))
}

fn diagnostic_details(report: &FileReport) -> Vec<String> {
    report
        .diagnostics()
        .iter()
        .map(|diag| diag.detail().to_string())
        .collect()
}

#[test]
fn empty_source_emits_empty_am_and_header_only_object() {
    let dir = create_temp_dir("empty");
    let report = assemble(&dir, "foo", "");
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));

    assert_eq!(read_file(&dir.join("foo.am")), "");
    assert_eq!(read_file(&dir.join("foo.ob")), "  100 0\n");
    assert!(!dir.join("foo.ent").exists());
    assert!(!dir.join("foo.ext").exists());
}

#[test]
fn constant_and_data_program() {
    let dir = create_temp_dir("const-data");
    let source = ".define SZ = 5\nSTR: .string \"ab\"\n.entry STR\n";
    let report = assemble(&dir, "foo", source);
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));

    assert_eq!(
        read_file(&dir.join("foo.ob")),
        "  100 3\n0100 ***#%*#\n0101 ***#%*%\n0102 *******\n"
    );
    assert_eq!(read_file(&dir.join("foo.ent")), "STR\t0100\n");
    assert!(!dir.join("foo.ext").exists());
}

#[test]
fn macro_expansion_end_to_end() {
    let dir = create_temp_dir("macro");
    let source = "mcr M\n  hlt\nendmcr\nM\nM\n";
    let report = assemble(&dir, "foo", source);
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));

    assert_eq!(read_file(&dir.join("foo.am")), "  hlt\n  hlt\n");
    assert_eq!(
        read_file(&dir.join("foo.ob")),
        "  102 0\n0100 **!!***\n0101 **!!***\n"
    );
}

#[test]
fn external_reference_program() {
    let dir = create_temp_dir("extern");
    let source = ".extern EXT\nmov EXT, r1\nhlt\n";
    let report = assemble(&dir, "foo", source);
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));

    assert_eq!(
        read_file(&dir.join("foo.ob")),
        "  104 0\n0100 ****#!*\n0101 ******#\n0102 *****#*\n0103 **!!***\n"
    );
    assert_eq!(read_file(&dir.join("foo.ext")), "EXT\t0101\n");
    assert!(!dir.join("foo.ent").exists());
}

#[test]
fn register_index_operand_fails_the_first_pass() {
    let dir = create_temp_dir("bad-index");
    let source = "ARR: .data 10,20,30\nmov ARR[r0], r1\n";
    let report = assemble(&dir, "foo", source);
    assert!(!report.succeeded());
    assert_eq!(
        diagnostic_details(&report),
        vec!["the operation type received an operand of an inappropriate type".to_string()]
    );
    assert_eq!(report.diagnostics()[0].line(), Some(2));

    // Pre-processing succeeded, so the expanded source survives; no object
    // file is produced.
    assert!(dir.join("foo.am").exists());
    assert!(!dir.join("foo.ob").exists());
}

#[test]
fn forward_constant_use_fails_the_second_pass() {
    let dir = create_temp_dir("fwd-const");
    let source = "mov #K, r0\n.define K = 7\n";
    let report = assemble(&dir, "foo", source);
    assert!(!report.succeeded());
    assert_eq!(
        diagnostic_details(&report),
        vec!["using a constant whose definition is done at a later stage in the file".to_string()]
    );
    assert!(!dir.join("foo.ob").exists());
}

#[test]
fn macro_errors_remove_the_am_file() {
    let dir = create_temp_dir("bad-macro");
    let report = assemble(&dir, "foo", "mcr mov\n  hlt\nendmcr\n");
    assert!(!report.succeeded());
    assert_eq!(
        diagnostic_details(&report),
        vec!["the macro was given the name of a directive or instruction".to_string()]
    );
    assert!(!dir.join("foo.am").exists());
    assert!(!dir.join("foo.ob").exists());
}

#[test]
fn overlong_line_is_fatal_for_the_file() {
    let dir = create_temp_dir("long-line");
    let source = format!(".data {}\n", "1, ".repeat(40));
    let report = assemble(&dir, "foo", &source);
    assert!(!report.succeeded());
    assert_eq!(
        diagnostic_details(&report),
        vec!["the line contains over 80 characters".to_string()]
    );
    assert!(!dir.join("foo.am").exists());
}

#[test]
fn missing_input_reports_the_as_file() {
    let dir = create_temp_dir("missing");
    let report = process_stem(&stem_path(&dir, "nope"));
    assert!(!report.succeeded());
    assert_eq!(report.diagnostics().len(), 1);
    assert!(report.diagnostics()[0]
        .to_string()
        .ends_with("nope.as, cannot be opened"));
}

#[test]
fn every_stem_is_processed_despite_failures() {
    let dir = create_temp_dir("multi");
    write_file(&dir.join("good.as"), "hlt\n");
    write_file(&dir.join("bad.as"), "bogus\n");

    let stems = vec![
        stem_path(&dir, "bad"),
        stem_path(&dir, "good"),
        stem_path(&dir, "missing"),
    ];
    let reports = run_with_stems(&stems);
    assert_eq!(reports.len(), 3);
    assert!(!reports[0].succeeded());
    assert!(reports[1].succeeded());
    assert!(!reports[2].succeeded());
    assert!(dir.join("good.ob").exists());
    assert!(!dir.join("bad.ob").exists());
}

#[test]
fn entries_file_lists_newest_symbol_first() {
    let dir = create_temp_dir("entries-order");
    let source = "A: hlt\nB: hlt\n.entry A\n.entry B\n";
    let report = assemble(&dir, "foo", source);
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));
    assert_eq!(read_file(&dir.join("foo.ent")), "B\t0101\nA\t0100\n");
}

#[test]
fn externals_file_lists_newest_reference_first() {
    let dir = create_temp_dir("ext-order");
    let source = ".extern A\n.extern B\njmp A\njmp B\njmp A\n";
    let report = assemble(&dir, "foo", source);
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));
    // jmp words sit at 100/101, 102/103, 104/105; operands are the odd
    // addresses. Symbols newest-first, addresses newest-first within each.
    assert_eq!(
        read_file(&dir.join("foo.ext")),
        "B\t0103\nA\t0105\nA\t0101\n"
    );
}

#[test]
fn full_program_layout() {
    let dir = create_temp_dir("full");
    let source = "\
; full program
.define IDX = 2
MAIN: mov ARR[IDX], r1
add #-1, COUNT
jsr FN
hlt
ARR: .data 7, -7, IDX
COUNT: .data 0
MSG: .string \"hi\"
.entry MAIN
.entry COUNT
.extern FN
";
    let report = assemble(&dir, "prog", source);
    assert!(report.succeeded(), "{:?}", diagnostic_details(&report));

    let ob = read_file(&dir.join("prog.ob"));
    let lines: Vec<&str> = ob.lines().collect();
    // 10 instruction words and 7 data words.
    assert_eq!(lines[0], "  110 7");
    assert_eq!(lines.len(), 1 + 10 + 7);
    // First instruction word: mov, source mode 2, destination mode 3.
    assert_eq!(lines[1], format!("0100 {}", crate::translation_unit::encode_word(44)));
    // ARR relocates to 110, directly after the instruction image.
    assert_eq!(
        lines[2],
        format!("0101 {}", crate::translation_unit::encode_word((110 << 2) | 0b10))
    );
    assert_eq!(lines[11], format!("0110 {}", crate::translation_unit::encode_word(7)));
    assert!(lines[17].starts_with("0116 "));

    assert_eq!(read_file(&dir.join("prog.ent")), "COUNT\t0113\nMAIN\t0100\n");
    assert_eq!(read_file(&dir.join("prog.ext")), "FN\t0108\n");
}

#[test]
fn undefined_entry_reports_and_blocks_output() {
    let dir = create_temp_dir("pending-entry");
    let report = assemble(&dir, "foo", ".entry GHOST\nhlt\n");
    assert!(!report.succeeded());
    assert_eq!(
        diagnostic_details(&report),
        vec!["the symbol: GHOST was defined as an entry but did not receive a value".to_string()]
    );
    assert!(!dir.join("foo.ob").exists());
}
