use std::fs;
use std::path::PathBuf;

use argspec_discovery::{ExtractOptions, OptionEntry, extract_options};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    fs::read_to_string(path).expect("fixture file must be readable")
}

fn find<'a>(entries: &'a [OptionEntry], flags: &str) -> &'a OptionEntry {
    entries
        .iter()
        .find(|entry| entry.flags == flags)
        .unwrap_or_else(|| panic!("missing entry {flags:?} in {entries:#?}"))
}

#[test]
fn test_gnu_help_fixture_extracts_every_option() {
    let entries = extract_options(&fixture("grep-help.txt"), &ExtractOptions::default());
    assert_eq!(entries.len(), 13, "{entries:#?}");

    assert_eq!(entries[0].flags, "-E, --extended-regexp");
    assert_eq!(
        find(&entries, "-e, --regexp=PATTERNS").description,
        "use PATTERNS for matching"
    );
    assert_eq!(
        find(&entries, "--no-ignore-case").description,
        "do not ignore case distinctions (default)"
    );
}

#[test]
fn test_gnu_help_fixture_joins_wrapped_descriptions() {
    let entries = extract_options(&fixture("grep-help.txt"), &ExtractOptions::default());
    assert_eq!(
        find(&entries, "-d, --directories=ACTION").description,
        "how to handle directories; ACTION is 'read', 'recurse', or 'skip'"
    );
}

#[test]
fn test_gnu_help_fixture_backfills_alias() {
    let entries = extract_options(&fixture("grep-help.txt"), &ExtractOptions::default());
    let color = find(&entries, "--color[=WHEN]");
    let colour = find(&entries, "--colour[=WHEN]");
    assert_eq!(color.description, colour.description);
    assert!(colour.description.starts_with("use markers to highlight"));
}

#[test]
fn test_manual_fixture_strips_overstrike() {
    let entries = extract_options(&fixture("ls-man.txt"), &ExtractOptions::default());
    let flags: Vec<_> = entries.iter().map(|e| e.flags.as_str()).collect();
    assert_eq!(
        flags,
        vec!["-a, --all", "--block-size=SIZE", "-C", "--color[=WHEN]"]
    );
    assert_eq!(
        entries[1].description,
        "with -l, scale sizes by SIZE when printing them; e.g., '--block-size=M'; see SIZE format below"
    );
    assert_eq!(entries[2].description, "list entries by columns");
}

#[test]
fn test_manual_fixture_with_section_bounds() {
    let options = ExtractOptions::between("^DESCRIPTION", "^SEE ALSO");
    let entries = extract_options(&fixture("ls-man.txt"), &options);
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[3].description, "color the output WHEN; more info below");
}

#[test]
fn test_text_without_options_is_empty() {
    let entries = extract_options(
        "This program has no options.\nIt just runs.\n",
        &ExtractOptions::default(),
    );
    assert!(entries.is_empty());
}
