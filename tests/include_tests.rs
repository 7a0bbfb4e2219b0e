use std::collections::HashMap;
use std::fs;
use std::path::Path;

use inipp::{IniParser, Reader};

struct MapReader(HashMap<String, String>);

impl MapReader {
    fn new(files: &[(&str, &str)]) -> Self {
        Self(
            files
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl Reader for MapReader {
    fn read(&self, path: &Path) -> String {
        self.0
            .get(path.to_string_lossy().as_ref())
            .cloned()
            .unwrap_or_default()
    }

    fn exists(&self, path: &Path) -> bool {
        self.0.contains_key(path.to_string_lossy().as_ref())
    }
}

fn expand_with(files: &[(&str, &str)], input: &str) -> IniParser {
    let mut parser = IniParser::new().with_reader(MapReader::new(files));
    parser.parse(input).finalize();
    parser
}

#[test]
fn test_basic_include() {
    let parser = expand_with(
        &[("part.ini", "[PART]\nK=1\n")],
        "[INCLUDE]\nINCLUDE=part.ini\n[MAIN]\nL=2\n",
    );
    assert_eq!(parser.to_ini(), "[MAIN]\nL=2\n\n[PART]\nK=1\n\n");
}

#[test]
fn test_include_header_form() {
    let parser = expand_with(&[("part.ini", "[PART]\nK=1\n")], "[INCLUDE: part.ini]\n");
    assert_eq!(parser.to_ini(), "[PART]\nK=1\n\n");
}

#[test]
fn test_include_list_extends() {
    let parser = expand_with(
        &[("a.ini", "[A]\nK=1\n"), ("b.ini", "[B]\nK=2\n")],
        "[INCLUDE: a.ini]\nINCLUDE=b.ini\n",
    );
    assert_eq!(parser.to_ini(), "[A]\nK=1\n\n[B]\nK=2\n\n");
}

#[test]
fn test_include_parameters_reach_included_file() {
    let parser = expand_with(
        &[("part.ini", "[PART]\nWHO=$NAME\n")],
        "[INCLUDE]\nINCLUDE=part.ini\nNAME=alpha\n",
    );
    assert_eq!(parser.to_ini(), "[PART]\nWHO=alpha\n\n");
}

#[test]
fn test_include_fingerprint_dedupe() {
    let main = "\
[INCLUDE]
INCLUDE=part.ini
NAME=alpha
[INCLUDE]
INCLUDE=part.ini
NAME=alpha
[INCLUDE]
INCLUDE=part.ini
NAME=beta
";
    let parser = expand_with(&[("part.ini", "[S_...]\nWHO=$NAME\n")], main);
    assert_eq!(
        parser.to_ini(),
        "[S_0]\nWHO=alpha\n\n[S_1]\nWHO=beta\n\n"
    );
}

#[test]
fn test_include_same_file_without_params_once() {
    let main = "[INCLUDE]\nINCLUDE=part.ini\n[INCLUDE]\nINCLUDE=part.ini\n";
    let parser = expand_with(&[("part.ini", "[P_...]\nK=1\n")], main);
    assert_eq!(parser.to_ini(), "[P_0]\nK=1\n\n");
}

#[test]
fn test_legacy_var_include_parameter() {
    let parser = expand_with(
        &[("part.ini", "[PART]\nWHO=$NAME\n")],
        "[INCLUDE]\nINCLUDE=part.ini\nVAR1=NAME,gamma\n",
    );
    assert_eq!(parser.to_ini(), "[PART]\nWHO=gamma\n\n");
}

#[test]
fn test_nested_includes() {
    let parser = expand_with(
        &[
            ("outer.ini", "[OUTER]\nK=1\n[INCLUDE]\nINCLUDE=inner.ini\n"),
            ("inner.ini", "[INNER]\nK=2\n"),
        ],
        "[INCLUDE]\nINCLUDE=outer.ini\n",
    );
    assert_eq!(parser.to_ini(), "[INNER]\nK=2\n\n[OUTER]\nK=1\n\n");
}

#[test]
fn test_missing_include_warns() {
    let parser = expand_with(&[], "[INCLUDE]\nINCLUDE=absent.ini\n[S]\nK=1\n");
    assert_eq!(parser.to_ini(), "[S]\nK=1\n\n");
    assert_eq!(parser.warnings(), 0);
    // The reference never resolves, so nothing was read and nothing emitted
    // for it; a resolvable-but-empty file warns instead.
    let parser = expand_with(&[("empty.ini", "")], "[INCLUDE]\nINCLUDE=empty.ini\n");
    assert_eq!(parser.to_ini(), "");
    assert!(parser.warnings() > 0);
}

#[test]
fn test_includes_disabled() {
    let mut parser = IniParser::new()
        .with_reader(MapReader::new(&[("part.ini", "[PART]\nK=1\n")]))
        .allow_includes(false);
    parser.parse("[INCLUDE]\nINCLUDE=part.ini\n[S]\nK=2\n").finalize();
    assert_eq!(parser.to_ini(), "[S]\nK=2\n\n");
}

#[test]
fn test_defaults_cross_include_boundary() {
    let parser = expand_with(
        &[("part.ini", "[PART]\nK=$BASE\n")],
        "[DEFAULTS]\nBASE=7\n[INCLUDE]\nINCLUDE=part.ini\n",
    );
    assert_eq!(parser.to_ini(), "[PART]\nK=7\n\n");
}

#[test]
fn test_include_from_search_directory_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("disk.ini"), "[DISK]\nOK=1\n").expect("write");

    let mut parser = IniParser::with_search_dirs(vec![dir.path().to_path_buf()]);
    parser.parse("[INCLUDE]\nINCLUDE=disk.ini\n").finalize();
    assert_eq!(parser.to_ini(), "[DISK]\nOK=1\n\n");
}

#[test]
fn test_include_relative_to_including_file_on_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sub = dir.path().join("nested");
    fs::create_dir(&sub).expect("mkdir");
    fs::write(sub.join("main.ini"), "[INCLUDE]\nINCLUDE=part.ini\n[M]\nK=1\n")
        .expect("write");
    fs::write(sub.join("part.ini"), "[P]\nK=2\n").expect("write");

    let mut parser = IniParser::new();
    parser.parse_file(sub.join("main.ini")).finalize();
    assert_eq!(parser.to_ini(), "[M]\nK=1\n\n[P]\nK=2\n\n");
}
