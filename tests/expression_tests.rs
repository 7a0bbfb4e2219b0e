use std::path::Path;

use inipp::{DataProvider, IniParser, Reader};

fn expand_ini(input: &str) -> String {
    let mut parser = IniParser::new();
    parser.parse(input).finalize();
    parser.to_ini()
}

#[test]
fn test_arithmetic() {
    assert_eq!(expand_ini("[S]\nK=$\"1 + 2\"\n"), "[S]\nK=3\n\n");
    assert_eq!(expand_ini("[S]\nK=$\"2 ^ 10\"\n"), "[S]\nK=1024\n\n");
}

#[test]
fn test_math_aliases() {
    assert_eq!(expand_ini("[S]\nK=$\"floor(pi)\"\n"), "[S]\nK=3\n\n");
    assert_eq!(expand_ini("[S]\nK=$\"max(2, 7, 4)\"\n"), "[S]\nK=7\n\n");
}

#[test]
fn test_string_result() {
    assert_eq!(
        expand_ini("[S]\nK=$\"'a' .. 'b'\"\n"),
        "[S]\nK=ab\n\n"
    );
}

#[test]
fn test_table_result_has_piece_per_element() {
    assert_eq!(
        expand_ini("[S]\nK=$\"{10, 20, 30}\"\n"),
        "[S]\nK=10,20,30\n\n"
    );
}

#[test]
fn test_nil_result_suppresses_piece() {
    assert_eq!(expand_ini("[S]\nK=$\"nil\"\nL=1\n"), "[S]\nK=\nL=1\n\n");
}

#[test]
fn test_boolean_result() {
    assert_eq!(expand_ini("[S]\nK=$\"2 > 1\"\n"), "[S]\nK=1\n\n");
}

#[test]
fn test_vector_scaling() {
    assert_eq!(
        expand_ini("[S]\nP=1,2\nQ=$\"P * 3\"\n"),
        "[S]\nP=1,2\nQ=3,6\n\n"
    );
}

#[test]
fn test_vector_component_access() {
    assert_eq!(
        expand_ini("[S]\nP=4,5,6\nQ=$\"P.y\"\n"),
        "[S]\nP=4,5,6\nQ=5\n\n"
    );
}

#[test]
fn test_vector_dot() {
    assert_eq!(
        expand_ini("[S]\nA=1,2,3\nB=4,5,6\nD=$\"dot(A, B)\"\n"),
        "[S]\nA=1,2,3\nB=4,5,6\nD=32\n\n"
    );
}

#[test]
fn test_dollar_reference_inside_expression() {
    assert_eq!(
        expand_ini("[DEFAULTS]\nN=5\n[S]\nK=$\"$N * 2\"\n"),
        "[S]\nK=10\n\n"
    );
}

#[test]
fn test_statement_body_fallback() {
    assert_eq!(
        expand_ini("[S]\nK=$\"local x = 4 return x + 1\"\n"),
        "[S]\nK=5\n\n"
    );
}

#[test]
fn test_runtime_error_reports_and_keeps_key() {
    let mut parser = IniParser::new();
    parser.parse("[S]\nK=$\"error('boom')\"\nL=1\n").finalize();
    assert_eq!(parser.to_ini(), "[S]\nK=\nL=1\n\n");
    assert!(parser.errors() > 0);
}

#[test]
fn test_discard_error_drops_key_silently() {
    let mut parser = IniParser::new();
    parser
        .parse("[S]\nK=$\"error('__discardError__')\"\nL=1\n")
        .finalize();
    assert_eq!(parser.to_ini(), "[S]\nL=1\n\n");
    assert_eq!(parser.errors(), 0);
}

#[test]
fn test_syntax_error_reports_and_drops() {
    let mut parser = IniParser::new();
    parser.parse("[S]\nK=$\"((\"\nL=1\n").finalize();
    assert_eq!(parser.to_ini(), "[S]\nL=1\n\n");
    assert!(parser.errors() > 0);
}

#[test]
fn test_expressions_disabled() {
    let mut parser = IniParser::new().allow_expressions(false);
    parser.parse("[S]\nK=$\"1 + 2\"\n").finalize();
    assert_eq!(parser.to_ini(), "[S]\nK=\n\n");
}

#[test]
fn test_user_function() {
    let input = "\
[FUNCTION: double]
ARGUMENTS=x
CODE=\"return x * 2\"
[S]
K=$\"double(21)\"
";
    assert_eq!(expand_ini(input), "[S]\nK=42\n\n");
}

#[test]
fn test_function_with_multiple_arguments() {
    let input = "\
[FUNCTION: area]
ARGUMENTS=w,h
CODE=\"return w * h\"
[S]
K=$\"area(6, 7)\"
";
    assert_eq!(expand_ini(input), "[S]\nK=42\n\n");
}

#[test]
fn test_reflection_get() {
    let input = "\
[FIRST]
K=5
[SECOND]
X=$\"get('FIRST', 'K', 0) + 1\"
";
    assert_eq!(
        expand_ini(input),
        "[FIRST]\nK=5\n\n[SECOND]\nX=6\n\n"
    );
}

#[test]
fn test_reflection_has_with_wildcards() {
    let input = "\
[LIGHT_REAR]
COLOR=red
[S]
A=$\"has('LIGHT_?') and 1 or 0\"
B=$\"has('SPOT_?') and 1 or 0\"
C=$\"has('?_REAR', 'COLOR', 'red') and 1 or 0\"
";
    assert_eq!(
        expand_ini(input),
        "[LIGHT_REAR]\nCOLOR=red\n\n[S]\nA=1\nB=0\nC=1\n\n"
    );
}

#[test]
fn test_reflection_set_mutates_earlier_section() {
    let input = "\
[FIRST]
K=5
[SECOND]
N=$\"set('FIRST', 'K', 9)\"
";
    assert_eq!(
        expand_ini(input),
        "[FIRST]\nK=9\n\n[SECOND]\nN=1\n\n"
    );
}

#[test]
fn test_reflection_set_inserts_new_entry() {
    let input = "\
[FIRST]
K=5
[SECOND]
N=$\"set('FIRST', 'EXTRA', 3)\"
";
    assert_eq!(
        expand_ini(input),
        "[FIRST]\nEXTRA=3\nK=5\n\n[SECOND]\nN=1\n\n"
    );
}

#[test]
fn test_reflection_set_empty_erases() {
    let input = "\
[FIRST]
K=5
L=6
[SECOND]
N=$\"set('FIRST', 'K', nil)\"
";
    assert_eq!(
        expand_ini(input),
        "[FIRST]\nL=6\n\n[SECOND]\nN=1\n\n"
    );
}

struct FixedProvider;

impl DataProvider for FixedProvider {
    fn read_number(&self, key: &str) -> Option<f64> {
        (key == "speed").then_some(88.0)
    }

    fn read_string(&self, key: &str) -> Option<String> {
        (key == "driver").then(|| "ayrton".to_string())
    }

    fn read_bool(&self, key: &str) -> Option<bool> {
        (key == "night").then_some(true)
    }
}

#[test]
fn test_data_provider_read() {
    let mut parser = IniParser::new().with_data_provider(FixedProvider);
    parser
        .parse("[S]\nA=$\"read('speed', 0)\"\nB=$\"read('driver')\"\nC=$\"read('night', false)\"\n")
        .finalize();
    assert_eq!(parser.to_ini(), "[S]\nA=88\nB=ayrton\nC=1\n\n");
}

#[test]
fn test_read_without_provider_reports_error() {
    let mut parser = IniParser::new();
    parser.parse("[S]\nK=$\"read('speed', 0)\"\n").finalize();
    assert!(parser.errors() > 0);
}

struct ScriptReader;

impl Reader for ScriptReader {
    fn read(&self, path: &Path) -> String {
        if path.ends_with("util.lua") {
            "function triple(x)\n  return x * 3\nend\n".to_string()
        } else {
            String::new()
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.ends_with("util.lua")
    }
}

#[test]
fn test_use_loads_script_file() {
    let mut parser = IniParser::new().with_reader(ScriptReader);
    parser
        .parse("[USE: util.lua]\n[S]\nK=$\"triple(7)\"\n")
        .finalize();
    assert_eq!(parser.to_ini(), "[S]\nK=21\n\n");
}
