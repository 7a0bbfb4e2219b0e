use inipp::IniParser;

fn expand(input: &str) -> IniParser {
    let mut parser = IniParser::new();
    parser.parse(input).finalize();
    parser
}

fn expand_ini(input: &str) -> String {
    expand(input).to_ini()
}

#[test]
fn test_basic_substitution() {
    let input = "[DEFAULTS]\nSIZE=2.5\n[CAR]\nNAME=\"Fast $SIZE m\"\n";
    assert_eq!(expand_ini(input), "[CAR]\nNAME=\"Fast 2.5 m\"\n\n");
}

#[test]
fn test_template_inheritance_with_parameter() {
    let input = "\
[TEMPLATE: Base]
COLOR=$C
[TEMPLATE: Red extends Base]
C=red
[OBJ: Red]
";
    assert_eq!(expand_ini(input), "[OBJ]\nCOLOR=red\n\n");
}

#[test]
fn test_parametrized_slicing() {
    let input = "\
[A]
LIST=10,20,30,40
COUNT=${LIST:size}
LAST=${LIST:-1}
XY=${LIST:1:2:vec2}
";
    assert_eq!(expand_ini(input), "[A]\nCOUNT=4\nLAST=40\nXY=10,20\n\n");
}

#[test]
fn test_generator() {
    let input = "\
[TEMPLATE: Row]
@OUTPUT=ROW_$1
VAL=$1
[@GENERATOR=Row, 3]
";
    assert_eq!(
        expand_ini(input),
        "[ROW_1]\nVAL=1\n\n[ROW_2]\nVAL=2\n\n[ROW_3]\nVAL=3\n\n"
    );
}

#[test]
fn test_expression_with_vec() {
    let input = "[A]\nP=1,2,3\nQ=$\"P * 2\"\n";
    assert_eq!(expand_ini(input), "[A]\nP=1,2,3\nQ=2,4,6\n\n");
}

#[test]
fn test_untitled_section_comes_first() {
    let input = "TOP=1\n[S]\nK=2\n";
    assert_eq!(expand_ini(input), "TOP=1\n\n[S]\nK=2\n\n");
}

#[test]
fn test_comments_and_blank_lines() {
    let input = "; header comment\n[S]\nK=1 // trailing\n\nL=2 ; also trailing\n";
    assert_eq!(expand_ini(input), "[S]\nK=1\nL=2\n\n");
}

#[test]
fn test_natural_section_and_key_order() {
    let input = "[ROW_10]\nA=1\n[ROW_2]\nA=1\n[ROW_1]\nK10=a\nK2=b\n";
    assert_eq!(
        expand_ini(input),
        "[ROW_1]\nK2=b\nK10=a\n\n[ROW_2]\nA=1\n\n[ROW_10]\nA=1\n\n"
    );
}

#[test]
fn test_first_listed_template_wins() {
    let input = "\
[TEMPLATE: T1]
K=one
[TEMPLATE: T2]
K=two
L=extra
[S: T1, T2]
";
    assert_eq!(expand_ini(input), "[S]\nK=one\nL=extra\n\n");
}

#[test]
fn test_section_value_beats_template() {
    let input = "\
[TEMPLATE: T]
K=from-template
[S: T]
K=mine
";
    assert_eq!(expand_ini(input), "[S]\nK=mine\n\n");
}

#[test]
fn test_scope_precedence_section_over_defaults() {
    let input = "\
[DEFAULTS]
X=default
[S]
X=section
Y=$X
";
    // The referenced helper key is erased from the finished section.
    assert_eq!(expand_ini(input), "[S]\nY=section\n\n");
}

#[test]
fn test_erase_referenced_can_be_disabled() {
    let mut parser = IniParser::new().erase_referenced(false);
    parser.parse("[S]\nX=5\nY=$X\n").finalize();
    assert_eq!(parser.to_ini(), "[S]\nX=5\nY=5\n\n");
}

#[test]
fn test_erase_referenced_toggle_from_input() {
    let input = "[@INIPP]\n@ERASE_REFERENCED=0\n[S]\nX=5\nY=$X\n";
    assert_eq!(expand_ini(input), "[S]\nX=5\nY=5\n\n");
}

#[test]
fn test_sequential_sections_skip_reserved_indices() {
    let input = "\
[ITEM_1]
A=explicit
[ITEM_...]
B=first
[ITEM_...]
C=second
";
    assert_eq!(
        expand_ini(input),
        "[ITEM_0]\nB=first\n\n[ITEM_1]\nA=explicit\n\n[ITEM_2]\nC=second\n\n"
    );
}

#[test]
fn test_duplicate_sections_merge_later_wins() {
    let input = "[S]\nA=1\nB=2\n[S]\nB=3\nC=4\n";
    assert_eq!(expand_ini(input), "[S]\nA=1\nB=3\nC=4\n\n");
}

#[test]
fn test_multi_section_header() {
    let input = "[A, B]\nK=1\n";
    assert_eq!(expand_ini(input), "[A]\nK=1\n\n[B]\nK=1\n\n");
}

#[test]
fn test_inactive_section_becomes_stub() {
    let input = "[S]\nACTIVE=0\nK=1\n";
    assert_eq!(expand_ini(input), "[S]\nACTIVE=0\n\n");
}

#[test]
fn test_inactive_section_dropped_in_ignore_mode() {
    let mut parser = IniParser::new().ignore_inactive(true);
    parser.parse("[S]\nACTIVE=0\nK=1\n[T]\nK=2\n").finalize();
    assert_eq!(parser.to_ini(), "[T]\nK=2\n\n");
}

#[test]
fn test_active_true_section_is_kept() {
    let input = "[S]\nACTIVE=1\nK=1\n";
    assert_eq!(expand_ini(input), "[S]\nACTIVE=1\nK=1\n\n");
}

#[test]
fn test_missing_variable_round_trips() {
    let parser = expand("[S]\nK=$NOPE\n");
    assert_eq!(parser.to_ini(), "[S]\nK=$NOPE\n\n");
    assert!(parser.warnings() > 0);
}

#[test]
fn test_missing_variable_mid_string() {
    let parser = expand("[S]\nK=pre_$NOPE.post\n");
    assert_eq!(parser.to_ini(), "[S]\nK=pre_$NOPE.post\n\n");
}

#[test]
fn test_required_variable_drops_key() {
    let parser = expand("[S]\nK=${NOPE:required}\nL=1\n");
    assert_eq!(parser.to_ini(), "[S]\nL=1\n\n");
}

#[test]
fn test_or_default_fills_missing() {
    let input = "[S]\nK=${NOPE:or=fallback}\n";
    assert_eq!(expand_ini(input), "[S]\nK=fallback\n\n");
}

#[test]
fn test_exists_and_count_modes() {
    let input = "\
[S]
LIST=a,b,c
HAS=${LIST:exists}
NONE=${GONE:exists}
N=${LIST:count}
";
    assert_eq!(expand_ini(input), "[S]\nHAS=1\nN=3\nNONE=0\n\n");
}

#[test]
fn test_component_modes() {
    let input = "[S]\nPOS=4,5,6\nX=${POS:x}\nZ=${POS:z}\n";
    assert_eq!(expand_ini(input), "[S]\nX=4\nZ=6\n\n");
}

#[test]
fn test_string_and_bool_modes() {
    let input = "[S]\nV=1\nB=${V:bool}\nS=${V:str}\n";
    assert_eq!(expand_ini(input), "[S]\nB=true\nS=1\n\n");
}

#[test]
fn test_mixin_with_inline_parameters() {
    let input = "\
[MIXIN: Glow]
INTENSITY=$LEVEL
KIND=glow
[S]
@MIXIN=Glow, LEVEL=7
";
    assert_eq!(expand_ini(input), "[S]\nINTENSITY=7\nKIND=glow\n\n");
}

#[test]
fn test_mixin_chain_through_extends() {
    let input = "\
[MIXIN: Base]
A=base
[MIXIN: Extra extends Base]
B=extra
[S]
@MIXIN=Extra
";
    assert_eq!(expand_ini(input), "[S]\nA=base\nB=extra\n\n");
}

#[test]
fn test_output_names_anonymous_section() {
    let input = "\
[TEMPLATE: T]
@OUTPUT=GENERATED
K=1
[: T]
";
    assert_eq!(expand_ini(input), "[GENERATED]\nK=1\n\n");
}

#[test]
fn test_target_variable() {
    let input = "\
[TEMPLATE: T]
NAME=$TARGET
[S: T]
";
    assert_eq!(expand_ini(input), "[S]\nNAME=S\n\n");
}

#[test]
fn test_early_resolve_template_is_overridable() {
    let input = "\
[TEMPLATE: E earlyresolve]
K=tpl
L=2
[E]
K=section
";
    assert_eq!(expand_ini(input), "[E]\nK=section\nL=2\n\n");
}

#[test]
fn test_template_active_gate() {
    let input = "\
[TEMPLATE: Off]
@ACTIVE=0
K=never
[TEMPLATE: On]
@ACTIVE=1
L=yes
[S: Off, On]
";
    assert_eq!(expand_ini(input), "[S]\nL=yes\n\n");
}

#[test]
fn test_generator_with_two_dimensions() {
    let input = "\
[TEMPLATE: Cell]
@OUTPUT=CELL_$1_$2
V=$1,$2
[@GENERATOR=Cell, 2, 2]
";
    assert_eq!(
        expand_ini(input),
        "[CELL_1_1]\nV=1,1\n\n[CELL_1_2]\nV=1,2\n\n[CELL_2_1]\nV=2,1\n\n[CELL_2_2]\nV=2,2\n\n"
    );
}

#[test]
fn test_generator_starting_index() {
    let input = "\
[TEMPLATE: Row]
@OUTPUT=ROW_$1
@GENERATOR_STARTING_INDEX=0
VAL=$1
[@GENERATOR=Row, 2]
";
    assert_eq!(expand_ini(input), "[ROW_0]\nVAL=0\n\n[ROW_1]\nVAL=1\n\n");
}

#[test]
fn test_generator_from_section_key() {
    let input = "\
[TEMPLATE: Light]
@OUTPUT=LIGHT_$1
POWER=$P
[SETUP]
@GENERATOR=Light, 2, P=9
";
    assert_eq!(
        expand_ini(input),
        "[LIGHT_1]\nPOWER=9\n\n[LIGHT_2]\nPOWER=9\n\n"
    );
}

#[test]
fn test_quoting_in_output() {
    let input = "[S]\nA=\"a,b\"\nB=plain_1.5\nC=\"with space\"\n";
    assert_eq!(
        expand_ini(input),
        "[S]\nA=\"a,b\"\nB=plain_1.5\nC=\"with space\"\n\n"
    );
}

#[test]
fn test_escapes_round_trip() {
    let input = "[S]\nK=\"line1\\nline2\"\n";
    assert_eq!(expand_ini(input), "[S]\nK=\"line1\\nline2\"\n\n");
}

#[test]
fn test_solid_value_passthrough() {
    let input = "[S]\nIMG=data:image/png;base64,AAAA,BB=CC\n";
    assert_eq!(expand_ini(input), "[S]\nIMG=data:image/png;base64,AAAA,BB=CC\n\n");
}

#[test]
fn test_line_continuation() {
    let input = "[S]\nK=a,\\\nb\n";
    assert_eq!(expand_ini(input), "[S]\nK=a,b\n\n");
}

#[test]
fn test_single_quoted_dollar_stays_literal() {
    let parser = expand("[S]\nK='$'\n");
    assert_eq!(parser.to_ini(), "[S]\nK=\"$\"\n\n");
    assert_eq!(parser.warnings(), 0);
}

#[test]
fn test_dynamic_key() {
    let input = "[S]\nN=SPEED\n${N}=80\n";
    assert_eq!(expand_ini(input), "[S]\nSPEED=80\n\n");
}

#[test]
fn test_legacy_var_defaults() {
    let input = "[DEFAULTS]\nVAR1=GREETING,hello\n[S]\nK=$GREETING\n";
    assert_eq!(expand_ini(input), "[S]\nK=hello\n\n");
}

#[test]
fn test_defaults_referencing_defaults() {
    let input = "[DEFAULTS]\nBASE=10\nDOUBLED=$BASE$BASE\n[S]\nK=$DOUBLED\n";
    assert_eq!(expand_ini(input), "[S]\nK=1010\n\n");
}

#[test]
fn test_json_output() {
    let parser = expand("[S]\nK=1,2\n");
    assert_eq!(parser.to_json(false), "{\"S\":{\"K\":[\"1\",\"2\"]}}\n");
}

#[test]
fn test_json_pretty_output() {
    let parser = expand("[S]\nK=1\n");
    let pretty = parser.to_json(true);
    assert!(pretty.starts_with("{\n"));
    assert!(pretty.contains("  \"S\""));
}

#[test]
fn test_json_natural_order() {
    let parser = expand("[B_10]\nK=1\n[B_2]\nK=1\n");
    let json = parser.to_json(false);
    let b2 = json.find("B_2").unwrap();
    let b10 = json.find("B_10").unwrap();
    assert!(b2 < b10);
}

#[test]
fn test_determinism() {
    let input = "\
[DEFAULTS]
N=3
[TEMPLATE: Row]
@OUTPUT=ROW_$1
VAL=$\"1 * 10\"
[@GENERATOR=Row, 2]
[S]
K=$N
";
    let a = expand_ini(input);
    let b = expand_ini(input);
    assert_eq!(a, b);
    let ja = expand(input).to_json(true);
    let jb = expand(input).to_json(true);
    assert_eq!(ja, jb);
}

#[test]
fn test_sequential_keys_in_section() {
    let input = "[S]\nLINE_...=a\nLINE_...=b\nLINE_1=c\n";
    assert_eq!(expand_ini(input), "[S]\nLINE_0=a\nLINE_1=c\nLINE_2=b\n\n");
}

#[test]
fn test_empty_input_produces_nothing() {
    assert_eq!(expand_ini(""), "");
    assert_eq!(expand("").to_json(false), "{}\n");
}

#[test]
fn test_empty_value() {
    let input = "[S]\nK=\n";
    assert_eq!(expand_ini(input), "[S]\nK=\n\n");
}
