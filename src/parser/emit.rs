//! INI and JSON emission.
//!
//! Sections and keys print in natural order: digit runs compare by value,
//! everything else byte-wise, so `ROW_10` follows `ROW_2`. Pieces are
//! quoted only when they contain characters outside the safe set.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::section::ResultingSection;
use super::split::is_solid;
use super::value::Value;

/// Injected knobs for serialization. Filters drop entries, order hooks
/// rank them before the natural comparison kicks in.
#[allow(clippy::type_complexity)]
#[derive(Default)]
pub struct SerializerParams {
    /// Widens the set of characters allowed outside quotes when false.
    pub minimal_quotes: bool,
    pub section_filter: Option<Box<dyn Fn(&str, &ResultingSection) -> bool>>,
    pub value_filter: Option<Box<dyn Fn(&str, &Value) -> bool>>,
    pub section_order: Option<Box<dyn Fn(&str, &ResultingSection) -> i32>>,
    pub value_order: Option<Box<dyn Fn(&str, &Value) -> i32>>,
}

/// Compares with digit runs taken numerically.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ab = a.as_bytes();
    let bb = b.as_bytes();
    let mut i = 0;
    let mut j = 0;
    while i < ab.len() && j < bb.len() {
        if ab[i].is_ascii_digit() && bb[j].is_ascii_digit() {
            let si = i;
            while i < ab.len() && ab[i].is_ascii_digit() {
                i += 1;
            }
            let sj = j;
            while j < bb.len() && bb[j].is_ascii_digit() {
                j += 1;
            }
            let na = a[si..i].trim_start_matches('0');
            let nb = b[sj..j].trim_start_matches('0');
            let ord = na.len().cmp(&nb.len()).then_with(|| na.cmp(nb));
            if ord != Ordering::Equal {
                return ord;
            }
        } else {
            let ord = ab[i].cmp(&bb[j]);
            if ord != Ordering::Equal {
                return ord;
            }
            i += 1;
            j += 1;
        }
    }
    (ab.len() - i).cmp(&(bb.len() - j))
}

fn char_allowed(c: char, minimal: bool) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '_' | '-' | '.')
        || (minimal
            && matches!(
                c,
                '(' | ')'
                    | ' '
                    | ':'
                    | '+'
                    | ','
                    | '~'
                    | '!'
                    | '@'
                    | '#'
                    | '$'
                    | '%'
                    | '*'
                    | '?'
                    | '{'
                    | '}'
                    | '`'
                    | '&'
                    | ';'
                    | '<'
                    | '>'
            ))
}

pub(crate) fn needs_quotes(s: &str, minimal: bool) -> bool {
    if s.is_empty() {
        return false;
    }
    if s.starts_with(|c: char| c.is_whitespace()) || s.ends_with(|c: char| c.is_whitespace()) {
        return true;
    }
    s.chars().any(|c| !char_allowed(c, minimal))
}

fn write_piece(out: &mut String, piece: &str, minimal: bool) {
    // Solid values survive re-parsing verbatim; quoting would only bloat.
    if is_solid(piece) || !needs_quotes(piece, minimal) {
        out.push_str(piece);
        return;
    }
    out.push('"');
    for c in piece.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('"');
}

fn ordered_keys<'a>(
    section: &'a ResultingSection,
    params: &SerializerParams,
) -> Vec<(&'a String, &'a Value)> {
    let mut items: Vec<(&String, &Value)> = section
        .iter()
        .filter(|(k, v)| params.value_filter.as_ref().is_none_or(|f| f(k, v)))
        .collect();
    items.sort_by(|(ka, va), (kb, vb)| {
        let ra = params.value_order.as_ref().map_or(0, |f| f(ka, va));
        let rb = params.value_order.as_ref().map_or(0, |f| f(kb, vb));
        ra.cmp(&rb).then_with(|| natural_cmp(ka, kb))
    });
    items
}

fn write_section_body(out: &mut String, section: &ResultingSection, params: &SerializerParams) {
    let minimal = params.minimal_quotes;
    for (key, value) in ordered_keys(section, params) {
        out.push_str(key);
        out.push('=');
        for (i, piece) in value.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_piece(out, piece, minimal);
        }
        out.push('\n');
    }
}

pub(crate) fn sections_to_ini(
    sections: &HashMap<String, ResultingSection>,
    params: &SerializerParams,
) -> String {
    let mut out = String::new();

    if let Some(untitled) = sections.get("") {
        write_section_body(&mut out, untitled, params);
        out.push('\n');
    }

    let mut named: Vec<(&String, &ResultingSection)> = sections
        .iter()
        .filter(|(name, _)| !name.is_empty())
        .filter(|(name, body)| params.section_filter.as_ref().is_none_or(|f| f(name, body)))
        .collect();
    named.sort_by(|(na, sa), (nb, sb)| {
        let ra = params.section_order.as_ref().map_or(0, |f| f(na, sa));
        let rb = params.section_order.as_ref().map_or(0, |f| f(nb, sb));
        ra.cmp(&rb).then_with(|| natural_cmp(na, nb))
    });

    for (name, body) in named {
        out.push('[');
        out.push_str(name);
        out.push_str("]\n");
        write_section_body(&mut out, body, params);
        out.push('\n');
    }

    out
}

pub(crate) fn sections_to_json(
    sections: &HashMap<String, ResultingSection>,
    pretty: bool,
    params: &SerializerParams,
) -> String {
    let mut names: Vec<(&String, &ResultingSection)> = sections
        .iter()
        .filter(|(name, body)| {
            name.is_empty() || params.section_filter.as_ref().is_none_or(|f| f(name, body))
        })
        .collect();
    names.sort_by(|(na, _), (nb, _)| natural_cmp(na, nb));

    let mut root = serde_json::Map::new();
    for (name, body) in names {
        let mut obj = serde_json::Map::new();
        for (key, value) in ordered_keys(body, params) {
            let pieces: Vec<serde_json::Value> = value
                .iter()
                .map(|p| serde_json::Value::String(p.to_string()))
                .collect();
            obj.insert(key.clone(), serde_json::Value::Array(pieces));
        }
        root.insert(name.clone(), serde_json::Value::Object(obj));
    }

    let value = serde_json::Value::Object(root);
    let mut text = if pretty {
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    } else {
        serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
    };
    text.push('\n');
    text
}
