//! Variable substitution.
//!
//! Pieces coming out of the splitter may reference variables as a whole
//! (`$Name`), in the middle of a string (`…${Name}…`, `…$Name…`), or with
//! slicing and projection parameters (`${Name:from:to:mode:flag}`). The
//! substitutor resolves them against a scope, defers unresolved names with
//! the missing-variable marker, and hands expression pieces to the bridge.

use memchr::memchr;

use super::ParserData;
use super::scope::ScopeId;
use super::split::{
    MARKER_CALC, MARKER_END, MARKER_MISSING, split_quoted, wrap_missing,
};
use super::value::{Value, fmt_f64, is_number, parse_bool};

const RANGE_LIMIT: i32 = 10_000;
const MAX_DEPTH: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpecialMode {
    None,
    Size,
    Length,
    Exists,
    Vec2,
    Vec3,
    Vec4,
    X,
    Y,
    Z,
    W,
    Number,
    Boolean,
    Str,
}

#[derive(Debug, Clone)]
pub(crate) struct VariableRef {
    pub name: String,
    pub default_value: String,
    pub from: i32,
    pub to: i32,
    /// Simple `$Name` references defer as a missing-marker when unresolved;
    /// parametrized ones warn instead.
    pub with_fallback: bool,
    pub required: bool,
    pub mode: SpecialMode,
}

/// Destination of substituted pieces plus bookkeeping shared down the
/// recursion.
pub(crate) struct SubstSink<'a> {
    pub key: &'a str,
    pub out: &'a mut Value,
    /// When set, finished pieces get their markers unwrapped and expression
    /// pieces evaluated; intermediate recursion keeps pieces raw.
    pub process: bool,
    pub refs: Option<&'a mut Vec<String>>,
}

pub(crate) fn is_identifier(s: &str, allow_leading_digit: bool) -> bool {
    if s.is_empty() {
        return false;
    }
    let b = s.as_bytes();
    if !allow_leading_digit && b[0].is_ascii_digit() {
        return false;
    }
    b.iter().all(|&c| c == b'_' || c.is_ascii_alphanumeric())
}

fn full_int(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return i32::from_str_radix(hex, 16).ok();
    }
    s.parse().ok()
}

/// Wraps a piece as a Lua string literal.
fn quote_script_string(s: &str) -> String {
    let mut r = String::with_capacity(s.len() + 2);
    r.push('"');
    for c in s.chars() {
        match c {
            '\n' => r.push_str("\\n"),
            '\r' => r.push_str("\\r"),
            '\t' => r.push_str("\\t"),
            '\u{8}' => r.push_str("\\b"),
            '"' | '\\' => {
                r.push('\\');
                r.push(c);
            }
            _ => r.push(c),
        }
    }
    r.push('"');
    r
}

fn script_piece(s: &str) -> String {
    if is_number(s) {
        s.to_string()
    } else {
        quote_script_string(s)
    }
}

/// Renders resolved pieces as a Lua literal: number, `vecN(…)`, or a table.
pub(crate) fn script_literal(pieces: &[String]) -> String {
    match pieces.len() {
        0 => "nil".to_string(),
        1 => {
            if pieces[0].is_empty() {
                "nil".to_string()
            } else {
                script_piece(&pieces[0])
            }
        }
        n @ 2..=4 if pieces.iter().all(|p| is_number(p)) => {
            let mut s = format!("vec{n}(");
            for (i, p) in pieces.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                s.push_str(p.trim());
            }
            s.push(')');
            s
        }
        _ => {
            let mut s = String::from("{");
            for (i, p) in pieces.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                s.push_str(&script_piece(p));
            }
            s.push('}');
            s
        }
    }
}

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function",
    "if", "in", "local", "nil", "not", "or", "repeat", "return", "then",
    "true", "until", "while",
];

impl ParserData {
    /// Splits a raw value and substitutes it, unless the surrounding context
    /// defers substitution (template bodies, `[DEFAULTS]`, `[INCLUDE]`).
    /// Returns false when the enclosing key must be dropped.
    pub(crate) fn split_and_substitute(
        &mut self,
        key: &str,
        delayed: bool,
        value: &str,
        scope: ScopeId,
        refs: &mut Vec<String>,
        out: &mut Value,
    ) -> bool {
        let split = split_quoted(value, key.starts_with('@'));
        if delayed {
            *out = split;
            return true;
        }
        self.substitute_value(key, &split, scope, refs, out)
    }

    /// Substitutes every piece of `value` into `out`. Inline-parameter
    /// pieces of `@`-keys are passed through untouched so they can bind
    /// variables later at application time.
    pub(crate) fn substitute_value(
        &mut self,
        key: &str,
        value: &Value,
        scope: ScopeId,
        refs: &mut Vec<String>,
        out: &mut Value,
    ) -> bool {
        let mut include_value = true;
        for i in 0..value.len() {
            let piece = value.at(i).to_string();
            if !out.is_empty() && is_inline_param(key, &piece) {
                out.push(piece);
            } else {
                let mut sink = SubstSink {
                    key,
                    out: &mut *out,
                    process: true,
                    refs: Some(&mut *refs),
                };
                self.substitute_piece(&piece, scope, &mut include_value, &mut sink, 0);
            }
        }
        include_value
    }

    pub(crate) fn substitute_piece(
        &mut self,
        value: &str,
        scope: ScopeId,
        include_value: &mut bool,
        sink: &mut SubstSink<'_>,
        depth: u32,
    ) {
        if depth < MAX_DEPTH {
            // Whole-piece reference.
            if let Some(var) = self.check_variable(value) {
                if let Some(refs) = sink.refs.as_mut() {
                    refs.push(var.name.clone());
                }
                let mut temp = Value::new();
                {
                    let mut sub = SubstSink {
                        key: sink.key,
                        out: &mut temp,
                        process: false,
                        refs: None,
                    };
                    self.substitute_var_whole(&var, scope, include_value, &mut sub);
                }
                let pieces: Vec<String> = temp.iter().map(str::to_string).collect();
                for p in pieces {
                    self.substitute_piece(&p, scope, include_value, sink, depth + 1);
                }
                return;
            }

            let expr_mode = value.starts_with(MARKER_CALC);

            // Mid-string `${…}`.
            if let Some(begin) = value.find("${") {
                if let Some(end_rel) = value[begin..].find('}') {
                    let end = begin + end_rel;
                    let var = self
                        .check_variable(&value[begin..=end])
                        .unwrap_or_else(VariableRef::invalid);
                    if !var.name.is_empty() && !expr_mode {
                        if let Some(refs) = sink.refs.as_mut() {
                            refs.push(var.name.clone());
                        }
                    }
                    let prefix = value[..begin].to_string();
                    let postfix = value[end + 1..].to_string();
                    let mut temp = Value::new();
                    {
                        let mut sub = SubstSink {
                            key: sink.key,
                            out: &mut temp,
                            process: false,
                            refs: None,
                        };
                        self.substitute_var_mid(
                            &var, &prefix, &postfix, scope, include_value, &mut sub, expr_mode,
                        );
                    }
                    let pieces: Vec<String> = temp.iter().map(str::to_string).collect();
                    for p in pieces {
                        self.substitute_piece(&p, scope, include_value, sink, depth + 1);
                    }
                    return;
                }
            }

            // Mid-string `$Name`.
            if let Some(begin) = find_dollar_name(value) {
                let bytes = value.as_bytes();
                let mut end = begin + 1;
                while end < bytes.len()
                    && (bytes[end] == b'_' || bytes[end].is_ascii_alphanumeric())
                {
                    end += 1;
                }
                if end > begin + 1 {
                    if let Some(var) = self.check_variable(&value[begin..end]) {
                        if !expr_mode {
                            if let Some(refs) = sink.refs.as_mut() {
                                refs.push(var.name.clone());
                            }
                        }
                        let prefix = value[..begin].to_string();
                        let postfix = value[end..].to_string();
                        let mut temp = Value::new();
                        {
                            let mut sub = SubstSink {
                                key: sink.key,
                                out: &mut temp,
                                process: false,
                                refs: None,
                            };
                            self.substitute_var_mid(
                                &var, &prefix, &postfix, scope, include_value, &mut sub, expr_mode,
                            );
                        }
                        let pieces: Vec<String> = temp.iter().map(str::to_string).collect();
                        for p in pieces {
                            self.substitute_piece(&p, scope, include_value, sink, depth + 1);
                        }
                        return;
                    }
                }
            }

            // Expression bodies may name scope variables without a `$`.
            if expr_mode {
                if let Some(replaced) = self.substitute_script_identifiers(value, scope) {
                    self.finalize_piece(replaced, sink.key, include_value, sink.out, sink.process);
                    return;
                }
            }
        }

        self.finalize_piece(
            value.to_string(),
            sink.key,
            include_value,
            sink.out,
            sink.process,
        );
    }

    fn check_variable(&mut self, s: &str) -> Option<VariableRef> {
        let b = s.as_bytes();
        if b.len() < 2 || b[0] != b'$' {
            return None;
        }
        if b[1] == b'{' && b[b.len() - 1] == b'}' {
            return self.parse_parametrized(&s[2..s.len() - 1]);
        }
        let name = &s[1..];
        if !is_identifier(name, true) {
            return None;
        }
        Some(VariableRef {
            name: name.to_string(),
            default_value: String::new(),
            from: 0,
            to: i32::MAX,
            with_fallback: true,
            required: false,
            mode: SpecialMode::None,
        })
    }

    fn parse_parametrized(&mut self, inner: &str) -> Option<VariableRef> {
        let pieces: Vec<&str> = inner.split(':').map(str::trim).collect();
        if pieces.is_empty() || pieces.len() > 5 || !is_identifier(pieces[0], true) {
            return None;
        }

        let int_at = |i: usize| pieces.get(i).and_then(|p| full_int(p));
        let from_set = int_at(1).is_some();
        let from = int_at(1).unwrap_or(1);
        let mut to = int_at(2).unwrap_or(if from_set { 1 } else { RANGE_LIMIT }) + from;
        if pieces.len() > 3 && pieces[2].is_empty() {
            to = int_at(3).unwrap_or(if from_set { from + 1 } else { RANGE_LIMIT });
        }

        let mut default_value = String::new();
        let mut mode = SpecialMode::None;
        let mut required = false;
        for piece in pieces.iter().skip(1) {
            let first = piece.bytes().next();
            if first.is_none_or(|c| !c.is_ascii_lowercase() && c != b'?') {
                continue;
            }
            match *piece {
                "size" | "count" => mode = SpecialMode::Size,
                "length" => mode = SpecialMode::Length,
                "exists" => mode = SpecialMode::Exists,
                "vec2" => mode = SpecialMode::Vec2,
                "vec3" => mode = SpecialMode::Vec3,
                "vec4" => mode = SpecialMode::Vec4,
                "x" => mode = SpecialMode::X,
                "y" => mode = SpecialMode::Y,
                "z" => mode = SpecialMode::Z,
                "w" => mode = SpecialMode::W,
                "num" | "number" => mode = SpecialMode::Number,
                "bool" | "boolean" => mode = SpecialMode::Boolean,
                "str" | "string" => mode = SpecialMode::Str,
                _ => {
                    if let Some(rest) = piece.strip_prefix("or=") {
                        default_value = rest.to_string();
                    }
                }
            }
            if *piece == "required" || *piece == "?" {
                required = true;
            }
        }

        if from == 0 {
            self.error(&format!("Indices start with 1: {}, got: '{}'", pieces[0], inner));
        }
        let from = if from > 0 { from - 1 } else { from };
        let to = if to > 0 { to - 1 } else { to };

        Some(VariableRef {
            name: pieces[0].to_string(),
            default_value,
            from,
            to,
            with_fallback: false,
            required,
            mode,
        })
    }

    /// Resolves `var` to a flat list of string pieces. Returns false when
    /// nothing could be produced (caller decides between deferring, warning,
    /// and dropping).
    fn variable_values(
        &mut self,
        var: &VariableRef,
        scope: ScopeId,
        include_value: &mut bool,
        result: &mut Vec<String>,
    ) -> bool {
        let Some(v) = self.arena.find(scope, &var.name) else {
            if var.required {
                *include_value = false;
            }
            if !var.default_value.is_empty() {
                result.push(var.default_value.clone());
                return true;
            }
            return match var.mode {
                SpecialMode::Vec4 => {
                    result.extend(["0", "0", "0", "0"].map(String::from));
                    true
                }
                SpecialMode::Vec3 => {
                    result.extend(["0", "0", "0"].map(String::from));
                    true
                }
                SpecialMode::Vec2 => {
                    result.extend(["0", "0"].map(String::from));
                    true
                }
                SpecialMode::Size
                | SpecialMode::Length
                | SpecialMode::Exists
                | SpecialMode::Number => {
                    result.push("0".to_string());
                    true
                }
                SpecialMode::Boolean => {
                    result.push("false".to_string());
                    true
                }
                SpecialMode::Str => {
                    result.push(String::new());
                    true
                }
                _ => false,
            };
        };

        let len = v.len() as i32;
        let mut from = var.from;
        let mut to = var.to;
        if to < 0 || (to == 0 && from < 0) {
            to += len;
        }
        if from < 0 {
            from += len;
        }

        let mut data_size = len;
        if data_size == 1 && v.at(0).is_empty() {
            data_size = 0;
        }

        let count = (to - from).min(data_size - from);
        if count <= 0 && var.required {
            *include_value = false;
        }

        match var.mode {
            SpecialMode::Size => result.push(count.max(0).to_string()),
            SpecialMode::Length => {
                let mut total = 0usize;
                let mut j = from.max(0);
                while j < data_size && j < to {
                    total += v.at(j as usize).len();
                    j += 1;
                }
                result.push(total.to_string());
            }
            SpecialMode::Exists => {
                result.push(if from < data_size && from < to && from >= 0 {
                    "1".to_string()
                } else {
                    "0".to_string()
                });
            }
            SpecialMode::Number => result.push(fmt_f64(v.as_f64(from.max(0) as usize))),
            SpecialMode::Boolean => {
                result.push(if v.as_bool(from.max(0) as usize) {
                    "true".to_string()
                } else {
                    "false".to_string()
                });
            }
            SpecialMode::Str => result.push(v.at(from.max(0) as usize).to_string()),
            SpecialMode::X | SpecialMode::Y | SpecialMode::Z | SpecialMode::W => {
                let index = match var.mode {
                    SpecialMode::X => 0,
                    SpecialMode::Y => 1,
                    SpecialMode::Z => 2,
                    _ => 3,
                };
                if index >= count {
                    if count == 1 {
                        result.push(v.at(from.max(0) as usize).to_string());
                    } else {
                        self.warn(&format!(
                            "Expected item with at least {} values, got {}, variable {}",
                            index + 1,
                            count.max(0),
                            var.name
                        ));
                        result.push("0".to_string());
                    }
                } else {
                    result.push(v.at((from + index) as usize).to_string());
                }
            }
            SpecialMode::Vec2 | SpecialMode::Vec3 | SpecialMode::Vec4 => {
                let vec_size = match var.mode {
                    SpecialMode::Vec2 => 2,
                    SpecialMode::Vec3 => 3,
                    _ => 4,
                };
                let mut j = from.max(0);
                while j < data_size && j < to {
                    let piece = v.at(j as usize);
                    if is_number(piece) {
                        result.push(piece.to_string());
                    } else {
                        result.push("0".to_string());
                        self.warn(&format!(
                            "Number expected, instead got '{}', variable: {}",
                            piece, var.name
                        ));
                    }
                    if result.len() >= vec_size {
                        break;
                    }
                    j += 1;
                }
                if result.len() != 1 && count != vec_size as i32 {
                    self.warn(&format!(
                        "Expected item with {} values, got {}, variable {}",
                        vec_size,
                        count.max(0),
                        var.name
                    ));
                }
                let fill = if result.len() == 1 {
                    result[0].clone()
                } else {
                    "0".to_string()
                };
                while result.len() < vec_size {
                    result.push(fill.clone());
                }
            }
            SpecialMode::None => {
                let mut j = from.max(0);
                while j < data_size && j < to {
                    result.push(v.at(j as usize).to_string());
                    j += 1;
                }
            }
        }
        true
    }

    fn substitute_var_whole(
        &mut self,
        var: &VariableRef,
        scope: ScopeId,
        include_value: &mut bool,
        sink: &mut SubstSink<'_>,
    ) {
        let mut result = Vec::new();
        if self.variable_values(var, scope, include_value, &mut result) {
            for r in result {
                self.finalize_piece(r, sink.key, include_value, sink.out, sink.process);
            }
        } else if var.with_fallback {
            let wrapped = wrap_missing(&var.name);
            self.finalize_piece(wrapped, sink.key, include_value, sink.out, sink.process);
        } else if !var.required
            && (var.name.is_empty() || !var.name.as_bytes()[0].is_ascii_digit())
        {
            self.warn(&format!("Missing variable: {}", var.name));
        }
    }

    fn substitute_var_mid(
        &mut self,
        var: &VariableRef,
        prefix: &str,
        postfix: &str,
        scope: ScopeId,
        include_value: &mut bool,
        sink: &mut SubstSink<'_>,
        expr_mode: bool,
    ) {
        let mut result = Vec::new();
        if !self.variable_values(var, scope, include_value, &mut result) && !expr_mode {
            if !prefix.is_empty() || !postfix.is_empty() {
                let piece = if var.with_fallback {
                    format!("{prefix}{}{postfix}", wrap_missing(&var.name))
                } else {
                    format!("{prefix}{postfix}")
                };
                self.finalize_piece(piece, sink.key, include_value, sink.out, sink.process);
            } else if var.with_fallback {
                let wrapped = wrap_missing(&var.name);
                self.finalize_piece(wrapped, sink.key, include_value, sink.out, sink.process);
            }
            if !var.with_fallback && !var.required {
                self.warn(&format!("Missing variable: {}", var.name));
            }
            return;
        }

        if expr_mode {
            let mut s = String::from(prefix);
            match result.len() {
                1 => s.push_str(&self.wrap_auto(var, result.into_iter().next().unwrap())),
                _ => s.push_str(&script_literal(&result)),
            }
            s.push_str(postfix);
            self.finalize_piece(s, sink.key, include_value, sink.out, sink.process);
        } else {
            for r in result {
                let piece = format!("{prefix}{r}{postfix}");
                self.finalize_piece(piece, sink.key, include_value, sink.out, sink.process);
            }
        }
    }

    // Mode-aware conversion of a single resolved piece to a script literal.
    fn wrap_auto(&self, var: &VariableRef, piece: String) -> String {
        match var.mode {
            SpecialMode::Exists => {
                if parse_bool(&piece) {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            SpecialMode::Str => quote_script_string(&piece),
            SpecialMode::Boolean | SpecialMode::Size | SpecialMode::Length
            | SpecialMode::Number => piece,
            _ => script_piece(&piece),
        }
    }

    /// Replaces free identifiers in an expression body with script literals
    /// of their scope values. Returns `None` when nothing changed.
    fn substitute_script_identifiers(&mut self, value: &str, scope: ScopeId) -> Option<String> {
        let body_start = MARKER_CALC.len();
        let body_end = value.find(MARKER_END)?;
        if body_end < body_start {
            return None;
        }
        let body = &value[body_start..body_end];
        let bytes = body.as_bytes();

        let mut out = String::with_capacity(body.len());
        let mut changed = false;
        let mut i = 0usize;
        while i < bytes.len() {
            let c = bytes[i];
            if c == b'"' || c == b'\'' {
                let start = i;
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\\' {
                        i += 2;
                        continue;
                    }
                    if bytes[i] == c {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                let end = i.min(bytes.len());
                out.push_str(&body[start..end]);
                continue;
            }
            let starts_word = (c == b'_' || c.is_ascii_alphabetic())
                && (i == 0 || !is_word_or_access(bytes[i - 1]));
            if starts_word {
                let mut j = i + 1;
                while j < bytes.len()
                    && (bytes[j] == b'_' || bytes[j].is_ascii_alphanumeric())
                {
                    j += 1;
                }
                let word = &body[i..j];
                let is_call = j < bytes.len() && bytes[j] == b'(';
                if !is_call && !LUA_KEYWORDS.contains(&word) {
                    if let Some(v) = self.arena.find(scope, word) {
                        let pieces: Vec<String> = v.iter().map(str::to_string).collect();
                        out.push_str(&script_literal(&pieces));
                        changed = true;
                        i = j;
                        continue;
                    }
                }
                out.push_str(word);
                i = j;
                continue;
            }
            // Copy a full UTF-8 character at once.
            let step = utf8_len(c);
            out.push_str(&body[i..(i + step).min(bytes.len())]);
            i += step;
        }

        if !changed {
            return None;
        }
        let mut replaced = String::with_capacity(value.len() + out.len());
        replaced.push_str(MARKER_CALC);
        replaced.push_str(&out);
        replaced.push_str(&value[body_end..]);
        Some(replaced)
    }

    /// Final step for a substituted piece: unwrap deferred markers and run
    /// expressions, or store raw while recursion is still in flight.
    pub(crate) fn finalize_piece(
        &mut self,
        value: String,
        key: &str,
        include_value: &mut bool,
        out: &mut Value,
        process: bool,
    ) {
        if !process || value.len() <= 1 {
            out.push(value);
            return;
        }

        if value.starts_with(MARKER_CALC) {
            let value = self.unwrap_missing(&value);
            if let Some(body_end) = value[MARKER_CALC.len()..].find(MARKER_END) {
                let body = value[MARKER_CALC.len()..MARKER_CALC.len() + body_end].to_string();
                let postfix = value[MARKER_CALC.len() + body_end + MARKER_END.len()..].to_string();
                self.run_calculate(key, &body, "", &postfix, include_value, out);
            } else {
                out.push(value);
            }
            return;
        }

        let value = self.unwrap_missing(&value);
        out.push(value);
    }

    /// Turns missing-variable markers back into `$Name` text, reporting the
    /// names that stayed unresolved (numeric loop indices stay silent).
    fn unwrap_missing(&mut self, value: &str) -> String {
        if !value.contains(MARKER_MISSING) {
            return value.to_string();
        }
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(pos) = rest.find(MARKER_MISSING) {
            let after = &rest[pos + MARKER_MISSING.len()..];
            let Some(end) = after.find(MARKER_END) else {
                break;
            };
            let name = &after[..end];
            out.push_str(&rest[..pos]);
            out.push('$');
            out.push_str(name);
            if !name.is_empty() && !name.as_bytes()[0].is_ascii_digit() {
                self.warn(&format!("Missing variable: {name}"));
            }
            rest = &after[end + MARKER_END.len()..];
        }
        out.push_str(rest);
        out
    }
}

impl VariableRef {
    fn invalid() -> Self {
        Self {
            name: String::new(),
            default_value: String::new(),
            from: 0,
            to: i32::MAX,
            with_fallback: false,
            required: false,
            mode: SpecialMode::None,
        }
    }
}

/// Inline `k=v` pieces of mixin/generator triggers are bound later, at
/// application time, so they skip substitution here.
pub(crate) fn is_inline_param(key: &str, piece: &str) -> bool {
    (key.starts_with("@MIXIN") || key == "@" || key.starts_with("@GENERATOR"))
        && piece.contains('=')
}

fn find_dollar_name(value: &str) -> Option<usize> {
    memchr(b'$', value.as_bytes())
}

fn is_word_or_access(c: u8) -> bool {
    c == b'_' || c == b'.' || c == b':' || c.is_ascii_alphanumeric()
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_shapes() {
        assert!(is_identifier("ABC_1", true));
        assert!(is_identifier("1", true));
        assert!(!is_identifier("1", false));
        assert!(!is_identifier("A-B", true));
        assert!(!is_identifier("", true));
    }

    #[test]
    fn script_literals() {
        assert_eq!(script_literal(&[]), "nil");
        assert_eq!(script_literal(&["2.5".into()]), "2.5");
        assert_eq!(script_literal(&["a b".into()]), "\"a b\"");
        assert_eq!(
            script_literal(&["1".into(), "2".into(), "3".into()]),
            "vec3(1,2,3)"
        );
        assert_eq!(
            script_literal(&["1".into(), "x".into()]),
            "{1,\"x\"}"
        );
        assert_eq!(
            script_literal(&["1".into(), "2".into(), "3".into(), "4".into(), "5".into()]),
            "{1,2,3,4,5}"
        );
    }

    #[test]
    fn inline_params() {
        assert!(is_inline_param("@MIXIN", "k=v"));
        assert!(is_inline_param("@GENERATOR_2", "x=1"));
        assert!(!is_inline_param("@MIXIN", "JustName"));
        assert!(!is_inline_param("COLOR", "k=v"));
    }
}
