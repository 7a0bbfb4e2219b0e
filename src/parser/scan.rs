//! Character-level scanner.
//!
//! One pass over the input buffer. The scanner tracks the start of the
//! current token, the last non-space position (values are sliced between
//! the two, so interior quotes and comments need no copying), an active
//! quote character, and a solid flag that disables all further special
//! handling once a `data:image/png;base64,` value begins.

use std::mem;

use super::ParserData;
use super::scope::ScopeId;
use super::split::{SOLID_PREFIX, is_ws, split_quoted};
use super::template::{CurrentSection, add_template_split};
use super::value::Value;

#[derive(Default)]
struct LineStatus {
    /// Byte range of the key, fixed by the first `=` of the line.
    key: Option<(usize, usize)>,
    /// Start of the pending token.
    started: Option<usize>,
    /// Active quote character within the value.
    end_at: Option<u8>,
    started_solid: bool,
}

/// Whether a quote at `at` can open a string: scanning left, the value text
/// must be blank, a `$`, or end in an unescaped comma.
fn is_quote_working(b: &[u8], from: usize, at: usize, allow_dollar: bool) -> bool {
    let mut i = at;
    while i > from {
        i -= 1;
        let c = b[i];
        if is_ws(c) {
            continue;
        }
        if allow_dollar && c == b'$' {
            return is_quote_working(b, from, i, false);
        }
        return c == b','
            && (i == 0 || b[i - 1] != b'\\' || (i >= 2 && b[i - 2] == b'\\'));
    }
    true
}

impl ParserData {
    pub(crate) fn parse_ini_values(&mut self, data: &str, parent_scope: Option<ScopeId>) {
        let scope = match parent_scope {
            Some(p) => self.arena.inherit(p),
            None => self.arena.root(),
        };

        let b = data.as_bytes();
        let size = b.len();
        // Entries before the first header land in the untitled section.
        let mut cs: Vec<CurrentSection> = vec![CurrentSection::named(String::new())];
        let mut status = LineStatus::default();
        let mut non_space: Option<usize> = None;
        let mut consume_comment = false;

        let mut i = 0usize;
        while i < size {
            let c = b[i];
            let quoted_skip = status.end_at.is_some_and(|q| q != c);
            if consume_comment || is_ws(c) || quoted_skip {
                if c == b'\n' {
                    consume_comment = false;
                }
            } else if c == b'\n' {
                let continued = non_space.is_some_and(|n| n > 0 && b[n] == b'\\');
                if !continued {
                    self.finish_line_all(&mut cs, data, non_space, &mut status, false, scope);
                }
            } else if status.started_solid {
                non_space = Some(i);
            } else if c == b';' || (c == b'/' && i + 1 < size && b[i + 1] == b'/') {
                self.finish_line_all(&mut cs, data, non_space, &mut status, false, scope);
                consume_comment = true;
            } else if c == b'[' {
                self.finish_line_all(&mut cs, data, non_space, &mut status, true, scope);
                let s = i + 1;
                if s >= size {
                    break;
                }
                let mut j = s;
                while j < size && b[j] != b']' {
                    j += 1;
                }
                cs.clear();
                self.set_sections(&mut cs, &data[s..j], scope);
                i = j;
            } else if c == b'=' {
                if let Some(st) = status.started {
                    if status.key.is_none() && !cs.is_empty() {
                        let end = match non_space {
                            Some(n) if n + 1 > st => n + 1,
                            _ => st,
                        };
                        status.key = Some((st, end));
                        status.started = None;
                        status.started_solid = false;
                        status.end_at = None;
                    }
                }
            } else {
                if (c == b'"' || c == b'\'') && status.key.is_some() {
                    let escaped =
                        i >= 1 && b[i - 1] == b'\\' && !(i >= 2 && b[i - 2] == b'\\');
                    if status.end_at == Some(c) && !escaped {
                        status.end_at = None;
                    } else if status.end_at.is_none()
                        && status
                            .started
                            .is_none_or(|st| is_quote_working(b, st, i, true))
                    {
                        status.end_at = Some(c);
                        if status.started.is_none() {
                            status.started = Some(i);
                            status.started_solid = false;
                        }
                    }
                }
                non_space = Some(i);
                if status.started.is_none() {
                    status.started = Some(i);
                    status.started_solid = c == b'd' && data[i..].starts_with(SOLID_PREFIX);
                }
            }
            i += 1;
        }

        self.finish_line_all(&mut cs, data, non_space, &mut status, true, scope);
    }

    fn finish_line_all(
        &mut self,
        cs: &mut Vec<CurrentSection>,
        data: &str,
        non_space: Option<usize>,
        status: &mut LineStatus,
        finish_section: bool,
        scope: ScopeId,
    ) {
        for c in cs.iter_mut() {
            self.finish_line(c, data, non_space, status, scope);
            if finish_section {
                self.finish_section(c, scope, None);
            }
        }
        *status = LineStatus::default();
    }

    /// Consumes one pending `key=value` into every active section context.
    fn finish_line(
        &mut self,
        c: &mut CurrentSection,
        data: &str,
        non_space: Option<usize>,
        status: &LineStatus,
        scope: ScopeId,
    ) {
        let Some((ks, ke)) = status.key else { return };
        if ks >= ke {
            return;
        }

        let value: &str = match status.started {
            Some(st) => {
                let end = non_space.map(|n| n + 1).unwrap_or(st);
                if end > st { &data[st..end] } else { "" }
            }
            None => "",
        };
        let mut key = data[ks..ke].to_string();

        let sc = self.prepare_section_scope(c, scope);
        let new_key = self.allow_override
            || !c.referenced.is_empty()
            || match c.template {
                None => !c.target.borrow().contains(&key),
                Some(t) => !self.templates[t.0 as usize]
                    .values
                    .iter()
                    .any(|(k, _)| *k == key),
            };

        let delayed = c.template.is_some() || c.key == "DEFAULTS" || c.key == "INCLUDE";
        let mut refs = mem::take(&mut c.referenced_vars);
        let mut splitted = Value::new();
        if !self.split_and_substitute(&key, delayed, value, sc, &mut refs, &mut splitted) {
            c.referenced_vars = refs;
            return;
        }

        // Dynamic keys: `${…}` or `$"…"` in the key name.
        if let Some(di) = key.find('$') {
            if matches!(key.as_bytes().get(di + 1), Some(b'{') | Some(b'"')) {
                let mut kv = Value::new();
                let name = key.clone();
                if !self.split_and_substitute(&name, delayed, &name, sc, &mut refs, &mut kv) {
                    c.referenced_vars = refs;
                    return;
                }
                key = kv.as_str(0).to_string();
            }
        }

        match c.template {
            None => {
                if key.starts_with("@MIXIN") || key == "@" {
                    self.resolve_mixin(c, sc, &splitted, false, &mut refs);
                } else if key.starts_with("@GENERATOR") {
                    if key != "@GENERATOR_STARTING_INDEX" {
                        self.resolve_generator(None, "", &splitted, sc, &mut refs);
                    }
                } else if key == "@ERASE_REFERENCED" && c.key == "@INIPP" {
                    self.erase_referenced = splitted.as_bool(0);
                } else if c.key == "DEFAULTS" {
                    let compat = key.starts_with("VAR") && !splitted.is_empty();
                    if compat {
                        let actual = splitted.at(0).to_string();
                        self.arena.set_default(scope, actual, splitted.slice_from(1));
                    } else {
                        self.arena.set_default(scope, key, splitted);
                    }
                } else if c.key == "INCLUDE" && key == "INCLUDE" {
                    let mut target = c.target.borrow_mut();
                    match target.get_mut("INCLUDE") {
                        Some(existing) => {
                            for p in splitted.iter() {
                                existing.push(p.to_string());
                            }
                        }
                        None => target.set_plain("INCLUDE", splitted),
                    }
                } else if new_key {
                    let converted = self.convert_key_autoinc(key);
                    c.target.borrow_mut().set(converted, splitted);
                }
            }
            Some(t) => {
                self.templates[t.0 as usize].values.push((key, splitted));
            }
        }

        c.referenced_vars = refs;
    }

    /// Interprets a `[…]` header and opens the matching section contexts.
    fn set_sections(&mut self, cs: &mut Vec<CurrentSection>, header: &str, scope: ScopeId) {
        // A header-level generator runs in place and opens nothing.
        let trimmed = header.trim();
        if let Some(rest) = trimmed.strip_prefix("@GENERATOR") {
            if let Some(eq) = rest.find('=') {
                let split = split_quoted(rest[eq + 1..].trim(), true);
                let mut refs = Vec::new();
                self.resolve_generator(None, "", &split, scope, &mut refs);
                return;
            }
        }

        let mut final_name = "";
        let mut keys = header;
        let mut is_template = false;
        let mut is_mixin = false;

        if let Some(sep) = header.find(':') {
            final_name = header[..sep].trim();
            match final_name {
                "INCLUDE" => {
                    let file = header[sep + 1..].trim();
                    let c = CurrentSection::named("INCLUDE");
                    c.target
                        .borrow_mut()
                        .set_plain("INCLUDE", Value::single(file));
                    cs.push(c);
                    return;
                }
                "FUNCTION" => {
                    let name = header[sep + 1..].trim();
                    let c = CurrentSection::named("FUNCTION");
                    c.target.borrow_mut().set_plain("NAME", Value::single(name));
                    cs.push(c);
                    return;
                }
                "USE" => {
                    let file = header[sep + 1..].trim();
                    let c = CurrentSection::named("USE");
                    c.target.borrow_mut().set_plain("FILE", Value::single(file));
                    cs.push(c);
                    return;
                }
                "TEMPLATE" => is_template = true,
                "MIXIN" => is_mixin = true,
                _ => {}
            }
            keys = &header[sep + 1..];
        }

        if is_template || is_mixin {
            let mut pieces: Vec<&str> = keys.split_whitespace().collect();
            if pieces.is_empty() {
                return;
            }
            let tpl = if is_template {
                self.get_or_create_template(pieces[0], scope)
            } else {
                self.get_or_create_mixin(pieces[0], scope)
            };
            if is_template
                && pieces.len() > 1
                && matches!(*pieces.last().unwrap(), "earlyresolve" | "EARLYRESOLVE")
            {
                self.templates[tpl.0 as usize].early_resolve = true;
                pieces.pop();
            }
            if pieces.len() > 2 && matches!(pieces[1], "extends" | "EXTENDS") {
                for piece in &pieces[2..] {
                    let name = piece.trim_matches([',', ' ', '\t', '\r']);
                    if name.is_empty() {
                        continue;
                    }
                    let parent = if is_template {
                        self.get_or_create_template(name, scope)
                    } else {
                        self.get_or_create_mixin(name, scope)
                    };
                    self.templates[tpl.0 as usize].parents.push(parent);
                }
            }
            cs.push(CurrentSection::for_template(tpl));
            return;
        }

        let section_names: Vec<&str> = keys.split(',').map(str::trim).collect();

        let mut early = Vec::new();
        let mut late = Vec::new();
        for name in &section_names {
            if let Some(&t) = self.template_names.get(*name) {
                add_template_split(&self.templates, &mut early, &mut late, t, 0);
            }
        }

        if !late.is_empty() {
            cs.push(CurrentSection::with_templates(final_name, late));
        } else {
            for name in section_names {
                cs.push(CurrentSection::named(name));
            }
        }

        if !early.is_empty() {
            for c in cs.iter_mut() {
                let sc = self.prepare_section_scope(c, scope);
                let mut refs = mem::take(&mut c.referenced_vars);
                for &t in &early {
                    self.resolve_template(c, sc, t, &mut refs, true);
                }
                c.referenced_vars = refs;
            }
        }
    }
}
