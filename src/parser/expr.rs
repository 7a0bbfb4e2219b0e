//! Embedded expression runtime.
//!
//! `$"…"` pieces are evaluated by a sandboxed Luau interpreter, one state
//! per parser, created on first use. The state gets a small vector/math
//! library plus four host callbacks: `read` (data provider), and
//! `has`/`get`/`set` reflecting over the build list with `?` wildcards.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Mutex;

use mlua::{Lua, MultiValue, Value as LuaValue, Variadic};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ParserData;
use super::host::DataProvider;
use super::section::{CreatingSection, SectionList};
use super::value::{Value, fmt_f64, is_number, parse_bool, parse_i64};

/// Vector types, math aliases and the result conversion hook, loaded into
/// every fresh interpreter state.
const SCRIPT_STD_LIB: &str = r#"
local function component(v, i)
  if type(v) == 'table' then
    local x = v[i]
    return x ~= nil and x or 0
  end
  return v
end

local function vector_mt(n, ctor)
  local mt = {}
  local function zip(a, b, f)
    local r = {}
    for i = 1, n do
      r[i] = f(component(a, i), component(b, i))
    end
    return ctor(table.unpack(r))
  end
  mt.__add = function(a, b) return zip(a, b, function(x, y) return x + y end) end
  mt.__sub = function(a, b) return zip(a, b, function(x, y) return x - y end) end
  mt.__mul = function(a, b) return zip(a, b, function(x, y) return x * y end) end
  mt.__div = function(a, b) return zip(a, b, function(x, y) return x / y end) end
  mt.__mod = function(a, b) return zip(a, b, function(x, y) return x % y end) end
  mt.__pow = function(a, b) return zip(a, b, function(x, y) return x ^ y end) end
  mt.__unm = function(a) return zip(a, 0, function(x, _) return -x end) end
  mt.__eq = function(a, b)
    for i = 1, n do
      if component(a, i) ~= component(b, i) then return false end
    end
    return true
  end
  mt.__len = function(a) return a:length() end
  mt.__tostring = function(a)
    local s = '{'
    for i = 1, n do
      if i > 1 then s = s .. ', ' end
      s = s .. tostring(a[i])
    end
    return s .. '}'
  end
  mt.__index = function(a, key)
    if key == 'x' or key == 'X' then return rawget(a, 1) end
    if key == 'y' or key == 'Y' then return rawget(a, 2) end
    if key == 'z' or key == 'Z' then return rawget(a, 3) end
    if key == 'w' or key == 'W' then return rawget(a, 4) end
    if key == 'len' or key == 'length' then
      return function(s)
        local q = 0
        for i = 1, n do q = q + s[i] * s[i] end
        return math.sqrt(q)
      end
    end
    if key == 'normalize' then
      return function(s) return s / s:length() end
    end
    if key == 'normalizeSelf' then
      return function(s)
        local m = 1 / s:length()
        for i = 1, n do s[i] = s[i] * m end
      end
    end
    if key == 'dot' then
      return function(a2, b2)
        local q = 0
        for i = 1, n do q = q + component(a2, i) * component(b2, i) end
        return q
      end
    end
    return nil
  end
  return mt
end

local vec2_mt, vec3_mt, vec4_mt

function vec2(x, y)
  return setmetatable({ x or 0, y or 0 }, vec2_mt)
end
function vec3(x, y, z)
  return setmetatable({ x or 0, y or 0, z or 0 }, vec3_mt)
end
function vec4(x, y, z, w)
  return setmetatable({ x or 0, y or 0, z or 0, w or 0 }, vec4_mt)
end

vec2_mt = vector_mt(2, vec2)
vec3_mt = vector_mt(3, vec3)
vec4_mt = vector_mt(4, vec4)

function dot(a, b)
  if type(a) == 'table' then return a:dot(b) end
  if type(b) == 'table' then return b:dot(a) end
  return a * b
end
math.dot = dot

abs = math.abs
acos = math.acos
asin = math.asin
atan = math.atan
ceil = math.ceil
cos = math.cos
deg = math.deg
exp = math.exp
floor = math.floor
fmod = math.fmod
mod = math.fmod
log = math.log
max = math.max
min = math.min
pi = math.pi
PI = math.pi
pow = math.pow or function(x, y) return x ^ y end
rad = math.rad
sin = math.sin
sqrt = math.sqrt
tan = math.tan

function __conv_result(...)
  return ...
end
"#;

pub(crate) enum CalcError {
    Syntax(String),
    Discard,
    Runtime(String),
}

#[derive(Default)]
pub(crate) struct ExprBridge {
    lua: Option<Lua>,
    imported: Vec<String>,
}

impl ExprBridge {
    pub fn ensure_state(
        &mut self,
        sections: Rc<RefCell<SectionList>>,
        provider: Rc<RefCell<Option<Box<dyn DataProvider>>>>,
    ) -> Result<(), String> {
        if self.lua.is_some() {
            return Ok(());
        }
        let lua = Lua::new();
        lua.load(SCRIPT_STD_LIB)
            .set_name("std")
            .exec()
            .map_err(|e| format!("Standard library failed to load: {e}"))?;
        register_host_fns(&lua, sections, provider).map_err(|e| e.to_string())?;
        self.lua = Some(lua);
        Ok(())
    }

    /// Evaluates an expression body, trying the expression form first and
    /// falling back to wrapping the body as a function for statements.
    pub fn evaluate(&self, expr: &str) -> Result<Vec<String>, CalcError> {
        let lua = self.lua.as_ref().expect("interpreter state missing");

        let direct = format!("return __conv_result({expr})");
        let mut outcome = lua.load(&direct).set_name("expr").eval::<MultiValue>();
        if matches!(outcome, Err(mlua::Error::SyntaxError { .. })) {
            let wrapped = format!("return __conv_result((function() {expr} end)())");
            match lua.load(&wrapped).set_name("expr").eval::<MultiValue>() {
                Err(mlua::Error::SyntaxError { message, .. }) => {
                    return Err(CalcError::Syntax(cleanup_error(&message)));
                }
                other => outcome = other,
            }
        }

        match outcome {
            Ok(values) => {
                let mut pieces = Vec::new();
                for v in values {
                    lua_value_pieces(&v, &mut pieces);
                }
                Ok(pieces)
            }
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("__discardError__") {
                    Err(CalcError::Discard)
                } else {
                    Err(CalcError::Runtime(cleanup_error(&msg)))
                }
            }
        }
    }

    /// Installs `function name(args…) body end` into the sandbox.
    pub fn register_function(
        &self,
        name: &str,
        args: &Value,
        body: &str,
    ) -> Result<(), String> {
        let lua = self.lua.as_ref().expect("interpreter state missing");
        let args_line = args.join(',');
        let code = format!("function {name}({args_line})\n{body}\nend");
        lua.load(&code)
            .set_name(name)
            .exec()
            .map_err(|e| cleanup_error(&e.to_string()))
    }

    /// Runs a script file's content once; repeated imports of the same
    /// filename are ignored.
    pub fn import(&mut self, file_key: &str, code: &str) -> Result<(), String> {
        let key = file_key.to_ascii_lowercase();
        if self.imported.contains(&key) {
            return Ok(());
        }
        self.imported.push(key);
        let lua = self.lua.as_ref().expect("interpreter state missing");
        lua.load(code)
            .set_name(file_key)
            .exec()
            .map_err(|e| cleanup_error(&e.to_string()))
    }
}

impl ParserData {
    /// Evaluates one expression piece and appends the produced pieces,
    /// each sandwiched between `prefix` and `postfix`.
    pub(crate) fn run_calculate(
        &mut self,
        key: &str,
        expr: &str,
        prefix: &str,
        postfix: &str,
        include_value: &mut bool,
        out: &mut Value,
    ) {
        if !self.allow_expressions {
            if !prefix.is_empty() || !postfix.is_empty() {
                out.push(format!("{prefix}{postfix}"));
            }
            return;
        }

        let sections = self.sections.clone();
        let provider = self.provider.clone();
        if let Err(e) = self.bridge.ensure_state(sections, provider) {
            self.error(&e);
            return;
        }

        match self.bridge.evaluate(expr) {
            Ok(pieces) => {
                for p in pieces {
                    out.push(format!("{prefix}{p}{postfix}"));
                }
            }
            Err(CalcError::Discard) => *include_value = false,
            Err(CalcError::Syntax(msg)) => {
                self.error(&format!("Failed to process `{expr}`: {msg}"));
                *include_value = false;
            }
            Err(CalcError::Runtime(msg)) => {
                self.error(&format!("{msg}\nKey: {key}\nCommand: {expr}"));
                if !prefix.is_empty() || !postfix.is_empty() {
                    out.push(format!("{prefix}{postfix}"));
                }
            }
        }
    }
}

fn cleanup_error(msg: &str) -> String {
    match msg.find("\nstack traceback:") {
        Some(i) => msg[..i].to_string(),
        None => msg.to_string(),
    }
}

/// Flattens a script value into string pieces: scalars map one-to-one,
/// tables contribute their sequence part, `nil` is dropped.
fn lua_value_pieces(v: &LuaValue, out: &mut Vec<String>) {
    match v {
        LuaValue::Nil => {}
        LuaValue::Boolean(b) => out.push(if *b { "1" } else { "0" }.to_string()),
        LuaValue::Integer(i) => out.push(i.to_string()),
        LuaValue::Number(n) => out.push(fmt_f64(*n)),
        LuaValue::String(s) => out.push(s.to_string_lossy().to_string()),
        LuaValue::Table(t) => {
            let mut i = 1i64;
            loop {
                let item: LuaValue = match t.raw_get(i) {
                    Ok(v) => v,
                    Err(_) => break,
                };
                if item.is_nil() {
                    break;
                }
                lua_value_pieces(&item, out);
                i += 1;
            }
        }
        _ => out.push(String::new()),
    }
}

/// Pushes one string piece with number auto-detection.
fn piece_to_lua(lua: &Lua, piece: &str) -> mlua::Result<LuaValue> {
    if piece.is_empty() {
        return Ok(LuaValue::Nil);
    }
    if is_number(piece) {
        if let Some(i) = parse_i64(piece) {
            return Ok(LuaValue::Integer(i));
        }
        if let Some(f) = super::value::parse_f64(piece) {
            return Ok(LuaValue::Number(f));
        }
    }
    Ok(LuaValue::String(lua.create_string(piece)?))
}

#[derive(Clone, Copy, PartialEq)]
enum ForceType {
    Bool,
    Number,
    Str,
    Table,
}

fn force_type_of(v: &LuaValue) -> Option<ForceType> {
    match v {
        LuaValue::Boolean(_) => Some(ForceType::Bool),
        LuaValue::Integer(_) | LuaValue::Number(_) => Some(ForceType::Number),
        LuaValue::String(_) => Some(ForceType::Str),
        LuaValue::Table(_) => Some(ForceType::Table),
        _ => None,
    }
}

fn pieces_to_lua(
    lua: &Lua,
    pieces: &[String],
    force: Option<ForceType>,
) -> mlua::Result<MultiValue> {
    match force {
        Some(ForceType::Bool) => Ok(MultiValue::from_iter([LuaValue::Boolean(
            pieces.first().is_some_and(|p| parse_bool(p)),
        )])),
        Some(ForceType::Number) => {
            let n = pieces
                .first()
                .and_then(|p| super::value::parse_f64(p))
                .unwrap_or(0.0);
            Ok(MultiValue::from_iter([LuaValue::Number(n)]))
        }
        Some(ForceType::Str) => {
            let s = pieces.first().map(String::as_str).unwrap_or("");
            Ok(MultiValue::from_iter([LuaValue::String(
                lua.create_string(s)?,
            )]))
        }
        Some(ForceType::Table) => {
            let t = lua.create_table()?;
            for (i, p) in pieces.iter().enumerate() {
                t.raw_set(i as i64 + 1, piece_to_lua(lua, p)?)?;
            }
            Ok(MultiValue::from_iter([LuaValue::Table(t)]))
        }
        None => {
            let mut values = Vec::with_capacity(pieces.len());
            for p in pieces {
                values.push(piece_to_lua(lua, p)?);
            }
            Ok(MultiValue::from_iter(values))
        }
    }
}

fn register_host_fns(
    lua: &Lua,
    sections: Rc<RefCell<SectionList>>,
    provider: Rc<RefCell<Option<Box<dyn DataProvider>>>>,
) -> mlua::Result<()> {
    let globals = lua.globals();

    {
        let provider = provider.clone();
        let read = lua.create_function(move |lua, args: MultiValue| {
            let mut it = args.into_iter();
            let path = match it.next() {
                Some(LuaValue::String(s)) => s.to_string_lossy().to_string(),
                _ => {
                    return Err(mlua::Error::RuntimeError(
                        "read: needs path and default value".to_string(),
                    ));
                }
            };
            let provider = provider.borrow();
            let Some(provider) = provider.as_ref() else {
                return Err(mlua::Error::RuntimeError(
                    "read: data provider is not set".to_string(),
                ));
            };
            let default = it.next().unwrap_or(LuaValue::Nil);
            let out = match default {
                LuaValue::Nil => match provider.read_string(&path) {
                    Some(s) if !s.is_empty() => LuaValue::String(lua.create_string(&s)?),
                    _ => LuaValue::Nil,
                },
                LuaValue::Integer(i) => {
                    LuaValue::Number(provider.read_number(&path).unwrap_or(i as f64))
                }
                LuaValue::Number(n) => {
                    LuaValue::Number(provider.read_number(&path).unwrap_or(n))
                }
                LuaValue::String(s) => {
                    let fallback = s.to_string_lossy().to_string();
                    let v = provider.read_string(&path).unwrap_or(fallback);
                    LuaValue::String(lua.create_string(&v)?)
                }
                LuaValue::Boolean(b) => {
                    LuaValue::Boolean(provider.read_bool(&path).unwrap_or(b))
                }
                _ => LuaValue::Nil,
            };
            Ok(out)
        })?;
        globals.set("read", read)?;
    }

    {
        let sections = sections.clone();
        let has = lua.create_function(move |_, args: Variadic<Option<String>>| {
            let section = Pattern::new(args.first().cloned().flatten());
            let key = Pattern::new(args.get(1).cloned().flatten());
            let value = Pattern::new(args.get(2).cloned().flatten());
            for (name, body) in sections.borrow().iter() {
                if !section.matches(name) {
                    continue;
                }
                if key.is_any() && value.is_any() {
                    return Ok(true);
                }
                for (k, v) in body.iter() {
                    if key.matches(k.display_name()) && value.matches_value(v) {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        })?;
        globals.set("has", has)?;
    }

    {
        let sections = sections.clone();
        let get = lua.create_function(move |lua, args: MultiValue| {
            let mut it = args.into_iter();
            let (section, key) = match (it.next(), it.next()) {
                (Some(LuaValue::String(s)), Some(LuaValue::String(k))) => (
                    Pattern::new(Some(s.to_string_lossy().to_string())),
                    Pattern::new(Some(k.to_string_lossy().to_string())),
                ),
                _ => {
                    return Err(mlua::Error::RuntimeError(
                        "get: needs section name and key".to_string(),
                    ));
                }
            };
            let default = it.next().unwrap_or(LuaValue::Nil);
            let force = force_type_of(&default);

            for (name, body) in sections.borrow().iter() {
                if !section.matches(name) {
                    continue;
                }
                for (k, v) in body.iter() {
                    if key.matches(k.display_name()) {
                        let pieces: Vec<String> = v.iter().map(str::to_string).collect();
                        return pieces_to_lua(lua, &pieces, force);
                    }
                }
            }

            let mut fallback = Vec::new();
            lua_value_pieces(&default, &mut fallback);
            pieces_to_lua(lua, &fallback, force)
        })?;
        globals.set("get", get)?;
    }

    {
        let sections = sections.clone();
        let set = lua.create_function(move |_, args: MultiValue| {
            let mut it = args.into_iter();
            let (section, key) = match (it.next(), it.next()) {
                (Some(LuaValue::String(s)), Some(LuaValue::String(k))) => (
                    Pattern::new(Some(s.to_string_lossy().to_string())),
                    Pattern::new(Some(k.to_string_lossy().to_string())),
                ),
                _ => {
                    return Err(mlua::Error::RuntimeError(
                        "set: needs section name, key and value".to_string(),
                    ));
                }
            };
            let value_arg = it.next().unwrap_or(LuaValue::Nil);
            let mut pieces = Vec::new();
            lua_value_pieces(&value_arg, &mut pieces);
            let value = Value::from_pieces(pieces);

            let mut set_count = 0u32;
            let mut list = sections.borrow_mut();
            list.retain_mut(|(name, body)| {
                if !section.matches(name) {
                    return true;
                }
                let mut any_set = false;
                if value.is_empty() {
                    body.retain(|k, _| {
                        if key.matches(k.display_name()) {
                            set_count += 1;
                            any_set = true;
                            false
                        } else {
                            true
                        }
                    });
                } else {
                    for (k, v) in body.iter_mut() {
                        if key.matches(k.display_name()) {
                            *v = value.clone();
                            set_count += 1;
                            any_set = true;
                        }
                    }
                }
                if any_set && value.is_empty() && body.is_empty() {
                    return false;
                }
                if !any_set && !key.is_fuzzy() && !value.is_empty() {
                    if let Some(k) = key.literal() {
                        body.set_plain(k, value.clone());
                        set_count += 1;
                    }
                }
                true
            });

            if set_count == 0 && !section.is_fuzzy() && !key.is_fuzzy() && !value.is_empty() {
                if let (Some(s), Some(k)) = (section.literal(), key.literal()) {
                    let mut body = CreatingSection::new();
                    body.set_plain(k, value);
                    list.push((s.to_string(), body));
                    set_count = 1;
                }
            }

            Ok(set_count)
        })?;
        globals.set("set", set)?;
    }

    Ok(())
}

/* ---------- wildcard patterns for has/get/set --------------------------- */

static WILDCARD_CACHE: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

fn cached_wildcard(pattern: &str) -> Option<Regex> {
    {
        let cache = WILDCARD_CACHE.lock().unwrap();
        if let Some(re) = cache.get(pattern) {
            return Some(re.clone());
        }
    }

    let mut source = String::with_capacity(pattern.len() + 8);
    source.push('^');
    for (i, part) in pattern.split('?').enumerate() {
        if i > 0 {
            source.push_str(".*");
        }
        source.push_str(&regex::escape(part));
    }
    source.push('$');

    let re = Regex::new(&source).ok()?;
    {
        let mut cache = WILDCARD_CACHE.lock().unwrap();
        cache.entry(pattern.to_string()).or_insert_with(|| re.clone());
    }
    Some(re)
}

/// Matcher for `has`/`get`/`set` name arguments: exact text, or a pattern
/// where `?` matches any run of characters. A lone `?` (or a missing
/// argument) matches everything.
pub(crate) struct Pattern {
    kind: PatternKind,
}

enum PatternKind {
    Any,
    Exact(String),
    Fuzzy(Regex),
}

impl Pattern {
    pub fn new(source: Option<String>) -> Self {
        let kind = match source {
            None => PatternKind::Any,
            Some(s) if s == "?" => PatternKind::Any,
            Some(s) if !s.contains('?') => PatternKind::Exact(s),
            Some(s) => match cached_wildcard(&s) {
                Some(re) => PatternKind::Fuzzy(re),
                None => PatternKind::Exact(s),
            },
        };
        Self { kind }
    }

    pub fn matches(&self, s: &str) -> bool {
        match &self.kind {
            PatternKind::Any => true,
            PatternKind::Exact(e) => e == s,
            PatternKind::Fuzzy(re) => re.is_match(s),
        }
    }

    pub fn matches_value(&self, v: &Value) -> bool {
        if self.is_any() {
            return true;
        }
        v.iter().any(|p| self.matches(p))
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, PatternKind::Any)
    }

    pub fn is_fuzzy(&self) -> bool {
        !matches!(self.kind, PatternKind::Exact(_))
    }

    pub fn literal(&self) -> Option<&str> {
        match &self.kind {
            PatternKind::Exact(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_shapes() {
        assert!(Pattern::new(Some("LIGHT_?".into())).matches("LIGHT_0"));
        assert!(!Pattern::new(Some("LIGHT_?".into())).matches("SPOT_0"));
        assert!(Pattern::new(Some("?_REAR".into())).matches("LIGHT_REAR"));
        assert!(Pattern::new(Some("?GHT?".into())).matches("LIGHT_REAR"));
        assert!(Pattern::new(Some("?".into())).matches("anything"));
        assert!(Pattern::new(None).matches(""));
        assert!(Pattern::new(Some("EXACT".into())).matches("EXACT"));
        assert!(!Pattern::new(Some("EXACT".into())).matches("EXACT_NOT"));
    }

    #[test]
    fn fuzziness() {
        assert!(Pattern::new(None).is_fuzzy());
        assert!(Pattern::new(Some("A?B".into())).is_fuzzy());
        assert!(!Pattern::new(Some("AB".into())).is_fuzzy());
    }
}
