//! Templates, mixins, generators, and section resolution.
//!
//! Templates and mixins share one record type; the difference is purely in
//! how they are applied. Templates attach to sections through the header
//! (`[Name: Tpl]`) and resolve when the section closes (or opens, for
//! early-resolve ones). Mixins are pulled in explicitly with `@MIXIN=Name`.
//! Generators stamp out `N1×N2×…` sections from a template, exposing the
//! loop indices as variables `$1`, `$2`, ….

use std::cell::RefCell;
use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use super::ParserData;
use super::scope::ScopeId;
use super::section::{CreatingSection, SectionKey};
use super::split::{MARKER_CALC, MARKER_END};
use super::subst::is_identifier;
use super::value::Value;

const MAX_PARENT_DEPTH: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct TemplateId(pub u32);

pub(crate) struct SectionTemplate {
    pub name: String,
    pub values: Vec<(String, Value)>,
    /// Snapshot of the defining file's scope, consulted as a fallback when
    /// the template is applied elsewhere.
    pub scope: ScopeId,
    pub parents: Vec<TemplateId>,
    pub early_resolve: bool,
}

/// A section (or template body) currently being filled by the scanner.
pub(crate) struct CurrentSection {
    pub key: String,
    pub target: Rc<RefCell<CreatingSection>>,
    /// Set while the lines belong to a template or mixin definition.
    pub template: Option<TemplateId>,
    pub referenced: Vec<TemplateId>,
    pub referenced_vars: Vec<String>,
    /// Keys each template wrote during this resolution pass; lets a
    /// template overwrite its own keys while respecting siblings'.
    pub set_via_template: HashMap<u32, Vec<String>>,
}

impl CurrentSection {
    pub fn named(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            target: Rc::new(RefCell::new(CreatingSection::new())),
            template: None,
            referenced: Vec::new(),
            referenced_vars: Vec::new(),
            set_via_template: HashMap::new(),
        }
    }

    pub fn for_template(id: TemplateId) -> Self {
        let mut c = Self::named(String::new());
        c.template = Some(id);
        c
    }

    pub fn with_templates(key: impl Into<String>, templates: Vec<TemplateId>) -> Self {
        let mut c = Self::named(key);
        c.referenced = templates;
        c
    }
}

/// Collects a template and its parents depth-first, declaration order.
pub(crate) fn add_template_flat(
    templates: &[SectionTemplate],
    out: &mut Vec<TemplateId>,
    t: TemplateId,
    depth: u32,
) {
    if depth > MAX_PARENT_DEPTH {
        return;
    }
    out.push(t);
    let parents = templates[t.0 as usize].parents.clone();
    for p in parents {
        add_template_flat(templates, out, p, depth + 1);
    }
}

/// Same walk, but splits early-resolve templates from late ones.
pub(crate) fn add_template_split(
    templates: &[SectionTemplate],
    early: &mut Vec<TemplateId>,
    late: &mut Vec<TemplateId>,
    t: TemplateId,
    depth: u32,
) {
    if depth > MAX_PARENT_DEPTH {
        return;
    }
    if templates[t.0 as usize].early_resolve {
        early.push(t);
    } else {
        late.push(t);
    }
    let parents = templates[t.0 as usize].parents.clone();
    for p in parents {
        add_template_split(templates, early, late, p, depth + 1);
    }
}

/// `NAME_...` and `NAME_…` are sequential; the group keeps its underscore.
pub(crate) fn sequential_group(name: &str) -> Option<&str> {
    name.strip_suffix("...")
        .or_else(|| name.strip_suffix("…"))
        .filter(|g| g.ends_with('_'))
}

impl ParserData {
    pub(crate) fn get_or_create_template(&mut self, name: &str, scope: ScopeId) -> TemplateId {
        if let Some(&id) = self.template_names.get(name) {
            return id;
        }
        let id = self.new_template(name, scope);
        self.template_names.insert(name.to_string(), id);
        id
    }

    pub(crate) fn get_or_create_mixin(&mut self, name: &str, scope: ScopeId) -> TemplateId {
        if let Some(&id) = self.mixin_names.get(name) {
            return id;
        }
        let id = self.new_template(name, scope);
        self.mixin_names.insert(name.to_string(), id);
        id
    }

    fn new_template(&mut self, name: &str, scope: ScopeId) -> TemplateId {
        let template_scope = self.arena.inherit(scope);
        self.templates.push(SectionTemplate {
            name: name.to_string(),
            values: Vec::new(),
            scope: template_scope,
            parents: Vec::new(),
            early_resolve: false,
        });
        TemplateId(self.templates.len() as u32 - 1)
    }

    fn get_template(&mut self, name: &str) -> Option<TemplateId> {
        let found = self.template_names.get(name).copied();
        if found.is_none() {
            self.error(&format!("Template is missing: {name}"));
        }
        found
    }

    fn get_mixin(&mut self, name: &str) -> Option<TemplateId> {
        let found = self.mixin_names.get(name).copied();
        if found.is_none() {
            self.error(&format!("Mixin is missing: {name}"));
        }
        found
    }

    /// Child scope for resolving within `c`: the section body is tier two,
    /// referenced templates' definition scopes are fallbacks, and `TARGET`
    /// names the section being produced.
    pub(crate) fn prepare_section_scope(&mut self, c: &CurrentSection, scope: ScopeId) -> ScopeId {
        let sc = self.arena.inherit_with_target(scope, c.target.clone());
        for t in &c.referenced {
            let ts = self.templates[t.0 as usize].scope;
            self.arena.add_fallback(sc, ts);
        }
        if !self.arena.has_explicit(sc, "TARGET") && !c.key.is_empty() {
            self.arena.set_explicit(sc, "TARGET", Value::single(c.key.clone()));
        }
        sc
    }

    pub(crate) fn resolve_template(
        &mut self,
        c: &mut CurrentSection,
        scope: ScopeId,
        t: TemplateId,
        refs: &mut Vec<String>,
        within_template: bool,
    ) {
        let sc = self.arena.inherit(scope);
        let t_scope = self.templates[t.0 as usize].scope;
        self.arena.add_fallback(sc, t_scope);

        let values = self.templates[t.0 as usize].values.clone();

        if let Some((_, active)) = values.iter().find(|(k, _)| k == "@ACTIVE") {
            let mut v = Value::new();
            if self.substitute_value("@ACTIVE", active, sc, refs, &mut v) && !v.as_bool(0) {
                return;
            }
        }

        for (raw_key, raw_value) in &values {
            if raw_key.starts_with("@ACTIVE") {
                continue;
            }

            let is_output = raw_key == "@OUTPUT";
            if is_output && !c.key.is_empty() {
                continue;
            }
            let is_generator = raw_key.starts_with("@GENERATOR");
            let is_generator_param = is_generator && raw_key.contains(':');
            let is_mixin = raw_key.starts_with("@MIXIN") || raw_key == "@";
            let is_virtual = is_output || is_generator || is_mixin;

            let set_by_me = c
                .set_via_template
                .get(&t.0)
                .is_some_and(|keys| keys.contains(raw_key));
            let taken = !is_virtual
                && within_template
                && c.target.borrow().contains(raw_key)
                && !set_by_me;
            if taken
                || is_generator_param
                || (is_generator && raw_key == "@GENERATOR_STARTING_INDEX")
            {
                continue;
            }

            let mut dest = Value::new();
            if !self.substitute_value(raw_key, raw_value, sc, refs, &mut dest) {
                continue;
            }

            if is_output {
                c.key = dest.as_str(0).to_string();
                self.arena
                    .set_explicit(sc, "TARGET", Value::single(c.key.clone()));
            } else if is_generator {
                self.resolve_generator(Some(t), raw_key, &dest, sc, refs);
            } else if is_mixin {
                self.resolve_mixin(c, sc, &dest, within_template, refs);
            } else {
                let mut key = raw_key.clone();
                let dynamic = key
                    .find('$')
                    .map(|i| matches!(key.as_bytes().get(i + 1), Some(b'{') | Some(b'"')))
                    .unwrap_or(false)
                    || key.contains(MARKER_CALC);
                if dynamic {
                    let mut kv = Value::new();
                    let name = key.clone();
                    if !self.split_and_substitute(&name, false, &name, sc, refs, &mut kv) {
                        return;
                    }
                    key = kv.as_str(0).to_string();
                }

                let converted = self.convert_key_autoinc(key.clone());
                c.target.borrow_mut().set(converted, dest);
                if within_template {
                    c.set_via_template.entry(t.0).or_default().push(key);
                }
            }
        }
    }

    pub(crate) fn resolve_mixin(
        &mut self,
        c: &mut CurrentSection,
        scope: ScopeId,
        trigger: &Value,
        within_template: bool,
        refs: &mut Vec<String>,
    ) {
        if trigger.is_empty() {
            return;
        }
        let name = trigger.at(0).to_string();
        let Some(t) = self.get_mixin(&name) else {
            return;
        };
        let scope_own = self.set_inline_values(scope, trigger, 1, refs);
        let use_scope = scope_own.unwrap_or(scope);
        // The mixin first, then its parent chain depth-first.
        let mut chain = Vec::new();
        add_template_flat(&self.templates, &mut chain, t, 0);
        for m in chain {
            self.resolve_template(c, use_scope, m, refs, within_template);
        }
    }

    /// Binds inline `k=v` (and bare-flag) pieces of a mixin/generator
    /// trigger into a fresh child scope.
    fn set_inline_values(
        &mut self,
        scope: ScopeId,
        trigger: &Value,
        index: usize,
        refs: &mut Vec<String>,
    ) -> Option<ScopeId> {
        let mut own: Option<ScopeId> = None;
        for i in index..trigger.len() {
            let item = trigger.at(i).to_string();
            if let Some(eq) = item.find('=') {
                let own_id = match own {
                    Some(id) => id,
                    None => {
                        let id = self.arena.inherit(scope);
                        own = Some(id);
                        id
                    }
                };
                let mut set_key = item[..eq].trim().to_string();
                let set_value = item[eq + 1..].trim().to_string();
                // An expression value swallows the `k=` prefix into its
                // wrapper during splitting; take it back apart.
                if set_key.starts_with(MARKER_CALC) && set_value.ends_with(MARKER_END) {
                    set_key = set_key[MARKER_CALC.len()..].to_string();
                    let rebuilt = format!("{MARKER_CALC}{set_value}");
                    let mut v = Value::new();
                    if self.substitute_value(&set_key, &Value::single(rebuilt), own_id, refs, &mut v)
                    {
                        self.arena.set_explicit(own_id, set_key, v);
                    }
                } else {
                    let mut v = Value::new();
                    if self.split_and_substitute(&set_key, false, &set_value, own_id, refs, &mut v)
                    {
                        self.arena.set_explicit(own_id, set_key, v);
                    }
                }
            } else if is_identifier(&item, false) {
                let own_id = match own {
                    Some(id) => id,
                    None => {
                        let id = self.arena.inherit(scope);
                        own = Some(id);
                        id
                    }
                };
                self.arena.set_explicit(own_id, item, Value::from_bool(true));
            }
        }
        own
    }

    pub(crate) fn resolve_generator(
        &mut self,
        t: Option<TemplateId>,
        key: &str,
        trigger: &Value,
        scope: ScopeId,
        refs: &mut Vec<String>,
    ) {
        let mut ref_template = trigger.as_str(0).to_string();
        let scope_own = self.set_inline_values(scope, trigger, 1, refs);

        let mut repeats: Vec<i64> = Vec::new();
        for i in 1..trigger.len() {
            let piece = trigger.at(i);
            if !piece.contains('=') && !is_identifier(piece, false) {
                repeats.push(trigger.as_i64(i));
            }
        }

        let mut section_key = String::new();
        if let Some(sep) = ref_template.find(':') {
            section_key = ref_template[..sep].trim().to_string();
            ref_template = ref_template[sep + 1..].trim().to_string();
        }

        let Some(tpl) = self.get_template(&ref_template) else {
            return;
        };
        self.resolve_generator_iteration(
            t,
            key,
            &section_key,
            tpl,
            scope_own.unwrap_or(scope),
            refs,
            &repeats,
            0,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_generator_iteration(
        &mut self,
        t: Option<TemplateId>,
        key: &str,
        section_key: &str,
        tpl: TemplateId,
        scope: ScopeId,
        refs: &mut Vec<String>,
        repeats: &[i64],
        phase: usize,
    ) {
        if phase < repeats.len() {
            let mut offset = 1i64;
            if let Some((_, v)) = self.templates[tpl.0 as usize]
                .values
                .iter()
                .find(|(k, _)| k == "@GENERATOR_STARTING_INDEX")
            {
                offset = v.as_i64(phase);
            }

            let n = repeats[phase];
            let mut i = 0i64;
            while i < n {
                let gen_scope = self.arena.inherit(scope);
                self.arena.set_explicit(
                    gen_scope,
                    (phase + 1).to_string(),
                    Value::from_int(i + offset),
                );
                self.resolve_generator_iteration(
                    t,
                    key,
                    section_key,
                    tpl,
                    gen_scope,
                    refs,
                    repeats,
                    phase + 1,
                );
                i += 1;
            }
        } else {
            self.resolve_generator_impl(t, key, section_key, tpl, scope, refs);
        }
    }

    fn resolve_generator_impl(
        &mut self,
        t: Option<TemplateId>,
        key: &str,
        section_key: &str,
        tpl: TemplateId,
        scope: ScopeId,
        refs: &mut Vec<String>,
    ) {
        let mut generated = CurrentSection::named(section_key);
        add_template_flat(&self.templates, &mut generated.referenced, tpl, 0);

        // `KEY: name = value` lines of the invoking template become
        // parameters of every generated section.
        let mut gen_scope = scope;
        if let Some(t) = t {
            let params: Vec<(String, Value)> = self.templates[t.0 as usize]
                .values
                .iter()
                .filter(|(k, _)| k.starts_with(key) && k.contains(':'))
                .cloned()
                .collect();
            for (k0, v0) in params {
                let Some(sep) = k0.find(':') else { continue };
                if sep < key.len() || !k0[key.len()..sep].trim().is_empty() {
                    continue;
                }
                let param_key = k0[sep + 1..].trim().to_string();
                if gen_scope == scope {
                    gen_scope = self.arena.inherit(scope);
                }
                let mut v = Value::new();
                if self.substitute_value(&param_key, &v0, gen_scope, refs, &mut v) {
                    self.arena.set_explicit(gen_scope, param_key, v);
                }
            }
        }

        self.finish_section(&mut generated, gen_scope, Some(refs));
    }

    pub(crate) fn convert_key_autoinc(&mut self, key: String) -> SectionKey {
        match sequential_group(&key) {
            Some(group) => {
                let serial = self.key_serial;
                self.key_serial += 1;
                SectionKey::Sequential {
                    group: group.to_string(),
                    serial,
                }
            }
            None => SectionKey::Plain(key),
        }
    }

    /// Runs when a section's last line has been consumed: applies referenced
    /// templates, honors `ACTIVE`, and routes system sections (`FUNCTION`,
    /// `USE`, `INCLUDE`) to their handlers before emitting.
    pub(crate) fn finish_section(
        &mut self,
        c: &mut CurrentSection,
        scope: ScopeId,
        ext_refs: Option<&mut Vec<String>>,
    ) {
        if c.template.is_some() {
            return;
        }

        let mut local_refs;
        let refs: &mut Vec<String> = match ext_refs {
            Some(r) => r,
            None => {
                local_refs = c.referenced_vars.clone();
                &mut local_refs
            }
        };

        if !c.referenced.is_empty() {
            let sc = self.prepare_section_scope(c, scope);
            let templates = c.referenced.clone();
            for t in templates {
                self.resolve_template(c, sc, t, refs, true);
            }
            if self.erase_referenced {
                let mut target = c.target.borrow_mut();
                for name in refs.iter() {
                    target.remove(name);
                }
            }
        }

        if self.erase_referenced {
            let names = mem::take(&mut c.referenced_vars);
            let mut target = c.target.borrow_mut();
            for name in &names {
                target.remove(name);
            }
            drop(target);
            c.referenced_vars = names;
        }

        let active = c.target.borrow().get("ACTIVE").cloned();
        if let Some(active) = active {
            let mut flag = active.as_bool(0);
            if active.iter().any(|p| p.contains(MARKER_CALC)) {
                let mut v = Value::new();
                if self.substitute_value("ACTIVE", &active, scope, refs, &mut v) {
                    flag = v.as_bool(0);
                } else {
                    flag = false;
                }
            }
            if !flag {
                let is_system = c.key == "FUNCTION" || c.key == "USE" || c.key == "INCLUDE";
                if is_system || self.ignore_inactive {
                    return;
                }
                let mut stub = CreatingSection::new();
                stub.set_plain("ACTIVE", Value::single("0"));
                self.sections.borrow_mut().push((c.key.clone(), stub));
                return;
            }
        }

        if c.key == "FUNCTION" && self.allow_expressions {
            let (name, args, code) = {
                let target = c.target.borrow();
                (
                    target.get("NAME").map(|v| v.at(0).to_string()).unwrap_or_default(),
                    target.get("ARGUMENTS").cloned().unwrap_or_default(),
                    target.get("CODE").map(|v| v.at(0).to_string()).unwrap_or_default(),
                )
            };
            let sections = self.sections.clone();
            let provider = self.provider.clone();
            if let Err(e) = self.bridge.ensure_state(sections, provider) {
                self.error(&e);
            } else if let Err(e) = self.bridge.register_function(&name, &args, &code) {
                self.error(&e);
            }
            c.target.borrow_mut().clear();
        } else if c.key == "USE" && self.allow_expressions {
            let name = c
                .target
                .borrow()
                .get("FILE")
                .map(|v| v.at(0).to_string())
                .unwrap_or_default();
            match self.find_referenced(&name, 0) {
                Some(path) => {
                    let code = self.reader.read(&path);
                    let file_key = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| name.clone());
                    let sections = self.sections.clone();
                    let provider = self.provider.clone();
                    if let Err(e) = self.bridge.ensure_state(sections, provider) {
                        self.error(&e);
                    } else if let Err(e) = self.bridge.import(&file_key, &code) {
                        self.error(&e);
                    }
                }
                None => self.error(&format!("Referenced file is missing: {name}")),
            }
            c.target.borrow_mut().clear();
        } else if c.key.starts_with("INCLUDE") {
            let raw = c.target.borrow().get("INCLUDE").cloned();
            if let Some(raw) = raw {
                if !self.allow_includes {
                    c.target.borrow_mut().clear();
                    return;
                }
                let previous_file = self.current_file.clone();
                let include_scope = self.arena.inherit(scope);

                let params: Vec<(String, Value)> = c
                    .target
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.display_name().to_string(), v.clone()))
                    .collect();
                for (k, v) in &params {
                    if k == "INCLUDE" {
                        continue;
                    }
                    if k.starts_with("VAR") {
                        self.arena
                            .set_include_param(include_scope, v.at(0).to_string(), v.slice_from(1));
                    } else {
                        self.arena.set_include_param(include_scope, k.clone(), v.clone());
                    }
                }

                let mut values = Value::new();
                if self.substitute_value("INCLUDE", &raw, scope, refs, &mut values) {
                    // Clear before parsing: included files may open their own
                    // `[INCLUDE]` sections.
                    c.target.borrow_mut().clear();
                    let fingerprint = self.arena.include_params_fingerprint(include_scope);
                    for i in 0..values.len() {
                        let piece = values.at(i).to_string();
                        let found = self.find_referenced(&piece, fingerprint);
                        self.parse_file_at(found, Some(include_scope), fingerprint);
                    }
                    self.current_file = previous_file;
                }
                return;
            }
        }

        if !c.target.borrow().is_empty() {
            self.sections
                .borrow_mut()
                .push((c.key.clone(), c.target.borrow().clone()));
        }
    }
}
