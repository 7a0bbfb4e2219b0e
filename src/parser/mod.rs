//! Extended-INI expansion.
//!
//! This module implements the full pipeline: a character-level scanner
//! feeds sections, templates and mixins; values are split, substituted
//! against hierarchical scopes and optionally evaluated by the embedded
//! expression runtime; includes pull in referenced files; the finalizer
//! assigns sequential names; emitters serialize the result as INI or JSON.

mod emit;
mod expr;
mod files;
mod finalize;
pub mod host;
mod scan;
mod scope;
mod section;
mod split;
mod subst;
mod template;
mod value;

pub use emit::SerializerParams;
pub use host::{DataProvider, ErrorHandler, FsReader, Reader, SilentHandler};
pub use section::ResultingSection;
pub use value::Value;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use expr::ExprBridge;
use scope::ScopeArena;
use section::SectionList;
use template::{SectionTemplate, TemplateId};

pub(crate) struct ParserData {
    /// Build list: closed sections in source order, shared with the
    /// expression runtime's reflection callbacks.
    sections: Rc<RefCell<SectionList>>,
    sections_map: HashMap<String, ResultingSection>,
    templates: Vec<SectionTemplate>,
    template_names: HashMap<String, TemplateId>,
    mixin_names: HashMap<String, TemplateId>,
    arena: ScopeArena,
    resolve_within: Vec<PathBuf>,
    processed_files: Vec<String>,
    current_file: PathBuf,
    reader: Rc<dyn Reader>,
    handler: Rc<dyn ErrorHandler>,
    provider: Rc<RefCell<Option<Box<dyn DataProvider>>>>,
    bridge: ExprBridge,
    allow_includes: bool,
    allow_expressions: bool,
    allow_override: bool,
    ignore_inactive: bool,
    erase_referenced: bool,
    key_serial: u64,
    warning_count: u32,
    error_count: u32,
}

impl ParserData {
    fn new() -> Self {
        Self {
            sections: Rc::new(RefCell::new(Vec::new())),
            sections_map: HashMap::new(),
            templates: Vec::new(),
            template_names: HashMap::new(),
            mixin_names: HashMap::new(),
            arena: ScopeArena::new(),
            resolve_within: Vec::new(),
            processed_files: Vec::new(),
            current_file: PathBuf::new(),
            reader: Rc::new(FsReader),
            handler: Rc::new(SilentHandler),
            provider: Rc::new(RefCell::new(None)),
            bridge: ExprBridge::default(),
            allow_includes: true,
            allow_expressions: true,
            allow_override: true,
            ignore_inactive: false,
            erase_referenced: true,
            key_serial: 0,
            warning_count: 0,
            error_count: 0,
        }
    }

    pub(crate) fn warn(&mut self, message: &str) {
        self.warning_count += 1;
        self.handler.on_warning(&self.current_file, message);
    }

    pub(crate) fn error(&mut self, message: &str) {
        self.error_count += 1;
        self.handler.on_error(&self.current_file, message);
    }
}

/// Expands the extended INI dialect into flat sections.
///
/// A parser accumulates sections over any number of `parse`/`parse_file`
/// calls, then [`finalize`](IniParser::finalize) resolves sequential names
/// and the result can be read back or serialized.
///
/// # Examples
///
/// ```rust
/// use inipp::IniParser;
///
/// let mut parser = IniParser::new();
/// parser
///     .parse("[DEFAULTS]\nSIZE=2\n[BOX]\nW=$SIZE")
///     .finalize();
/// assert_eq!(parser.to_ini(), "[BOX]\nW=2\n\n");
/// ```
pub struct IniParser {
    data: ParserData,
}

impl Default for IniParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IniParser {
    pub fn new() -> Self {
        Self {
            data: ParserData::new(),
        }
    }

    /// Parser with extra directories to resolve referenced files in.
    pub fn with_search_dirs(dirs: Vec<PathBuf>) -> Self {
        let mut parser = Self::new();
        parser.data.resolve_within = dirs;
        parser
    }

    /// Enables or disables the `[INCLUDE]` mechanism (on by default).
    pub fn allow_includes(mut self, value: bool) -> Self {
        self.data.allow_includes = value;
        self
    }

    /// Enables or disables the expression runtime (on by default).
    pub fn allow_expressions(mut self, value: bool) -> Self {
        self.data.allow_expressions = value;
        self
    }

    /// When off, later assignments to an existing key are ignored instead
    /// of overwriting.
    pub fn allow_override(mut self, value: bool) -> Self {
        self.data.allow_override = value;
        self
    }

    /// Drops sections whose `ACTIVE` resolves falsy instead of emitting an
    /// `ACTIVE=0` stub.
    pub fn ignore_inactive(mut self, value: bool) -> Self {
        self.data.ignore_inactive = value;
        self
    }

    /// Controls whether variable keys referenced during substitution are
    /// removed from the finished section (on by default; also reachable
    /// from input via `[@INIPP] @ERASE_REFERENCED`).
    pub fn erase_referenced(mut self, value: bool) -> Self {
        self.data.erase_referenced = value;
        self
    }

    pub fn with_reader(mut self, reader: impl Reader + 'static) -> Self {
        self.data.reader = Rc::new(reader);
        self
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.data.handler = Rc::new(handler);
        self
    }

    pub fn with_data_provider(mut self, provider: impl DataProvider + 'static) -> Self {
        *self.data.provider.borrow_mut() = Some(Box::new(provider));
        self
    }

    /// Parses one in-memory document.
    pub fn parse(&mut self, data: &str) -> &mut Self {
        self.data.parse_ini_values(data, None);
        self
    }

    /// Reads and parses a file through the configured reader.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.data
            .parse_file_at(Some(path.as_ref().to_path_buf()), None, 0);
        self
    }

    /// Assigns sequential names and materializes the section map.
    pub fn finalize(&mut self) -> &mut Self {
        self.data.resolve_sequential();
        self
    }

    /// The finalized sections. Empty before [`finalize`](IniParser::finalize).
    pub fn sections(&self) -> &HashMap<String, ResultingSection> {
        &self.data.sections_map
    }

    pub fn to_ini(&self) -> String {
        self.to_ini_with(&SerializerParams::default())
    }

    pub fn to_ini_with(&self, params: &SerializerParams) -> String {
        emit::sections_to_ini(&self.data.sections_map, params)
    }

    pub fn to_json(&self, pretty: bool) -> String {
        self.to_json_with(pretty, &SerializerParams::default())
    }

    pub fn to_json_with(&self, pretty: bool, params: &SerializerParams) -> String {
        emit::sections_to_json(&self.data.sections_map, pretty, params)
    }

    /// Warnings reported so far.
    pub fn warnings(&self) -> u32 {
        self.data.warning_count
    }

    /// Errors reported so far.
    pub fn errors(&self) -> u32 {
        self.data.error_count
    }
}
