//! # inipp
//!
//! Preprocessor expanding an extended INI dialect (includes with
//! parameters, variable substitution, templates, mixins, generators and
//! embedded expressions) into flat INI or JSON.

mod parser;

pub use parser::IniParser;
pub use parser::host;
pub use parser::SerializerParams;
pub use parser::{DataProvider, ErrorHandler, FsReader, Reader, SilentHandler};
pub use parser::{ResultingSection, Value};
