//! Interfaces the host plugs into the parser.

use std::fs;
use std::path::Path;

/// Maps a path to file content. A miss reads as the empty string; the
/// parser reports a warning and keeps going.
pub trait Reader {
    fn read(&self, path: &Path) -> String;

    fn exists(&self, path: &Path) -> bool {
        !self.read(path).is_empty()
    }
}

/// Plain filesystem reader used by the command-line tool.
#[derive(Debug, Default)]
pub struct FsReader;

impl Reader for FsReader {
    fn read(&self, path: &Path) -> String {
        fs::read_to_string(path).unwrap_or_default()
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Receives diagnostics as they are produced. Parsing continues after both
/// kinds; the parser additionally tallies counts for exit-code mapping.
pub trait ErrorHandler {
    fn on_warning(&self, _path: &Path, _message: &str) {}
    fn on_error(&self, _path: &Path, _message: &str) {}
}

/// Swallows all diagnostics; counts still accumulate on the parser.
#[derive(Debug, Default)]
pub struct SilentHandler;

impl ErrorHandler for SilentHandler {}

/// Backs the `read()` script callback with host data.
pub trait DataProvider {
    fn read_number(&self, _key: &str) -> Option<f64> {
        None
    }
    fn read_string(&self, _key: &str) -> Option<String> {
        None
    }
    fn read_bool(&self, _key: &str) -> Option<bool> {
        None
    }
}
