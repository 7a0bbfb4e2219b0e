//! Referenced-file tracking and resolution.
//!
//! Included files are looked up next to the including file first, then in
//! each configured search directory. A file is processed at most once per
//! include-parameter fingerprint; the key is the bare filename, compared
//! case-insensitively.

use std::path::{Path, PathBuf};

use super::ParserData;
use super::scope::ScopeId;

fn processed_key(file_name: &str, fingerprint: u64) -> String {
    let trimmed = file_name.trim();
    let name = Path::new(trimmed)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| trimmed.to_string());
    format!("{name}{fingerprint}")
}

impl ParserData {
    pub(crate) fn is_processed(&self, file_name: &str, fingerprint: u64) -> bool {
        let key = processed_key(file_name, fingerprint);
        self.processed_files
            .iter()
            .any(|p| p.eq_ignore_ascii_case(&key))
    }

    pub(crate) fn mark_processed(&mut self, file_name: &str, fingerprint: u64) {
        let key = processed_key(file_name, fingerprint);
        self.processed_files.push(key);
    }

    /// Resolves a referenced file against the current file's directory and
    /// the search path. The directory of a hit joins the search path for
    /// later lookups. Returns nothing for already-processed references.
    pub(crate) fn find_referenced(&mut self, file_name: &str, fingerprint: u64) -> Option<PathBuf> {
        if self.is_processed(file_name, fingerprint) {
            return None;
        }

        let trimmed = file_name.trim();
        let parent = self
            .current_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut dirs = Vec::with_capacity(self.resolve_within.len() + 1);
        dirs.push(parent);
        dirs.extend(self.resolve_within.iter().cloned());

        for dir in dirs {
            let candidate = dir.join(trimmed);
            if !self.reader.exists(&candidate) {
                continue;
            }
            if let Some(found_dir) = candidate.parent() {
                if !self.resolve_within.iter().any(|w| w == found_dir) {
                    self.resolve_within.push(found_dir.to_path_buf());
                }
            }
            return Some(candidate);
        }

        None
    }

    /// Reads and parses one referenced file within `scope`.
    pub(crate) fn parse_file_at(
        &mut self,
        path: Option<PathBuf>,
        scope: Option<ScopeId>,
        fingerprint: u64,
    ) {
        let Some(path) = path else { return };
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.mark_processed(&name, fingerprint);
        self.current_file = path.clone();
        let data = self.reader.read(&path);
        if data.is_empty() {
            self.warn(&format!("File is missing or empty: {}", path.display()));
        }
        self.parse_ini_values(&data, scope);
    }
}
