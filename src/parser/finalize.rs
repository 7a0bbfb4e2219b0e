//! Sequential naming and duplicate merging.
//!
//! After all input is consumed, `NAME_…` placeholders receive the smallest
//! free numeric suffix within their group (explicitly numbered sections
//! reserve theirs first), duplicate names merge with later keys winning,
//! and sequential keys inside each section are materialized the same way.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::ParserData;
use super::section::{CreatingSection, ResultingSection, SectionKey};
use super::template::sequential_group;

const AUTOINCREMENT_LIMIT: u32 = 10_000;

#[derive(Default)]
struct TakenIndices {
    taken: Vec<u32>,
    next_value: u32,
}

impl TakenIndices {
    fn next(&mut self) -> u32 {
        let mut ret = self.next_value;
        self.next_value += 1;
        while self.taken.contains(&ret) {
            ret = self.next_value;
            self.next_value += 1;
        }
        ret
    }

    fn reserve(&mut self, index: u32) {
        if index == self.next_value {
            self.next_value += 1;
        } else {
            self.taken.push(index);
        }
    }
}

/// Splits a trailing `_<digits>` suffix off an explicitly numbered name.
fn numbered_group(name: &str) -> Option<(&str, u32)> {
    if name.len() < 3 {
        return None;
    }
    let b = name.as_bytes();
    let mut digits = 0;
    while digits < name.len().saturating_sub(2) && b[name.len() - digits - 1].is_ascii_digit() {
        digits += 1;
    }
    if digits == 0 || b[name.len() - digits - 1] != b'_' {
        return None;
    }
    let index = name[name.len() - digits..].parse().ok()?;
    Some((&name[..name.len() - digits], index))
}

fn resolve_sequential_keys(section: &CreatingSection) -> ResultingSection {
    let mut ret = ResultingSection::new();
    for (key, value) in section.iter() {
        match key {
            SectionKey::Plain(name) => {
                ret.insert(name.clone(), value.clone());
            }
            SectionKey::Sequential { group, .. } => {
                for i in 0..AUTOINCREMENT_LIMIT {
                    let candidate = format!("{group}{i}");
                    if !ret.contains_key(&candidate) && !section.contains(&candidate) {
                        ret.insert(candidate, value.clone());
                        break;
                    }
                }
            }
        }
    }
    ret
}

impl ParserData {
    pub(crate) fn resolve_sequential(&mut self) {
        let list: Vec<(String, CreatingSection)> = self.sections.borrow_mut().drain(..).collect();

        let mut indices: HashMap<String, TakenIndices> = HashMap::new();
        for (name, _) in &list {
            if let Some((group, index)) = numbered_group(name) {
                indices.entry(group.to_string()).or_default().reserve(index);
            }
        }

        let mut merged: IndexMap<String, CreatingSection> = IndexMap::new();
        for (name, body) in list {
            let final_name = match sequential_group(&name) {
                Some(group) => {
                    let next = indices.entry(group.to_string()).or_default().next();
                    format!("{group}{next}")
                }
                None => name,
            };
            match merged.get_mut(&final_name) {
                Some(existing) => {
                    for (k, v) in body.iter() {
                        existing.set(k.clone(), v.clone());
                    }
                }
                None => {
                    merged.insert(final_name, body);
                }
            }
        }

        self.sections_map.clear();
        for (name, body) in merged {
            self.sections_map.insert(name, resolve_sequential_keys(&body));
        }
    }
}
