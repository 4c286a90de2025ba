//! Minimal INI reader covering what ITF files use.
//!
//! Section names are case-sensitive, keys are not. `=` or `:` separates a
//! key from its value, whole-line `#`/`;` comments are skipped, a `;` after
//! whitespace ends a value, and indented lines continue the previous value. Keys in `[DEFAULT]` apply to every
//! section.

use std::collections::HashMap;

use crate::error::{Result, TemplateError};

const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Default)]
pub(crate) struct IniDocument {
    sections: Vec<(String, HashMap<String, String>)>,
}

impl IniDocument {
    pub(crate) fn parse(source: &str) -> Result<Self> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let mut doc = IniDocument::default();
        let mut last_key: Option<String> = None;

        for (idx, raw_line) in source.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                last_key = None;
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            let indented = raw_line.starts_with(|c: char| c.is_whitespace());
            if indented {
                if let (Some(key), Some((_, entries))) = (&last_key, doc.sections.last_mut()) {
                    if let Some(value) = entries.get_mut(key) {
                        value.push('\n');
                        value.push_str(trimmed);
                        continue;
                    }
                }
            }

            if let Some(name) = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
            {
                if name.is_empty() {
                    return Err(syntax(line_no, "empty section name"));
                }
                if doc.section_index(name).is_some() {
                    return Err(TemplateError::DuplicateSection(name.to_string()));
                }
                doc.sections.push((name.to_string(), HashMap::new()));
                last_key = None;
                continue;
            }

            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(syntax(line_no, "expected `key = value`"));
            };
            let key = trimmed[..split].trim().to_ascii_lowercase();
            let value = strip_inline_comment(trimmed[split + 1..].trim()).to_string();
            if key.is_empty() {
                return Err(syntax(line_no, "empty key"));
            }

            let Some((section, entries)) = doc.sections.last_mut() else {
                return Err(syntax(line_no, "key outside of any section"));
            };
            if entries.contains_key(&key) {
                return Err(syntax(
                    line_no,
                    &format!("duplicate key {key:?} in section [{section}]"),
                ));
            }
            entries.insert(key.clone(), value);
            last_key = Some(key);
        }

        Ok(doc)
    }

    fn section_index(&self, name: &str) -> Option<usize> {
        self.sections.iter().position(|(n, _)| n == name)
    }

    pub(crate) fn has_section(&self, name: &str) -> bool {
        self.section_index(name).is_some()
    }

    /// Section names in file order, excluding `DEFAULT`.
    pub(crate) fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections
            .iter()
            .map(|(n, _)| n.as_str())
            .filter(|n| *n != DEFAULT_SECTION)
    }

    /// Look up `key` in `section`, falling back to `[DEFAULT]`.
    ///
    /// `Ok(None)` means the section exists but lacks the key.
    pub(crate) fn get(&self, section: &str, key: &str) -> Result<Option<&str>> {
        let Some(idx) = self.section_index(section) else {
            return Err(TemplateError::MissingSection(section.to_string()));
        };
        let key = key.to_ascii_lowercase();
        let value = self.sections[idx].1.get(&key).or_else(|| {
            self.section_index(DEFAULT_SECTION)
                .and_then(|d| self.sections[d].1.get(&key))
        });
        Ok(value.map(String::as_str))
    }

    /// Like [`IniDocument::get`], but a missing key is an error.
    pub(crate) fn require(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key)?
            .ok_or_else(|| TemplateError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }
}

fn strip_inline_comment(value: &str) -> &str {
    value
        .match_indices(';')
        .find(|(idx, _)| value[..*idx].ends_with(char::is_whitespace))
        .map_or(value, |(idx, _)| value[..idx].trim_end())
}

fn syntax(line: usize, message: &str) -> TemplateError {
    TemplateError::Syntax {
        line,
        message: message.to_string(),
    }
}
