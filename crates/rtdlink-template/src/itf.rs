use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, TemplateError};
use crate::ini::IniDocument;
use crate::template::Template;

const TEMPLATE_SECTION: &str = "TEMPLATE";
const FIELD_SECTION_PREFIX: &str = "FIELD";

/// Load an Input Template File from disk.
///
/// Files written by vendor tools are not always UTF-8; undecodable bytes are
/// replaced rather than rejected.
pub fn load_itf(path: impl AsRef<Path>) -> Result<Template> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| TemplateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let template = parse_itf(&String::from_utf8_lossy(&bytes))?;
    info!(
        path = %path.display(),
        fields = template.len(),
        size = template.total_size(),
        "loaded template"
    );
    Ok(template)
}

/// Parse ITF source text.
///
/// Reads `NUMFIELDS` from `[TEMPLATE]`, then `NAME` and `LENGTH` from each of
/// `[FIELD1]` .. `[FIELDn]`. `FIELD` sections numbered past `NUMFIELDS` are
/// a count mismatch.
pub fn parse_itf(source: &str) -> Result<Template> {
    let doc = IniDocument::parse(source)?;

    let raw_count = doc.require(TEMPLATE_SECTION, "NUMFIELDS")?;
    let declared = match raw_count.trim().parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return Err(TemplateError::InvalidFieldCount(raw_count.to_string())),
    };

    let mut defs = Vec::with_capacity(declared);
    for i in 1..=declared {
        let section = format!("{FIELD_SECTION_PREFIX}{i}");
        if !doc.has_section(&section) {
            return Err(TemplateError::MissingSection(section));
        }
        let name = doc.require(&section, "NAME")?;
        let raw_length = doc.require(&section, "LENGTH")?;
        let length = match raw_length.trim().parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(TemplateError::InvalidLength {
                    field: name.to_string(),
                    value: raw_length.to_string(),
                })
            }
        };
        debug!(index = i, name, length, "template field");
        defs.push((name.to_string(), length));
    }

    let defined = doc
        .section_names()
        .filter(|name| is_field_section(name))
        .count();
    if defined != declared {
        return Err(TemplateError::FieldCountMismatch {
            declared,
            found: defined,
        });
    }

    Template::load_declared(declared, defs)
}

fn is_field_section(name: &str) -> bool {
    name.strip_prefix(FIELD_SECTION_PREFIX)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}
