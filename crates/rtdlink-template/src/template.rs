use std::collections::HashMap;
use std::ops::Range;

use serde::Serialize;

use crate::error::{Result, TemplateError};

/// A named, fixed-width window of the scoreboard buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub name: String,
    pub offset: usize,
    pub width: usize,
}

impl FieldDef {
    /// One past the last byte of this field. [`Template::load`] guarantees
    /// this does not overflow.
    pub fn end(&self) -> usize {
        self.offset + self.width
    }

    /// Byte range of this field within the buffer.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.end()
    }
}

/// Ordered field layout of a scoreboard.
///
/// Offsets accumulate: each field starts where the previous one ends, so the
/// buffer size is the sum of all widths. Only exact start offsets are
/// indexed; an offset inside a field resolves to no field.
#[derive(Debug, Clone, Default)]
pub struct Template {
    fields: Vec<FieldDef>,
    by_offset: HashMap<usize, usize>,
    total_size: usize,
}

impl Template {
    /// Build a template from ordered `(name, length)` definitions.
    pub fn load<I, S>(defs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let mut fields = Vec::new();
        let mut by_offset = HashMap::new();
        let mut offset = 0usize;

        for (name, width) in defs {
            let name = name.into();
            if width == 0 {
                return Err(TemplateError::InvalidLength {
                    field: name,
                    value: width.to_string(),
                });
            }
            let Some(end) = offset.checked_add(width) else {
                return Err(TemplateError::LayoutTooLarge {
                    field: name,
                    offset,
                    width,
                });
            };
            by_offset.entry(offset).or_insert(fields.len());
            fields.push(FieldDef {
                name,
                offset,
                width,
            });
            offset = end;
        }

        Ok(Self {
            fields,
            by_offset,
            total_size: offset,
        })
    }

    /// Like [`Template::load`], but also checks the definition count
    /// against a declared one.
    pub fn load_declared<I, S>(declared: usize, defs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        let template = Self::load(defs)?;
        if template.fields.len() != declared {
            return Err(TemplateError::FieldCountMismatch {
                declared,
                found: template.fields.len(),
            });
        }
        Ok(template)
    }

    /// Size of the scoreboard buffer in bytes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The field starting exactly at `offset`, if any.
    pub fn lookup_by_start_offset(&self, offset: usize) -> Option<&FieldDef> {
        self.by_offset.get(&offset).map(|&idx| &self.fields[idx])
    }

    /// First field called `name`.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// `(offset, width)` of the first field called `name`.
    pub fn field_window(&self, name: &str) -> Option<(usize, usize)> {
        self.field(name).map(|f| (f.offset, f.width))
    }
}
