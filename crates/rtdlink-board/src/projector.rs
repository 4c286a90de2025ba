use rtdlink_template::Template;
use serde::Serialize;

/// Current value of one template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValue {
    pub name: String,
    pub offset: usize,
    pub value: String,
}

impl FieldValue {
    /// True when the field holds only whitespace.
    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// Fields covered by a write of `length` bytes at `offset`.
///
/// Walks forward from `offset` one field at a time. The walk stops at the
/// first position where no field starts, so a write that is not aligned to a
/// field boundary projects nothing from that point on.
pub fn fields_touched(
    template: &Template,
    buffer: &[u8],
    offset: usize,
    length: usize,
) -> Vec<FieldValue> {
    let limit = offset.saturating_add(length);
    let mut pos = offset;
    let mut touched = Vec::new();

    while pos < limit {
        let Some(field) = template.lookup_by_start_offset(pos) else {
            break;
        };
        let Some(window) = buffer.get(field.range()) else {
            break;
        };
        touched.push(FieldValue {
            name: field.name.clone(),
            offset: field.offset,
            value: String::from_utf8_lossy(window).into_owned(),
        });
        pos = field.end();
    }

    touched
}
