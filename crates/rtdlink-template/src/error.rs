use std::path::PathBuf;

/// Errors raised while building a template. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid INI syntax.
    #[error("template syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// A section name appears twice.
    #[error("duplicate section [{0}]")]
    DuplicateSection(String),

    /// A required section is absent.
    #[error("missing section [{0}]")]
    MissingSection(String),

    /// A required key is absent from its section.
    #[error("missing key {key} in section [{section}]")]
    MissingKey { section: String, key: String },

    /// `NUMFIELDS` is not a positive integer.
    #[error("invalid field count {0:?}")]
    InvalidFieldCount(String),

    /// A field length is not a positive integer.
    #[error("field {field:?} has invalid length {value:?}")]
    InvalidLength { field: String, value: String },

    /// The summed field widths do not fit in the address space.
    #[error("field {field:?} at offset {offset} with length {width} overflows the layout")]
    LayoutTooLarge {
        field: String,
        offset: usize,
        width: usize,
    },

    /// The number of field definitions disagrees with the declared count.
    #[error("template declares {declared} fields but defines {found}")]
    FieldCountMismatch { declared: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, TemplateError>;
