//! Scoreboard field templates.
//!
//! A template names fixed-width windows of the scoreboard buffer. It is
//! loaded once from an Input Template File (ITF) at startup and shared
//! read-only afterwards.
//!
//! ```text
//! [TEMPLATE]
//! NUMFIELDS = 2
//!
//! [FIELD1]
//! NAME = Home Score
//! LENGTH = 3
//!
//! [FIELD2]
//! NAME = Guest Score
//! LENGTH = 3
//! ```

pub mod error;
mod ini;
pub mod itf;
pub mod template;

pub use error::{Result, TemplateError};
pub use itf::{load_itf, parse_itf};
pub use template::{FieldDef, Template};
