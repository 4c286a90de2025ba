use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rtdlink_template::Template;

use crate::error::{BoardError, Result};
use crate::projector::{fields_touched, FieldValue};

/// The single shared scoreboard buffer.
///
/// The buffer is `template.total_size()` bytes, initialised to spaces, and
/// never resized. Patches from every connection land here; each patch and the
/// projection that follows it happen under one lock, so a projection never
/// observes a half-written patch.
#[derive(Debug)]
pub struct Scoreboard {
    template: Arc<Template>,
    buffer: Mutex<Vec<u8>>,
}

impl Scoreboard {
    pub fn new(template: Arc<Template>) -> Self {
        let buffer = vec![b' '; template.total_size()];
        Self {
            template,
            buffer: Mutex::new(buffer),
        }
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Buffer size in bytes.
    pub fn size(&self) -> usize {
        self.template.total_size()
    }

    /// Overwrite `text.len()` bytes at `offset`.
    ///
    /// Fails without touching the buffer when the patch would run past the end.
    pub fn apply(&self, offset: usize, text: &[u8]) -> Result<()> {
        let mut buffer = self.lock();
        patch(&mut buffer, offset, text)
    }

    /// Apply a patch and project the fields it touched, atomically.
    pub fn apply_and_project(&self, offset: usize, text: &[u8]) -> Result<Vec<FieldValue>> {
        let mut buffer = self.lock();
        patch(&mut buffer, offset, text)?;
        Ok(fields_touched(&self.template, &buffer, offset, text.len()))
    }

    /// Project the fields covered by `length` bytes at `offset`.
    pub fn project(&self, offset: usize, length: usize) -> Vec<FieldValue> {
        let buffer = self.lock();
        fields_touched(&self.template, &buffer, offset, length)
    }

    /// Current value of one named field.
    pub fn field_value(&self, name: &str) -> Option<String> {
        let field = self.template.field(name)?;
        let buffer = self.lock();
        buffer
            .get(field.range())
            .map(|window| String::from_utf8_lossy(window).into_owned())
    }

    /// Every field with its current value, in template order.
    pub fn fields(&self) -> Vec<FieldValue> {
        let buffer = self.lock();
        self.template
            .fields()
            .iter()
            .filter_map(|field| {
                buffer.get(field.range()).map(|window| FieldValue {
                    name: field.name.clone(),
                    offset: field.offset,
                    value: String::from_utf8_lossy(window).into_owned(),
                })
            })
            .collect()
    }

    /// Copy of the whole buffer.
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock().clone()
    }

    // A panicking writer leaves plain bytes behind; nothing to repair.
    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn patch(buffer: &mut [u8], offset: usize, text: &[u8]) -> Result<()> {
    let size = buffer.len();
    let out_of_bounds = || BoardError::OutOfBounds {
        offset,
        len: text.len(),
        size,
    };
    let end = offset.checked_add(text.len()).ok_or_else(out_of_bounds)?;
    let window = buffer.get_mut(offset..end).ok_or_else(out_of_bounds)?;
    window.copy_from_slice(text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn board() -> Scoreboard {
        let template = Template::load([("A", 4), ("B", 6)]).unwrap();
        Scoreboard::new(Arc::new(template))
    }

    #[test]
    fn starts_as_spaces() {
        let board = board();
        assert_eq!(board.size(), 10);
        assert_eq!(board.snapshot(), b"          ");
    }

    #[test]
    fn apply_home_projects_field_a() {
        let board = board();
        let fields = board.apply_and_project(0, b"HOME").unwrap();
        assert_eq!(board.snapshot(), b"HOME      ");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name, "A");
        assert_eq!(fields[0].value, "HOME");
    }

    #[test]
    fn out_of_bounds_leaves_buffer_unchanged() {
        let board = board();
        board.apply(0, b"HOME").unwrap();

        let err = board.apply(4, b"WICKETS").unwrap_err();
        assert!(matches!(
            err,
            BoardError::OutOfBounds {
                offset: 4,
                len: 7,
                size: 10
            }
        ));
        assert_eq!(board.snapshot(), b"HOME      ");
    }

    #[test]
    fn patch_ending_exactly_at_size_is_accepted() {
        let board = board();
        board.apply(4, b"GUESTS").unwrap();
        assert_eq!(board.snapshot(), b"    GUESTS");
    }

    #[test]
    fn offset_past_end_with_empty_text_is_rejected() {
        let board = board();
        assert!(board.apply(11, b"").is_err());
        assert!(board.apply(10, b"").is_ok());
    }

    #[test]
    fn huge_offset_does_not_overflow() {
        let board = board();
        assert!(board.apply(usize::MAX, b"X").is_err());
    }

    #[test]
    fn same_patch_twice_is_idempotent() {
        let board = board();
        board.apply(4, b"12").unwrap();
        let once = board.snapshot();
        board.apply(4, b"12").unwrap();
        assert_eq!(board.snapshot(), once);
    }

    #[test]
    fn field_lookup_and_listing() {
        let board = board();
        board.apply(4, b"GUEST ").unwrap();
        assert_eq!(board.field_value("B").as_deref(), Some("GUEST "));
        assert_eq!(board.field_value("missing"), None);

        let fields = board.fields();
        assert_eq!(fields.len(), 2);
        assert!(fields[0].is_blank());
        assert!(!fields[1].is_blank());
    }

    #[test]
    fn concurrent_writers_to_disjoint_fields() {
        let board = Arc::new(board());
        let a = {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                for _ in 0..500 {
                    board.apply(0, b"HOME").unwrap();
                }
            })
        };
        let b = {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                for _ in 0..500 {
                    board.apply(4, b"GUESTS").unwrap();
                }
            })
        };
        a.join().unwrap();
        b.join().unwrap();
        assert_eq!(board.snapshot(), b"HOMEGUESTS");
    }

    #[test]
    fn concurrent_writers_to_same_field_never_interleave() {
        let board = Arc::new(board());
        let writers: Vec<_> = [b"AAAA", b"BBBB"]
            .into_iter()
            .map(|text| {
                let board = Arc::clone(&board);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let fields = board.apply_and_project(0, text).unwrap();
                        assert_eq!(fields[0].value.as_bytes(), text);
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }
        let value = board.field_value("A").unwrap();
        assert!(value == "AAAA" || value == "BBBB");
    }
}
