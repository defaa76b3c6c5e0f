//! Text buffers
//!
//! Holds the editable text of one tab along with the offsets every line starts at. The line
//! starts are updated incrementally on every edit rather than rescanning the text, and any
//! anchors registered against the buffer are moved along with the text and told when the line
//! they're on changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::server::{DebugError, DebugErrorKind};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Called with `(old_line_index, new_line_index)` whenever an anchor changes line
pub type LineListener = Box<dyn FnMut(usize, usize) + Send>;

/// A stable offset into a buffer, the shared state behind a `TrackedPosition`
pub(crate) struct Anchor {
    pub(crate) buffer_id: Option<u64>,
    pub(crate) offset: usize,
    pub(crate) line_index: usize,
    pub(crate) listeners: Vec<(u64, LineListener)>,
}

impl Anchor {
    pub(crate) fn new(line_index: usize) -> Self {
        Anchor {
            buffer_id: None,
            offset: 0,
            line_index,
            listeners: vec![],
        }
    }
}

pub type SharedBuffer = Arc<Mutex<TextBuffer>>;

pub struct TextBuffer {
    id: u64,
    name: String,
    text: String,
    line_starts: Vec<usize>,
    anchors: Vec<Weak<Mutex<Anchor>>>,
}

impl TextBuffer {
    pub fn new(name: String, text: String) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));

        TextBuffer {
            id: NEXT_BUFFER_ID.fetch_add(1, Ordering::SeqCst),
            name,
            text,
            line_starts,
            anchors: vec![],
        }
    }

    pub fn shared(name: String, text: String) -> SharedBuffer {
        Arc::new(Mutex::new(TextBuffer::new(name, text)))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn line_start(&self, line_index: usize) -> Option<usize> {
        self.line_starts.get(line_index).copied()
    }

    /// Text of a line without its newline
    pub fn line_text(&self, line_index: usize) -> Option<&str> {
        let start = self.line_start(line_index)?;
        let end = match self.line_start(line_index + 1) {
            Some(next) => next - 1,
            None => self.text.len(),
        };
        Some(&self.text[start..end])
    }

    /// Insert `text` at the byte offset given
    pub fn insert(&mut self, offset: usize, text: &str) -> crate::Result<()> {
        self.check_offset(offset)?;
        if text.is_empty() {
            return Ok(());
        }

        let len = text.len();
        self.text.insert_str(offset, text);

        let idx = self.line_starts.partition_point(|&s| s <= offset);
        for start in self.line_starts[idx..].iter_mut() {
            *start += len;
        }
        let new_starts: Vec<usize> = text
            .match_indices('\n')
            .map(|(i, _)| offset + i + 1)
            .collect();
        self.line_starts.splice(idx..idx, new_starts);

        self.update_anchors(offset, |anchor| anchor + len);

        Ok(())
    }

    /// Remove `len` bytes starting at the byte offset given
    pub fn remove(&mut self, offset: usize, len: usize) -> crate::Result<()> {
        self.check_offset(offset)?;
        let end = match offset.checked_add(len) {
            Some(end) => end,
            None => return Err(self.bad_offset(offset)),
        };
        self.check_offset(end)?;
        if len == 0 {
            return Ok(());
        }

        self.text.replace_range(offset..end, "");

        // Lines that started just after a removed newline disappear
        self.line_starts.retain(|&s| s <= offset || s > end);
        let idx = self.line_starts.partition_point(|&s| s <= end);
        for start in self.line_starts[idx..].iter_mut() {
            *start -= len;
        }

        self.update_anchors(offset, |anchor| {
            if end <= anchor {
                anchor - len
            } else {
                offset
            }
        });

        Ok(())
    }

    /// Start moving an anchor along with this buffer's text
    pub(crate) fn register_anchor(&mut self, anchor: &Arc<Mutex<Anchor>>) {
        self.anchors.push(Arc::downgrade(anchor));
    }

    fn check_offset(&self, offset: usize) -> crate::Result<()> {
        if offset > self.text.len() || !self.text.is_char_boundary(offset) {
            return Err(self.bad_offset(offset));
        }
        Ok(())
    }

    fn bad_offset(&self, offset: usize) -> DebugError {
        DebugError::new(
            DebugErrorKind::GenericError,
            "Bad buffer offset".to_string(),
            format!(
                "Bad offset {} for {} of length {}",
                offset,
                self.name,
                self.text.len()
            ),
        )
    }

    /// Move every anchor at or after `edit_offset` and notify its listeners if it changed line
    fn update_anchors<F>(&mut self, edit_offset: usize, move_anchor: F)
    where
        F: Fn(usize) -> usize,
    {
        let id = self.id;
        let mut live = vec![];
        let mut changed = vec![];

        for weak in self.anchors.drain(..) {
            let anchor = match weak.upgrade() {
                Some(a) => a,
                None => continue,
            };

            {
                let mut a = anchor.lock().unwrap();
                if a.buffer_id != Some(id) {
                    continue;
                }

                if edit_offset <= a.offset {
                    a.offset = move_anchor(a.offset);
                    let old = a.line_index;
                    let new = self.line_starts.partition_point(|&s| s <= a.offset) - 1;
                    if old != new {
                        a.line_index = new;
                        changed.push((anchor.clone(), old, new));
                    }
                }
            }

            live.push(weak);
        }

        self.anchors = live;

        for (anchor, old, new) in changed {
            notify_listeners(&anchor, old, new);
        }
    }
}

/// Call every listener on an anchor without holding its lock, so a listener is free to look the
/// position up again.
fn notify_listeners(anchor: &Arc<Mutex<Anchor>>, old: usize, new: usize) {
    let mut listeners = std::mem::take(&mut anchor.lock().unwrap().listeners);

    for (_, listener) in listeners.iter_mut() {
        listener(old, new);
    }

    let mut a = anchor.lock().unwrap();
    listeners.append(&mut a.listeners);
    a.listeners = listeners;
}

#[cfg(test)]
mod tests {
    use super::TextBuffer;

    #[test]
    fn check_line_starts_on_creation() {
        let buffer = TextBuffer::new("A.pde".to_string(), "ab\n\ncd\n".to_string());

        assert_eq!(buffer.line_count(), 4);
        assert_eq!(buffer.line_start(2), Some(4));
        assert_eq!(buffer.line_text(0), Some("ab"));
        assert_eq!(buffer.line_text(1), Some(""));
        assert_eq!(buffer.line_text(2), Some("cd"));
        assert_eq!(buffer.line_text(3), Some(""));
        assert_eq!(buffer.line_text(4), None);
    }

    #[test]
    fn check_insert_keeps_line_starts_in_step() {
        let mut buffer = TextBuffer::new("A.pde".to_string(), "one\ntwo\nthree".to_string());

        buffer.insert(4, "new\nlines\n").unwrap();

        let rescanned = TextBuffer::new("A.pde".to_string(), buffer.text().to_string());
        assert_eq!(buffer.text(), "one\nnew\nlines\ntwo\nthree");
        assert_eq!(buffer.line_starts, rescanned.line_starts);
        assert_eq!(buffer.line_start(3), Some(14));
    }

    #[test]
    fn check_remove_keeps_line_starts_in_step() {
        let mut buffer = TextBuffer::new("A.pde".to_string(), "one\ntwo\nthree\nfour".to_string());

        buffer.remove(2, 8).unwrap();

        let rescanned = TextBuffer::new("A.pde".to_string(), buffer.text().to_string());
        assert_eq!(buffer.text(), "onree\nfour");
        assert_eq!(buffer.line_starts, rescanned.line_starts);
    }

    #[test]
    fn check_bad_offsets_are_rejected() {
        let mut buffer = TextBuffer::new("A.pde".to_string(), "héllo".to_string());

        assert!(buffer.insert(99, "x").is_err());
        assert!(buffer.insert(2, "x").is_err());
        assert!(buffer.remove(4, 10).is_err());
        assert!(buffer.remove(1, usize::MAX).is_err());
        assert_eq!(buffer.text(), "héllo");
    }
}
