use crate::types::BufferKind;

/// The four text buffers a session accumulates between flush points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferStore {
    slots: [String; 4],
}

impl BufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, buffer: BufferKind, text: &str) {
        self.slots[buffer.slot()].push_str(text);
    }

    pub fn reset(&mut self, buffer: BufferKind) {
        self.slots[buffer.slot()].clear();
    }

    /// Drops everything appended after the buffer was `len` bytes long.
    /// Lengths that are not a char boundary of the current text are ignored.
    pub fn truncate(&mut self, buffer: BufferKind, len: usize) {
        let slot = &mut self.slots[buffer.slot()];
        if slot.is_char_boundary(len) {
            slot.truncate(len);
        }
    }

    pub fn snapshot(&self, buffer: BufferKind) -> &str {
        &self.slots[buffer.slot()]
    }

    pub fn len(&self, buffer: BufferKind) -> usize {
        self.slots[buffer.slot()].len()
    }
}

#[cfg(test)]
mod tests {
    use super::BufferStore;
    use crate::types::BufferKind;

    #[test]
    fn snapshot_is_concatenation_in_call_order() {
        let mut store = BufferStore::new();
        store.append(BufferKind::Statistics, "alpha ");
        store.append(BufferKind::Statistics, "beta ");
        store.append(BufferKind::Statistics, "gamma");
        assert_eq!(store.snapshot(BufferKind::Statistics), "alpha beta gamma");
        assert_eq!(store.len(BufferKind::Statistics), 16);
    }

    #[test]
    fn buffers_are_independent_and_reset_empties_only_one() {
        let mut store = BufferStore::new();
        store.append(BufferKind::Summary, "s");
        store.append(BufferKind::Trace, "t");
        store.reset(BufferKind::Summary);

        assert_eq!(store.snapshot(BufferKind::Summary), "");
        assert_eq!(store.snapshot(BufferKind::Trace), "t");
        assert_eq!(store.len(BufferKind::Result), 0);
    }

    #[test]
    fn truncate_keeps_text_appended_before_the_mark() {
        let mut store = BufferStore::new();
        store.append(BufferKind::Statistics, "kept
");
        let mark = store.len(BufferKind::Statistics);
        store.append(BufferKind::Statistics, "héader
");

        store.truncate(BufferKind::Statistics, mark + 2);
        assert_eq!(store.snapshot(BufferKind::Statistics), "kept
héader
");

        store.truncate(BufferKind::Statistics, mark);
        assert_eq!(store.snapshot(BufferKind::Statistics), "kept
");
    }
}
