use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};

/// Deferred string pool.
///
/// Records never store their strings inline. Instead the writer leaves a 4 byte slot
/// and remembers `(slot, text)` here; once the structural body is complete
/// [`StringPatchList::resolve`] appends the pool and fills in every slot.
#[derive(Debug, Clone, Default)]
pub struct StringPatchList {
    entries: Vec<(usize, String)>,
}

impl StringPatchList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `text` for the 4 byte slot at `slot`. Empty strings leave the slot 0.
    pub fn push(&mut self, slot: usize, text: &str) {
        if !text.is_empty() {
            self.entries.push((slot, text.to_owned()));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the pool to `buf` and patches every queued slot.
    /// Identical strings share one pool entry.
    ///
    /// # Panics
    ///
    /// Panics if a queued slot lies outside `buf`.
    pub fn resolve(self, buf: &mut Vec<u8>) {
        let mut pool: HashMap<String, usize> = HashMap::with_capacity(self.entries.len());

        for (slot, text) in self.entries {
            let position = if let Some(&position) = pool.get(&text) {
                position
            } else {
                let position = buf.len();
                buf.extend_from_slice(text.as_bytes());
                buf.push(0);
                pool.insert(text, position);
                position
            };

            LittleEndian::write_i32(&mut buf[slot..slot + 4], position as i32);
        }
    }
}
