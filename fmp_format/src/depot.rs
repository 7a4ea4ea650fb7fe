use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use crate::{
    binary_utils::{read_string, ByteCursor},
    Error, RecordType, Result,
};

/// Category of an asset path table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DepotKind {
    /// Skeleton paths.
    Nsk,
    /// Texture set paths.
    Emb,
    /// Material paths.
    Emm,
    /// Animation paths.
    Ema,
}

impl DepotKind {
    pub const ALL: [DepotKind; 4] = [DepotKind::Nsk, DepotKind::Emb, DepotKind::Emm, DepotKind::Ema];

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for DepotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DepotKind::Nsk => "nsk",
            DepotKind::Emb => "emb",
            DepotKind::Emm => "emm",
            DepotKind::Ema => "ema",
        })
    }
}

/// Four independent path pools, referenced from lods by index.
///
/// Reading indexes directly into the stored tables; writing rebuilds them by
/// deduplicating paths in the order they are first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepotStringTable {
    tables: [Vec<String>; 4],
    lookup: [HashMap<String, i32>; 4],
}

impl DepotStringTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn paths(&self, kind: DepotKind) -> &[String] {
        &self.tables[kind.index()]
    }

    /// Returns the path at `index`, `None` for a negative index.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `index` is past the end of the table.
    pub fn get(&self, kind: DepotKind, index: i32) -> Result<Option<&str>> {
        if index < 0 {
            return Ok(None);
        }

        self.tables[kind.index()]
            .get(index as usize)
            .map(|path| Some(path.as_str()))
            .ok_or(Error::Corrupted {
                ty: RecordType::Depot,
                error: "depot index out of range",
            })
    }

    /// Returns the index of `path`, appending it if it isn't in the table yet.
    pub fn insert(&mut self, kind: DepotKind, path: &str) -> i32 {
        let table = &mut self.tables[kind.index()];

        *self.lookup[kind.index()]
            .entry(path.to_owned())
            .or_insert_with(|| {
                table.push(path.to_owned());
                table.len() as i32 - 1
            })
    }

    pub(crate) fn read_table(
        &mut self,
        bytes: &[u8],
        kind: DepotKind,
        offset: Option<usize>,
        count: usize,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let offset = offset.ok_or(Error::Corrupted {
            ty: RecordType::Depot,
            error: "depot has paths but no offset",
        })?;
        let mut cursor = ByteCursor::new(bytes, offset, RecordType::Depot);

        for _ in 0..count {
            let path = match cursor.offset()? {
                Some(string_offset) => read_string(bytes, string_offset)?,
                None => String::new(),
            };
            self.insert_read(kind, path);
        }

        Ok(())
    }

    // stored tables may legitimately contain duplicates, indices must stay stable
    fn insert_read(&mut self, kind: DepotKind, path: String) {
        let table = &mut self.tables[kind.index()];
        self.lookup[kind.index()]
            .entry(path.clone())
            .or_insert(table.len() as i32);
        table.push(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates_per_kind() {
        let mut depots = DepotStringTable::new();

        assert_eq!(depots.insert(DepotKind::Emb, "stage/bften.emb"), 0);
        assert_eq!(depots.insert(DepotKind::Emb, "stage/bften_2.emb"), 1);
        assert_eq!(depots.insert(DepotKind::Emb, "stage/bften.emb"), 0);
        assert_eq!(depots.insert(DepotKind::Emm, "stage/bften.emb"), 0);

        assert_eq!(depots.paths(DepotKind::Emb).len(), 2);
        assert_eq!(depots.get(DepotKind::Emb, 1), Ok(Some("stage/bften_2.emb")));
        assert_eq!(depots.get(DepotKind::Emb, -1), Ok(None));
        assert!(depots.get(DepotKind::Ema, 0).is_err());
    }
}
