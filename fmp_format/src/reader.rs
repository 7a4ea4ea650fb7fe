use tracing::debug;

use crate::{
    binary_utils::{count, optional_offset, read_string, ByteCursor},
    header::{Header, Section, SETTINGS_A_OFFSET, SETTINGS_B_OFFSET},
    record::{read_array, Record},
    settings::{SettingsA, SettingsB},
    DepotKind, DepotStringTable, Error, FmpDocument, FormatVersion, HitboxGroup, RecordType,
    Result,
};

/// Read context: the whole buffer plus everything records need to resolve themselves.
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    version: FormatVersion,
    depots: DepotStringTable,
    hitbox_counts: Vec<usize>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8], version: FormatVersion, depots: DepotStringTable) -> Self {
        Self {
            bytes,
            version,
            depots,
            hitbox_counts: Vec::new(),
        }
    }

    pub(crate) fn version(&self) -> FormatVersion {
        self.version
    }

    pub(crate) fn cursor(&self, offset: usize, ty: RecordType) -> ByteCursor<'a> {
        ByteCursor::new(self.bytes, offset, ty)
    }

    pub(crate) fn check_range(&self, offset: usize, len: usize, ty: RecordType) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(Error::OutOfBounds { ty, offset }),
        }
    }

    /// Resolves a string offset, absent strings are empty.
    pub(crate) fn string(&self, offset: Option<usize>) -> Result<String> {
        match offset {
            Some(offset) => read_string(self.bytes, offset),
            None => Ok(String::new()),
        }
    }

    pub(crate) fn set_hitbox_counts(&mut self, counts: Vec<usize>) {
        self.hitbox_counts = counts;
    }

    /// Number of hitboxes in the hitbox group at `index`.
    pub(crate) fn hitbox_count(&self, index: u16) -> Result<usize> {
        self.hitbox_counts
            .get(usize::from(index))
            .copied()
            .ok_or(Error::Corrupted {
                ty: RecordType::Object,
                error: "hitbox group index out of range",
            })
    }

    pub(crate) fn depot_path(&self, kind: DepotKind, index: i32) -> Result<Option<String>> {
        self.depots
            .get(kind, index)
            .map(|path| path.map(ToOwned::to_owned))
    }
}

impl FmpDocument {
    /// Parses a whole fmp file.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the signature is invalid or the file is corrupted.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let header = Header::parse(bytes)?;
        let version = header.version();
        debug!("reading fmp version {:#x} ({:?})", header.version.get(), version);

        let table = |section: Section| -> Result<(Option<usize>, usize)> {
            let table = header.table(section);
            Ok((
                optional_offset(table.offset(), RecordType::Header)?,
                count(table.count(), RecordType::Header)?,
            ))
        };

        // lods index into the depots, so they have to be read first
        let mut depots = DepotStringTable::new();
        for (kind, section) in DepotKind::ALL.into_iter().zip(Section::DEPOTS) {
            let (offset, n) = table(section)?;
            debug!("reading {} depot: {} paths", kind, n);
            depots.read_table(bytes, kind, offset, n)?;
        }

        let mut reader = Reader::new(bytes, version, depots);

        let settings_a_offset = optional_offset(header.settings_a_offset.get(), RecordType::Header)?
            .unwrap_or(SETTINGS_A_OFFSET);
        reader.check_range(settings_a_offset, SettingsA::SIZE, RecordType::SettingsA)?;
        let settings_a = SettingsA::read(&reader, settings_a_offset)?;

        let settings_b_offset = optional_offset(header.settings_b_offset.get(), RecordType::Header)?
            .unwrap_or(SETTINGS_B_OFFSET);
        reader.check_range(settings_b_offset, SettingsB::SIZE, RecordType::SettingsB)?;
        let settings_b = SettingsB::read(&reader, settings_b_offset)?;

        let (offset, n) = table(Section::Section1)?;
        let section1 = read_array(&reader, offset, n)?;
        let (offset, n) = table(Section::Section2)?;
        let section2 = read_array(&reader, offset, n)?;
        let (offset, n) = table(Section::FragmentGroups)?;
        let fragment_groups = read_array(&reader, offset, n)?;

        // virtual sub part counts come from the referenced hitbox groups
        let (offset, n) = table(Section::HitboxGroups)?;
        debug!("reading {} hitbox groups", n);
        let hitbox_groups: Vec<HitboxGroup> = read_array(&reader, offset, n)?;
        reader.set_hitbox_counts(hitbox_groups.iter().map(|g| g.hitboxes.len()).collect());

        let (offset, n) = table(Section::Objects)?;
        debug!("reading {} objects", n);
        let objects = read_array(&reader, offset, n)?;

        let collision_offset =
            optional_offset(header.collision_groups.offset(), RecordType::Header)?;
        let collision_count = count(header.collision_groups.count(), RecordType::Header)?;
        debug!("reading {} collision groups", collision_count);
        let collision_groups = read_array(&reader, collision_offset, collision_count)?;

        Ok(FmpDocument {
            version: header.version.get(),
            i_08: header.i_08.get(),
            i_12: header.i_12.get(),
            header_ints: header.header_ints.map(|i| i.get()),
            settings_a,
            settings_b,
            section1,
            section2,
            fragment_groups,
            objects,
            hitbox_groups,
            collision_groups,
        })
    }
}
