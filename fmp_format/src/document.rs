use fmp_uncased::AsUncased;

use crate::{
    CollisionGroup, FormatVersion, FragmentGroup, HitboxGroup, Object, Section1, Section2,
    SettingsA, SettingsB,
};

/// In-memory model of a whole fmp file, every offset resolved.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FmpDocument {
    pub version: i32,
    pub i_08: i32,
    pub i_12: i32,
    /// The last two ints of the header. The first two locate the collision groups.
    pub header_ints: [i32; 2],
    pub settings_a: SettingsA,
    pub settings_b: SettingsB,
    pub section1: Vec<Section1>,
    pub section2: Vec<Section2>,
    pub fragment_groups: Vec<FragmentGroup>,
    pub objects: Vec<Object>,
    pub hitbox_groups: Vec<HitboxGroup>,
    pub collision_groups: Vec<CollisionGroup>,
}

impl FmpDocument {
    /// Creates an empty document of the given version.
    #[must_use]
    pub fn new(version: i32) -> Self {
        Self {
            version,
            i_08: 0,
            i_12: 0,
            header_ints: [0; 2],
            settings_a: SettingsA::default(),
            settings_b: SettingsB::default(),
            section1: Vec::new(),
            section2: Vec::new(),
            fragment_groups: Vec::new(),
            objects: Vec::new(),
            hitbox_groups: Vec::new(),
            collision_groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn format_version(&self) -> FormatVersion {
        FormatVersion::from_version(self.version)
    }

    /// Finds an object by name, ignoring ascii case.
    #[must_use]
    pub fn find_object(&self, name: &str) -> Option<usize> {
        self.objects
            .iter()
            .position(|object| object.name.as_uncased() == name.as_uncased())
    }

    /// Finds a collision group by name, ignoring ascii case.
    #[must_use]
    pub fn find_collision_group(&self, name: &str) -> Option<usize> {
        self.collision_groups
            .iter()
            .position(|group| group.name.as_uncased() == name.as_uncased())
    }
}
