use glam::{Affine3A, Vec3, Vec3A};

use crate::{binary_utils::ByteCursor, writer::Writer, Result};

/// 4x3 affine matrix as stored on disk: three basis rows followed by the translation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix {
    pub rows: [[f32; 3]; 4],
}

impl Matrix {
    pub const SIZE: usize = 48;

    pub const IDENTITY: Self = Self {
        rows: [
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0],
        ],
    };

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        let mut matrix = Self::IDENTITY;
        matrix.rows[3] = translation.to_array();
        matrix
    }

    #[must_use]
    pub fn from_affine(affine: Affine3A) -> Self {
        let m = affine.matrix3;
        Self {
            rows: [
                m.x_axis.to_array(),
                m.y_axis.to_array(),
                m.z_axis.to_array(),
                affine.translation.to_array(),
            ],
        }
    }

    #[must_use]
    pub fn to_affine(&self) -> Affine3A {
        let [x, y, z, t] = self.rows;
        Affine3A::from_cols(
            Vec3A::from(x),
            Vec3A::from(y),
            Vec3A::from(z),
            Vec3A::from(t),
        )
    }

    #[must_use]
    pub fn translation(&self) -> Vec3 {
        Vec3::from(self.rows[3])
    }

    pub(crate) fn read(cursor: &mut ByteCursor) -> Result<Self> {
        Ok(Self {
            rows: [cursor.f32s()?, cursor.f32s()?, cursor.f32s()?, cursor.f32s()?],
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer) {
        for row in &self.rows {
            writer.write_f32s(row);
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}
