/*!
Conversions between host matrices and rigid-body poses.

The host stores column-major 4x4 matrices that may carry scale and are relative to the
parent node. The solver only knows unscaled absolute poses (isometries). This module holds
the math that moves a transform from one convention to the other:

- [`Decomposed::from_matrix`]: split a host world matrix into pose + per-axis scale
- [`scaled_matrix`]:           rebuild a host world matrix from a pose and a scale
- [`parent_relative`]:         express a world matrix relative to a parent world matrix
*/

use nalgebra as na;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Quat = na::UnitQuaternion<f32>;
pub type Iso = na::Isometry3<f32>;
pub type Mat4 = na::Matrix4<f32>;

/// A host world matrix split into translation, rotation and per-axis scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Decomposed {
    /// Decompose an affine matrix without shear.
    ///
    /// Scale is the length of each basis column; the rotation is what remains once the
    /// columns are normalized. A mirrored matrix (negative determinant) comes back with a
    /// negative X scale so the rotation stays proper. Returns `None` if any scale component
    /// is below `min_scale` in magnitude.
    pub fn from_matrix(m: &Mat4, min_scale: f32) -> Option<Self> {
        let basis = m.fixed_view::<3, 3>(0, 0);
        let mut scale = Vec3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );
        if scale.iter().any(|s| !(s.abs() >= min_scale)) {
            return None;
        }
        if basis.determinant() < 0.0 {
            scale.x = -scale.x;
        }

        let mut unscaled = basis.clone_owned();
        for (i, s) in scale.iter().enumerate() {
            unscaled.column_mut(i).unscale_mut(*s);
        }
        let rotation = Quat::from_rotation_matrix(&na::Rotation3::from_matrix_unchecked(unscaled));

        Some(Self {
            translation: Vec3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]),
            rotation,
            scale,
        })
    }

    /// The unscaled pose used as a body's world transform.
    #[inline]
    pub fn pose(&self) -> Iso {
        Iso::from_parts(na::Translation3::from(self.translation), self.rotation)
    }
}

/// Host world matrix of a body: rotation columns scaled by `scale`, translation unchanged.
pub fn scaled_matrix(pose: &Iso, scale: &Vec3) -> Mat4 {
    let basis = pose.rotation.to_rotation_matrix().into_inner() * na::Matrix3::from_diagonal(scale);
    let mut m = basis.to_homogeneous();
    m.fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&pose.translation.vector);
    m
}

/// Express `world` relative to `parent_world`, i.e. `parent_world⁻¹ · world`.
///
/// Returns `None` if the parent matrix is singular.
pub fn parent_relative(parent_world: &Mat4, world: &Mat4) -> Option<Mat4> {
    parent_world.try_inverse().map(|inv| inv * world)
}

/// Convert a column-major `[f32; 16]` into a matrix.
#[inline]
pub fn mat4_from_column_slice(values: &[f32; 16]) -> Mat4 {
    Mat4::from_column_slice(values)
}

/// Convert a matrix into a column-major `[f32; 16]`.
#[inline]
pub fn mat4_to_column_array(m: &Mat4) -> [f32; 16] {
    let mut out = [0.0; 16];
    out.copy_from_slice(m.as_slice());
    out
}
