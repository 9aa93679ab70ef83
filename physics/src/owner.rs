/// Packed value stored in a rigid body's `user_data`, identifying the host node that owns it.
///
/// # Bit layout
/// `user_data` is a `u128` (least-significant bit = bit 0):
///
/// - bits 0..=31   : host node id (`i32`, stored as its two's-complement bits)
/// - bits 32..=39  : [`BodyOwnerKind`] tag (u8)
/// - bits 40..=127 : reserved (must be zero)
///
/// The kind tag keeps a zero `user_data` (bodies created by someone else) from being
/// mistaken for host node 0.
pub type BodyOwner = u128;

use crate::scene::NodeId;

const HOST_BITS: u32 = u32::BITS;

/// Discriminator for who created a body.
///
/// The numeric values are part of the packed format. Do not reorder or reuse them.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BodyOwnerKind {
    /// Body created for a host scene node by this crate.
    SceneNode = 1,
}

/// Packs a host node id into a body owner value.
pub fn pack_body_owner(host: NodeId) -> BodyOwner {
    (host as u32 as u128) | ((BodyOwnerKind::SceneNode as u128) << HOST_BITS)
}

/// Extracts the host node id, or `None` if the value was not produced by [`pack_body_owner`].
pub fn unpack_body_owner(owner: BodyOwner) -> Option<NodeId> {
    const RESERVED_MASK: u128 = !0u128 << 40;
    const KIND_MASK: u128 = u8::MAX as u128;

    if owner & RESERVED_MASK != 0 {
        return None;
    }
    match ((owner >> HOST_BITS) & KIND_MASK) as u8 {
        1u8 => Some((owner & u32::MAX as u128) as u32 as NodeId),
        _ => None,
    }
}
