//! Attachment markup → [`ShapeDescriptor`].
//!
//! Only one shape of attachment is recognized:
//!
//! ```xml
//! <Attachment type="GameEngine">
//!     <BulletPhysics shape="box" x="1" y="2" z="3" mass="5" kinematic="false"/>
//! </Attachment>
//! ```
//!
//! - `type`, `shape` and `kinematic` compare case-insensitively
//! - `shape="box"` reads half-extents `x`, `y`, `z`; `shape="sphere"` reads `radius`;
//!   anything else, or no `shape` at all, means the node's own mesh
//! - numbers parse leniently: the longest numeric prefix counts, garbage reads as 0
//! - `mass` defaults to `0.0`; `kinematic` is true for `true` or `1`

use crate::{
    constants::{ATTACHMENT_TAG, ATTACHMENT_TYPE, SHAPE_TAG},
    error::AttachmentError,
    shape::{ShapeDescriptor, ShapeKind},
    transform::Vec3,
};

/// Parse an attachment block into a shape descriptor.
pub fn parse_attachment(markup: &str) -> Result<ShapeDescriptor, AttachmentError> {
    let doc = roxmltree::Document::parse(markup).map_err(|e| AttachmentError::Markup {
        reason: e.to_string(),
    })?;

    let attachment = doc
        .descendants()
        .find(|n| n.has_tag_name(ATTACHMENT_TAG))
        .ok_or(AttachmentError::MissingAttachment {
            tag: ATTACHMENT_TAG,
        })?;

    let kind = attachment.attribute("type").unwrap_or("");
    if !kind.eq_ignore_ascii_case(ATTACHMENT_TYPE) {
        return Err(AttachmentError::ForeignType {
            found: kind.to_string(),
        });
    }

    let physics = attachment
        .children()
        .find(|n| n.has_tag_name(SHAPE_TAG))
        .ok_or(AttachmentError::MissingShape { tag: SHAPE_TAG })?;

    let number = |name: &str| parse_leading_float(physics.attribute(name).unwrap_or(""));

    let kind = match physics.attribute("shape") {
        Some(s) if s.eq_ignore_ascii_case("box") => ShapeKind::Box {
            half_extents: Vec3::new(number("x"), number("y"), number("z")),
        },
        Some(s) if s.eq_ignore_ascii_case("sphere") => ShapeKind::Sphere {
            radius: number("radius"),
        },
        _ => ShapeKind::Mesh,
    };

    let mass = parse_leading_float(physics.attribute("mass").unwrap_or("0.0"));
    if !mass.is_finite() || mass < 0.0 {
        return Err(AttachmentError::InvalidMass { mass });
    }

    let kinematic = physics.attribute("kinematic").unwrap_or("false");
    let kinematic = kinematic.eq_ignore_ascii_case("true") || kinematic == "1";

    Ok(ShapeDescriptor {
        kind,
        mass,
        kinematic,
    })
}

/// Parse the longest leading decimal number of `text`, `0.0` if there is none.
///
/// `" 2.5kg"` reads as `2.5`, `"1e3"` as `1000`, `"abc"` as `0`.
pub fn parse_leading_float(text: &str) -> f32 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &text[digits_start..end] == "." {
        return 0.0;
    }

    // Exponent only counts if at least one digit follows it.
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }

    text[..end].parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_attachment() {
        let desc = parse_attachment(
            r#"<Attachment type="GameEngine"><BulletPhysics shape="box" x="1" y="2" z="3" mass="5"/></Attachment>"#,
        )
        .unwrap();
        assert_eq!(
            desc.kind,
            ShapeKind::Box {
                half_extents: Vec3::new(1.0, 2.0, 3.0)
            }
        );
        assert_eq!(desc.mass, 5.0);
        assert!(!desc.kinematic);
    }

    #[test]
    fn sphere_attachment_is_case_insensitive() {
        let desc = parse_attachment(
            r#"<Attachment type="gameengine"><BulletPhysics shape="SPHERE" radius="2" mass="0" kinematic="TRUE"/></Attachment>"#,
        )
        .unwrap();
        assert_eq!(desc.kind, ShapeKind::Sphere { radius: 2.0 });
        assert_eq!(desc.mass, 0.0);
        assert!(desc.kinematic);
    }

    #[test]
    fn missing_or_unknown_shape_means_mesh() {
        for shape in ["", r#" shape="capsule""#] {
            let markup = format!(
                r#"<Attachment type="GameEngine"><BulletPhysics{shape} kinematic="1"/></Attachment>"#
            );
            let desc = parse_attachment(&markup).unwrap();
            assert_eq!(desc.kind, ShapeKind::Mesh);
            assert_eq!(desc.mass, 0.0);
            assert!(desc.kinematic);
        }
    }

    #[test]
    fn foreign_attachments_are_rejected() {
        let err = parse_attachment(
            r#"<Attachment type="Sound"><BulletPhysics shape="box"/></Attachment>"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AttachmentError::ForeignType {
                found: "Sound".into()
            }
        );

        let err = parse_attachment(r#"<Attachment type="GameEngine"><Sound/></Attachment>"#)
            .unwrap_err();
        assert_eq!(err, AttachmentError::MissingShape { tag: SHAPE_TAG });

        let err = parse_attachment("<Other/>").unwrap_err();
        assert_eq!(
            err,
            AttachmentError::MissingAttachment {
                tag: ATTACHMENT_TAG
            }
        );
    }

    #[test]
    fn malformed_markup_is_reported() {
        let err = parse_attachment(r#"<Attachment type="GameEngine">"#).unwrap_err();
        assert!(matches!(err, AttachmentError::Markup { .. }));
    }

    #[test]
    fn negative_mass_is_rejected() {
        let err = parse_attachment(
            r#"<Attachment type="GameEngine"><BulletPhysics shape="sphere" radius="1" mass="-2"/></Attachment>"#,
        )
        .unwrap_err();
        assert_eq!(err, AttachmentError::InvalidMass { mass: -2.0 });
    }

    #[test]
    fn lenient_numbers() {
        assert_eq!(parse_leading_float("2.5"), 2.5);
        assert_eq!(parse_leading_float("  -3kg"), -3.0);
        assert_eq!(parse_leading_float("1e3"), 1000.0);
        assert_eq!(parse_leading_float("4e"), 4.0);
        assert_eq!(parse_leading_float(".5"), 0.5);
        assert_eq!(parse_leading_float("7."), 7.0);
        assert_eq!(parse_leading_float("."), 0.0);
        assert_eq!(parse_leading_float("abc"), 0.0);
        assert_eq!(parse_leading_float(""), 0.0);
    }
}
