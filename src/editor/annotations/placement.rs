use super::{AnnotationKind, CanvasSize, Point};

/// Keeps an annotation's anchor point inside the canvas.
///
/// Text anchors are offsets from the canvas center, emoji anchors are top-left
/// placement points, so each kind clamps against its own coordinate frame. When the
/// canvas size is not known yet the position passes through unchanged. Returns
/// `None` for non-finite input.
pub fn clamp_position(
    kind: AnnotationKind,
    position: Point,
    canvas: CanvasSize,
) -> Option<Point> {
    if !position.is_finite() {
        return None;
    }
    if !canvas.is_usable() {
        return Some(position);
    }

    let clamped = match kind {
        AnnotationKind::Text => {
            let half_width = canvas.width / 2.0;
            let half_height = canvas.height / 2.0;
            Point::new(
                position.x.clamp(-half_width, half_width),
                position.y.clamp(-half_height, half_height),
            )
        }
        AnnotationKind::Emoji => Point::new(
            position.x.clamp(0.0, canvas.width),
            position.y.clamp(0.0, canvas.height),
        ),
    };
    Some(clamped)
}
