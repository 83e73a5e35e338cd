use crate::models::{BoundingBox, LocatedCandidate};

/// Point-in-holder test. Without a holder every point is inside.
pub fn inside(point: (f32, f32), holder: Option<&BoundingBox>) -> bool {
    match holder {
        Some(bbox) => bbox.contains(point.0, point.1),
        None => true,
    }
}

/// Keep candidates whose anchor point lies within the holder
pub fn retain_inside(
    candidates: Vec<LocatedCandidate>,
    holder: Option<&BoundingBox>,
) -> Vec<LocatedCandidate> {
    if holder.is_none() {
        return candidates;
    }
    candidates
        .into_iter()
        .filter(|c| inside(c.anchor(), holder))
        .collect()
}
