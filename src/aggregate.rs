use crate::models::{Candidate, ColorLabel, DetectionResult};
use std::collections::BTreeMap;

/// Tally candidates by color.
///
/// Only labels that were actually observed appear in the counts.
pub fn aggregate(candidates: Vec<Candidate>) -> DetectionResult {
    let mut color_counts: BTreeMap<ColorLabel, usize> = BTreeMap::new();
    for candidate in &candidates {
        *color_counts.entry(candidate.color.clone()).or_insert(0) += 1;
    }
    DetectionResult::from_parts(color_counts, candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn candidate(id: u32, color: ColorLabel) -> Candidate {
        Candidate {
            id,
            bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0).unwrap(),
            confidence: 0.9,
            color,
            center: None,
            source_class: "thread_roll".to_string(),
        }
    }

    #[test]
    fn counts_sum_to_total() {
        let result = aggregate(vec![
            candidate(1, ColorLabel::pink()),
            candidate(2, ColorLabel::yellow()),
            candidate(3, ColorLabel::pink()),
        ]);

        assert_eq!(result.total_count(), 3);
        assert_eq!(result.count_of(&ColorLabel::pink()), 2);
        assert_eq!(result.count_of(&ColorLabel::yellow()), 1);
        assert_eq!(result.color_counts().values().sum::<usize>(), 3);
        assert!(!result.color_counts().contains_key(&ColorLabel::white()));
    }

    #[test]
    fn empty_input_is_a_valid_result() {
        let result = aggregate(Vec::new());
        assert_eq!(result.total_count(), 0);
        assert!(result.color_counts().is_empty());
    }
}
