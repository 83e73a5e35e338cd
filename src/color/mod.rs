pub mod classifier;
pub mod hsv;
pub mod kmeans;
pub mod rules;

pub use classifier::{ColorClassifier, ColorReading, sample_pixels};
pub use hsv::{Hsv, rgb_to_hsv};
pub use rules::{ColorRule, ColorRuleTable, default_rules};
