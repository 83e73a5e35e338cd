//! Ordered HSV rule table.
//!
//! Rules are checked in ascending `priority` and the first rule whose
//! H, S and V bounds all contain the color decides the label. Several
//! default bands overlap (bright yellow and orange_brown share hues
//! 17-25), so reordering the table changes results.

use super::hsv::Hsv;
use crate::error::{Error, Result};
use crate::models::ColorLabel;
use serde::{Deserialize, Serialize};

/// One inclusive HSV box mapped to a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub label: ColorLabel,
    pub lower: Hsv,
    pub upper: Hsv,
    pub priority: u32,
}

impl ColorRule {
    pub fn new(label: ColorLabel, lower: Hsv, upper: Hsv, priority: u32) -> Self {
        Self {
            label,
            lower,
            upper,
            priority,
        }
    }

    pub fn matches(&self, hsv: Hsv) -> bool {
        (self.lower.h..=self.upper.h).contains(&hsv.h)
            && (self.lower.s..=self.upper.s).contains(&hsv.s)
            && (self.lower.v..=self.upper.v).contains(&hsv.v)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let (lo, hi) = (self.lower, self.upper);
        if lo.h > hi.h || lo.s > hi.s || lo.v > hi.v || hi.h > 180 {
            return Err(Error::invalid_config(
                format!("color.rules[{}]", self.label),
                format!("{:?}..{:?}", lo, hi),
            ));
        }
        Ok(())
    }
}

/// Rules sorted into evaluation order
#[derive(Debug, Clone)]
pub struct ColorRuleTable {
    rules: Vec<ColorRule>,
}

impl ColorRuleTable {
    /// Sort by priority; the sort is stable so ties keep list order
    pub fn new(mut rules: Vec<ColorRule>) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self { rules }
    }

    /// Label of the first matching rule, or `other`
    pub fn classify(&self, hsv: Hsv) -> ColorLabel {
        self.first_match(hsv)
            .map(|rule| rule.label.clone())
            .unwrap_or_else(ColorLabel::other)
    }

    pub fn first_match(&self, hsv: Hsv) -> Option<&ColorRule> {
        self.rules.iter().find(|rule| rule.matches(hsv))
    }

    pub fn rules(&self) -> &[ColorRule] {
        &self.rules
    }

    /// Distinct labels in evaluation order, `other` last
    pub fn labels(&self) -> Vec<ColorLabel> {
        let mut labels: Vec<ColorLabel> = Vec::new();
        for rule in &self.rules {
            if !labels.contains(&rule.label) {
                labels.push(rule.label.clone());
            }
        }
        labels.push(ColorLabel::other());
        labels
    }
}

impl Default for ColorRuleTable {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Rule table tuned for yellow, orange/brown, white and pink thread rolls.
///
/// Yellow is tested first so bright rolls in the 17-25 hue range are not
/// labelled orange_brown; orange_brown only claims the darker part
/// (V < 105) of that range.
pub fn default_rules() -> Vec<ColorRule> {
    let rule = |label: ColorLabel, lower: (u8, u8, u8), upper: (u8, u8, u8)| {
        (
            label,
            Hsv::new(lower.0, lower.1, lower.2),
            Hsv::new(upper.0, upper.1, upper.2),
        )
    };

    let table = [
        // bright yellow that reads orange-ish
        rule(ColorLabel::yellow(), (17, 10, 105), (25, 255, 255)),
        rule(ColorLabel::yellow(), (26, 10, 25), (35, 255, 255)),
        // yellow pushed to red hues by camera white balance
        rule(ColorLabel::yellow(), (170, 70, 170), (180, 255, 255)),
        rule(ColorLabel::orange_brown(), (8, 45, 60), (25, 255, 104)),
        rule(ColorLabel::white(), (0, 0, 180), (180, 50, 255)),
        // pink, red side of the hue wrap
        rule(ColorLabel::pink(), (165, 60, 85), (180, 255, 169)),
        rule(ColorLabel::pink(), (0, 60, 85), (7, 255, 169)),
        rule(ColorLabel::pink(), (140, 60, 115), (164, 255, 169)),
        // darker, less saturated pink
        rule(ColorLabel::pink(), (140, 45, 110), (180, 255, 169)),
        rule(ColorLabel::orange(), (5, 100, 100), (20, 255, 255)),
    ];

    table
        .into_iter()
        .enumerate()
        .map(|(rank, (label, lower, upper))| {
            ColorRule::new(label, lower, upper, rank as u32 + 1)
        })
        .collect()
}
