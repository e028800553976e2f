use serde::{Deserialize, Serialize};

use crate::model::StudentId;

/// Points needed per level.
pub const POINTS_PER_LEVEL: u32 = 200;

/// Level for a point total: `floor(points / 200) + 1`.
#[must_use]
pub fn level_for_points(points: u32) -> u32 {
    points / POINTS_PER_LEVEL + 1
}

/// Whole points sent to the student record for a possibly fractional award.
///
/// Negative and non-finite amounts award nothing.
#[must_use]
pub fn award_to_whole_points(amount: f64) -> u32 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0;
    }
    let rounded = amount.round();
    if rounded >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        // In range and non-negative after the checks above.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = rounded as u32;
        whole
    }
}

/// Render a score for messages: whole numbers without decimals, otherwise one decimal.
#[must_use]
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{points:.0}")
    } else {
        format!("{points:.1}")
    }
}

/// Learner summary as shown in the header and scorecard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentSummary {
    pub id: StudentId,
    pub name: String,
    pub points: u32,
    pub level: u32,
}

impl StudentSummary {
    /// Build a summary, deriving the level from the point total.
    #[must_use]
    pub fn new(id: StudentId, name: impl Into<String>, points: u32) -> Self {
        Self {
            id,
            name: name.into(),
            points,
            level: level_for_points(points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_steps_every_two_hundred_points() {
        assert_eq!(level_for_points(0), 1);
        assert_eq!(level_for_points(199), 1);
        assert_eq!(level_for_points(200), 2);
        assert_eq!(level_for_points(850), 5);
    }

    #[test]
    fn summary_recomputes_level() {
        let summary = StudentSummary::new(StudentId::new(1), "Asha", 190);
        assert_eq!(summary.level, 1);
        let next = StudentSummary::new(StudentId::new(1), "Asha", 210);
        assert_eq!(next.level, 2);
    }

    #[test]
    fn awards_round_to_whole_points() {
        assert_eq!(award_to_whole_points(16.666), 17);
        assert_eq!(award_to_whole_points(90.0), 90);
        assert_eq!(award_to_whole_points(-3.0), 0);
        assert_eq!(award_to_whole_points(f64::NAN), 0);
    }

    #[test]
    fn formats_points_for_messages() {
        assert_eq!(format_points(90.0), "90");
        assert_eq!(format_points(16.666), "16.7");
    }
}
