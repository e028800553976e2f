use std::time::Duration;

use crate::model::MethodType;
use crate::notification::NotificationDraft;
use crate::phase::LessonPhase;

/// Why points were awarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AwardReason {
    LearningCompleted,
    MasteryCompleted,
    LessonFinished,
}

/// Side effect produced by a controller operation, in emission order.
///
/// The controller never performs these itself; the owning session dispatches
/// them to the student-record service, the notification sink and navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseEvent {
    SectionChanged { index: usize },
    PhaseEntered(LessonPhase),
    PointsAwarded { points: f64, reason: AwardReason },
    Notify(NotificationDraft),
    /// Back was pressed on the first section: leave for the parent topic.
    ExitToTopic,
    MethodCompleted { method: MethodType, score: f64 },
    /// Every evaluation method is done. Leave the lesson view after `leave_after`.
    LessonFinished { total: f64, leave_after: Duration },
}

impl PhaseEvent {
    #[must_use]
    pub fn awarded_points(&self) -> Option<f64> {
        match self {
            PhaseEvent::PointsAwarded { points, .. } => Some(*points),
            _ => None,
        }
    }
}
