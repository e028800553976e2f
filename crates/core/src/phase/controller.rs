use std::collections::BTreeSet;
use std::time::Duration;

use thiserror::Error;

use crate::model::{LessonDocument, LessonError, MethodType, Section};
use crate::notification::NotificationDraft;
use crate::phase::event::{AwardReason, PhaseEvent};
use crate::phase::LessonPhase;
use crate::student::format_points;

/// Points for finishing the last learning section.
pub const LEARNING_COMPLETION_POINTS: u32 = 20;
/// Points for finishing the mastery activity.
pub const MASTERY_COMPLETION_POINTS: u32 = 30;
/// Pause between lesson completion and leaving the lesson view.
pub const FINISH_DELAY: Duration = Duration::from_secs(3);

const SCORE_EPSILON: f64 = 1e-9;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PhaseError {
    #[error("evaluation ends by recording results, not by advancing")]
    NoAdvanceInEvaluation,
    #[error("phase {0} is not available yet")]
    PhaseLocked(LessonPhase),
    #[error("evaluation results can only be recorded during the evaluation phase")]
    NotInEvaluation,
    #[error("lesson has no {0} evaluation method")]
    UnknownMethod(MethodType),
    #[error("score {score} is outside 0..={max} for the {method} method")]
    InvalidScore {
        method: MethodType,
        score: f64,
        max: f64,
    },
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Learner position within one lesson visit.
///
/// `section_index` is kept within the section range in every phase so that
/// returning to learning lands on a valid section.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseProgressState {
    pub phase: LessonPhase,
    pub section_index: usize,
    pub completed_methods: BTreeSet<MethodType>,
    pub accumulated_score: f64,
    pub finished: bool,
    awarded: BTreeSet<AwardReason>,
}

impl PhaseProgressState {
    fn new() -> Self {
        Self {
            phase: LessonPhase::Learning,
            section_index: 0,
            completed_methods: BTreeSet::new(),
            accumulated_score: 0.0,
            finished: false,
            awarded: BTreeSet::new(),
        }
    }
}

/// Read-only view of the controller, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseProgress {
    pub phase: LessonPhase,
    /// `(current, total)` with a 1-based current section, only while learning.
    pub section_position: Option<(usize, usize)>,
    pub learning_complete: bool,
    pub mastery_complete: bool,
    pub evaluation_complete: bool,
    pub completed_methods: Vec<MethodType>,
    pub accumulated_score: f64,
    pub finished: bool,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Sequences a learner through one lesson.
///
/// Every mutating operation returns the events it produced; the controller
/// itself performs no I/O.
#[derive(Debug, Clone)]
pub struct LessonController {
    lesson: LessonDocument,
    state: PhaseProgressState,
}

impl LessonController {
    /// Start a visit at the first learning section.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the document fails validation; no controller is created.
    pub fn start(lesson: LessonDocument) -> Result<Self, LessonError> {
        lesson.validate()?;
        Ok(Self {
            lesson,
            state: PhaseProgressState::new(),
        })
    }

    #[must_use]
    pub fn lesson(&self) -> &LessonDocument {
        &self.lesson
    }

    #[must_use]
    pub fn state(&self) -> &PhaseProgressState {
        &self.state
    }

    #[must_use]
    pub fn current_phase(&self) -> LessonPhase {
        self.state.phase
    }

    #[must_use]
    pub fn section_index(&self) -> usize {
        self.state.section_index
    }

    /// The section on screen, while in the learning phase.
    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        if self.state.phase == LessonPhase::Learning {
            self.lesson.section(self.state.section_index)
        } else {
            None
        }
    }

    #[must_use]
    pub fn accumulated_score(&self) -> f64 {
        self.state.accumulated_score
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    fn last_section_index(&self) -> usize {
        self.lesson.section_count().saturating_sub(1)
    }

    /// Move forward one step.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::NoAdvanceInEvaluation` during evaluation.
    pub fn advance(&mut self) -> Result<Vec<PhaseEvent>, PhaseError> {
        let mut events = Vec::new();
        match self.state.phase {
            LessonPhase::Learning if self.state.section_index < self.last_section_index() => {
                self.state.section_index += 1;
                events.push(PhaseEvent::SectionChanged {
                    index: self.state.section_index,
                });
            }
            LessonPhase::Learning => {
                self.state.phase = LessonPhase::Mastery;
                events.push(PhaseEvent::PhaseEntered(LessonPhase::Mastery));
                if self.state.awarded.insert(AwardReason::LearningCompleted) {
                    events.push(PhaseEvent::PointsAwarded {
                        points: f64::from(LEARNING_COMPLETION_POINTS),
                        reason: AwardReason::LearningCompleted,
                    });
                    events.push(PhaseEvent::Notify(NotificationDraft::points(
                        "Lesson Completed!",
                        format!(
                            "+{LEARNING_COMPLETION_POINTS} points earned for completing the lesson"
                        ),
                    )));
                }
            }
            LessonPhase::Mastery => {
                self.state.phase = LessonPhase::Evaluation;
                events.push(PhaseEvent::PhaseEntered(LessonPhase::Evaluation));
                if self.state.awarded.insert(AwardReason::MasteryCompleted) {
                    events.push(PhaseEvent::PointsAwarded {
                        points: f64::from(MASTERY_COMPLETION_POINTS),
                        reason: AwardReason::MasteryCompleted,
                    });
                    events.push(PhaseEvent::Notify(NotificationDraft::points(
                        "Activity Completed!",
                        format!(
                            "+{MASTERY_COMPLETION_POINTS} points earned for completing the activity"
                        ),
                    )));
                }
            }
            LessonPhase::Evaluation => return Err(PhaseError::NoAdvanceInEvaluation),
        }
        Ok(events)
    }

    /// Move back one step. On the first section this asks to leave the lesson.
    pub fn retreat(&mut self) -> Vec<PhaseEvent> {
        match self.state.phase {
            LessonPhase::Learning if self.state.section_index > 0 => {
                self.state.section_index -= 1;
                vec![PhaseEvent::SectionChanged {
                    index: self.state.section_index,
                }]
            }
            LessonPhase::Learning => vec![PhaseEvent::ExitToTopic],
            LessonPhase::Mastery => {
                self.state.phase = LessonPhase::Learning;
                self.state.section_index = self.last_section_index();
                vec![
                    PhaseEvent::PhaseEntered(LessonPhase::Learning),
                    PhaseEvent::SectionChanged {
                        index: self.state.section_index,
                    },
                ]
            }
            LessonPhase::Evaluation => {
                self.state.phase = LessonPhase::Mastery;
                vec![PhaseEvent::PhaseEntered(LessonPhase::Mastery)]
            }
        }
    }

    /// Jump straight to a phase, e.g. from a route. Never awards points.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::PhaseLocked` if the phase cannot be entered yet.
    pub fn enter(&mut self, phase: LessonPhase) -> Result<Vec<PhaseEvent>, PhaseError> {
        if phase == self.state.phase {
            return Ok(Vec::new());
        }
        if !self.can_enter_phase(phase) {
            return Err(PhaseError::PhaseLocked(phase));
        }
        self.state.phase = phase;
        Ok(vec![PhaseEvent::PhaseEntered(phase)])
    }

    #[must_use]
    pub fn is_phase_complete(&self, phase: LessonPhase) -> bool {
        match phase {
            LessonPhase::Learning => {
                self.state.phase > LessonPhase::Learning
                    || self.state.section_index == self.last_section_index()
            }
            LessonPhase::Mastery => {
                self.state.phase == LessonPhase::Evaluation
                    || !self.state.completed_methods.is_empty()
            }
            LessonPhase::Evaluation => {
                let methods = self.lesson.methods();
                self.state.completed_methods.len() == methods.len()
                    && methods
                        .iter()
                        .all(|m| self.state.completed_methods.contains(&m.method_type()))
            }
        }
    }

    #[must_use]
    pub fn can_enter_phase(&self, phase: LessonPhase) -> bool {
        match phase {
            LessonPhase::Learning => true,
            LessonPhase::Mastery => {
                self.is_phase_complete(LessonPhase::Learning)
                    || self.state.phase > LessonPhase::Mastery
            }
            LessonPhase::Evaluation => {
                !self.state.completed_methods.is_empty()
                    || self.state.phase == LessonPhase::Evaluation
            }
        }
    }

    /// Record the score of one evaluation method.
    ///
    /// A method that was already recorded is ignored, as is every call after the
    /// lesson finished, so the finish sequence is emitted once.
    ///
    /// # Errors
    ///
    /// - `NotInEvaluation` outside the evaluation phase
    /// - `UnknownMethod` if the lesson has no method of that type
    /// - `InvalidScore` if the score is negative, not finite or above the method's points
    pub fn record_evaluation_result(
        &mut self,
        method: MethodType,
        score: f64,
    ) -> Result<Vec<PhaseEvent>, PhaseError> {
        if self.state.finished {
            return Ok(Vec::new());
        }
        if self.state.phase != LessonPhase::Evaluation {
            return Err(PhaseError::NotInEvaluation);
        }
        let max = self
            .lesson
            .method(method)
            .ok_or(PhaseError::UnknownMethod(method))?
            .points();
        if !score.is_finite() || score < 0.0 || score > max + SCORE_EPSILON {
            return Err(PhaseError::InvalidScore { method, score, max });
        }
        if self.state.completed_methods.contains(&method) {
            return Ok(Vec::new());
        }

        let score = score.min(max);
        self.state.completed_methods.insert(method);
        self.state.accumulated_score += score;
        let mut events = vec![PhaseEvent::MethodCompleted { method, score }];

        if self.state.completed_methods.len() == self.lesson.methods().len() {
            self.state.finished = true;
            let total = self.state.accumulated_score;
            events.push(PhaseEvent::PointsAwarded {
                points: total,
                reason: AwardReason::LessonFinished,
            });
            events.push(PhaseEvent::Notify(NotificationDraft::points(
                "Evaluation Complete!",
                format!("+{} points earned in the evaluation", format_points(total)),
            )));
            events.push(PhaseEvent::LessonFinished {
                total,
                leave_after: FINISH_DELAY,
            });
        }

        Ok(events)
    }

    #[must_use]
    pub fn progress(&self) -> PhaseProgress {
        let section_position = (self.state.phase == LessonPhase::Learning)
            .then(|| (self.state.section_index + 1, self.lesson.section_count()));
        PhaseProgress {
            phase: self.state.phase,
            section_position,
            learning_complete: self.is_phase_complete(LessonPhase::Learning),
            mastery_complete: self.is_phase_complete(LessonPhase::Mastery),
            evaluation_complete: self.is_phase_complete(LessonPhase::Evaluation),
            completed_methods: self.state.completed_methods.iter().copied().collect(),
            accumulated_score: self.state.accumulated_score,
            finished: self.state.finished,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AiMethod, ContentType, EvaluationMethod, ExperienceTag, LessonId, QuizMethod, Section,
        SupportedInput,
    };

    fn build_lesson(sections: usize) -> LessonDocument {
        let sections = (0..sections)
            .map(|i| {
                Section::new(
                    format!("s{i}"),
                    ContentType::Text,
                    format!("Section {i}"),
                    ExperienceTag::Explanation,
                    "gravity basics",
                )
            })
            .collect();
        LessonDocument::new(
            LessonId::new("introduction-to-gravity").unwrap(),
            "Introduction to Gravity",
            sections,
            "Drop a paper ball and a marble.",
            vec![
                EvaluationMethod::Quiz(QuizMethod::new(50.0, "[text]\nWhat is g?\nR:= 9.8")),
                EvaluationMethod::Ai(AiMethod::new(
                    50.0,
                    "Tell me about your experiment",
                    "falling objects",
                    [SupportedInput::Text, SupportedInput::Image],
                )),
            ],
        )
        .unwrap()
    }

    fn awards(events: &[PhaseEvent]) -> Vec<f64> {
        events.iter().filter_map(PhaseEvent::awarded_points).collect()
    }

    fn to_evaluation(ctrl: &mut LessonController) {
        while ctrl.current_phase() != LessonPhase::Evaluation {
            ctrl.advance().unwrap();
        }
    }

    #[test]
    fn three_advances_reach_mastery_with_one_award() {
        let mut ctrl = LessonController::start(build_lesson(3)).unwrap();

        let first = ctrl.advance().unwrap();
        assert_eq!(ctrl.current_phase(), LessonPhase::Learning);
        assert!(awards(&first).is_empty());

        let second = ctrl.advance().unwrap();
        assert_eq!(ctrl.current_phase(), LessonPhase::Learning);
        assert_eq!(ctrl.section_index(), 2);
        assert!(awards(&second).is_empty());

        let third = ctrl.advance().unwrap();
        assert_eq!(ctrl.current_phase(), LessonPhase::Mastery);
        assert_eq!(awards(&third), vec![20.0]);
        assert!(third.iter().any(|e| matches!(e, PhaseEvent::Notify(_))));
    }

    #[test]
    fn mastery_advance_awards_thirty() {
        let mut ctrl = LessonController::start(build_lesson(1)).unwrap();
        ctrl.advance().unwrap();
        let events = ctrl.advance().unwrap();
        assert_eq!(ctrl.current_phase(), LessonPhase::Evaluation);
        assert_eq!(awards(&events), vec![30.0]);
        assert_eq!(
            ctrl.advance().unwrap_err(),
            PhaseError::NoAdvanceInEvaluation
        );
    }

    #[test]
    fn repeated_transitions_award_once() {
        let mut ctrl = LessonController::start(build_lesson(2)).unwrap();
        ctrl.advance().unwrap();
        ctrl.advance().unwrap();
        ctrl.retreat();
        assert_eq!(ctrl.current_phase(), LessonPhase::Learning);
        let again = ctrl.advance().unwrap();
        assert_eq!(ctrl.current_phase(), LessonPhase::Mastery);
        assert!(awards(&again).is_empty());
    }

    #[test]
    fn retreat_walks_back_one_phase_at_a_time() {
        let mut ctrl = LessonController::start(build_lesson(2)).unwrap();
        assert_eq!(ctrl.retreat(), vec![PhaseEvent::ExitToTopic]);
        assert_eq!(ctrl.section_index(), 0);

        to_evaluation(&mut ctrl);
        ctrl.retreat();
        assert_eq!(ctrl.current_phase(), LessonPhase::Mastery);
        ctrl.retreat();
        assert_eq!(ctrl.current_phase(), LessonPhase::Learning);
        assert_eq!(ctrl.section_index(), 1);
        ctrl.retreat();
        assert_eq!(ctrl.section_index(), 0);
    }

    #[test]
    fn section_index_stays_in_range_for_every_learning_sequence() {
        for sections in 1..=4 {
            for len in 0..=8_u32 {
                for mask in 0..(1_u32 << len) {
                    let mut ctrl = LessonController::start(build_lesson(sections)).unwrap();
                    for step in 0..len {
                        if mask & (1 << step) == 0 {
                            ctrl.advance().unwrap();
                        } else {
                            ctrl.retreat();
                        }
                        if ctrl.current_phase() != LessonPhase::Learning {
                            break;
                        }
                        assert!(ctrl.section_index() < sections);
                    }
                }
            }
        }
    }

    #[test]
    fn completion_and_access_are_derived() {
        let mut ctrl = LessonController::start(build_lesson(2)).unwrap();
        assert!(!ctrl.is_phase_complete(LessonPhase::Learning));
        assert!(ctrl.can_enter_phase(LessonPhase::Learning));
        assert!(!ctrl.can_enter_phase(LessonPhase::Mastery));
        assert!(!ctrl.can_enter_phase(LessonPhase::Evaluation));

        ctrl.advance().unwrap();
        assert!(ctrl.is_phase_complete(LessonPhase::Learning));
        assert!(ctrl.can_enter_phase(LessonPhase::Mastery));

        to_evaluation(&mut ctrl);
        assert!(ctrl.is_phase_complete(LessonPhase::Mastery));
        assert!(ctrl.can_enter_phase(LessonPhase::Evaluation));

        ctrl.retreat();
        assert!(!ctrl.is_phase_complete(LessonPhase::Mastery));
        assert!(!ctrl.can_enter_phase(LessonPhase::Evaluation));
        assert_eq!(
            ctrl.enter(LessonPhase::Evaluation).unwrap_err(),
            PhaseError::PhaseLocked(LessonPhase::Evaluation)
        );
    }

    #[test]
    fn queries_do_not_mutate_state() {
        let mut ctrl = LessonController::start(build_lesson(2)).unwrap();
        ctrl.advance().unwrap();
        let before = ctrl.state().clone();
        for phase in LessonPhase::ALL {
            let _ = ctrl.is_phase_complete(phase);
            let _ = ctrl.can_enter_phase(phase);
        }
        let _ = ctrl.progress();
        assert_eq!(ctrl.state(), &before);
    }

    #[test]
    fn finishing_both_methods_triggers_finish_once() {
        let mut ctrl = LessonController::start(build_lesson(1)).unwrap();
        to_evaluation(&mut ctrl);

        let quiz = ctrl.record_evaluation_result(MethodType::Quiz, 40.0).unwrap();
        assert_eq!(
            quiz,
            vec![PhaseEvent::MethodCompleted {
                method: MethodType::Quiz,
                score: 40.0
            }]
        );
        assert!(ctrl.is_phase_complete(LessonPhase::Mastery));
        assert!(!ctrl.is_phase_complete(LessonPhase::Evaluation));

        let ai = ctrl.record_evaluation_result(MethodType::Ai, 50.0).unwrap();
        assert_eq!(ctrl.accumulated_score(), 90.0);
        assert!(ctrl.is_phase_complete(LessonPhase::Evaluation));
        assert_eq!(awards(&ai), vec![90.0]);
        let finishes = ai
            .iter()
            .filter(|e| matches!(e, PhaseEvent::LessonFinished { .. }))
            .count();
        assert_eq!(finishes, 1);
        assert!(ai.contains(&PhaseEvent::LessonFinished {
            total: 90.0,
            leave_after: Duration::from_secs(3)
        }));

        assert!(ctrl.record_evaluation_result(MethodType::Ai, 50.0).unwrap().is_empty());
        assert_eq!(ctrl.accumulated_score(), 90.0);
    }

    #[test]
    fn recompleting_a_method_does_not_inflate() {
        let mut ctrl = LessonController::start(build_lesson(1)).unwrap();
        to_evaluation(&mut ctrl);

        ctrl.record_evaluation_result(MethodType::Quiz, 10.0).unwrap();
        let again = ctrl.record_evaluation_result(MethodType::Quiz, 50.0).unwrap();
        assert!(again.is_empty());
        assert_eq!(ctrl.state().completed_methods.len(), 1);
        assert_eq!(ctrl.accumulated_score(), 10.0);
        assert!(!ctrl.is_phase_complete(LessonPhase::Evaluation));
    }

    #[test]
    fn rejects_out_of_phase_and_invalid_scores() {
        let mut ctrl = LessonController::start(build_lesson(1)).unwrap();
        assert_eq!(
            ctrl.record_evaluation_result(MethodType::Quiz, 1.0)
                .unwrap_err(),
            PhaseError::NotInEvaluation
        );
        to_evaluation(&mut ctrl);
        assert!(matches!(
            ctrl.record_evaluation_result(MethodType::Quiz, 51.0),
            Err(PhaseError::InvalidScore { .. })
        ));
        assert!(matches!(
            ctrl.record_evaluation_result(MethodType::Quiz, f64::NAN),
            Err(PhaseError::InvalidScore { .. })
        ));
    }

    #[test]
    fn progress_reports_section_position() {
        let mut ctrl = LessonController::start(build_lesson(3)).unwrap();
        ctrl.advance().unwrap();
        let progress = ctrl.progress();
        assert_eq!(progress.section_position, Some((2, 3)));
        assert_eq!(progress.phase, LessonPhase::Learning);
        assert!(ctrl.current_section().is_some());

        to_evaluation(&mut ctrl);
        assert_eq!(ctrl.progress().section_position, None);
        assert!(ctrl.current_section().is_none());
    }
}
