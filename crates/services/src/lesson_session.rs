use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gurukul_core::model::{MethodType, StudentId};
use gurukul_core::notification::{NotificationDraft, NotificationKind};
use gurukul_core::phase::{AwardReason, LessonController, LessonPhase, PhaseEvent, PhaseProgress};
use gurukul_core::route::{LessonPath, LessonRoute};
use gurukul_core::student::{StudentSummary, award_to_whole_points};

use crate::content::LessonSource;
use crate::error::LessonSessionError;
use crate::notifications::NotificationSink;
use crate::students::StudentService;

//
// ─── STALE-RESULT GUARD ────────────────────────────────────────────────────────
//

/// Hands out load tickets; a result is only used if its ticket is still current.
///
/// Taking a new ticket or calling `cancel()` (the view went away) invalidates every
/// ticket handed out before.
#[derive(Debug, Clone, Default)]
pub struct LoadGuard {
    generation: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> LoadTicket {
        LoadTicket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

//
// ─── SESSION OUTPUT ────────────────────────────────────────────────────────────
//

/// Where the view should go after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Show this phase view.
    Phase(LessonRoute),
    /// Leave the lesson for the topic page now.
    Exit(String),
    /// Leave the lesson for the topic page after `delay`.
    ExitAfter { to: String, delay: Duration },
}

/// An award the student-record service did not confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAward {
    pub points: u32,
    pub reason: AwardReason,
}

/// What one session operation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub events: Vec<PhaseEvent>,
    pub navigation: Option<Navigation>,
    /// Set when a points update was confirmed.
    pub student: Option<StudentSummary>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Loads lessons and starts sessions for one student.
#[derive(Clone)]
pub struct LessonSessionService {
    source: Arc<dyn LessonSource>,
    students: StudentService,
    notifications: Arc<dyn NotificationSink>,
    student_id: StudentId,
}

impl LessonSessionService {
    #[must_use]
    pub fn new(
        source: Arc<dyn LessonSource>,
        students: StudentService,
        notifications: Arc<dyn NotificationSink>,
        student_id: StudentId,
    ) -> Self {
        Self {
            source,
            students,
            notifications,
            student_id,
        }
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    /// Load the lesson at `path` and start it at the first learning section.
    ///
    /// # Errors
    ///
    /// Returns `LessonSessionError::Content` if the lesson cannot be loaded.
    pub async fn start(&self, path: LessonPath) -> Result<LessonSession, LessonSessionError> {
        let lesson = self
            .source
            .fetch_lesson(&path.lesson)
            .await
            .inspect_err(|err| {
                tracing::warn!(lesson_id = %path.lesson, error = %err, "lesson load failed");
            })?;
        let controller = LessonController::start(lesson)?;
        tracing::info!(
            lesson_id = %path.lesson,
            student_id = %self.student_id,
            sections = controller.lesson().section_count(),
            "lesson started"
        );
        Ok(LessonSession {
            controller,
            path,
            students: self.students.clone(),
            notifications: Arc::clone(&self.notifications),
            student_id: self.student_id,
            pending: Vec::new(),
        })
    }

    /// Like [`start`](Self::start), but discards the result if `guard` moved on
    /// while the lesson was loading.
    ///
    /// # Errors
    ///
    /// Returns `LessonSessionError::Stale` for a cancelled load, otherwise as `start`.
    pub async fn start_guarded(
        &self,
        guard: &LoadGuard,
        path: LessonPath,
    ) -> Result<LessonSession, LessonSessionError> {
        let ticket = guard.ticket();
        let lesson_id = path.lesson.clone();
        let result = self.start(path).await;
        if !guard.is_current(ticket) {
            tracing::debug!(lesson_id = %lesson_id, "discarding stale lesson load");
            return Err(LessonSessionError::Stale);
        }
        result
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's pass through one lesson.
///
/// Wraps the phase controller and carries out its events: awards go to the
/// student-record service, notifications to the sink, and phase changes become
/// navigation.
pub struct LessonSession {
    controller: LessonController,
    path: LessonPath,
    students: StudentService,
    notifications: Arc<dyn NotificationSink>,
    student_id: StudentId,
    pending: Vec<PendingAward>,
}

impl LessonSession {
    #[must_use]
    pub fn controller(&self) -> &LessonController {
        &self.controller
    }

    #[must_use]
    pub fn path(&self) -> &LessonPath {
        &self.path
    }

    /// Route of the phase view currently shown.
    #[must_use]
    pub fn route(&self) -> LessonRoute {
        self.path.phase(self.controller.current_phase())
    }

    #[must_use]
    pub fn progress(&self) -> PhaseProgress {
        self.controller.progress()
    }

    #[must_use]
    pub fn pending_awards(&self) -> &[PendingAward] {
        &self.pending
    }

    /// # Errors
    ///
    /// Returns `PhaseError::NoAdvanceInEvaluation` during the evaluation phase.
    pub async fn advance(&mut self) -> Result<SessionUpdate, LessonSessionError> {
        let events = self.controller.advance()?;
        Ok(self.dispatch(events).await)
    }

    pub async fn retreat(&mut self) -> SessionUpdate {
        let events = self.controller.retreat();
        self.dispatch(events).await
    }

    /// Jump to a phase the learner has unlocked.
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::PhaseLocked` if the phase is not unlocked yet.
    pub async fn enter(&mut self, phase: LessonPhase) -> Result<SessionUpdate, LessonSessionError> {
        let events = self.controller.enter(phase)?;
        Ok(self.dispatch(events).await)
    }

    /// # Errors
    ///
    /// Returns the controller's `PhaseError` for out-of-phase, unknown or invalid results.
    pub async fn record_evaluation_result(
        &mut self,
        method: MethodType,
        score: f64,
    ) -> Result<SessionUpdate, LessonSessionError> {
        let events = self.controller.record_evaluation_result(method, score)?;
        Ok(self.dispatch(events).await)
    }

    /// Re-send awards the student-record service did not confirm.
    ///
    /// Each confirmed award is announced with a "Points saved" notice. Awards that
    /// fail again stay pending.
    pub async fn retry_pending_awards(&mut self) -> SessionUpdate {
        let pending = std::mem::take(&mut self.pending);
        let mut update = SessionUpdate::default();
        for award in pending {
            if let Some(summary) = self.sync_award(award).await {
                self.notifications.notify(NotificationDraft::points(
                    "Points saved",
                    format!("+{} points added to your total", award.points),
                ));
                update.student = Some(summary);
            }
        }
        update
    }

    async fn dispatch(&mut self, events: Vec<PhaseEvent>) -> SessionUpdate {
        let mut update = SessionUpdate::default();
        // Set while the last award is unconfirmed; its points notice is held back.
        let mut unsaved = false;
        for event in &events {
            match event {
                PhaseEvent::PointsAwarded { points, reason } => {
                    let award = PendingAward {
                        points: award_to_whole_points(*points),
                        reason: *reason,
                    };
                    unsaved = false;
                    if award.points > 0 {
                        match self.sync_award(award).await {
                            Some(summary) => update.student = Some(summary),
                            None => unsaved = true,
                        }
                    }
                }
                PhaseEvent::Notify(draft) if unsaved && draft.kind == NotificationKind::Points => {
                    tracing::debug!(title = %draft.title, "holding points notice until saved");
                }
                PhaseEvent::Notify(draft) => {
                    self.notifications.notify(draft.clone());
                }
                PhaseEvent::PhaseEntered(phase) => {
                    tracing::info!(lesson_id = %self.path.lesson, %phase, "phase entered");
                    update.navigation = Some(Navigation::Phase(self.path.phase(*phase)));
                }
                PhaseEvent::ExitToTopic => {
                    update.navigation = Some(Navigation::Exit(self.path.topic_path()));
                }
                PhaseEvent::LessonFinished { total, leave_after } => {
                    tracing::info!(lesson_id = %self.path.lesson, points = total, "lesson finished");
                    update.navigation = Some(Navigation::ExitAfter {
                        to: self.path.topic_path(),
                        delay: *leave_after,
                    });
                }
                PhaseEvent::SectionChanged { index } => {
                    tracing::debug!(lesson_id = %self.path.lesson, index, "section changed");
                }
                PhaseEvent::MethodCompleted { method, score } => {
                    tracing::debug!(lesson_id = %self.path.lesson, %method, score, "method completed");
                }
            }
        }
        update.events = events;
        update
    }

    /// Server first: on failure the award is kept for a retry and the learner is told.
    async fn sync_award(&mut self, award: PendingAward) -> Option<StudentSummary> {
        match self.students.add_points(self.student_id, award.points).await {
            Ok(summary) => Some(summary),
            Err(err) => {
                tracing::warn!(
                    student_id = %self.student_id,
                    points = award.points,
                    error = %err,
                    "points update failed"
                );
                self.notifications.notify(NotificationDraft::error(
                    "Points not saved",
                    format!(
                        "We couldn't save your {} points yet. We'll try again.",
                        award.points
                    ),
                ));
                self.pending.push(award);
                None
            }
        }
    }
}
