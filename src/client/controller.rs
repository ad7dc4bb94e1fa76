use std::collections::VecDeque;

use tokio::sync::mpsc;

use super::api::{Answers, CbtApi, FinishPayload, QuestionView, TestListing, TestResult, TestView};
use super::completion::CompletionLatch;
use super::progress::{ProgressStore, SavedProgress};

/// Hidden-window events that force a submission flagged as cheating.
pub const CHEATING_THRESHOLD: u32 = 3;

const OPTION_LABELS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    List,
    Test,
    Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    To(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Refresh,
    Open(String),
    Select(String),
    Navigate(Navigation),
    ConfirmFinish,
    Tick,
    VisibilityHidden,
    BackToList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Timeout,
    Cheating,
}

impl Trigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Timeout => "timeout",
            Self::Cheating => "cheating",
        }
    }
}

#[derive(Debug)]
struct ActiveTest {
    test: TestView,
    attempt_id: String,
    answers: Answers,
    current: usize,
    remaining_seconds: i64,
    violations: u32,
    timed_out: bool,
    /// Set at the violation threshold and kept across failed submissions.
    cheating: bool,
}

impl ActiveTest {
    fn current_question(&self) -> Option<&QuestionView> {
        self.test.questions.get(self.current)
    }

    /// A forced submission has been triggered; answers may no longer change.
    fn is_frozen(&self) -> bool {
        self.timed_out || self.cheating
    }

    fn is_last(&self) -> bool {
        self.current + 1 >= self.test.questions.len()
    }

    fn all_answered(&self) -> bool {
        self.test.questions.iter().all(|question| self.answers.contains_key(&question.index))
    }

    fn progress(&self) -> SavedProgress {
        SavedProgress {
            saved_answers: self.answers.clone(),
            saved_current_question_index: self.current,
        }
    }
}

/// Single-owner state machine for one student's test session.
pub struct SessionController<A, S> {
    api: A,
    store: S,
    phase: Phase,
    tests: Vec<TestListing>,
    active: Option<ActiveTest>,
    result: Option<TestResult>,
    notices: VecDeque<Notice>,
    loading: bool,
    latch: CompletionLatch,
}

impl<A: CbtApi, S: ProgressStore> SessionController<A, S> {
    pub fn new(api: A, store: S) -> Self {
        Self {
            api,
            store,
            phase: Phase::List,
            tests: Vec::new(),
            active: None,
            result: None,
            notices: VecDeque::new(),
            loading: false,
            latch: CompletionLatch::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tests(&self) -> &[TestListing] {
        &self.tests
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn result(&self) -> Option<&TestResult> {
        self.result.as_ref()
    }

    pub fn active_test(&self) -> Option<&TestView> {
        self.active.as_ref().map(|active| &active.test)
    }

    pub fn current_index(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.current)
    }

    pub fn current_question(&self) -> Option<&QuestionView> {
        self.active.as_ref().and_then(ActiveTest::current_question)
    }

    pub fn answers(&self) -> Option<&Answers> {
        self.active.as_ref().map(|active| &active.answers)
    }

    pub fn remaining_seconds(&self) -> Option<i64> {
        self.active.as_ref().map(|active| active.remaining_seconds)
    }

    pub fn violations(&self) -> u32 {
        self.active.as_ref().map_or(0, |active| active.violations)
    }

    pub fn is_frozen(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveTest::is_frozen)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push_back(notice);
    }

    pub async fn refresh_tests(&mut self) {
        self.loading = true;
        let fetched = self.api.visible_tests().await;
        self.loading = false;

        match fetched {
            Ok(tests) => self.tests = tests,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load visible tests");
                self.notify(Notice::Error(format!("Could not load tests: {err}")));
            }
        }
    }

    pub async fn open_test(&mut self, test_id: &str) {
        if self.phase != Phase::List {
            self.notify(Notice::Warning("Finish the current test first".to_string()));
            return;
        }

        self.loading = true;
        let started = self.api.start(test_id).await;
        self.loading = false;

        let started = match started {
            Ok(started) => started,
            Err(err) => {
                tracing::warn!(error = %err, test_id, "Failed to start test");
                self.notify(Notice::Error(format!("Could not open the test: {err}")));
                self.phase = Phase::List;
                return;
            }
        };

        let duration_seconds = i64::from(started.test.duration_minutes) * 60;
        let remaining_seconds = (duration_seconds - started.attempt.time_taken_seconds).max(0);

        let cached = match self.store.load(&started.test.id) {
            Ok(cached) => cached.unwrap_or_default(),
            Err(err) => {
                self.notify(Notice::Warning(format!("Saved progress could not be read: {err}")));
                SavedProgress::default()
            }
        };

        let mut answers = started.attempt.answers;
        answers.extend(cached.saved_answers);
        answers.retain(|index, label| {
            started.test.questions.iter().any(|question| question.index == *index)
                && OPTION_LABELS.contains(&label.as_str())
        });
        let current = cached
            .saved_current_question_index
            .min(started.test.questions.len().saturating_sub(1));

        self.latch.reset();
        self.result = None;
        self.active = Some(ActiveTest {
            test: started.test,
            attempt_id: started.attempt.id,
            answers,
            current,
            remaining_seconds,
            violations: 0,
            timed_out: remaining_seconds == 0,
            cheating: false,
        });
        self.phase = Phase::Test;

        if remaining_seconds == 0 {
            self.notify(Notice::Info("Time is up; submitting your answers".to_string()));
            self.submit(Trigger::Timeout).await;
        }
    }

    pub async fn select_option(&mut self, label: &str) {
        if self.phase != Phase::Test {
            return;
        }
        if !OPTION_LABELS.contains(&label) {
            self.notify(Notice::Warning(format!("Unknown option {label}")));
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.is_frozen() {
            self.notify(Notice::Warning(
                "Your test is being submitted; answers can no longer change".to_string(),
            ));
            return;
        }
        let Some(index) = active.current_question().map(|question| question.index) else {
            return;
        };

        active.answers.insert(index, label.to_string());
        let test_id = active.test.id.clone();
        let attempt_id = active.attempt_id.clone();
        self.persist();

        if let Err(err) = self.api.record_answer(&test_id, &attempt_id, index, label).await {
            tracing::debug!(error = %err, test_id = %test_id, "Answer sync failed");
            self.notify(Notice::Warning(format!(
                "Answer saved on this device but not on the server: {err}"
            )));
        }
    }

    pub fn go_to(&mut self, index: usize) {
        if self.phase != Phase::Test {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if index >= active.test.questions.len() {
            return;
        }
        active.current = index;
        self.persist();
    }

    pub fn next_question(&mut self) {
        if let Some(current) = self.current_index() {
            self.go_to(current + 1);
        }
    }

    pub fn previous_question(&mut self) {
        if let Some(current) = self.current_index() {
            if current > 0 {
                self.go_to(current - 1);
            }
        }
    }

    pub async fn confirm_finish(&mut self) {
        if self.phase != Phase::Test {
            return;
        }
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if !(active.is_frozen() || active.is_last() || active.all_answered()) {
            self.notify(Notice::Warning(
                "Answer every question or go to the last one before finishing".to_string(),
            ));
            return;
        }
        let trigger = if active.cheating {
            Trigger::Cheating
        } else if active.timed_out {
            Trigger::Timeout
        } else {
            Trigger::Manual
        };
        self.submit(trigger).await;
    }

    pub async fn tick(&mut self) {
        if self.phase != Phase::Test {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.timed_out {
            return;
        }

        active.remaining_seconds = (active.remaining_seconds - 1).max(0);
        if active.remaining_seconds > 0 {
            return;
        }
        active.timed_out = true;

        self.notify(Notice::Info("Time is up; submitting your answers".to_string()));
        self.submit(Trigger::Timeout).await;
    }

    pub async fn visibility_hidden(&mut self) {
        if self.phase != Phase::Test {
            return;
        }
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if active.cheating {
            return;
        }
        active.violations += 1;
        let violations = active.violations;

        if violations < CHEATING_THRESHOLD {
            self.notify(Notice::Warning(format!(
                "Leaving the test window is not allowed ({violations}/{CHEATING_THRESHOLD})"
            )));
        } else {
            active.cheating = true;
            self.notify(Notice::Warning(
                "You left the test window too many times; your test is being submitted"
                    .to_string(),
            ));
            self.submit(Trigger::Cheating).await;
        }
    }

    pub fn back_to_list(&mut self) {
        if self.phase != Phase::Result {
            return;
        }
        self.phase = Phase::List;
        self.result = None;
        self.active = None;
    }

    pub async fn handle(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Refresh => self.refresh_tests().await,
            SessionEvent::Open(test_id) => self.open_test(&test_id).await,
            SessionEvent::Select(label) => self.select_option(&label).await,
            SessionEvent::Navigate(Navigation::Next) => self.next_question(),
            SessionEvent::Navigate(Navigation::Previous) => self.previous_question(),
            SessionEvent::Navigate(Navigation::To(index)) => self.go_to(index),
            SessionEvent::ConfirmFinish => self.confirm_finish().await,
            SessionEvent::Tick => self.tick().await,
            SessionEvent::VisibilityHidden => self.visibility_hidden().await,
            SessionEvent::BackToList => self.back_to_list(),
        }
    }

    /// Processes events until every sender is dropped.
    pub async fn run(&mut self, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            self.handle(event).await;
        }
    }

    fn persist(&mut self) {
        let Some(active) = self.active.as_ref() else {
            return;
        };
        if let Err(err) = self.store.save(&active.test.id, &active.progress()) {
            self.notify(Notice::Warning(format!("Progress could not be saved locally: {err}")));
        }
    }

    async fn submit(&mut self, trigger: Trigger) {
        if !self.latch.try_begin() {
            return;
        }
        let Some(active) = self.active.as_ref() else {
            self.latch.release();
            return;
        };

        let test_id = active.test.id.clone();
        let attempt_id = active.attempt_id.clone();
        let payload =
            FinishPayload { cheating: active.cheating, answers: active.answers.clone() };

        self.loading = true;
        let finished = self.api.finish(&test_id, &attempt_id, &payload).await;
        self.loading = false;

        match finished {
            Ok(result) => {
                self.latch.seal();
                if let Err(err) = self.store.clear(&test_id) {
                    self.notify(Notice::Warning(format!(
                        "Saved progress could not be removed: {err}"
                    )));
                }
                tracing::info!(
                    test_id = %test_id,
                    attempt_id = %attempt_id,
                    trigger = trigger.as_str(),
                    percentage = result.percentage,
                    "Test submitted"
                );
                self.notify(Notice::Info(format!("Test submitted: {}%", result.percentage)));
                self.result = Some(result);
                self.phase = Phase::Result;
            }
            Err(err) => {
                self.latch.release();
                tracing::warn!(
                    error = %err,
                    test_id = %test_id,
                    trigger = trigger.as_str(),
                    "Submit failed"
                );
                self.notify(Notice::Error(format!(
                    "Could not submit your test: {err}. Your answers are kept; try again."
                )));
            }
        }
    }
}
