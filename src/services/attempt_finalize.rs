use anyhow::{anyhow, Context, Result};
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::core::metrics;
use crate::db::models::{AnswerMap, Attempt, CbtTest};
use crate::db::types::{AttemptStatus, FinishReason};
use crate::repositories;
use crate::services::attempt_timing::AttemptClock;
use crate::services::scoring::{self, is_option_label, Score};

#[derive(Debug)]
pub(crate) struct FinishOutcome {
    pub(crate) attempt: Attempt,
    pub(crate) score: Score,
    /// False when the attempt had already been finished by someone else.
    pub(crate) newly_finished: bool,
}

pub(crate) struct FinishRequest<'a> {
    pub(crate) submitted_answers: Option<&'a AnswerMap>,
    pub(crate) cheating: bool,
    pub(crate) reason: FinishReason,
    pub(crate) now: PrimitiveDateTime,
    pub(crate) grace_seconds: u64,
}

/// Overlays client answers on the stored ones, dropping unknown indices and labels.
pub(crate) fn merge_answers(
    stored: &AnswerMap,
    submitted: Option<&AnswerMap>,
    question_count: usize,
) -> AnswerMap {
    let mut merged: AnswerMap = stored
        .iter()
        .filter(|(index, _)| (**index as usize) < question_count)
        .map(|(index, label)| (*index, label.clone()))
        .collect();

    for (index, label) in submitted.into_iter().flatten() {
        if (*index as usize) < question_count && is_option_label(label) {
            merged.insert(*index, label.clone());
        }
    }

    merged
}

pub(crate) fn stored_score(attempt: &Attempt) -> Option<Score> {
    Some(Score {
        correct: attempt.correct_count?,
        total: attempt.total_questions?,
        percentage: attempt.percentage?,
    })
}

pub(crate) async fn finish_attempt(
    pool: &PgPool,
    test: &CbtTest,
    attempt: &Attempt,
    request: FinishRequest<'_>,
) -> Result<FinishOutcome> {
    if attempt.status == AttemptStatus::Finished {
        return already_finished(attempt.clone());
    }

    let clock = AttemptClock::new(attempt.started_at, test.duration_minutes)
        .map_err(|e| anyhow!("Invalid test duration: {e}"))?;

    // Past the grace window only answers recorded in time count.
    let accept_client = request.reason != FinishReason::Expired
        && clock.accepts_finish(request.now, request.grace_seconds);
    let submitted = if accept_client { request.submitted_answers } else { None };
    let answers = merge_answers(&attempt.answers.0, submitted, test.questions.0.len());

    let score = scoring::score(&test.questions.0, &answers).context("Failed to score attempt")?;
    let time_taken = clock.elapsed_seconds(request.now);

    let updated = repositories::attempts::finish(
        pool,
        &attempt.id,
        repositories::attempts::FinishAttempt {
            answers: &answers,
            time_taken_seconds: i32::try_from(time_taken).unwrap_or(i32::MAX),
            percentage: score.percentage,
            correct_count: score.correct,
            total_questions: score.total,
            cheating: request.cheating,
            finished_at: request.now,
        },
    )
    .await
    .context("Failed to finish attempt")?;

    let Some(updated) = updated else {
        let current = repositories::attempts::find_by_id(pool, &attempt.id)
            .await
            .context("Failed to reload attempt")?
            .ok_or_else(|| anyhow!("Attempt disappeared during finish"))?;
        return already_finished(current);
    };

    metrics::attempt_finished(request.reason.as_str(), score.percentage);
    tracing::info!(
        attempt_id = %updated.id,
        test_id = %updated.test_id,
        student_id = %updated.student_id,
        reason = request.reason.as_str(),
        percentage = score.percentage,
        correct = score.correct,
        total = score.total,
        cheating = request.cheating,
        time_taken_seconds = time_taken,
        "Attempt finished"
    );

    Ok(FinishOutcome { attempt: updated, score, newly_finished: true })
}

fn already_finished(attempt: Attempt) -> Result<FinishOutcome> {
    let score =
        stored_score(&attempt).ok_or_else(|| anyhow!("Finished attempt {} has no score", attempt.id))?;
    Ok(FinishOutcome { attempt, score, newly_finished: false })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(u32, &str)]) -> AnswerMap {
        pairs.iter().map(|(index, label)| (*index, label.to_string())).collect()
    }

    #[test]
    fn submitted_answers_overlay_stored() {
        let stored = map(&[(0, "A"), (1, "B")]);
        let submitted = map(&[(1, "C"), (2, "D")]);

        assert_eq!(merge_answers(&stored, Some(&submitted), 3), map(&[(0, "A"), (1, "C"), (2, "D")]));
    }

    #[test]
    fn invalid_submissions_are_dropped() {
        let stored = map(&[(0, "A")]);
        let submitted = map(&[(0, "Z"), (1, "b"), (9, "C")]);

        assert_eq!(merge_answers(&stored, Some(&submitted), 3), map(&[(0, "A")]));
    }

    #[test]
    fn stored_answers_outside_the_test_are_ignored() {
        let stored = map(&[(0, "A"), (4, "B")]);
        assert_eq!(merge_answers(&stored, None, 2), map(&[(0, "A")]));
    }
}
