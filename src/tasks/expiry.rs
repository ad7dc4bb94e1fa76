use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::types::FinishReason;
use crate::repositories;
use crate::services::attempt_finalize::{self, FinishRequest};

const SWEEP_BATCH: i64 = 200;

/// Finishes in-progress attempts whose deadline plus grace has passed, scoring
/// only the answers recorded in time. Returns how many this sweep finished.
pub(crate) async fn finish_overdue_attempts(state: &AppState) -> Result<usize> {
    let now = primitive_now_utc();
    let grace_seconds = state.settings().cbt().finish_grace_seconds;

    let ids = repositories::attempts::list_overdue_ids(state.db(), now, grace_seconds, SWEEP_BATCH)
        .await
        .context("Failed to list overdue attempts")?;

    let mut finished = 0;
    for attempt_id in ids {
        let Some(attempt) = repositories::attempts::find_by_id(state.db(), &attempt_id)
            .await
            .context("Failed to load overdue attempt")?
        else {
            continue;
        };
        let Some(test) = repositories::cbt_tests::find_by_id(state.db(), &attempt.test_id)
            .await
            .context("Failed to load test for overdue attempt")?
        else {
            continue;
        };

        let result = attempt_finalize::finish_attempt(
            state.db(),
            &test,
            &attempt,
            FinishRequest {
                submitted_answers: None,
                cheating: false,
                reason: FinishReason::Expired,
                now,
                grace_seconds,
            },
        )
        .await;

        match result {
            Ok(outcome) if outcome.newly_finished => finished += 1,
            Ok(_) => {}
            Err(err) => {
                tracing::error!(attempt_id = %attempt.id, error = %format!("{err:#}"), "Failed to expire attempt");
            }
        }
    }

    if finished > 0 {
        tracing::info!(finished, "Expired overdue attempts");
    }
    Ok(finished)
}
