mod helpers;
mod student;
mod teacher;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(teacher::create_test).get(teacher::list_tests))
        .route("/visible", get(student::list_visible))
        .route("/:test_id", get(teacher::get_test).delete(teacher::delete_test))
        .route("/:test_id/attempts", get(teacher::list_results))
        .route("/:test_id/start", post(student::start))
        .route("/:test_id/attempt/:attempt_id", get(student::get_attempt))
        .route("/:test_id/attempt/:attempt_id/answer", post(student::answer))
        .route("/:test_id/attempt/:attempt_id/finish", post(student::finish))
}
