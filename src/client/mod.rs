//! Student-side driver for the timed test flow.
//!
//! [`controller::SessionController`] owns one student's session: it lists
//! visible tests, starts or resumes an attempt, keeps answers in a
//! [`progress::ProgressStore`], counts the clock down and submits exactly once
//! through [`api::CbtApi`].

pub mod api;
pub mod completion;
pub mod controller;
pub mod countdown;
pub mod progress;

pub use api::{CbtApi, ClientError, HttpCbtApi};
pub use completion::CompletionLatch;
pub use controller::{Navigation, Notice, Phase, SessionController, SessionEvent, CHEATING_THRESHOLD};
pub use progress::{FileProgressStore, MemoryProgressStore, ProgressStore, SavedProgress};
