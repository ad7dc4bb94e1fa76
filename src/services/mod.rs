pub(crate) mod attempt_finalize;
pub(crate) mod attempt_timing;
pub(crate) mod attendance_codes;
pub(crate) mod geo;
pub(crate) mod question_order;
pub(crate) mod scoring;
