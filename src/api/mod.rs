pub(crate) mod admin;
pub(crate) mod attendance;
pub(crate) mod auth;
pub(crate) mod cbt;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod router;
pub(crate) mod validation;
