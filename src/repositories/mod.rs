pub(crate) mod attempts;
pub(crate) mod attendance;
pub(crate) mod classes;
pub(crate) mod health;
pub(crate) mod schools;
pub(crate) mod users;
