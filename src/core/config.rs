mod parsing;
mod secret;
mod settings;
mod types;

pub(crate) use types::{ConfigError, Settings};
#[allow(unused_imports)]
pub(crate) use types::{
    AdminSettings, ApiSettings, AttendanceSettings, CbtSettings, CorsSettings, DatabaseSettings,
    Environment, RedisSettings, RuntimeSettings, SecuritySettings, TelemetrySettings,
};
