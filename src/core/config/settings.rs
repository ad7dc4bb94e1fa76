use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_f64,
    parse_u16, parse_u64, parse_usize,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, AttendanceSettings, CbtSettings, ConfigError, CorsSettings,
    DatabaseSettings, RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort,
    ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("SCHOOLHUB_HOST", "0.0.0.0");
        let port = env_or_default("SCHOOLHUB_PORT", "8000");

        let environment = parse_environment(
            env_optional("SCHOOLHUB_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_optional("SCHOOLHUB_STRICT_CONFIG")
            .map(|value| parse_bool(&value))
            .unwrap_or(false)
            || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "SchoolHub CBT API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "schoolhub");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "schoolhub");
        let database_url = env_optional("DATABASE_URL");

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let finish_grace_seconds = parse_u64(
            "CBT_FINISH_GRACE_SECONDS",
            env_or_default("CBT_FINISH_GRACE_SECONDS", "120"),
        )?;
        let expiry_sweep_seconds = parse_u64(
            "CBT_EXPIRY_SWEEP_SECONDS",
            env_or_default("CBT_EXPIRY_SWEEP_SECONDS", "60"),
        )?;
        let max_questions_per_test = parse_u64(
            "CBT_MAX_QUESTIONS_PER_TEST",
            env_or_default("CBT_MAX_QUESTIONS_PER_TEST", "200"),
        )?;

        let default_radius_meters = parse_f64(
            "ATTENDANCE_DEFAULT_RADIUS_METERS",
            env_or_default("ATTENDANCE_DEFAULT_RADIUS_METERS", "200"),
        )?;
        let code_length =
            parse_usize("ATTENDANCE_CODE_LENGTH", env_or_default("ATTENDANCE_CODE_LENGTH", "8"))?;

        let first_superuser_username = env_or_default("FIRST_SUPERUSER_USERNAME", "superadmin");
        let first_superuser_password = env_or_default("FIRST_SUPERUSER_PASSWORD", "");

        let log_level = env_or_default("SCHOOLHUB_LOG_LEVEL", "info");
        let json =
            env_optional("SCHOOLHUB_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings { secret_key, access_token_expire_minutes, algorithm },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            cbt: CbtSettings { finish_grace_seconds, expiry_sweep_seconds, max_questions_per_test },
            attendance: AttendanceSettings { default_radius_meters, code_length },
            admin: AdminSettings { first_superuser_username, first_superuser_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn cbt(&self) -> &CbtSettings {
        &self.cbt
    }

    pub(crate) fn attendance(&self) -> &AttendanceSettings {
        &self.attendance
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cbt.expiry_sweep_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CBT_EXPIRY_SWEEP_SECONDS",
                value: "0".to_string(),
            });
        }

        if self.cbt.max_questions_per_test == 0 {
            return Err(ConfigError::InvalidValue {
                field: "CBT_MAX_QUESTIONS_PER_TEST",
                value: "0".to_string(),
            });
        }

        if self.attendance.default_radius_meters <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "ATTENDANCE_DEFAULT_RADIUS_METERS",
                value: self.attendance.default_radius_meters.to_string(),
            });
        }

        // A sha256 hex digest has 64 characters.
        if !(4..=64).contains(&self.attendance.code_length) {
            return Err(ConfigError::InvalidValue {
                field: "ATTENDANCE_CODE_LENGTH",
                value: self.attendance.code_length.to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_superuser_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_SUPERUSER_PASSWORD"));
        }

        Ok(())
    }
}
