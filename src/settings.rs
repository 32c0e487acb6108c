use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mongodb_uri: String,
    pub database_name: String,
    pub bind_address: String,
    pub port: u16,
    pub jwt_private_key_path: String,
    pub jwt_public_key_path: String,
    pub cors_origin: Option<String>,
    pub log_format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mongodb_uri: String::from("mongodb://localhost:27017"),
            database_name: String::from("career_review"),
            bind_address: String::from("127.0.0.1"),
            port: 8000,
            jwt_private_key_path: String::from("./keys/private_access.key"),
            jwt_public_key_path: String::from("./keys/public_access.pem"),
            cors_origin: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load(Environment::default())
    }

    /// A value that does not fit its field (a non-numeric `PORT`, an unknown
    /// `LOG_FORMAT`) is an error rather than a silent default.
    fn load(environment: Environment) -> Result<Self, ConfigError> {
        let mut settings: Settings = Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        settings.cors_origin = settings.cors_origin.filter(|origin| !origin.is_empty());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(vars: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Environment::default().source(Some(source))
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = Settings::load(environment(&[])).unwrap();
        assert_eq!(settings.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(settings.database_name, "career_review");
        assert_eq!(settings.port, 8000);
        assert_eq!(settings.log_format, LogFormat::Pretty);
        assert!(settings.cors_origin.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let settings = Settings::load(environment(&[
            ("PORT", "9090"),
            ("DATABASE_NAME", "hr"),
            ("LOG_FORMAT", "json"),
            ("CORS_ORIGIN", "https://hr.example.com"),
        ]))
        .unwrap();
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.database_name, "hr");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert_eq!(settings.cors_origin.as_deref(), Some("https://hr.example.com"));
    }

    #[test]
    fn empty_cors_origin_allows_any() {
        let settings = Settings::load(environment(&[("CORS_ORIGIN", "")])).unwrap();
        assert!(settings.cors_origin.is_none());
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(Settings::load(environment(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn unknown_log_format_is_an_error() {
        assert!(Settings::load(environment(&[("LOG_FORMAT", "xml")])).is_err());
    }
}
