use secrecy::Secret;
use serde_aux::field_attributes::deserialize_number_from_string;
use std::path::Path;
use std::time::Duration;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    // Environment variables are always strings, `config` won't pick up the integer on its own.
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    /// Read from `MONGO_DB_URL`. It usually embeds credentials, hence the `Secret`.
    pub url: Secret<String>,
    /// Read from `MONGO_DB_NAME`.
    pub database_name: String,
    #[serde(
        default = "default_server_selection_timeout",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub server_selection_timeout_milliseconds: u64,
}

fn default_server_selection_timeout() -> u64 {
    5000
}

impl DatabaseSettings {
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_millis(self.server_selection_timeout_milliseconds)
    }
}

/// The possible runtime environment for our application.
#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{other} is not a supported environment. Use either `local` or `production`."
            )),
        }
    }
}

/// Layers, from lowest to highest precedence:
/// * `configuration/base.yaml`;
/// * `configuration/{local,production}.yaml`, picked with `APP_ENVIRONMENT`;
/// * `APP_`-prefixed environment variables, e.g. `APP_APPLICATION__PORT=5001`;
/// * `MONGO_DB_URL` and `MONGO_DB_NAME`.
///
/// The two MongoDB variables have no file default. If either is missing the settings fail to
/// deserialize, and the caller must refuse to start.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    // Detect the running environment. Default to `local` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    build_settings(
        &configuration_directory,
        environment,
        std::env::var("MONGO_DB_URL").ok(),
        std::env::var("MONGO_DB_NAME").ok(),
    )
}

/// Everything `get_configuration` does, minus reading `APP_ENVIRONMENT` and the MongoDB
/// variables from the process environment.
pub fn build_settings(
    configuration_directory: &Path,
    environment: Environment,
    mongo_db_url: Option<String>,
    mongo_db_name: Option<String>,
) -> Result<Settings, config::ConfigError> {
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .set_override_option("database.url", mongo_db_url)?
        .set_override_option("database.database_name", mongo_db_name)?
        .build()?;

    settings.try_deserialize::<Settings>()
}
