pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        #[serde(default = "default_db_url")]
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        /// Deployment environment name, e.g. `development` or `production`.
        #[serde(default)]
        pub environment: Option<String>,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            Self::load(config::Environment::default())
        }

        fn load(source: config::Environment) -> anyhow::Result<Self> {
            let settings = config::Config::builder().add_source(source).build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }

        /// Whether error details may be sent back to API callers.
        pub fn is_development(&self) -> bool {
            self.environment.as_deref() == Some("development")
        }
    }

    fn default_db_url() -> String {
        "sqlite://taskboard.db?mode=rwc".to_string()
    }

    fn default_port() -> u16 {
        5000
    }

}
pub mod entities;
pub mod task;
pub mod web;
