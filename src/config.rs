//! Ambient configuration, loaded from environment variables with compiled-in defaults.
//! Mirrors the dotted-key namespace `snow-owl-sftp`'s TOML-file `Config` uses
//! (other_examples), adapted to env-var sourcing via the `config` crate, with a `__`
//! level separator (e.g. `SERVER__PORT`, `S3__BUCKET`).

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
    pub host: String,
    #[serde(rename = "maxconnections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    #[serde(rename = "accesskey")]
    pub access_key: String,
    #[serde(rename = "secretkey")]
    pub secret_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub enabled: bool,
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshSettings {
    #[serde(rename = "hostkeypath")]
    pub host_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerSettings,
    pub s3: S3Settings,
    pub logging: LoggingSettings,
    pub ssh: SshSettings,
    pub metrics: MetricsSettings,

    #[serde(rename = "userbasepath")]
    pub user_base_path: String,
    #[serde(rename = "defaultsubdirectories")]
    pub default_subdirectories: String,
    #[serde(rename = "createdefaultsubdirs")]
    pub create_default_subdirs: bool,
    #[serde(rename = "maxfilesize")]
    pub max_file_size: u64,
    #[serde(rename = "allowedextensions")]
    pub allowed_extensions: String,
    #[serde(rename = "blockedextensions")]
    pub blocked_extensions: String,
    #[serde(rename = "maxdirectorydepth")]
    pub max_directory_depth: u32,
    #[serde(rename = "idletimeoutsecs")]
    pub idle_timeout_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables layered over the defaults below.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("server.port", 2222)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.maxconnections", 100)?
            .set_default("s3.bucket", "")?
            .set_default("s3.region", "us-east-1")?
            .set_default("s3.endpoint", "")?
            .set_default("s3.accesskey", "")?
            .set_default("s3.secretkey", "")?
            .set_default("logging.enabled", true)?
            .set_default("logging.level", "info")?
            .set_default("logging.file", None::<String>)?
            .set_default("ssh.hostkeypath", "./sftp_host_ed25519")?
            .set_default("metrics.enabled", true)?
            .set_default("userbasepath", "users")?
            .set_default("defaultsubdirectories", "invoices,ledgers")?
            .set_default("createdefaultsubdirs", true)?
            .set_default("maxfilesize", 100 * 1024 * 1024)?
            .set_default("allowedextensions", "")?
            .set_default("blockedextensions", ".exe,.bat,.sh")?
            .set_default("maxdirectorydepth", 10)?
            .set_default("idletimeoutsecs", 60)?
            .add_source(config::Environment::default().separator("__"));

        builder.build()?.try_deserialize()
    }

    pub fn default_subdirectories_vec(&self) -> Vec<String> {
        self.default_subdirectories.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
    }
}
