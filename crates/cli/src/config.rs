//! Configuration loading and management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use social_publish_adapters::social::{
    InstagramConfig, LinkedInConfig, PlatformCredentials, TikTokConfig,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub demo: DemoConfig,

    #[serde(default)]
    pub audit: AuditConfig,

    #[serde(default)]
    pub tiktok: TikTokSection,

    #[serde(default)]
    pub instagram: InstagramSection,

    #[serde(default)]
    pub linkedin: LinkedInSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,

    #[serde(default)]
    pub rate_limit_per_minute: u32,

    #[serde(default)]
    pub rate_limit_per_hour: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Agency slugs that are always sandboxed
    #[serde(default = "default_demo_slugs")]
    pub slugs: Vec<String>,

    #[serde(default = "default_demo_prefixes")]
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    Sqlite,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_sink")]
    pub sink: AuditSinkKind,

    #[serde(default = "default_audit_jsonl_path")]
    pub jsonl_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TikTokSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_tiktok_base_url")]
    pub base_url: String,

    #[serde(default = "default_tiktok_client_key_env")]
    pub client_key_env: String,

    #[serde(default = "default_tiktok_client_secret_env")]
    pub client_secret_env: String,

    #[serde(default = "default_tiktok_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_tiktok_privacy_level")]
    pub privacy_level: String,

    #[serde(default)]
    pub disable_comment: bool,

    #[serde(default)]
    pub disable_duet: bool,

    #[serde(default)]
    pub disable_stitch: bool,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstagramSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_instagram_base_url")]
    pub base_url: String,

    #[serde(default = "default_instagram_app_id_env")]
    pub app_id_env: String,

    #[serde(default = "default_instagram_app_secret_env")]
    pub app_secret_env: String,

    #[serde(default = "default_instagram_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_linkedin_base_url")]
    pub base_url: String,

    #[serde(default = "default_linkedin_client_id_env")]
    pub client_id_env: String,

    #[serde(default = "default_linkedin_client_secret_env")]
    pub client_secret_env: String,

    #[serde(default = "default_linkedin_access_token_env")]
    pub access_token_env: String,

    /// e.g. `urn:li:organization:12345`
    #[serde(default)]
    pub author_urn: Option<String>,

    #[serde(default = "default_linkedin_visibility")]
    pub visibility: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_database_path() -> PathBuf {
    PathBuf::from("./social-publish.sqlite")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_concurrent() -> usize {
    4
}

fn default_batch_limit() -> usize {
    50
}

fn default_demo_slugs() -> Vec<String> {
    vec!["demo".to_string()]
}

fn default_demo_prefixes() -> Vec<String> {
    vec!["demo-".to_string()]
}

fn default_audit_sink() -> AuditSinkKind {
    AuditSinkKind::Sqlite
}

fn default_audit_jsonl_path() -> PathBuf {
    PathBuf::from("./audit.jsonl")
}

fn default_timeout() -> u64 {
    30
}

fn default_tiktok_base_url() -> String {
    "https://open.tiktokapis.com/v2".to_string()
}

fn default_tiktok_client_key_env() -> String {
    "TIKTOK_CLIENT_KEY".to_string()
}

fn default_tiktok_client_secret_env() -> String {
    "TIKTOK_CLIENT_SECRET".to_string()
}

fn default_tiktok_access_token_env() -> String {
    "TIKTOK_ACCESS_TOKEN".to_string()
}

fn default_tiktok_privacy_level() -> String {
    "PUBLIC_TO_EVERYONE".to_string()
}

fn default_instagram_base_url() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_instagram_app_id_env() -> String {
    "INSTAGRAM_APP_ID".to_string()
}

fn default_instagram_app_secret_env() -> String {
    "INSTAGRAM_APP_SECRET".to_string()
}

fn default_instagram_access_token_env() -> String {
    "INSTAGRAM_ACCESS_TOKEN".to_string()
}

fn default_linkedin_base_url() -> String {
    "https://api.linkedin.com/v2".to_string()
}

fn default_linkedin_client_id_env() -> String {
    "LINKEDIN_CLIENT_ID".to_string()
}

fn default_linkedin_client_secret_env() -> String {
    "LINKEDIN_CLIENT_SECRET".to_string()
}

fn default_linkedin_access_token_env() -> String {
    "LINKEDIN_ACCESS_TOKEN".to_string()
}

fn default_linkedin_visibility() -> String {
    "PUBLIC".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_level: default_log_level(),
            max_concurrent: default_max_concurrent(),
            batch_limit: default_batch_limit(),
            rate_limit_per_minute: 0,
            rate_limit_per_hour: 0,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            slugs: default_demo_slugs(),
            prefixes: default_demo_prefixes(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: default_audit_sink(),
            jsonl_path: default_audit_jsonl_path(),
        }
    }
}

impl Default for TikTokSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_tiktok_base_url(),
            client_key_env: default_tiktok_client_key_env(),
            client_secret_env: default_tiktok_client_secret_env(),
            access_token_env: default_tiktok_access_token_env(),
            privacy_level: default_tiktok_privacy_level(),
            disable_comment: false,
            disable_duet: false,
            disable_stitch: false,
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for InstagramSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_instagram_base_url(),
            app_id_env: default_instagram_app_id_env(),
            app_secret_env: default_instagram_app_secret_env(),
            access_token_env: default_instagram_access_token_env(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for LinkedInSection {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_linkedin_base_url(),
            client_id_env: default_linkedin_client_id_env(),
            client_secret_env: default_linkedin_client_secret_env(),
            access_token_env: default_linkedin_access_token_env(),
            author_urn: None,
            visibility: default_linkedin_visibility(),
            timeout_secs: default_timeout(),
        }
    }
}

impl TikTokSection {
    pub fn adapter_config(&self) -> TikTokConfig {
        TikTokConfig {
            base_url: self.base_url.clone(),
            credentials: PlatformCredentials::from_env(
                &self.client_key_env,
                &self.client_secret_env,
                &self.access_token_env,
            ),
            privacy_level: self.privacy_level.clone(),
            disable_comment: self.disable_comment,
            disable_duet: self.disable_duet,
            disable_stitch: self.disable_stitch,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl InstagramSection {
    pub fn adapter_config(&self) -> InstagramConfig {
        InstagramConfig {
            base_url: self.base_url.clone(),
            credentials: PlatformCredentials::from_env(
                &self.app_id_env,
                &self.app_secret_env,
                &self.access_token_env,
            ),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl LinkedInSection {
    pub fn adapter_config(&self) -> LinkedInConfig {
        LinkedInConfig {
            base_url: self.base_url.clone(),
            credentials: PlatformCredentials::from_env(
                &self.client_id_env,
                &self.client_secret_env,
                &self.access_token_env,
            ),
            author_urn: self.author_urn.clone(),
            visibility: self.visibility.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        builder = builder.add_source(
            config::Environment::with_prefix("SOCIAL_PUBLISH")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# social-publish configuration
#
# Secrets never live in this file: each platform names the environment
# variables holding its credentials.

[general]
database_path = "./social-publish.sqlite"
log_level = "info"
# publish-pending sweep
max_concurrent = 4
batch_limit = 50
# 0 disables rate limiting
rate_limit_per_minute = 0
rate_limit_per_hour = 0

[demo]
# Agencies matching these slugs get fabricated results and never reach a platform
slugs = ["demo"]
prefixes = ["demo-"]

[audit]
sink = "sqlite"  # sqlite, jsonl
jsonl_path = "./audit.jsonl"

[tiktok]
enabled = true
base_url = "https://open.tiktokapis.com/v2"
client_key_env = "TIKTOK_CLIENT_KEY"
client_secret_env = "TIKTOK_CLIENT_SECRET"
access_token_env = "TIKTOK_ACCESS_TOKEN"
privacy_level = "PUBLIC_TO_EVERYONE"
disable_comment = false
disable_duet = false
disable_stitch = false
timeout_secs = 30

[instagram]
enabled = true
base_url = "https://graph.facebook.com/v19.0"
app_id_env = "INSTAGRAM_APP_ID"
app_secret_env = "INSTAGRAM_APP_SECRET"
access_token_env = "INSTAGRAM_ACCESS_TOKEN"
timeout_secs = 30

[linkedin]
enabled = true
base_url = "https://api.linkedin.com/v2"
client_id_env = "LINKEDIN_CLIENT_ID"
client_secret_env = "LINKEDIN_CLIENT_SECRET"
access_token_env = "LINKEDIN_ACCESS_TOKEN"
# author_urn = "urn:li:organization:12345"
visibility = "PUBLIC"
timeout_secs = 30
"#
        .to_string()
    }
}
