//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use social_publish_adapters::social::{
    InstagramProvider, LinkedInProvider, PlatformCredentials, TikTokProvider,
};
use social_publish_domain::SocialProvider;
use std::path::PathBuf;

use super::publish::open_store;
use crate::args::DoctorArgs;
use crate::config::{AppConfig, AuditSinkKind};

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    database: CheckResult,
    audit: CheckResult,
    tiktok: CheckResult,
    instagram: CheckResult,
    linkedin: CheckResult,
    overall: String,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        database: CheckResult::error("Not checked"),
        audit: CheckResult::error("Not checked"),
        tiktok: CheckResult::error("Not checked"),
        instagram: CheckResult::error("Not checked"),
        linkedin: CheckResult::error("Not checked"),
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.database = check_database(config).await;
        report.audit = check_audit(config);

        report.tiktok = if config.tiktok.enabled {
            let adapter_config = config.tiktok.adapter_config();
            check_platform(
                &adapter_config.credentials,
                &TikTokProvider::new(adapter_config.clone()),
                None,
            )
        } else {
            CheckResult::ok("TikTok disabled")
        };

        report.instagram = if config.instagram.enabled {
            let adapter_config = config.instagram.adapter_config();
            check_platform(
                &adapter_config.credentials,
                &InstagramProvider::new(adapter_config.clone()),
                None,
            )
        } else {
            CheckResult::ok("Instagram disabled")
        };

        report.linkedin = if config.linkedin.enabled {
            let adapter_config = config.linkedin.adapter_config();
            let author = match &adapter_config.author_urn {
                Some(urn) => format!("author: {}", urn),
                None => "author: (not set)".to_string(),
            };
            check_platform(
                &adapter_config.credentials,
                &LinkedInProvider::new(adapter_config.clone()),
                Some(author),
            )
        } else {
            CheckResult::ok("LinkedIn disabled")
        };
    }

    // Platforms only warn: demo tenants publish without credentials
    let checks = [
        &report.config,
        &report.database,
        &report.audit,
        &report.tiktok,
        &report.instagram,
        &report.linkedin,
    ];

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

async fn check_database(config: &AppConfig) -> CheckResult {
    let path = &config.general.database_path;
    match open_store(config).await {
        Ok(_) => CheckResult::ok(format!("SQLite: {}", path.display())),
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn check_audit(config: &AppConfig) -> CheckResult {
    match config.audit.sink {
        AuditSinkKind::Sqlite => CheckResult::ok("Sink: sqlite (audit_events table)"),
        AuditSinkKind::Jsonl => {
            let path = &config.audit.jsonl_path;
            let parent_ok = path
                .parent()
                .map(|p| p.as_os_str().is_empty() || p.exists())
                .unwrap_or(true);
            if parent_ok {
                CheckResult::ok(format!("Sink: jsonl ({})", path.display()))
            } else {
                CheckResult::warn(format!(
                    "Sink: jsonl ({}), directory will be created on first publish",
                    path.display()
                ))
            }
        }
    }
}

fn check_platform(
    credentials: &PlatformCredentials,
    provider: &dyn SocialProvider,
    extra: Option<String>,
) -> CheckResult {
    let details = serde_json::json!({
        "client_id": credentials.client_id.describe(),
        "client_secret": credentials.client_secret.describe(),
        "access_token": credentials.access_token.describe(),
        "configured": provider.is_configured(),
        "ready": provider.is_ready_to_publish(),
    });

    let mut message = format!(
        "Access token: {}",
        state(credentials.access_token.resolve().is_some())
    );
    if let Some(extra) = extra {
        message.push_str(", ");
        message.push_str(&extra);
    }

    let result = if provider.is_ready_to_publish() {
        CheckResult::ok(format!("Ready ({})", message))
    } else if provider.is_configured() {
        CheckResult::warn(format!("Configured but not ready ({})", message))
    } else {
        CheckResult::warn(format!("Not configured, demo only ({})", message))
    };

    result.with_details(details)
}

fn state(set: bool) -> &'static str {
    if set { "set" } else { "not set" }
}

fn print_report(report: &DoctorReport) {
    println!("social-publish Doctor Report");
    println!("============================");
    println!();

    print_check("Config", &report.config);
    print_check("Database", &report.database);
    print_check("Audit", &report.audit);
    print_check("TikTok", &report.tiktok);
    print_check("Instagram", &report.instagram);
    print_check("LinkedIn", &report.linkedin);

    println!();
    let symbol = match report.overall.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} Overall: {}", symbol, report.overall.to_uppercase());
}

fn print_check(name: &str, result: &CheckResult) {
    let symbol = match result.status.as_str() {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    };
    println!("{} {}: {}", symbol, name, result.message);
}
