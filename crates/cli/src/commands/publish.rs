//! Publish command - publish one publication, plus shared wiring

use anyhow::{Context, Result, bail};
use social_publish_adapters::{
    audit::{JsonlAuditLog, SqliteAuditLog},
    social::{InstagramProvider, LinkedInProvider, TikTokProvider},
    state::SqlitePublicationStore,
};
use social_publish_domain::{
    AuditSink, ChannelType, ProviderRegistry, PublishContext, PublishReport, SystemClock,
    demo::SlugDemoPolicy, usecases::PublishOrchestrator,
};
use std::path::PathBuf;
use std::sync::Arc;

use crate::args::PublishArgs;
use crate::config::{AppConfig, AuditSinkKind};

pub type Orchestrator =
    PublishOrchestrator<SqlitePublicationStore, dyn AuditSink, SlugDemoPolicy, SystemClock>;

pub async fn execute(args: PublishArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let orchestrator = build_orchestrator(&config).await?;

    let mut ctx = PublishContext::new(args.publication_id, &args.agency.agency_id);
    ctx.agency_slug = args.agency.agency_slug.clone();
    ctx.user_id = args.user_id.clone();

    let report = match orchestrator.execute_publish(&ctx).await {
        Ok(report) => report,
        Err(e) if e.is_control_flow() => bail!("[{}] {}", e.code(), e),
        Err(e) => {
            let code = e.code();
            return Err(anyhow::Error::new(e)
                .context(format!("[{}] Publish attempt failed and was recorded", code)));
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if !report.success {
        bail!(
            "Publish failed: {}",
            report.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}

pub async fn open_store(config: &AppConfig) -> Result<Arc<SqlitePublicationStore>> {
    let store = SqlitePublicationStore::new(&config.general.database_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open database: {}",
                config.general.database_path.display()
            )
        })?;
    Ok(Arc::new(store))
}

/// Register an adapter for every enabled platform
pub fn build_registry(config: &AppConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(Arc::new(SystemClock));

    if config.tiktok.enabled {
        let adapter_config = config.tiktok.adapter_config();
        registry.register(ChannelType::Tiktok, move || {
            TikTokProvider::new(adapter_config.clone())
        });
    }

    if config.instagram.enabled {
        let adapter_config = config.instagram.adapter_config();
        registry.register(ChannelType::Instagram, move || {
            InstagramProvider::new(adapter_config.clone())
        });
    }

    if config.linkedin.enabled {
        let adapter_config = config.linkedin.adapter_config();
        registry.register(ChannelType::Linkedin, move || {
            LinkedInProvider::new(adapter_config.clone())
        });
    }

    tracing::debug!(channel_types = ?registry.channel_types(), "Built provider registry");
    registry
}

pub async fn build_audit(
    config: &AppConfig,
    store: &SqlitePublicationStore,
) -> Result<Arc<dyn AuditSink>> {
    let sink: Arc<dyn AuditSink> = match config.audit.sink {
        AuditSinkKind::Sqlite => Arc::new(
            SqliteAuditLog::new(store.pool())
                .await
                .context("Failed to initialize SQLite audit log")?,
        ),
        AuditSinkKind::Jsonl => {
            let log = JsonlAuditLog::new(config.audit.jsonl_path.clone())
                .await
                .with_context(|| {
                    format!(
                        "Failed to open audit log: {}",
                        config.audit.jsonl_path.display()
                    )
                })?;
            tracing::debug!(path = %log.path().display(), "Writing audit events to JSONL");
            Arc::new(log)
        }
    };
    Ok(sink)
}

pub async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let store = open_store(config).await?;
    let audit = build_audit(config, &store).await?;
    let demo_policy = Arc::new(SlugDemoPolicy::new(
        config.demo.slugs.clone(),
        config.demo.prefixes.clone(),
    ));

    Ok(PublishOrchestrator::new(
        store,
        Arc::new(build_registry(config)),
        audit,
        demo_policy,
        Arc::new(SystemClock),
    ))
}

pub fn print_report(report: &PublishReport) {
    let symbol = if report.success { "✓" } else { "✗" };
    let verb = match (report.success, report.already_published) {
        (true, true) => "Already published",
        (true, false) => "Published",
        (false, _) => "Failed",
    };

    println!(
        "{} {} {} (status: {}, attempts: {})",
        symbol, verb, report.publication_id, report.status, report.attempt_count
    );

    if let Some(id) = &report.external_id {
        println!("  External ID: {}", id);
    }
    if let Some(url) = &report.external_url {
        println!("  URL: {}", url);
    }
    if let Some(error) = &report.error_message {
        println!("  Error: {}", error);
    }
    if report.is_demo || report.is_stub {
        println!("  [demo] No platform was contacted");
    }
}
