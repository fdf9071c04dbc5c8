//! Publications command - create, inspect and list publications

use anyhow::{Context, Result, bail};
use social_publish_adapters::audit::SqliteAuditLog;
use social_publish_domain::{Content, Publication, PublicationStore};
use std::path::PathBuf;
use time::OffsetDateTime;
use uuid::Uuid;

use super::publish::open_store;
use crate::args::{PublicationsArgs, PublicationsCommands};
use crate::config::{AppConfig, AuditSinkKind};

pub async fn execute(args: PublicationsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;

    match args.command {
        PublicationsCommands::Create {
            agency_id,
            channel_id,
            job_id,
            title,
            body,
            hashtags,
            media_url,
        } => {
            let content = Content {
                id: Uuid::new_v4(),
                agency_id: agency_id.clone(),
                job_id: job_id.clone(),
                title,
                body,
                hashtags,
                media_url,
            };
            let publication = Publication::draft(
                agency_id,
                job_id,
                channel_id,
                content.id,
                OffsetDateTime::now_utc(),
            );

            store
                .create_draft(&content, &publication)
                .await
                .context("Failed to create publication")?;

            tracing::info!(
                publication_id = %publication.id,
                channel_id = %channel_id,
                "Draft publication created"
            );
            println!("{}", publication.id);
        }

        PublicationsCommands::Show {
            agency_id,
            id,
            json,
        } => {
            let Some(record) = store.load(id, &agency_id).await? else {
                bail!("Publication {} not found", id);
            };

            let audit_events = match config.audit.sink {
                AuditSinkKind::Sqlite => SqliteAuditLog::new(store.pool())
                    .await?
                    .events_for(id)
                    .await
                    .context("Failed to read audit events")?,
                AuditSinkKind::Jsonl => Vec::new(),
            };

            if json {
                let output = serde_json::json!({
                    "publication": record.publication,
                    "channel": record.channel,
                    "content": record.content,
                    "audit_events": audit_events,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let p = &record.publication;
                println!("Publication: {}", p.id);
                println!(
                    "  Channel:  {} ({})",
                    record.channel.name, record.channel.channel_type
                );
                println!("  Job:      {}", p.job_id);
                println!("  Status:   {}", p.status);
                println!("  Attempts: {}", p.attempt_count);
                if let Some(url) = &p.external_url {
                    println!("  URL:      {}", url);
                }
                if let Some(error) = &p.error_message {
                    println!("  Error:    {}", error);
                }
                for event in &audit_events {
                    println!(
                        "  Audit:    {} by {}",
                        event.action.as_str(),
                        event.user_id.as_deref().unwrap_or("system")
                    );
                }
            }
        }

        PublicationsCommands::List {
            agency_id,
            status,
            json,
        } => {
            let publications = store.list(&agency_id, status).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&publications)?);
            } else if publications.is_empty() {
                println!("No publications");
            } else {
                for p in &publications {
                    println!(
                        "{}  {:<10}  attempts={}  job={}",
                        p.id, p.status, p.attempt_count, p.job_id
                    );
                }
            }
        }
    }

    Ok(())
}
