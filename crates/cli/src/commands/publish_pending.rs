//! Publish-pending command - sweep drafts and retryable failures

use anyhow::{Result, bail};
use serde_json::json;
use social_publish_domain::usecases::{PendingSweep, SweepConfig};
use std::path::PathBuf;
use std::sync::Arc;

use super::publish::build_orchestrator;
use crate::args::PublishPendingArgs;
use crate::config::AppConfig;

pub async fn execute(args: PublishPendingArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let orchestrator = Arc::new(build_orchestrator(&config).await?);

    let sweep_config = SweepConfig {
        max_concurrent: config.general.max_concurrent,
        batch_limit: args.limit.unwrap_or(config.general.batch_limit),
        rate_limit_per_minute: nonzero(config.general.rate_limit_per_minute),
        rate_limit_per_hour: nonzero(config.general.rate_limit_per_hour),
    };

    let sweep = PendingSweep::new(orchestrator, sweep_config);
    let entries = match sweep
        .run(&args.agency.agency_id, args.agency.agency_slug.as_deref())
        .await
    {
        Ok(entries) => entries,
        Err(e) => bail!("[{}] {}", e.code(), e),
    };

    let succeeded = entries.iter().filter(|e| e.succeeded()).count();
    let failed = entries.len() - succeeded;

    if args.json {
        let results: Vec<_> = entries
            .iter()
            .map(|entry| match &entry.result {
                Ok(report) => json!({
                    "publication_id": entry.publication_id,
                    "report": report,
                }),
                Err(e) => json!({
                    "publication_id": entry.publication_id,
                    "error": { "code": e.code(), "message": e.to_string() },
                }),
            })
            .collect();
        let output = json!({
            "attempted": entries.len(),
            "succeeded": succeeded,
            "failed": failed,
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if entries.is_empty() {
        println!("No pending publications for agency {}", args.agency.agency_id);
    } else {
        for entry in &entries {
            match &entry.result {
                Ok(report) => super::publish::print_report(report),
                Err(e) => println!("✗ {} [{}] {}", entry.publication_id, e.code(), e),
            }
        }
        println!();
        println!(
            "Attempted {}: {} published, {} failed",
            entries.len(),
            succeeded,
            failed
        );
    }

    if failed > 0 {
        bail!("{} of {} publications failed", failed, entries.len());
    }

    Ok(())
}

fn nonzero(limit: u32) -> Option<u32> {
    (limit > 0).then_some(limit)
}
