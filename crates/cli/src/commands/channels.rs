//! Channels command - register destination accounts

use anyhow::{Context, Result};
use social_publish_domain::Channel;
use std::path::PathBuf;
use uuid::Uuid;

use super::publish::open_store;
use crate::args::{ChannelsArgs, ChannelsCommands};
use crate::config::AppConfig;

pub async fn execute(args: ChannelsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let store = open_store(&config).await?;

    match args.command {
        ChannelsCommands::Add {
            agency_id,
            channel_type,
            name,
            handle,
        } => {
            let channel = Channel {
                id: Uuid::new_v4(),
                agency_id,
                channel_type,
                name,
                handle,
            };
            store
                .create_channel(&channel)
                .await
                .context("Failed to create channel")?;

            tracing::info!(
                channel_id = %channel.id,
                channel_type = %channel.channel_type,
                "Channel created"
            );
            println!("{}", channel.id);
        }
    }

    Ok(())
}
