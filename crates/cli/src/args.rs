//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use social_publish_domain::{ChannelType, PublicationStatus};
use std::path::PathBuf;
use uuid::Uuid;

/// social-publish: publish generated job content to TikTok, Instagram and LinkedIn
#[derive(Parser, Debug)]
#[command(name = "social-publish")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Publish one publication to its channel
    Publish(PublishArgs),

    /// Publish every draft or retryable failed publication of an agency
    PublishPending(PublishPendingArgs),

    /// Manage channels
    Channels(ChannelsArgs),

    /// Manage publications
    Publications(PublicationsArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Validate configuration and show status
    Doctor(DoctorArgs),
}

/// Agency the command acts on behalf of
#[derive(Args, Debug, Clone)]
pub struct AgencyArgs {
    /// Agency (tenant) identifier
    #[arg(long, env = "SOCIAL_PUBLISH_AGENCY_ID")]
    pub agency_id: String,

    /// Agency slug, used for demo tenant detection
    #[arg(long)]
    pub agency_slug: Option<String>,
}

#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Publication to publish
    #[arg(long)]
    pub publication_id: Uuid,

    #[command(flatten)]
    pub agency: AgencyArgs,

    /// Acting user, recorded in the audit trail
    #[arg(long)]
    pub user_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PublishPendingArgs {
    #[command(flatten)]
    pub agency: AgencyArgs,

    /// Maximum publications to attempt (defaults to general.batch_limit)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub command: ChannelsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ChannelsCommands {
    /// Register a channel for an agency
    Add {
        #[arg(long, env = "SOCIAL_PUBLISH_AGENCY_ID")]
        agency_id: String,

        /// tiktok, instagram or linkedin
        #[arg(long = "type")]
        channel_type: ChannelType,

        /// Display name
        #[arg(long)]
        name: String,

        /// Platform handle
        #[arg(long)]
        handle: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct PublicationsArgs {
    #[command(subcommand)]
    pub command: PublicationsCommands,
}

#[derive(Subcommand, Debug)]
pub enum PublicationsCommands {
    /// Store content and create a draft publication for it
    Create {
        #[arg(long, env = "SOCIAL_PUBLISH_AGENCY_ID")]
        agency_id: String,

        #[arg(long)]
        channel_id: Uuid,

        #[arg(long)]
        job_id: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        body: String,

        /// Hashtag to append (repeatable)
        #[arg(long = "hashtag")]
        hashtags: Vec<String>,

        /// Image or video URL
        #[arg(long)]
        media_url: Option<String>,
    },

    /// Show one publication
    Show {
        #[arg(long, env = "SOCIAL_PUBLISH_AGENCY_ID")]
        agency_id: String,

        #[arg(long)]
        id: Uuid,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List publications of an agency
    List {
        #[arg(long, env = "SOCIAL_PUBLISH_AGENCY_ID")]
        agency_id: String,

        /// Filter by status (DRAFT, PUBLISHING, PUBLISHED, FAILED)
        #[arg(long)]
        status: Option<PublicationStatus>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Init {
        /// Path to write config file
        #[arg(long, default_value = "./config.toml")]
        path: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
