//! Platform formatting rules: text limits, hashtag caps, media requirements

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ChannelType;

const ELLIPSIS: &str = "...";

static HASHTAG_JUNK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}_]").expect("valid hashtag regex"));

/// Content constraints for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformRules {
    /// Maximum characters of post text (not bytes)
    pub max_chars: usize,
    /// Maximum number of hashtags appended
    pub max_hashtags: usize,
    /// The platform rejects posts without an image/video URL
    pub requires_media: bool,
}

impl PlatformRules {
    pub const TIKTOK: PlatformRules = PlatformRules {
        max_chars: 2200,
        max_hashtags: 5,
        requires_media: true,
    };

    pub const INSTAGRAM: PlatformRules = PlatformRules {
        max_chars: 2200,
        max_hashtags: 8,
        requires_media: true,
    };

    pub const LINKEDIN: PlatformRules = PlatformRules {
        max_chars: 3000,
        max_hashtags: 5,
        requires_media: false,
    };

    pub fn for_channel(channel_type: ChannelType) -> Self {
        match channel_type {
            ChannelType::Tiktok => Self::TIKTOK,
            ChannelType::Instagram => Self::INSTAGRAM,
            ChannelType::Linkedin => Self::LINKEDIN,
        }
    }

    /// Body followed by normalized hashtags, cut to the platform limit
    pub fn caption(&self, body: &str, hashtags: &[String]) -> String {
        let tags = normalize_hashtags(hashtags, self.max_hashtags);
        let body = body.trim();
        let text = if tags.is_empty() {
            body.to_string()
        } else if body.is_empty() {
            tags.join(" ")
        } else {
            format!("{}\n\n{}", body, tags.join(" "))
        };
        truncate_with_ellipsis(&text, self.max_chars)
    }
}

/// Truncate to at most `max_chars` characters, ending with an ellipsis when cut
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let ellipsis_len = ELLIPSIS.chars().count();
    if max_chars <= ellipsis_len {
        return text.chars().take(max_chars).collect();
    }

    let kept: String = text.chars().take(max_chars - ellipsis_len).collect();
    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

/// Normalize hashtags to `#word` form, dropping empties and duplicates,
/// keeping at most `cap` in their original order
pub fn normalize_hashtags(hashtags: &[String], cap: usize) -> Vec<String> {
    let mut seen = Vec::new();
    let mut normalized = Vec::new();

    for raw in hashtags {
        let word = HASHTAG_JUNK.replace_all(raw.trim().trim_start_matches('#'), "");
        if word.is_empty() {
            continue;
        }

        let key = word.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        normalized.push(format!("#{}", word));

        if normalized.len() == cap {
            break;
        }
    }

    normalized
}
