//! User-facing texts, pre-escaped for MarkdownV2

use indoc::indoc;
use itertools::Itertools;
use teloxide::utils::markdown::{bold, escape};
use tubecore::core::validation::extract_video_id;
use tubecore::download::UserHint;
use tubecore::storage::UsageStats;
use tubecore::{DownloadError, FlowFailure, MediaKind, StreamOption, VideoCatalog};

/// Chars of an error message shown in `/stats`
const ERROR_EXCERPT_CHARS: usize = 50;

pub fn welcome_text(first_name: Option<&str>) -> String {
    let name = first_name.unwrap_or("there");
    escape(&format!(
        "👋 Hi {}!\n\nSend me a YouTube link and I will fetch it as audio or video. Type /help for details.",
        name
    ))
}

pub fn help_text() -> String {
    escape(indoc! {"
        📖 How to use this bot

        1. Send a YouTube link (youtube.com/watch?v=... or youtu.be/...).
        2. Pick Audio or Video.
        3. Pick a quality and wait for the file.

        Audio is sent as MP3 when conversion succeeds. Large videos may exceed
        Telegram's upload limit; choose a lower quality if that happens.

        Commands:
        /start - start the bot
        /help - show this message
        /stats - usage statistics (admins only)
    "})
}

pub fn fetching_text() -> String {
    escape("🔍 Fetching video info...")
}

pub fn no_access_text() -> String {
    escape("⛔ This command is for admins only.")
}

pub fn cancelled_text() -> String {
    escape("❌ Cancelled. Send another link whenever you like.")
}

pub fn sent_text() -> String {
    escape("✅ File sent! Send another link to download more.")
}

pub fn try_later_text() -> String {
    escape("⚠️ Something went wrong on our side. Please try again later.")
}

pub fn expired_text() -> String {
    escape("⌛ This selection is no longer valid. Please send the link again.")
}

pub fn format_duration(secs: u64) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "Audio",
        MediaKind::Video => "Video",
    }
}

fn header(catalog: &VideoCatalog) -> String {
    format!(
        "📹 {}\n\n👤 {}: {}\n⏱️ {}: {}",
        bold(&escape(&catalog.title)),
        bold("Channel"),
        escape(&catalog.author),
        bold("Duration"),
        escape(&format_duration(catalog.duration_secs)),
    )
}

/// First screen after a link: title, channel, duration, kind choice
pub fn catalog_text(catalog: &VideoCatalog) -> String {
    format!("{}\n\n{}", header(catalog), escape("Choose a format:"))
}

/// Second screen: the options of one kind
pub fn options_text(catalog: &VideoCatalog, kind: MediaKind) -> String {
    let options = catalog.options(kind);
    let body = if options.is_empty() {
        escape(&format!("No {} options available for this video.", kind))
    } else {
        escape(&format!("Choose a {} quality:", kind_label(kind).to_lowercase()))
    };
    format!("{}\n\n{}", header(catalog), body)
}

/// Button caption for one option, e.g. `Video 1080p (mp4)`
pub fn option_label(option: &StreamOption) -> String {
    if option.extension.is_empty() {
        format!("{} {}", kind_label(option.kind), option.quality)
    } else {
        format!("{} {} ({})", kind_label(option.kind), option.quality, option.extension)
    }
}

pub fn downloading_text(option: &StreamOption) -> String {
    escape(&format!(
        "⬇️ Downloading {} {}... This can take a while.",
        option.kind, option.quality
    ))
}

pub fn delivery_caption(title: &str, option: &StreamOption) -> String {
    let icon = match option.kind {
        MediaKind::Audio => "🎵",
        MediaKind::Video => "🎬",
    };
    format!("{} {} ({})", icon, title, option.quality)
}

fn hint_text(hint: UserHint) -> &'static str {
    match hint {
        UserHint::TryAnotherUrl => "Please check the link or try another video.",
        UserHint::TryLowerQuality => "Please try a lower quality or another format.",
        UserHint::TryAgainLater => "Please try again in a few minutes.",
    }
}

pub fn download_failure_text(error: &DownloadError) -> String {
    let headline = match error {
        e if e.is_too_large() => "❌ The file is too large for Telegram.".to_string(),
        DownloadError::UpstreamUnavailable(_) => "❌ This video is unavailable or restricted.".to_string(),
        DownloadError::EmptyCatalog => "❌ No downloadable formats were found for this video.".to_string(),
        DownloadError::StreamMissing { .. } => "❌ The selected format is no longer available.".to_string(),
        DownloadError::AudioMissing | DownloadError::MergeFailed(_) => {
            "❌ Could not combine video and audio for this quality.".to_string()
        }
        DownloadError::Transport { .. } => "❌ YouTube did not respond properly.".to_string(),
        DownloadError::DeliveryFailed(_) => "❌ Sending the file failed.".to_string(),
        DownloadError::Unexpected(_) => "❌ Something went wrong.".to_string(),
    };
    escape(&format!("{}\n{}", headline, hint_text(error.user_hint())))
}

pub fn flow_failure_text(failure: &FlowFailure) -> String {
    match failure {
        FlowFailure::InvalidUrl(e) => escape(&format!("❌ {}.\n{}", e, hint_text(failure.user_hint()))),
        FlowFailure::Download(e) => download_failure_text(e),
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}

/// Admin `/stats` report
pub fn stats_text(stats: &UsageStats) -> String {
    let mut out = format!(
        "📊 {}\n\n👥 {}\n⬇️ {}",
        bold("Bot statistics"),
        escape(&format!("Total users: {}", stats.total_users)),
        escape(&format!("Completed downloads: {}", stats.total_completed_downloads)),
    );

    out.push_str(&format!("\n\n🏆 {}\n", bold("Top users")));
    if stats.top_users.is_empty() {
        out.push_str(&escape("No users yet."));
    } else {
        let lines = stats
            .top_users
            .iter()
            .enumerate()
            .map(|(i, user)| {
                let name = user
                    .username
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .map_or_else(|| "no username".to_string(), |u| format!("@{}", u));
                escape(&format!("{}. {} ({}): {} downloads", i + 1, name, user.user_id, user.downloads))
            })
            .join("\n");
        out.push_str(&lines);
    }

    out.push_str(&format!("\n\n⚠️ {}\n", bold("Recent errors")));
    if stats.recent_errors.is_empty() {
        out.push_str(&escape("No errors recorded."));
    } else {
        let lines = stats
            .recent_errors
            .iter()
            .map(|err| {
                let video = extract_video_id(&err.video_url).unwrap_or_else(|| "N/A".to_string());
                escape(&format!(
                    "• [{}] {} {}: {}",
                    err.timestamp,
                    err.action,
                    video,
                    excerpt(&err.error_message, ERROR_EXCERPT_CHARS)
                ))
            })
            .join("\n");
        out.push_str(&lines);
    }
    out
}
