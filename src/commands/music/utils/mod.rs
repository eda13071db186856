use std::time::Duration;

// Export music utilities
pub mod audio_sink;
pub mod button_controls;
pub mod component_handlers;
pub mod embedded_messages;
pub mod event_handlers;
pub mod guild_session;
pub mod menus;
pub mod music_manager;
pub mod playback_state;
pub mod search_aggregator;
pub mod stream_resolver;
pub mod voice_session;

/// Format a duration into a human-readable string (e.g., "3:45" or "1:23:45")
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Cuts `text` to at most `max` characters, ending in "..." when cut.
pub fn limit_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
