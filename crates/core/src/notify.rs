//! Message text for game announcements.

use crate::catalog::SearchCandidate;

/// Summaries longer than this are cut and end in `...`.
pub const SUMMARY_MAX_CHARS: usize = 200;

/// Unenriched notice used when no catalog record could be found.
pub fn format_plain_notice(name: &str, link: &str) -> String {
    format!("🎮 New Game: {}\n🔗 {}", name, link)
}

/// Plain-text body of a game announcement.
pub fn format_game_text(game: &SearchCandidate, source_link: Option<&str>) -> String {
    let mut lines = vec![
        format!("🎮 **{}**", game.name),
        format!("📅 Release Date: {}", game.release_date_label()),
        format!("⭐ Rating: {}", rating_label(game.rating)),
        format!("🎯 Genres: {}", join_or_unknown(&game.genres)),
        format!("🖥️ Platforms: {}", join_or_unknown(&game.platforms)),
    ];
    if !game.summary.is_empty() {
        lines.push(format!(
            "📝 Summary: {}",
            truncate_summary(&game.summary, SUMMARY_MAX_CHARS)
        ));
    }
    if let Some(url) = &game.url {
        lines.push(format!("ℹ️ More: {}", url));
    }
    if let Some(link) = source_link {
        lines.push(format!("🔗 {}", link));
    }
    lines.join("\n")
}

/// HTML body of a game announcement. Interpolated text is escaped.
pub fn format_game_html(game: &SearchCandidate, source_link: Option<&str>) -> String {
    let mut html = format!(
        "<h3>🎮 <strong>{}</strong></h3>\n<p><strong>📅 Release Date:</strong> {}</p>",
        escape_html(&game.name),
        escape_html(&game.release_date_label())
    );
    html.push_str(&format!(
        "\n<p><strong>⭐ Rating:</strong> {}</p>\n<p><strong>🎯 Genres:</strong> {}</p>\n<p><strong>🖥️ Platforms:</strong> {}</p>",
        escape_html(&rating_label(game.rating)),
        escape_html(&join_or_unknown(&game.genres)),
        escape_html(&join_or_unknown(&game.platforms))
    ));
    if !game.summary.is_empty() {
        html.push_str(&format!(
            "\n<p><strong>📝 Summary:</strong> {}</p>",
            escape_html(&truncate_summary(&game.summary, SUMMARY_MAX_CHARS))
        ));
    }
    if let Some(url) = &game.url {
        html.push_str(&format!(
            "\n<p><a href=\"{}\">ℹ️ More</a></p>",
            escape_html(url)
        ));
    }
    if let Some(link) = source_link {
        html.push_str(&format!(
            "\n<p><a href=\"{}\">🔗 Source</a></p>",
            escape_html(link)
        ));
    }
    html
}

/// Rating as `NN.N/100`, or `Unknown`.
pub fn rating_label(rating: Option<f64>) -> String {
    match rating {
        Some(rating) => format!("{:.1}/100", rating),
        None => "Unknown".to_string(),
    }
}

/// Comma-separated names, or `Unknown` when there are none.
pub fn join_or_unknown(names: &[String]) -> String {
    if names.is_empty() {
        "Unknown".to_string()
    } else {
        names.join(", ")
    }
}

/// Caption for a screenshot; `index` is 0-based.
pub fn screenshot_caption(index: usize, title: &str) -> String {
    format!("Screenshot {} of {}", index + 1, title)
}

/// Cut `text` to at most `max_chars` characters, ending in `...` when cut.
pub fn truncate_summary(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut cut: String = text.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
