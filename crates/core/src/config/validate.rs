use super::{types::Config, ConfigError};

/// Upper bound on screenshots per thread.
pub const MAX_SCREENSHOTS_LIMIT: usize = 10;

/// Validate configuration
/// Currently validates:
/// - Feed URL, IGDB credentials and Matrix settings are non-empty
/// - Thumbnail dimensions and batch timeout are not 0
/// - max_screenshots does not exceed the limit
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let required = [
        ("feed.url", &config.feed.url),
        ("igdb.client_id", &config.igdb.client_id),
        ("igdb.client_secret", &config.igdb.client_secret),
        ("matrix.homeserver", &config.matrix.homeserver),
        ("matrix.access_token", &config.matrix.access_token),
        ("matrix.room_id", &config.matrix.room_id),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be empty",
                key
            )));
        }
    }

    let media = &config.media;
    if media.thumbnail_width == 0 || media.thumbnail_height == 0 {
        return Err(ConfigError::ValidationError(
            "media thumbnail dimensions cannot be 0".to_string(),
        ));
    }
    if media.screenshot_batch_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "media.screenshot_batch_timeout_secs cannot be 0".to_string(),
        ));
    }
    if media.max_screenshots > MAX_SCREENSHOTS_LIMIT {
        return Err(ConfigError::ValidationError(format!(
            "media.max_screenshots cannot exceed {}",
            MAX_SCREENSHOTS_LIMIT
        )));
    }

    Ok(())
}
