// src/config.rs

use std::env;
use std::error::Error;
use std::path::PathBuf;

use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres URL. When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub port: u16,

    pub access_token_secret: String,
    /// Access token lifetime in seconds.
    pub access_token_expiry: i64,
    pub refresh_token_secret: String,
    /// Refresh token lifetime in seconds.
    pub refresh_token_expiry: i64,

    /// Adds the `Secure` attribute to session cookies.
    pub cookie_secure: bool,
    pub cors_origins: Vec<String>,

    /// Directory the local media store writes into.
    pub media_dir: PathBuf,
    /// URL prefix under which `media_dir` is served.
    pub media_base_url: String,
    /// Where uploaded files are written before handing them to the media store.
    pub upload_staging_dir: PathBuf,

    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn Error>> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()?;

        let access_token_secret =
            env::var("ACCESS_TOKEN_SECRET").map_err(|_| "ACCESS_TOKEN_SECRET must be set")?;
        let refresh_token_secret =
            env::var("REFRESH_TOKEN_SECRET").map_err(|_| "REFRESH_TOKEN_SECRET must be set")?;

        let access_token_expiry =
            parse_duration_secs(&env::var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|_| "1d".into()))
                .ok_or("ACCESS_TOKEN_EXPIRY is not a valid duration")?;
        let refresh_token_expiry =
            parse_duration_secs(&env::var("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|_| "10d".into()))
                .ok_or("REFRESH_TOKEN_EXPIRY is not a valid duration")?;

        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cors_origins = env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let media_dir = env::var("MEDIA_DIR")
            .unwrap_or_else(|_| "public/media".to_string())
            .into();
        let media_base_url = env::var("MEDIA_BASE_URL").unwrap_or_else(|_| "/media".to_string());
        let upload_staging_dir = env::var("UPLOAD_STAGING_DIR")
            .unwrap_or_else(|_| "public/temp".to_string())
            .into();

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            port,
            access_token_secret,
            access_token_expiry,
            refresh_token_secret,
            refresh_token_expiry,
            cookie_secure,
            cors_origins,
            media_dir,
            media_base_url,
            upload_staging_dir,
            rust_log,
        })
    }
}

/// Longest accepted token lifetime: ten years.
const MAX_DURATION_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Parses `"900"`, `"30s"`, `"15m"`, `"12h"` or `"10d"` into seconds.
/// Values above ten years are rejected.
pub fn parse_duration_secs(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&raw[..i], c.to_ascii_lowercase()),
        _ => (raw, 's'),
    };

    let value: i64 = digits.trim().parse().ok()?;
    if value <= 0 {
        return None;
    }

    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        'd' => 24 * 60 * 60,
        _ => return None,
    };

    value
        .checked_mul(multiplier)
        .filter(|secs| *secs <= MAX_DURATION_SECS)
}

#[cfg(test)]
mod tests {
    use super::parse_duration_secs;

    #[test]
    fn parses_plain_seconds_and_units() {
        assert_eq!(parse_duration_secs("900"), Some(900));
        assert_eq!(parse_duration_secs("30s"), Some(30));
        assert_eq!(parse_duration_secs("15m"), Some(900));
        assert_eq!(parse_duration_secs("2h"), Some(7200));
        assert_eq!(parse_duration_secs("10d"), Some(864_000));
        assert_eq!(parse_duration_secs(" 1D "), Some(86_400));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_duration_secs(""), None);
        assert_eq!(parse_duration_secs("d"), None);
        assert_eq!(parse_duration_secs("5w"), None);
        assert_eq!(parse_duration_secs("-5"), None);
        assert_eq!(parse_duration_secs("0"), None);
    }

    #[test]
    fn rejects_lifetimes_beyond_ten_years() {
        assert_eq!(parse_duration_secs("3650d"), Some(315_360_000));
        assert_eq!(parse_duration_secs("3651d"), None);
        assert_eq!(parse_duration_secs(&i64::MAX.to_string()), None);
        assert_eq!(parse_duration_secs("9223372036854775807d"), None);
    }
}
