use axum::http::{HeaderMap, HeaderName, header};

use crate::{config::Config, utils::jwt::TokenPair};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

fn cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` headers carrying a freshly issued token pair.
pub fn session_cookies(config: &Config, tokens: &TokenPair) -> [(HeaderName, String); 2] {
    [
        (
            header::SET_COOKIE,
            cookie(
                ACCESS_COOKIE_NAME,
                &tokens.access_token,
                config.access_token_expiry,
                config.cookie_secure,
            ),
        ),
        (
            header::SET_COOKIE,
            cookie(
                REFRESH_COOKIE_NAME,
                &tokens.refresh_token,
                config.refresh_token_expiry,
                config.cookie_secure,
            ),
        ),
    ]
}

/// `Set-Cookie` headers that expire both session cookies.
pub fn clear_session_cookies(config: &Config) -> [(HeaderName, String); 2] {
    [
        (
            header::SET_COOKIE,
            cookie(ACCESS_COOKIE_NAME, "", 0, config.cookie_secure),
        ),
        (
            header::SET_COOKIE,
            cookie(REFRESH_COOKIE_NAME, "", 0, config.cookie_secure),
        ),
    ]
}

/// Looks up a cookie value across every `Cookie` header of the request.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim())
        })
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("accessToken=abc.def; refreshToken=xyz"),
        );

        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), Some("abc.def"));
        assert_eq!(get_cookie(&headers, REFRESH_COOKIE_NAME), Some("xyz"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken="));
        assert_eq!(get_cookie(&headers, ACCESS_COOKIE_NAME), None);
    }

    #[test]
    fn cookie_attributes() {
        let plain = cookie("accessToken", "t", 60, false);
        assert_eq!(plain, "accessToken=t; HttpOnly; SameSite=Lax; Path=/; Max-Age=60");
        assert!(cookie("accessToken", "t", 60, true).ends_with("; Secure"));
    }
}
