//! The refresh-token cookie.
//!
//! The browser holds the refresh token in an httpOnly cookie named `jwt`.
//! Cookies are read and written as raw headers; the API never sets more
//! than this one cookie.

use axum::http::header::COOKIE;
use axum::http::{HeaderMap, HeaderValue};

/// Name of the refresh-token cookie.
pub const REFRESH_COOKIE: &str = "jwt";

/// Extract the refresh token from the request's `Cookie` headers, if any.
pub fn read_refresh_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value that stores `token` for `max_age_secs`.
pub fn refresh_cookie_header(token: &str, max_age_secs: i64, secure: bool) -> HeaderValue {
    build(token, max_age_secs, secure)
}

/// `Set-Cookie` value that removes the refresh cookie.
pub fn clear_cookie_header(secure: bool) -> HeaderValue {
    build("", 0, secure)
}

fn build(value: &str, max_age_secs: i64, secure: bool) -> HeaderValue {
    let mut cookie = format!("{REFRESH_COOKIE}={value}; HttpOnly; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure; SameSite=None");
    } else {
        cookie.push_str("; SameSite=Lax");
    }
    // JWTs and the attributes above are plain ASCII.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static("jwt=; Max-Age=0"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; jwt=abc.def.ghi; lang=en"));
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn reads_cookie_from_second_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("jwt=token"));
        assert_eq!(read_refresh_cookie(&headers).as_deref(), Some("token"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        let mut headers = HeaderMap::new();
        assert!(read_refresh_cookie(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("jwt="));
        assert!(read_refresh_cookie(&headers).is_none());
        headers.insert(COOKIE, HeaderValue::from_static("notjwt=value"));
        assert!(read_refresh_cookie(&headers).is_none());
    }

    #[test]
    fn secure_cookie_attributes() {
        let value = refresh_cookie_header("tok", 604_800, true);
        let value = value.to_str().unwrap();
        assert!(value.starts_with("jwt=tok;"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("Max-Age=604800"));
        assert!(value.contains("Secure; SameSite=None"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let value = clear_cookie_header(false);
        let value = value.to_str().unwrap();
        assert!(value.starts_with("jwt=;"));
        assert!(value.contains("Max-Age=0"));
        assert!(!value.contains("Secure"));
    }
}
