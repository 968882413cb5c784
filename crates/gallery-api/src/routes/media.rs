use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use gallery_shared::errors::{AppError, AppResult, ErrorCode};
use gallery_shared::middleware::ApiQuery;

use crate::AppState;

/// Upstream headers copied onto the proxied response.
const PASSTHROUGH_HEADERS: &[header::HeaderName] = &[
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    header::ACCEPT_RANGES,
    header::ETAG,
    header::LAST_MODIFIED,
];

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    fn accepts(&self, content_type: &str) -> bool {
        let content_type = content_type.trim().to_ascii_lowercase();
        match self {
            MediaKind::Image => content_type.starts_with("image/"),
            MediaKind::Video => {
                content_type.starts_with("video/") || content_type.starts_with("application/octet-stream")
            }
        }
    }
}

/// Parses the target and checks scheme and host allowlist. An entry in
/// `allowed` matches the host itself and any subdomain.
pub fn validate_target(raw: &str, allowed: &[String]) -> AppResult<reqwest::Url> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| AppError::new(ErrorCode::ProxyUrlInvalid, format!("invalid url: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::new(
            ErrorCode::ProxyUrlInvalid,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::new(ErrorCode::ProxyUrlInvalid, "url has no host"))?
        .to_ascii_lowercase();

    let permitted = allowed.is_empty()
        || allowed
            .iter()
            .any(|a| host == *a || host.ends_with(&format!(".{a}")));
    if !permitted {
        return Err(AppError::new(
            ErrorCode::ProxyHostNotAllowed,
            format!("host '{host}' is not allowed"),
        ));
    }

    Ok(url)
}

// --- GET /api/proxy/image?url= ---

pub async fn proxy_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<ProxyParams>,
) -> AppResult<Response> {
    proxy_media(&state, &params.url, MediaKind::Image, &headers).await
}

// --- GET /api/proxy/video?url= ---

pub async fn proxy_video(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiQuery(params): ApiQuery<ProxyParams>,
) -> AppResult<Response> {
    proxy_media(&state, &params.url, MediaKind::Video, &headers).await
}

async fn proxy_media(
    state: &AppState,
    raw_url: &str,
    kind: MediaKind,
    headers: &HeaderMap,
) -> AppResult<Response> {
    let url = validate_target(raw_url, &state.config.allowed_hosts())?;

    let mut request = state.http_client.get(url.clone());
    if kind == MediaKind::Video {
        if let Some(range) = headers.get(header::RANGE) {
            request = request.header(header::RANGE, range.clone());
        }
    }

    let upstream = request.send().await.map_err(|e| {
        tracing::warn!(error = %e, upstream = %url, "media fetch failed");
        AppError::new(ErrorCode::UpstreamUnavailable, "upstream media unavailable")
    })?;

    let status = upstream.status();
    if status == StatusCode::NOT_FOUND {
        return Err(AppError::new(ErrorCode::UpstreamNotFound, "upstream media not found"));
    }
    if !status.is_success() {
        tracing::warn!(status = %status, upstream = %url, "upstream returned an error");
        return Err(AppError::new(
            ErrorCode::UpstreamUnavailable,
            format!("upstream responded with {status}"),
        ));
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !kind.accepts(content_type) {
        return Err(AppError::new(
            ErrorCode::UpstreamInvalidMedia,
            format!("upstream content type '{content_type}' is not {kind:?} media"),
        ));
    }

    let mut response_headers = HeaderMap::new();
    for name in PASSTHROUGH_HEADERS {
        if let Some(value) = upstream.headers().get(name) {
            response_headers.insert(name.clone(), value.clone());
        }
    }
    response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=86400"));

    let body = Body::from_stream(upstream.bytes_stream());
    Ok((status, response_headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_matches_subdomains_only() {
        let allowed = vec!["example.com".to_string()];
        assert!(validate_target("https://example.com/a.jpg", &allowed).is_ok());
        assert!(validate_target("https://img.example.com/a.jpg", &allowed).is_ok());

        let err = validate_target("https://notexample.com/a.jpg", &allowed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProxyHostNotAllowed);
    }

    #[test]
    fn empty_allowlist_allows_any_http_host() {
        assert!(validate_target("http://anything.test/v.mp4", &[]).is_ok());
    }

    #[test]
    fn rejects_non_http_and_garbage() {
        for raw in ["file:///etc/passwd", "javascript:alert(1)", "not a url", ""] {
            let err = validate_target(raw, &[]).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ProxyUrlInvalid, "{raw}");
        }
    }

    #[test]
    fn media_kinds_check_content_type() {
        assert!(MediaKind::Image.accepts("image/jpeg"));
        assert!(MediaKind::Image.accepts("Image/WEBP"));
        assert!(!MediaKind::Image.accepts("text/html; charset=utf-8"));
        assert!(MediaKind::Video.accepts("video/mp4"));
        assert!(MediaKind::Video.accepts("application/octet-stream"));
        assert!(!MediaKind::Video.accepts("image/png"));
    }
}
