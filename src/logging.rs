use crate::config::Config;

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use axum::body::{Body, Bytes, HttpBody};
use axum::http::{HeaderMap, Request, Response, header};
use axum::middleware::Next;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keep guards alive for the lifetime of the app.
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

fn split_path(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file = path
        .file_name()
        .unwrap_or_else(|| OsStr::new("aikitchen.log"))
        .to_string_lossy()
        .to_string();
    (dir, file)
}

pub fn init_logging(config: &Config) -> LogGuards {
    let filter = EnvFilter::new(config.log_filter());

    // Stdout layer (pretty enough, ANSI enabled)
    let stdout_layer = fmt::layer()
        .with_target(false)
        .with_ansi(true)
        .compact()
        // requires tracing-subscriber "chrono" feature
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S".to_string(),
        ));

    // Optional file layer (ANSI disabled)
    let (file_layer, guard) = {
        // Works whether `log_file` is a `PathBuf` or a `&Path`
        let path: &Path = config.log_file.as_ref();

        let (dir, file) = split_path(path);
        let appender = tracing_appender::rolling::never(dir, file);
        let (nb, guard) = tracing_appender::non_blocking(appender);

        let layer = fmt::layer()
            .with_target(false)
            .with_ansi(false)
            .compact()
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
                "%Y-%m-%d %H:%M:%S".to_string(),
            ))
            .with_writer(nb);

        (Some(layer), Some(guard))
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer);

    if let Some(file_layer) = file_layer {
        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    LogGuards { _file_guard: guard }
}

const BUFFER_LIMIT: u64 = 64 * 1024;
const PREVIEW_LIMIT: usize = 16 * 1024;

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn preview(bytes: &Bytes) -> String {
    if bytes.len() > PREVIEW_LIMIT {
        format!(
            "{}… [truncated]",
            String::from_utf8_lossy(&bytes[..PREVIEW_LIMIT])
        )
    } else {
        String::from_utf8_lossy(bytes).to_string()
    }
}

/// Only bodies with a known, small size are buffered; the rest stream through.
fn small_enough(body: &Body) -> bool {
    body.size_hint().exact().is_some_and(|n| n <= BUFFER_LIMIT)
}

/// Logs request & response bodies (dev-friendly).
/// Skips multipart requests and binary responses, truncates previews.
pub async fn log_payloads(req: Request<Body>, next: Next) -> Response<Body> {
    let req_id = request_id(req.headers());
    let is_multipart = content_type(req.headers()).starts_with("multipart/");

    let (req_parts, req_body) = req.into_parts();
    let req = if !is_multipart && small_enough(&req_body) {
        match axum::body::to_bytes(req_body, PREVIEW_LIMIT * 4).await {
            Ok(bytes) => {
                if !bytes.is_empty() {
                    tracing::debug!(request_id=%req_id, request_body=%preview(&bytes), "request body");
                }
                Request::from_parts(req_parts, Body::from(bytes))
            }
            Err(e) => {
                tracing::warn!(request_id=%req_id, error=%e, "failed reading request body");
                Request::from_parts(req_parts, Body::empty())
            }
        }
    } else {
        Request::from_parts(req_parts, req_body)
    };

    let res = next.run(req).await;

    let res_ct = content_type(res.headers()).to_string();
    let (res_parts, res_body) = res.into_parts();
    if !res_ct.starts_with("image/")
        && !res_ct.starts_with("application/octet-stream")
        && small_enough(&res_body)
    {
        match axum::body::to_bytes(res_body, PREVIEW_LIMIT * 4).await {
            Ok(bytes) => {
                if !bytes.is_empty() {
                    tracing::debug!(request_id=%req_id, response_body=%preview(&bytes), "response body");
                }
                Response::from_parts(res_parts, Body::from(bytes))
            }
            Err(e) => {
                tracing::warn!(request_id=%req_id, error=%e, "failed reading response body");
                Response::from_parts(res_parts, Body::empty())
            }
        }
    } else {
        Response::from_parts(res_parts, res_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_path_defaults() {
        let (dir, file) = split_path(Path::new("logs/app.log"));
        assert_eq!(dir, PathBuf::from("logs"));
        assert_eq!(file, "app.log");
    }

    #[test]
    fn preview_truncates_large_bodies() {
        let big = Bytes::from(vec![b'a'; PREVIEW_LIMIT + 10]);
        assert!(preview(&big).ends_with("[truncated]"));
        assert_eq!(preview(&Bytes::from_static(b"ok")), "ok");
    }

    #[test]
    fn only_small_known_bodies_are_buffered() {
        assert!(small_enough(&Body::from("hello")));
        let big = vec![0u8; usize::try_from(BUFFER_LIMIT).unwrap() + 1];
        assert!(!small_enough(&Body::from(big)));
    }
}
