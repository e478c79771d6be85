//! HTTP tile server
//!
//! Everything the handlers need is built once at startup into an
//! [`AppContext`] and shared read-only between requests.

use crate::compression::gzip_encode;
use crate::config::ServerConfig;
use crate::container::N5Container;
use crate::error::{N5Error, Result};
use crate::index::{discover, DatasetDescriptor};
use crate::link::viewer_link;
use crate::precomputed::{build_info, open_level, parse_route, ChunkBox, Route};
use crate::utils::format_bytes;
use axum::extract::{Path as AxumPath, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// A published dataset with its open container
#[derive(Debug, Clone)]
pub struct ServedDataset {
    pub descriptor: DatasetDescriptor,
    pub container: N5Container,
    pub viewer_link: String,
}

/// Immutable state shared by all handlers
#[derive(Debug)]
pub struct AppContext {
    pub config: ServerConfig,
    pub datasets: BTreeMap<String, ServedDataset>,
}

impl AppContext {
    pub fn dataset(&self, name: &str) -> Result<&ServedDataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| N5Error::NotFound(format!("unknown dataset {:?}", name)))
    }
}

/// Index the data directory and open every container found
pub async fn build_context(config: ServerConfig) -> Result<AppContext> {
    config.validate().await?;

    let mut datasets = BTreeMap::new();
    for (name, descriptor) in discover(&config.root).await? {
        let container = match N5Container::open(&descriptor.container_path).await {
            Ok(container) => container,
            Err(e) => {
                warn!("skipping {}: {}", name, e);
                continue;
            }
        };
        let link = viewer_link(
            &config.viewer_url,
            &config.public_url,
            &name,
            config.base_resolution,
            [0.0, 0.0, 0.0],
            1.0,
        );
        datasets.insert(
            name,
            ServedDataset {
                descriptor,
                container,
                viewer_link: link,
            },
        );
    }

    if datasets.is_empty() {
        warn!("no N5 containers found under {}", config.root.display());
    }
    Ok(AppContext { config, datasets })
}

/// Routes of the tile server
pub fn router(context: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/healthz", get(healthz))
        .route("/*path", get(dispatch))
        .with_state(context)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve until the process is stopped
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr();
    let context = Arc::new(build_context(config).await?);

    info!(
        "serving {} datasets on http://{}",
        context.datasets.len(),
        addr
    );
    for (name, dataset) in &context.datasets {
        info!("{}: {}", name, dataset.viewer_link);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(context)).await?;
    Ok(())
}

/// Error response carrying an [`N5Error`]
struct ApiError(N5Error);

impl From<N5Error> for ApiError {
    fn from(err: N5Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            warn!("request failed: {}", self.0);
        } else {
            debug!("rejected request: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

/// HTTP status for a library error
pub fn status_for(err: &N5Error) -> StatusCode {
    match err {
        N5Error::NotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn dispatch(
    State(context): State<Arc<AppContext>>,
    AxumPath(path): AxumPath<String>,
    headers: HeaderMap,
) -> std::result::Result<Response, ApiError> {
    match parse_route(&path)? {
        Route::Info { dataset } => {
            let served = context.dataset(&dataset)?;
            let info = build_info(
                &served.container,
                &served.descriptor.group,
                context.config.base_resolution,
                context.config.max_scale_levels,
            )
            .await?;
            Ok(Json(info).into_response())
        }
        Route::Chunk {
            dataset,
            level,
            chunk,
        } => {
            let served = context.dataset(&dataset)?;
            let data = read_chunk(served, level, &chunk).await?;
            Ok(octet_stream(data, accepts_gzip(&headers))?)
        }
    }
}

async fn read_chunk(served: &ServedDataset, level: u32, chunk: &ChunkBox) -> Result<Bytes> {
    let dataset = open_level(&served.container, &served.descriptor.group, level).await?;
    let data = dataset.read_box(&chunk.to_bounds()).await?;
    debug!(
        "{} level {} chunk {}: {}",
        served.descriptor.name,
        level,
        chunk,
        format_bytes(data.len())
    );
    Ok(data)
}

/// Whether the client accepts a gzip encoded body
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("gzip"))
}

fn octet_stream(data: Bytes, gzip: bool) -> Result<Response> {
    let mut response = Response::new(axum::body::Body::empty());
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    let body = if gzip && !response.headers().contains_key(header::CONTENT_ENCODING) {
        response
            .headers_mut()
            .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        Bytes::from(gzip_encode(&data)?)
    } else {
        data
    };
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
    *response.body_mut() = body.into();
    Ok(response)
}

async fn index_page(State(context): State<Arc<AppContext>>) -> Html<String> {
    let mut rows = String::new();
    for (name, served) in &context.datasets {
        let d = &served.descriptor;
        let _ = write!(
            rows,
            r#"
      <tr>
        <td><a href="{link}">{name}</a></td>
        <td>{path}</td>
        <td>{arrays}</td>
        <td>{thumbnail}</td>
        <td>{readme}</td>
      </tr>"#,
            link = escape_html(&served.viewer_link),
            name = escape_html(name),
            path = escape_html(&d.container_path.to_string_lossy()),
            arrays = d.dataset_paths.len(),
            thumbnail = escape_html(&d.thumbnail),
            readme = escape_html(&d.readme),
        );
    }

    Html(format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <title>N5 datasets</title>
    <style>
      body {{ font-family: ui-sans-serif, system-ui, sans-serif; margin: 2em; }}
      td, th {{ padding: 0.3em 1em; text-align: left; }}
    </style>
  </head>
  <body>
    <h1>N5 datasets</h1>
    <table>
      <tr><th>Dataset</th><th>Container</th><th>Arrays</th><th>Thumbnail</th><th>Readme</th></tr>{rows}
    </table>
  </body>
</html>"#
    ))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&N5Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&N5Error::OutOfBounds("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&N5Error::InvalidRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&N5Error::InvalidDimensions("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&N5Error::Decompression("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_accepts_gzip() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_gzip(&headers));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("deflate, br"));
        assert!(!accepts_gzip(&headers));
        headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("GZIP;q=1.0"));
        assert!(accepts_gzip(&headers));
    }

    #[test]
    fn test_octet_stream_headers() {
        let plain = octet_stream(Bytes::from_static(&[1, 2, 3]), false).unwrap();
        assert_eq!(plain.headers()[header::CONTENT_LENGTH], "3");
        assert!(plain.headers().get(header::CONTENT_ENCODING).is_none());

        let zipped = octet_stream(Bytes::from(vec![7u8; 4096]), true).unwrap();
        assert_eq!(zipped.headers()[header::CONTENT_ENCODING], "gzip");
        assert_eq!(zipped.headers()[header::CONTENT_TYPE], "application/octet-stream");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
