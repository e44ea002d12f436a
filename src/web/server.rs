use super::page::{self, PageSettings};
use crate::app::AppContext;
use crate::error::DashboardError;
use crate::series::DateRange;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{self, HeaderValue};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Shared, immutable state behind every connection
pub struct ServerState {
    pub app: AppContext,
    pub page: PageSettings,
}

/// HTTP front end for the dashboard
///
/// Serves the page, the JSON view for each refresh tick, the report and the
/// raw observations file. File reads run on the blocking pool so a slow disk
/// only stalls the request that hit it.
pub struct DashboardServer {
    state: Arc<ServerState>,
}

#[derive(Serialize)]
struct ReportBody<'a> {
    report: &'a str,
}

impl DashboardServer {
    pub fn new(app: AppContext, page: PageSettings) -> Self {
        Self {
            state: Arc::new(ServerState { app, page }),
        }
    }

    /// Bind `addr` and serve until `shutdown` changes
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Server` if the address cannot be bound.
    pub async fn run(
        self,
        addr: SocketAddr,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), DashboardError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| DashboardError::Server(format!("failed to bind {}: {}", addr, e)))?;
        info!("Dashboard listening on http://{}", listener.local_addr()?);
        serve(listener, self.state, shutdown).await
    }
}

/// Accept connections on `listener` until `shutdown` changes
pub async fn serve(
    listener: TcpListener,
    state: Arc<ServerState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), DashboardError> {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        continue;
                    }
                };

                let io = TokioIo::new(stream);
                let state = Arc::clone(&state);

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                        let state = Arc::clone(&state);
                        async move { handle_request(req, state).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("Connection from {} ended with error: {}", peer, e);
                    }
                });
            }
            _ = shutdown.changed() => {
                info!("Dashboard server shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<ServerState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    let response = respond(state, &method, &path, query.as_deref()).await;
    debug!("{} {} -> {}", method, path, response.status());
    Ok(response)
}

/// Route one request
pub async fn respond(
    state: Arc<ServerState>,
    method: &Method,
    path: &str,
    query: Option<&str>,
) -> Response<Full<Bytes>> {
    if method != Method::GET {
        let mut response = text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
        response
            .headers_mut()
            .insert(header::ALLOW, HeaderValue::from_static("GET"));
        return response;
    }

    match path {
        "/" => with_type(
            StatusCode::OK,
            "text/html; charset=utf-8",
            page::render(&state.page),
        ),
        "/api/dashboard" => dashboard(state, query).await,
        "/api/report" => report(state).await,
        "/health" | "/healthz" => text(StatusCode::OK, "OK"),
        _ if path == state.page.download_path => download(state).await,
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn dashboard(state: Arc<ServerState>, query: Option<&str>) -> Response<Full<Bytes>> {
    let range = match parse_range(query) {
        Ok(range) => range,
        Err(e) => return text(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match tokio::task::spawn_blocking(move || state.app.dashboard(range)).await {
        Ok(Ok(view)) => json(&view),
        Ok(Err(e)) => {
            error!("Data refresh failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Data refresh task failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

async fn report(state: Arc<ServerState>) -> Response<Full<Bytes>> {
    match tokio::task::spawn_blocking(move || state.app.report()).await {
        Ok(Ok(report)) => json(&ReportBody { report: &report }),
        Ok(Err(e)) => {
            error!("Report refresh failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Report refresh task failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

async fn download(state: Arc<ServerState>) -> Response<Full<Bytes>> {
    let filename = state
        .page
        .download_path
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("observations.csv")
        .to_string();

    match tokio::task::spawn_blocking(move || state.app.raw_data()).await {
        Ok(Ok(Some(bytes))) => {
            let mut response = with_type(StatusCode::OK, "text/csv; charset=utf-8", bytes);
            if let Ok(value) =
                HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, value);
            }
            response
        }
        Ok(Ok(None)) => text(StatusCode::NOT_FOUND, "Observations file not available"),
        Ok(Err(e)) => {
            error!("Download failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => {
            error!("Download task failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

/// Parse `start=YYYY-MM-DD&end=YYYY-MM-DD`; both or neither must be present
///
/// Values are percent-decoded. Empty values count as absent, which is what a
/// cleared date picker sends.
pub fn parse_range(query: Option<&str>) -> Result<Option<DateRange>, DashboardError> {
    let mut start = None;
    let mut end = None;

    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "start" => start = Some(value.into_owned()),
            "end" => end = Some(value.into_owned()),
            _ => {}
        }
    }

    match (start, end) {
        (None, None) => Ok(None),
        (Some(start), Some(end)) => DateRange::parse(&start, &end).map(Some),
        _ => Err(DashboardError::InvalidRange(
            "both start and end are required".to_string(),
        )),
    }
}

fn json<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => with_type(StatusCode::OK, "application/json", body),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
        }
    }
}

fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    with_type(status, "text/plain; charset=utf-8", body)
}

fn with_type(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}
