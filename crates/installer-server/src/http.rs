//! The HTTP surface: every GET path lands on one handler.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, USER_AGENT};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use installer_core::router::{self, RequestParams, Routed, RouterConfig};
use installer_core::{Error, ErrorKind, Installer};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::render::ScriptKind;

/// Agents that pipe the response straight into a shell.
const TERMINAL_AGENT: &str = r"(?i)^(curl|wget|.+WindowsPowerShell)/";
/// Anything an error message may not carry into a script.
const UNSAFE_MESSAGE_CHARS: &str = r"[^A-Za-z0-9 :/.]";

/// Shared state of the server.
#[derive(Debug)]
pub struct AppState {
    installer: Installer,
    router: RouterConfig,
    landing_url: String,
    terminal_agent: Regex,
    unsafe_chars: Regex,
}

impl AppState {
    /// Bundle the pieces a request needs.
    ///
    /// # Errors
    ///
    /// Fails only if the built-in patterns do not compile.
    pub fn new(
        installer: Installer,
        router: RouterConfig,
        landing_url: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            installer,
            router,
            landing_url: landing_url.into(),
            terminal_agent: Regex::new(TERMINAL_AGENT)?,
            unsafe_chars: Regex::new(UNSAFE_MESSAGE_CHARS)?,
        })
    }

    /// Strip shell metacharacters from `msg`, and wrap it in `echo` for scripts.
    fn sanitize(&self, msg: &str, script: bool) -> String {
        let cleaned = self.unsafe_chars.replace_all(msg, "");
        if script {
            format!("echo '{cleaned}'\n")
        } else {
            format!("{cleaned}\n")
        }
    }

    fn error_response(&self, status: StatusCode, msg: &str, script: bool) -> Response {
        (
            status,
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.sanitize(msg, script),
        )
            .into_response()
    }

    fn fail(&self, err: &Error, script: bool) -> Response {
        let status = status_for(err.kind());
        if status.is_server_error() {
            warn!("request failed: {err}");
        } else {
            debug!("request rejected: {err}");
        }
        self.error_response(status, &err.to_string(), script)
    }
}

/// HTTP status for each error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidPath
        | ErrorKind::UnknownProvider
        | ErrorKind::MissingProviderUrl
        | ErrorKind::UpstreamNotFound => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamFailure | ErrorKind::NoAssets => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_root))
        .route("/{*path}", get(serve_path))
        .with_state(state)
}

type ParamsResult = Result<Query<RequestParams>, QueryRejection>;

async fn serve_root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: ParamsResult,
) -> Response {
    serve(&state, Ok(String::new()), &headers, params).await
}

async fn serve_path(
    State(state): State<Arc<AppState>>,
    path: Result<Path<String>, PathRejection>,
    headers: HeaderMap,
    params: ParamsResult,
) -> Response {
    let path = path.map(|Path(path)| path).map_err(|e| e.body_text());
    serve(&state, path, &headers, params).await
}

/// `path` arrives percent-decoded; extractor failures are answered like
/// any other rejected request.
async fn serve(
    state: &AppState,
    path: Result<String, String>,
    headers: &HeaderMap,
    params: ParamsResult,
) -> Response {
    let user_agent = header_str(headers, USER_AGENT.as_str());
    let terminal = state.terminal_agent.is_match(user_agent);

    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            let msg = rejection.body_text();
            return state.error_response(StatusCode::BAD_REQUEST, &msg, terminal);
        }
    };
    let path = match path {
        Ok(path) => path,
        Err(msg) => return state.error_response(StatusCode::BAD_REQUEST, &msg, terminal),
    };

    let requested = match params.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(kind) => kind,
        None if terminal => "script",
        None => "text",
    };
    let platform = params
        .platform
        .as_deref()
        .filter(|p| !p.is_empty())
        .unwrap_or("linux");
    let Some(kind) = ScriptKind::select(requested, platform) else {
        return state.error_response(StatusCode::BAD_REQUEST, "Unknown type", false);
    };
    let script = kind.is_script();

    let token = router::bearer_token(header_str(headers, AUTHORIZATION.as_str()));
    let route = match router::route(&path, &params, token, &state.router) {
        Ok(Routed::Install(route)) => route,
        Ok(Routed::Landing) => {
            return (
                StatusCode::MOVED_PERMANENTLY,
                [(LOCATION, state.landing_url.as_str())],
            )
                .into_response();
        }
        Err(err) => return state.fail(&err, script),
    };

    let release = match state.installer.install(route).await {
        Ok(release) => release,
        Err(err) => return state.fail(&err, script),
    };

    let body = match kind.render(&release) {
        Ok(body) => body,
        Err(err) => {
            warn!("render failed: {err}");
            return state.error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &err.to_string(),
                script,
            );
        }
    };

    let q = &release.query;
    info!(
        "serving script {}/{}@{} ({})",
        q.user,
        q.program,
        q.release,
        kind.ext()
    );
    (StatusCode::OK, [(CONTENT_TYPE, kind.content_type())], body).into_response()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
