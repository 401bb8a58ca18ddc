use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use miette::{Context, IntoDiagnostic};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{error::Error, run::Runner, selector::Mode};

/// Body of `POST /download`, sent back as is once the run is over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub url: String,
    pub audio_only: bool,
}

enum ServerError {
    Run(Error),
    Join(tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = match self {
            ServerError::Run(err) => err.to_string(),
            ServerError::Join(err) => format!("Download task aborted: {err}"),
        };
        error!("{message}");
        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

pub fn router(runner: Arc<Runner>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/download", post(post_download))
        .layer(cors)
        .with_state(runner)
}

async fn post_download(
    State(runner): State<Arc<Runner>>,
    Json(payload): Json<Payload>,
) -> Result<Json<Payload>, ServerError> {
    let url = payload.url.clone();
    let mode = Mode::from_audio_only(payload.audio_only);

    // Runs block on external programs
    let report = tokio::task::spawn_blocking(move || runner.run(&url, mode))
        .await
        .map_err(ServerError::Join)?
        .map_err(ServerError::Run)?;

    info!("Saved {}", report.output.display());
    Ok(Json(payload))
}

/// Listen on `bind` until the process is stopped
pub fn serve(runner: Arc<Runner>, bind: &str) -> miette::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()
        .wrap_err("Could not start the async runtime")?;

    rt.block_on(async {
        let listener = TcpListener::bind(bind)
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not listen on {bind}"))?;
        info!("Listening on http://{bind}");

        axum::serve(listener, router(runner))
            .await
            .into_diagnostic()
            .wrap_err("Server stopped unexpectedly")
    })
}
