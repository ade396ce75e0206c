//! Preview server with on-demand post generation

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::content::ContentApi;
use crate::generator::Generator;
use crate::helpers::{is_safe_uid, post_url};
use crate::Blog;

/// Server state
struct ServerState<C> {
    blog: Blog,
    generator: Generator,
    client: C,
}

/// Start the preview server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = Arc::new(ServerState {
        blog: blog.clone(),
        generator: Generator::new(blog)?,
        client: blog.client()?,
    });
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router<C: ContentApi + 'static>(state: Arc<ServerState<C>>) -> Router {
    let public_dir = &state.blog.public_dir;
    let static_files =
        ServeDir::new(public_dir).not_found_service(ServeFile::new(public_dir.join("404.html")));

    Router::new()
        .route("/post/:uid", get(redirect_handler::<C>))
        .route("/post/:uid/", get(post_handler::<C>))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `/post/{uid}` -> `/post/{uid}/`
async fn redirect_handler<C: ContentApi + 'static>(
    State(state): State<Arc<ServerState<C>>>,
    Path(uid): Path<String>,
) -> Redirect {
    Redirect::permanent(&post_url(&state.blog.config, &uid))
}

/// Serve a post page, generating it first if it was not built yet
async fn post_handler<C: ContentApi + 'static>(
    State(state): State<Arc<ServerState<C>>>,
    Path(uid): Path<String>,
) -> Response {
    if !is_safe_uid(&uid) {
        return not_found(&state).await;
    }

    let path = state.generator.post_output_path(&uid);
    if !path.exists() {
        match state.generator.generate_post(&state.client, &uid).await {
            Ok(Some(_)) => tracing::info!("Generated post {} on demand", uid),
            Ok(None) => return not_found(&state).await,
            Err(e) => {
                tracing::error!("Failed to generate post {}: {:#}", uid, e);
                return (StatusCode::BAD_GATEWAY, "Failed to load post").into_response();
            }
        }
    }

    match tokio::fs::read_to_string(&path).await {
        Ok(content) => Html(content).into_response(),
        Err(e) => {
            tracing::error!("Failed to read {:?}: {}", path, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

async fn not_found<C>(state: &ServerState<C>) -> Response {
    let body = tokio::fs::read_to_string(state.generator.not_found_path())
        .await
        .unwrap_or_else(|_| "Not found".to_string());
    (StatusCode::NOT_FOUND, Html(body)).into_response()
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
