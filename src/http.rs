mod handler;
mod views;

use crate::repositories::{AuthorRepository, BookRepository};
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Debug)]
pub struct AppState<AR, BR> {
    author_repo: Arc<AR>,
    book_repo: Arc<BR>,
}

impl<AR: AuthorRepository, BR: BookRepository> AppState<AR, BR> {
    pub fn new(author_repo: AR, book_repo: BR) -> Self {
        Self {
            author_repo: Arc::new(author_repo),
            book_repo: Arc::new(book_repo),
        }
    }
}

impl<AR: AuthorRepository, BR: BookRepository> Clone for AppState<AR, BR> {
    fn clone(&self) -> Self {
        Self {
            author_repo: Arc::clone(&self.author_repo),
            book_repo: Arc::clone(&self.book_repo),
        }
    }
}

#[derive(Debug)]
pub struct HttpServerConfig {
    host: String,
    port: u16,
}

impl HttpServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<AR: AuthorRepository, BR: BookRepository>(
        state: AppState<AR, BR>,
        config: HttpServerConfig,
    ) -> anyhow::Result<Self> {
        let router = router(state);

        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind to {addr}"))?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("listening on http://{addr}");
        }
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Received error from running server")?;
        Ok(())
    }
}

pub fn router<AR: AuthorRepository, BR: BookRepository>(state: AppState<AR, BR>) -> Router {
    Router::new()
        .route("/", get(handler::home::<AR, BR>))
        .route(
            "/add_author",
            get(handler::add_author_form).post(handler::add_author::<AR, BR>),
        )
        .route(
            "/add_book",
            get(handler::add_book_form::<AR, BR>).post(handler::add_book::<AR, BR>),
        )
        .route("/book/{id}/delete", post(handler::delete_book::<AR, BR>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutting down");
}
