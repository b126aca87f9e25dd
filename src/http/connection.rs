use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::files::FileStore;
use crate::http::parser::RequestParser;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::{rules, writer};
use crate::router::RouteTable;

/// One accepted client socket, served until a termination condition fires.
pub struct Connection {
    parser: RequestParser<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    routes: Arc<RouteTable>,
    files: Arc<FileStore>,
    shutdown: watch::Receiver<bool>,
    state: SessionState,
}

enum SessionState {
    Reading,
    Handling(Request),
    Writing(Request, Response),
    Closed,
}

impl Connection {
    pub fn new(
        stream: TcpStream,
        cfg: &Config,
        routes: Arc<RouteTable>,
        files: Arc<FileStore>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            parser: RequestParser::new(read_half, cfg.idle_timeout()),
            writer: write_half,
            routes,
            files,
            shutdown,
            state: SessionState::Reading,
        }
    }

    /// Serve requests until the connection terminates, then close the
    /// socket. The shutdown attempt runs on every exit path; shutting down
    /// an endpoint the peer already closed is tolerated.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.serve().await;

        if let Err(e) = self.writer.shutdown().await {
            debug!("socket close: {}", e);
        }

        result
    }

    /// The per-request loop: parse, route, finalize, write, then either
    /// continue on the same socket or stop.
    ///
    /// Each pass through the loop takes the current state, leaving Closed
    /// behind; a state that decides to continue puts the next one back.
    async fn serve(&mut self) -> Result<()> {
        loop {
            match std::mem::replace(&mut self.state, SessionState::Closed) {
                SessionState::Reading => {
                    tokio::select! {
                        _ = self.shutdown.changed() => {
                            debug!("shutdown requested, dropping connection");
                        }
                        parsed = self.parser.parse() => match parsed {
                            Ok(request) => self.state = SessionState::Handling(request),
                            Err(e) => {
                                // Stream-fatal: timeout, EOF, or transport
                                // failure. Terminate without responding.
                                debug!("connection ended: {}", e);
                            }
                        }
                    }
                }

                SessionState::Handling(request) => {
                    info!(
                        "{} {}{} {}",
                        request.method.map(|m| m.as_str()).unwrap_or("-"),
                        request.path.as_deref().unwrap_or("-"),
                        request.query.as_deref().unwrap_or(""),
                        request.version.as_deref().unwrap_or("-"),
                    );

                    let response = if !request.valid {
                        // Never route an invalid request; the rule engine
                        // forces the 400.
                        Response::new(400)
                    } else if let Some(handler) = self.routes.find(&request) {
                        match handler(&request) {
                            Some(response) => response,
                            None => {
                                error!(
                                    "handler for {} returned no response",
                                    request.path.as_deref().unwrap_or("-"),
                                );
                                Response::new(500)
                            }
                        }
                    } else {
                        self.default_response(&request)
                    };

                    self.state = SessionState::Writing(request, response);
                }

                SessionState::Writing(request, response) => {
                    let mut response = rules::finalize(response, &request);
                    writer::write_response(&mut response, &mut self.writer).await?;

                    if response.header("Connection") != Some("close") {
                        self.state = SessionState::Reading;
                    }
                }

                SessionState::Closed => return Ok(()),
            }
        }
    }

    /// Default behavior when no handler matches: serve the requested file.
    /// Only GET and HEAD are supported here; a handler has to be registered
    /// to accept anything else. "/" is an alias for "/index.html".
    fn default_response(&self, request: &Request) -> Response {
        match request.method {
            Some(Method::GET) | Some(Method::HEAD) => {
                let mut uri = request.path.as_deref().unwrap_or("/");
                if uri == "/" {
                    uri = "/index.html";
                }

                if !self.files.exists(uri) {
                    return Response::new(404);
                }

                let mut response = Response::with_file(
                    200,
                    self.files.path(uri),
                    self.files.length(uri),
                    self.files.content_type(uri),
                    self.files.hash(uri),
                );
                if request.method == Some(Method::HEAD) {
                    // Drop the body content but keep the entity metadata.
                    response.content = None;
                }
                response
            }
            _ => Response::new(405),
        }
    }
}
