//! CGI subprocess orchestration.
//!
//! # Responsibilities
//! - Spawn the configured interpreter with a per-request environment
//! - Stream the request body into its stdin, honouring pipe backpressure
//! - Forward its stderr to the server log, never to the client
//! - Collect its stdout through the response parser
//!
//! # Design Decisions
//! - stdin, stdout and stderr are driven concurrently within the request task
//! - Output is buffered (bounded) before the response is produced, so headers
//!   are always complete before any body byte is sent
//! - The child is killed if the request is dropped or times out
//! - Exit status is reaped in the background and only logged

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};

use crate::cgi::env::EnvironmentBuilder;
use crate::cgi::parser::{CgiResponse, ParseError, ResponseParser};
use crate::http::request::RequestContext;
use crate::observability::metrics;

const READ_CHUNK: usize = 16 * 1024;

/// Per-request gateway failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no CGI interpreter configured")]
    NoInterpreter,

    #[error("failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read request body: {0}")]
    RequestBody(#[source] axum::Error),

    #[error("failed to write to CGI stdin: {0}")]
    Stdin(#[source] io::Error),

    #[error("failed to read CGI stdout: {0}")]
    Stdout(#[source] io::Error),

    #[error(transparent)]
    InvalidOutput(#[from] ParseError),

    #[error("CGI output exceeded {limit} bytes")]
    OutputTooLarge { limit: usize },

    #[error("CGI script did not finish within {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// HTTP status reported to the client.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::NoInterpreter | GatewayError::Spawn { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            GatewayError::RequestBody(_) => StatusCode::BAD_REQUEST,
            GatewayError::Stdin(_)
            | GatewayError::Stdout(_)
            | GatewayError::InvalidOutput(_)
            | GatewayError::OutputTooLarge { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NoInterpreter => "no_interpreter",
            GatewayError::Spawn { .. } => "spawn",
            GatewayError::RequestBody(_) => "request_body",
            GatewayError::Stdin(_) => "stdin",
            GatewayError::Stdout(_) => "stdout",
            GatewayError::InvalidOutput(_) => "invalid_output",
            GatewayError::OutputTooLarge { .. } => "output_too_large",
            GatewayError::Timeout(_) => "timeout",
        }
    }
}

/// Gateway settings fixed at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub program: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub max_output_bytes: usize,
}

/// Runs scripts through the CGI interpreter.
#[derive(Debug, Clone)]
pub struct CgiGateway {
    config: GatewayConfig,
    environment: EnvironmentBuilder,
}

impl CgiGateway {
    pub fn new(config: GatewayConfig, environment: EnvironmentBuilder) -> Self {
        Self { config, environment }
    }

    /// Run `script` for `request`, feeding it `body`.
    pub async fn run(
        &self,
        request: &RequestContext,
        body: Body,
        script: &Path,
    ) -> Result<CgiResponse, GatewayError> {
        let program = self.config.program.as_deref().ok_or(GatewayError::NoInterpreter)?;
        let env = self.environment.build(request, script);

        let mut child = Command::new(program)
            .env_clear()
            .envs(env.iter())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| GatewayError::Spawn {
                program: program.to_path_buf(),
                source,
            })?;

        let pid = child.id();
        tracing::debug!(pid, script = %script.display(), "CGI process spawned");

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            return Err(GatewayError::Stdout(io::Error::other("CGI pipes were not captured")));
        };

        let exchange = async {
            let ((), response, ()) = tokio::try_join!(
                feed_stdin(stdin, body),
                collect_stdout(stdout, self.config.max_output_bytes),
                async {
                    drain_stderr(stderr, script).await;
                    Ok::<_, GatewayError>(())
                },
            )?;
            Ok::<_, GatewayError>(response)
        };

        let result = match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        pid,
                        script = %script.display(),
                        timeout = ?limit,
                        "CGI script timed out, killing"
                    );
                    let _ = child.start_kill();
                    Err(GatewayError::Timeout(limit))
                }
            },
            None => exchange.await,
        };

        if result.is_ok() {
            // The response is complete; reap the child without holding the request.
            tokio::spawn(async move {
                match child.wait().await {
                    Ok(status) if status.success() => {
                        tracing::debug!(pid, "CGI process exited");
                        metrics::record_cgi_exit(true);
                    }
                    Ok(status) => {
                        tracing::warn!(pid, %status, "CGI process exited unsuccessfully");
                        metrics::record_cgi_exit(false);
                    }
                    Err(e) => tracing::warn!(pid, error = %e, "Failed to wait for CGI process"),
                }
            });
        }

        result
    }
}

/// Copy the request body into the script's stdin, then close it.
///
/// A broken pipe means the script stopped reading its input, which is not an
/// error for the response.
async fn feed_stdin(mut stdin: ChildStdin, body: Body) -> Result<(), GatewayError> {
    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(GatewayError::RequestBody)?;
        match stdin.write_all(&chunk).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("CGI script closed stdin before the request body ended");
                return Ok(());
            }
            Err(e) => return Err(GatewayError::Stdin(e)),
        }
    }

    match stdin.shutdown().await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(GatewayError::Stdin(e)),
    }
}

/// Read stdout to EOF through a fresh parser.
async fn collect_stdout<R>(mut stdout: R, limit: usize) -> Result<CgiResponse, GatewayError>
where
    R: AsyncRead + Unpin,
{
    let mut parser = ResponseParser::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = stdout.read(&mut buf).await.map_err(GatewayError::Stdout)?;
        if n == 0 {
            break;
        }
        if parser.buffered_len() + n > limit {
            return Err(GatewayError::OutputTooLarge { limit });
        }
        parser.feed(&buf[..n])?;
    }

    Ok(parser.finish())
}

/// Log stderr line by line under the `cgi_stderr` target.
async fn drain_stderr<R>(stderr: R, script: &Path)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stderr).split(b'\n');
    loop {
        match lines.next_segment().await {
            Ok(Some(line)) => {
                let line = String::from_utf8_lossy(&line);
                tracing::info!(
                    target: "cgi_stderr",
                    script = %script.display(),
                    "{}",
                    line.trim_end()
                );
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(script = %script.display(), error = %e, "Failed to read CGI stderr");
                break;
            }
        }
    }
}
