//! Stdio transport: one JSON request object per input line, one envelope
//! per output line. No handshake — the wire contract is just
//! `{"op": ..., "params": ...}` in, `{"ok": ..., "data"/"error": ...}` out
//! (§6); the process-boundary protocol itself is out of scope.

use anyhow::Result;
use mcp_protocol::{ErrorBody, FacadeDispatcher, Request};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

pub struct StdioServer {
    dispatcher: FacadeDispatcher,
}

impl StdioServer {
    pub fn new(dispatcher: FacadeDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Drive the request/response loop over `stdin`/`stdout` until EOF.
    pub async fn serve(self) -> Result<()> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        self.serve_io(stdin, stdout).await
    }

    async fn serve_io<R, W>(self, input: R, mut output: W) -> Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("Stdio dispatcher ready, reading requests one per line");
        let mut reader = BufReader::new(input);
        let mut line = String::new();

        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("stdin closed, shutting down");
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    self.handle_line(trimmed, &mut output).await?;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read request line");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_line<W: AsyncWrite + Unpin>(&self, line: &str, output: &mut W) -> Result<()> {
        debug!(request = %line, "Dispatching request");

        let envelope = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.dispatcher.dispatch(request).await,
            Err(e) => {
                warn!(error = %e, "Request failed to parse");
                mcp_protocol::Envelope::failure(ErrorBody {
                    kind: "VALIDATION_ERROR".to_string(),
                    message: format!("malformed request: {e}"),
                    details: None,
                })
            }
        };

        let mut serialized = serde_json::to_string(&envelope)?;
        serialized.push('\n');
        output.write_all(serialized.as_bytes()).await?;
        output.flush().await?;
        Ok(())
    }
}
