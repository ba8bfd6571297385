//! Tool host: serves a [`ToolRouter`] over the standard streams.
//!
//! Runs inside the subprocess the bridge spawns. Reads one request
//! frame per line from stdin, writes one correlated response frame per
//! line to stdout, exits on EOF. Logs go to stderr; stdout carries
//! nothing but protocol frames.

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use crate::protocol::{HostOp, HostReply, HostRequest, HostResponse};
use crate::tools::ToolRouter;

pub async fn serve(router: ToolRouter) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!(tools = router.len(), "tool host serving on stdio");

    while let Some(line) = lines.next_line().await.context("stdin read failed")? {
        if line.trim().is_empty() {
            continue;
        }

        let request: HostRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                // No id to correlate with; the peer's timeout covers it.
                warn!(error = %e, "discarding malformed request frame");
                continue;
            }
        };

        let response = handle(&router, request).await;
        let mut frame = serde_json::to_string(&response).context("cannot encode response")?;
        frame.push('\n');
        stdout
            .write_all(frame.as_bytes())
            .await
            .context("stdout write failed")?;
        stdout.flush().await.context("stdout flush failed")?;
    }

    info!("stdin closed, tool host exiting");
    Ok(())
}

async fn handle(router: &ToolRouter, request: HostRequest) -> HostResponse {
    let reply = match request.op {
        HostOp::ListTools => HostReply::Tools {
            tools: router.definitions(),
        },
        HostOp::CallTool { name, arguments } => match router.execute(&name, arguments).await {
            Ok(content) => HostReply::Result {
                content,
                is_error: false,
            },
            // Router/tool errors travel as failed results, never as
            // dropped frames.
            Err(e) => HostReply::Result {
                content: format!("{:#}", e),
                is_error: true,
            },
        },
    };

    HostResponse {
        id: request.id,
        reply,
    }
}
