use anyhow::Result;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Content, Response};

/// Serialize a finalized response onto the wire.
///
/// Status line, headers, blank line, then the body streamed from the content
/// source - but only when a source is present and the declared length is
/// positive, so HEAD responses keep their entity headers without a body.
/// A status code outside the reason-phrase table refuses to serialize.
pub async fn write_response<W: AsyncWrite + Unpin>(
    response: &mut Response,
    stream: &mut W,
) -> Result<()> {
    let reason = response
        .reason()
        .ok_or_else(|| anyhow::anyhow!("no reason phrase for status code {}", response.code))?;

    let mut head = format!("{} {} {}\r\n", response.version, response.code, reason).into_bytes();
    for (name, value) in &response.headers {
        head.extend_from_slice(name.as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");
    stream.write_all(&head).await?;

    let declared = response.content_length.unwrap_or(0);
    if declared > 0 {
        match response.content.take() {
            Some(Content::Bytes(bytes)) => {
                stream.write_all(&bytes).await?;
                if bytes.len() as u64 != declared {
                    tracing::warn!(
                        "wrote {} content bytes but Content-Length was {}",
                        bytes.len(),
                        declared
                    );
                }
            }
            Some(Content::File(path)) => {
                let mut file = File::open(&path).await?;
                let mut chunk = [0u8; 1024];
                let mut total: u64 = 0;
                loop {
                    let n = file.read(&mut chunk).await?;
                    if n == 0 {
                        break;
                    }
                    stream.write_all(&chunk[..n]).await?;
                    total += n as u64;
                }
                if total != declared {
                    tracing::warn!(
                        "wrote {} content bytes but Content-Length was {}",
                        total,
                        declared
                    );
                }
            }
            None => {}
        }
    }

    stream.flush().await?;
    Ok(())
}
