use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::platforms::{LogTarget, ModerationTransport, TransportError};
use crate::types::{ChannelHandle, MessageEvent};

/// Line-oriented transport for local runs and replaying captured traffic.
///
/// Inbound events are JSON objects, one per line. Warnings and audit log
/// entries are written to the output as tagged blocks.
pub struct ConsoleConnection<W> {
    output: Mutex<W>,
}

impl<W> ConsoleConnection<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(output: W) -> Self {
        Self {
            output: Mutex::new(output),
        }
    }

    async fn write_block(&self, header: &str, text: &str) -> Result<(), TransportError> {
        let mut output = self.output.lock().await;
        let block = format!("{}\n{}\n\n", header, text);

        output.write_all(block.as_bytes()).await.map_err(write_error)?;
        output.flush().await.map_err(write_error)
    }

    /// Consume the writer, mainly so tests can inspect what was written
    pub fn into_inner(self) -> W {
        self.output.into_inner()
    }
}

#[async_trait]
impl<W> ModerationTransport for ConsoleConnection<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_warning(&self, target: &MessageEvent, text: &str) -> Result<(), TransportError> {
        let header = format!(
            "[warning -> #{} reply to {}]",
            target.channel_name, target.message_id
        );
        self.write_block(&header, text).await
    }

    async fn resolve_log_channel(
        &self,
        guild_id: &str,
        target: &LogTarget<'_>,
    ) -> Result<Option<ChannelHandle>, TransportError> {
        let handle = match target.channel_id {
            Some(id) => ChannelHandle::named(id, target.channel_name),
            None if !target.channel_name.is_empty() => {
                ChannelHandle::named(format!("{}:{}", guild_id, target.channel_name), target.channel_name)
            }
            None => return Ok(None),
        };

        debug!("Resolved console log channel for guild {}: {:?}", guild_id, handle);
        Ok(Some(handle))
    }

    async fn send_log(&self, channel: &ChannelHandle, text: &str) -> Result<(), TransportError> {
        let label = channel.name.as_deref().unwrap_or(&channel.id);
        self.write_block(&format!("[log -> #{}]", label), text).await
    }

    fn platform_name(&self) -> &str {
        "console"
    }
}

/// A reader that hung up on the output means nothing further can be delivered
fn write_error(e: std::io::Error) -> TransportError {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe => TransportError::Closed,
        _ => TransportError::Delivery(e.to_string()),
    }
}

/// Read JSON-lines message events and forward them to the pipeline.
///
/// Malformed lines are skipped with a warning. The task ends when the input
/// closes or the receiving side is dropped, returning the number of events
/// forwarded.
pub fn spawn_event_reader<R>(reader: R, sender: mpsc::Sender<MessageEvent>) -> JoinHandle<Result<usize>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut forwarded = 0usize;

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event: MessageEvent = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping malformed event line: {}", e);
                    continue;
                }
            };

            if sender.send(event).await.is_err() {
                info!("Event consumer closed, stopping reader");
                break;
            }
            forwarded += 1;
        }

        debug!("Event reader finished after {} events", forwarded);
        Ok::<usize, anyhow::Error>(forwarded)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelKind;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::BufReader;

    /// Writer that fails every write with a fixed error kind
    struct FailingWriter(io::ErrorKind);

    impl AsyncWrite for FailingWriter {
        fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::from(self.0)))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn event() -> MessageEvent {
        MessageEvent {
            message_id: "m9".to_string(),
            author_id: "7".to_string(),
            author_name: None,
            author_is_bot: false,
            guild_id: Some("g".to_string()),
            channel_id: "c".to_string(),
            channel_name: "general".to_string(),
            channel_kind: ChannelKind::Text,
            content: Some("hi".to_string()),
            timestamp: chrono::Utc::now(),
            permalink: String::new(),
        }
    }

    #[tokio::test]
    async fn test_console_writes_tagged_blocks() {
        let console = ConsoleConnection::new(Vec::new());

        console.send_warning(&event(), "no selling").await.unwrap();
        console
            .send_log(&ChannelHandle::named("l1", "mod-log"), "entry")
            .await
            .unwrap();

        let written = String::from_utf8(console.into_inner()).unwrap();
        assert!(written.contains("[warning -> #general reply to m9]\nno selling\n"));
        assert!(written.contains("[log -> #mod-log]\nentry\n"));
    }

    #[tokio::test]
    async fn test_console_reports_closed_output() {
        let console = ConsoleConnection::new(FailingWriter(io::ErrorKind::BrokenPipe));

        let result = console
            .send_log(&ChannelHandle::named("l1", "mod-log"), "entry")
            .await;
        assert_eq!(result, Err(TransportError::Closed));

        let result = console.send_warning(&event(), "no selling").await;
        assert_eq!(result, Err(TransportError::Closed));
    }

    #[tokio::test]
    async fn test_console_reports_other_write_errors_as_delivery_failures() {
        let console = ConsoleConnection::new(FailingWriter(io::ErrorKind::PermissionDenied));

        let result = console.send_warning(&event(), "no selling").await;
        assert!(matches!(result, Err(TransportError::Delivery(_))));
    }

    #[tokio::test]
    async fn test_console_resolves_by_id_then_name() {
        let console = ConsoleConnection::new(Vec::new());

        let by_id = console
            .resolve_log_channel("g", &LogTarget { channel_id: Some("99"), channel_name: "mod-log" })
            .await
            .unwrap();
        assert_eq!(by_id, Some(ChannelHandle::named("99", "mod-log")));

        let by_name = console
            .resolve_log_channel("g", &LogTarget { channel_id: None, channel_name: "mod-log" })
            .await
            .unwrap();
        assert_eq!(by_name, Some(ChannelHandle::named("g:mod-log", "mod-log")));

        let none = console
            .resolve_log_channel("g", &LogTarget { channel_id: None, channel_name: "" })
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_event_reader_skips_malformed_lines() {
        let input = concat!(
            r#"{"message_id":"1","author_id":"a","channel_id":"c","timestamp":"2026-01-01T00:00:00Z","content":"sell"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"message_id":"2","author_id":"b","channel_id":"c","timestamp":"2026-01-01T00:00:01Z"}"#,
            "\n",
        );
        let (tx, mut rx) = mpsc::channel(8);

        let handle = spawn_event_reader(BufReader::new(input.as_bytes()), tx);
        let forwarded = handle.await.unwrap().unwrap();

        assert_eq!(forwarded, 2);
        assert_eq!(rx.recv().await.unwrap().message_id, "1");
        assert_eq!(rx.recv().await.unwrap().message_id, "2");
    }
}
