// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::errors::{StreamError, StreamResult};

/// Destination for rendered stream frames.
///
/// A sink error ends the stream; the caller treats it as the client
/// having gone away.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: &str) -> StreamResult<()>;
}

/// Frames forwarded over a channel, e.g. to a connection task.
#[async_trait]
impl FrameSink for mpsc::Sender<String> {
    async fn send_frame(&mut self, frame: &str) -> StreamResult<()> {
        self.send(frame.to_string())
            .await
            .map_err(|_| StreamError::SinkClosed)
    }
}

#[async_trait]
impl FrameSink for mpsc::UnboundedSender<String> {
    async fn send_frame(&mut self, frame: &str) -> StreamResult<()> {
        self.send(frame.to_string())
            .map_err(|_| StreamError::SinkClosed)
    }
}

/// Frames written straight to an async writer and flushed one by one.
pub struct WriterSink<W> {
    writer: W,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> FrameSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_frame(&mut self, frame: &str) -> StreamResult<()> {
        self.writer.write_all(frame.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
