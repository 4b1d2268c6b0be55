//! In-process stream transport over bounded Tokio channels.
//!
//! Every frame is a `Result<T, ServiceError>`: the sending side can end the
//! stream cleanly (drop or [`ChannelSink::close`]) or abort it with an error
//! ([`ChannelSink::fail`]), and the receiving side tells the two apart. The
//! bound on the channel is the only buffering between peers, so `send` waits
//! for the consumer.

use super::{MessageSink, MessageSource};
use crate::error::ServiceError;
use async_trait::async_trait;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

type Frame<T> = Result<T, ServiceError>;

/// Creates a connected sink/source pair holding at most `buffer` frames.
pub fn channel<T>(buffer: usize) -> (ChannelSink<T>, ChannelSource<T>) {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    (ChannelSink { sender }, ChannelSource { receiver })
}

/// Sending half of an in-process stream.
pub struct ChannelSink<T> {
    sender: mpsc::Sender<Frame<T>>,
}

impl<T> Clone for ChannelSink<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Send + 'static> ChannelSink<T> {
    /// Terminates the stream with `error`. The peer receives it after any
    /// frames already queued.
    pub async fn fail(self, error: ServiceError) -> Result<(), ServiceError> {
        self.sender
            .send(Err(error))
            .await
            .map_err(|_| ServiceError::transport("stream receiver dropped"))
    }

    /// Signals end-of-input. Dropping the sink has the same effect.
    pub fn close(self) {}
}

#[async_trait]
impl<T: Send + 'static> MessageSink<T> for ChannelSink<T> {
    async fn send(&mut self, message: T) -> Result<(), ServiceError> {
        self.sender
            .send(Ok(message))
            .await
            .map_err(|_| ServiceError::transport("stream receiver dropped"))
    }
}

/// Receiving half of an in-process stream.
pub struct ChannelSource<T> {
    receiver: mpsc::Receiver<Frame<T>>,
}

impl<T> ChannelSource<T> {
    /// Client-facing view of the stream.
    pub fn into_stream(self) -> ResponseStream<T> {
        ResponseStream {
            inner: ReceiverStream::new(self.receiver),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> MessageSource<T> for ChannelSource<T> {
    async fn recv(&mut self) -> Result<Option<T>, ServiceError> {
        match self.receiver.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

/// Response stream handed to callers of streaming calls.
///
/// Implements [`Stream`] over `Result<T, ServiceError>`; the last item is the
/// call's error when it failed. [`ResponseStream::message`] offers the
/// end-of-input aware view.
pub struct ResponseStream<T> {
    inner: ReceiverStream<Frame<T>>,
}

impl<T> ResponseStream<T> {
    /// Next message, `Ok(None)` when the call completed successfully.
    pub async fn message(&mut self) -> Result<Option<T>, ServiceError> {
        use tokio_stream::StreamExt;

        match self.inner.next().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    /// Drains the stream. Messages seen before a failure are returned with it.
    pub async fn collect_all(mut self) -> (Vec<T>, Result<(), ServiceError>) {
        let mut messages = Vec::new();
        loop {
            match self.message().await {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => return (messages, Ok(())),
                Err(e) => return (messages, Err(e)),
            }
        }
    }
}

impl<T> Stream for ResponseStream<T> {
    type Item = Frame<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_is_end_of_input_and_fail_is_error() {
        let (mut sink, mut source) = channel::<u32>(4);
        sink.send(1).await.unwrap();
        sink.close();
        assert_eq!(source.recv().await, Ok(Some(1)));
        assert_eq!(source.recv().await, Ok(None));

        let (mut sink, mut source) = channel::<u32>(4);
        sink.send(1).await.unwrap();
        sink.fail(ServiceError::transport("reset")).await.unwrap();
        assert_eq!(source.recv().await, Ok(Some(1)));
        assert_eq!(source.recv().await, Err(ServiceError::transport("reset")));
    }

    #[tokio::test]
    async fn test_send_after_receiver_dropped_is_transport_failure() {
        let (mut sink, source) = channel::<u32>(1);
        drop(source);
        let err = sink.send(7).await.unwrap_err();
        assert_eq!(err.code(), crate::error::Code::TransportFailure);
    }

    #[tokio::test]
    async fn test_response_stream_collects_until_error() {
        let (mut sink, source) = channel::<u32>(4);
        sink.send(1).await.unwrap();
        sink.send(2).await.unwrap();
        sink.fail(ServiceError::not_found("3")).await.unwrap();

        let (messages, status) = source.into_stream().collect_all().await;
        assert_eq!(messages, vec![1, 2]);
        assert_eq!(status, Err(ServiceError::not_found("3")));
    }
}
