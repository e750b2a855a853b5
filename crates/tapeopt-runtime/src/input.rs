//! Character input for the interpreter.

use std::collections::VecDeque;
use std::time::Duration;
use tapeopt_core::{Error, Result};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Supplies one byte per `Input` instruction
pub trait InputSource {
    fn read_char(&mut self) -> Result<u8>;
}

/// Pre-supplied input; running out is an error rather than a block
#[derive(Debug, Clone, Default)]
pub struct BufferedInput {
    bytes: VecDeque<u8>,
}

impl BufferedInput {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into().into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len()
    }
}

impl InputSource for BufferedInput {
    fn read_char(&mut self) -> Result<u8> {
        self.bytes
            .pop_front()
            .ok_or_else(|| Error::InvalidInput("input exhausted".to_string()))
    }
}

/// Convert a host's answer into a cell value; exactly one character is accepted.
pub fn parse_answer(answer: &str) -> Result<u8> {
    let mut chars = answer.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok((c as u32 % 256) as u8),
        (None, _) => Err(Error::InvalidInput(
            "expected a single character, got nothing".to_string(),
        )),
        (Some(_), Some(_)) => Err(Error::InvalidInput(format!(
            "expected a single character, got {}",
            answer.chars().count()
        ))),
    }
}

/// A pending request for one character, answered by the host
#[derive(Debug)]
pub struct InputRequest {
    respond_to: oneshot::Sender<String>,
}

impl InputRequest {
    /// Answer the request. Returns false if the interpreter stopped waiting.
    pub fn respond(self, answer: impl Into<String>) -> bool {
        self.respond_to.send(answer.into()).is_ok()
    }
}

/// Input obtained by posting requests to an async host.
///
/// Must be used from a blocking thread (e.g. `spawn_blocking`), never from
/// inside an async task: each read blocks until the host answers, the
/// timeout elapses, or the token is cancelled.
pub struct ChannelInput {
    requests: mpsc::Sender<InputRequest>,
    handle: Handle,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ChannelInput {
    pub fn new(
        requests: mpsc::Sender<InputRequest>,
        handle: Handle,
        timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            requests,
            handle,
            timeout,
            cancel,
        }
    }

    async fn request(&self) -> Result<String> {
        let (respond_to, reply) = oneshot::channel();
        self.requests
            .send(InputRequest { respond_to })
            .await
            .map_err(|_| Error::InputUnavailable("input host has shut down".to_string()))?;
        debug!("Waiting for interactive input");

        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(Error::InputUnavailable("input request cancelled".to_string()))
            }
            answer = self.await_reply(reply) => answer,
        }
    }

    async fn await_reply(&self, reply: oneshot::Receiver<String>) -> Result<String> {
        let answer = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, reply).await.map_err(|_| {
                Error::InputUnavailable(format!("no input within {} ms", limit.as_millis()))
            })?,
            None => reply.await,
        };
        answer.map_err(|_| Error::InputUnavailable("input request was dropped".to_string()))
    }
}

impl InputSource for ChannelInput {
    fn read_char(&mut self) -> Result<u8> {
        if self.cancel.is_cancelled() {
            return Err(Error::InputUnavailable("input request cancelled".to_string()));
        }
        let answer = self.handle.block_on(self.request())?;
        parse_answer(&answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_input() {
        let mut input = BufferedInput::new("ab");
        assert_eq!(input.read_char().unwrap(), b'a');
        assert_eq!(input.remaining(), 1);
        assert_eq!(input.read_char().unwrap(), b'b');
        assert!(matches!(input.read_char(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("A").unwrap(), 65);
        assert_eq!(parse_answer("\u{100}").unwrap(), 0);
        assert!(matches!(parse_answer(""), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_answer("ab"), Err(Error::InvalidInput(_))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_channel_input_answered() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut input = ChannelInput::new(tx, Handle::current(), None, CancellationToken::new());

        let reader = tokio::task::spawn_blocking(move || input.read_char());
        let request = rx.recv().await.unwrap();
        assert!(request.respond("x"));

        assert_eq!(reader.await.unwrap().unwrap(), b'x');
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_channel_input_times_out() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut input = ChannelInput::new(
            tx,
            Handle::current(),
            Some(Duration::from_millis(20)),
            CancellationToken::new(),
        );

        let reader = tokio::task::spawn_blocking(move || input.read_char());
        let _unanswered = rx.recv().await.unwrap();

        assert!(matches!(
            reader.await.unwrap(),
            Err(Error::InputUnavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_channel_input_cancelled() {
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let mut input = ChannelInput::new(tx, Handle::current(), None, cancel.clone());

        let reader = tokio::task::spawn_blocking(move || input.read_char());
        let _unanswered = rx.recv().await.unwrap();
        cancel.cancel();

        assert!(matches!(
            reader.await.unwrap(),
            Err(Error::InputUnavailable(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_channel_input_host_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut input = ChannelInput::new(tx, Handle::current(), None, CancellationToken::new());

        let result = tokio::task::spawn_blocking(move || input.read_char())
            .await
            .unwrap();
        assert!(matches!(result, Err(Error::InputUnavailable(_))));
    }
}
