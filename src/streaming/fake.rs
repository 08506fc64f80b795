//! Scripted transport and sleeper for unit tests

use crate::errors::{ClientError, Result};
use crate::generation::Sleeper;
use crate::streaming::client::{ByteStream, Transport, TransportResponse};
use crate::types::GenerationRequest;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One step of a scripted body
#[derive(Debug, Clone)]
pub(crate) enum BodyStep {
    Chunk(Vec<u8>),
    Reset(String),
    Garbled(String),
    /// Never yields; stands in for a server that stopped sending
    Pending,
}

/// Scripted result of one `open` call
#[derive(Debug, Clone)]
pub(crate) enum Script {
    Refuse(String),
    /// `open` never returns
    Hang,
    Respond {
        status: u16,
        content_length: Option<u64>,
        steps: Vec<BodyStep>,
    },
}

/// Serves scripts in order and counts opened/closed bodies
#[derive(Default)]
pub(crate) struct FakeTransport {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn then(self, script: Script) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn then_refuse(self) -> Self {
        self.then(Script::Refuse("connection refused".to_string()))
    }

    pub(crate) fn then_status(self, status: u16) -> Self {
        self.then(Script::Respond {
            status,
            content_length: None,
            steps: Vec::new(),
        })
    }

    pub(crate) fn then_empty(self) -> Self {
        self.then(Script::Respond {
            status: 200,
            content_length: Some(0),
            steps: Vec::new(),
        })
    }

    /// 200 response carrying one chunk per line
    pub(crate) fn then_lines(self, lines: &[&str]) -> Self {
        let steps = lines
            .iter()
            .map(|l| BodyStep::Chunk(format!("{}\n", l).into_bytes()))
            .collect();
        self.then_steps(steps)
    }

    /// 200 response emitting the given tokens, then a reset
    pub(crate) fn then_tokens_then_reset(self, tokens: &[&str]) -> Self {
        let mut steps: Vec<BodyStep> = tokens
            .iter()
            .map(|t| BodyStep::Chunk(token_line(t).into_bytes()))
            .collect();
        steps.push(BodyStep::Reset("connection reset by peer".to_string()));
        self.then_steps(steps)
    }

    pub(crate) fn then_tokens(self, tokens: &[&str]) -> Self {
        let steps = tokens
            .iter()
            .map(|t| BodyStep::Chunk(token_line(t).into_bytes()))
            .collect();
        self.then_steps(steps)
    }

    pub(crate) fn then_steps(self, steps: Vec<BodyStep>) -> Self {
        self.then(Script::Respond {
            status: 200,
            content_length: None,
            steps,
        })
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub(crate) fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

pub(crate) fn token_line(token: &str) -> String {
    format!("data: {}\n\n", serde_json::json!({ "token": token }))
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(&self, request: &GenerationRequest) -> Result<TransportResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self.scripts.lock().unwrap().pop_front();

        match script {
            None => Err(ClientError::Transport("no scripted response".to_string())),
            Some(Script::Refuse(cause)) => Err(ClientError::Transport(cause)),
            Some(Script::Hang) => std::future::pending().await,
            Some(Script::Respond {
                status,
                content_length,
                steps,
            }) => {
                self.opened.fetch_add(1, Ordering::SeqCst);
                Ok(TransportResponse {
                    status,
                    reason: "scripted".to_string(),
                    content_length,
                    body: Box::new(FakeBody {
                        steps: steps.into(),
                        closed: Arc::clone(&self.closed),
                    }),
                })
            }
        }
    }
}

struct FakeBody {
    steps: VecDeque<BodyStep>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl ByteStream for FakeBody {
    async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        match self.steps.pop_front()? {
            BodyStep::Chunk(bytes) => Some(Ok(Bytes::from(bytes))),
            BodyStep::Reset(cause) => Some(Err(ClientError::Transport(cause))),
            BodyStep::Garbled(cause) => Some(Err(ClientError::Protocol(cause))),
            BodyStep::Pending => std::future::pending().await,
        }
    }
}

impl Drop for FakeBody {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records requested delays and returns immediately
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

/// Sleeper whose wait never ends
pub(crate) struct StalledSleeper;

#[async_trait]
impl Sleeper for StalledSleeper {
    async fn sleep(&self, _delay: Duration) {
        std::future::pending::<()>().await;
    }
}
