//! The read loop for one streamed turn, exposed as a `Stream` of events.

use std::collections::VecDeque;

use futures_util::stream::{self, Stream, StreamExt};

use super::accumulator::StreamAccumulator;
use super::fallback::fetch_blocking_answer;
use crate::client::Endpoint;
use crate::error::ChatError;
use crate::models::{ChatRequest, ChatResponse};
use crate::sse::{parse_line, LineDecoder, SseLine};
use crate::traits::ByteStream;

/// Item produced while a turn is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    /// New answer text, in stream order, each piece delivered once
    Fragment(String),
    /// The turn finished; always the last item of a successful turn
    Completed(ChatResponse),
}

enum Phase {
    Connect,
    Read {
        body: ByteStream,
        decoder: LineDecoder,
        lines: VecDeque<String>,
        closed: bool,
    },
    Conclude,
    Emit(ChatResponse),
    Finished,
}

/// Owns everything one turn needs across suspension points.
struct Turn {
    endpoint: Endpoint,
    request: ChatRequest,
    accumulator: StreamAccumulator,
    phase: Phase,
}

impl Turn {
    fn new(endpoint: Endpoint, request: ChatRequest) -> Self {
        let accumulator = StreamAccumulator::new(request.conversation_id.clone());
        Self {
            endpoint,
            request,
            accumulator,
            phase: Phase::Connect,
        }
    }

    /// Drive the turn until it has something to yield.
    ///
    /// Only the network reads suspend; parsing and dispatch of the lines
    /// already received run to completion in between.
    async fn advance(&mut self) -> Option<Result<TurnEvent, ChatError>> {
        loop {
            match &mut self.phase {
                Phase::Connect => match self.endpoint.open_stream(&self.request).await {
                    Ok(body) => {
                        self.phase = Phase::Read {
                            body,
                            decoder: LineDecoder::new(),
                            lines: VecDeque::new(),
                            closed: false,
                        };
                    }
                    Err(e) => {
                        self.phase = Phase::Finished;
                        return Some(Err(e));
                    }
                },
                Phase::Read {
                    body,
                    decoder,
                    lines,
                    closed,
                } => {
                    if let Some(line) = lines.pop_front() {
                        match parse_line(&line) {
                            SseLine::Done => {
                                tracing::debug!("Stream sentinel received");
                                self.phase = Phase::Conclude;
                            }
                            SseLine::Frame(frame) => {
                                if let Some(fragment) = self.accumulator.apply(&frame) {
                                    return Some(Ok(TurnEvent::Fragment(fragment)));
                                }
                            }
                            SseLine::Skip | SseLine::Ignored => {}
                        }
                        continue;
                    }

                    if *closed {
                        self.phase = Phase::Conclude;
                        continue;
                    }

                    match body.next().await {
                        Some(Ok(chunk)) => lines.extend(decoder.decode(&chunk)),
                        Some(Err(e)) => {
                            tracing::error!("Stream read failed: {}", e);
                            self.phase = Phase::Finished;
                            return Some(Err(e.into()));
                        }
                        None => {
                            *closed = true;
                            lines.extend(decoder.finish());
                        }
                    }
                }
                Phase::Conclude => {
                    if self.accumulator.has_received_fragment() {
                        let response = std::mem::take(&mut self.accumulator).into_response();
                        self.phase = Phase::Finished;
                        return Some(Ok(TurnEvent::Completed(response)));
                    }

                    return match fetch_blocking_answer(&self.endpoint, &self.request).await {
                        Ok(response) => {
                            let fragment = response.answer.clone();
                            self.phase = Phase::Emit(response);
                            Some(Ok(TurnEvent::Fragment(fragment)))
                        }
                        Err(e) => {
                            self.phase = Phase::Finished;
                            Some(Err(e))
                        }
                    };
                }
                Phase::Emit(_) => {
                    let emitted = std::mem::replace(&mut self.phase, Phase::Finished);
                    if let Phase::Emit(response) = emitted {
                        return Some(Ok(TurnEvent::Completed(response)));
                    }
                }
                Phase::Finished => return None,
            }
        }
    }
}

/// Start a turn and return its events.
///
/// Nothing is sent until the stream is first polled. A successful turn
/// yields zero or more fragments followed by exactly one
/// [`TurnEvent::Completed`]; a failed turn ends with one error.
pub fn turn_events(
    endpoint: Endpoint,
    request: ChatRequest,
) -> impl Stream<Item = Result<TurnEvent, ChatError>> + Send {
    stream::unfold(Turn::new(endpoint, request), |mut turn| async move {
        turn.advance().await.map(|item| (item, turn))
    })
}
