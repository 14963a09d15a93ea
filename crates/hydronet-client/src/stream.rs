use crate::decoder::SseDecoder;
use futures_util::stream::{self, BoxStream, StreamExt};
use futures_util::Stream;
use hydronet_core::{HydroNetError, HydroNetResult, StreamEvent};
use std::pin::Pin;
use tracing::debug;

/// Forward-only sequence of decoded chat events.
///
/// The sequence ends after end of input, after a `Complete` event, or after
/// the first `Err`. A server `error` event is delivered as
/// [`HydroNetError::Server`] rather than as a [`StreamEvent::Error`].
/// Dropping the stream drops the underlying byte source.
pub type EventStream = BoxStream<'static, HydroNetResult<StreamEvent>>;

type ByteSource<B, E> = Pin<Box<dyn Stream<Item = Result<B, E>> + Send>>;

struct DecodeState<B, E> {
    source: Option<ByteSource<B, E>>,
    decoder: SseDecoder,
    eof: bool,
}

impl<B, E> DecodeState<B, E> {
    /// Drops the byte source; nothing more is read after this.
    fn release(&mut self) {
        if self.source.take().is_some() {
            debug!("Released chat stream source");
        }
    }
}

/// Wraps a chunked byte stream (for example `reqwest::Response::bytes_stream`)
/// into an [`EventStream`].
pub fn event_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        source: Some(Box::pin(bytes) as ByteSource<B, E>),
        decoder: SseDecoder::new(),
        eof: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            // Terminal items release the source first; the next poll ends.
            let source = state.source.as_mut()?;

            match state.decoder.next_event() {
                Ok(Some(StreamEvent::Error { message })) => {
                    state.release();
                    return Some((Err(HydroNetError::Server(message)), state));
                }
                Ok(Some(event)) => {
                    if event.is_terminal() {
                        state.release();
                    }
                    return Some((Ok(event), state));
                }
                Ok(None) => {}
                Err(e) => {
                    state.release();
                    return Some((Err(e), state));
                }
            }

            if state.eof {
                state.release();
                return None;
            }

            match source.next().await {
                Some(Ok(chunk)) => state.decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    state.release();
                    return Some((
                        Err(HydroNetError::Http(format!("Stream read error: {e}"))),
                        state,
                    ));
                }
                None => {
                    state.decoder.finish();
                    state.eof = true;
                }
            }
        }
    })
    .boxed()
}
