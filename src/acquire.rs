//! Code acquisition: manual entry and camera decoding.
//!
//! Both modes write into one [`CandidateSlot`], overwriting what was there.
//! Camera decoding runs in a [`ScanPanel`]: a spawned loop over a
//! [`FrameDecoder`] that stops at the first decoded payload, the first
//! error, or when the panel is closed.

mod decoders;

pub use decoders::{CommandDecoder, LineDecoder};

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::model::{DeliveryId, EmptyInput};

/// Why a camera scan session ended without a code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CameraError {
    #[error("could not access camera: {0}")]
    Access(String),

    #[error("scan stream failed: {0}")]
    Stream(String),

    #[error("scanner exited with {0}")]
    Exited(String),

    #[error("scanner stopped before a code was read")]
    Ended,
}

/// One event from a decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A frame decoded to this payload.
    Decoded(String),

    /// The camera or decoder failed.
    Failed(CameraError),
}

/// A continuous source of decode events over live frames.
#[async_trait]
pub trait FrameDecoder: Send {
    /// Wait for the next event. `None` means the stream has ended.
    async fn next_event(&mut self) -> Option<DecodeEvent>;
}

/// The current candidate identifier, as typed or scanned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSlot {
    value: String,
}

impl CandidateSlot {
    /// Overwrite the slot. Stored verbatim; validation happens on [`Self::candidate`].
    pub fn write(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    /// The raw slot contents.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The slot as a delivery id, if it holds anything besides whitespace.
    pub fn candidate(&self) -> Result<DeliveryId, EmptyInput> {
        DeliveryId::parse(&self.value)
    }
}

/// How a scan session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The first payload read.
    Decoded(String),

    /// The camera or decoder failed; the session is over.
    Failed(CameraError),
}

/// An open camera scan session.
///
/// Single-shot: the first decoded payload ends the session and the decoder
/// is dropped, so later frames are never read. Dropping the panel without
/// waiting cancels the session.
pub struct ScanPanel {
    close: Option<oneshot::Sender<()>>,
    task: JoinHandle<Option<ScanOutcome>>,
}

impl ScanPanel {
    /// Open the panel and start decoding in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open<D>(mut decoder: D) -> Self
    where
        D: FrameDecoder + 'static,
    {
        let (close, mut closed) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    // Fires on an explicit close and when the panel is dropped.
                    _ = &mut closed => return None,

                    event = decoder.next_event() => match event {
                        Some(DecodeEvent::Decoded(text)) if text.trim().is_empty() => {}
                        Some(DecodeEvent::Decoded(text)) => {
                            return Some(ScanOutcome::Decoded(text));
                        }
                        Some(DecodeEvent::Failed(e)) => return Some(ScanOutcome::Failed(e)),
                        None => return Some(ScanOutcome::Failed(CameraError::Ended)),
                    },
                }
            }
        });

        tracing::debug!("scan panel opened");

        Self {
            close: Some(close),
            task,
        }
    }

    /// Wait for the session to end on its own.
    ///
    /// Cancel-safe: if this future is dropped the session keeps running
    /// and a later call picks it up. Do not call again once it has returned.
    pub async fn wait(&mut self) -> ScanOutcome {
        match (&mut self.task).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => ScanOutcome::Failed(CameraError::Ended),
            Err(e) => ScanOutcome::Failed(CameraError::Stream(format!(
                "scanner task failed: {e}"
            ))),
        }
    }

    /// Close the panel. Any payload decoded concurrently is discarded.
    ///
    /// Returns once the decoder has been dropped.
    pub async fn close(mut self) {
        if let Some(close) = self.close.take() {
            // The task may already have finished; nothing to signal then.
            let _ = close.send(());
        }
        let _ = (&mut self.task).await;
        tracing::debug!("scan panel closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::sync::mpsc;

    /// Events pushed in by the test over a channel.
    struct ChannelDecoder {
        events: mpsc::Receiver<DecodeEvent>,
        consumed: Arc<AtomicUsize>,
    }

    impl ChannelDecoder {
        fn new(events: mpsc::Receiver<DecodeEvent>) -> Self {
            Self {
                events,
                consumed: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl FrameDecoder for ChannelDecoder {
        async fn next_event(&mut self) -> Option<DecodeEvent> {
            let event = self.events.recv().await;
            if event.is_some() {
                self.consumed.fetch_add(1, Ordering::SeqCst);
            }
            event
        }
    }

    #[test]
    fn candidate_slot_overwrites() {
        let mut slot = CandidateSlot::default();
        slot.write("DEL-001");
        slot.write("DEL-002");
        assert_eq!(slot.value(), "DEL-002");
        assert_eq!(slot.candidate().unwrap().as_str(), "DEL-002");
    }

    #[test]
    fn blank_candidate_is_empty_input() {
        let mut slot = CandidateSlot::default();
        assert_eq!(slot.candidate(), Err(EmptyInput));
        slot.write("   ");
        assert_eq!(slot.candidate(), Err(EmptyInput));
    }

    #[tokio::test]
    async fn first_decode_wins_and_closes_session() {
        let (tx, rx) = mpsc::channel(4);
        let mut panel = ScanPanel::open(ChannelDecoder::new(rx));

        tx.send(DecodeEvent::Decoded("DEL-999".into())).await.unwrap();
        assert_eq!(panel.wait().await, ScanOutcome::Decoded("DEL-999".into()));

        // The decoder is gone: nothing else can be fed in.
        assert!(tx.send(DecodeEvent::Decoded("DEL-000".into())).await.is_err());
    }

    #[tokio::test]
    async fn blank_frames_are_skipped() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(DecodeEvent::Decoded("  ".into())).await.unwrap();
        tx.send(DecodeEvent::Decoded("DEL-003".into())).await.unwrap();

        let mut panel = ScanPanel::open(ChannelDecoder::new(rx));
        assert_eq!(panel.wait().await, ScanOutcome::Decoded("DEL-003".into()));
    }

    #[tokio::test]
    async fn decoder_failure_ends_session() {
        let (tx, rx) = mpsc::channel(4);
        let mut panel = ScanPanel::open(ChannelDecoder::new(rx));

        let err = CameraError::Access("device busy".into());
        tx.send(DecodeEvent::Failed(err.clone())).await.unwrap();
        assert_eq!(panel.wait().await, ScanOutcome::Failed(err));
        assert!(tx.send(DecodeEvent::Decoded("DEL-001".into())).await.is_err());
    }

    #[tokio::test]
    async fn stream_end_is_a_failure() {
        let (tx, rx) = mpsc::channel::<DecodeEvent>(1);
        drop(tx);
        let mut panel = ScanPanel::open(ChannelDecoder::new(rx));
        assert_eq!(panel.wait().await, ScanOutcome::Failed(CameraError::Ended));
    }

    #[tokio::test]
    async fn close_drops_decoder() {
        let (tx, rx) = mpsc::channel(4);
        let panel = ScanPanel::open(ChannelDecoder::new(rx));

        panel.close().await;
        assert!(tx.send(DecodeEvent::Decoded("DEL-001".into())).await.is_err());
    }

    #[tokio::test]
    async fn close_discards_pending_decode() {
        let (tx, rx) = mpsc::channel(4);
        let decoder = ChannelDecoder::new(rx);
        let consumed = Arc::clone(&decoder.consumed);
        let panel = ScanPanel::open(decoder);

        // Queued before the panel task has run; the close signal wins.
        tx.send(DecodeEvent::Decoded("DEL-004".into())).await.unwrap();
        panel.close().await;

        assert_eq!(consumed.load(Ordering::SeqCst), 0);
        assert!(tx.send(DecodeEvent::Decoded("DEL-005".into())).await.is_err());
    }
}
