//! Dedicated reduction thread.
//!
//! # Usage
//!
//! ```ignore
//! let worker = ReductionWorker::spawn(frames, config, ctx)?;
//!
//! // Control thread: drain events, poll for the result
//! loop {
//!   for event in worker.events().try_iter() {
//!     show(event);
//!   }
//!   if let Some(result) = worker.poll() {
//!     break result;
//!   }
//! }
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{self as channel, Receiver, TryRecvError};

use super::{reduce, FrameSource, ReductionOutput};
use crate::cancel::CancellationToken;
use crate::config::ReductionConfig;
use crate::context::ComputeContext;
use crate::error::{Result, SvoError};
use crate::progress::{EventSink, ReductionEvent};

/// One reduction running on its own named thread.
///
/// All compute dispatch for the run happens on that thread.
pub struct ReductionWorker {
  handle: Option<JoinHandle<()>>,
  /// Pending result; `None` once taken.
  result: Option<Receiver<Result<ReductionOutput>>>,
  events: Receiver<ReductionEvent>,
  cancel: CancellationToken,
}

impl ReductionWorker {
  /// Start reducing `frames`; returns immediately.
  pub fn spawn<S>(frames: S, config: ReductionConfig, ctx: Arc<ComputeContext>) -> Result<Self>
  where
    S: FrameSource + Send + 'static,
  {
    let (event_tx, events) = channel::unbounded();
    let (result_tx, result) = channel::bounded(1);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let handle = thread::Builder::new()
      .name("svo-reduce".into())
      .spawn(move || {
        let sink = EventSink::new(event_tx);
        let outcome = reduce(&frames, &config, ctx, &token, &sink);
        if let Err(e) = &outcome {
          sink.warn(format!("reduction failed: {e}"));
        }
        // Receiver dropped = nobody wants the result.
        let _ = result_tx.send(outcome);
      })
      .map_err(|e| SvoError::Compute(format!("cannot start worker thread: {e}")))?;

    Ok(Self {
      handle: Some(handle),
      result: Some(result),
      events,
      cancel,
    })
  }

  /// Progress and log events, in emission order.
  pub fn events(&self) -> &Receiver<ReductionEvent> {
    &self.events
  }

  /// Whether the result has not been taken yet.
  pub fn is_busy(&self) -> bool {
    self.result.is_some()
  }

  /// Request cooperative cancellation; the result becomes `Err(Cancelled)`.
  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  /// Non-blocking: `Some(result)` once, when the run has finished.
  pub fn poll(&mut self) -> Option<Result<ReductionOutput>> {
    let receiver = self.result.as_ref()?;
    match receiver.try_recv() {
      Ok(outcome) => {
        self.finish();
        Some(outcome)
      }
      Err(TryRecvError::Empty) => None,
      Err(TryRecvError::Disconnected) => {
        self.finish();
        Some(Err(SvoError::Compute("worker exited without a result".into())))
      }
    }
  }

  /// Block until the run has finished.
  pub fn wait(mut self) -> Result<ReductionOutput> {
    let outcome = match self.result.as_ref() {
      Some(receiver) => receiver
        .recv()
        .unwrap_or_else(|_| Err(SvoError::Compute("worker exited without a result".into()))),
      None => Err(SvoError::Compute("result already taken".into())),
    };
    self.finish();
    outcome
  }

  fn finish(&mut self) {
    self.result = None;
    if let Some(handle) = self.handle.take() {
      if handle.join().is_err() {
        tracing::warn!("reduction worker panicked");
      }
    }
  }
}

impl Drop for ReductionWorker {
  fn drop(&mut self) {
    if self.is_busy() {
      self.cancel();
    }
    self.finish();
  }
}
