//! Upstream source backpressure contract
//!
//! The engine never pulls: the source adapter pushes chunks in through
//! `StreamPacer::push_chunk` and signals end-of-stream through
//! `StreamPacer::end_of_stream`. This trait is the reverse direction — the
//! engine throttling the push.

/// Control handle over a push-based byte source
///
/// Implemented by the host's source adapter. `pause`/`resume` are the
/// overflow controller's backpressure levers; `release` is called exactly
/// once, on detach (next `set_source`) or on `stop`.
pub trait SourceControl: Send + Sync {
    /// Ask the source to stop pushing data for now
    fn pause(&self);

    /// Ask a paused source to push data again
    fn resume(&self);

    /// Whether the source currently reports itself paused
    ///
    /// Lets the controller resume a source that was paused externally, not
    /// only one it paused itself. Sources without that introspection keep
    /// the default.
    fn is_paused(&self) -> bool {
        false
    }

    /// Detach: the engine will make no further calls on this handle
    fn release(&self);
}

impl<T: SourceControl + ?Sized> SourceControl for std::sync::Arc<T> {
    fn pause(&self) {
        (**self).pause()
    }

    fn resume(&self) {
        (**self).resume()
    }

    fn is_paused(&self) -> bool {
        (**self).is_paused()
    }

    fn release(&self) {
        (**self).release()
    }
}
