//! Listener contract and helpers.
//!
//! Listeners receive an agent's progress and completion. Values arrive as
//! `Arc`s because one result is shared between every coalesced listener and
//! the cache. A `None` completion means no value is available: the request
//! timed out, the agent finished empty, or a reattach found nothing.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

use crate::cache::CachedValue;

/// Receives progress and completion for one request.
pub trait AgentListener<R, P>: Send + Sync + 'static {
    fn on_completion(&self, identifier: &str, result: Option<Arc<R>>);

    fn on_progress(&self, _identifier: &str, _progress: Arc<P>) {}
}

impl<R, P, L> AgentListener<R, P> for Arc<L>
where
    L: AgentListener<R, P> + ?Sized,
{
    fn on_completion(&self, identifier: &str, result: Option<Arc<R>>) {
        (**self).on_completion(identifier, result);
    }

    fn on_progress(&self, identifier: &str, progress: Arc<P>) {
        (**self).on_progress(identifier, progress);
    }
}

/// Listener built from a completion closure. Progress is ignored.
pub struct FnListener<R, P, F> {
    on_completion: F,
    _types: PhantomData<fn(R, P)>,
}

/// Wraps a completion closure as a listener.
///
/// ```
/// use agentexec::listener::{from_fn, AgentListener};
///
/// let listener = from_fn::<String, (), _>(|identifier, result| {
///     println!("{identifier}: {result:?}");
/// });
/// listener.on_completion("greeting", None);
/// ```
pub fn from_fn<R, P, F>(on_completion: F) -> FnListener<R, P, F>
where
    F: Fn(&str, Option<Arc<R>>) + Send + Sync + 'static,
{
    FnListener {
        on_completion,
        _types: PhantomData,
    }
}

impl<R, P, F> AgentListener<R, P> for FnListener<R, P, F>
where
    R: 'static,
    P: 'static,
    F: Fn(&str, Option<Arc<R>>) + Send + Sync + 'static,
{
    fn on_completion(&self, identifier: &str, result: Option<Arc<R>>) {
        (self.on_completion)(identifier, result);
    }
}

/// Listener that ignores everything, for work started only for its side
/// effects or to warm the cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireAndForget;

impl<R: 'static, P: 'static> AgentListener<R, P> for FireAndForget {
    fn on_completion(&self, _identifier: &str, _result: Option<Arc<R>>) {}
}

// =============================================================================
// Type erasure
// =============================================================================

/// Listener view used by the request controller after type erasure.
pub(crate) trait ErasedListener: Send + Sync {
    fn deliver_completion(&self, identifier: &str, value: Option<CachedValue>);
    fn deliver_progress(&self, identifier: &str, value: CachedValue);
}

/// Restores the listener's value types on delivery.
pub(crate) struct TypedListener<R, P, L> {
    listener: L,
    _types: PhantomData<fn(R, P)>,
}

impl<R, P, L> TypedListener<R, P, L> {
    pub(crate) fn new(listener: L) -> Self {
        Self {
            listener,
            _types: PhantomData,
        }
    }
}

impl<R, P, L> ErasedListener for TypedListener<R, P, L>
where
    R: Any + Send + Sync,
    P: Any + Send + Sync,
    L: AgentListener<R, P>,
{
    fn deliver_completion(&self, identifier: &str, value: Option<CachedValue>) {
        let typed = match value.map(|v| v.downcast::<R>()) {
            None => None,
            Some(Ok(result)) => Some(result),
            Some(Err(_)) => {
                warn!(
                    identifier,
                    expected = std::any::type_name::<R>(),
                    "Completion value has an unexpected type, delivering empty completion"
                );
                None
            }
        };
        self.listener.on_completion(identifier, typed);
    }

    fn deliver_progress(&self, identifier: &str, value: CachedValue) {
        match value.downcast::<P>() {
            Ok(progress) => self.listener.on_progress(identifier, progress),
            Err(_) => warn!(
                identifier,
                expected = std::any::type_name::<P>(),
                "Progress value has an unexpected type, dropping it"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        completions: Mutex<Vec<Option<u32>>>,
        progress: Mutex<Vec<String>>,
    }

    impl AgentListener<u32, String> for Recorder {
        fn on_completion(&self, _identifier: &str, result: Option<Arc<u32>>) {
            self.completions.lock().push(result.map(|r| *r));
        }

        fn on_progress(&self, _identifier: &str, progress: Arc<String>) {
            self.progress.lock().push((*progress).clone());
        }
    }

    #[test]
    fn test_typed_delivery() {
        let recorder = Arc::new(Recorder::default());
        let erased = TypedListener::<u32, String, _>::new(recorder.clone());

        erased.deliver_progress("id", Arc::new("half".to_string()));
        erased.deliver_completion("id", Some(Arc::new(5u32)));
        erased.deliver_completion("id", None);

        assert_eq!(*recorder.progress.lock(), vec!["half".to_string()]);
        assert_eq!(*recorder.completions.lock(), vec![Some(5), None]);
    }

    #[test]
    fn test_mismatched_completion_delivers_none() {
        let recorder = Arc::new(Recorder::default());
        let erased = TypedListener::<u32, String, _>::new(recorder.clone());

        erased.deliver_completion("id", Some(Arc::new("wrong".to_string())));
        erased.deliver_progress("id", Arc::new(1u8));

        assert_eq!(*recorder.completions.lock(), vec![None]);
        assert!(recorder.progress.lock().is_empty());
    }

    #[test]
    fn test_fn_listener() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let listener = from_fn::<u32, (), _>(move |identifier, result| {
            *sink.lock() = Some((identifier.to_string(), result.map(|r| *r)));
        });

        listener.on_completion("answer", Some(Arc::new(42)));
        assert_eq!(*seen.lock(), Some(("answer".to_string(), Some(42))));
    }

    #[test]
    fn test_fire_and_forget_accepts_anything() {
        let listener = FireAndForget;
        AgentListener::<String, u8>::on_completion(&listener, "x", None);
        AgentListener::<String, u8>::on_progress(&listener, "x", Arc::new(1));
    }
}
