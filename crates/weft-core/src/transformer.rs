//! Transformers and the completion contract
//!
//! Every style also receives the run's [`SharedNamespace`], the processor
//! namespace (or the per-call fork of it for `process`).
//!
//! A transformer finishes in one of three styles:
//!
//! - **sync**: returns `Ok(None)` (tree unchanged), `Ok(Some(tree))` (replace),
//!   or `Err` (throw)
//! - **async**: returns a future resolving to the same outcome
//! - **callback**: receives a [`Next`] handle and completes through it, now or later
//!
//! Every invocation is reduced to a [`Step`]: either ready with a result or
//! pending on a future. The runner only ever deals with steps.

use crate::error::{BoxError, ProcessorError};
use crate::file::VFile;
use crate::namespace::SharedNamespace;
use crate::node::Node;
use futures::channel::oneshot;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Tree and file after a transformer completed
pub type Transformed = (Node, VFile);

type SyncFn = dyn Fn(&mut Node, &mut VFile, &SharedNamespace) -> Result<Option<Node>, BoxError> + Send + Sync;
type FutureFn =
    dyn Fn(Node, VFile, SharedNamespace) -> BoxFuture<'static, Result<Transformed, BoxError>> + Send + Sync;
type CallbackFn = dyn Fn(Node, VFile, SharedNamespace, Next) -> Result<(), BoxError> + Send + Sync;

/// Promise-style transformer working on borrowed tree and file
///
/// Same replacement rule as sync transformers: `Ok(None)` keeps the (possibly
/// edited) tree, `Ok(Some(tree))` replaces it.
#[async_trait::async_trait]
pub trait AsyncTransform: Send + Sync + 'static {
    /// Transform the tree
    async fn transform(
        &self,
        tree: &mut Node,
        file: &mut VFile,
        namespace: &SharedNamespace,
    ) -> Result<Option<Node>, BoxError>;
}

#[derive(Clone)]
enum Style {
    Sync(Arc<SyncFn>),
    Async(Arc<dyn AsyncTransform>),
    Future(Arc<FutureFn>),
    Callback(Arc<CallbackFn>),
}

/// A per-run callable produced by an attacher
#[derive(Clone)]
pub struct Transformer {
    style: Style,
}

impl Transformer {
    /// Synchronous transformer
    pub fn sync<F>(transform: F) -> Self
    where
        F: Fn(&mut Node, &mut VFile, &SharedNamespace) -> Result<Option<Node>, BoxError> + Send + Sync + 'static,
    {
        Self {
            style: Style::Sync(Arc::new(transform)),
        }
    }

    /// Promise-style transformer from an [`AsyncTransform`] implementation
    pub fn from_async<T: AsyncTransform>(transform: T) -> Self {
        Self {
            style: Style::Async(Arc::new(transform)),
        }
    }

    /// Promise-style transformer owning tree and file; resolves with both
    pub fn future<F, Fut>(transform: F) -> Self
    where
        F: Fn(Node, VFile, SharedNamespace) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Transformed, BoxError>> + Send + 'static,
    {
        Self {
            style: Style::Future(Arc::new(move |tree, file, namespace| {
                transform(tree, file, namespace).boxed()
            })),
        }
    }

    /// Callback-style transformer
    ///
    /// The closure must complete through [`Next`] exactly once, either before
    /// returning or later. Returning `Err` counts as a completion.
    pub fn callback<F>(transform: F) -> Self
    where
        F: Fn(Node, VFile, SharedNamespace, Next) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            style: Style::Callback(Arc::new(transform)),
        }
    }

    /// Invoke the transformer, reducing its completion to a [`Step`]
    pub(crate) fn invoke(
        &self,
        index: usize,
        plugin: &str,
        tree: Node,
        file: VFile,
        namespace: &SharedNamespace,
    ) -> Step {
        let failed = |source: BoxError| ProcessorError::Transform {
            index,
            plugin: plugin.to_string(),
            source,
        };

        match &self.style {
            Style::Sync(transform) => {
                let (mut tree, mut file) = (tree, file);
                Step::Ready(match transform(&mut tree, &mut file, namespace) {
                    Ok(Some(replacement)) => Ok((replacement, file)),
                    Ok(None) => Ok((tree, file)),
                    Err(source) => Err(failed(source)),
                })
            }
            Style::Async(transform) => {
                let transform = Arc::clone(transform);
                let plugin = plugin.to_string();
                let namespace = namespace.clone();
                Step::Pending(
                    async move {
                        let (mut tree, mut file) = (tree, file);
                        match transform.transform(&mut tree, &mut file, &namespace).await {
                            Ok(Some(replacement)) => Ok((replacement, file)),
                            Ok(None) => Ok((tree, file)),
                            Err(source) => Err(ProcessorError::Transform { index, plugin, source }),
                        }
                    }
                    .boxed(),
                )
            }
            Style::Future(transform) => {
                let plugin = plugin.to_string();
                let pending = transform(tree, file, namespace.clone());
                Step::Pending(
                    async move {
                        pending
                            .await
                            .map_err(|source| ProcessorError::Transform { index, plugin, source })
                    }
                    .boxed(),
                )
            }
            Style::Callback(transform) => {
                let (next, mut receiver) = Next::channel(index, plugin);
                let returned = transform(tree, file, namespace.clone(), next.clone());
                let calls = next.calls();

                if calls > 1 {
                    return Step::Ready(Err(next.multiple()));
                }
                if let Err(source) = returned {
                    if calls > 0 {
                        return Step::Ready(Err(next.multiple()));
                    }
                    // A synchronous throw; late calls to `Next` must now be rejected.
                    next.close();
                    return Step::Ready(Err(failed(source)));
                }
                drop(next);

                match receiver.try_recv() {
                    Ok(Some(completion)) => Step::Ready(completion.map_err(failed)),
                    Ok(None) => {
                        let plugin = plugin.to_string();
                        Step::Pending(
                            async move {
                                match receiver.await {
                                    Ok(completion) => completion.map_err(|source| {
                                        ProcessorError::Transform { index, plugin, source }
                                    }),
                                    Err(oneshot::Canceled) => {
                                        Err(ProcessorError::Abandoned { index, plugin })
                                    }
                                }
                            }
                            .boxed(),
                        )
                    }
                    Err(oneshot::Canceled) => Step::Ready(Err(ProcessorError::Abandoned {
                        index,
                        plugin: plugin.to_string(),
                    })),
                }
            }
        }
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let style = match self.style {
            Style::Sync(_) => "sync",
            Style::Async(_) => "async",
            Style::Future(_) => "future",
            Style::Callback(_) => "callback",
        };
        f.debug_struct("Transformer").field("style", &style).finish()
    }
}

/// Outcome of invoking one transformer
pub(crate) enum Step {
    /// Completed before the invocation returned
    Ready(Result<Transformed, ProcessorError>),
    /// Suspended; resolves when the transformer completes
    Pending(BoxFuture<'static, Result<Transformed, ProcessorError>>),
}

struct NextState {
    sender: Option<oneshot::Sender<Result<Transformed, BoxError>>>,
    calls: usize,
}

/// Completion handle given to callback-style transformers
///
/// Clones share one completion: the first call wins, any further call is
/// rejected with [`ProcessorError::MultipleCompletion`].
#[derive(Clone)]
pub struct Next {
    index: usize,
    plugin: Arc<str>,
    state: Arc<Mutex<NextState>>,
}

impl Next {
    fn channel(
        index: usize,
        plugin: &str,
    ) -> (Self, oneshot::Receiver<Result<Transformed, BoxError>>) {
        let (sender, receiver) = oneshot::channel();
        let next = Self {
            index,
            plugin: Arc::from(plugin),
            state: Arc::new(Mutex::new(NextState {
                sender: Some(sender),
                calls: 0,
            })),
        };
        (next, receiver)
    }

    /// Complete successfully with the (possibly replaced) tree and file
    ///
    /// # Errors
    /// Returns [`ProcessorError::MultipleCompletion`] if already completed
    pub fn done(&self, tree: Node, file: VFile) -> Result<(), ProcessorError> {
        self.complete(Ok((tree, file)))
    }

    /// Complete with an error
    ///
    /// # Errors
    /// Returns [`ProcessorError::MultipleCompletion`] if already completed
    pub fn fail(&self, error: impl Into<BoxError>) -> Result<(), ProcessorError> {
        self.complete(Err(error.into()))
    }

    /// Complete with a result
    ///
    /// # Errors
    /// Returns [`ProcessorError::MultipleCompletion`] if already completed
    pub fn complete(&self, result: Result<Transformed, BoxError>) -> Result<(), ProcessorError> {
        let mut state = self.state.lock();
        state.calls += 1;
        match state.sender.take() {
            Some(sender) if state.calls == 1 => {
                // The run may have been dropped; nobody is waiting then.
                let _ = sender.send(result);
                Ok(())
            }
            _ => {
                tracing::warn!(
                    plugin = %self.plugin,
                    index = self.index,
                    "transformer completed more than once"
                );
                Err(self.multiple())
            }
        }
    }

    fn calls(&self) -> usize {
        self.state.lock().calls
    }

    fn close(&self) {
        let mut state = self.state.lock();
        state.calls += 1;
        state.sender = None;
    }

    fn multiple(&self) -> ProcessorError {
        ProcessorError::MultipleCompletion {
            index: self.index,
            plugin: self.plugin.to_string(),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("index", &self.index)
            .field("plugin", &self.plugin)
            .field("calls", &self.calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    fn scratch() -> SharedNamespace {
        SharedNamespace::default()
    }

    fn ready(step: Step) -> Result<Transformed, ProcessorError> {
        match step {
            Step::Ready(result) => result,
            Step::Pending(_) => panic!("expected a ready step"),
        }
    }

    fn pending(step: Step) -> BoxFuture<'static, Result<Transformed, ProcessorError>> {
        match step {
            Step::Ready(_) => panic!("expected a pending step"),
            Step::Pending(future) => future,
        }
    }

    #[test]
    fn sync_unchanged_keeps_in_place_edits() {
        let t = Transformer::sync(|tree, _, _| {
            tree.set("seen", json!(true));
            Ok(None)
        });
        let (tree, _) = ready(t.invoke(0, "edit", Node::root(), VFile::new(), &scratch())).unwrap();
        assert_eq!(tree.get("seen"), Some(&json!(true)));
    }

    #[test]
    fn sync_replacement() {
        let t = Transformer::sync(|_, _, _| Ok(Some(Node::new("other"))));
        let (tree, _) = ready(t.invoke(0, "swap", Node::root(), VFile::new(), &scratch())).unwrap();
        assert_eq!(tree.kind(), "other");
    }

    #[test]
    fn sync_throw_is_transform_failure() {
        let t = Transformer::sync(|_, _, _| Err("boom".into()));
        let err = ready(t.invoke(3, "boom", Node::root(), VFile::new(), &scratch())).unwrap_err();
        assert_eq!(err.failed_index(), Some(3));
        assert!(err.is_transform_failure());
    }

    #[test]
    fn every_style_sees_the_run_namespace() {
        let namespace = SharedNamespace::default();
        namespace.insert("mode", json!("strict"));

        let sync = Transformer::sync(|tree, _, namespace| {
            tree.set("mode", namespace.get("mode").unwrap_or_default());
            Ok(None)
        });
        let (tree, _) = ready(sync.invoke(0, "sync", Node::root(), VFile::new(), &namespace)).unwrap();
        assert_eq!(tree.get("mode"), Some(&json!("strict")));

        let future = Transformer::future(|tree, file, namespace| async move {
            namespace.insert("visited", json!(true));
            Ok::<_, BoxError>((tree, file))
        });
        block_on(pending(future.invoke(1, "fut", Node::root(), VFile::new(), &namespace))).unwrap();
        assert_eq!(namespace.get("visited"), Some(json!(true)));
    }

    #[test]
    fn callback_completing_synchronously_is_ready() {
        let t = Transformer::callback(|tree, file, _, next| {
            next.done(tree.with("flag", json!(true)), file)?;
            Ok(())
        });
        let (tree, _) = ready(t.invoke(0, "cb", Node::root(), VFile::new(), &scratch())).unwrap();
        assert_eq!(tree.get("flag"), Some(&json!(true)));
    }

    #[test]
    fn callback_deferred_is_pending() {
        let held = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&held);
        let t = Transformer::callback(move |tree, file, _, next| {
            *slot.lock() = Some((tree, file, next));
            Ok(())
        });

        let future = pending(t.invoke(0, "later", Node::root(), VFile::new(), &scratch()));
        let (tree, file, next) = held.lock().take().unwrap();
        next.done(tree.with("late", json!(true)), file).unwrap();

        let (tree, _) = block_on(future).unwrap();
        assert_eq!(tree.get("late"), Some(&json!(true)));
    }

    #[test]
    fn callback_double_completion() {
        let t = Transformer::callback(|tree, file, _, next| {
            next.done(tree.clone(), file.clone())?;
            let _ = next.done(tree, file);
            Ok(())
        });
        let err = ready(t.invoke(1, "twice", Node::root(), VFile::new(), &scratch())).unwrap_err();
        assert!(matches!(err, ProcessorError::MultipleCompletion { index: 1, .. }));
    }

    #[test]
    fn callback_error_after_completion() {
        let t = Transformer::callback(|tree, file, _, next| {
            next.done(tree, file)?;
            Err("and then it threw".into())
        });
        let err = ready(t.invoke(0, "mixed", Node::root(), VFile::new(), &scratch())).unwrap_err();
        assert!(matches!(err, ProcessorError::MultipleCompletion { .. }));
    }

    #[test]
    fn callback_dropping_next_is_abandoned() {
        let t = Transformer::callback(|_, _, _, next| {
            drop(next);
            Ok(())
        });
        let err = ready(t.invoke(0, "dropper", Node::root(), VFile::new(), &scratch())).unwrap_err();
        assert!(matches!(err, ProcessorError::Abandoned { .. }));
    }

    #[test]
    fn future_style_is_always_pending() {
        let t = Transformer::future(|tree, file, _| async move {
            Ok::<_, BoxError>((tree.with("f", json!(1)), file))
        });
        let (tree, _) = block_on(pending(t.invoke(0, "fut", Node::root(), VFile::new(), &scratch()))).unwrap();
        assert_eq!(tree.get("f"), Some(&json!(1)));
    }
}
