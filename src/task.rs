//! A handle to work running on the tokio runtime that reports progress and
//! finishes with exactly one [`TaskResult`].
//!
//! Listeners either register callbacks with [`Task::listen`] or drain a
//! [`Subscription`] on whatever context they like (`next().await`, or
//! `try_next()` from a UI loop). Terminal results are sticky and replayed to
//! late subscribers.

use std::{future::Future, sync::Arc};

use futures::Stream;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use crate::types::api::{Progress, ServerError};

pub type TaskResult<T> = Result<T, ServerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Resolved,
    Rejected,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Resolved | TaskStatus::Rejected | TaskStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent<T, P> {
    Progress(P),
    Finished(TaskResult<T>),
}

struct State<T, P> {
    status: TaskStatus,
    outcome: Option<TaskResult<T>>,
    sinks: Vec<UnboundedSender<TaskEvent<T, P>>>,
    followers: usize,
}

struct Inner<T, P> {
    state: Mutex<State<T, P>>,
    token: CancellationToken,
    /// Runtime the task was created on, used for listener callbacks.
    runtime: Option<Handle>,
}

/// Moves the task to its terminal state. `commit` runs under the state lock
/// and only when the task resolves successfully.
fn settle<T: Clone, P, F: FnOnce(&T)>(
    state: &mut State<T, P>,
    result: TaskResult<T>,
    commit: F,
) -> bool {
    if state.status.is_terminal() {
        return false;
    }
    state.status = match &result {
        Ok(value) => {
            commit(value);
            TaskStatus::Resolved
        }
        Err(ServerError::Cancelled) => TaskStatus::Cancelled,
        Err(_) => TaskStatus::Rejected,
    };
    for sink in state.sinks.drain(..) {
        let _ = sink.send(TaskEvent::Finished(result.clone()));
    }
    state.outcome = Some(result);
    true
}

impl<T: Clone, P: Clone> Inner<T, P> {
    fn start(&self) {
        let mut state = self.state.lock();
        if state.status == TaskStatus::Pending {
            state.status = TaskStatus::Running;
        }
    }

    fn emit(&self, progress: P) {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return;
        }
        state
            .sinks
            .retain(|sink| sink.send(TaskEvent::Progress(progress.clone())).is_ok());
    }

    fn finish<F: FnOnce(&T)>(&self, result: TaskResult<T>, commit: F) -> bool {
        settle(&mut self.state.lock(), result, commit)
    }

    fn cancel(&self) {
        if self.finish(Err(ServerError::Cancelled), |_| {}) {
            log::debug!("Task cancelled");
        }
        self.token.cancel();
    }

    fn status(&self) -> TaskStatus {
        self.state.lock().status
    }
}

pub struct Task<T, P = Progress> {
    inner: Arc<Inner<T, P>>,
}

impl<T, P> Clone for Task<T, P> {
    fn clone(&self) -> Self {
        Task {
            inner: self.inner.clone(),
        }
    }
}

impl<T, P> std::fmt::Debug for Task<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("status", &self.inner.state.lock().status)
            .finish()
    }
}

impl<T, P> Task<T, P>
where
    T: Clone + Send + 'static,
    P: Clone + Send + 'static,
{
    fn pair() -> (Task<T, P>, TaskHandle<T, P>) {
        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                status: TaskStatus::Pending,
                outcome: None,
                sinks: vec![],
                followers: 0,
            }),
            token: CancellationToken::new(),
            runtime: Handle::try_current().ok(),
        });
        (
            Task {
                inner: inner.clone(),
            },
            TaskHandle { inner },
        )
    }

    /// A task that is already finished, e.g. for a cache hit.
    pub fn resolved(result: TaskResult<T>) -> Task<T, P> {
        let (task, handle) = Task::pair();
        handle.finish(result);
        task
    }

    /// Spawns `work` on the current tokio runtime. The work finishes the task
    /// through its handle; it is dropped at its next await point once the
    /// task is cancelled.
    pub fn run<F, Fut>(work: F) -> Task<T, P>
    where
        F: FnOnce(TaskHandle<T, P>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (task, handle) = Task::pair();
        let inner = task.inner.clone();
        let work = work(handle);
        tokio::spawn(async move {
            inner.start();
            tokio::select! {
                biased;
                _ = inner.token.cancelled() => {}
                _ = work => {}
            }
            if inner.finish(
                Err(ServerError::Transport("Task ended without a result".into())),
                |_| {},
            ) {
                log::error!("Task worker exited without finishing its task");
            }
        });
        task
    }

    /// Calls `on_progress` for every progress update from now on, then
    /// `on_result` once. May be called from any thread. Callbacks run on the
    /// runtime the task was created on; a task created outside any runtime
    /// delivers a finished result inline and otherwise uses its own thread.
    pub fn listen<FP, FR>(&self, mut on_progress: FP, on_result: FR)
    where
        FP: FnMut(P) + Send + 'static,
        FR: FnOnce(TaskResult<T>) + Send + 'static,
    {
        let mut events = self.subscribe();
        let drain = async move {
            while let Some(event) = events.next().await {
                match event {
                    TaskEvent::Progress(p) => on_progress(p),
                    TaskEvent::Finished(r) => {
                        on_result(r);
                        return;
                    }
                }
            }
        };
        match &self.inner.runtime {
            Some(runtime) => {
                runtime.spawn(drain);
            }
            None if self.is_finished() => futures::executor::block_on(drain),
            None => {
                std::thread::spawn(move || futures::executor::block_on(drain));
            }
        }
    }

    pub fn subscribe(&self) -> Subscription<T, P> {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.inner.state.lock();
            match &state.outcome {
                Some(result) => {
                    let _ = tx.send(TaskEvent::Finished(result.clone()));
                }
                None => state.sinks.push(tx),
            }
        }
        Subscription {
            rx,
            inner: self.inner.clone(),
            done: false,
        }
    }

    pub async fn wait(&self) -> TaskResult<T> {
        let mut events = self.subscribe();
        while let Some(event) = events.next().await {
            if let TaskEvent::Finished(result) = event {
                return result;
            }
        }
        self.inner
            .state
            .lock()
            .outcome
            .clone()
            .unwrap_or(Err(ServerError::Cancelled))
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn status(&self) -> TaskStatus {
        self.inner.status()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status() == TaskStatus::Cancelled
    }

    /// A new task that mirrors this running one. Cancelling the mirror only
    /// detaches it; this task is cancelled once every mirror has detached.
    /// Returns `None` if this task already finished.
    pub(crate) fn mirror(&self) -> Option<Task<T, P>> {
        {
            let mut state = self.inner.state.lock();
            if state.status.is_terminal() {
                return None;
            }
            state.followers += 1;
        }
        let source = self.clone();
        // moved into the future so it drops even if the future never runs
        let detach = Detach(source.clone());
        Some(Task::run(move |handle| async move {
            let _detach = detach;
            let mut events = source.subscribe();
            while let Some(event) = events.next().await {
                match event {
                    TaskEvent::Progress(p) => handle.progress(p),
                    TaskEvent::Finished(result) => {
                        handle.finish(result);
                        return;
                    }
                }
            }
        }))
    }

    fn release(&self) {
        let mut state = self.inner.state.lock();
        state.followers = state.followers.saturating_sub(1);
        if state.followers == 0 && settle(&mut state, Err(ServerError::Cancelled), |_| {}) {
            drop(state);
            log::debug!("Every listener left, cancelling shared request");
            self.inner.token.cancel();
        }
    }
}

struct Detach<T: Clone + Send + 'static, P: Clone + Send + 'static>(Task<T, P>);

impl<T: Clone + Send + 'static, P: Clone + Send + 'static> Drop for Detach<T, P> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// The worker's side of a [`Task`].
pub struct TaskHandle<T, P = Progress> {
    inner: Arc<Inner<T, P>>,
}

impl<T: Clone, P: Clone> TaskHandle<T, P> {
    pub fn progress(&self, progress: P) {
        self.inner.emit(progress);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.inner.token.cancelled()
    }

    pub fn finish(self, result: TaskResult<T>) {
        self.inner.finish(result, |_| {});
    }

    /// Finishes the task, running `commit` atomically with a successful
    /// resolution. Returns false (and skips `commit`) if the task had already
    /// finished or was cancelled.
    pub fn finish_with<F: FnOnce(&T)>(self, result: TaskResult<T>, commit: F) -> bool {
        self.inner.finish(result, commit)
    }
}

/// Events of one task, in order. Yields at most one `Finished`, after which
/// it is exhausted. Progress still queued when the task gets cancelled is
/// dropped.
pub struct Subscription<T, P> {
    rx: UnboundedReceiver<TaskEvent<T, P>>,
    inner: Arc<Inner<T, P>>,
    done: bool,
}

impl<T: Clone, P: Clone> Subscription<T, P> {
    fn accept(&mut self, event: TaskEvent<T, P>) -> Option<TaskEvent<T, P>> {
        match event {
            TaskEvent::Progress(_) if self.inner.status() == TaskStatus::Cancelled => None,
            TaskEvent::Finished(_) => {
                self.done = true;
                Some(event)
            }
            _ => Some(event),
        }
    }

    pub async fn next(&mut self) -> Option<TaskEvent<T, P>> {
        while !self.done {
            let event = self.rx.recv().await?;
            if let Some(event) = self.accept(event) {
                return Some(event);
            }
        }
        None
    }

    /// Non-blocking variant of [`Subscription::next`].
    pub fn try_next(&mut self) -> Option<TaskEvent<T, P>> {
        while !self.done {
            let event = self.rx.try_recv().ok()?;
            if let Some(event) = self.accept(event) {
                return Some(event);
            }
        }
        None
    }

    pub fn into_stream(self) -> impl Stream<Item = TaskEvent<T, P>> {
        futures::stream::unfold(self, |mut events| async move {
            events.next().await.map(|e| (e, events))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::sync::oneshot;

    type TestTask = Task<u32, u8>;

    async fn settle_spawned() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn resolved_task_replays_to_late_listeners() {
        let task = TestTask::resolved(Ok(3));
        assert_eq!(task.status(), TaskStatus::Resolved);
        assert_eq!(task.wait().await, Ok(3));
        assert_eq!(task.wait().await, Ok(3));

        let mut events = task.subscribe();
        assert_eq!(events.try_next(), Some(TaskEvent::Finished(Ok(3))));
        assert_eq!(events.try_next(), None);
    }

    #[tokio::test]
    async fn progress_arrives_in_order_before_result() {
        let (gate_tx, gate_rx) = oneshot::channel::<()>();
        let task = TestTask::run(|handle| async move {
            let _ = gate_rx.await;
            for p in [10, 50, 100] {
                handle.progress(p);
            }
            handle.finish(Ok(7));
        });
        let events = task.subscribe();
        gate_tx.send(()).unwrap();

        let events: Vec<_> = events.into_stream().collect().await;
        assert_eq!(
            events,
            vec![
                TaskEvent::Progress(10),
                TaskEvent::Progress(50),
                TaskEvent::Progress(100),
                TaskEvent::Finished(Ok(7)),
            ]
        );
        assert_eq!(task.status(), TaskStatus::Resolved);
    }

    #[tokio::test]
    async fn listeners_get_progress_and_one_result() {
        let (task, handle) = TestTask::pair();
        let (done_tx, done_rx) = oneshot::channel();
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = seen.clone();
        task.listen(
            move |p| sink.lock().push(p),
            move |r| {
                let _ = done_tx.send(r);
            },
        );
        handle.progress(1);
        handle.progress(2);
        handle.finish(Err(ServerError::Transport("connection reset".into())));

        let result = done_rx.await.unwrap();
        assert_eq!(result, Err(ServerError::Transport("connection reset".into())));
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(task.status(), TaskStatus::Rejected);
    }

    #[test]
    fn listen_without_a_runtime() {
        let (tx, rx) = std::sync::mpsc::channel();
        let sender = tx.clone();
        TestTask::resolved(Ok(3)).listen(|_| {}, move |r| sender.send(r).unwrap());
        // delivered inline
        assert_eq!(rx.try_recv(), Ok(Ok(3)));

        let (task, handle) = TestTask::pair();
        let seen = Arc::new(Mutex::new(vec![]));
        let sink = seen.clone();
        task.listen(move |p| sink.lock().push(p), move |r| tx.send(r).unwrap());
        handle.progress(5);
        handle.finish(Ok(8));
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(Ok(8)));
        assert_eq!(*seen.lock(), vec![5]);
    }

    #[tokio::test]
    async fn cancel_delivers_one_cancellation_to_everyone() {
        let task = TestTask::run(|handle| async move {
            handle.progress(1);
            futures::future::pending::<()>().await;
        });
        let mut first = task.subscribe();
        let mut second = task.subscribe();
        settle_spawned().await;

        task.cancel();
        task.cancel();

        for events in [&mut first, &mut second] {
            let mut finished = vec![];
            while let Some(event) = events.next().await {
                if let TaskEvent::Finished(r) = event {
                    finished.push(r);
                }
            }
            assert_eq!(finished, vec![Err(ServerError::Cancelled)]);
        }
        assert!(task.is_cancelled());
        assert_eq!(task.wait().await, Err(ServerError::Cancelled));
    }

    #[tokio::test]
    async fn nothing_is_delivered_after_cancel() {
        let (task, handle) = TestTask::pair();
        let mut events = task.subscribe();
        handle.progress(1);
        task.cancel();
        handle.progress(2);

        assert_eq!(events.try_next(), Some(TaskEvent::Finished(Err(ServerError::Cancelled))));
        assert_eq!(events.try_next(), None);

        let committed = AtomicBool::new(false);
        assert!(!handle.finish_with(Ok(1), |_| committed.store(true, Ordering::SeqCst)));
        assert!(!committed.load(Ordering::SeqCst));
        assert_eq!(task.status(), TaskStatus::Cancelled);
    }

    #[tokio::test]
    async fn commit_runs_on_success_only() {
        let committed = AtomicBool::new(false);
        let (_task, handle) = TestTask::pair();
        assert!(handle.finish_with(Err(ServerError::parse("id", "missing field")), |_| {
            committed.store(true, Ordering::SeqCst)
        }));
        assert!(!committed.load(Ordering::SeqCst));

        let (task, handle) = TestTask::pair();
        assert!(handle.finish_with(Ok(4), |v| committed.store(*v == 4, Ordering::SeqCst)));
        assert!(committed.load(Ordering::SeqCst));
        assert_eq!(task.wait().await, Ok(4));
    }

    #[tokio::test]
    async fn worker_without_result_rejects() {
        let task = TestTask::run(|_handle| async move {});
        assert!(matches!(task.wait().await, Err(ServerError::Transport(_))));
        assert_eq!(task.status(), TaskStatus::Rejected);
    }

    #[tokio::test]
    async fn mirrors_share_progress_and_result() {
        let (source, handle) = TestTask::pair();
        let a = source.mirror().unwrap();
        let b = source.mirror().unwrap();
        let mut a_events = a.subscribe();
        settle_spawned().await;

        handle.progress(40);
        handle.finish(Ok(9));

        assert_eq!(a_events.next().await, Some(TaskEvent::Progress(40)));
        assert_eq!(a_events.next().await, Some(TaskEvent::Finished(Ok(9))));
        assert_eq!(b.wait().await, Ok(9));
        assert!(source.mirror().is_none());
    }

    #[tokio::test]
    async fn source_is_cancelled_when_last_mirror_leaves() {
        let (source, _handle) = TestTask::pair();
        let a = source.mirror().unwrap();
        let b = source.mirror().unwrap();
        settle_spawned().await;

        a.cancel();
        settle_spawned().await;
        assert_eq!(a.wait().await, Err(ServerError::Cancelled));
        assert!(!source.is_finished());

        b.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), source.wait())
            .await
            .unwrap();
        assert_eq!(result, Err(ServerError::Cancelled));
    }
}
