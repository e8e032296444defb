use futures::{future::{BoxFuture, FutureExt}, task::{waker_ref, ArcWake, Context, Poll}};
use futures_channel::oneshot;
use queues::{IsQueue, Queue};
use std::{future::Future, pin::Pin, sync::{Arc, Mutex, PoisonError}};

use crate::error::TbError;
use crate::RstbResult;

/// Tasks that were woken and wait to be polled.
#[derive(Clone)]
pub(crate) struct ReadyQueue(Arc<Mutex<Queue<Arc<Task>>>>);

impl Default for ReadyQueue {
    fn default() -> Self {
        ReadyQueue(Arc::new(Mutex::new(Queue::new())))
    }
}

impl ReadyQueue {
    fn schedule(&self, task: Arc<Task>) {
        let mut queue = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        // Queue::add never fails for an unbounded queue
        let _ = queue.add(task);
    }

    fn next_task(&self) -> Option<Arc<Task>> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove()
            .ok()
    }

    /// Polls woken tasks until none are left.
    #[inline]
    pub(crate) fn run_once(&self) {
        while let Some(task) = self.next_task() {
            process_task(task);
        }
    }

    pub(crate) fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Queue::new();
    }
}

#[inline]
fn process_task(task: Arc<Task>) {
    if *task.state.lock().unwrap_or_else(PoisonError::into_inner) == TaskState::Cancelled {
        // do not execute if state is cancelled, will be dropped once all references disappear
        return;
    }

    let mut fut_slot = task.future.lock().unwrap_or_else(PoisonError::into_inner);
    // a finished task can still be queued, its slot is empty then
    if let Some(mut fut) = fut_slot.take() {
        let waker = waker_ref(&task);
        let context = &mut Context::from_waker(&*waker);
        match fut.as_mut().poll(context) {
            Poll::Pending => *fut_slot = Some(fut),
            Poll::Ready(result) => {
                tracing::trace!(task = task.name(), ok = result.is_ok(), "finished");
                let tx = task.join_tx.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(tx) = tx {
                    // receiver may have been dropped, result is discarded then
                    let _ = tx.send(result);
                }
            }
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
enum TaskState {
    Pending,
    Cancelled,
}

pub struct Task {
    future: Mutex<Option<BoxFuture<'static, RstbResult>>>,
    state: Mutex<TaskState>,
    name: String,
    join_tx: Mutex<Option<oneshot::Sender<RstbResult>>>,
    ready: ReadyQueue,
}

impl Task {
    pub(crate) fn spawn_from_future(
        ready: &ReadyQueue,
        future: impl Future<Output = RstbResult> + Send + 'static,
        name: &str,
    ) -> JoinHandle {
        let (tx, rx) = oneshot::channel::<RstbResult>();
        let task = Arc::new(Task {
            future: Mutex::new(Some(future.boxed())),
            state: Mutex::new(TaskState::Pending),
            name: name.to_string(),
            join_tx: Mutex::new(Some(tx)),
            ready: ready.clone(),
        });
        tracing::trace!(task = %task.name, "spawned");
        ready.schedule(task.clone());
        JoinHandle {
            awaited_task: Some(task),
            join_rx: rx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&self) {
        // set state to Cancelled, executor drops the task instead of polling it
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = TaskState::Cancelled;
    }
}

impl ArcWake for Task {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.schedule(arc_self.clone());
    }
}

pub struct JoinHandle {
    awaited_task: Option<Arc<Task>>,
    join_rx: oneshot::Receiver<RstbResult>,
}

impl JoinHandle {
    pub fn cancel(mut self) {
        if let Some(task) = self.awaited_task.take() {
            task.cancel();
        }
    }

    /// Result of the task if it has finished. A cancelled or dropped task yields `Err(Cancelled)`.
    pub fn try_result(&mut self) -> Option<RstbResult> {
        match self.join_rx.try_recv() {
            Ok(Some(result)) => Some(result),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(TbError::Cancelled)),
        }
    }
}

impl Future for JoinHandle {
    type Output = RstbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.join_rx.poll_unpin(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(TbError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Val;

    #[test]
    fn tasks_run_in_spawn_order_and_join() {
        let ready = ReadyQueue::default();
        let inner = Task::spawn_from_future(&ready, async { Ok(Val::Int(7)) }, "inner");
        let mut outer = Task::spawn_from_future(
            &ready,
            async move {
                match inner.await? {
                    Val::Int(v) => Ok(Val::Int(v + 1)),
                    other => Ok(other),
                }
            },
            "outer",
        );
        assert!(outer.try_result().is_none());
        ready.run_once();
        assert_eq!(outer.try_result().unwrap().unwrap(), Val::Int(8));
    }

    #[test]
    fn cancelled_task_never_completes() {
        let ready = ReadyQueue::default();
        let handle = Task::spawn_from_future(&ready, async { Ok(Val::None) }, "doomed");
        let task = handle.awaited_task.clone().unwrap();
        handle.cancel();
        ready.run_once();
        assert!(task.future.lock().unwrap().is_some());
    }

    #[test]
    fn cleared_queue_drops_the_sender() {
        let ready = ReadyQueue::default();
        let mut handle = Task::spawn_from_future(&ready, async { Ok(Val::None) }, "dropped");
        ready.clear();
        // the queue held the only other reference; the task and its sender are gone
        handle.awaited_task = None;
        assert!(matches!(handle.try_result(), Some(Err(TbError::Cancelled))));
    }
}
