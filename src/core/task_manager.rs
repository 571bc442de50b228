//! Named task spawning. Every task logs its start and end at debug level, so
//! a `RUST_LOG=debug` run shows which poll or decode loop is still alive.

use std::future::Future;
use tokio::task::JoinHandle;

/// Spawn a detached background task
pub fn spawn_task<F>(name: &'static str, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    spawn_result_task(name, future)
}

/// Spawn a task whose value is collected through the handle
pub fn spawn_result_task<F, T>(name: &'static str, future: F) -> JoinHandle<T>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn(async move {
        log::debug!("task {name} started");
        let value = future.await;
        log::debug!("task {name} finished");
        value
    })
}

/// Run blocking work (image preprocessing, decoder subprocesses) off the runtime threads
pub fn spawn_blocking_task<F, R>(name: &'static str, func: F) -> JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        log::debug!("blocking task {name} started");
        let value = func();
        log::debug!("blocking task {name} finished");
        value
    })
}
