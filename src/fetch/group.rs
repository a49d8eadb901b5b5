use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

/// Holds the first error reported by any member of a task group.
#[derive(Debug, Default)]
pub struct FirstError {
    slot: Mutex<Option<AppError>>,
}

impl FirstError {
    /// Store `err` if nothing was recorded yet. Returns whether it was kept.
    pub fn record(&self, err: AppError) -> bool {
        let Ok(mut slot) = self.slot.lock() else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }

    pub fn take(&self) -> Option<AppError> {
        self.slot.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Tasks sharing one cancellation token where the first failure cancels the rest.
pub struct TaskGroup {
    token: CancellationToken,
    first_error: Arc<FirstError>,
    tasks: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            first_error: Arc::new(FirstError::default()),
            tasks: Vec::new(),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.token.clone();
        let first_error = Arc::clone(&self.first_error);
        self.tasks.push(tokio::spawn(async move {
            let result = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(AppError::Panicked(panic_message(payload.as_ref()))),
            };
            if let Err(err) = result {
                // Record before cancelling so the root cause beats the cancellations it triggers.
                first_error.record(err);
                token.cancel();
            }
        }));
    }

    /// Wait for every task, then report the first recorded error, if any.
    pub async fn wait(self) -> Result<()> {
        for task in self.tasks {
            if let Err(join_err) = task.await {
                self.first_error.record(AppError::from(join_err));
                self.token.cancel();
            }
        }

        match self.first_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn keeps_only_the_first_error() {
        let first = FirstError::default();

        assert!(first.record(AppError::message("boom")));
        assert!(!first.record(AppError::Cancelled));
        assert_eq!(first.take().unwrap().to_string(), "boom");
        assert!(first.take().is_none());
    }

    #[tokio::test]
    async fn successful_group_reports_ok() {
        let mut group = TaskGroup::new(CancellationToken::new());
        for _ in 0..4 {
            group.spawn(async { Ok(()) });
        }

        group.wait().await.expect("all tasks succeed");
    }

    #[tokio::test]
    async fn failure_cancels_siblings_and_wins() {
        let mut group = TaskGroup::new(CancellationToken::new());
        let token = group.token().clone();

        let sibling_token = token.clone();
        group.spawn(async move {
            tokio::select! {
                _ = sibling_token.cancelled() => Err(AppError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(()),
            }
        });
        group.spawn(async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Err(AppError::message("upstream failed"))
        });

        let err = tokio::time::timeout(Duration::from_secs(5), group.wait())
            .await
            .expect("group finishes promptly")
            .expect_err("group fails");

        assert_eq!(err.to_string(), "upstream failed");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn panicking_task_is_reported() {
        let mut group = TaskGroup::new(CancellationToken::new());
        let explode = true;
        group.spawn(async move {
            if explode {
                panic!("worker panicked");
            }
            Ok(())
        });

        let err = group.wait().await.expect_err("panic surfaces");
        assert_eq!(err.to_string(), "task panicked: worker panicked");
    }

    #[tokio::test]
    async fn panic_cancels_siblings_before_they_finish() {
        let mut group = TaskGroup::new(CancellationToken::new());
        let token = group.token().clone();

        let sibling_token = token.clone();
        group.spawn(async move {
            tokio::select! {
                _ = sibling_token.cancelled() => Err(AppError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(()),
            }
        });
        let explode = true;
        group.spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if explode {
                panic!("bad page {}", 7);
            }
            Ok(())
        });

        let err = tokio::time::timeout(Duration::from_secs(5), group.wait())
            .await
            .expect("panic cancels the waiting sibling")
            .expect_err("group fails");

        assert!(matches!(err, AppError::Panicked(ref message) if message == "bad page 7"));
        assert!(token.is_cancelled());
    }
}
