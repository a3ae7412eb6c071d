use crate::client::Kandinsky;
use crate::error::{KandinskyError, Result};
use crate::image::Image;
use crate::poll::{PollOptions, Poller};
use crate::transport::Transport;
use crate::types::{TaskHandle, TaskState};
use futures_util::Stream;
use std::pin::Pin;

pub type TaskStatusStream<'a> = Pin<Box<dyn Stream<Item = Result<Image>> + Send + 'a>>;

struct StreamState {
    poller: Poller,
    started: bool,
    finished: bool,
}

impl<T: Transport> Kandinsky<T> {
    /// Streams every status snapshot of a task.
    ///
    /// Pending snapshots are yielded as they arrive. The stream ends after the
    /// `DONE` snapshot or after the first error; a `FAIL` status is yielded as
    /// [`KandinskyError::TaskNotCompleted`].
    pub fn status_stream<'a>(
        &'a self,
        handle: &'a TaskHandle,
        options: &PollOptions,
    ) -> Result<TaskStatusStream<'a>> {
        if handle.uuid.trim().is_empty() {
            return Err(KandinskyError::EmptyTaskId);
        }

        let state = StreamState {
            poller: Poller::new(options),
            started: false,
            finished: false,
        };

        let s = futures_util::stream::unfold(state, move |mut state| async move {
            if state.finished {
                return None;
            }
            if state.started {
                if let Err(e) = state.poller.wait().await {
                    state.finished = true;
                    return Some((Err(e), state));
                }
            }
            state.started = true;

            let item = match state.poller.ready() {
                Ok(()) => self.task_status(&handle.uuid).await,
                Err(e) => Err(e),
            };
            let item = item.and_then(|image| match image.state() {
                TaskState::Failed => Err(KandinskyError::TaskNotCompleted {
                    uuid: image.uuid,
                }),
                _ => Ok(image),
            });
            state.finished = match &item {
                Ok(image) => image.state().is_terminal(),
                Err(_) => true,
            };
            Some((item, state))
        });

        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedTransport;
    use crate::types::KandinskyOptions;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use std::time::Duration;

    fn client(transport: Arc<ScriptedTransport>) -> Kandinsky<Arc<ScriptedTransport>> {
        Kandinsky::with_transport(
            KandinskyOptions {
                api_key: Some("key".into()),
                api_secret: Some("secret".into()),
                base_url: Some("http://kandinsky.test".into()),
                ..Default::default()
            },
            transport,
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_until_done() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"{"uuid":"task-1","status":"INITIAL"}"#)
                .respond(200, r#"{"uuid":"task-1","status":"PROCESSING"}"#)
                .respond(200, r#"{"uuid":"task-1","status":"DONE","images":["Y2F0"]}"#),
        );
        let client = client(transport.clone());
        let handle = TaskHandle::new("task-1");

        let statuses: Vec<String> = client
            .status_stream(&handle, &client.poll_options())
            .unwrap()
            .map(|res| res.unwrap().status)
            .collect()
            .await;

        assert_eq!(statuses, vec!["INITIAL", "PROCESSING", "DONE"]);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_fail_ends() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"{"uuid":"task-1","status":"PROCESSING"}"#)
                .respond(200, r#"{"uuid":"task-1","status":"FAIL"}"#),
        );
        let client = client(transport.clone());
        let handle = TaskHandle::new("task-1");
        let mut stream = client
            .status_stream(&handle, &PollOptions::new(Duration::from_secs(1)))
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap().status, "PROCESSING");
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(KandinskyError::TaskNotCompleted { .. })
        ));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_deadline() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(200, r#"{"uuid":"task-1","status":"PROCESSING"}"#),
        );
        let client = client(transport.clone());
        let handle = TaskHandle::new("task-1");
        let options = PollOptions::new(Duration::from_secs(10)).timeout(Duration::from_secs(5));
        let mut stream = client.status_stream(&handle, &options).unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        assert!(matches!(
            stream.next().await.unwrap(),
            Err(KandinskyError::DeadlineExceeded)
        ));
        assert!(stream.next().await.is_none());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_unbounded_timeout() {
        let transport = Arc::new(
            ScriptedTransport::new().respond(200, r#"{"uuid":"task-1","status":"DONE","images":["Y2F0"]}"#),
        );
        let client = client(transport.clone());
        let handle = TaskHandle::new("task-1");
        let options = client.poll_options().timeout(Duration::MAX);
        let mut stream = client.status_stream(&handle, &options).unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap().status, "DONE");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_empty_uuid() {
        let client = client(Arc::new(ScriptedTransport::new()));
        let handle = TaskHandle::new("");
        let res = client.status_stream(&handle, &client.poll_options());
        assert!(matches!(res, Err(KandinskyError::EmptyTaskId)));
    }
}
