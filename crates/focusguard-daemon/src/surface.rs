use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("surface capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("surface operation failed: {0}")]
    Failed(String),

    #[error("surface dispatcher stopped")]
    DispatcherClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceHandle(pub u64);

/// What the full-screen blocking surface displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockingContent {
    pub package_id: String,
    pub app_name: String,
    pub usage_minutes: u32,
    pub limit_minutes: u32,
}

/// What the modal challenge surface displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChallengeContent {
    pub package_id: String,
    pub question: String,
    pub time_limit_secs: u32,
    pub extra_time_reward_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceRequest {
    FullScreen(BlockingContent),
    Modal(ChallengeContent),
}

#[async_trait]
pub trait SurfaceProvider: Send + Sync {
    async fn attach(&mut self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError>;

    /// Detaching a handle that is not attached is a no-op.
    async fn detach(&mut self, handle: SurfaceHandle) -> Result<(), SurfaceError>;
}

enum SurfaceCommand {
    Attach { request: SurfaceRequest, reply: oneshot::Sender<Result<SurfaceHandle, SurfaceError>> },
    Detach { handle: SurfaceHandle, reply: oneshot::Sender<Result<(), SurfaceError>> },
}

/// Runs every attach and detach on one task that owns the provider.
#[derive(Clone)]
pub struct SurfaceDispatcher {
    sender: mpsc::Sender<SurfaceCommand>,
}

impl SurfaceDispatcher {
    pub fn spawn<P>(mut provider: P) -> Self
    where
        P: SurfaceProvider + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<SurfaceCommand>(32);

        tokio::spawn(async move {
            while let Some(command) = receiver.recv().await {
                match command {
                    SurfaceCommand::Attach { request, reply } => {
                        let result = provider.attach(request).await;
                        if let Ok(handle) = &result {
                            debug!("Surface {:?} attached", handle);
                        }
                        let _ = reply.send(result);
                    }
                    SurfaceCommand::Detach { handle, reply } => {
                        let _ = reply.send(provider.detach(handle).await);
                    }
                }
            }
            debug!("Surface dispatcher stopped");
        });

        Self { sender }
    }

    pub async fn attach(&self, request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(SurfaceCommand::Attach { request, reply })
            .await
            .map_err(|_| SurfaceError::DispatcherClosed)?;
        response.await.map_err(|_| SurfaceError::DispatcherClosed)?
    }

    pub async fn detach(&self, handle: SurfaceHandle) {
        let (reply, response) = oneshot::channel();
        if self.sender.send(SurfaceCommand::Detach { handle, reply }).await.is_err() {
            warn!("Cannot detach surface {:?}: dispatcher stopped", handle);
            return;
        }

        match response.await {
            Ok(Ok(())) => debug!("Surface {:?} detached", handle),
            Ok(Err(e)) => warn!("Failed to detach surface {:?}: {}", handle, e),
            Err(_) => warn!("Cannot detach surface {:?}: dispatcher stopped", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingProvider {
        next: u64,
        attached: Arc<Mutex<HashSet<u64>>>,
        available: bool,
    }

    #[async_trait]
    impl SurfaceProvider for RecordingProvider {
        async fn attach(&mut self, _request: SurfaceRequest) -> Result<SurfaceHandle, SurfaceError> {
            if !self.available {
                return Err(SurfaceError::CapabilityUnavailable("no display".to_string()));
            }
            self.next += 1;
            self.attached.lock().unwrap().insert(self.next);
            Ok(SurfaceHandle(self.next))
        }

        async fn detach(&mut self, handle: SurfaceHandle) -> Result<(), SurfaceError> {
            self.attached.lock().unwrap().remove(&handle.0);
            Ok(())
        }
    }

    fn blocking_request() -> SurfaceRequest {
        SurfaceRequest::FullScreen(BlockingContent {
            package_id: "org.example.Focus".to_string(),
            app_name: "Focus".to_string(),
            usage_minutes: 32,
            limit_minutes: 30,
        })
    }

    #[tokio::test]
    async fn test_attach_and_detach_through_dispatcher() {
        let attached = Arc::new(Mutex::new(HashSet::new()));
        let dispatcher = SurfaceDispatcher::spawn(RecordingProvider {
            attached: Arc::clone(&attached),
            available: true,
            ..Default::default()
        });

        let handle = dispatcher.attach(blocking_request()).await.unwrap();
        assert_eq!(attached.lock().unwrap().len(), 1);

        dispatcher.detach(handle).await;
        dispatcher.detach(handle).await;
        assert!(attached.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_capability_is_reported() {
        let dispatcher = SurfaceDispatcher::spawn(RecordingProvider::default());

        let result = dispatcher.attach(blocking_request()).await;
        assert!(matches!(result, Err(SurfaceError::CapabilityUnavailable(_))));
    }
}
