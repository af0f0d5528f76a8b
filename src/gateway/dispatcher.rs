use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::GatewayConnection;
use crate::error::HandlerError;
use crate::models::Message;

type BoxedHandler =
    dyn Fn(GatewayConnection, Message) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync;

/// Runs the application handler for each decoded message on its own task.
///
/// The receive loop never waits on a handler: the concurrency permit is
/// taken inside the spawned task. Messages handed off this way may be
/// handled in any order relative to each other, including two messages
/// from the same channel.
pub struct Dispatcher {
    handler: Arc<BoxedHandler>,
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new<F, Fut>(handler: F, max_in_flight: usize) -> Self
    where
        F: Fn(GatewayConnection, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(
                move |conn: GatewayConnection,
                      msg: Message|
                      -> BoxFuture<'static, Result<(), HandlerError>> {
                    Box::pin(handler(conn, msg))
                },
            ),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Spawns the handler for `message`. Errors are logged, never returned.
    pub fn dispatch(&self, conn: GatewayConnection, message: Message) -> JoinHandle<()> {
        let handler = Arc::clone(&self.handler);
        let permits = Arc::clone(&self.permits);
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let message_id = message.id.clone();
            if let Err(e) = handler(conn, message).await {
                tracing::warn!("message handler failed for message {message_id}: {e}");
            }
        })
    }

    #[cfg(test)]
    fn in_flight_capacity(&self) -> usize {
        self.permits.available_permits()
    }
}
