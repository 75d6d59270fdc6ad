use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use tokio::sync::RwLock;

use crate::{domain::UpdateType, ports::PollingPort, updates::UpdateContext, Result};

/// Boxed future returned by type-erased handlers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A registered update handler.
///
/// Receives the client the update came from plus its decoded context.
pub type Handler =
    Arc<dyn Fn(Arc<dyn PollingPort>, UpdateContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Erase an async closure into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<dyn PollingPort>, UpdateContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(
        move |client: Arc<dyn PollingPort>, ctx: UpdateContext| -> BoxFuture<'static, Result<()>> {
            Box::pin(f(client, ctx))
        },
    )
}

/// Update type -> handlers, in registration order.
///
/// Append-only: there is no unregister, and identical handlers are not deduplicated.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<UpdateType, Vec<Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, update_type: UpdateType, handler: Handler) {
        let mut map = self.handlers.write().await;
        map.entry(update_type).or_default().push(handler);
    }

    /// Snapshot of the handlers for `update_type`; later registrations are not visible in it.
    pub async fn lookup(&self, update_type: UpdateType) -> Vec<Handler> {
        let map = self.handlers.read().await;
        map.get(&update_type).cloned().unwrap_or_default()
    }

    pub async fn len(&self, update_type: UpdateType) -> usize {
        let map = self.handlers.read().await;
        map.get(&update_type).map(Vec::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::fake::FakePort;
    use crate::updates::ScanRequestEvent;
    use std::sync::Mutex;

    fn approved() -> UpdateContext {
        UpdateContext::ScanRequestApproved(ScanRequestEvent {
            unique_id: "u1".to_string(),
            target_user: 42,
            target_type: 0,
            agent_reason: "spam".to_string(),
        })
    }

    #[tokio::test]
    async fn lookup_of_unregistered_type_is_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.lookup(UpdateType::ScanRequestRejected).await.is_empty());
        assert_eq!(registry.len(UpdateType::ScanRequestRejected).await, 0);
    }

    #[tokio::test]
    async fn lookup_preserves_registration_order() {
        let registry = HandlerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for idx in 0..5 {
            let seen = seen.clone();
            registry
                .register(
                    UpdateType::ScanRequestApproved,
                    handler_fn(move |_client, _ctx| {
                        let seen = seen.clone();
                        async move {
                            seen.lock().unwrap().push(idx);
                            Ok(())
                        }
                    }),
                )
                .await;
        }

        let client: Arc<dyn PollingPort> = Arc::new(FakePort::new());
        for handler in registry.lookup(UpdateType::ScanRequestApproved).await {
            handler(client.clone(), approved()).await.unwrap();
        }
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(registry.len(UpdateType::ScanRequestRejected).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_registration_and_lookup() {
        let registry = Arc::new(HandlerRegistry::new());
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                registry
                    .register(
                        UpdateType::ScanRequestRejected,
                        handler_fn(|_client, _ctx| async { Ok(()) }),
                    )
                    .await;
                registry.lookup(UpdateType::ScanRequestRejected).await.len()
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap() >= 1);
        }
        assert_eq!(registry.len(UpdateType::ScanRequestRejected).await, 32);
    }

    #[tokio::test]
    async fn duplicate_registrations_are_kept() {
        let registry = HandlerRegistry::new();
        let handler = handler_fn(|_client, _ctx| async { Ok(()) });
        registry
            .register(UpdateType::ScanRequestApproved, handler.clone())
            .await;
        registry
            .register(UpdateType::ScanRequestApproved, handler)
            .await;
        assert_eq!(registry.len(UpdateType::ScanRequestApproved).await, 2);
    }
}
