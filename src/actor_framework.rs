use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, instrument, warn};

// =============================================================================
// 1. THE ABSTRACTION (Traits with Hooks, Params, and Actions)
// =============================================================================

/// Failures produced by the actor plumbing itself, independent of any entity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("actor closed")]
    ActorClosed,
    #[error("actor dropped the response channel")]
    ActorDropped,
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("unexpected response to {0}")]
    UnexpectedResponse(&'static str),
}

impl FrameworkError {
    /// Only failures where the request may not have been observed are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, FrameworkError::Timeout(_) | FrameworkError::ActorDropped)
    }
}

/// Trait that any aggregate must implement to be owned by a [`ResourceActor`].
///
/// `handle_action` is the only way to run a guarded mutation. The actor applies
/// it while holding exclusive access to the entity, so the predicate a handler
/// checks and the mutation it performs form one indivisible step. Handlers must
/// leave the entity untouched when they return `Err`.
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Eq + Hash + Clone + Send + Sync + Display + Debug;
    type CreateParams: Send + Sync + Debug;
    type Patch: Send + Sync + Debug;
    type Action: Send + Sync + Debug;
    type ActionResult: Send + Sync + Debug;
    type Error: From<FrameworkError> + Send + Sync + Debug + 'static;

    fn id(&self) -> &Self::Id;

    /// Construct the full entity from its id and creation parameters.
    fn from_create_params(id: Self::Id, params: Self::CreateParams) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks ---

    fn on_create(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
    fn on_update(&mut self, patch: Self::Patch) -> Result<(), Self::Error>;
    fn on_delete(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler ---

    fn handle_action(&mut self, action: Self::Action) -> Result<Self::ActionResult, Self::Error>;
}

// =============================================================================
// 2. THE GENERIC MESSAGES
// =============================================================================

pub type Response<T, E> = oneshot::Sender<Result<T, E>>;

#[derive(Debug)]
pub enum ResourceRequest<T: Entity> {
    Create {
        params: T::CreateParams,
        respond_to: Response<T::Id, T::Error>,
    },
    Insert {
        id: T::Id,
        params: T::CreateParams,
        respond_to: Response<T, T::Error>,
    },
    Get {
        id: T::Id,
        respond_to: Response<Option<T>, T::Error>,
    },
    List {
        respond_to: Response<Vec<T>, T::Error>,
    },
    Update {
        id: T::Id,
        patch: T::Patch,
        respond_to: Response<T, T::Error>,
    },
    Delete {
        id: T::Id,
        respond_to: Response<(), T::Error>,
    },
    Action {
        id: T::Id,
        action: T::Action,
        respond_to: Response<T::ActionResult, T::Error>,
    },
    Shutdown,
}

// =============================================================================
// 3. THE GENERIC ACTOR SERVER
// =============================================================================

pub struct ResourceActor<T: Entity> {
    name: &'static str,
    receiver: mpsc::Receiver<ResourceRequest<T>>,
    store: HashMap<T::Id, T>,
    next_id_fn: Box<dyn Fn() -> T::Id + Send + Sync>,
}

impl<T: Entity> ResourceActor<T> {
    pub fn new(
        name: &'static str,
        buffer_size: usize,
        request_timeout: Duration,
        next_id_fn: impl Fn() -> T::Id + Send + Sync + 'static,
    ) -> (Self, ResourceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            name,
            receiver,
            store: HashMap::new(),
            next_id_fn: Box::new(next_id_fn),
        };
        let client = ResourceClient::new(sender).with_timeout(request_timeout);
        (actor, client)
    }

    #[instrument(name = "resource_actor", fields(actor = self.name), skip(self))]
    pub async fn run(mut self) {
        info!("Actor starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ResourceRequest::Create { params, respond_to } => {
                    let id = (self.next_id_fn)();
                    let result = self.insert(id.clone(), params).map(|_| id);
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Insert { id, params, respond_to } => {
                    let _ = respond_to.send(self.insert(id, params));
                }
                ResourceRequest::Get { id, respond_to } => {
                    let item = self.store.get(&id).cloned();
                    let _ = respond_to.send(Ok(item));
                }
                ResourceRequest::List { respond_to } => {
                    let items: Vec<T> = self.store.values().cloned().collect();
                    debug!(count = items.len(), "Listed items");
                    let _ = respond_to.send(Ok(items));
                }
                ResourceRequest::Update { id, patch, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => {
                            // Patch a scratch copy so a rejected patch leaves no trace.
                            let mut updated = item.clone();
                            updated.on_update(patch).map(|()| {
                                *item = updated.clone();
                                updated
                            })
                        }
                        None => Err(FrameworkError::NotFound(id.to_string()).into()),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Delete { id, respond_to } => {
                    let result = match self.store.get(&id) {
                        Some(item) => item.on_delete().map(|()| {
                            self.store.remove(&id);
                        }),
                        None => Err(FrameworkError::NotFound(id.to_string()).into()),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Action { id, action, respond_to } => {
                    let result = match self.store.get_mut(&id) {
                        Some(item) => item.handle_action(action),
                        None => Err(FrameworkError::NotFound(id.to_string()).into()),
                    };
                    let _ = respond_to.send(result);
                }
                ResourceRequest::Shutdown => {
                    info!("Actor shutting down");
                    break;
                }
            }
        }
        info!(remaining = self.store.len(), "Actor stopped");
    }

    fn insert(&mut self, id: T::Id, params: T::CreateParams) -> Result<T, T::Error> {
        if self.store.contains_key(&id) {
            warn!(id = %id, "Refusing to overwrite existing item");
            return Err(FrameworkError::AlreadyExists(id.to_string()).into());
        }
        let mut item = T::from_create_params(id.clone(), params)?;
        item.on_create()?;
        self.store.insert(id, item.clone());
        Ok(item)
    }
}

// =============================================================================
// 4. THE GENERIC CLIENT
// =============================================================================

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ResourceClient<T: Entity> {
    sender: mpsc::Sender<ResourceRequest<T>>,
    timeout: Duration,
}

// Manual impl: a derive would demand `T: Clone` bounds on every associated type.
impl<T: Entity> Clone for ResourceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            timeout: self.timeout,
        }
    }
}

impl<T: Entity> ResourceClient<T> {
    pub fn new(sender: mpsc::Sender<ResourceRequest<T>>) -> Self {
        Self {
            sender,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn request<R>(
        &self,
        build: impl FnOnce(Response<R, T::Error>) -> ResourceRequest<T>,
    ) -> Result<R, T::Error> {
        let (respond_to, response) = oneshot::channel();
        let exchange = async {
            self.sender
                .send(build(respond_to))
                .await
                .map_err(|_| FrameworkError::ActorClosed)?;
            response.await.map_err(|_| FrameworkError::ActorDropped)
        };
        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(FrameworkError::Timeout(self.timeout).into()),
        }
    }

    pub async fn create(&self, params: T::CreateParams) -> Result<T::Id, T::Error> {
        self.request(|respond_to| ResourceRequest::Create { params, respond_to })
            .await
    }

    pub async fn insert(&self, id: T::Id, params: T::CreateParams) -> Result<T, T::Error> {
        self.request(|respond_to| ResourceRequest::Insert { id, params, respond_to })
            .await
    }

    pub async fn get(&self, id: T::Id) -> Result<Option<T>, T::Error> {
        self.request(|respond_to| ResourceRequest::Get { id, respond_to })
            .await
    }

    pub async fn list(&self) -> Result<Vec<T>, T::Error> {
        self.request(|respond_to| ResourceRequest::List { respond_to })
            .await
    }

    pub async fn update(&self, id: T::Id, patch: T::Patch) -> Result<T, T::Error> {
        self.request(|respond_to| ResourceRequest::Update { id, patch, respond_to })
            .await
    }

    pub async fn delete(&self, id: T::Id) -> Result<(), T::Error> {
        self.request(|respond_to| ResourceRequest::Delete { id, respond_to })
            .await
    }

    pub async fn perform_action(&self, id: T::Id, action: T::Action) -> Result<T::ActionResult, T::Error> {
        self.request(|respond_to| ResourceRequest::Action { id, action, respond_to })
            .await
    }

    /// Ask the actor to stop after draining the requests queued ahead of this one.
    pub async fn shutdown(&self) -> Result<(), T::Error> {
        self.sender
            .send(ResourceRequest::Shutdown)
            .await
            .map_err(|_| FrameworkError::ActorClosed.into())
    }
}

// =============================================================================
// 5. EXAMPLE USAGE (Test)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    // --- Domain Definition ---

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        id: String,
        value: u32,
        limit: u32,
    }

    #[derive(Debug)]
    struct CounterParams {
        limit: u32,
    }

    #[derive(Debug)]
    struct CounterPatch {
        limit: Option<u32>,
    }

    #[derive(Debug)]
    enum CounterAction {
        IncrementIfBelowLimit,
    }

    #[derive(Debug, Clone, PartialEq, Error)]
    enum CounterError {
        #[error("limit reached")]
        LimitReached,
        #[error("limit must be positive")]
        InvalidLimit,
        #[error(transparent)]
        Framework(#[from] FrameworkError),
    }

    impl Entity for Counter {
        type Id = String;
        type CreateParams = CounterParams;
        type Patch = CounterPatch;
        type Action = CounterAction;
        type ActionResult = u32;
        type Error = CounterError;

        fn id(&self) -> &String {
            &self.id
        }

        fn from_create_params(id: String, params: CounterParams) -> Result<Self, CounterError> {
            if params.limit == 0 {
                return Err(CounterError::InvalidLimit);
            }
            Ok(Self { id, value: 0, limit: params.limit })
        }

        fn on_update(&mut self, patch: CounterPatch) -> Result<(), CounterError> {
            if let Some(limit) = patch.limit {
                // Mutate first so the test can observe that a failed patch is discarded.
                self.limit = limit;
                if limit == 0 {
                    return Err(CounterError::InvalidLimit);
                }
            }
            Ok(())
        }

        fn handle_action(&mut self, action: CounterAction) -> Result<u32, CounterError> {
            match action {
                CounterAction::IncrementIfBelowLimit => {
                    if self.value < self.limit {
                        self.value += 1;
                        Ok(self.value)
                    } else {
                        Err(CounterError::LimitReached)
                    }
                }
            }
        }
    }

    fn start_counter_actor() -> ResourceClient<Counter> {
        let counter = Arc::new(AtomicU64::new(1));
        let next_id = move || format!("counter_{}", counter.fetch_add(1, Ordering::SeqCst));
        let (actor, client) = ResourceActor::new("counter", 16, Duration::from_secs(1), next_id);
        tokio::spawn(actor.run());
        client
    }

    #[tokio::test]
    async fn test_resource_actor_with_actions() {
        let client = start_counter_actor();

        let id = client.create(CounterParams { limit: 2 }).await.unwrap();
        assert_eq!(id, "counter_1");

        assert_eq!(client.perform_action(id.clone(), CounterAction::IncrementIfBelowLimit).await, Ok(1));
        assert_eq!(client.perform_action(id.clone(), CounterAction::IncrementIfBelowLimit).await, Ok(2));
        assert_eq!(
            client.perform_action(id.clone(), CounterAction::IncrementIfBelowLimit).await,
            Err(CounterError::LimitReached)
        );

        let counter = client.get(id).await.unwrap().unwrap();
        assert_eq!(counter.value, 2);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let client = start_counter_actor();

        client.insert("fixed".to_string(), CounterParams { limit: 1 }).await.unwrap();
        let err = client
            .insert("fixed".to_string(), CounterParams { limit: 5 })
            .await
            .unwrap_err();
        assert_eq!(err, CounterError::Framework(FrameworkError::AlreadyExists("fixed".into())));

        let stored = client.get("fixed".to_string()).await.unwrap().unwrap();
        assert_eq!(stored.limit, 1);
    }

    #[tokio::test]
    async fn test_failed_update_is_discarded() {
        let client = start_counter_actor();
        let id = client.create(CounterParams { limit: 3 }).await.unwrap();

        let err = client.update(id.clone(), CounterPatch { limit: Some(0) }).await.unwrap_err();
        assert_eq!(err, CounterError::InvalidLimit);
        assert_eq!(client.get(id).await.unwrap().unwrap().limit, 3);
    }

    #[tokio::test]
    async fn test_missing_item_reports_not_found() {
        let client = start_counter_actor();
        let err = client
            .perform_action("nope".into(), CounterAction::IncrementIfBelowLimit)
            .await
            .unwrap_err();
        assert_eq!(err, CounterError::Framework(FrameworkError::NotFound("nope".into())));
        assert_eq!(client.delete("nope".into()).await.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        let (sender, _receiver) = mpsc::channel::<ResourceRequest<Counter>>(4);
        let client = ResourceClient::new(sender).with_timeout(Duration::from_millis(20));

        let err = client.get("counter_1".into()).await.unwrap_err();
        assert_eq!(err, CounterError::Framework(FrameworkError::Timeout(Duration::from_millis(20))));
        assert!(FrameworkError::Timeout(Duration::from_millis(20)).is_transient());
    }

    #[tokio::test]
    async fn test_shutdown_stops_actor() {
        let (actor, client) = ResourceActor::<Counter>::new(
            "counter",
            4,
            Duration::from_millis(200),
            || "counter".to_string(),
        );
        let handle = tokio::spawn(actor.run());

        client.shutdown().await.unwrap();
        handle.await.unwrap();

        let err = client.list().await.unwrap_err();
        assert_eq!(err, CounterError::Framework(FrameworkError::ActorClosed));
    }
}
