use anyhow::Result;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::Config;
use crate::device_tokens::DeviceTokenDirectory;
use crate::messages::MessageStore;
use crate::messaging_service::MessageDispatchService;
use crate::push::{self, PushDispatcher, PushTransport};
use crate::recipient::RecipientResolver;
use crate::storage::{Repositories, StorageHealth};
use crate::threads::ThreadRegistry;
use crate::utils::LogIds;

/// Application context containing shared dependencies.
///
/// Built once at startup; every component is constructed here and handed
/// its collaborators explicitly.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub threads: Arc<ThreadRegistry>,
    pub messages: Arc<MessageStore>,
    pub device_tokens: Arc<DeviceTokenDirectory>,
    pub messaging: Arc<MessageDispatchService>,
    pub catalog: Arc<Catalog>,
    pub storage_health: Arc<dyn StorageHealth>,
}

impl AppContext {
    /// Wire the components with an already-built push transport
    pub fn new(
        config: Arc<Config>,
        repos: Repositories,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let log_ids = LogIds::new(&config.logging);
        let external_timeout = config.external_call_timeout();

        let threads = Arc::new(ThreadRegistry::new(repos.threads.clone(), log_ids.clone()));
        let messages = Arc::new(MessageStore::new(
            repos.messages.clone(),
            config.max_message_length,
        ));
        let device_tokens = Arc::new(DeviceTokenDirectory::new(
            repos.device_tokens.clone(),
            log_ids.clone(),
        ));
        let resolver = Arc::new(RecipientResolver::new(
            repos.profiles.clone(),
            external_timeout,
        ));
        let dispatcher = Arc::new(PushDispatcher::new(
            transport,
            device_tokens.clone(),
            external_timeout,
        ));
        let messaging = Arc::new(MessageDispatchService::new(
            threads.clone(),
            messages.clone(),
            resolver,
            device_tokens.clone(),
            dispatcher,
            log_ids,
        ));
        let catalog = Arc::new(Catalog::new(repos.profiles.clone(), repos.reviews.clone()));

        Self {
            config,
            threads,
            messages,
            device_tokens,
            messaging,
            catalog,
            storage_health: repos.health,
        }
    }

    /// Wire the components with the transport selected in `config.push`
    pub fn from_config(config: Arc<Config>, repos: Repositories) -> Result<Self> {
        let transport = push::build_transport(&config.push)?;
        Ok(Self::new(config, repos, transport))
    }
}
