use std::sync::Arc;

use crate::{
    db::UserStore,
    services::{
        providers::MetadataProvider, AccountService, ContentResolver, ConversationStore,
        EmotionClassifier, TitleSearcher,
    },
};

/// Shared application state
///
/// Everything in here is either immutable after startup or synchronizes
/// internally, so cloning the state per request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn MetadataProvider>,
    pub resolver: Arc<ContentResolver>,
    pub searcher: Arc<TitleSearcher>,
    pub store: Arc<dyn UserStore>,
    pub accounts: AccountService,
    pub classifier: Arc<EmotionClassifier>,
    pub conversations: ConversationStore,
}

impl AppState {
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        store: Arc<dyn UserStore>,
        classifier: EmotionClassifier,
        image_base_url: String,
        session_ttl_secs: u64,
    ) -> Self {
        Self {
            resolver: Arc::new(ContentResolver::new(provider.clone(), image_base_url)),
            searcher: Arc::new(TitleSearcher::new(provider.clone())),
            accounts: AccountService::new(store.clone(), session_ttl_secs),
            classifier: Arc::new(classifier),
            conversations: ConversationStore::default(),
            provider,
            store,
        }
    }
}
