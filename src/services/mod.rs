pub mod accounts;
pub mod chat;
pub mod content;
pub mod emotion;
pub mod generators;
pub mod providers;
pub mod title_search;

pub use accounts::AccountService;
pub use chat::ConversationStore;
pub use content::ContentResolver;
pub use emotion::EmotionClassifier;
pub use title_search::TitleSearcher;
