use serde::{Deserialize, Serialize};

/// Taste profile stored with a user account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default = "default_genres")]
    pub genres: Vec<String>,
    #[serde(default = "default_mood_preferences")]
    pub mood_preferences: Vec<String>,
    #[serde(default = "default_content_types")]
    pub content_types: Vec<String>,
}

fn default_genres() -> Vec<String> {
    vec!["action".into(), "comedy".into(), "drama".into()]
}

fn default_mood_preferences() -> Vec<String> {
    vec!["happy".into(), "excited".into()]
}

fn default_content_types() -> Vec<String> {
    vec!["movies".into(), "series".into()]
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            genres: default_genres(),
            mood_preferences: default_mood_preferences(),
            content_types: default_content_types(),
        }
    }
}
