use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// TMDb genre identifier, passed through to `with_genres`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u32);

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const COMEDY: CategoryId = CategoryId(35);
pub const ANIMATION: CategoryId = CategoryId(16);
pub const DRAMA: CategoryId = CategoryId(18);
pub const ROMANCE: CategoryId = CategoryId(10749);
pub const ACTION: CategoryId = CategoryId(28);
pub const ADVENTURE: CategoryId = CategoryId(12);
pub const FAMILY: CategoryId = CategoryId(10751);
pub const SCIENCE_FICTION: CategoryId = CategoryId(878);
pub const HISTORY: CategoryId = CategoryId(36);
pub const FANTASY: CategoryId = CategoryId(14);
pub const HORROR: CategoryId = CategoryId(27);
pub const THRILLER: CategoryId = CategoryId(53);

/// Category used for any mood or genre keyword we don't recognize
pub const DEFAULT_CATEGORY: CategoryId = COMEDY;

/// Mood a user can pick (or that the emotion classifier can report)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodKey {
    Happy,
    Sad,
    Excited,
    Relaxed,
    Adventurous,
    Romantic,
    Thoughtful,
    Nostalgic,
    Scared,
}

impl MoodKey {
    pub const ALL: [MoodKey; 9] = [
        MoodKey::Happy,
        MoodKey::Sad,
        MoodKey::Excited,
        MoodKey::Relaxed,
        MoodKey::Adventurous,
        MoodKey::Romantic,
        MoodKey::Thoughtful,
        MoodKey::Nostalgic,
        MoodKey::Scared,
    ];

    /// Case-insensitive lookup, `None` for unknown moods
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|mood| mood.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodKey::Happy => "happy",
            MoodKey::Sad => "sad",
            MoodKey::Excited => "excited",
            MoodKey::Relaxed => "relaxed",
            MoodKey::Adventurous => "adventurous",
            MoodKey::Romantic => "romantic",
            MoodKey::Thoughtful => "thoughtful",
            MoodKey::Nostalgic => "nostalgic",
            MoodKey::Scared => "scared",
        }
    }

    /// Genres unioned into the discovery query for this mood
    pub fn categories(&self) -> &'static [CategoryId] {
        match self {
            MoodKey::Happy => &[COMEDY, ANIMATION],
            MoodKey::Sad => &[DRAMA, ROMANCE],
            MoodKey::Excited => &[ACTION, ADVENTURE],
            MoodKey::Relaxed => &[FAMILY, COMEDY],
            MoodKey::Adventurous => &[ACTION, SCIENCE_FICTION],
            MoodKey::Romantic => &[ROMANCE],
            MoodKey::Thoughtful => &[DRAMA, HISTORY],
            MoodKey::Nostalgic => &[FAMILY, FANTASY],
            MoodKey::Scared => &[HORROR, THRILLER],
        }
    }
}

impl Display for MoodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Genre buttons offered by the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenreKey {
    Action,
    Comedy,
    Drama,
    SciFi,
    Horror,
    Romance,
}

impl GenreKey {
    pub const ALL: [GenreKey; 6] = [
        GenreKey::Action,
        GenreKey::Comedy,
        GenreKey::Drama,
        GenreKey::SciFi,
        GenreKey::Horror,
        GenreKey::Romance,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        Self::ALL.into_iter().find(|genre| genre.as_str() == value)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenreKey::Action => "action",
            GenreKey::Comedy => "comedy",
            GenreKey::Drama => "drama",
            GenreKey::SciFi => "sci-fi",
            GenreKey::Horror => "horror",
            GenreKey::Romance => "romance",
        }
    }

    pub fn category(&self) -> CategoryId {
        match self {
            GenreKey::Action => ACTION,
            GenreKey::Comedy => COMEDY,
            GenreKey::Drama => DRAMA,
            GenreKey::SciFi => SCIENCE_FICTION,
            GenreKey::Horror => HORROR,
            GenreKey::Romance => ROMANCE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mood_has_categories() {
        for mood in MoodKey::ALL {
            assert!(!mood.categories().is_empty(), "{mood} has no categories");
        }
    }

    #[test]
    fn test_mood_parse_is_case_insensitive() {
        assert_eq!(MoodKey::parse("HAPPY"), Some(MoodKey::Happy));
        assert_eq!(MoodKey::parse(" Nostalgic "), Some(MoodKey::Nostalgic));
        assert_eq!(MoodKey::parse("euphoric"), None);
    }

    #[test]
    fn test_mood_table() {
        let ids = |mood: MoodKey| mood.categories().iter().map(|c| c.0).collect::<Vec<_>>();
        assert_eq!(ids(MoodKey::Happy), vec![35, 16]);
        assert_eq!(ids(MoodKey::Sad), vec![18, 10749]);
        assert_eq!(ids(MoodKey::Excited), vec![28, 12]);
        assert_eq!(ids(MoodKey::Relaxed), vec![10751, 35]);
        assert_eq!(ids(MoodKey::Adventurous), vec![28, 878]);
        assert_eq!(ids(MoodKey::Romantic), vec![10749]);
        assert_eq!(ids(MoodKey::Thoughtful), vec![18, 36]);
        assert_eq!(ids(MoodKey::Nostalgic), vec![10751, 14]);
        assert_eq!(ids(MoodKey::Scared), vec![27, 53]);
    }

    #[test]
    fn test_genre_table() {
        assert_eq!(GenreKey::parse("sci-fi").map(|g| g.category()), Some(CategoryId(878)));
        assert_eq!(GenreKey::parse("Horror").map(|g| g.category()), Some(CategoryId(27)));
        assert_eq!(GenreKey::parse("all"), None);
    }

    #[test]
    fn test_mood_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MoodKey::Thoughtful).unwrap(), "\"thoughtful\"");
    }
}
