//! Template-based text generators
//!
//! Everything here is keyword lookup plus string interpolation; randomness
//! comes from the caller so results are reproducible in tests.

use rand::{seq::IndexedRandom, Rng};

pub const SUCCESS_FLOOR: i64 = 25;
pub const SUCCESS_CEILING: i64 = 95;

fn pick<R: Rng + ?Sized>(options: Vec<String>, rng: &mut R) -> String {
    options.choose(rng).cloned().unwrap_or_default()
}

struct MatchRule {
    keywords: &'static [&'static str],
    movies: [&'static str; 4],
}

const MATCH_RULES: &[MatchRule] = &[
    MatchRule {
        keywords: &["funny", "comedy", "laugh"],
        movies: ["The Grand Budapest Hotel", "Superbad", "Knives Out", "What We Do in the Shadows"],
    },
    MatchRule {
        keywords: &["action", "fight", "explosion"],
        movies: ["Mad Max: Fury Road", "John Wick", "Mission: Impossible", "The Matrix"],
    },
    MatchRule {
        keywords: &["scary", "horror", "thriller"],
        movies: ["Get Out", "Hereditary", "A Quiet Place", "The Shining"],
    },
    MatchRule {
        keywords: &["love", "romance", "romantic"],
        movies: ["Before Sunrise", "La La Land", "The Princess Bride", "Her"],
    },
    MatchRule {
        keywords: &["space", "sci-fi", "future"],
        movies: ["Blade Runner 2049", "Arrival", "Interstellar", "Ex Machina"],
    },
    MatchRule {
        keywords: &["drama", "emotional", "deep"],
        movies: ["Parasite", "Moonlight", "Manchester by the Sea", "Room"],
    },
];

const DEFAULT_MATCHES: [&str; 4] = [
    "The Shawshank Redemption",
    "Pulp Fiction",
    "The Dark Knight",
    "Forrest Gump",
];

/// Four titles matching a free-text description
pub fn ai_match(description: &str) -> Vec<String> {
    let description = description.to_lowercase();
    let movies = MATCH_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| description.contains(k)))
        .map(|rule| rule.movies)
        .unwrap_or(DEFAULT_MATCHES);
    movies.iter().map(|m| m.to_string()).collect()
}

pub fn synopsis(title: &str, style: &str) -> String {
    match style {
        "funny" => format!(
            "In this hilarious reimagining of {title}, everything goes wonderfully wrong! Expect unexpected comedy, witty dialogue, and characters who definitely didn't read the original script."
        ),
        "dark" => format!(
            "A darker take on {title} where shadows lurk in every corner and nothing is as it seems. This psychological thriller will keep you guessing until the very end."
        ),
        _ => format!(
            "An innovative retelling of {title} that explores new dimensions of the story. With fresh perspectives and creative twists, this version brings something entirely new to the beloved tale."
        ),
    }
}

pub fn mashup<R: Rng + ?Sized>(first: &str, second: &str, rng: &mut R) -> String {
    pick(
        vec![
            format!("What if {first} met {second}? Imagine the characters from {first} finding themselves in the world of {second}, creating an epic crossover adventure!"),
            format!("A thrilling mashup: {first} + {second} = The story follows the plot of {first} but with the visual style and atmosphere of {second}."),
            format!("Genre-bending fusion: Take the main character from {first}, put them in the setting of {second}, and watch the magic happen!"),
            format!("Ultimate crossover: {first} meets {second} in a parallel universe where both stories collide in unexpected ways!"),
        ],
        rng,
    )
}

fn genre_base_score(genre: &str) -> f64 {
    match genre {
        "action" => 65.0,
        "comedy" => 60.0,
        "drama" => 55.0,
        "horror" => 70.0,
        "sci-fi" => 62.0,
        _ => 60.0,
    }
}

fn budget_multiplier(budget: &str) -> f64 {
    match budget {
        "low" => 0.8,
        "high" => 1.2,
        _ => 1.0,
    }
}

fn cast_multiplier(cast: &str) -> f64 {
    match cast {
        "low" => 0.7,
        "high" => 1.3,
        _ => 1.0,
    }
}

/// Success percentage with a ±10% random swing, clamped to 25..=95
pub fn predict_success<R: Rng + ?Sized>(genre: &str, budget: &str, cast: &str, rng: &mut R) -> i64 {
    let swing = rng.random_range(0.9..=1.1);
    let score = genre_base_score(genre) * budget_multiplier(budget) * cast_multiplier(cast) * swing;
    (score as i64).clamp(SUCCESS_FLOOR, SUCCESS_CEILING)
}

pub fn trivia<R: Rng + ?Sized>(title: &str, rng: &mut R) -> String {
    pick(
        vec![
            format!("Did you know {title} was almost cast with a different lead actor?"),
            format!("The budget for {title} was significantly higher than expected due to special effects."),
            format!("Fun fact: {title} was filmed in multiple countries for authenticity."),
            format!("{title} broke several box office records in its opening weekend."),
            format!("The director of {title} had to overcome many challenges during production."),
        ],
        rng,
    )
}

pub fn alternate_ending<R: Rng + ?Sized>(title: &str, genre: &str, rng: &mut R) -> String {
    let endings = match genre {
        "action" => vec![
            format!("In an alternate ending, {title} could have ended with the villain's redemption arc."),
            format!("What if {title} ended with a shocking plot twist revealing the hero as the real antagonist?"),
            format!("Imagine {title} with a peaceful resolution instead of the final battle."),
        ],
        "horror" => vec![
            format!("An alternate {title} could end with the monster being misunderstood rather than evil."),
            format!("What if {title} had a happy ending where everyone survives?"),
            format!("Picture {title} ending with the revelation that it was all a simulation."),
        ],
        "romance" => vec![
            format!("In another version, {title} could end with the leads choosing different paths."),
            format!("What if {title} ended with a time-travel twist reuniting the couple?"),
            format!("Imagine {title} with the couple becoming best friends instead of lovers."),
        ],
        _ => vec![
            format!("An alternate {title} could have a completely different tone and message."),
            format!("What if {title} was told from the antagonist's perspective?"),
            format!("Picture {title} set in a different time period entirely."),
        ],
    };
    pick(endings, rng)
}

pub fn sequel_idea<R: Rng + ?Sized>(title: &str, genre: &str, rng: &mut R) -> String {
    let ideas = match genre {
        "action" => vec![
            format!("{title} 2: Global Threat - The stakes are now worldwide!"),
            format!("{title}: Origins - Discover how it all began."),
            format!("{title}: Next Generation - A new hero emerges."),
        ],
        "comedy" => vec![
            format!("{title} 2: Double Trouble - Twice the laughs!"),
            format!("{title}: International - Taking the comedy global."),
            format!("{title}: The Next Chapter - New adventures await."),
        ],
        "horror" => vec![
            format!("{title} 2: The Return - The nightmare continues."),
            format!("{title}: Origins of Evil - Uncover the dark beginning."),
            format!("{title}: Final Chapter - End the terror once and for all."),
        ],
        _ => vec![
            format!("{title} 2: The Continuation"),
            format!("{title}: New Beginnings"),
            format!("{title}: The Legacy"),
        ],
    };
    pick(ideas, rng)
}

const PLOT_MOODS: &[(&str, &[&str])] = &[
    ("dark", &["death", "murder", "revenge", "betrayal", "war"]),
    ("uplifting", &["love", "friendship", "hope", "victory", "family"]),
    ("mysterious", &["secret", "hidden", "unknown", "puzzle", "investigation"]),
    ("intense", &["chase", "fight", "escape", "survival", "danger"]),
    ("emotional", &["loss", "sacrifice", "reunion", "forgiveness", "growth"]),
];

/// Every mood with at least one indicator in the keywords, or `neutral`
pub fn plot_moods(keywords: &str) -> Vec<String> {
    let keywords = keywords.to_lowercase();
    let moods: Vec<String> = PLOT_MOODS
        .iter()
        .filter(|(_, indicators)| indicators.iter().any(|i| keywords.contains(i)))
        .map(|(mood, _)| mood.to_string())
        .collect();

    if moods.is_empty() {
        vec!["neutral".to_string()]
    } else {
        moods
    }
}
