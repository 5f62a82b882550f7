//! Keyword-driven movie chat
//!
//! Each conversation owns a [`ChatContext`]; the [`ConversationStore`] keeps
//! them keyed by conversation id, forgets idle ones and caps how many it holds.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{seq::IndexedRandom, Rng};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Conversations untouched for this long are dropped
pub const CONVERSATION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);
/// Upper bound on live conversations; the least recently used one makes room
pub const MAX_CONVERSATIONS: usize = 10_000;
/// Idle conversations are swept once every this many replies
const SWEEP_EVERY: u64 = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Identity,
    HowAreYou,
    Thanks,
    Genre(&'static str),
    FollowUp,
    Recommend,
    Talent,
    FeelingDown,
    FeelingGood,
    Bored,
    Fallback,
}

struct IntentRule {
    keywords: &'static [&'static str],
    intent: Intent,
}

/// Checked top to bottom; the first rule with a keyword contained anywhere in
/// the lowercased message wins. Messages matching nothing get
/// [`Intent::Fallback`].
const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        keywords: &["hello", "hi", "hey", "greetings", "good morning", "good evening"],
        intent: Intent::Greeting,
    },
    IntentRule {
        keywords: &["who are you", "what are you", "about you", "your name"],
        intent: Intent::Identity,
    },
    IntentRule {
        keywords: &["how are you", "how do you feel", "whats up"],
        intent: Intent::HowAreYou,
    },
    IntentRule {
        keywords: &["thank", "thanks", "appreciate"],
        intent: Intent::Thanks,
    },
    IntentRule {
        keywords: &["comedy", "funny", "laugh", "humor"],
        intent: Intent::Genre("comedy"),
    },
    IntentRule {
        keywords: &["action", "fight", "adventure", "explosion"],
        intent: Intent::Genre("action"),
    },
    IntentRule {
        keywords: &["horror", "scary", "thriller", "suspense"],
        intent: Intent::Genre("horror"),
    },
    IntentRule {
        keywords: &["romance", "love", "romantic", "date"],
        intent: Intent::Genre("romance"),
    },
    IntentRule {
        keywords: &["sci-fi", "science", "future", "space", "alien"],
        intent: Intent::Genre("sci-fi"),
    },
    IntentRule {
        keywords: &["drama", "emotional", "deep", "serious"],
        intent: Intent::Genre("drama"),
    },
    IntentRule {
        keywords: &["more", "another", "different", "else"],
        intent: Intent::FollowUp,
    },
    IntentRule {
        keywords: &["recommend", "suggest", "what should", "good movie"],
        intent: Intent::Recommend,
    },
    IntentRule {
        keywords: &["actor", "actress", "director", "starring"],
        intent: Intent::Talent,
    },
    IntentRule {
        keywords: &["sad", "depressed", "down"],
        intent: Intent::FeelingDown,
    },
    IntentRule {
        keywords: &["happy", "excited", "great mood"],
        intent: Intent::FeelingGood,
    },
    IntentRule {
        keywords: &["bored", "nothing to do"],
        intent: Intent::Bored,
    },
];

pub fn classify_intent(message: &str) -> Intent {
    let message = message.to_lowercase();
    INTENT_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| message.contains(k)))
        .map(|rule| rule.intent)
        .unwrap_or(Intent::Fallback)
}

/// Viewing hints picked up from a message
pub fn extract_preferences(message: &str) -> Vec<&'static str> {
    let message = message.to_lowercase();
    [("new", "recent"), ("classic", "classic"), ("short", "short")]
        .into_iter()
        .filter(|(keyword, _)| message.contains(keyword))
        .map(|(_, preference)| preference)
        .collect()
}

/// State carried between turns of one conversation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatContext {
    pub last_genre: Option<&'static str>,
    pub preferences: Vec<&'static str>,
    pub turns: u32,
}

const GREETINGS: &[&str] = &[
    "🎬 Hey there, movie lover! I'm your personal movie assistant. What kind of films are you in the mood for today?",
    "🍿 Hello! Ready to discover some amazing movies? Tell me what you're feeling - comedy, action, drama, or something else?",
    "🎭 Hi! I'm here to help you find the perfect movie. What's your vibe today - something light and fun or deep and meaningful?",
];

const IDENTITY: &str = "🤖 I'm your AI movie companion! I know tons about films and love helping people discover their next favorite movie. I can recommend based on mood, genre, or even specific actors you like. What would you like to explore?";

const HOW_ARE_YOU: &[&str] = &[
    "🎬 I'm doing great! Just watched some amazing trailers and I'm excited to share movie recommendations. How about you? What's your movie mood today?",
    "🍿 Fantastic! I've been analyzing the latest films and I'm ready to help you find something perfect to watch. What genre speaks to you right now?",
];

const THANKS: &[&str] = &[
    "🎬 You're so welcome! I love talking movies. Got any other questions or need more recommendations?",
    "🍿 Happy to help! That's what I'm here for. Want to explore another genre or need something specific?",
];

const COMEDY: &[&str] = &[
    "😂 Great choice! For comedy gold, I'd suggest: The Grand Budapest Hotel (quirky & stylish), Superbad (raunchy teen comedy), or What We Do in the Shadows (vampire mockumentary). Do you prefer witty dialogue or physical comedy?",
    "🎭 Comedy it is! Try: Knives Out (murder mystery comedy), The Nice Guys (buddy cop comedy), or Hunt for the Wilderpeople (heartwarming adventure). Are you watching alone or with friends?",
    "😄 Love comedies! Consider: Groundhog Day (time loop classic), The Princess Bride (fairy tale parody), or Airplane! (slapstick masterpiece). Want something recent or are classics okay?",
];

const ACTION: &[&str] = &[
    "💥 Action time! Mad Max: Fury Road (non-stop chase), John Wick series (stylish gunplay), or Mission Impossible (death-defying stunts). Do you like realistic action or over-the-top spectacle?",
    "🔥 Adrenaline rush coming up! The Raid (martial arts masterpiece), Atomic Blonde (stylish spy thriller), or Nobody (ordinary guy goes badass). Prefer hand-to-hand combat or big explosions?",
    "⚡ Epic adventures await! Indiana Jones (classic adventure), The Matrix (mind-bending action), or Speed (non-stop thriller). Want something with a great story or pure action?",
];

const HORROR: &[&str] = &[
    "😱 Scary movie night! Get Out (social thriller), Hereditary (family horror), or A Quiet Place (creature feature). How much can you handle - jump scares or psychological terror?",
    "🎃 Horror classics: The Shining (psychological masterpiece), Alien (space horror), or The Thing (paranoid thriller). Do you prefer monsters or human villains?",
    "😰 Psychological thrillers: Shutter Island (mind-bender), Gone Girl (twisted marriage), or Black Swan (ballet nightmare). Want something that messes with your head?",
];

const ROMANCE: &[&str] = &[
    "💕 Romance time! Before Sunrise (philosophical love), La La Land (musical romance), or The Princess Bride (adventure romance). Are you planning a date night or solo viewing?",
    "❤️ Love stories: Eternal Sunshine (sci-fi romance), Her (AI love story), or About Time (time travel romance). Do you like happy endings or bittersweet stories?",
    "🌹 Classic romance: Casablanca (wartime love), Roman Holiday (fairy tale), or When Harry Met Sally (friends to lovers). Want something timeless or modern?",
];

const SCI_FI: &[&str] = &[
    "🚀 Sci-fi masterpieces! Blade Runner 2049 (cyberpunk sequel), Arrival (alien linguistics), or Interstellar (space epic). Do you like hard science or space opera?",
    "👽 Space adventures: Guardians of the Galaxy (fun space romp), Star Wars (classic saga), or The Martian (survival story). Want something serious or more fun?",
    "🤖 Mind-bending sci-fi: Inception (dream heist), Ex Machina (AI thriller), or Minority Report (future crime). Prefer action or philosophical themes?",
];

const DRAMA: &[&str] = &[
    "🎭 Powerful dramas! Parasite (class thriller), Moonlight (coming of age), or Manchester by the Sea (grief story). Ready for something emotionally heavy?",
    "😢 Emotional journeys: The Pursuit of Happyness (inspiring struggle), Room (survival story), or Lion (lost child). Want something uplifting or more intense?",
    "🏆 Award winners: There Will Be Blood (oil baron epic), No Country for Old Men (modern western), or 12 Years a Slave (historical drama). Prefer character studies or epic stories?",
];

const RECOMMEND: &[&str] = &[
    "🎬 I'd love to help! What's your mood right now? Want something to make you laugh, get your heart racing, or maybe something thought-provoking?",
    "🍿 Perfect! Tell me - are you looking for something new or classic? Light entertainment or something more serious?",
    "🎯 Great question! What genre usually catches your interest? Or describe the kind of story you're in the mood for!",
];

const TALENT: &str = "🌟 I love talking about talent! Which actor, actress, or director are you interested in? I can recommend their best work or similar performers you might enjoy!";
const FEELING_DOWN: &str = "🤗 Feeling down? Sometimes a good movie helps! Want something uplifting to cheer you up, or prefer to embrace the mood with a beautiful drama?";
const FEELING_GOOD: &str = "😊 Awesome mood! Perfect time for a feel-good movie. Want something fun and energetic, or maybe a heartwarming story to match your vibe?";
const BORED: &str = "😴 Bored? Movies are the perfect cure! Want something that'll grab you immediately with action, or prefer to get lost in a great story?";
const FOLLOW_UP_FRESH: &str = "🍿 What else can I help you with? Different genre, specific actor, or maybe a movie for a particular mood?";

const FALLBACK: &[&str] = &[
    "🎬 That's interesting! I'm always excited to talk movies. What kind of films do you usually enjoy? Action, comedy, drama, or something else?",
    "🍿 I love chatting about movies! Based on what you're saying, what genre sounds appealing right now?",
    "🎭 Tell me more about what you're looking for! Are you in the mood for something specific, or want me to surprise you with a recommendation?",
];

fn genre_replies(genre: &str) -> &'static [&'static str] {
    match genre {
        "comedy" => COMEDY,
        "action" => ACTION,
        "horror" => HORROR,
        "romance" => ROMANCE,
        "sci-fi" => SCI_FI,
        _ => DRAMA,
    }
}

fn pick<R: Rng + ?Sized>(replies: &[&str], rng: &mut R) -> String {
    replies.choose(rng).copied().unwrap_or_default().to_string()
}

/// Answers one message and advances the conversation context
pub fn reply<R: Rng + ?Sized>(message: &str, context: &mut ChatContext, rng: &mut R) -> String {
    context.turns += 1;
    for preference in extract_preferences(message) {
        if !context.preferences.contains(&preference) {
            context.preferences.push(preference);
        }
    }

    match classify_intent(message) {
        Intent::Greeting => pick(GREETINGS, rng),
        Intent::Identity => IDENTITY.to_string(),
        Intent::HowAreYou => pick(HOW_ARE_YOU, rng),
        Intent::Thanks => pick(THANKS, rng),
        Intent::Genre(genre) => {
            context.last_genre = Some(genre);
            pick(genre_replies(genre), rng)
        }
        Intent::FollowUp => match context.last_genre {
            Some(genre) => format!(
                "🎬 Want more {} or ready to try a different genre? I've got tons more recommendations!",
                genre
            ),
            None => FOLLOW_UP_FRESH.to_string(),
        },
        Intent::Recommend => pick(RECOMMEND, rng),
        Intent::Talent => TALENT.to_string(),
        Intent::FeelingDown => FEELING_DOWN.to_string(),
        Intent::FeelingGood => FEELING_GOOD.to_string(),
        Intent::Bored => BORED.to_string(),
        Intent::Fallback => pick(FALLBACK, rng),
    }
}

struct Conversation {
    context: ChatContext,
    last_seen: Instant,
    // reply counter value at the last touch, orders conversations by recency
    last_reply: u64,
}

#[derive(Default)]
struct Conversations {
    entries: HashMap<Uuid, Conversation>,
    replies: u64,
}

impl Conversations {
    fn sweep(&mut self, now: Instant, idle_ttl: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, c| now.duration_since(c.last_seen) < idle_ttl);
        let swept = before - self.entries.len();
        if swept > 0 {
            tracing::debug!(swept, remaining = self.entries.len(), "Idle conversations swept");
        }
    }

    /// Frees a slot for a new conversation, dropping idle ones first and then
    /// the least recently used
    fn make_room(&mut self, now: Instant, idle_ttl: Duration, capacity: usize) {
        if self.entries.len() < capacity {
            return;
        }
        self.sweep(now, idle_ttl);

        while self.entries.len() >= capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, c)| c.last_reply)
                .map(|(id, _)| *id)
            else {
                break;
            };
            self.entries.remove(&oldest);
            tracing::debug!(conversation_id = %oldest, "Conversation evicted at capacity");
        }
    }
}

/// Per-conversation chat contexts keyed by conversation id
#[derive(Clone)]
pub struct ConversationStore {
    conversations: Arc<Mutex<Conversations>>,
    idle_ttl: Duration,
    capacity: usize,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(CONVERSATION_IDLE_TTL)
    }
}

impl ConversationStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self::with_capacity(idle_ttl, MAX_CONVERSATIONS)
    }

    pub fn with_capacity(idle_ttl: Duration, capacity: usize) -> Self {
        Self {
            conversations: Arc::new(Mutex::new(Conversations::default())),
            idle_ttl,
            capacity: capacity.max(1),
        }
    }

    /// Replies within the given conversation, starting a new one when the id
    /// is missing or has been forgotten. Returns the conversation id used.
    pub async fn respond(&self, conversation_id: Option<Uuid>, message: &str) -> (Uuid, String) {
        let mut conversations = self.conversations.lock().await;
        let now = Instant::now();
        let idle_ttl = self.idle_ttl;

        conversations.replies += 1;
        let reply_no = conversations.replies;
        if reply_no % SWEEP_EVERY == 0 {
            conversations.sweep(now, idle_ttl);
        }

        let id = conversation_id.unwrap_or_else(Uuid::new_v4);
        let idle = conversations
            .entries
            .get(&id)
            .is_some_and(|c| now.duration_since(c.last_seen) >= idle_ttl);
        if idle {
            conversations.entries.remove(&id);
        }
        if !conversations.entries.contains_key(&id) {
            conversations.make_room(now, idle_ttl, self.capacity);
        }

        let conversation = conversations.entries.entry(id).or_insert_with(|| Conversation {
            context: ChatContext::default(),
            last_seen: now,
            last_reply: reply_no,
        });
        conversation.last_seen = now;
        conversation.last_reply = reply_no;

        let response = reply(message, &mut conversation.context, &mut rand::rng());
        tracing::debug!(
            conversation_id = %id,
            turns = conversation.context.turns,
            last_genre = ?conversation.context.last_genre,
            "Chat reply"
        );
        (id, response)
    }

    /// Snapshot of a conversation's context
    pub async fn context(&self, conversation_id: Uuid) -> Option<ChatContext> {
        self.conversations
            .lock()
            .await
            .entries
            .get(&conversation_id)
            .map(|c| c.context.clone())
    }

    pub async fn active_conversations(&self) -> usize {
        self.conversations.lock().await.entries.len()
    }
}
