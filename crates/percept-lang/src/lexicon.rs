//! Lexical-class assignment — closed-class word lists plus suffix
//! heuristics, with light positional disambiguation.

/// Part-of-speech classes for word units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalClass {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Pronoun,
    Determiner,
    Preposition,
    Conjunction,
    Number,
    Interjection,
    Other,
}

/// Name/entity categories for the name-or-lexical-class scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameType {
    Personal,
    Place,
    Organization,
}

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our",
    "their", "some", "any", "no", "every", "each",
];

const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "us", "them", "mine", "yours",
    "hers", "ours", "theirs", "myself", "yourself", "himself", "herself", "itself",
];

const PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "to", "from", "up", "down", "of", "off",
    "over", "under",
];

const CONJUNCTIONS: &[&str] = &["and", "but", "or", "nor", "so", "yet", "because", "although", "while", "if"];

/// Auxiliaries and other high-frequency verb forms.
const VERBS: &[&str] = &[
    "is", "am", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does",
    "did", "will", "would", "shall", "should", "can", "could", "may", "might", "must", "go",
    "goes", "went", "say", "says", "said", "get", "got", "make", "made", "know", "think", "see",
];

const INTERJECTIONS: &[&str] = &["oh", "ah", "wow", "hey", "ouch", "hmm", "yes", "no"];

/// Small gazetteer of place names for the name scheme.
const PLACES: &[&str] = &[
    "china", "america", "england", "france", "germany", "japan", "india", "russia", "brazil",
    "canada", "australia", "london", "paris", "tokyo", "beijing", "berlin", "moscow",
    "york", "africa", "europe", "asia",
];

/// Small gazetteer of organization names for the name scheme.
const ORGANIZATIONS: &[&str] = &[
    "google", "apple", "microsoft", "amazon", "nasa", "unesco", "unicef", "interpol", "fifa",
    "ibm", "intel", "sony", "toyota",
];

/// Classify one word unit.
///
/// `previous` is the class of the preceding word unit (punctuation and
/// whitespace excluded); it breaks the noun/verb default after a pronoun
/// or pronoun-like subject.
pub fn lexical_class(token: &str, previous: Option<LexicalClass>) -> LexicalClass {
    let lower = token.to_lowercase();
    let lower = lower.as_str();

    if token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return LexicalClass::Number;
    }
    if DETERMINERS.contains(&lower) {
        return LexicalClass::Determiner;
    }
    if PRONOUNS.contains(&lower) {
        return LexicalClass::Pronoun;
    }
    if PREPOSITIONS.contains(&lower) {
        return LexicalClass::Preposition;
    }
    if CONJUNCTIONS.contains(&lower) {
        return LexicalClass::Conjunction;
    }
    if VERBS.contains(&lower) {
        return LexicalClass::Verb;
    }
    if INTERJECTIONS.contains(&lower) {
        return LexicalClass::Interjection;
    }

    // Suffix heuristics for open classes.
    if lower.len() > 3 && lower.ends_with("ly") {
        return LexicalClass::Adverb;
    }
    if lower.len() > 4
        && (lower.ends_with("ous")
            || lower.ends_with("ful")
            || lower.ends_with("ive")
            || lower.ends_with("able")
            || lower.ends_with("ible"))
    {
        return LexicalClass::Adjective;
    }
    if lower.len() > 4 && (lower.ends_with("ing") || lower.ends_with("ed")) {
        return LexicalClass::Verb;
    }

    // A word right after a subject pronoun usually predicates.
    if previous == Some(LexicalClass::Pronoun) {
        return LexicalClass::Verb;
    }

    LexicalClass::Noun
}

/// Name category for a capitalized word, if any.
///
/// Gazetteer hits win regardless of position; otherwise a capitalized
/// word that does not open a sentence is read as a personal name.
pub fn name_type(token: &str, sentence_initial: bool) -> Option<NameType> {
    let mut chars = token.chars();
    let first_upper = chars.next().is_some_and(|c| c.is_uppercase());
    if !first_upper {
        return None;
    }

    let lower = token.to_lowercase();
    if PLACES.contains(&lower.as_str()) {
        return Some(NameType::Place);
    }
    if ORGANIZATIONS.contains(&lower.as_str()) {
        return Some(NameType::Organization);
    }
    if !sentence_initial {
        return Some(NameType::Personal);
    }
    None
}
