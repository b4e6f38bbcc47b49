//! Rule-based English lemmatizer — irregular table plus Porter-style
//! suffix stripping with stem repair.

/// High-frequency irregular forms.
const IRREGULARS: &[(&str, &str)] = &[
    ("is", "be"),
    ("am", "be"),
    ("are", "be"),
    ("was", "be"),
    ("were", "be"),
    ("been", "be"),
    ("being", "be"),
    ("has", "have"),
    ("had", "have"),
    ("does", "do"),
    ("did", "do"),
    ("done", "do"),
    ("goes", "go"),
    ("went", "go"),
    ("gone", "go"),
    ("said", "say"),
    ("made", "make"),
    ("got", "get"),
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("geese", "goose"),
    ("people", "person"),
    ("better", "good"),
    ("best", "good"),
    ("worse", "bad"),
    ("worst", "bad"),
];

/// Lemmatize one lowercase-insensitive English word.
///
/// Unknown or non-alphabetic input comes back unchanged (lowercased when
/// a rule applied, original otherwise).
pub fn lemmatize(word: &str) -> String {
    let lower = word.to_lowercase();

    if let Some((_, lemma)) = IRREGULARS.iter().find(|(form, _)| *form == lower) {
        return (*lemma).to_string();
    }

    if !lower.chars().all(|c| c.is_ascii_alphabetic()) {
        return word.to_string();
    }

    // Plural nouns / third-person verbs.
    if lower.len() > 4 && lower.ends_with("ies") {
        return format!("{}y", &lower[..lower.len() - 3]);
    }
    if lower.len() > 3
        && (lower.ends_with("ses")
            || lower.ends_with("xes")
            || lower.ends_with("zes")
            || lower.ends_with("ches")
            || lower.ends_with("shes"))
    {
        return lower[..lower.len() - 2].to_string();
    }
    if lower.len() > 3 && lower.ends_with('s') && !lower.ends_with("ss") && !lower.ends_with("us")
    {
        return lower[..lower.len() - 1].to_string();
    }

    // Past tense / gerund with stem repair.
    if lower.len() > 4 && lower.ends_with("ied") {
        return format!("{}y", &lower[..lower.len() - 3]);
    }
    if lower.len() > 3 && lower.ends_with("ed") {
        return repair_stem(&lower[..lower.len() - 2]);
    }
    if lower.len() > 4 && lower.ends_with("ing") {
        return repair_stem(&lower[..lower.len() - 3]);
    }

    word.to_string()
}

/// Repair a stem after stripping "-ed"/"-ing": undo consonant doubling
/// (stopp → stop) and restore a dropped final "e" on short CVC stems
/// (lov → love).
fn repair_stem(stem: &str) -> String {
    let bytes = stem.as_bytes();
    let n = bytes.len();

    if n >= 2
        && bytes[n - 1] == bytes[n - 2]
        && !is_vowel(bytes[n - 1])
        && !matches!(bytes[n - 1], b'l' | b's' | b'z')
    {
        return stem[..n - 1].to_string();
    }

    if ends_cvc(stem) {
        return format!("{stem}e");
    }

    stem.to_string()
}

fn is_vowel(b: u8) -> bool {
    matches!(b, b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Consonant-vowel-consonant ending where the final consonant is not
/// w, x, or y — the shape where English dropped a silent "e".
fn ends_cvc(stem: &str) -> bool {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n < 3 {
        return false;
    }
    !is_vowel(bytes[n - 3])
        && is_vowel(bytes[n - 2])
        && !is_vowel(bytes[n - 1])
        && !matches!(bytes[n - 1], b'w' | b'x' | b'y')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_irregulars() {
        assert_eq!(lemmatize("is"), "be");
        assert_eq!(lemmatize("went"), "go");
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("Was"), "be");
    }

    #[test]
    fn test_plurals() {
        assert_eq!(lemmatize("cities"), "city");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("watches"), "watch");
        assert_eq!(lemmatize("names"), "name");
    }

    #[test]
    fn test_plural_exceptions_untouched() {
        assert_eq!(lemmatize("glass"), "glass");
        assert_eq!(lemmatize("status"), "status");
    }

    #[test]
    fn test_past_tense() {
        assert_eq!(lemmatize("walked"), "walk");
        assert_eq!(lemmatize("loved"), "love");
        assert_eq!(lemmatize("stopped"), "stop");
        assert_eq!(lemmatize("tried"), "try");
    }

    #[test]
    fn test_gerund() {
        assert_eq!(lemmatize("walking"), "walk");
        assert_eq!(lemmatize("running"), "run");
        assert_eq!(lemmatize("loving"), "love");
    }

    #[test]
    fn test_unchanged_words() {
        assert_eq!(lemmatize("name"), "name");
        assert_eq!(lemmatize("roni"), "roni");
        assert_eq!(lemmatize("42"), "42");
    }
}
