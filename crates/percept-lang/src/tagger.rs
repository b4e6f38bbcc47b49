//! Word-unit tagging over raw text.
//!
//! A [`Tagger`] produces a lazy, finite, non-restartable sequence of
//! `(Tag, byte range)` pairs for a requested scheme. Word boundaries
//! come from Unicode segmentation; the language scheme reports one tag
//! spanning the whole text.

use crate::lemma;
use crate::lexicon::{self, LexicalClass, NameType};
use std::ops::Range;
use unicode_segmentation::{UWordBoundIndices, UnicodeSegmentation};

/// Which tag scheme to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagScheme {
    /// Dominant language of the whole text.
    Language,
    /// Word / punctuation / whitespace classification per unit.
    TokenType,
    /// Part of speech per word unit.
    LexicalClass,
    /// Dictionary form per word unit.
    Lemma,
    /// Name category where one applies, lexical class otherwise.
    NameTypeOrLexicalClass,
}

/// Enumeration options, mirrored from the tagging contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagOptions {
    pub omit_punctuation: bool,
    pub omit_whitespace: bool,
    /// Merge adjacent name words ("New York") into one tagged range.
    pub join_names: bool,
}

/// Unit classification for the token-type scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Word,
    Punctuation,
    Whitespace,
    Other,
}

/// A produced tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    /// ISO 639-3 language code (e.g., "eng", "cmn").
    Language(String),
    TokenType(TokenType),
    LexicalClass(LexicalClass),
    Lemma(String),
    Name(NameType),
}

/// Stateless tagging front-end.
#[derive(Default)]
pub struct Tagger;

impl Tagger {
    pub fn new() -> Self {
        Self
    }

    /// Tag `text` under `scheme`. The returned iterator is lazy and can
    /// only be consumed once.
    pub fn tags<'a>(&self, text: &'a str, scheme: TagScheme, options: TagOptions) -> WordTags<'a> {
        WordTags {
            text,
            scheme,
            options,
            units: text.split_word_bound_indices(),
            language_emitted: false,
            prev_class: None,
            sentence_start: true,
        }
    }
}

/// Lazy `(Tag, byte range)` iterator over word units.
pub struct WordTags<'a> {
    text: &'a str,
    scheme: TagScheme,
    options: TagOptions,
    units: UWordBoundIndices<'a>,
    language_emitted: bool,
    prev_class: Option<LexicalClass>,
    sentence_start: bool,
}

impl Iterator for WordTags<'_> {
    type Item = (Tag, Range<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.scheme == TagScheme::Language {
            if self.language_emitted || self.text.is_empty() {
                return None;
            }
            self.language_emitted = true;
            let Some(info) = whatlang::detect(self.text) else {
                tracing::debug!(len = self.text.len(), "language detection inconclusive");
                return None;
            };
            return Some((
                Tag::Language(info.lang().code().to_string()),
                0..self.text.len(),
            ));
        }

        loop {
            let (start, unit) = self.units.next()?;
            let range = start..start + unit.len();
            let token_type = classify_unit(unit);

            match token_type {
                TokenType::Whitespace => {
                    if self.options.omit_whitespace {
                        continue;
                    }
                }
                TokenType::Punctuation => {
                    if unit.contains(['.', '!', '?']) {
                        self.sentence_start = true;
                    }
                    if self.options.omit_punctuation {
                        continue;
                    }
                }
                _ => {}
            }

            return Some(match self.scheme {
                TagScheme::Language => unreachable!("handled above"),
                TagScheme::TokenType => (Tag::TokenType(token_type), range),
                TagScheme::LexicalClass => {
                    if token_type != TokenType::Word {
                        (Tag::LexicalClass(LexicalClass::Other), range)
                    } else {
                        let class = lexicon::lexical_class(unit, self.prev_class);
                        self.prev_class = Some(class);
                        self.sentence_start = false;
                        (Tag::LexicalClass(class), range)
                    }
                }
                TagScheme::Lemma => {
                    if token_type == TokenType::Word {
                        self.sentence_start = false;
                        (Tag::Lemma(lemma::lemmatize(unit)), range)
                    } else {
                        (Tag::Lemma(unit.to_string()), range)
                    }
                }
                TagScheme::NameTypeOrLexicalClass => {
                    if token_type != TokenType::Word {
                        (Tag::LexicalClass(LexicalClass::Other), range)
                    } else {
                        let was_sentence_start = self.sentence_start;
                        self.sentence_start = false;
                        match lexicon::name_type(unit, was_sentence_start) {
                            Some(name) if self.options.join_names => {
                                let (name, range) = self.join_name_run(name, range);
                                (Tag::Name(name), range)
                            }
                            Some(name) => (Tag::Name(name), range),
                            None => {
                                let class = lexicon::lexical_class(unit, self.prev_class);
                                self.prev_class = Some(class);
                                (Tag::LexicalClass(class), range)
                            }
                        }
                    }
                }
            });
        }
    }
}

impl WordTags<'_> {
    /// Extend a name over adjacent capitalized words separated only by
    /// whitespace, upgrading the category when a later word matches a
    /// gazetteer ("New York" → place).
    fn join_name_run(&mut self, first: NameType, range: Range<usize>) -> (NameType, Range<usize>) {
        let mut name = first;
        let mut end = range.end;

        loop {
            let mut ahead = self.units.clone();
            let Some((_, sep)) = ahead.next() else { break };
            if classify_unit(sep) != TokenType::Whitespace {
                break;
            }
            let Some((next_start, next_unit)) = ahead.next() else { break };
            let Some(next_name) = lexicon::name_type(next_unit, false) else {
                break;
            };

            self.units = ahead;
            end = next_start + next_unit.len();
            name = prefer_name(name, next_name);
        }

        (name, range.start..end)
    }
}

/// Gazetteer-backed categories outrank the capitalization default.
fn prefer_name(a: NameType, b: NameType) -> NameType {
    match (a, b) {
        (NameType::Personal, other) => other,
        (kept, _) => kept,
    }
}

fn classify_unit(unit: &str) -> TokenType {
    if unit.chars().all(char::is_whitespace) {
        TokenType::Whitespace
    } else if unit.chars().any(char::is_alphanumeric) {
        TokenType::Word
    } else if unit.chars().all(|c| !c.is_whitespace() && !c.is_alphanumeric()) {
        TokenType::Punctuation
    } else {
        TokenType::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OMIT_BOTH: TagOptions = TagOptions {
        omit_punctuation: true,
        omit_whitespace: true,
        join_names: false,
    };

    fn surfaces<'a>(text: &'a str, tags: &[(Tag, Range<usize>)]) -> Vec<&'a str> {
        tags.iter().map(|(_, r)| &text[r.clone()]).collect()
    }

    #[test]
    fn test_tokenization_with_omit_options() {
        let text = "My name is roni.";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::TokenType, OMIT_BOTH)
            .collect();
        assert_eq!(surfaces(text, &tags), vec!["My", "name", "is", "roni"]);
        assert!(tags
            .iter()
            .all(|(t, _)| *t == Tag::TokenType(TokenType::Word)));
    }

    #[test]
    fn test_tokenization_without_omit_includes_punctuation() {
        let text = "Hi!";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::TokenType, TagOptions::default())
            .collect();
        assert_eq!(surfaces(text, &tags), vec!["Hi", "!"]);
        assert_eq!(tags[1].0, Tag::TokenType(TokenType::Punctuation));
    }

    #[test]
    fn test_lexical_classes() {
        let text = "My name is roni.";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::LexicalClass, OMIT_BOTH)
            .collect();
        let classes: Vec<_> = tags
            .iter()
            .map(|(t, _)| match t {
                Tag::LexicalClass(c) => *c,
                other => panic!("unexpected tag {other:?}"),
            })
            .collect();
        assert_eq!(
            classes,
            vec![
                LexicalClass::Determiner,
                LexicalClass::Noun,
                LexicalClass::Verb,
                LexicalClass::Noun,
            ]
        );
    }

    #[test]
    fn test_lemmas() {
        let text = "My name is roni.";
        let tags: Vec<_> = Tagger::new().tags(text, TagScheme::Lemma, OMIT_BOTH).collect();
        assert_eq!(tags[2].0, Tag::Lemma("be".into()));
        assert_eq!(tags[1].0, Tag::Lemma("name".into()));
    }

    #[test]
    fn test_language_detection_single_tag() {
        let text = "Machine learning is a wonderful thing.";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::Language, TagOptions::default())
            .collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].1, 0..text.len());
        assert_eq!(tags[0].0, Tag::Language("eng".into()));
    }

    #[test]
    fn test_language_empty_text() {
        let tags: Vec<_> = Tagger::new()
            .tags("", TagScheme::Language, TagOptions::default())
            .collect();
        assert!(tags.is_empty());
    }

    #[test]
    fn test_place_name_sentence_initial() {
        let text = "China is number one.";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::NameTypeOrLexicalClass, OMIT_BOTH)
            .collect();
        assert_eq!(tags[0].0, Tag::Name(NameType::Place));
        assert_eq!(&text[tags[0].1.clone()], "China");
    }

    #[test]
    fn test_personal_name_mid_sentence() {
        let text = "My name is Roni.";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::NameTypeOrLexicalClass, OMIT_BOTH)
            .collect();
        assert_eq!(tags[3].0, Tag::Name(NameType::Personal));
    }

    #[test]
    fn test_join_names_merges_adjacent_words() {
        let text = "I love New York a lot.";
        let options = TagOptions {
            join_names: true,
            ..OMIT_BOTH
        };
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::NameTypeOrLexicalClass, options)
            .collect();

        let (tag, range) = tags
            .iter()
            .find(|(t, _)| matches!(t, Tag::Name(_)))
            .expect("expected a name tag");
        assert_eq!(&text[range.clone()], "New York");
        // "York" is in the place gazetteer, which upgrades the run.
        assert_eq!(*tag, Tag::Name(NameType::Place));
        // The words after the name are tagged normally.
        assert_eq!(surfaces(text, &tags).last(), Some(&"lot"));
    }

    #[test]
    fn test_sentence_boundary_resets_name_heuristic() {
        // "Stop. Running is fun." — "Running" opens a sentence, so it is
        // not a personal name.
        let text = "Stop. Running is fun.";
        let tags: Vec<_> = Tagger::new()
            .tags(text, TagScheme::NameTypeOrLexicalClass, OMIT_BOTH)
            .collect();
        assert_eq!(tags[1].0, Tag::LexicalClass(LexicalClass::Verb));
    }

    #[test]
    fn test_iterator_is_lazy_and_finite() {
        let text = "one two three";
        let mut tags = Tagger::new().tags(text, TagScheme::TokenType, OMIT_BOTH);
        assert!(tags.next().is_some());
        let remaining: Vec<_> = tags.collect();
        assert_eq!(remaining.len(), 2);
    }
}
