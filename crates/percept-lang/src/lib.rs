//! percept-lang — linguistic tagging for the percept tools.
//!
//! Language identification, Unicode word segmentation, lexical-class
//! assignment, lemmatization, and name recognition, exposed through a
//! single [`Tagger`] front-end.

pub mod lemma;
pub mod lexicon;
pub mod tagger;

pub use lexicon::{LexicalClass, NameType};
pub use tagger::{Tag, TagOptions, TagScheme, Tagger, TokenType, WordTags};
