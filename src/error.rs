use std::fmt::{Display, Formatter};

/// An error returned when a chord string cannot be parsed as RTFCRE or s-keys notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidKeys {
    pub input: String,
    pub message: String,
}

impl InvalidKeys {
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

impl Display for InvalidKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "InvalidKeys: {} ({:?})", self.message, self.input)
    }
}

impl std::error::Error for InvalidKeys {}

/// Errors raised while resolving a raw rule dictionary into a flat rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// A pattern referenced a rule name absent from the source dictionary.
    UnknownReference { name: String, parent: String },
    /// A rule transitively requires itself.
    CircularReference { name: String },
    /// A `keys` field failed to parse as RTFCRE notation.
    InvalidKeys(InvalidKeys),
}

impl Display for LibraryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::UnknownReference { name, parent } => {
                write!(f, "UnknownReference: {:?} referenced from {:?}", name, parent)
            }
            LibraryError::CircularReference { name } => {
                write!(f, "CircularReference: {:?} requires itself", name)
            }
            LibraryError::InvalidKeys(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<InvalidKeys> for LibraryError {
    fn from(err: InvalidKeys) -> Self {
        LibraryError::InvalidKeys(err)
    }
}

/// A mutation was attempted on a `RuleMap` that has already been frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapFrozen;

impl Display for MapFrozen {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "MapFrozen: rulemap is read-only after freeze()")
    }
}

impl std::error::Error for MapFrozen {}

/// `find_best_translation` was called with no candidate translations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyTranslationSet;

impl Display for EmptyTranslationSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "EmptyTranslationSet: no candidate translations given")
    }
}

impl std::error::Error for EmptyTranslationSet {}
