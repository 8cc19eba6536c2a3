//! Spectra's analyzer core: converts steno chord notation and a
//! bracket-referenced rule dictionary into resolved `StenoRule` trees, finds
//! the best chord/word decomposition via an exhaustive tiered-matcher
//! search, and lays a resolved tree out onto a 2D character grid for
//! interactive highlighting.
//!
//! The crate is a pure library: no I/O, no session state, no network, no
//! GUI. Everything here is a synchronous function over its arguments (see
//! `lexer`/`graph` module docs for the one piece of shared immutable state,
//! the lexer's rare-rule set).
//!
//! Components, leaves first: [`keys`] (chord notation codec), [`rule`]
//! (immutable rule/rulemap types), [`library`] (raw-dictionary resolution),
//! [`trie`] and [`matcher`] (the four rule matchers), [`lexer`] (the search
//! and its three public operations), [`graph`] (tree-to-grid layout).

pub mod error;
pub mod graph;
pub mod keys;
pub mod lexer;
pub mod library;
pub mod matcher;
pub mod rule;
pub mod trie;

pub use error::{EmptyTranslationSet, InvalidKeys, LibraryError, MapFrozen};
pub use graph::{Canvas, GraphNode, GraphTree, GridElement};
pub use keys::{from_rtfcre, to_rtfcre, STROKE_SEP};
pub use lexer::{Lexer, LexerBuilder, LexerResult, Trace};
pub use library::{from_raw, to_raw, RawRule};
pub use rule::{RuleFlag, RuleMap, RuleMapBuilder, RuleMapItem, RuleMapRead, RuleMapWrite, RuleTreeView, StenoRule};
