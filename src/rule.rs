//! The immutable rule value type and its rulemap, with a builder/frozen split
//! so that parsing and lexing can assemble a rulemap incrementally while
//! every other holder only ever sees the read-only form.

use crate::error::MapFrozen;
use std::borrow::Cow;
use std::collections::HashMap;
use std::collections::HashSet;

/// A flag drawn from the rule vocabulary. The four named flags carry lexer
/// and library semantics; anything else is a "key flag" — a display hint
/// that becomes a zero-length special rulemap entry (see `library.rs`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleFlag {
    /// Only matches as a whole stroke (`StrokeMatcher`).
    Strk,
    /// Only matches as a whole word (`WordMatcher`).
    Word,
    /// Only ever produced directly by name, never discovered structurally.
    Spec,
    /// Hurts ranking when used; see the lexer's rare-rule tiebreak.
    Rare,
    /// Any other flag name, carried through for display purposes.
    Key(String),
}

impl RuleFlag {
    pub fn parse(name: &str) -> RuleFlag {
        match name {
            "STRK" => RuleFlag::Strk,
            "WORD" => RuleFlag::Word,
            "SPEC" => RuleFlag::Spec,
            "RARE" => RuleFlag::Rare,
            other => RuleFlag::Key(other.to_string()),
        }
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        match self {
            RuleFlag::Strk => Cow::Borrowed("STRK"),
            RuleFlag::Word => Cow::Borrowed("WORD"),
            RuleFlag::Spec => Cow::Borrowed("SPEC"),
            RuleFlag::Rare => Cow::Borrowed("RARE"),
            RuleFlag::Key(name) => Cow::Borrowed(name.as_str()),
        }
    }
}

/// One entry of a rulemap: a reference to a child rule by its stable id,
/// plus the `[start, start+length)` span of the parent's `letters` it
/// accounts for. `length == 0` marks a "special" zero-length marker (a key
/// flag, or a matcher's end-of-stroke condition), which may share its
/// coordinates with an ordinary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMapItem {
    pub rule_id: String,
    pub start: usize,
    pub length: usize,
}

impl RuleMapItem {
    pub fn is_special(&self) -> bool {
        self.length == 0
    }
}

/// Read-only access shared by both the builder and the frozen rulemap.
pub trait RuleMapRead {
    fn items(&self) -> &[RuleMapItem];

    fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn total_length(&self) -> usize {
        self.items().iter().map(|item| item.length).sum()
    }
}

/// Mutation surface. The builder always succeeds; the frozen `RuleMap`
/// always fails with `MapFrozen` — one trait, two behaviors, matching the
/// "two concrete variants sharing a read view" split.
pub trait RuleMapWrite: RuleMapRead {
    fn add(&mut self, rule_id: impl Into<String>, start: usize, length: usize) -> Result<(), MapFrozen>;

    fn add_special(&mut self, rule_id: impl Into<String>, start: usize) -> Result<(), MapFrozen> {
        self.add(rule_id, start, 0)
    }
}

/// The mutable rulemap under construction during parsing or lexing.
#[derive(Debug, Clone, Default)]
pub struct RuleMapBuilder {
    items: Vec<RuleMapItem>,
}

impl RuleMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the builder, producing the frozen read-only form.
    pub fn freeze(self) -> RuleMap {
        RuleMap { items: self.items }
    }
}

impl RuleMapRead for RuleMapBuilder {
    fn items(&self) -> &[RuleMapItem] {
        &self.items
    }
}

impl RuleMapWrite for RuleMapBuilder {
    fn add(&mut self, rule_id: impl Into<String>, start: usize, length: usize) -> Result<(), MapFrozen> {
        self.items.push(RuleMapItem { rule_id: rule_id.into(), start, length });
        Ok(())
    }
}

/// The frozen, read-only rulemap held by every `StenoRule`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleMap {
    items: Vec<RuleMapItem>,
}

impl RuleMap {
    pub fn empty() -> Self {
        Self::default()
    }
}

impl RuleMapRead for RuleMap {
    fn items(&self) -> &[RuleMapItem] {
        &self.items
    }
}

impl RuleMapWrite for RuleMap {
    fn add(&mut self, _rule_id: impl Into<String>, _start: usize, _length: usize) -> Result<(), MapFrozen> {
        Err(MapFrozen)
    }
}

/// An immutable, fully resolved steno rule: a chord fragment paired with the
/// letters it spells, optionally decomposed into child rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StenoRule {
    pub id: String,
    pub keys: String,
    pub letters: String,
    pub flags: HashSet<RuleFlag>,
    pub description: String,
    pub rulemap: RuleMap,
}

impl StenoRule {
    pub fn new(
        id: impl Into<String>,
        keys: impl Into<String>,
        letters: impl Into<String>,
        flags: HashSet<RuleFlag>,
        description: impl Into<String>,
        rulemap: RuleMap,
    ) -> Self {
        Self {
            id: id.into(),
            keys: keys.into(),
            letters: letters.into(),
            flags,
            description: description.into(),
            rulemap,
        }
    }

    pub fn has_flag(&self, flag: &RuleFlag) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_rare(&self) -> bool {
        self.has_flag(&RuleFlag::Rare)
    }

    /// `true` for rules with no structural decomposition: the leaves of a
    /// resolved rule tree.
    pub fn is_leaf(&self) -> bool {
        self.rulemap.items().iter().all(|item| item.is_special())
    }
}

/// A borrowed view over a `StenoRule` and the library it came from, so the
/// rulemap's id references can be resolved into actual children for
/// `ptree`-based debug printing. `StenoRule` itself stores only ids, not
/// owned children, so this view — not `StenoRule` directly — implements
/// `TreeItem`.
#[derive(Clone, Copy)]
pub struct RuleTreeView<'a> {
    pub rule: &'a StenoRule,
    pub library: &'a HashMap<String, StenoRule>,
}

impl<'a> RuleTreeView<'a> {
    pub fn new(rule: &'a StenoRule, library: &'a HashMap<String, StenoRule>) -> Self {
        Self { rule, library }
    }
}

impl<'a> ptree::TreeItem for RuleTreeView<'a> {
    type Child = RuleTreeView<'a>;

    fn write_self<W: std::io::Write>(&self, f: &mut W, _style: &ptree::Style) -> std::io::Result<()> {
        write!(f, "{} [{}] {:?}", self.rule.id, self.rule.keys, self.rule.letters)
    }

    fn children(&self) -> Cow<[Self::Child]> {
        let children: Vec<RuleTreeView<'a>> = self
            .rule
            .rulemap
            .items()
            .iter()
            .filter(|item| !item.is_special())
            .filter_map(|item| self.library.get(&item.rule_id))
            .map(|child| RuleTreeView::new(child, self.library))
            .collect();
        Cow::from(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accepts_then_freeze_rejects() {
        let mut builder = RuleMapBuilder::new();
        builder.add("child", 0, 3).unwrap();
        assert_eq!(builder.total_length(), 3);

        let mut frozen = builder.freeze();
        assert_eq!(frozen.total_length(), 3);
        assert_eq!(frozen.add("other", 3, 1), Err(MapFrozen));
        assert_eq!(frozen.total_length(), 3);
    }

    #[test]
    fn special_items_are_zero_length() {
        let mut builder = RuleMapBuilder::new();
        builder.add_special("~RARE", 4).unwrap();
        assert!(builder.items()[0].is_special());
    }

    #[test]
    fn leaf_detection_ignores_special_markers() {
        let mut builder = RuleMapBuilder::new();
        builder.add_special("~RARE", 1).unwrap();
        let rule = StenoRule::new("R", "H", "h", HashSet::new(), "", builder.freeze());
        assert!(rule.is_leaf());
    }

    #[test]
    fn flag_parse_round_trips_named_flags() {
        assert_eq!(RuleFlag::parse("RARE"), RuleFlag::Rare);
        assert_eq!(RuleFlag::parse("RARE").as_str(), "RARE");
        assert_eq!(RuleFlag::parse("abbr"), RuleFlag::Key("abbr".to_string()));
    }
}
