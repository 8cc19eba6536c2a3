//! The lexer: an exhaustive state-queue search over the rule matchers, a
//! four-criterion ranking fold to pick the best decomposition, and the
//! three public operations built on top of it.

use crate::error::EmptyTranslationSet;
use crate::matcher::{Matcher, PrefixMatcherBuilder, RuleMatcher, SpecialMatcher, StrokeMatcher, WordMatcher};
use crate::rule::{RuleFlag, RuleMapItem};
use std::collections::{HashMap, HashSet};

/// Gates diagnostic `eprintln!` tracing of the state-queue search and the
/// ranking fold. Always `None` by default and compiled away entirely in
/// release builds; nothing above `None` ever executes outside
/// `cfg(debug_assertions)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Trace {
    None,
    Basic,
    Verbose,
}

impl Trace {
    fn order(&self) -> u8 {
        match self {
            Trace::None => 0,
            Trace::Basic => 1,
            Trace::Verbose => 2,
        }
    }

    fn enabled(&self, threshold: Trace) -> bool {
        self.order() >= threshold.order()
    }
}

/// One state in the lexer's search: the keys not yet matched, plus the
/// rulemap entries chosen so far. A flat struct stand-in for the source's
/// flat `[unmatched_skeys, name1, start1, len1, ...]` list.
#[derive(Debug, Clone)]
struct LexState {
    unmatched_skeys: String,
    items: Vec<RuleMapItem>,
}

impl LexState {
    fn total_length(&self) -> usize {
        self.items.iter().map(|item| item.length).sum()
    }

    fn rare_count(&self, rare: &HashSet<String>) -> usize {
        self.items.iter().filter(|item| rare.contains(&item.rule_id)).count()
    }
}

/// The outcome of a `query`: the rules chosen, in order, plus whatever keys
/// were left unmatched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexerResult {
    pub unmatched_skeys: String,
    pub items: Vec<RuleMapItem>,
}

impl LexerResult {
    pub fn caption(&self) -> &'static str {
        if self.unmatched_skeys.is_empty() {
            "Found complete match."
        } else if !self.items.is_empty() {
            "Incomplete match. Not reliable."
        } else {
            "No matches found."
        }
    }
}

/// Builds the four matchers by dispatching each rule on its flags, then
/// freezes them into an immutable `Lexer`.
pub struct LexerBuilder {
    prefix: PrefixMatcherBuilder,
    stroke: StrokeMatcher,
    word: WordMatcher,
    special: SpecialMatcher,
    rare_rules: HashSet<String>,
}

impl LexerBuilder {
    pub fn new(unordered_keys: impl IntoIterator<Item = char>) -> Self {
        let mut special = SpecialMatcher::new();
        special.add("separator");
        Self {
            prefix: PrefixMatcherBuilder::new(unordered_keys),
            stroke: StrokeMatcher::new(),
            word: WordMatcher::new(),
            special,
            rare_rules: HashSet::new(),
        }
    }

    /// Add one rule to the matcher selected by its flags: `SPEC` rules are
    /// reference-only and skip the matchers entirely, `STRK` goes to the
    /// stroke matcher, `WORD` to the word matcher, and everything else goes
    /// to the prefix matcher (tracked as rare if flagged `RARE`).
    pub fn add_rule(&mut self, name: &str, skeys: &str, letters: &str, flags: &HashSet<RuleFlag>) {
        if flags.contains(&RuleFlag::Spec) {
            return;
        }
        if flags.contains(&RuleFlag::Strk) {
            self.stroke.add(name, skeys, letters);
        } else if flags.contains(&RuleFlag::Word) {
            self.word.add(name, skeys, letters);
        } else {
            if flags.contains(&RuleFlag::Rare) {
                self.rare_rules.insert(name.to_string());
            }
            self.prefix.add(name, skeys, letters);
        }
    }

    pub fn build(self, trace: Trace) -> Lexer {
        Lexer {
            matchers: vec![
                Matcher::Prefix(self.prefix.build()),
                Matcher::Stroke(self.stroke),
                Matcher::Word(self.word),
                Matcher::Special(self.special),
            ],
            rare_set: self.rare_rules,
            trace,
        }
    }
}

/// The frozen lexer: an ordered list of matchers plus the set of rule names
/// considered "rare" for ranking purposes.
pub struct Lexer {
    matchers: Vec<Matcher>,
    rare_set: HashSet<String>,
    trace: Trace,
}

impl Lexer {
    /// Search for the best decomposition of `skeys` into `letters`. When
    /// `match_all_keys` is set and the winner still has leftover keys, an
    /// empty-rules result is returned instead.
    pub fn query(&self, skeys: &str, letters: &str, match_all_keys: bool) -> LexerResult {
        let winner = self.process(skeys, letters);
        if match_all_keys && !winner.unmatched_skeys.is_empty() {
            return LexerResult { unmatched_skeys: winner.unmatched_skeys, items: Vec::new() };
        }
        LexerResult { unmatched_skeys: winner.unmatched_skeys, items: winner.items }
    }

    /// Pick the index of the most accurate translation among candidates.
    /// Unmatched keys are equalized to at most one character before
    /// comparing, so the length bias of criterion 1 doesn't dominate when
    /// nothing fully matches.
    ///
    /// Ties go to the *first* equally-good candidate, not `best_index`'s own
    /// winner: candidates here are independent translations the caller is
    /// choosing between, not states discovered mid-search, so there's no
    /// reason to prefer a later one. `best_index` still finds a winner (any
    /// one of the tied states will do to compare everything else against),
    /// then this scans forward for the first state tied with it.
    pub fn find_best_translation(&self, translations: &[(String, String)]) -> Result<usize, EmptyTranslationSet> {
        if translations.is_empty() {
            return Err(EmptyTranslationSet);
        }
        let equalized: Vec<LexState> = translations
            .iter()
            .map(|(skeys, word)| {
                let mut state = self.process(skeys, word);
                if !state.unmatched_skeys.is_empty() {
                    let cut = state
                        .unmatched_skeys
                        .char_indices()
                        .nth(1)
                        .map(|(idx, _)| idx)
                        .unwrap_or(state.unmatched_skeys.len());
                    state.unmatched_skeys.truncate(cut);
                }
                state
            })
            .collect();
        let winner = self.best_index(&equalized);
        Ok((0..equalized.len())
            .find(|&i| self.compare(&equalized[i], &equalized[winner]) == 0)
            .unwrap_or(winner))
    }

    /// Run every translation through the lexer, keep only the ones whose
    /// rulemap has more than one entry, and group rule usages by rule id.
    /// `size`, when `Some` and less than 20, drops translations where
    /// either side is longer than `size` before querying at all.
    pub fn compile_index(
        &self,
        translations: &[(String, String)],
        size: Option<usize>,
    ) -> HashMap<String, HashMap<String, String>> {
        let mut index: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (skeys, letters) in translations {
            if let Some(max_len) = size {
                if max_len < 20 && skeys.chars().count().max(letters.chars().count()) > max_len {
                    continue;
                }
            }
            let result = self.query(skeys, letters, false);
            if result.items.len() <= 1 {
                continue;
            }
            for item in &result.items {
                index.entry(item.rule_id.clone()).or_default().insert(skeys.clone(), letters.clone());
            }
        }
        index
    }

    fn process(&self, skeys: &str, letters: &str) -> LexState {
        let mut queue = vec![LexState { unmatched_skeys: skeys.to_string(), items: Vec::new() }];
        let mut i = 0;
        while i < queue.len() {
            if !queue[i].unmatched_skeys.is_empty() {
                let wordptr = queue[i].items.last().map(|item| item.start + item.length).unwrap_or(0);
                let letters_left = &letters[wordptr.min(letters.len())..];
                let remaining_skeys = queue[i].unmatched_skeys.clone();
                let base_items = queue[i].items.clone();
                for matcher in &self.matchers {
                    for candidate in matcher.matches(&remaining_skeys, letters_left, skeys, letters) {
                        let mut items = base_items.clone();
                        items.push(RuleMapItem {
                            rule_id: candidate.rule_id,
                            start: candidate.rule_start + wordptr,
                            length: candidate.rule_length,
                        });
                        queue.push(LexState { unmatched_skeys: candidate.leftover_skeys, items });
                    }
                }
            }
            i += 1;
        }
        #[cfg(debug_assertions)]
        if self.trace.enabled(Trace::Verbose) {
            eprintln!("spectra: search discovered {} states for {:?}", queue.len(), skeys);
        }
        let best = self.best_index(&queue);
        let winner = queue.swap_remove(best);
        #[cfg(debug_assertions)]
        if self.trace.enabled(Trace::Basic) {
            eprintln!(
                "spectra: winner unmatched={:?} rules={}",
                winner.unmatched_skeys,
                winner.items.len()
            );
        }
        winner
    }

    /// Index of the best state per the four-criterion fold, folding from
    /// the end of the slice backward so that ties favor later-discovered
    /// states — this is load-bearing, not incidental (see the module docs).
    fn best_index(&self, states: &[LexState]) -> usize {
        assert!(!states.is_empty(), "the search queue always holds at least the start state");
        let mut best = states.len() - 1;
        for i in (0..states.len() - 1).rev() {
            if !self.current_wins(&states[best], &states[i]) {
                best = i;
            }
        }
        best
    }

    fn current_wins(&self, current: &LexState, other: &LexState) -> bool {
        self.compare(current, other) >= 0
    }

    /// The four-criterion fold as a signed score: positive when `current`
    /// beats `other`, negative when `other` beats `current`, zero on an
    /// exact tie across all four criteria.
    fn compare(&self, current: &LexState, other: &LexState) -> i64 {
        let crit1 = other.unmatched_skeys.len() as i64 - current.unmatched_skeys.len() as i64;
        let crit2 = current.total_length() as i64 - other.total_length() as i64;
        let crit3 = other.rare_count(&self.rare_set) as i64 - current.rare_count(&self.rare_set) as i64;
        let crit4 = other.items.len() as i64 - current.items.len() as i64;
        [crit1, crit2, crit3, crit4].into_iter().find(|&c| c != 0).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_lexer() -> Lexer {
        let mut builder = LexerBuilder::new([]);
        for (name, key) in [("H", "H"), ("E", "E"), ("L", "L"), ("O", "O")] {
            builder.add_rule(name, key, &key.to_lowercase(), &HashSet::new());
        }
        builder.build(Trace::None)
    }

    #[test]
    fn scenario_5_lexer_exact_match() {
        let lexer = simple_lexer();
        let result = lexer.query("HELO", "helo", false);
        assert_eq!(result.unmatched_skeys, "");
        assert_eq!(result.items.len(), 4);
        assert_eq!(result.caption(), "Found complete match.");
    }

    #[test]
    fn scenario_6_rare_rules_lose_ties() {
        let mut builder = LexerBuilder::new([]);
        for (name, key) in [("H", "H"), ("E", "E"), ("L", "L"), ("O", "O")] {
            builder.add_rule(name, key, &key.to_lowercase(), &HashSet::new());
        }
        let mut rare_flags = HashSet::new();
        rare_flags.insert(RuleFlag::Rare);
        builder.add_rule("HE", "HE", "he", &rare_flags);
        let lexer = builder.build(Trace::None);

        let result = lexer.query("HELO", "helo", false);
        assert_eq!(result.items.len(), 4);
        assert!(result.items.iter().all(|item| item.rule_id != "HE"));
    }

    #[test]
    fn scenario_7_find_best_translation() {
        let mut builder = LexerBuilder::new([]);
        builder.add_rule("SNOW", "STPH", "snow", &HashSet::new());
        let lexer = builder.build(Trace::None);

        let translations = vec![
            ("STPH".to_string(), "snow".to_string()),
            ("STPH".to_string(), "snowy".to_string()),
        ];
        let best = lexer.find_best_translation(&translations).unwrap();
        assert_eq!(best, 0);
    }

    #[test]
    fn find_best_translation_rejects_empty_input() {
        let lexer = simple_lexer();
        assert!(lexer.find_best_translation(&[]).is_err());
    }

    #[test]
    fn compile_index_drops_single_rule_results() {
        let lexer = simple_lexer();
        let translations = vec![("H".to_string(), "h".to_string())];
        let index = lexer.compile_index(&translations, None);
        assert!(index.is_empty());
    }

    #[test]
    fn compile_index_groups_by_every_participating_rule() {
        let lexer = simple_lexer();
        let translations = vec![("HELO".to_string(), "helo".to_string())];
        let index = lexer.compile_index(&translations, None);
        assert_eq!(index["H"]["HELO"], "helo");
        assert_eq!(index["O"]["HELO"], "helo");
    }

    #[test]
    fn no_match_yields_no_matches_caption() {
        let lexer = simple_lexer();
        let result = lexer.query("X", "z", false);
        assert_eq!(result.caption(), "No matches found.");
        assert_eq!(result.unmatched_skeys, "X");
    }
}
