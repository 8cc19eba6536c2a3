//! Resolves a raw, bracket-referenced rule dictionary into a flat set of
//! independent `StenoRule` values, and serializes rules back into raw form.

use crate::error::LibraryError;
use crate::keys;
use crate::rule::{RuleFlag, RuleMapBuilder, RuleMapRead, RuleMapWrite, StenoRule};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// One entry of a raw rule dictionary: `keys`, `pattern`, pipe-delimited
/// `flag_str`, free-text `description`, and pipe-delimited `example_str`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRule {
    pub keys: String,
    pub pattern: String,
    pub flag_str: String,
    pub description: String,
    pub example_str: String,
}

impl RawRule {
    pub fn new(keys: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self { keys: keys.into(), pattern: pattern.into(), ..Default::default() }
    }

    pub fn with_flags(mut self, flag_str: impl Into<String>) -> Self {
        self.flag_str = flag_str.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_examples(mut self, example_str: impl Into<String>) -> Self {
        self.example_str = example_str.into();
        self
    }
}

/// Matches one bracket substitution token: `(name)` or `[visible|name]`. No
/// nesting is permitted — the inner run may not itself contain a bracket.
static SUBRULE_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[(\[][^()\[\]]+?[)\]]").unwrap());

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Gray,
    Black,
}

/// Resolves an entire raw rule dictionary into `StenoRule` values, tracking
/// resolution progress so mutually-referencing entries only get parsed
/// once and self-referencing chains are caught as cycles.
pub struct RuleParser<'a> {
    src: &'a HashMap<String, RawRule>,
    resolved: HashMap<String, StenoRule>,
    coloring: HashMap<String, Color>,
}

impl<'a> RuleParser<'a> {
    pub fn new(src: &'a HashMap<String, RawRule>) -> Self {
        Self { src, resolved: HashMap::new(), coloring: HashMap::new() }
    }

    /// Parse every entry of the source dictionary, in no particular order,
    /// and return the resolved rules plus the id-keyed library they live in.
    pub fn from_raw(
        src: &'a HashMap<String, RawRule>,
    ) -> Result<HashMap<String, StenoRule>, LibraryError> {
        let mut parser = RuleParser::new(src);
        for name in src.keys() {
            if !parser.resolved.contains_key(name) {
                parser.resolve(name)?;
            }
        }
        Ok(parser.resolved)
    }

    fn resolve(&mut self, name: &str) -> Result<(), LibraryError> {
        match self.coloring.get(name) {
            Some(Color::Gray) => {
                return Err(LibraryError::CircularReference { name: name.to_string() });
            }
            Some(Color::Black) => return Ok(()),
            None => {}
        }
        let raw = self
            .src
            .get(name)
            .ok_or_else(|| LibraryError::UnknownReference { name: name.to_string(), parent: String::new() })?
            .clone();
        self.coloring.insert(name.to_string(), Color::Gray);

        let (letters, mut built_map) = self.substitute(&raw.pattern, name)?;
        let skeys = keys::from_rtfcre(&raw.keys)?;
        let flags: HashSet<RuleFlag> = raw
            .flag_str
            .split('|')
            .filter(|s| !s.is_empty())
            .map(RuleFlag::parse)
            .collect();
        for flag in key_flags(&flags) {
            built_map
                .add_special(format!("~{}", flag.as_str()), letters.len())
                .expect("built_map is a fresh builder, never frozen during resolution");
        }
        let mut description = raw.description.clone();
        if !raw.example_str.is_empty() {
            description = format!("{}\n({})", description, raw.example_str.replace('|', ", "));
        }

        let rule = StenoRule::new(name, skeys, letters, flags, description, built_map.freeze());
        self.resolved.insert(name.to_string(), rule);
        self.coloring.insert(name.to_string(), Color::Black);
        Ok(())
    }

    /// Repeatedly locate the leftmost bracket token, resolve its referenced
    /// rule (recursing first if necessary), and replace the token in place
    /// with the effective letters.
    fn substitute(&mut self, pattern: &str, parent: &str) -> Result<(String, RuleMapBuilder), LibraryError> {
        let mut built_map = RuleMapBuilder::new();
        let mut current = pattern.to_string();
        loop {
            let Some(m) = SUBRULE_RX.find(&current) else { break };
            let token = m.as_str().to_string();
            let token_start = m.start();
            let inner = &token[1..token.len() - 1];
            let (visible, rule_key) = if token.starts_with('(') {
                (None, inner.to_string())
            } else {
                match inner.split_once('|') {
                    Some((visible, key)) => (Some(visible.to_string()), key.to_string()),
                    None => {
                        return Err(LibraryError::UnknownReference {
                            name: inner.to_string(),
                            parent: parent.to_string(),
                        })
                    }
                }
            };
            if !self.resolved.contains_key(&rule_key) {
                if !self.src.contains_key(&rule_key) {
                    return Err(LibraryError::UnknownReference {
                        name: rule_key,
                        parent: parent.to_string(),
                    });
                }
                self.resolve(&rule_key)?;
            }
            let child = &self.resolved[&rule_key];
            let effective_letters = visible.unwrap_or_else(|| child.letters.clone());
            built_map
                .add(rule_key, token_start, effective_letters.len())
                .expect("built_map is a fresh builder, never frozen during resolution");
            current.replace_range(token_start..token_start + token.len(), &effective_letters);
        }
        Ok((current, built_map))
    }
}

/// Key flags (anything outside the four named flags) become zero-length
/// special rulemap entries referencing a synthetic `"~{flag}"` rule id.
fn key_flags(flags: &HashSet<RuleFlag>) -> Vec<&RuleFlag> {
    flags
        .iter()
        .filter(|f| matches!(f, RuleFlag::Key(_)))
        .collect()
}

/// Top-level entry point: resolve a raw rule dictionary into a flat list of
/// rules (insertion order is not meaningful).
pub fn from_raw(src: &HashMap<String, RawRule>) -> Result<Vec<StenoRule>, LibraryError> {
    let resolved = RuleParser::from_raw(src)?;
    Ok(resolved.into_values().collect())
}

/// Inverse of `from_raw`: rebuild raw records for the given rules, using
/// `library` to resolve rulemap child ids back into reference names.
pub fn to_raw(rules: &[StenoRule], library: &HashMap<String, StenoRule>) -> HashMap<String, RawRule> {
    let ref_by_id: HashSet<&str> = library.keys().map(|k| k.as_str()).collect();
    rules
        .iter()
        .map(|rule| (rule.id.clone(), inverse_rule(rule, &ref_by_id)))
        .collect()
}

fn inverse_rule(rule: &StenoRule, known_ids: &HashSet<&str>) -> RawRule {
    let keys = keys::to_rtfcre(&rule.keys).unwrap_or_else(|_| rule.keys.clone());
    let pattern = inverse_substitute(&rule.letters, rule, known_ids);
    let flag_str = rule
        .flags
        .iter()
        .map(|f| f.as_str().into_owned())
        .collect::<Vec<_>>()
        .join("|");
    RawRule {
        keys,
        pattern,
        flag_str,
        description: rule.description.clone(),
        example_str: String::new(),
    }
}

fn inverse_substitute(letters: &str, rule: &StenoRule, known_ids: &HashSet<&str>) -> String {
    let mut out = letters.to_string();
    let mut items: Vec<_> = rule.rulemap.items().to_vec();
    items.sort_by_key(|item| item.start);
    for item in items.iter().rev() {
        if item.length == 0 {
            continue;
        }
        if !known_ids.contains(item.rule_id.as_str()) {
            continue;
        }
        let end = item.start + item.length;
        if end > out.len() {
            continue;
        }
        out.replace_range(item.start..end, &format!("({})", item.rule_id));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict(entries: &[(&str, &str, &str)]) -> HashMap<String, RawRule> {
        entries
            .iter()
            .map(|(name, keys, pattern)| (name.to_string(), RawRule::new(*keys, *pattern)))
            .collect()
    }

    #[test]
    fn scenario_1_trivial_parse() {
        let src = dict(&[("A", "A", "a")]);
        let rules = from_raw(&src).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].letters, "a");
        assert!(rules[0].rulemap.items().is_empty());
    }

    #[test]
    fn scenario_2_substitution() {
        let src = dict(&[("R1", "HEL", "hel"), ("R2", "HEL/LO", "(R1)lo")]);
        let rules = from_raw(&src).unwrap();
        let r2 = rules.iter().find(|r| r.id == "R2").unwrap();
        assert_eq!(r2.letters, "hello");
        assert_eq!(r2.rulemap.items().len(), 1);
        assert_eq!(r2.rulemap.items()[0].rule_id, "R1");
        assert_eq!(r2.rulemap.items()[0].start, 0);
        assert_eq!(r2.rulemap.items()[0].length, 3);
    }

    #[test]
    fn scenario_3_aliased_letters() {
        let src = dict(&[("R1", "SKWR", "j"), ("R2", "SKWR-PB", "[jo|R1]n")]);
        let rules = from_raw(&src).unwrap();
        let r2 = rules.iter().find(|r| r.id == "R2").unwrap();
        assert_eq!(r2.letters, "jon");
        assert_eq!(r2.rulemap.items()[0].rule_id, "R1");
        assert_eq!(r2.rulemap.items()[0].start, 0);
        assert_eq!(r2.rulemap.items()[0].length, 2);
    }

    #[test]
    fn scenario_4_circular_reference_fails() {
        let src = dict(&[("A", "K", "(B)"), ("B", "T", "(A)")]);
        let err = from_raw(&src).unwrap_err();
        assert!(matches!(err, LibraryError::CircularReference { .. }));
    }

    #[test]
    fn unknown_reference_fails() {
        let src = dict(&[("A", "K", "(ghost)")]);
        let err = from_raw(&src).unwrap_err();
        assert!(matches!(err, LibraryError::UnknownReference { .. }));
    }

    #[test]
    fn key_flags_become_zero_length_special_entries() {
        let mut src = dict(&[("A", "A", "a")]);
        src.get_mut("A").unwrap().flag_str = "abbr".to_string();
        let rules = from_raw(&src).unwrap();
        let a = &rules[0];
        let special = &a.rulemap.items()[0];
        assert!(special.is_special());
        assert_eq!(special.rule_id, "~abbr");
        assert_eq!(special.start, 1);
    }

    #[test]
    fn to_raw_reconstructs_a_parenthesized_reference() {
        let src = dict(&[("R1", "HEL", "hel"), ("R2", "HEL/LO", "(R1)lo")]);
        let library = RuleParser::from_raw(&src).unwrap();
        let rules: Vec<StenoRule> = library.values().cloned().collect();
        let raw = to_raw(&rules, &library);
        assert_eq!(raw["R2"].pattern, "(R1)lo");
    }
}
