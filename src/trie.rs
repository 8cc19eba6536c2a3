//! A byte-keyed prefix trie, generalized from a single-token overwrite trie
//! into one with multi-valued leaves: several rules can share the same key
//! prefix (e.g. two rules both matching `"H"`, one stroke-flagged and one
//! not), and the prefix matcher needs every one of them, not just the
//! longest match.

#[derive(Debug, Clone)]
struct TrieNode<T> {
    values: Vec<T>,
    children: Vec<(u8, TrieNode<T>)>,
}

impl<T> TrieNode<T> {
    fn new() -> Self {
        Self { values: Vec::new(), children: Vec::new() }
    }
}

/// A trie over byte sequences with every prefix match retrievable, not just
/// the deepest one.
#[derive(Debug, Clone)]
pub struct PrefixTrie<T> {
    root: TrieNode<T>,
}

impl<T> Default for PrefixTrie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PrefixTrie<T> {
    pub fn new() -> Self {
        Self { root: TrieNode::new() }
    }

    /// Insert `value` under the byte-string key, allowing repeated inserts
    /// of the same key to accumulate multiple values.
    pub fn insert(&mut self, key: &[u8], value: T) {
        let mut node = &mut self.root;
        for &byte in key {
            let idx = match node.children.binary_search_by_key(&byte, |(b, _)| *b) {
                Ok(idx) => idx,
                Err(idx) => {
                    node.children.insert(idx, (byte, TrieNode::new()));
                    idx
                }
            };
            node = &mut node.children[idx].1;
        }
        node.values.push(value);
    }
}

impl<T: Clone> PrefixTrie<T> {
    /// Every value stored at a key that is a prefix of `input`, in order of
    /// increasing prefix length, alongside how many bytes of `input` that
    /// prefix consumed.
    pub fn find_all(&self, input: &[u8]) -> Vec<(T, usize)> {
        let mut matches = Vec::new();
        let mut node = &self.root;
        for value in &node.values {
            matches.push((value.clone(), 0));
        }
        for (depth, &byte) in input.iter().enumerate() {
            match node.children.binary_search_by_key(&byte, |(b, _)| *b) {
                Ok(idx) => {
                    node = &node.children[idx].1;
                    for value in &node.values {
                        matches.push((value.clone(), depth + 1));
                    }
                }
                Err(_) => break,
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_every_matching_prefix_not_just_longest() {
        let mut trie = PrefixTrie::new();
        trie.insert(b"H", "H-rule");
        trie.insert(b"HE", "HE-rule");
        trie.insert(b"HEL", "HEL-rule");

        let matches = trie.find_all(b"HELO");
        let values: Vec<&str> = matches.iter().map(|(v, _)| *v).collect();
        assert_eq!(values, vec!["H-rule", "HE-rule", "HEL-rule"]);
        assert_eq!(matches.iter().map(|(_, len)| *len).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn multiple_values_at_the_same_key_both_appear() {
        let mut trie = PrefixTrie::new();
        trie.insert(b"A", "first");
        trie.insert(b"A", "second");
        let matches = trie.find_all(b"A");
        assert_eq!(matches.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec!["first", "second"]);
    }

    #[test]
    fn no_match_returns_empty() {
        let trie: PrefixTrie<&str> = PrefixTrie::new();
        assert!(trie.find_all(b"X").is_empty());
    }
}
