//! Prefix trie keyed by characters, with longest-match scanning over free text.

use std::collections::BTreeMap;

use crate::types::Match;

/// One node per character on a key's path. A node holds a value iff it ends a key.
struct Node<V> {
    /// Child nodes keyed by the next character. Ordered so traversal is deterministic.
    children: BTreeMap<char, Node<V>>,
    /// Present only on terminal nodes.
    value: Option<V>,
}

impl<V> Node<V> {
    /// Depth-first walk collecting every terminal entry below this node.
    fn collect_entries<'a>(&'a self, key: &mut String, out: &mut Vec<(String, &'a V)>) {
        if let Some(value) = &self.value {
            out.push((key.clone(), value));
        }
        for (c, child) in &self.children {
            key.push(*c);
            child.collect_entries(key, out);
            key.pop();
        }
    }

    /// A node with no value and no children.
    const fn empty() -> Self {
        return Self {
            children: BTreeMap::new(),
            value: None,
        };
    }
}

/// Maps strings to values through shared character paths.
///
/// Deleting a key only clears its terminal node; the path stays allocated so
/// the shape of the tree never shrinks. Callers serialise mutation themselves.
pub struct PrefixTrie<V> {
    /// Number of terminal nodes.
    len: usize,
    /// Node for the empty prefix.
    root: Node<V>,
}

impl<V> Default for PrefixTrie<V> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<V> PrefixTrie<V> {
    /// Clear the value stored under `key`, returning it. Absent keys are a no-op.
    /// Nodes are never pruned.
    pub fn delete(&mut self, key: &str) -> Option<V> {
        let removed = self.node_mut(key)?.value.take();
        if removed.is_some() {
            self.len = self.len.saturating_sub(1);
        }
        return removed;
    }

    /// Every entry whose key starts with `prefix`, depth first in character order.
    /// An empty prefix lists the whole trie.
    pub fn entries(&self, prefix: &str) -> Vec<(String, &V)> {
        let mut out = Vec::new();
        if let Some(node) = self.node(prefix) {
            let mut key = prefix.to_string();
            node.collect_entries(&mut key, &mut out);
        }
        return out;
    }

    /// Value stored under exactly `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        return self.node(key)?.value.as_ref();
    }

    /// Whether the trie holds no entries.
    pub const fn is_empty(&self) -> bool {
        return self.len == 0;
    }

    /// Number of stored entries.
    pub const fn len(&self) -> usize {
        return self.len;
    }

    /// Longest terminal key that is a prefix of `chars` and whose length `accept`
    /// allows, as (character count, value).
    fn longest_prefix_of<F>(&self, chars: &[char], accept: F) -> Option<(usize, &V)>
    where
        F: Fn(usize) -> bool,
    {
        let mut node = &self.root;
        let mut best = None;
        for (depth, c) in chars.iter().enumerate() {
            let Some(child) = node.children.get(c) else {
                break;
            };
            node = child;
            let len = depth.saturating_add(1);
            if let Some(value) = &node.value
                && accept(len)
            {
                best = Some((len, value));
            }
        }
        return best;
    }

    /// An empty trie.
    pub const fn new() -> Self {
        return Self {
            len: 0,
            root: Node::empty(),
        };
    }

    /// Node reached by following `key`, if the path exists.
    fn node(&self, key: &str) -> Option<&Node<V>> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.children.get(&c)?;
        }
        return Some(node);
    }

    /// Mutable node reached by following `key`, if the path exists.
    fn node_mut(&mut self, key: &str) -> Option<&mut Node<V>> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.get_mut(&c)?;
        }
        return Some(node);
    }

    /// Node reached by following `key`, creating missing nodes on the way.
    fn node_or_insert(&mut self, key: &str) -> &mut Node<V> {
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_insert_with(Node::empty);
        }
        return node;
    }

    /// Insert or overwrite the value under `key`.
    pub fn set(&mut self, key: &str, value: V) {
        let previous = self.node_or_insert(key).value.replace(value);
        if previous.is_none() {
            self.len = self.len.saturating_add(1);
        }
    }

    /// Replace the value under `key` with `updater(old)`, inserting when absent.
    /// Returns the stored value.
    pub fn update<F>(&mut self, key: &str, updater: F) -> &V
    where
        F: FnOnce(Option<V>) -> V,
    {
        let old = self.node_or_insert(key).value.take();
        if old.is_none() {
            self.len = self.len.saturating_add(1);
        }
        let next = updater(old);
        return self.node_or_insert(key).value.insert(next);
    }
}

impl<V: Clone> PrefixTrie<V> {
    /// Find every stored key embedded in `text`.
    ///
    /// Each character offset contributes its longest terminal key, if any. A match
    /// then survives only if no overlapping match is longer; between equally long
    /// overlapping matches the one found at the earlier offset wins. Offsets count
    /// characters.
    pub fn find_matches(&self, text: &str) -> Vec<Match<V>> {
        return self.find_matches_where(text, |_, _| return true);
    }

    /// Like [`PrefixTrie::find_matches`], but an occurrence only counts when
    /// `keep(start_index, char_len)` accepts it. Rejected occurrences are gone
    /// before overlaps are settled, so they never shadow an accepted one, and an
    /// offset falls back to its longest accepted key.
    pub fn find_matches_where<F>(&self, text: &str, keep: F) -> Vec<Match<V>>
    where
        F: Fn(usize, usize) -> bool,
    {
        let chars: Vec<char> = text.chars().collect();
        let mut raw: Vec<Match<V>> = Vec::new();

        for start in 0..chars.len() {
            let Some(rest) = chars.get(start..) else {
                break;
            };
            let Some((len, value)) = self.longest_prefix_of(rest, |len| return keep(start, len)) else {
                continue;
            };
            let matched: String = rest.iter().take(len).collect();
            raw.push(Match {
                start_index: start,
                text: matched,
                value: value.clone(),
            });
        }

        return keep_locally_longest(raw);
    }
}

/// Inclusive interval intersection over character offsets.
fn matches_overlap<V>(a: &Match<V>, b: &Match<V>) -> bool {
    return a.last_index() >= b.start_index && b.last_index() >= a.start_index;
}

/// Drop every match that some overlapping match beats: longer wins, earlier wins ties.
fn keep_locally_longest<V>(raw: Vec<Match<V>>) -> Vec<Match<V>> {
    let lengths: Vec<usize> = raw.iter().map(Match::char_len).collect();
    let beaten: Vec<bool> = raw
        .iter()
        .zip(&lengths)
        .enumerate()
        .map(|(i, (candidate, &len))| {
            return raw.iter().zip(&lengths).enumerate().any(|(j, (other, &other_len))| {
                return j != i
                    && matches_overlap(candidate, other)
                    && (other_len > len || (other_len == len && j < i));
            });
        })
        .collect();

    return raw
        .into_iter()
        .zip(beaten)
        .filter(|(_, is_beaten)| return !is_beaten)
        .map(|(m, _)| return m)
        .collect();
}
