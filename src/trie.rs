//! Keyword store backed by a character trie.
//!
//! Nodes live in an arena and are referenced by index; children are kept
//! sorted by character so lookup is a binary search. The trie is immutable
//! once built and is shared between grammars through an `Arc`.

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct NodeIdx(u32);

impl NodeIdx {
    fn get(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct Node {
    children: Vec<(char, NodeIdx)>,
}

/// A set of keywords, searchable by longest path from an offset.
#[derive(Debug)]
pub struct Trie {
    nodes: Vec<Node>,
}

/// The result of [`Trie::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieMatch<'t> {
    /// Text covered by the walk; empty when the first character has no edge.
    pub matched: &'t str,
    /// Byte offset immediately after `matched`.
    pub last_index: usize,
}

impl Trie {
    /// Build a trie from a list of keywords.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Trie {
            nodes: vec![Node::default()],
        };
        for word in keywords {
            let mut node = NodeIdx(0);
            for ch in word.as_ref().chars() {
                node = trie.child_or_insert(node, ch);
            }
        }
        trie
    }

    fn child_or_insert(&mut self, parent: NodeIdx, ch: char) -> NodeIdx {
        let children = &self.nodes[parent.get()].children;
        match children.binary_search_by_key(&ch, |&(c, _)| c) {
            Ok(pos) => children[pos].1,
            Err(pos) => {
                let child = NodeIdx(self.nodes.len() as u32);
                self.nodes.push(Node::default());
                self.nodes[parent.get()].children.insert(pos, (ch, child));
                child
            }
        }
    }

    fn child(&self, parent: NodeIdx, ch: char) -> Option<NodeIdx> {
        let children = &self.nodes[parent.get()].children;
        children
            .binary_search_by_key(&ch, |&(c, _)| c)
            .ok()
            .map(|pos| children[pos].1)
    }

    /// Walk the trie from `index` for as long as the text follows an edge.
    ///
    /// The walk does not need to end on a complete keyword: with `["++"]`
    /// registered, searching `"+x"` reports `"+"`. Callers compare the result
    /// against the word they expect.
    ///
    /// Returns `None` when `index` is past the end of `text` or not on a
    /// char boundary.
    pub fn search<'t>(&self, text: &'t str, index: usize) -> Option<TrieMatch<'t>> {
        let rest = text.get(index..)?;
        let mut node = NodeIdx(0);
        let mut end = index;
        for (offset, ch) in rest.char_indices() {
            match self.child(node, ch) {
                Some(next) => {
                    node = next;
                    end = index + offset + ch.len_utf8();
                }
                None => break,
            }
        }
        Some(TrieMatch {
            matched: &rest[..end - index],
            last_index: end,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].children.is_empty()
    }
}
