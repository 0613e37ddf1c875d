//! Building blocks shared by the prefix-code coders (Huffman, Shannon-Fano).
//!
//! Trees are stored in an arena: nodes live in a flat `Vec` and children are
//! referenced by index. A tree is rebuilt from a frequency table whenever it
//! is needed, so construction must be fully deterministic.

use std::collections::BTreeMap;

/// Symbol occurrence counts, ordered by symbol.
pub type FrequencyTable = BTreeMap<char, usize>;

/// Symbol to binary code string (`'0'`/`'1'` characters).
pub type CodeTable = BTreeMap<char, String>;

/// Build a frequency table mapping each character in `input` to its frequency.
pub fn build_frequency_table(input: &str) -> FrequencyTable {
    let mut freq = FrequencyTable::new();
    for ch in input.chars() {
        *freq.entry(ch).or_insert(0) += 1;
    }
    freq
}

/// Returns `true` if no code in the table is a prefix of another code.
///
/// After sorting, any code that prefixes another also prefixes every code
/// between them, so comparing neighbours is enough.
pub fn is_prefix_free(codes: &CodeTable) -> bool {
    let mut sorted: Vec<&str> = codes.values().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted
        .windows(2)
        .all(|pair| !pair[1].starts_with(pair[0]))
}

/// Encode `input` by concatenating the code of every character.
///
/// Characters missing from the table are skipped.
pub fn encode_with_table(input: &str, codes: &CodeTable) -> String {
    let mut encoded = String::new();
    for ch in input.chars() {
        if let Some(code) = codes.get(&ch) {
            encoded.push_str(code);
        }
    }
    encoded
}

/// A node of a binary code tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A leaf carries a symbol and its frequency.
    Leaf { symbol: char, freq: usize },
    /// An internal node carries the combined frequency and child indices.
    Internal {
        freq: usize,
        left: usize,
        right: usize,
    },
}

impl Node {
    /// Returns the frequency of the node.
    pub fn freq(&self) -> usize {
        match self {
            Node::Leaf { freq, .. } => *freq,
            Node::Internal { freq, .. } => *freq,
        }
    }
}

/// Arena-backed binary code tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeTree {
    nodes: Vec<Node>,
    root: usize,
}

impl CodeTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf and return its index.
    pub fn push_leaf(&mut self, symbol: char, freq: usize) -> usize {
        self.nodes.push(Node::Leaf { symbol, freq });
        self.nodes.len() - 1
    }

    /// Add an internal node over two existing nodes and return its index.
    pub fn push_internal(&mut self, left: usize, right: usize) -> usize {
        let freq = self.nodes[left].freq() + self.nodes[right].freq();
        self.nodes.push(Node::Internal { freq, left, right });
        self.nodes.len() - 1
    }

    pub fn set_root(&mut self, root: usize) {
        self.root = root;
    }

    pub fn root(&self) -> Option<&Node> {
        self.nodes.get(self.root)
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk the tree assigning `'0'` to left edges and `'1'` to right edges.
    ///
    /// If the tree consists of a single leaf, the code "0" is assigned.
    pub fn code_table(&self) -> CodeTable {
        let mut table = CodeTable::new();
        if self.is_empty() {
            return table;
        }
        let mut stack = vec![(self.root, String::new())];
        while let Some((index, prefix)) = stack.pop() {
            match &self.nodes[index] {
                Node::Leaf { symbol, .. } => {
                    let code = if prefix.is_empty() {
                        "0".to_string()
                    } else {
                        prefix
                    };
                    table.insert(*symbol, code);
                }
                Node::Internal { left, right, .. } => {
                    let mut right_prefix = prefix.clone();
                    right_prefix.push('1');
                    stack.push((*right, right_prefix));
                    let mut left_prefix = prefix;
                    left_prefix.push('0');
                    stack.push((*left, left_prefix));
                }
            }
        }
        table
    }

    /// Decode a bit string by walking from the root, emitting a symbol and
    /// returning to the root at every leaf.
    ///
    /// Any character other than `'0'` is read as `'1'`. Trailing bits that do
    /// not reach a leaf are dropped.
    pub fn decode(&self, encoded: &str) -> String {
        let mut result = String::new();
        let Some(root) = self.root() else {
            return result;
        };

        // A lone leaf has code "0": every bit is one occurrence.
        if let Node::Leaf { symbol, .. } = root {
            return encoded.chars().map(|_| *symbol).collect();
        }

        let mut current = self.root;
        for bit in encoded.chars() {
            if let Node::Internal { left, right, .. } = &self.nodes[current] {
                current = if bit == '0' { *left } else { *right };
                if let Node::Leaf { symbol, .. } = &self.nodes[current] {
                    result.push(*symbol);
                    current = self.root;
                }
            }
        }
        result
    }
}
