//! The Huffman code tree.
//!
//! Nodes live in an arena owned by the [`Tree`] and refer to their children
//! by [`NodeId`]. The tree is built greedily from a [`FrequencyMap`], written
//! to and read from the compressed stream header, and answers "what is the
//! code for this byte" queries.
//!
//! # Header format
//!
//! Post-order, two bytes per node:
//!
//! ```text
//! leaf     := LEAF <byte>
//! internal := <left> <right> NODE <filler>
//! header   := <root> DATA
//! ```
//!
//! The filler byte is always written as `NODE` and ignored on read.

use std::collections::BinaryHeap;
use std::io::{self, Read, Write};

use tracing::debug;

use crate::error::{Error, Result};
use crate::frequency::FrequencyMap;
use crate::node::{HeapEntry, Node, NodeId};

pub const NODE: u8 = 0;
pub const LEAF: u8 = 1;
pub const DATA: u8 = 2;

const MAX_CODE_LEN: usize = 64;
const MAX_LEAVES: usize = 256;

/// A variable-length code: the low `len` bits of `bits`, first step of the
/// root-to-leaf path in the highest of those bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Code {
    pub bits: u64,
    pub len: u8,
}

/// Code of every byte present in a tree, indexed by byte value.
#[derive(Debug, Clone)]
pub struct CodeTable {
    codes: [Option<Code>; 256],
}

impl CodeTable {
    pub fn get(&self, byte: u8) -> Result<Code> {
        self.codes[byte as usize].ok_or(Error::UnknownSymbol(byte))
    }

    /// Present bytes and their codes, ascending by byte.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Code)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter_map(|(byte, code)| code.map(|c| (byte as u8, c)))
    }

    pub fn max_len(&self) -> u8 {
        self.iter().map(|(_, c)| c.len).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Tree {
    /// Builds the tree by repeatedly merging the two lightest nodes.
    ///
    /// Leaves enter the heap in ascending byte order and every merged node
    /// after them, so equal weights resolve to the node created first. The
    /// first node popped becomes the left child.
    pub fn from_histogram(freqs: &FrequencyMap) -> Result<Self> {
        let distinct = freqs.distinct();
        if distinct == 0 {
            return Err(Error::EmptyInput);
        }

        let mut nodes = Vec::with_capacity(2 * distinct - 1);
        let mut heap = BinaryHeap::with_capacity(distinct);

        for (byte, weight) in freqs.symbols() {
            let id = NodeId(nodes.len());
            nodes.push(Node::Leaf { byte, weight });
            heap.push(HeapEntry {
                weight,
                seq: id.0,
                id,
            });
        }

        // Arena index doubles as the insertion sequence number.
        let root = loop {
            let Some(first) = heap.pop() else {
                return Err(Error::EmptyInput);
            };
            let Some(second) = heap.pop() else {
                break first.id;
            };

            let weight = first.weight + second.weight;
            let id = NodeId(nodes.len());
            nodes.push(Node::Internal {
                weight,
                left: first.id,
                right: second.id,
            });
            heap.push(HeapEntry {
                weight,
                seq: id.0,
                id,
            });
        };

        let tree = Tree { nodes, root };
        debug!(
            leaves = distinct,
            nodes = tree.node_count(),
            depth = tree.depth(),
            "built code tree"
        );
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Child of an internal node; `right` selects the 1 edge. `None` on a leaf.
    pub fn child(&self, id: NodeId, right: bool) -> Option<NodeId> {
        match self.node(id) {
            Node::Internal { left, .. } if !right => Some(*left),
            Node::Internal { right, .. } => Some(*right),
            Node::Leaf { .. } => None,
        }
    }

    /// True when the input had a single distinct byte and the root is that leaf.
    pub fn is_single_leaf(&self) -> bool {
        self.node(self.root).is_leaf()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            match self.node(id) {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Internal { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        deepest
    }

    /// Finds the code of `byte` by walking the tree.
    ///
    /// A single-leaf tree answers `{bits: 1, len: 1}` for any byte.
    pub fn code_for(&self, byte: u8) -> Result<Code> {
        if self.is_single_leaf() {
            return Ok(Code { bits: 1, len: 1 });
        }

        let mut stack = vec![(self.root, 0u64, 0usize)];
        while let Some((id, bits, len)) = stack.pop() {
            match self.node(id) {
                Node::Leaf { byte: b, .. } if *b == byte => return code(byte, bits, len),
                Node::Leaf { .. } => {}
                Node::Internal { left, right, .. } => {
                    stack.push((*right, (bits << 1) | 1, len + 1));
                    stack.push((*left, bits << 1, len + 1));
                }
            }
        }
        Err(Error::UnknownSymbol(byte))
    }

    /// Computes every code in a single traversal.
    pub fn code_table(&self) -> Result<CodeTable> {
        let mut codes = [None; 256];

        if let Node::Leaf { byte, .. } = self.node(self.root) {
            codes[*byte as usize] = Some(Code { bits: 1, len: 1 });
            return Ok(CodeTable { codes });
        }

        let mut stack = vec![(self.root, 0u64, 0usize)];
        while let Some((id, bits, len)) = stack.pop() {
            match self.node(id) {
                Node::Leaf { byte, .. } => codes[*byte as usize] = Some(code(*byte, bits, len)?),
                Node::Internal { left, right, .. } => {
                    stack.push((*right, (bits << 1) | 1, len + 1));
                    stack.push((*left, bits << 1, len + 1));
                }
            }
        }
        Ok(CodeTable { codes })
    }

    /// Writes the post-order header, including the closing `DATA` byte.
    /// Returns the number of bytes written.
    pub fn serialize<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut out = Vec::with_capacity(self.nodes.len() * 2 + 1);
        self.write_node(self.root, &mut out);
        out.push(DATA);
        writer.write_all(&out)?;
        Ok(out.len())
    }

    fn write_node(&self, id: NodeId, out: &mut Vec<u8>) {
        match self.node(id) {
            Node::Leaf { byte, .. } => out.extend_from_slice(&[LEAF, *byte]),
            Node::Internal { left, right, .. } => {
                self.write_node(*left, out);
                self.write_node(*right, out);
                out.extend_from_slice(&[NODE, NODE]);
            }
        }
    }

    /// Rebuilds a tree from a header, consuming everything up to and
    /// including the `DATA` byte.
    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self> {
        let mut nodes = Vec::new();
        let mut stack: Vec<NodeId> = Vec::new();
        let mut leaves = 0usize;

        loop {
            let sentinel = read_byte(reader, "tree header ended before the data marker")?;
            match sentinel {
                LEAF => {
                    let byte = read_byte(reader, "tree header ended inside a leaf")?;
                    leaves += 1;
                    if leaves > MAX_LEAVES {
                        return Err(Error::malformed(format!(
                            "tree header holds more than {MAX_LEAVES} leaves"
                        )));
                    }
                    let id = NodeId(nodes.len());
                    nodes.push(Node::Leaf { byte, weight: 0 });
                    stack.push(id);
                }
                NODE => {
                    read_byte(reader, "tree header ended inside an internal node")?;
                    let (Some(right), Some(left)) = (stack.pop(), stack.pop()) else {
                        return Err(Error::malformed("internal node without two children"));
                    };
                    let weight = nodes[left.0].weight() + nodes[right.0].weight();
                    let id = NodeId(nodes.len());
                    nodes.push(Node::Internal {
                        weight,
                        left,
                        right,
                    });
                    stack.push(id);
                }
                DATA => break,
                other => {
                    return Err(Error::malformed(format!(
                        "unknown tree sentinel {other:#04x}"
                    )));
                }
            }
        }

        match stack.as_slice() {
            [root] => {
                debug!(nodes = nodes.len(), "reconstructed code tree");
                Ok(Tree { nodes, root: *root })
            }
            rest => Err(Error::malformed(format!(
                "tree header resolves to {} roots, expected 1",
                rest.len()
            ))),
        }
    }
}

fn code(byte: u8, bits: u64, len: usize) -> Result<Code> {
    if len > MAX_CODE_LEN {
        return Err(Error::CodeTooLong { byte, len });
    }
    Ok(Code {
        bits,
        len: len as u8,
    })
}

fn read_byte<R: Read>(reader: &mut R, eof_reason: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(buf[0]),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(Error::malformed(eof_reason)),
        Err(e) => Err(e.into()),
    }
}
