//! Structural signatures
//!
//! A signature hashes a node's kind, tag, compared attributes and the
//! signatures of its children, so two subtrees compare in O(1) once their
//! signatures are known. Source ranges never contribute; the fostered flag
//! does, since relocated content must not pass for its look-alike.

use crc32fast::Hasher;
use selser_dom::{NodeData, NodeId, SelserConfig, Tree};

pub type Signature = u64;

const SEED_HIGH: u32 = 0x5e15_e400;
const SEED_LOW: u32 = 0x0d1f_f5e1;

/// Two CRC32 lanes with different seeds, combined into 64 bits
struct SignatureHasher {
    high: Hasher,
    low: Hasher,
}

impl SignatureHasher {
    fn new() -> Self {
        Self {
            high: Hasher::new_with_initial(SEED_HIGH),
            low: Hasher::new_with_initial(SEED_LOW),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.high.update(bytes);
        self.low.update(bytes);
    }

    fn write_u64(&mut self, value: u64) {
        self.write(&value.to_le_bytes());
    }

    // Length-prefixed so that adjacent fields cannot run together
    fn write_str(&mut self, value: &str) {
        self.write_u64(value.len() as u64);
        self.write(value.as_bytes());
    }

    fn finish(self) -> Signature {
        (u64::from(self.high.finalize()) << 32) | u64::from(self.low.finalize())
    }
}

/// Signatures of every node reachable from a tree's root, indexed by id
#[derive(Debug, Clone)]
pub struct Signatures {
    table: Vec<Option<Signature>>,
}

impl Signatures {
    pub fn compute(tree: &Tree, config: &SelserConfig) -> Self {
        let mut signatures = Self {
            table: vec![None; tree.capacity()],
        };
        signatures.visit(tree, tree.root(), config);
        signatures
    }

    /// Signature of `id`; zero for nodes not reachable from the root
    pub fn get(&self, id: NodeId) -> Signature {
        self.table.get(id.index()).copied().flatten().unwrap_or(0)
    }

    fn visit(&mut self, tree: &Tree, id: NodeId, config: &SelserConfig) -> Signature {
        let mut hasher = SignatureHasher::new();
        match &tree.node(id).data {
            NodeData::Text(text) => {
                hasher.write(b"T");
                hasher.write_str(text);
            }
            NodeData::Comment(text) => {
                hasher.write(b"C");
                hasher.write_str(text);
            }
            NodeData::Element { name, attrs } => {
                hasher.write(b"E");
                hasher.write_str(name);
                if tree.provenance(id).map_or(false, |p| p.fostered) {
                    hasher.write(b"F");
                }

                let mut compared: Vec<(&str, &str)> = attrs
                    .iter()
                    .filter(|(key, _)| !config.is_diff_ignored(key))
                    .collect();
                compared.sort_unstable();
                hasher.write_u64(compared.len() as u64);
                for (key, value) in compared {
                    hasher.write_str(key);
                    hasher.write_str(value);
                }

                let children = tree.children(id);
                hasher.write_u64(children.len() as u64);
                for &child in children {
                    let signature = self.visit(tree, child, config);
                    hasher.write_u64(signature);
                }
            }
        }

        let signature = hasher.finish();
        if let Some(slot) = self.table.get_mut(id.index()) {
            *slot = Some(signature);
        }
        signature
    }
}

/// Signature of a sequence of nodes, used for multi-node units
pub fn combine(signatures: impl IntoIterator<Item = Signature>) -> Signature {
    let mut hasher = SignatureHasher::new();
    hasher.write(b"U");
    for signature in signatures {
        hasher.write_u64(signature);
    }
    hasher.finish()
}
