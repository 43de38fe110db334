//! Prefix tree of characteristic-polynomial samples.
//!
//! The tree is a radix tree over fixed-width, LSB-first element identifiers.
//! Every node keeps a vector of evaluations of the characteristic polynomial
//! `prod (x - z)` of the multiset of elements at or below it, taken at the
//! tree's deterministic sample points. Two peers holding the same element set
//! therefore hold bit-identical sample vectors at every matching node, and a
//! divergence in any vector localizes the symmetric difference to that
//! subtree.
//!
//! # Structural maintenance
//!
//! | Event | Trigger | Effect |
//! |-------|---------|--------|
//! | Split | leaf holds more than `split_threshold` elements | leaf becomes internal, elements redistribute into `2^bit_quantum` fresh child leaves |
//! | Join | internal node's count drops to `join_threshold` or below | subtree collapses back into a single leaf |
//!
//! Sample vectors and element counts are updated on the way down, *before*
//! the structural decision at each node; a split never recomputes the
//! splitting node's aggregate vector and a join never recomputes the joined
//! node's, both already cover the full subtree.

pub(crate) mod node;

use core::fmt;

use crate::bits::Bitstring;
use crate::field::{sample_points, ArithmeticError, Zp, P_SKS_BITS};
use crate::settings::Settings;

use node::{Node, NodeId};

/// Error enumeration for tree mutations.
///
/// Every error is detected before the first node is touched, so a failed
/// [`PTree::insert`] or [`PTree::remove`] leaves the tree bit-identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PTreeError {
    /// The element equals one of the sample points; admitting it would zero
    /// a sample value and no later removal could undo the damage.
    SamplePointCollision { element: Zp },
    /// The element is already present in the tree.
    Duplicate { element: Zp },
    /// The element is not present in the tree.
    Missing { element: Zp },
    /// A field operation failed while building an update vector.
    Arithmetic(ArithmeticError),
}

impl fmt::Display for PTreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PTreeError::SamplePointCollision { element } => {
                write!(f, "element {} collides with a sample point", element)
            }
            PTreeError::Duplicate { element } => {
                write!(f, "element {} is already present", element)
            }
            PTreeError::Missing { element } => {
                write!(f, "element {} is not present", element)
            }
            PTreeError::Arithmetic(err) => {
                write!(f, "field arithmetic failure: {}", err)
            }
        }
    }
}

impl std::error::Error for PTreeError {}

impl From<ArithmeticError> for PTreeError {
    fn from(err: ArithmeticError) -> Self {
        PTreeError::Arithmetic(err)
    }
}

/// Derives the navigation bitstring of an element.
///
/// The canonical little-endian byte form is loaded LSB-first into a
/// bitstring of [`P_SKS_BITS`] bits, so bit `i` of the bitstring is bit `i`
/// of the integer. Peers must derive identical bitstrings for identical
/// elements; this function is part of the wire contract.
pub fn navigation_bits(z: &Zp) -> Bitstring {
    Bitstring::from_bytes(&z.to_le_bytes(), P_SKS_BITS)
}

/// Per-point contribution of inserting `z`: `points[i] - z`.
///
/// Fails when `z` equals a sample point, which would contribute a zero
/// factor.
pub(crate) fn insert_update_vector(points: &[Zp], z: &Zp) -> Result<Vec<Zp>, PTreeError> {
    points
        .iter()
        .map(|point| {
            let m = point.sub(z);
            if m.is_zero() {
                Err(PTreeError::SamplePointCollision { element: *z })
            } else {
                Ok(m)
            }
        })
        .collect()
}

/// Per-point contribution of removing `z`: `(points[i] - z)^-1`.
pub(crate) fn remove_update_vector(points: &[Zp], z: &Zp) -> Result<Vec<Zp>, PTreeError> {
    points
        .iter()
        .map(|point| point.sub(z).inv().map_err(PTreeError::from))
        .collect()
}

/// In-memory prefix tree of characteristic-polynomial samples.
pub struct PTree {
    settings: Settings,
    points: Vec<Zp>,
    nodes: Vec<Node>,
    free_list: Vec<NodeId>,
    root: NodeId,
}

impl PTree {
    /// Creates an empty tree: a single leaf with an all-ones sample vector.
    pub fn new(settings: Settings) -> Self {
        let points = sample_points(settings.num_samples());
        let nodes = vec![Node::leaf(None, 0, settings.num_samples())];
        Self {
            settings,
            points,
            nodes,
            free_list: Vec::new(),
            root: NodeId(0),
        }
    }

    /// The validated configuration this tree was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Leaf element count above which a leaf splits.
    pub fn split_threshold(&self) -> usize {
        self.settings.split_threshold()
    }

    /// Subtree element count at which an internal node joins.
    pub fn join_threshold(&self) -> usize {
        self.settings.join_threshold()
    }

    /// Navigation bits consumed per level.
    pub fn bit_quantum(&self) -> usize {
        self.settings.bit_quantum()
    }

    /// Differences budget per reconciliation round.
    pub fn m_bar(&self) -> usize {
        self.settings.m_bar()
    }

    /// Length of every sample vector.
    pub fn num_samples(&self) -> usize {
        self.settings.num_samples()
    }

    /// The tree's evaluation abscissas, `1, -1, 2, -2, ...`.
    pub fn points(&self) -> &[Zp] {
        &self.points
    }

    /// A view of the root node.
    pub fn root(&self) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.root,
        }
    }

    /// Descends along `bs` until the bitstring is exhausted or a leaf is
    /// reached, and returns the node where descent stopped.
    pub fn node(&self, bs: &Bitstring) -> NodeRef<'_> {
        NodeRef {
            tree: self,
            id: self.locate(bs),
        }
    }

    /// Returns the node responsible for `z`, equivalent to
    /// `self.node(&navigation_bits(z))`.
    pub fn find(&self, z: &Zp) -> NodeRef<'_> {
        self.node(&navigation_bits(z))
    }

    /// Inserts an element.
    ///
    /// Fails with [`PTreeError::SamplePointCollision`] when `z` equals a
    /// sample point and with [`PTreeError::Duplicate`] when `z` is already
    /// present; in both cases the tree is unchanged.
    pub fn insert(&mut self, z: &Zp) -> Result<(), PTreeError> {
        let marray = insert_update_vector(&self.points, z)?;
        let bs = navigation_bits(z);
        let leaf = self.locate(&bs);
        if self.nodes[leaf.0].elements.contains(z) {
            return Err(PTreeError::Duplicate { element: *z });
        }
        self.insert_at(self.root, z, &marray, &bs, 0)
    }

    /// Removes an element.
    ///
    /// Fails with [`PTreeError::Missing`] when `z` is absent; the tree is
    /// unchanged. Removing an element that equals a sample point reports the
    /// underlying [`PTreeError::Arithmetic`] failure, since such an element
    /// can never have been inserted.
    pub fn remove(&mut self, z: &Zp) -> Result<(), PTreeError> {
        let marray = remove_update_vector(&self.points, z)?;
        let bs = navigation_bits(z);
        let leaf = self.locate(&bs);
        if !self.nodes[leaf.0].elements.contains(z) {
            return Err(PTreeError::Missing { element: *z });
        }
        self.remove_at(self.root, z, &marray, &bs, 0)
    }

    fn locate(&self, bs: &Bitstring) -> NodeId {
        let bit_quantum = self.settings.bit_quantum();
        let mut id = self.root;
        let mut depth = 0;
        while !self.nodes[id.0].is_leaf() && depth * bit_quantum < bs.len() {
            id = self.next_child(id, bs, depth);
            depth += 1;
        }
        id
    }

    /// Child selected by the `bit_quantum`-bit chunk of `bs` at `depth`. Bit
    /// `depth * bit_quantum + j` contributes `2^j` to the child index.
    fn next_child(&self, id: NodeId, bs: &Bitstring, depth: usize) -> NodeId {
        debug_assert!(!self.nodes[id.0].is_leaf());
        let bit_quantum = self.settings.bit_quantum();
        let base = depth * bit_quantum;
        let mut index = 0usize;
        for j in 0..bit_quantum {
            if base + j < bs.len() && bs.get(base + j) {
                index |= 1 << j;
            }
        }
        self.nodes[id.0].children[index]
    }

    fn insert_at(
        &mut self,
        id: NodeId,
        z: &Zp,
        marray: &[Zp],
        bs: &Bitstring,
        depth: usize,
    ) -> Result<(), PTreeError> {
        self.nodes[id.0].apply_update_vector(marray);
        self.nodes[id.0].num_elements += 1;
        if self.nodes[id.0].is_leaf() {
            if self.nodes[id.0].elements.len() > self.settings.split_threshold() {
                self.split(id, depth)?;
            } else {
                debug_assert!(!self.nodes[id.0].elements.contains(z));
                self.nodes[id.0].elements.push(*z);
                return Ok(());
            }
        }
        let child = self.next_child(id, bs, depth);
        self.insert_at(child, z, marray, bs, depth + 1)
    }

    /// Turns an over-full leaf into an internal node, redistributing its
    /// elements into fresh child leaves by their navigation chunk at `depth`.
    /// A child that immediately overflows splits again through the recursive
    /// insert.
    fn split(&mut self, id: NodeId, depth: usize) -> Result<(), PTreeError> {
        let fan_out = 1usize << self.settings.bit_quantum();
        let num_samples = self.settings.num_samples();
        let mut children = Vec::with_capacity(fan_out);
        for key_index in 0..fan_out {
            children.push(self.alloc(Some(id), key_index, num_samples));
        }
        self.nodes[id.0].children = children;
        let elements = std::mem::take(&mut self.nodes[id.0].elements);
        for element in &elements {
            let marray = insert_update_vector(&self.points, element)?;
            let bs = navigation_bits(element);
            let child = self.next_child(id, &bs, depth);
            self.insert_at(child, element, &marray, &bs, depth + 1)?;
        }
        Ok(())
    }

    fn remove_at(
        &mut self,
        id: NodeId,
        z: &Zp,
        marray: &[Zp],
        bs: &Bitstring,
        depth: usize,
    ) -> Result<(), PTreeError> {
        self.nodes[id.0].apply_update_vector(marray);
        self.nodes[id.0].num_elements -= 1;
        if !self.nodes[id.0].is_leaf() {
            if self.nodes[id.0].num_elements <= self.settings.join_threshold() {
                self.join(id);
            } else {
                let child = self.next_child(id, bs, depth);
                return self.remove_at(child, z, marray, bs, depth + 1);
            }
        }
        // Either this was a leaf all along, or the join above just made it
        // one and its element bag now holds the whole former subtree.
        let node = &mut self.nodes[id.0];
        match node.elements.iter().position(|element| element == z) {
            Some(index) => {
                node.elements.remove(index);
                Ok(())
            }
            None => Err(PTreeError::Missing { element: *z }),
        }
    }

    /// Collapses the subtree below `id` into `id`'s own element bag and
    /// releases every descendant. The node's sample vector already covers
    /// the collected elements and is left untouched.
    fn join(&mut self, id: NodeId) {
        let mut worklist: Vec<NodeId> = std::mem::take(&mut self.nodes[id.0].children);
        let mut gathered = Vec::new();
        let mut cursor = 0;
        while cursor < worklist.len() {
            let child = worklist[cursor];
            cursor += 1;
            gathered.append(&mut self.nodes[child.0].elements);
            let grandchildren = std::mem::take(&mut self.nodes[child.0].children);
            worklist.extend(grandchildren);
            self.release(child);
        }
        self.nodes[id.0].elements.append(&mut gathered);
    }

    fn alloc(&mut self, parent: Option<NodeId>, key_index: usize, num_samples: usize) -> NodeId {
        match self.free_list.pop() {
            Some(id) => {
                self.nodes[id.0] = Node::leaf(parent, key_index, num_samples);
                id
            }
            None => {
                self.nodes.push(Node::leaf(parent, key_index, num_samples));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn release(&mut self, id: NodeId) {
        self.nodes[id.0] = Node::leaf(None, 0, 0);
        self.free_list.push(id);
    }

    fn collect_elements(&self, id: NodeId, out: &mut Vec<Zp>) {
        let node = &self.nodes[id.0];
        if node.is_leaf() {
            out.extend_from_slice(&node.elements);
            return;
        }
        for child in &node.children {
            self.collect_elements(*child, out);
        }
    }
}

impl fmt::Debug for PTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PTree")
            .field("size", &self.nodes[self.root.0].num_elements)
            .field("bit_quantum", &self.settings.bit_quantum())
            .field("num_samples", &self.settings.num_samples())
            .finish()
    }
}

/// Read-only view of a tree node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a PTree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    fn node(&self) -> &'a Node {
        &self.tree.nodes[self.id.0]
    }

    /// `true` when the node stores elements directly.
    pub fn is_leaf(&self) -> bool {
        self.node().is_leaf()
    }

    /// Number of elements at or below this node.
    pub fn size(&self) -> usize {
        self.node().num_elements
    }

    /// The node's sample vector.
    pub fn svalues(&self) -> &'a [Zp] {
        &self.node().svalues
    }

    /// The parent node, or `None` at the root.
    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    /// Child views in index order. Empty for a leaf.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        self.node()
            .children
            .iter()
            .map(|id| NodeRef {
                tree: self.tree,
                id: *id,
            })
            .collect()
    }

    /// Every element at or below this node, children in index order.
    pub fn elements(&self) -> Vec<Zp> {
        let mut out = Vec::new();
        self.tree.collect_elements(self.id, &mut out);
        out
    }

    /// The node's prefix key: the concatenation of child indices from the
    /// root down to this node, each laid down LSB-first as a
    /// `bit_quantum`-bit chunk.
    pub fn key(&self) -> Bitstring {
        let bit_quantum = self.tree.settings.bit_quantum();
        let mut indices = Vec::new();
        let mut current = self.id;
        while let Some(parent) = self.tree.nodes[current.0].parent {
            indices.push(self.tree.nodes[current.0].key_index);
            current = parent;
        }
        indices.reverse();
        let mut bs = Bitstring::new(indices.len() * bit_quantum);
        for (level, key_index) in indices.iter().enumerate() {
            for j in 0..bit_quantum {
                if (key_index >> j) & 1 == 1 {
                    bs.set(level * bit_quantum + j);
                }
            }
        }
        bs
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", &self.key())
            .field("is_leaf", &self.is_leaf())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SettingsBuilder;

    fn default_tree() -> PTree {
        PTree::new(SettingsBuilder::new().build().expect("default settings"))
    }

    #[test]
    fn tree_mirrors_settings() {
        let tree = default_tree();
        assert_eq!(tree.bit_quantum(), 2);
        assert_eq!(tree.m_bar(), 5);
        assert_eq!(tree.num_samples(), 6);
        assert_eq!(tree.split_threshold(), 50);
        assert_eq!(tree.join_threshold(), 25);
        assert_eq!(tree.points().len(), 6);
        assert_eq!(tree.settings().version(), "experimental");
    }

    #[test]
    fn empty_tree_is_all_ones_leaf() {
        let tree = default_tree();
        let root = tree.root();
        assert!(root.is_leaf());
        assert_eq!(root.size(), 0);
        assert_eq!(root.svalues(), &[Zp::ONE; 6]);
        assert_eq!(root.key().len(), 0);
        assert!(root.parent().is_none());
    }

    #[test]
    fn single_insert_updates_svalues() {
        let mut tree = default_tree();
        let z = Zp::from(7u64);
        tree.insert(&z).expect("insert");

        let root = tree.root();
        assert!(root.is_leaf());
        assert_eq!(root.size(), 1);
        let expected: Vec<Zp> = tree.points().iter().map(|p| p.sub(&z)).collect();
        assert_eq!(root.svalues(), expected.as_slice());
        assert_eq!(root.elements(), vec![z]);
    }

    #[test]
    fn sample_point_insert_rejected() {
        let mut tree = default_tree();
        let point = tree.points()[0];
        let err = tree.insert(&point).expect_err("collision");
        assert_eq!(err, PTreeError::SamplePointCollision { element: point });
        // Negative points collide too.
        let negative = tree.points()[1];
        assert!(matches!(
            tree.insert(&negative),
            Err(PTreeError::SamplePointCollision { .. })
        ));
        assert_eq!(tree.root().size(), 0);
        assert_eq!(tree.root().svalues(), &[Zp::ONE; 6]);
    }

    #[test]
    fn duplicate_insert_rejected_unchanged() {
        let mut tree = default_tree();
        let z = Zp::from(42u64);
        tree.insert(&z).expect("first insert");
        let before: Vec<Zp> = tree.root().svalues().to_vec();

        let err = tree.insert(&z).expect_err("duplicate");
        assert_eq!(err, PTreeError::Duplicate { element: z });
        assert_eq!(tree.root().size(), 1);
        assert_eq!(tree.root().svalues(), before.as_slice());
    }

    #[test]
    fn missing_remove_rejected_unchanged() {
        let mut tree = default_tree();
        tree.insert(&Zp::from(42u64)).expect("insert");
        let before: Vec<Zp> = tree.root().svalues().to_vec();

        let z = Zp::from(43u64);
        let err = tree.remove(&z).expect_err("missing");
        assert_eq!(err, PTreeError::Missing { element: z });
        assert_eq!(tree.root().size(), 1);
        assert_eq!(tree.root().svalues(), before.as_slice());
    }

    #[test]
    fn remove_returns_to_empty_state() {
        let mut tree = default_tree();
        let z = Zp::from(1000u64);
        tree.insert(&z).expect("insert");
        tree.remove(&z).expect("remove");

        let root = tree.root();
        assert!(root.is_leaf());
        assert_eq!(root.size(), 0);
        assert_eq!(root.svalues(), &[Zp::ONE; 6]);
        assert!(root.elements().is_empty());
    }

    #[test]
    fn reinsert_after_remove_permitted() {
        let mut tree = default_tree();
        let z = Zp::from(77u64);
        tree.insert(&z).expect("insert");
        tree.remove(&z).expect("remove");
        tree.insert(&z).expect("reinsert");
        assert_eq!(tree.root().size(), 1);
    }

    #[test]
    fn navigation_bits_match_integer_bits() {
        let z = Zp::from(0b1101u64);
        let bs = navigation_bits(&z);
        assert_eq!(bs.len(), P_SKS_BITS);
        assert!(bs.get(0));
        assert!(!bs.get(1));
        assert!(bs.get(2));
        assert!(bs.get(3));
        for i in 4..P_SKS_BITS {
            assert!(!bs.get(i));
        }
    }

    #[test]
    fn child_index_is_lsb_first_within_chunk() {
        // With bit_quantum = 2 the element 0b0110 reads chunk 10 at depth 0
        // (bits 0..2, LSB first, so index 2) and chunk 01 at depth 1 (bits
        // 2..4, index 1).
        let mut tree = default_tree();
        for value in 100..152u64 {
            tree.insert(&Zp::from(value)).expect("insert");
        }
        assert!(!tree.root().is_leaf());

        let z = Zp::from(0b0110u64);
        let leaf = tree.find(&z);
        let key = leaf.key();
        assert!(key.len() >= 2);
        assert_eq!((key.get(0) as usize) | ((key.get(1) as usize) << 1), 2);
    }

    #[test]
    fn update_vectors_are_inverses() {
        let points = sample_points(6);
        let z = Zp::from(99u64);
        let add = insert_update_vector(&points, &z).expect("insert vector");
        let del = remove_update_vector(&points, &z).expect("remove vector");
        for (a, d) in add.iter().zip(&del) {
            assert_eq!(a.mul(d), Zp::ONE);
        }
    }

    #[test]
    fn remove_update_vector_for_sample_point_fails() {
        let points = sample_points(6);
        let err = remove_update_vector(&points, &Zp::from(1u64)).expect_err("zero inverse");
        assert_eq!(err, PTreeError::Arithmetic(ArithmeticError::ZeroInverse));
    }
}
