//! Arena-backed node storage for the prefix tree.

use crate::field::Zp;

/// Index of a node inside the tree's arena. Never exposed outside the crate;
/// public navigation hands out [`crate::ptree::NodeRef`] views instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(pub(crate) usize);

/// A single tree node.
///
/// Exactly one of `children` / `elements` is populated: a leaf stores its
/// elements directly and has an empty child table, an internal node owns a
/// full table of `2^bit_quantum` children and stores no elements. The
/// `svalues` vector always reflects the whole subtree at or below the node.
#[derive(Debug, Clone)]
pub(crate) struct Node {
    /// Back-reference for prefix-key reconstruction. `None` at the root.
    pub(crate) parent: Option<NodeId>,
    /// Position of this node in its parent's child table.
    pub(crate) key_index: usize,
    /// Child table, indexed by bitstring counting order. Empty for leaves.
    pub(crate) children: Vec<NodeId>,
    /// Elements stored at this node when it is a leaf.
    pub(crate) elements: Vec<Zp>,
    /// Number of elements at or below this node.
    pub(crate) num_elements: usize,
    /// Evaluations of the subtree's characteristic polynomial at the tree's
    /// sample points.
    pub(crate) svalues: Vec<Zp>,
}

impl Node {
    /// Creates an empty leaf with an all-ones sample vector.
    pub(crate) fn leaf(parent: Option<NodeId>, key_index: usize, num_samples: usize) -> Self {
        Self {
            parent,
            key_index,
            children: Vec::new(),
            elements: Vec::new(),
            num_elements: 0,
            svalues: vec![Zp::ONE; num_samples],
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Folds a per-point contribution vector into the node's sample vector.
    pub(crate) fn apply_update_vector(&mut self, marray: &[Zp]) {
        debug_assert_eq!(marray.len(), self.svalues.len());
        for (svalue, m) in self.svalues.iter_mut().zip(marray) {
            *svalue = svalue.mul(m);
        }
    }
}
