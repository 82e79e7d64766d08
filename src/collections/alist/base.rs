//! Container state shared by the dense and sparse lists.
//!
//! `AListBase` owns the root, the item count, the structural version and the freeze
//! mode, and turns root-level outcomes into height changes: a root split grows the
//! tree by one level, a root left with a single child is replaced by that child.

use super::config::AListConfig;
use super::error::{AListError, Result, MAX_LEN};
use super::inner::Inner;
use super::iter::{Iter, SetEntries};
use super::leaf::Leaf;
use super::node::{make_unique, Node, NodeRef, Outcome, Side};
use super::observer::{Obs, SharedObserver};
use super::sparse_leaf::{SparseLeaf, SparseOp};
use std::sync::Arc;

/// How much mutation a container currently accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FreezeMode {
    /// Ordinary read-write list.
    #[default]
    Unfrozen,
    /// Set while change handlers run, so they cannot start another structural edit.
    FrozenForListChanging,
    /// A read-only snapshot meant to be shared across threads.
    FrozenForConcurrency,
    /// Permanently read-only.
    Frozen,
}

pub(crate) struct AListBase<T> {
    pub(crate) root: Option<NodeRef<T>>,
    pub(crate) count: usize,
    pub(crate) version: u64,
    pub(crate) mode: FreezeMode,
    pub(crate) observer: Option<SharedObserver<T>>,
    pub(crate) config: AListConfig,
    sparse: bool,
}

impl<T> AListBase<T> {
    pub(crate) fn new(config: AListConfig, sparse: bool) -> Self {
        Self {
            root: None,
            count: 0,
            version: 0,
            mode: FreezeMode::Unfrozen,
            observer: None,
            config,
            sparse,
        }
    }

    /// A new container sharing this one's tree. Observer and freeze mode are not carried over.
    pub(crate) fn share(&self) -> Self {
        Self {
            root: self.root.clone(),
            count: self.count,
            version: self.version,
            mode: FreezeMode::Unfrozen,
            observer: None,
            config: self.config,
            sparse: self.sparse,
        }
    }

    #[inline]
    pub(crate) fn root(&self) -> Option<&Node<T>> {
        self.root.as_deref()
    }

    pub(crate) fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.height())
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> Option<&T> {
        self.root.as_ref().and_then(|r| r.get(index))
    }

    #[inline]
    pub(crate) fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub(crate) fn check_writable(&self) -> Result<()> {
        match self.mode {
            FreezeMode::Unfrozen => Ok(()),
            mode => Err(AListError::ReadOnly { mode }),
        }
    }

    /// `index` must address an existing slot.
    pub(crate) fn check_index(&self, index: usize) -> Result<()> {
        if index < self.count {
            Ok(())
        } else {
            Err(AListError::IndexOutOfRange { index, len: self.count })
        }
    }

    /// `index` must be a valid insertion point.
    pub(crate) fn check_position(&self, index: usize) -> Result<()> {
        if index <= self.count {
            Ok(())
        } else {
            Err(AListError::IndexOutOfRange { index, len: self.count })
        }
    }

    pub(crate) fn check_range(&self, index: usize, count: usize) -> Result<()> {
        match index.checked_add(count) {
            Some(end) if end <= self.count => Ok(()),
            _ => Err(AListError::RangeOutOfBounds { index, count, len: self.count }),
        }
    }

    pub(crate) fn check_capacity(&self, additional: usize) -> Result<()> {
        match self.count.checked_add(additional) {
            Some(total) if total <= MAX_LEN => Ok(()),
            _ => Err(AListError::CapacityOverflow { len: self.count, additional, max: MAX_LEN }),
        }
    }

    fn new_leaf(&self) -> Node<T> {
        if self.sparse {
            Node::Sparse(SparseLeaf::new(self.config.max_leaf_size))
        } else {
            Node::Leaf(Leaf::new(self.config.max_leaf_size))
        }
    }

    pub(crate) fn clear_all(&mut self) {
        self.root = None;
        self.count = 0;
        self.bump();
        if let Some(o) = self.observer.as_deref() {
            o.cleared();
        }
    }

    /// Exchanges the trees of two containers without touching any node.
    ///
    /// Each observer follows the tree it indexes, so observers are exchanged as well.
    pub(crate) fn swap(&mut self, other: &mut Self) {
        std::mem::swap(&mut self.root, &mut other.root);
        std::mem::swap(&mut self.count, &mut other.count);
        std::mem::swap(&mut self.observer, &mut other.observer);
        self.bump();
        other.bump();
    }

    pub(crate) fn set_observer(&mut self, observer: Option<SharedObserver<T>>) -> Option<SharedObserver<T>> {
        let previous = std::mem::replace(&mut self.observer, observer);
        if let (Some(root), Some(o)) = (self.root.as_deref(), self.observer.as_deref()) {
            root.announce_items(true, Some(o));
        }
        previous
    }

    pub(crate) fn check_invariants(&self) -> Result<()> {
        let Some(root) = self.root.as_deref() else {
            return if self.count == 0 {
                Ok(())
            } else {
                Err(AListError::Corrupt(format!("no root but count is {}", self.count)))
            };
        };
        if root.total() != self.count {
            return Err(AListError::Corrupt(format!(
                "root spans {} slots but count is {}",
                root.total(),
                self.count
            )));
        }
        if let Node::Inner(n) = root {
            if n.len() < 2 {
                return Err(AListError::Corrupt("inner root with fewer than two children".into()));
            }
        }
        let mut leaf_depth = None;
        self.check_node(root, true, 0, &mut leaf_depth)
    }

    fn check_node(&self, node: &Node<T>, is_root: bool, depth: usize, leaf_depth: &mut Option<usize>) -> Result<()> {
        let corrupt = |msg: String| Err(AListError::Corrupt(format!("depth {depth}: {msg}")));
        if node.local_count() > node.max_size() {
            return corrupt(format!("{} elements exceed capacity {}", node.local_count(), node.max_size()));
        }
        if !is_root && node.is_undersized() {
            return corrupt(format!("undersized node with {} of {}", node.local_count(), node.max_size()));
        }
        match node {
            Node::Leaf(_) | Node::Sparse(_) => {
                if matches!(node, Node::Sparse(_)) != self.sparse {
                    return corrupt("leaf variant does not match the container".into());
                }
                if let Node::Sparse(s) = node {
                    let ordered = s.entries().windows(2).all(|w| w[0].offset < w[1].offset);
                    let bounded = s.entries().last().map_or(true, |e| e.offset < s.total());
                    if !ordered || !bounded {
                        return corrupt("sparse offsets out of order or out of span".into());
                    }
                }
                match *leaf_depth {
                    None => *leaf_depth = Some(depth),
                    Some(d) if d != depth => return corrupt(format!("leaf at depth {depth}, expected {d}")),
                    Some(_) => {}
                }
                Ok(())
            }
            Node::Inner(n) => {
                let mut expected = 0;
                for e in n.entries() {
                    if e.base != expected {
                        return corrupt(format!("child base {} but preceding siblings span {expected}", e.base));
                    }
                    if e.node.total() == 0 {
                        return corrupt("empty child".into());
                    }
                    expected += e.node.total();
                    self.check_node(&e.node, false, depth + 1, leaf_depth)?;
                }
                Ok(())
            }
        }
    }
}

/// Replaces the root by a new inner node holding the old root and `right`.
fn grow_root<T>(slot: &mut Option<NodeRef<T>>, right: Node<T>, max_inner: u16, obs: Obs<'_, T>) {
    let Some(left) = slot.take() else { return };
    let right = Arc::new(right);
    right.announce_split_from(left.id(), None, obs);
    #[cfg(feature = "tracing")]
    tracing::trace!(height = left.height() + 1, "root split, tree grows");
    *slot = Some(Arc::new(Node::Inner(Inner::from_children(vec![left, right], max_inner))));
}

/// Drops empty roots and replaces single-child inner roots by their child.
fn shrink_root<T>(slot: &mut Option<NodeRef<T>>, obs: Obs<'_, T>) {
    loop {
        let next = match slot.as_deref() {
            Some(node) if node.total() == 0 => None,
            Some(Node::Inner(n)) if n.len() == 1 => Some(Arc::clone(&n.entries()[0].node)),
            _ => return,
        };
        #[cfg(feature = "tracing")]
        tracing::trace!(collapsed = next.is_some(), "root shrinks");
        if let (Some(o), Some(old), Some(new)) = (obs, slot.as_deref(), next.as_deref()) {
            o.child_replaced(old.id(), new.id(), None, None);
        }
        *slot = next;
    }
}

impl<T: Clone> AListBase<T> {
    pub(crate) fn set(&mut self, index: usize, value: T) -> Result<T> {
        let obs = self.observer.as_deref();
        match self.root.as_mut() {
            Some(root) => make_unique(root, None, obs).set(index, value, obs),
            None => Err(AListError::IndexOutOfRange { index, len: 0 }),
        }
    }

    pub(crate) fn insert(&mut self, index: usize, item: T) -> Result<()> {
        let leaf = self.new_leaf();
        let obs = self.observer.as_deref();
        let max_inner = self.config.max_inner_size;
        let root = self.root.get_or_insert_with(|| Arc::new(leaf));
        if root.is_leaf() && root.is_full() {
            let right = make_unique(root, None, obs).split();
            grow_root(&mut self.root, right, max_inner, obs);
        }
        if let Some(root) = self.root.as_mut() {
            if let Outcome::Split(right) = make_unique(root, None, obs).insert(index, item, obs)? {
                grow_root(&mut self.root, right, max_inner, obs);
            }
        }
        self.count += 1;
        self.bump();
        Ok(())
    }

    /// Runs a sparse operation at the root, growing the tree as needed.
    pub(crate) fn apply_sparse(&mut self, index: usize, op: &mut SparseOp<T>) -> Result<()> {
        let leaf = self.new_leaf();
        let obs = self.observer.as_deref();
        let max_inner = self.config.max_inner_size;
        self.root.get_or_insert_with(|| Arc::new(leaf));
        while let Some(root) = self.root.as_mut() {
            match make_unique(root, None, obs).apply_sparse(index, op, obs)? {
                Outcome::Full => {
                    let right = make_unique(root, None, obs).split();
                    grow_root(&mut self.root, right, max_inner, obs);
                }
                Outcome::Split(right) => {
                    grow_root(&mut self.root, right, max_inner, obs);
                    break;
                }
                Outcome::Done | Outcome::Undersized => break,
            }
        }
        shrink_root(&mut self.root, obs);
        Ok(())
    }

    pub(crate) fn remove_range(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        let obs = self.observer.as_deref();
        if index == 0 && count == self.count {
            if let Some(root) = self.root.take() {
                root.announce_items(false, obs);
            }
        } else if let Some(root) = self.root.as_mut() {
            make_unique(root, None, obs).remove_range(index, count, obs);
        }
        shrink_root(&mut self.root, obs);
        self.count -= count;
        self.bump();
    }

    /// A new container holding `[index, index + count)`, sharing whole subtrees.
    pub(crate) fn copy_section(&self, index: usize, count: usize) -> Self {
        let mut out = Self::new(self.config, self.sparse);
        if count == 0 {
            return out;
        }
        if index == 0 && count == self.count {
            return self.share();
        }
        out.root = self.root.as_ref().map(|r| Arc::new(r.copy_section(index, count)));
        shrink_root(&mut out.root, None);
        out.count = count;
        out
    }

    /// Returns `self` laid out with `config`, rebuilding it if the node sizes differ.
    /// Trees are only combined when their nodes share the same capacities.
    pub(crate) fn conform(self, config: AListConfig) -> Result<Self> {
        if self.config == config {
            return Ok(self);
        }
        let mut out = Self::new(config, self.sparse);
        if self.sparse {
            if self.count > 0 {
                out.apply_sparse(0, &mut SparseOp::insert_empty(self.count))?;
                out.count = self.count;
                for (index, item) in SetEntries::new(self.root()) {
                    out.apply_sparse(index, &mut SparseOp::replace_value(item.clone()))?;
                }
            }
        } else {
            out.count = self.count;
            out.root = bulk_load(Iter::new(self.root(), self.count).cloned().collect(), config);
        }
        Ok(out)
    }

    pub(crate) fn remove_section(&mut self, index: usize, count: usize) -> Self {
        let section = self.copy_section(index, count);
        self.remove_range(index, count);
        section
    }

    /// Concatenates `other` on the given side of this list.
    ///
    /// The shorter tree's top-level children are spliced onto the matching edge of
    /// the taller tree, so only the nodes along that edge are touched.
    pub(crate) fn combine(&mut self, mut other: AListBase<T>, side: Side) -> Result<()> {
        self.check_capacity(other.count)?;
        let Some(other_root) = other.root.take() else {
            return Ok(());
        };
        let added = other.count;
        let obs = self.observer.as_deref();
        let max_inner = self.config.max_inner_size;
        other_root.announce_items(true, obs);

        match self.root.take() {
            None => self.root = Some(other_root),
            Some(mine) => {
                let (hm, ho) = (mine.height(), other_root.height());
                let (mut host, guest, host_height, guest_height, side) = if hm >= ho {
                    (mine, other_root, hm, ho, side)
                } else {
                    let flipped = match side {
                        Side::Left => Side::Right,
                        Side::Right => Side::Left,
                    };
                    (other_root, mine, ho, hm, flipped)
                };
                #[cfg(feature = "tracing")]
                tracing::trace!(host_height, guest_height, ?side, "splicing trees");

                if host_height == 0 {
                    let children = match side {
                        Side::Right => vec![host, guest],
                        Side::Left => vec![guest, host],
                    };
                    let mut root = Arc::new(Node::Inner(Inner::from_children(children, max_inner)));
                    make_unique(&mut root, None, obs).repair_seam(1, obs);
                    self.root = Some(root);
                } else {
                    let (target, nodes) = if guest_height == 0 {
                        (1, vec![guest])
                    } else {
                        match Arc::unwrap_or_clone(guest) {
                            Node::Inner(n) => (guest_height, n.into_children()),
                            _ => unreachable!("a tree of height > 0 has an inner root"),
                        }
                    };
                    let outcome = make_unique(&mut host, None, obs).splice_edge(host_height, target, nodes, side, obs);
                    self.root = Some(host);
                    if let Outcome::Split(right) = outcome {
                        grow_root(&mut self.root, right, max_inner, obs);
                    }
                }
            }
        }
        shrink_root(&mut self.root, obs);
        self.count += added;
        self.bump();
        Ok(())
    }
}

/// Splits `items` into the fewest groups of at most `max`, with sizes differing by at most one.
fn chunk_balanced<X>(items: Vec<X>, max: usize) -> Vec<Vec<X>> {
    let n = items.len();
    let groups = n.div_ceil(max);
    let (q, r) = (n / groups, n % groups);
    let mut iter = items.into_iter();
    (0..groups)
        .map(|g| iter.by_ref().take(q + usize::from(g < r)).collect())
        .collect()
}

/// Builds a balanced dense tree bottom-up.
pub(crate) fn bulk_load<T>(items: Vec<T>, config: AListConfig) -> Option<NodeRef<T>> {
    if items.is_empty() {
        return None;
    }
    let mut level: Vec<NodeRef<T>> = chunk_balanced(items, config.max_leaf_size as usize)
        .into_iter()
        .map(|chunk| Arc::new(Node::Leaf(Leaf::from_vec(chunk, config.max_leaf_size))))
        .collect();
    while level.len() > 1 {
        level = chunk_balanced(level, config.max_inner_size as usize)
            .into_iter()
            .map(|group| Arc::new(Node::Inner(Inner::from_children(group, config.max_inner_size))))
            .collect();
    }
    level.pop()
}
