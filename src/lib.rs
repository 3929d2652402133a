extern crate alloc;

use std::cmp::Ordering;

use alloc::vec::Vec;

pub use iter::MadroneSortedIterator;
pub use map::MadroneMap;

mod iter;
mod map;

/*
no removal yet, so nothing ever vacates an arena slot and allocation is a plain
push. when removal lands, freed cells should chain into an intrusive free list
(storage[cell].parent links the free cells, head stored on the tree) so slots
can be recycled without shifting live nodes.
*/

#[derive(Debug, Default, Clone, Copy)]
#[repr(u8)]
enum NodeColor {
    #[default]
    Red,
    Black,
}

/// Non-owning handle to an arena slot. Slot 0 holds the end node.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeIndex(usize);

/// The end node. Its `left` slot holds the root, which makes it double as the
/// past-the-end position when climbing out of the tree.
pub(crate) const END: NodeIndex = NodeIndex(0);

#[derive(Debug, Clone)]
struct MadroneNode<K> {
    key: K,
    color: NodeColor,
    parent: NodeIndex,
    left: NodeIndex,
    right: NodeIndex,
}

impl<K> MadroneNode<K> {
    fn new_isolated(key: K) -> Self {
        Self {
            key,
            color: NodeColor::default(),
            parent: END,
            left: END,
            right: END,
        }
    }
}

impl<K: Default> Default for MadroneNode<K> {
    fn default() -> Self {
        Self {
            key: K::default(),
            color: NodeColor::default(),
            parent: END,
            left: END,
            right: END,
        }
    }
}

/// An ordered collection of unique keys, backed by a red-black tree whose
/// nodes live in a single arena.
///
/// Inserted keys stay put for the lifetime of the tree, so every link between
/// nodes is a plain index into the arena. Duplicate insertions are rejected
/// rather than stored.
#[derive(Debug, Clone)]
pub struct Madrone<K: Ord> {
    storage: Vec<MadroneNode<K>>,
    leftmost: NodeIndex,
    rightmost: NodeIndex,
    length: usize,
}

impl<K: Ord> Madrone<K> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Pre-sizes the arena for at least `additional` more insertions.
    pub fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    /// Drops every key, keeping only the end node.
    pub fn clear(&mut self) {
        self.storage.truncate(1);
        let end_node = &mut self.storage[END.0];
        end_node.parent = END;
        end_node.left = END;
        end_node.right = END;
        self.leftmost = END;
        self.rightmost = END;
        self.length = 0;
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Looks up the stored key equal to `key`.
    pub fn find(&self, key: &K) -> Option<&K> {
        let mut current_node = self.root();

        while current_node != END {
            let curr_node_storage = &self.storage[current_node.0];

            match key.cmp(&curr_node_storage.key) {
                Ordering::Less => {
                    current_node = curr_node_storage.left;
                }
                Ordering::Equal => {
                    return Some(&curr_node_storage.key);
                }
                Ordering::Greater => {
                    current_node = curr_node_storage.right;
                }
            }
        }

        None
    }

    /// Smallest stored key that is greater than or equal to `key`.
    pub fn lower_bound(&self, key: &K) -> Option<&K> {
        let candidate = self.lower_bound_idx(key);
        (candidate != END).then(|| &self.storage[candidate.0].key)
    }

    /// Mutable variant of [`Self::lower_bound`].
    ///
    /// The caller must not change how the key orders relative to its
    /// neighbors, only payload parts that the `Ord` impl ignores.
    pub fn lower_bound_mut(&mut self, key: &K) -> Option<&mut K> {
        let candidate = self.lower_bound_idx(key);

        if candidate != END {
            Some(&mut self.storage[candidate.0].key)
        } else {
            None
        }
    }

    /// Smallest stored key that is strictly greater than `key`.
    pub fn upper_bound(&self, key: &K) -> Option<&K> {
        let candidate = self.upper_bound_idx(key);
        (candidate != END).then(|| &self.storage[candidate.0].key)
    }

    /// Minimum key, tracked across insertions rather than searched for.
    #[must_use]
    pub fn first(&self) -> Option<&K> {
        (self.leftmost != END).then(|| &self.storage[self.leftmost.0].key)
    }

    /// Maximum key, tracked across insertions rather than searched for.
    #[must_use]
    pub fn last(&self) -> Option<&K> {
        (self.rightmost != END).then(|| &self.storage[self.rightmost.0].key)
    }

    /// Inserts `key` if no equal key is stored yet.
    ///
    /// Returns a reference to the stored key and whether a new node was
    /// created. When an equal key is already present the tree is left
    /// untouched and the existing key is returned with `false`.
    pub fn insert(&mut self, key: K) -> (&K, bool) {
        if self.is_empty() {
            let root = self.insert_root(key);
            return (&self.storage[root.0].key, true);
        }

        let (found, parent) = self.find_with_parent(&key);
        if found != END {
            return (&self.storage[found.0].key, false);
        }

        let new_node = self.insert_leaf(parent, key);
        (&self.storage[new_node.0].key, true)
    }

    /// Ordered iteration from the minimum key to the maximum.
    #[must_use]
    pub fn iter(&self) -> MadroneSortedIterator<'_, K> {
        MadroneSortedIterator {
            tree: self,
            front: self.leftmost,
            back: self.rightmost,
            remaining: self.length,
        }
    }

    fn root(&self) -> NodeIndex {
        self.storage[END.0].left
    }

    pub(crate) fn key_at(&self, idx: NodeIndex) -> &K {
        &self.storage[idx.0].key
    }

    /// Single descent locating `key` or, on a miss, the node a new key would
    /// attach under. Returns `(match-or-END, last visited node)`.
    fn find_with_parent(&self, key: &K) -> (NodeIndex, NodeIndex) {
        let mut current_node = self.root();
        let mut parent_node = END;

        while current_node != END {
            let curr_node_storage = &self.storage[current_node.0];

            match key.cmp(&curr_node_storage.key) {
                Ordering::Less => {
                    parent_node = current_node;
                    current_node = curr_node_storage.left;
                }
                Ordering::Equal => {
                    return (current_node, parent_node);
                }
                Ordering::Greater => {
                    parent_node = current_node;
                    current_node = curr_node_storage.right;
                }
            }
        }

        (END, parent_node)
    }

    fn lower_bound_idx(&self, key: &K) -> NodeIndex {
        let mut current_node = self.root();
        let mut candidate = END;

        while current_node != END {
            let curr_node_storage = &self.storage[current_node.0];

            match key.cmp(&curr_node_storage.key) {
                Ordering::Greater => {
                    current_node = curr_node_storage.right;
                }
                _ => {
                    candidate = current_node;
                    current_node = curr_node_storage.left;
                }
            }
        }

        candidate
    }

    fn upper_bound_idx(&self, key: &K) -> NodeIndex {
        let mut current_node = self.root();
        let mut candidate = END;

        while current_node != END {
            let curr_node_storage = &self.storage[current_node.0];

            match key.cmp(&curr_node_storage.key) {
                Ordering::Less => {
                    candidate = current_node;
                    current_node = curr_node_storage.left;
                }
                _ => {
                    current_node = curr_node_storage.right;
                }
            }
        }

        candidate
    }

    fn push_node(&mut self, key: K) -> NodeIndex {
        let new_node_pos = NodeIndex(self.storage.len());
        self.storage.push(MadroneNode::new_isolated(key));

        new_node_pos
    }

    fn insert_root(&mut self, key: K) -> NodeIndex {
        let root = self.push_node(key);

        self.storage[root.0].color = NodeColor::Black;
        self.storage[END.0].left = root;
        self.leftmost = root;
        self.rightmost = root;
        self.length = 1;

        root
    }

    fn insert_leaf(&mut self, parent_node: NodeIndex, key: K) -> NodeIndex {
        let goes_left = key < self.storage[parent_node.0].key;
        let new_node = self.push_node(key);

        self.storage[new_node.0].parent = parent_node;
        if goes_left {
            self.storage[parent_node.0].left = new_node;
        } else {
            self.storage[parent_node.0].right = new_node;
        }

        self.fix_red_violation(new_node);

        // rotations never move a fresh extreme away from the old one, so
        // child identity is enough to spot a new minimum or maximum
        if self.storage[self.leftmost.0].left == new_node {
            self.leftmost = new_node;
        } else if self.storage[self.rightmost.0].right == new_node {
            self.rightmost = new_node;
        }
        self.length += 1;

        #[cfg(debug_assertions)]
        debug_assert!(self.is_valid_red_black_tree());

        new_node
    }

    fn fix_red_violation(&mut self, start_node_idx: NodeIndex) {
        let mut curr_node = start_node_idx;

        while matches!(
            self.storage[self.storage[curr_node.0].parent.0].color,
            NodeColor::Red
        ) {
            let parent_idx = self.storage[curr_node.0].parent;
            // a red parent is never the root, so the grandparent is a real node
            let grandparent_idx = self.storage[parent_idx.0].parent;
            let grandparent = &self.storage[grandparent_idx.0];

            let parent_is_right_child = grandparent.right == parent_idx;
            let uncle = if parent_is_right_child {
                grandparent.left
            } else {
                grandparent.right
            };

            if matches!(self.storage[uncle.0].color, NodeColor::Red) {
                self.storage[parent_idx.0].color = NodeColor::Black;
                self.storage[uncle.0].color = NodeColor::Black;
                self.storage[grandparent_idx.0].color = NodeColor::Red;

                curr_node = grandparent_idx;
                continue;
            }

            let parent = &self.storage[parent_idx.0];
            if (parent_is_right_child && parent.left == curr_node)
                || (!parent_is_right_child && parent.right == curr_node)
            {
                if parent_is_right_child {
                    self.rotate_right(parent_idx);
                } else {
                    self.rotate_left(parent_idx);
                }

                curr_node = parent_idx;
                continue;
            }

            self.storage[parent_idx.0].color = NodeColor::Black;
            self.storage[grandparent_idx.0].color = NodeColor::Red;

            if parent_is_right_child {
                self.rotate_left(grandparent_idx);
            } else {
                self.rotate_right(grandparent_idx);
            }
        }

        // the recoloring case can climb all the way up and leave a red root
        let root = self.root();
        self.storage[root.0].color = NodeColor::Black;
    }

    fn rotate_left(&mut self, center: NodeIndex) {
        let parent_idx = self.storage[center.0].parent;
        let pivot_idx = self.storage[center.0].right;
        let inner_idx = self.storage[pivot_idx.0].left;

        self.storage[center.0].right = inner_idx;
        self.storage[inner_idx.0].parent = center;

        self.storage[pivot_idx.0].left = center;
        self.storage[center.0].parent = pivot_idx;
        self.storage[pivot_idx.0].parent = parent_idx;

        // the end node's left slot is the root, so a rotation at the root
        // re-targets it like any other child link
        if self.storage[parent_idx.0].right == center {
            self.storage[parent_idx.0].right = pivot_idx;
        } else {
            self.storage[parent_idx.0].left = pivot_idx;
        }
    }

    fn rotate_right(&mut self, center: NodeIndex) {
        let parent_idx = self.storage[center.0].parent;
        let pivot_idx = self.storage[center.0].left;
        let inner_idx = self.storage[pivot_idx.0].right;

        self.storage[center.0].left = inner_idx;
        self.storage[inner_idx.0].parent = center;

        self.storage[pivot_idx.0].right = center;
        self.storage[center.0].parent = pivot_idx;
        self.storage[pivot_idx.0].parent = parent_idx;

        if self.storage[parent_idx.0].right == center {
            self.storage[parent_idx.0].right = pivot_idx;
        } else {
            self.storage[parent_idx.0].left = pivot_idx;
        }
    }

    /// In-order successor of `idx`, or [`END`] past the maximum.
    pub(crate) fn successor(&self, idx: NodeIndex) -> NodeIndex {
        let right = self.storage[idx.0].right;
        if right != END {
            return self.min_in_subtree(right);
        }

        let mut curr_node = idx;
        let mut parent_node = self.storage[idx.0].parent;
        while self.storage[parent_node.0].right == curr_node {
            curr_node = parent_node;
            parent_node = self.storage[parent_node.0].parent;
        }

        parent_node
    }

    /// In-order predecessor of `idx`. Retreating from [`END`] reaches the
    /// maximum, since the end node's left slot holds the root.
    pub(crate) fn predecessor(&self, idx: NodeIndex) -> NodeIndex {
        let left = self.storage[idx.0].left;
        if left != END {
            return self.max_in_subtree(left);
        }

        let mut curr_node = idx;
        let mut parent_node = self.storage[idx.0].parent;
        while parent_node != END && self.storage[parent_node.0].left == curr_node {
            curr_node = parent_node;
            parent_node = self.storage[parent_node.0].parent;
        }

        parent_node
    }

    fn min_in_subtree(&self, subtree_root: NodeIndex) -> NodeIndex {
        let mut curr_node = subtree_root;
        while self.storage[curr_node.0].left != END {
            curr_node = self.storage[curr_node.0].left;
        }

        curr_node
    }

    fn max_in_subtree(&self, subtree_root: NodeIndex) -> NodeIndex {
        let mut curr_node = subtree_root;
        while self.storage[curr_node.0].right != END {
            curr_node = self.storage[curr_node.0].right;
        }

        curr_node
    }
}

impl<K: Default + Ord> Madrone<K> {
    #[must_use]
    pub fn new() -> Self {
        let mut end_node = MadroneNode::default();
        end_node.color = NodeColor::Black;

        Self {
            storage: alloc::vec![end_node],
            leftmost: END,
            rightmost: END,
            length: 0,
        }
    }
}

impl<K: Default + Ord> Default for Madrone<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> Extend<K> for Madrone<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Default + Ord> FromIterator<K> for Madrone<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut tree = Self::new();
        tree.extend(iter);

        tree
    }
}

#[cfg(any(test, debug_assertions))]
impl<K: Ord> Madrone<K> {
    /// Full structural sweep: coloring rules, black-height uniformity, link
    /// consistency, strict in-order keys and extreme caches.
    fn is_valid_red_black_tree(&self) -> bool {
        if self.length + 1 != self.storage.len() {
            return false;
        }
        if !matches!(self.storage[END.0].color, NodeColor::Black) {
            return false;
        }

        let root = self.root();
        if self.is_empty() {
            return root == END && self.leftmost == END && self.rightmost == END;
        }
        if matches!(self.storage[root.0].color, NodeColor::Red) {
            return false;
        }
        if self.storage[root.0].parent != END {
            return false;
        }

        // depth-first walk carrying the number of black nodes seen so far;
        // every missing child must close its path at the same black count
        let mut stack = alloc::vec![(root, 1usize)];
        let mut path_black_count = None;
        let mut reachable = 0usize;

        while let Some((idx, black_count)) = stack.pop() {
            reachable += 1;
            let node = &self.storage[idx.0];

            for child in [node.left, node.right] {
                if child == END {
                    if *path_black_count.get_or_insert(black_count) != black_count {
                        return false;
                    }
                    continue;
                }

                let child_node = &self.storage[child.0];
                if child_node.parent != idx {
                    return false;
                }
                if matches!(node.color, NodeColor::Red)
                    && matches!(child_node.color, NodeColor::Red)
                {
                    return false;
                }

                let child_black =
                    black_count + usize::from(matches!(child_node.color, NodeColor::Black));
                stack.push((child, child_black));
            }
        }

        if reachable != self.length {
            return false;
        }

        if self.min_in_subtree(root) != self.leftmost {
            return false;
        }

        let mut curr_node = self.leftmost;
        let mut last_seen = curr_node;
        let mut prev_key: Option<&K> = None;
        while curr_node != END {
            let key = &self.storage[curr_node.0].key;
            if let Some(prev) = prev_key {
                if prev >= key {
                    return false;
                }
            }
            prev_key = Some(key);
            last_seen = curr_node;
            curr_node = self.successor(curr_node);
        }

        last_seen == self.rightmost
    }

    #[cfg(test)]
    fn height(&self) -> usize {
        if self.is_empty() {
            return 0;
        }

        let mut max_depth = 0;
        let mut stack = alloc::vec![(self.root(), 1usize)];
        while let Some((idx, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            let node = &self.storage[idx.0];
            for child in [node.left, node.right] {
                if child != END {
                    stack.push((child, depth + 1));
                }
            }
        }

        max_depth
    }
}
