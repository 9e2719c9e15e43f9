//! Address-ordered block index.
//!
//! An insert-only red-black tree over block base addresses. Nodes live in
//! a `Vec` and refer to each other by index; a node's index is the index
//! of the block it describes, so the tree doubles as the block numbering
//! used by bulk scans.
//!
//! Red-black keeps the height within `2 log2(n + 1)` with a one-bit
//! color per node, and its insert fix-up is a short, well-known case
//! list.
//!
//! Blocks are never removed individually (they go away together in
//! `free_all`), so only the insert fix-up is needed.

const NIL: usize = usize::MAX;

#[derive(Clone, Copy, Debug)]
struct Node {
    key: usize,
    left: usize,
    right: usize,
    parent: usize,
    red: bool,
}

/// Red-black tree mapping block base addresses to block indices.
#[derive(Clone, Debug)]
pub struct BlockTree {
    nodes: Vec<Node>,
    root: usize,
}

impl Default for BlockTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockTree {
    /// Empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: NIL,
        }
    }

    /// Number of keys in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if nothing has been inserted.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = NIL;
    }

    /// Base address recorded for block `index`.
    pub fn key(&self, index: usize) -> Option<usize> {
        self.nodes.get(index).map(|n| n.key)
    }

    /// Insert `key` and return its index (insertion order, from 0).
    ///
    /// Keys are block base addresses and therefore distinct.
    pub fn insert(&mut self, key: usize) -> usize {
        let z = self.nodes.len();
        let mut parent = NIL;
        let mut cursor = self.root;
        while cursor != NIL {
            parent = cursor;
            debug_assert_ne!(self.nodes[cursor].key, key, "duplicate block address");
            cursor = if key < self.nodes[cursor].key {
                self.nodes[cursor].left
            } else {
                self.nodes[cursor].right
            };
        }

        self.nodes.push(Node {
            key,
            left: NIL,
            right: NIL,
            parent,
            red: true,
        });
        if parent == NIL {
            self.root = z;
        } else if key < self.nodes[parent].key {
            self.nodes[parent].left = z;
        } else {
            self.nodes[parent].right = z;
        }

        self.fix_insert(z);
        z
    }

    /// Index of the block with the greatest base address `<= addr`.
    ///
    /// Whether `addr` actually lies inside that block is for the caller to
    /// check against the block size.
    pub fn resolve(&self, addr: usize) -> Option<usize> {
        let mut best = None;
        let mut cursor = self.root;
        while cursor != NIL {
            let node = &self.nodes[cursor];
            if addr >= node.key {
                best = Some(cursor);
                cursor = node.right;
            } else {
                cursor = node.left;
            }
        }
        best
    }

    /// Longest root-to-leaf path, in nodes.
    pub fn height(&self) -> usize {
        fn walk(tree: &BlockTree, at: usize) -> usize {
            if at == NIL {
                return 0;
            }
            let n = &tree.nodes[at];
            1 + walk(tree, n.left).max(walk(tree, n.right))
        }
        walk(self, self.root)
    }

    fn is_red(&self, at: usize) -> bool {
        at != NIL && self.nodes[at].red
    }

    fn fix_insert(&mut self, mut z: usize) {
        while z != self.root && self.is_red(self.nodes[z].parent) {
            let p = self.nodes[z].parent;
            // A red parent is never the root, so the grandparent exists.
            let g = self.nodes[p].parent;
            if p == self.nodes[g].left {
                let uncle = self.nodes[g].right;
                if self.is_red(uncle) {
                    self.nodes[p].red = false;
                    self.nodes[uncle].red = false;
                    self.nodes[g].red = true;
                    z = g;
                } else {
                    if z == self.nodes[p].right {
                        z = p;
                        self.rotate_left(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].red = false;
                    self.nodes[g].red = true;
                    self.rotate_right(g);
                }
            } else {
                let uncle = self.nodes[g].left;
                if self.is_red(uncle) {
                    self.nodes[p].red = false;
                    self.nodes[uncle].red = false;
                    self.nodes[g].red = true;
                    z = g;
                } else {
                    if z == self.nodes[p].left {
                        z = p;
                        self.rotate_right(z);
                    }
                    let p = self.nodes[z].parent;
                    let g = self.nodes[p].parent;
                    self.nodes[p].red = false;
                    self.nodes[g].red = true;
                    self.rotate_left(g);
                }
            }
        }
        let root = self.root;
        self.nodes[root].red = false;
    }

    fn rotate_left(&mut self, x: usize) {
        let y = self.nodes[x].right;
        let y_left = self.nodes[y].left;
        self.nodes[x].right = y_left;
        if y_left != NIL {
            self.nodes[y_left].parent = x;
        }
        self.replace_child(x, y);
        self.nodes[y].left = x;
        self.nodes[x].parent = y;
    }

    fn rotate_right(&mut self, x: usize) {
        let y = self.nodes[x].left;
        let y_right = self.nodes[y].right;
        self.nodes[x].left = y_right;
        if y_right != NIL {
            self.nodes[y_right].parent = x;
        }
        self.replace_child(x, y);
        self.nodes[y].right = x;
        self.nodes[x].parent = y;
    }

    /// Hang `y` where `x` used to hang.
    fn replace_child(&mut self, x: usize, y: usize) {
        let parent = self.nodes[x].parent;
        self.nodes[y].parent = parent;
        if parent == NIL {
            self.root = y;
        } else if self.nodes[parent].left == x {
            self.nodes[parent].left = y;
        } else {
            self.nodes[parent].right = y;
        }
    }

    /// Check ordering, colouring and black-height. Returns the black height.
    #[cfg(test)]
    fn check(&self) -> usize {
        fn walk(tree: &BlockTree, at: usize, lo: usize, hi: usize) -> usize {
            if at == NIL {
                return 1;
            }
            let n = &tree.nodes[at];
            assert!(n.key >= lo && n.key <= hi, "ordering violated");
            if n.red {
                assert!(!tree.is_red(n.left) && !tree.is_red(n.right), "red-red");
            }
            if n.left != NIL {
                assert_eq!(tree.nodes[n.left].parent, at);
            }
            if n.right != NIL {
                assert_eq!(tree.nodes[n.right].parent, at);
            }
            let l = walk(tree, n.left, lo, n.key.saturating_sub(1));
            let r = walk(tree, n.right, n.key.saturating_add(1), hi);
            assert_eq!(l, r, "black height mismatch");
            l + usize::from(!n.red)
        }
        assert!(!self.is_red(self.root));
        walk(self, self.root, 0, usize::MAX)
    }
}
