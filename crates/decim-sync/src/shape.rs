//! Reduction-tree shape shared by the barrier and the striped counter.
//!
//! Leaves are laid out first, then each level groups up to `fanout`
//! consecutive nodes of the level below under one parent, until a single
//! root remains. Every internal node's reset value is its child count.

use smallvec::SmallVec;

/// Flattened tree: node `i` has `resets[i]` and `parents[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct TreeShape {
    pub(crate) resets: Vec<i32>,
    pub(crate) parents: Vec<Option<usize>>,
    /// Number of levels, leaves included.
    pub(crate) depth: usize,
}

impl TreeShape {
    /// Build on top of `leaf_resets`. Requires at least one leaf and
    /// `fanout >= 2`.
    pub(crate) fn build(leaf_resets: &[i32], fanout: usize) -> Self {
        debug_assert!(!leaf_resets.is_empty() && fanout >= 2);
        let mut resets: Vec<i32> = leaf_resets.to_vec();
        let mut parents: Vec<Option<usize>> = vec![None; leaf_resets.len()];
        let mut levels: SmallVec<[(usize, usize); 8]> = SmallVec::new();
        levels.push((0, leaf_resets.len()));

        loop {
            let (start, end) = levels[levels.len() - 1];
            let width = end - start;
            if width <= 1 {
                break;
            }
            let next_start = resets.len();
            for (group, first) in (start..end).step_by(fanout).enumerate() {
                let last = (first + fanout).min(end);
                for child in first..last {
                    parents[child] = Some(next_start + group);
                }
                resets.push((last - first) as i32);
                parents.push(None);
            }
            levels.push((next_start, resets.len()));
        }

        Self {
            resets,
            parents,
            depth: levels.len(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.resets.len()
    }
}
