//! Static packed Hilbert R-tree over per-area bounding boxes.
//!
//! The tree is a `geo_index` R-tree in its Flatbush-compatible buffer
//! layout: leaves sorted along a Hilbert curve, parents packed level by
//! level above them. [`PackedIndex`] keeps that buffer next to the leaf boxes
//! in ID order, so alignment and sentinel checks never walk the tree.

use crate::error::{NearpolyError, Result};
use bytes::Bytes;
use geo_index::rtree::sort::HilbertSort;
use geo_index::rtree::{RTreeBuilder, RTreeIndex, RTreeRef};
use nearpoly_types::bbox::BoundingBox;

/// Immutable packed tree. Safe to share across threads for reading.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedIndex {
    buffer: Bytes,
    leaf_boxes: Vec<BoundingBox>,
    /// Coverage of every non-sentinel leaf.
    bounds: BoundingBox,
    usable: usize,
    node_size: u16,
    num_nodes: usize,
}

impl PackedIndex {
    /// Bulk-load a tree from per-ID boxes. Box `i` becomes the leaf for ID `i`.
    pub fn build(boxes: &[BoundingBox], node_size: u16) -> Result<Self> {
        if boxes.is_empty() {
            return Err(NearpolyError::EmptyDataset);
        }
        if node_size < 2 {
            return Err(NearpolyError::InvalidConfig(format!(
                "node size must be at least 2, got {}",
                node_size
            )));
        }
        let num_items = u32::try_from(boxes.len()).map_err(|_| {
            NearpolyError::InvalidInput(format!(
                "{} items exceed the 32-bit ID space",
                boxes.len()
            ))
        })?;

        let mut builder = RTreeBuilder::<f64>::new_with_node_size(num_items, node_size);
        for b in boxes {
            builder.add(b.min_x, b.min_y, b.max_x, b.max_y);
        }
        let tree = builder.finish::<HilbertSort>();
        let num_nodes = tree.boxes().len() / 4;

        Ok(Self::from_parts(
            Bytes::from(tree.into_inner()),
            boxes.to_vec(),
            node_size,
            num_nodes,
        ))
    }

    /// Assemble an index from a validated tree buffer and its leaf boxes in
    /// ID order.
    pub(crate) fn from_parts(
        buffer: Bytes,
        leaf_boxes: Vec<BoundingBox>,
        node_size: u16,
        num_nodes: usize,
    ) -> Self {
        let bounds = coverage(leaf_boxes.iter());
        let usable = leaf_boxes.iter().filter(|b| !b.is_sentinel()).count();
        Self {
            buffer,
            leaf_boxes,
            bounds,
            usable,
            node_size,
            num_nodes,
        }
    }

    /// Number of leaves (areas).
    pub fn len(&self) -> usize {
        self.leaf_boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_boxes.is_empty()
    }

    /// Leaves with a real box, sentinels excluded.
    pub fn usable_len(&self) -> usize {
        self.usable
    }

    /// Branching factor.
    pub fn node_size(&self) -> u16 {
        self.node_size
    }

    /// Number of nodes across all levels, leaves included.
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Coverage of all non-sentinel leaves, or the sentinel if there are none.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Leaf box for area `id`.
    pub fn leaf_box(&self, id: u32) -> Option<BoundingBox> {
        self.leaf_boxes.get(id as usize).copied()
    }

    /// Leaf boxes in ID order.
    pub fn leaf_boxes(&self) -> impl Iterator<Item = BoundingBox> + '_ {
        self.leaf_boxes.iter().copied()
    }

    /// The serialized tree.
    pub fn as_bytes(&self) -> &Bytes {
        &self.buffer
    }

    fn tree(&self) -> Result<RTreeRef<'_, f64>> {
        RTreeRef::try_new(&self.buffer).map_err(|e| NearpolyError::CorruptIndex(e.to_string()))
    }

    /// IDs whose leaf boxes intersect `query`, in ascending order.
    pub fn range(&self, query: &BoundingBox) -> Result<Vec<u32>> {
        let mut ids = self
            .tree()?
            .search(query.min_x, query.min_y, query.max_x, query.max_y);
        ids.sort_unstable();
        Ok(ids)
    }

    /// The `k` IDs whose leaf boxes are closest to `(x, y)` (longitude,
    /// latitude), nearest first.
    ///
    /// Distance is planar and measured on boxes, so it only bounds the true
    /// area distance; callers rank candidates exactly afterwards. Equal box
    /// distances come back in no particular order. Returns `min(k, len())`
    /// IDs.
    pub fn nearest(&self, x: f64, y: f64, k: usize) -> Result<Vec<u32>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        Ok(self.tree()?.neighbors(x, y, Some(k), None))
    }
}

/// Union of all non-sentinel boxes.
fn coverage<'a>(boxes: impl Iterator<Item = &'a BoundingBox>) -> BoundingBox {
    boxes
        .filter(|b| !b.is_sentinel())
        .copied()
        .reduce(|acc, b| acc.union(&b))
        .unwrap_or(BoundingBox::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(n: usize) -> Vec<BoundingBox> {
        (0..n)
            .map(|i| {
                let x = (i % 10) as f64;
                let y = (i / 10) as f64;
                BoundingBox::new(x, y, x + 0.5, y + 0.5)
            })
            .collect()
    }

    fn box_distance(b: &BoundingBox, x: f64, y: f64) -> f64 {
        let dx = (b.min_x - x).max(0.0).max(x - b.max_x);
        let dy = (b.min_y - y).max(0.0).max(y - b.max_y);
        dx * dx + dy * dy
    }

    #[test]
    fn test_build_empty_fails() {
        assert!(matches!(
            PackedIndex::build(&[], 16),
            Err(NearpolyError::EmptyDataset)
        ));
    }

    #[test]
    fn test_build_rejects_small_node_size() {
        assert!(matches!(
            PackedIndex::build(&grid(4), 1),
            Err(NearpolyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_leaf_alignment() {
        let boxes = grid(57);
        let index = PackedIndex::build(&boxes, 4).unwrap();

        assert_eq!(index.len(), 57);
        assert_eq!(index.usable_len(), 57);
        assert_eq!(index.leaf_boxes().collect::<Vec<_>>(), boxes);
        assert_eq!(index.leaf_box(57), None);
        assert_eq!(index.bounds(), BoundingBox::new(0.0, 0.0, 9.5, 5.5));
    }

    #[test]
    fn test_range_matches_brute_force() {
        let boxes = grid(100);
        let index = PackedIndex::build(&boxes, 4).unwrap();
        let query = BoundingBox::new(2.2, 3.7, 5.1, 6.0);

        let expected: Vec<u32> = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| b.intersects(&query))
            .map(|(id, _)| id as u32)
            .collect();
        assert_eq!(index.range(&query).unwrap(), expected);

        let far = BoundingBox::new(50.0, 50.0, 60.0, 60.0);
        assert!(index.range(&far).unwrap().is_empty());
    }

    #[test]
    fn test_nearest_count_bounds() {
        let index = PackedIndex::build(&grid(30), 4).unwrap();
        assert!(index.nearest(1.0, 1.0, 0).unwrap().is_empty());
        assert_eq!(index.nearest(1.0, 1.0, 7).unwrap().len(), 7);
        assert_eq!(index.nearest(1.0, 1.0, 30).unwrap().len(), 30);
        assert_eq!(index.nearest(1.0, 1.0, 500).unwrap().len(), 30);
        assert_eq!(index.nearest(-170.0, 80.0, 3).unwrap().len(), 3);
    }

    #[test]
    fn test_nearest_matches_brute_force_distances() {
        let boxes = grid(100);
        let (x, y) = (4.3, 7.9);

        let mut expected: Vec<f64> = boxes.iter().map(|b| box_distance(b, x, y)).collect();
        expected.sort_by(f64::total_cmp);
        expected.truncate(12);

        for node_size in [2, 3, 4, 16] {
            let index = PackedIndex::build(&boxes, node_size).unwrap();
            let got: Vec<f64> = index
                .nearest(x, y, 12)
                .unwrap()
                .into_iter()
                .map(|id| box_distance(&boxes[id as usize], x, y))
                .collect();
            assert_eq!(got, expected, "node size {}", node_size);
        }
    }

    #[test]
    fn test_single_item() {
        let index = PackedIndex::build(&[BoundingBox::new(1.0, 1.0, 2.0, 2.0)], 16).unwrap();
        assert_eq!(index.nearest(100.0, 0.0, 5).unwrap(), vec![0]);
        assert_eq!(
            index.range(&BoundingBox::new(1.5, 1.5, 1.6, 1.6)).unwrap(),
            vec![0]
        );
    }

    #[test]
    fn test_sentinels_stay_leaves_but_not_coverage() {
        let boxes = vec![
            BoundingBox::new(10.0, 10.0, 11.0, 11.0),
            BoundingBox::ZERO,
            BoundingBox::new(12.0, 12.0, 13.0, 13.0),
        ];
        let index = PackedIndex::build(&boxes, 2).unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.usable_len(), 2);
        assert_eq!(index.leaf_box(1), Some(BoundingBox::ZERO));
        assert_eq!(index.bounds(), BoundingBox::new(10.0, 10.0, 13.0, 13.0));
        assert_eq!(index.nearest(0.0, 0.0, 1).unwrap(), vec![1]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let boxes = grid(64);
        let a = PackedIndex::build(&boxes, 8).unwrap();
        let b = PackedIndex::build(&boxes, 8).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_bytes(), b.as_bytes());
    }
}
