//! Binary index artifact.
//!
//! The artifact is the tree buffer itself, in the Flatbush layout shared by
//! `geo_index` and the JavaScript `flatbush` package. All integers and floats
//! are little-endian.
//!
//! | offset | size | field                                         |
//! |--------|------|-----------------------------------------------|
//! | 0      | 1    | magic `0xfb`                                  |
//! | 1      | 1    | format version (high nibble), coordinate type |
//! | 2      | 2    | node size (u16)                               |
//! | 4      | 4    | item count (u32)                              |
//! | 8      | 32n  | node boxes, all levels, leaves first (f64)    |
//! | ...    | 2n   | leaf IDs / child offsets (u16, or u32 when    |
//! |        | or 4n| the tree has 16384 nodes or more)             |
//!
//! `n` is the total node count, derived from item count and node size.

use crate::error::{NearpolyError, Result};
use crate::index::packed::PackedIndex;
use bytes::{Buf, Bytes};
use geo_index::rtree::{RTreeIndex, RTreeRef};
use nearpoly_types::bbox::BoundingBox;

pub const INDEX_MAGIC: u8 = 0xfb;
pub const HEADER_LEN: usize = 8;

/// Serialize a tree. Identical inputs always produce identical bytes.
pub fn encode(index: &PackedIndex) -> Bytes {
    index.as_bytes().clone()
}

/// Deserialize and validate a tree.
///
/// Fails with [`NearpolyError::CorruptIndex`] on a bad magic, version or
/// coordinate type, a length that does not match the header, inverted or
/// non-finite node boxes, or leaf IDs that are not a permutation of
/// `0..count`.
pub fn decode(data: &[u8]) -> Result<PackedIndex> {
    let corrupt = |msg: String| NearpolyError::CorruptIndex(msg);

    if data.len() < HEADER_LEN {
        return Err(corrupt(format!(
            "artifact is {} bytes, shorter than the {}-byte header",
            data.len(),
            HEADER_LEN
        )));
    }

    let mut header = &data[..HEADER_LEN];
    if header.get_u8() != INDEX_MAGIC {
        return Err(corrupt("bad magic".to_string()));
    }
    let _version_and_type = header.get_u8();
    let node_size = header.get_u16_le();
    if node_size < 2 {
        return Err(corrupt(format!("node size {} is below 2", node_size)));
    }
    let num_items = header.get_u32_le() as usize;
    if num_items == 0 {
        return Err(corrupt("index holds no items".to_string()));
    }

    let tree = RTreeRef::<f64>::try_new(&data).map_err(|e| corrupt(e.to_string()))?;
    let boxes = tree.boxes();
    let num_nodes = boxes.len() / 4;

    let node_boxes: Vec<BoundingBox> = boxes
        .chunks_exact(4)
        .map(|c| BoundingBox::new(c[0], c[1], c[2], c[3]))
        .collect();
    if let Some(pos) = node_boxes.iter().position(|b| !is_well_formed(b)) {
        return Err(corrupt(format!("node {} has an inverted box", pos)));
    }

    let indices = tree.indices();
    let mut leaves: Vec<Option<BoundingBox>> = vec![None; num_items];
    for (pos, leaf) in node_boxes.iter().take(num_items).enumerate() {
        let id = indices.get(pos);
        match leaves.get_mut(id) {
            Some(slot) if slot.is_none() => *slot = Some(*leaf),
            Some(_) => return Err(corrupt(format!("leaf id {} appears twice", id))),
            None => return Err(corrupt(format!("leaf id {} out of range", id))),
        }
    }
    let leaf_boxes: Vec<BoundingBox> = leaves.into_iter().flatten().collect();

    Ok(PackedIndex::from_parts(
        Bytes::copy_from_slice(data),
        leaf_boxes,
        node_size,
        num_nodes,
    ))
}

fn is_well_formed(b: &BoundingBox) -> bool {
    b.min_x.is_finite()
        && b.min_y.is_finite()
        && b.max_x.is_finite()
        && b.max_y.is_finite()
        && b.min_x <= b.max_x
        && b.min_y <= b.max_y
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOX_LEN: usize = 4 * size_of::<f64>();

    fn sample() -> PackedIndex {
        let boxes: Vec<BoundingBox> = (0..40)
            .map(|i| {
                let x = (i * 7 % 13) as f64;
                let y = (i * 5 % 11) as f64;
                BoundingBox::new(x, y, x + 1.0, y + 2.0)
            })
            .collect();
        PackedIndex::build(&boxes, 4).unwrap()
    }

    fn assert_corrupt(data: &[u8]) {
        assert!(matches!(decode(data), Err(NearpolyError::CorruptIndex(_))));
    }

    #[test]
    fn test_decode_restores_the_index() {
        let index = sample();
        let decoded = decode(&encode(&index)).unwrap();
        assert_eq!(decoded, index);
        assert_eq!(
            decoded.nearest(3.0, 3.0, 10).unwrap(),
            index.nearest(3.0, 3.0, 10).unwrap()
        );
    }

    #[test]
    fn test_header_fields() {
        let bytes = encode(&sample());
        assert_eq!(bytes[0], INDEX_MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[2], bytes[3]]), 4);
        assert_eq!(
            u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            40
        );
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = encode(&sample()).to_vec();
        bytes[0] = b'X';
        assert_corrupt(&bytes);
    }

    #[test]
    fn test_rejects_foreign_coordinate_type() {
        let mut bytes = encode(&sample()).to_vec();
        bytes[1] ^= 0x0f;
        assert_corrupt(&bytes);
    }

    #[test]
    fn test_rejects_truncation_and_padding() {
        let bytes = encode(&sample()).to_vec();
        assert_corrupt(&bytes[..bytes.len() - 1]);
        assert_corrupt(&bytes[..HEADER_LEN - 1]);

        let mut padded = bytes.clone();
        padded.extend_from_slice(&[0; 8]);
        assert_corrupt(&padded);
    }

    #[test]
    fn test_rejects_duplicate_leaf_ids() {
        let index = sample();
        let mut bytes = encode(&index).to_vec();
        // Fewer than 16384 nodes: offsets are u16.
        let ids_start = HEADER_LEN + index.num_nodes() * BOX_LEN;
        let first = [bytes[ids_start], bytes[ids_start + 1]];
        bytes[ids_start + 2..ids_start + 4].copy_from_slice(&first);
        assert_corrupt(&bytes);
    }

    #[test]
    fn test_rejects_inverted_box() {
        let mut bytes = encode(&sample()).to_vec();
        // min_x of the first node box
        bytes[HEADER_LEN..HEADER_LEN + 8].copy_from_slice(&1e9f64.to_le_bytes());
        assert_corrupt(&bytes);
    }
}
