//! # nearpoly-types
//!
//! Core data types shared by the nearpoly index builder and query engine.
//!
//! - **Bounding boxes**: `BoundingBox`, including the zero sentinel used for
//!   geometries that carry no usable coordinates
//! - **Attributes**: `AttributeRecord`, `AttributeValue`
//! - **Query points**: `QueryPoint`
//!
//! All types are serializable with Serde and convert to and from the `geo`
//! crate's primitives.
//!
//! ## Examples
//!
//! ```rust
//! use nearpoly_types::bbox::BoundingBox;
//! use nearpoly_types::point::QueryPoint;
//!
//! let area = BoundingBox::new(8.29, 53.36, 11.3, 55.05);
//! let kiel = QueryPoint::new(54.32, 10.13);
//! assert!(area.contains_point(kiel.lon, kiel.lat));
//! ```

pub mod attributes;
pub mod bbox;
pub mod point;
