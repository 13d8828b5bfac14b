//! Reference pickle encoder.
//!
//! Values are built as an explicit graph of nodes so that sharing is real
//! sharing: two slots holding the same [`NodeId`] are one object, and the
//! encoder's memo emits a back-reference the second time it meets it. A
//! container may hold the id of one of its ancestors, which is how
//! self-referential structures are expressed.
//!
//! The encoder follows CPython's `pickle` module opcode choices for protocols
//! 0 through [`HIGHEST_PROTOCOL`], so a stream produced here is what a Python
//! program would have handed to an unpickler.
//!
//! ```
//! use pickle_ref::{Graph, to_vec};
//!
//! let mut graph = Graph::new();
//! let n = graph.int(256);
//! assert_eq!(to_vec(&graph, n, 2).unwrap(), b"\x80\x02M\x00\x01.");
//! ```

pub mod error;
pub mod long;
pub mod opcodes;
pub mod pickler;
pub mod repr;
pub mod value;

pub use error::PickleError;
pub use pickler::{Pickler, to_vec};
pub use value::{Graph, Node, NodeId, TypedArray};

/// Lowest protocol version the format defines.
pub const LOWEST_PROTOCOL: u8 = 0;

/// Highest protocol version this encoder can emit.
pub const HIGHEST_PROTOCOL: u8 = 5;
