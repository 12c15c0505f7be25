// src/lib.rs
pub mod limits;
pub mod types;
pub mod util;

pub use types::table::TypeTable;
pub use types::{BOOL, INT, REAL, TypeFlags, TypeId, TypeIdVec, TypeKind};
