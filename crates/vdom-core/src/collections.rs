//! Map types used for bookkeeping that does not need a stable order.
//!
//! Ordered data (props, styles, rendered children) always goes through
//! `indexmap`; everything else picks its hasher from the `std-hash` feature.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use hashbrown::{HashMap, HashSet};
}
