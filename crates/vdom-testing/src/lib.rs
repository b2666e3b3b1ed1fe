//! Testing utilities and harness for the vdom reconciler

pub mod testing;

// Re-export testing utilities
pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use vdom_core::*;
}
