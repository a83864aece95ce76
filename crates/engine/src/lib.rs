// folio-engine: page-tree maintenance and document synchronization.

pub mod config;
pub mod gateway;
pub mod reorder;
pub mod sidebar;
pub mod sync;
pub mod tree;
