//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod algorithms;
pub mod arena;
pub mod chart;
pub mod entities;
pub mod error;
pub mod ids;

pub use arena::{NodeData, OrgTree, TreeNode};
pub use chart::{DropTarget, Installation, OrgChart, Transition};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use ids::{IdGenerator, SequentialIds, UuidGenerator};
