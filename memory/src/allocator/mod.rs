//! This module provides the buddy sub-allocator
//! and dedicated memory blocks for requests that don't fit it.

mod buddy;
mod dedicated;

pub use self::{
    buddy::{BuddyAllocation, BuddyBlock, BuddyConfig, MAX_LEVELS},
    dedicated::DedicatedBlock,
};
