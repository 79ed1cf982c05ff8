mod component;
mod frame_cache;
mod pose;
mod state_machine;

pub use component::*;
pub use frame_cache::*;
pub use pose::*;
pub use state_machine::*;


#[cfg(test)]
mod pose_tests;
