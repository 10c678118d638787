//! A frame graph for a vulkan-style renderer. Rendering code declares passes and the resources
//! they read and write; the graph derives resource lifetimes, recycles transient resources across
//! frames, and synthesizes the minimal set of barriers, queue-ownership transfers, and semaphores
//! required for correct execution.

pub mod graph;

pub use opal_api::OpalResult;

pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
