mod graph_resource_cache;
pub use graph_resource_cache::RenderGraphCache;

mod graph_registry;
pub use graph_registry::GraphBufferId;
pub use graph_registry::GraphTextureId;
pub use graph_registry::RenderGraphRegistry;

mod graph_builder;
pub use graph_builder::RenderGraphBuilder;

mod graph_pass;
pub use graph_pass::AttachmentClearValue;
pub use graph_pass::PassExecutable;
pub use graph_pass::RenderGraphAccess;
pub use graph_pass::RenderGraphPassType;

mod blackboard;
pub use blackboard::Blackboard;
pub use blackboard::BlackboardValue;

mod render_graph;
pub use render_graph::RenderGraph;
pub use render_graph::RenderGraphStats;

#[cfg(test)]
mod graph_tests;

pub type RenderGraphResourceName = &'static str;
pub type RenderGraphPassName = &'static str;
