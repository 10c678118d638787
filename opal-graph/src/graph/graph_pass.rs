use super::{GraphBufferId, GraphTextureId, RenderGraphPassName, RenderGraphRegistry};
use opal_api::{
    OpalColorClearValue, OpalDepthStencilClearValue, OpalLoadOp, OpalQueueType, OpalResourceState,
    OpalResult, OpalSemaphore, OpalSemaphoreWait, OpalStoreOp,
};
use opal_api::CommandWriter;
use std::fmt::Formatter;

/// How a pass touches a resource. `ReadWrite` is a single access that both consumes and produces
/// the resource contents (storage image/buffer style).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderGraphAccess {
    Read,
    Write,
    ReadWrite,
}

/// Whether a pass records inside an implicit renderpass scope or receives the raw command writer
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderGraphPassType {
    /// The graph wraps the pass in a begin/end renderpass using the accumulated attachment
    /// metadata, resolving cached renderpass/framebuffer objects by descriptor
    Render,

    /// Raw command recording, typically compute or transfer work
    Callback,
}

/// The deferred half of a pass. Produced by the pass construction callback, consumed exactly once
/// during evaluation.
pub trait PassExecutable {
    fn execute(
        self: Box<Self>,
        registry: &mut RenderGraphRegistry,
        command_writer: &mut dyn CommandWriter,
    ) -> OpalResult<()>;
}

impl<F> PassExecutable for F
where
    F: FnOnce(&mut RenderGraphRegistry, &mut dyn CommandWriter) -> OpalResult<()>,
{
    fn execute(
        self: Box<Self>,
        registry: &mut RenderGraphRegistry,
        command_writer: &mut dyn CommandWriter,
    ) -> OpalResult<()> {
        (*self)(registry, command_writer)
    }
}

/// Clear value for either a color attachment or depth/stencil attachment
#[derive(Clone, Copy, Debug)]
pub enum AttachmentClearValue {
    Color(OpalColorClearValue),
    DepthStencil(OpalDepthStencilClearValue),
}

impl AttachmentClearValue {
    pub(super) fn to_color_clear_value(self) -> OpalColorClearValue {
        match self {
            AttachmentClearValue::Color(color) => color,
            _ => panic!("expected a color clear value"),
        }
    }

    pub(super) fn to_depth_stencil_clear_value(self) -> OpalDepthStencilClearValue {
        match self {
            AttachmentClearValue::DepthStencil(value) => value,
            _ => panic!("expected a depth/stencil clear value"),
        }
    }
}

/// One declared texture access within a pass
#[derive(Debug, Copy, Clone)]
pub struct RenderGraphTextureAccess {
    pub texture: GraphTextureId,
    pub state: OpalResourceState,
}

/// One declared buffer access within a pass
#[derive(Debug, Copy, Clone)]
pub struct RenderGraphBufferAccess {
    pub buffer: GraphBufferId,
    pub state: OpalResourceState,
}

#[derive(Debug, Clone)]
pub struct RenderGraphColorAttachmentInfo {
    pub texture: GraphTextureId,
    pub load_op: OpalLoadOp,
    pub store_op: OpalStoreOp,
    pub clear_value: Option<OpalColorClearValue>,
    pub array_slice: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct RenderGraphDepthAttachmentInfo {
    pub texture: GraphTextureId,
    pub load_op: OpalLoadOp,
    pub store_op: OpalStoreOp,
    pub clear_value: Option<OpalDepthStencilClearValue>,
    pub array_slice: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct RenderGraphResolveAttachmentInfo {
    pub texture: GraphTextureId,
    pub store_op: OpalStoreOp,
    pub array_slice: Option<u16>,
}

//
// The three barrier shapes the compiler can attach to a pass: a same-queue state transition, and
// the two sides of a queue-family-ownership transfer.
//

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassTextureBarrier {
    pub texture: GraphTextureId,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassTextureAcquireBarrier {
    pub texture: GraphTextureId,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
    pub source_queue: OpalQueueType,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassTextureReleaseBarrier {
    pub texture: GraphTextureId,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
    pub destination_queue: OpalQueueType,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassBufferBarrier {
    pub buffer: GraphBufferId,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassBufferAcquireBarrier {
    pub buffer: GraphBufferId,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
    pub source_queue: OpalQueueType,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PassBufferReleaseBarrier {
    pub buffer: GraphBufferId,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
    pub destination_queue: OpalQueueType,
}

/// The compiled record of one unit of GPU work: the accesses declared through the builder, the
/// deferred execution callback, and the synchronization slots the compiler fills in. Created by
/// `RenderGraph::add_pass`, consumed by `RenderGraph::evaluate`, discarded at reset.
pub struct RenderGraphPass {
    pub(super) name: RenderGraphPassName,
    pub(super) queue: OpalQueueType,
    pub(super) pass_type: RenderGraphPassType,

    // Declared by the builder
    pub(super) texture_creates: Vec<GraphTextureId>,
    pub(super) buffer_creates: Vec<GraphBufferId>,
    pub(super) texture_reads: Vec<RenderGraphTextureAccess>,
    pub(super) texture_writes: Vec<RenderGraphTextureAccess>,
    pub(super) texture_modifies: Vec<RenderGraphTextureAccess>,
    pub(super) buffer_reads: Vec<RenderGraphBufferAccess>,
    pub(super) buffer_writes: Vec<RenderGraphBufferAccess>,
    pub(super) buffer_modifies: Vec<RenderGraphBufferAccess>,

    // Attachments are indexed by attachment index
    pub(super) color_attachments: Vec<RenderGraphColorAttachmentInfo>,
    pub(super) depth_attachment: Option<RenderGraphDepthAttachmentInfo>,
    pub(super) resolve_attachments: Vec<RenderGraphResolveAttachmentInfo>,

    pub(super) executable: Option<Box<dyn PassExecutable>>,

    // Filled in by RenderGraph::compile
    pub(super) wait_semaphores: Vec<OpalSemaphoreWait>,
    pub(super) signal_semaphores: Vec<OpalSemaphore>,
    pub(super) texture_barriers: Vec<PassTextureBarrier>,
    pub(super) buffer_barriers: Vec<PassBufferBarrier>,
    pub(super) texture_acquire_barriers: Vec<PassTextureAcquireBarrier>,
    pub(super) texture_release_barriers: Vec<PassTextureReleaseBarrier>,
    pub(super) buffer_acquire_barriers: Vec<PassBufferAcquireBarrier>,
    pub(super) buffer_release_barriers: Vec<PassBufferReleaseBarrier>,
}

impl RenderGraphPass {
    pub(super) fn new(name: RenderGraphPassName) -> Self {
        RenderGraphPass {
            name,
            queue: OpalQueueType::Graphics,
            pass_type: RenderGraphPassType::Render,
            texture_creates: Default::default(),
            buffer_creates: Default::default(),
            texture_reads: Default::default(),
            texture_writes: Default::default(),
            texture_modifies: Default::default(),
            buffer_reads: Default::default(),
            buffer_writes: Default::default(),
            buffer_modifies: Default::default(),
            color_attachments: Default::default(),
            depth_attachment: Default::default(),
            resolve_attachments: Default::default(),
            executable: None,
            wait_semaphores: Default::default(),
            signal_semaphores: Default::default(),
            texture_barriers: Default::default(),
            buffer_barriers: Default::default(),
            texture_acquire_barriers: Default::default(),
            texture_release_barriers: Default::default(),
            buffer_acquire_barriers: Default::default(),
            buffer_release_barriers: Default::default(),
        }
    }

    pub fn name(&self) -> RenderGraphPassName {
        self.name
    }

    pub fn queue(&self) -> OpalQueueType {
        self.queue
    }

    pub fn pass_type(&self) -> RenderGraphPassType {
        self.pass_type
    }

    /// True if this pass hands any resource off to a different queue
    pub(super) fn has_cross_queue_signals(&self) -> bool {
        !self.signal_semaphores.is_empty()
    }
}

impl std::fmt::Debug for RenderGraphPass {
    fn fmt(
        &self,
        f: &mut Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("RenderGraphPass")
            .field("name", &self.name)
            .field("queue", &self.queue)
            .field("pass_type", &self.pass_type)
            .field("texture_creates", &self.texture_creates)
            .field("buffer_creates", &self.buffer_creates)
            .field("texture_reads", &self.texture_reads)
            .field("texture_writes", &self.texture_writes)
            .field("texture_modifies", &self.texture_modifies)
            .field("buffer_reads", &self.buffer_reads)
            .field("buffer_writes", &self.buffer_writes)
            .field("buffer_modifies", &self.buffer_modifies)
            .field("color_attachments", &self.color_attachments)
            .field("depth_attachment", &self.depth_attachment)
            .field("resolve_attachments", &self.resolve_attachments)
            .field("wait_semaphores", &self.wait_semaphores)
            .field("signal_semaphores", &self.signal_semaphores)
            .field("texture_barriers", &self.texture_barriers)
            .field("buffer_barriers", &self.buffer_barriers)
            .field("texture_acquire_barriers", &self.texture_acquire_barriers)
            .field("texture_release_barriers", &self.texture_release_barriers)
            .field("buffer_acquire_barriers", &self.buffer_acquire_barriers)
            .field("buffer_release_barriers", &self.buffer_release_barriers)
            .finish()
    }
}
