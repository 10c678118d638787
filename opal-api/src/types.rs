use std::hash::{Hash, Hasher};

/// Wraps an f32 so that clear values can participate in hashed cache keys. Hashes and compares by
/// bit pattern.
#[derive(Copy, Clone, Debug)]
struct DecimalF32(f32);

impl Hash for DecimalF32 {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.0.to_bits().hash(state);
    }
}

/// Used to indicate which type of queue a unit of work should be submitted to. Some operations
/// require certain types of queues.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpalQueueType {
    /// Graphics queues generally support all operations and are a safe default choice
    Graphics,

    /// Compute queues can be used for compute-based work.
    Compute,

    /// Transfer queues are generally limited to basic operations like copying data from buffers
    /// to images.
    Transfer,
}

bitflags::bitflags! {
    /// The current state of a resource. When an operation is performed that references a resource,
    /// it must be in the correct state. Resources are moved between states using barriers.
    pub struct OpalResourceState: u32 {
        const UNDEFINED = 0;
        const VERTEX_AND_UNIFORM_BUFFER = 0x1;
        const INDEX_BUFFER = 0x2;
        /// Similar to vulkan's COLOR_ATTACHMENT_OPTIMAL image layout
        const RENDER_TARGET = 0x4;
        const UNORDERED_ACCESS = 0x8;
        /// Similar to vulkan's DEPTH_STENCIL_ATTACHMENT_OPTIMAL image layout
        const DEPTH_WRITE = 0x10;
        const DEPTH_READ = 0x20;
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        const PIXEL_SHADER_RESOURCE = 0x80;
        /// Similar to vulkan's SHADER_READ_ONLY_OPTIMAL image layout
        const SHADER_RESOURCE = 0x40 | 0x80;
        const INDIRECT_ARGUMENT = 0x100;
        /// Similar to vulkan's TRANSFER_DST_OPTIMAL image layout
        const COPY_DST = 0x200;
        /// Similar to vulkan's TRANSFER_SRC_OPTIMAL image layout
        const COPY_SRC = 0x400;
        /// The multisample-resolve destination of a renderpass
        const RESOLVE_TARGET = 0x800;
        /// Similar to vulkan's PRESENT_SRC_KHR image layout
        const PRESENT = 0x1000;
    }
}

/// The attachment slot a resource state corresponds to, if any. States with an attachment role
/// cause the frame graph to accumulate renderpass layout metadata for the access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpalAttachmentRole {
    Color,
    Depth,
    Resolve,
}

impl OpalResourceState {
    pub fn attachment_role(self) -> Option<OpalAttachmentRole> {
        if self.intersects(OpalResourceState::RENDER_TARGET) {
            Some(OpalAttachmentRole::Color)
        } else if self.intersects(OpalResourceState::DEPTH_WRITE | OpalResourceState::DEPTH_READ) {
            Some(OpalAttachmentRole::Depth)
        } else if self.intersects(OpalResourceState::RESOLVE_TARGET) {
            Some(OpalAttachmentRole::Resolve)
        } else {
            None
        }
    }

    /// The pipeline stages that consume a resource in this state. Used to derive the wait stage of
    /// a cross-queue semaphore.
    pub fn pipeline_stage(self) -> OpalPipelineStage {
        let mut stage = OpalPipelineStage::empty();
        if self.intersects(OpalResourceState::VERTEX_AND_UNIFORM_BUFFER) {
            stage |= OpalPipelineStage::VERTEX_INPUT | OpalPipelineStage::VERTEX_SHADER;
        }
        if self.intersects(OpalResourceState::INDEX_BUFFER) {
            stage |= OpalPipelineStage::VERTEX_INPUT;
        }
        if self.intersects(OpalResourceState::RENDER_TARGET | OpalResourceState::RESOLVE_TARGET) {
            stage |= OpalPipelineStage::COLOR_ATTACHMENT_OUTPUT;
        }
        if self.intersects(OpalResourceState::UNORDERED_ACCESS) {
            stage |= OpalPipelineStage::COMPUTE_SHADER;
        }
        if self.intersects(OpalResourceState::DEPTH_WRITE | OpalResourceState::DEPTH_READ) {
            stage |=
                OpalPipelineStage::EARLY_FRAGMENT_TESTS | OpalPipelineStage::LATE_FRAGMENT_TESTS;
        }
        if self.intersects(OpalResourceState::NON_PIXEL_SHADER_RESOURCE) {
            stage |= OpalPipelineStage::VERTEX_SHADER | OpalPipelineStage::COMPUTE_SHADER;
        }
        if self.intersects(OpalResourceState::PIXEL_SHADER_RESOURCE) {
            stage |= OpalPipelineStage::FRAGMENT_SHADER;
        }
        if self.intersects(OpalResourceState::INDIRECT_ARGUMENT) {
            stage |= OpalPipelineStage::DRAW_INDIRECT;
        }
        if self.intersects(OpalResourceState::COPY_SRC | OpalResourceState::COPY_DST) {
            stage |= OpalPipelineStage::TRANSFER;
        }
        if self.intersects(OpalResourceState::PRESENT) {
            stage |= OpalPipelineStage::BOTTOM_OF_PIPE;
        }

        if stage.is_empty() {
            stage = OpalPipelineStage::TOP_OF_PIPE;
        }

        stage
    }
}

bitflags::bitflags! {
    /// Pipeline stages, used when registering semaphore waits with a queue submission
    pub struct OpalPipelineStage: u32 {
        const TOP_OF_PIPE = 0x1;
        const DRAW_INDIRECT = 0x2;
        const VERTEX_INPUT = 0x4;
        const VERTEX_SHADER = 0x8;
        const FRAGMENT_SHADER = 0x10;
        const EARLY_FRAGMENT_TESTS = 0x20;
        const LATE_FRAGMENT_TESTS = 0x40;
        const COLOR_ATTACHMENT_OUTPUT = 0x80;
        const COMPUTE_SHADER = 0x100;
        const TRANSFER = 0x200;
        const BOTTOM_OF_PIPE = 0x400;
    }
}

bitflags::bitflags! {
    /// Indicates how a resource will be used. In some cases, multiple flags are allowed. Because a
    /// physical resource must be created with every usage any pass requires, the frame graph
    /// accumulates these flags across all declared accesses before resolving the resource.
    #[derive(Default)]
    pub struct OpalResourceType: u32 {
        const UNDEFINED = 0;
        /// Similar to vulkan's SAMPLED image usage flag
        const TEXTURE = 1<<0;
        /// Similar to vulkan's STORAGE image usage flag
        const TEXTURE_READ_WRITE = 1<<1;
        /// Similar to vulkan's STORAGE_BUFFER descriptor type
        const BUFFER = 1<<2;
        const BUFFER_READ_WRITE = 1<<3;
        /// Similar to vulkan's UNIFORM_BUFFER descriptor type
        const UNIFORM_BUFFER = 1<<4;
        /// Similar to vulkan's VERTEX_BUFFER buffer usage flag
        const VERTEX_BUFFER = 1<<5;
        /// Similar to vulkan's INDEX_BUFFER buffer usage flag
        const INDEX_BUFFER = 1<<6;
        /// Similar to vulkan's INDIRECT_BUFFER buffer usage flag
        const INDIRECT_BUFFER = 1<<7;
        /// A color attachment in a renderpass
        const RENDER_TARGET_COLOR = 1<<8;
        /// A depth/stencil attachment in a renderpass
        const RENDER_TARGET_DEPTH_STENCIL = 1<<9;
    }
}

impl OpalResourceType {
    pub fn is_render_target(self) -> bool {
        self.intersects(
            OpalResourceType::RENDER_TARGET_COLOR | OpalResourceType::RENDER_TARGET_DEPTH_STENCIL,
        )
    }
}

/// A 2d size for windows, textures, etc.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpalExtents2D {
    pub width: u32,
    pub height: u32,
}

/// A 3d size for windows, textures, etc.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpalExtents3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl OpalExtents3D {
    pub fn to_2d(self) -> OpalExtents2D {
        OpalExtents2D {
            width: self.width,
            height: self.height,
        }
    }
}

/// Number of MSAA samples to use. 1xMSAA and 4xMSAA are most broadly supported
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpalSampleCount {
    SampleCount1,
    SampleCount2,
    SampleCount4,
    SampleCount8,
    SampleCount16,
}

impl Default for OpalSampleCount {
    fn default() -> Self {
        OpalSampleCount::SampleCount1
    }
}

/// A typical selection of image formats. The backend maps these onto whatever it actually
/// supports.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum OpalFormat {
    UNDEFINED,
    R8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_SFLOAT,
    R32_UINT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl Default for OpalFormat {
    fn default() -> Self {
        OpalFormat::UNDEFINED
    }
}

impl OpalFormat {
    pub fn has_depth(self) -> bool {
        matches!(
            self,
            OpalFormat::D16_UNORM
                | OpalFormat::D32_SFLOAT
                | OpalFormat::D24_UNORM_S8_UINT
                | OpalFormat::D32_SFLOAT_S8_UINT
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            OpalFormat::D24_UNORM_S8_UINT | OpalFormat::D32_SFLOAT_S8_UINT
        )
    }
}

/// A clear value for color attachments
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OpalColorClearValue(pub [f32; 4]);

impl Hash for OpalColorClearValue {
    fn hash<H: Hasher>(
        &self,
        mut state: &mut H,
    ) {
        for &value in &self.0 {
            DecimalF32(value).hash(&mut state);
        }
    }
}

/// A clear value for depth/stencil attachments. One or both values may be used depending on the
/// format of the attached image
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OpalDepthStencilClearValue {
    pub depth: f32,
    pub stencil: u32,
}

impl Default for OpalDepthStencilClearValue {
    fn default() -> Self {
        OpalDepthStencilClearValue {
            depth: 0.0,
            stencil: 0,
        }
    }
}

impl Hash for OpalDepthStencilClearValue {
    fn hash<H: Hasher>(
        &self,
        mut state: &mut H,
    ) {
        DecimalF32(self.depth).hash(&mut state);
        self.stencil.hash(&mut state);
    }
}

/// Determines what happens to the contents of an attachment when a renderpass begins
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpalLoadOp {
    DontCare,
    Load,
    Clear,
}

impl Default for OpalLoadOp {
    fn default() -> Self {
        OpalLoadOp::DontCare
    }
}

/// Determines what happens to the contents of an attachment when a renderpass ends
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum OpalStoreOp {
    DontCare,
    Store,
}

impl Default for OpalStoreOp {
    fn default() -> Self {
        OpalStoreOp::Store
    }
}

/// Describes a texture to create. Doubles as the pooling key in the frame graph's resource cache,
/// so the descriptor must be fully finalized (all usage flags unioned) before a physical texture
/// is resolved from it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpalTextureDef {
    pub extents: OpalExtents3D,
    /// Corresponds to number of vulkan layers. Generally should be 1, except set to 6 for cubemaps
    pub array_length: u32,
    pub mip_count: u32,
    pub sample_count: OpalSampleCount,
    pub format: OpalFormat,
    pub resource_type: OpalResourceType,
}

impl Default for OpalTextureDef {
    fn default() -> Self {
        OpalTextureDef {
            extents: OpalExtents3D {
                width: 0,
                height: 0,
                depth: 1,
            },
            array_length: 1,
            mip_count: 1,
            sample_count: OpalSampleCount::SampleCount1,
            format: OpalFormat::UNDEFINED,
            resource_type: OpalResourceType::TEXTURE,
        }
    }
}

impl OpalTextureDef {
    pub fn verify(&self) {
        assert!(self.extents.width > 0);
        assert!(self.extents.height > 0);
        assert!(self.extents.depth > 0);
        assert!(self.array_length > 0);
        assert!(self.mip_count > 0);
        assert_ne!(self.format, OpalFormat::UNDEFINED);
    }
}

/// Describes a buffer to create. Doubles as the pooling key in the frame graph's resource cache.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpalBufferDef {
    pub size: u64,
    pub resource_type: OpalResourceType,
}

impl Default for OpalBufferDef {
    fn default() -> Self {
        OpalBufferDef {
            size: 0,
            resource_type: OpalResourceType::UNDEFINED,
        }
    }
}

impl OpalBufferDef {
    pub fn verify(&self) {
        assert_ne!(self.size, 0);
    }
}

//
// Opaque device handles. The concrete objects live behind the DeviceContext implementation; the
// graph only stores and forwards these.
//

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpalTexture(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpalBuffer(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpalSemaphore(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpalRenderPass(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct OpalFramebuffer(pub u64);

/// One attachment of a renderpass. Part of the hashable key used to cache renderpass objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OpalAttachmentDef {
    pub format: OpalFormat,
    pub sample_count: OpalSampleCount,
    pub load_op: OpalLoadOp,
    pub store_op: OpalStoreOp,
}

/// Describes a renderpass object. Hashable so compatible renderpasses can be cached and reused
/// across frames.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OpalRenderPassDef {
    pub color_attachments: Vec<OpalAttachmentDef>,
    pub depth_attachment: Option<OpalAttachmentDef>,
    pub resolve_attachments: Vec<OpalAttachmentDef>,
}

/// One attached image of a framebuffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpalFramebufferAttachment {
    pub texture: OpalTexture,
    /// If set, only the specified array element is attached
    pub array_slice: Option<u16>,
}

/// Describes a framebuffer object. Hashable so framebuffers can be cached and reused across
/// frames as long as the same physical attachments are bound.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OpalFramebufferDef {
    pub render_pass: OpalRenderPass,
    pub attachments: Vec<OpalFramebufferAttachment>,
    pub extents: OpalExtents2D,
}

/// Determines if a barrier is transferring a resource from one queue to another.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpalBarrierQueueTransition {
    /// No queue transition will take place
    None,

    /// A barrier for the "sending" queue. Contains the "receiving" queue. (the "sending" queue is
    /// inferred by the queue on which the barrier is submitted)
    ReleaseTo(OpalQueueType),

    /// A barrier for the "receiving" queue. Contains the "sending" queue. (the "receiving" queue
    /// is inferred by the queue on which the barrier is submitted)
    AcquireFrom(OpalQueueType),
}

impl Default for OpalBarrierQueueTransition {
    fn default() -> Self {
        OpalBarrierQueueTransition::None
    }
}

/// A memory barrier for buffers. This is used to transition buffers between resource states and
/// possibly from one queue to another
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OpalBufferBarrier {
    pub buffer: OpalBuffer,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
    pub queue_transition: OpalBarrierQueueTransition,
}

/// A memory barrier for textures. This is used to transition textures between resource states and
/// possibly from one queue to another.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OpalTextureBarrier {
    pub texture: OpalTexture,
    pub src_state: OpalResourceState,
    pub dst_state: OpalResourceState,
    pub queue_transition: OpalBarrierQueueTransition,
}

impl OpalTextureBarrier {
    /// Creates a simple state transition
    pub fn state_transition(
        texture: OpalTexture,
        src_state: OpalResourceState,
        dst_state: OpalResourceState,
    ) -> OpalTextureBarrier {
        OpalTextureBarrier {
            texture,
            src_state,
            dst_state,
            queue_transition: OpalBarrierQueueTransition::None,
        }
    }
}

/// A semaphore to wait on before a submitted command buffer may execute past the given stage
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OpalSemaphoreWait {
    pub semaphore: OpalSemaphore,
    pub stage: OpalPipelineStage,
}
