use crate::{
    OpalBuffer, OpalBufferBarrier, OpalBufferDef, OpalColorClearValue, OpalDepthStencilClearValue,
    OpalExtents2D, OpalFramebuffer, OpalFramebufferDef, OpalQueueType, OpalRenderPass,
    OpalRenderPassDef, OpalResult, OpalSemaphore, OpalSemaphoreWait, OpalTexture,
    OpalTextureBarrier, OpalTextureDef,
};

/// The device collaborator the frame graph records against. Implemented by the application's
/// backend (vulkan wrapper, test double, ...). Creation calls may fail; failures propagate out of
/// the graph as [`OpalResult`] errors rather than being swallowed.
///
/// All graph-side access happens from a single thread per frame. Implementations do not need to
/// support concurrent graph access.
pub trait DeviceContext {
    fn create_texture(
        &self,
        texture_def: &OpalTextureDef,
    ) -> OpalResult<OpalTexture>;

    fn destroy_texture(
        &self,
        texture: OpalTexture,
    ) -> OpalResult<()>;

    fn create_buffer(
        &self,
        buffer_def: &OpalBufferDef,
    ) -> OpalResult<OpalBuffer>;

    fn destroy_buffer(
        &self,
        buffer: OpalBuffer,
    ) -> OpalResult<()>;

    fn create_semaphore(&self) -> OpalResult<OpalSemaphore>;

    fn destroy_semaphore(
        &self,
        semaphore: OpalSemaphore,
    ) -> OpalResult<()>;

    fn create_render_pass(
        &self,
        render_pass_def: &OpalRenderPassDef,
    ) -> OpalResult<OpalRenderPass>;

    fn destroy_render_pass(
        &self,
        render_pass: OpalRenderPass,
    ) -> OpalResult<()>;

    fn create_framebuffer(
        &self,
        framebuffer_def: &OpalFramebufferDef,
    ) -> OpalResult<OpalFramebuffer>;

    fn destroy_framebuffer(
        &self,
        framebuffer: OpalFramebuffer,
    ) -> OpalResult<()>;

    /// Allocate a command buffer targeting the given queue and begin recording into it
    fn begin_command_buffer(
        &self,
        queue: OpalQueueType,
    ) -> OpalResult<Box<dyn CommandWriter>>;

    /// End recording and submit the command buffer to its queue, registering the given semaphore
    /// waits and signals with the submission
    fn submit_command_buffer(
        &self,
        command_buffer: Box<dyn CommandWriter>,
        queue: OpalQueueType,
        wait_semaphores: &[OpalSemaphoreWait],
        signal_semaphores: &[OpalSemaphore],
    ) -> OpalResult<()>;
}

/// Records commands into a command buffer obtained from [`DeviceContext::begin_command_buffer`].
/// The frame graph only records barriers and renderpass begin/end through this trait; draw and
/// dispatch recording is backend-specific and reached by downcasting via [`CommandWriter::as_any_mut`].
pub trait CommandWriter {
    /// Record buffer and texture barriers. Cross-queue transfers are expressed through the
    /// `queue_transition` field of the individual barriers.
    fn cmd_resource_barrier(
        &mut self,
        buffer_barriers: &[OpalBufferBarrier],
        texture_barriers: &[OpalTextureBarrier],
    ) -> OpalResult<()>;

    fn cmd_begin_render_pass(
        &mut self,
        render_pass: OpalRenderPass,
        framebuffer: OpalFramebuffer,
        extents: OpalExtents2D,
        color_clear_values: &[OpalColorClearValue],
        depth_stencil_clear_value: Option<OpalDepthStencilClearValue>,
    ) -> OpalResult<()>;

    fn cmd_end_render_pass(&mut self) -> OpalResult<()>;

    /// Access the concrete writer for backend-specific draw/dispatch recording
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
