use super::graph_pass::{
    RenderGraphBufferAccess, RenderGraphColorAttachmentInfo, RenderGraphDepthAttachmentInfo,
    RenderGraphPass, RenderGraphResolveAttachmentInfo, RenderGraphTextureAccess,
};
use super::{
    AttachmentClearValue, GraphTextureId, RenderGraphAccess, RenderGraphPassType,
    RenderGraphRegistry, RenderGraphResourceName,
};
use opal_api::{
    OpalAttachmentRole, OpalBufferDef, OpalLoadOp, OpalQueueType, OpalResourceState,
    OpalResourceType, OpalStoreOp, OpalTexture, OpalTextureDef,
};

/// The usage flags a texture needs so that it can legally be bound in the given state
fn texture_resource_type_for_state(state: OpalResourceState) -> OpalResourceType {
    let mut resource_type = OpalResourceType::UNDEFINED;
    if state.intersects(OpalResourceState::RENDER_TARGET | OpalResourceState::RESOLVE_TARGET) {
        resource_type |= OpalResourceType::RENDER_TARGET_COLOR;
    }
    if state.intersects(OpalResourceState::DEPTH_WRITE | OpalResourceState::DEPTH_READ) {
        resource_type |= OpalResourceType::RENDER_TARGET_DEPTH_STENCIL;
    }
    if state.intersects(OpalResourceState::SHADER_RESOURCE) {
        resource_type |= OpalResourceType::TEXTURE;
    }
    if state.intersects(OpalResourceState::UNORDERED_ACCESS) {
        resource_type |= OpalResourceType::TEXTURE_READ_WRITE;
    }
    resource_type
}

fn buffer_resource_type_for_state(state: OpalResourceState) -> OpalResourceType {
    let mut resource_type = OpalResourceType::UNDEFINED;
    if state.intersects(OpalResourceState::VERTEX_AND_UNIFORM_BUFFER) {
        resource_type |= OpalResourceType::UNIFORM_BUFFER | OpalResourceType::VERTEX_BUFFER;
    }
    if state.intersects(OpalResourceState::INDEX_BUFFER) {
        resource_type |= OpalResourceType::INDEX_BUFFER;
    }
    if state.intersects(OpalResourceState::INDIRECT_ARGUMENT) {
        resource_type |= OpalResourceType::INDIRECT_BUFFER;
    }
    if state.intersects(OpalResourceState::SHADER_RESOURCE) {
        resource_type |= OpalResourceType::BUFFER;
    }
    if state.intersects(OpalResourceState::UNORDERED_ACCESS) {
        resource_type |= OpalResourceType::BUFFER_READ_WRITE;
    }
    resource_type
}

/// The per-pass declarative API. One builder exists per `add_pass` construction callback; the
/// accesses and attachment metadata it accumulates are immutable once the callback returns.
///
/// Every read/write both records an access for the barrier compiler and unions the matching usage
/// flag into the resource's descriptor, since the physical resource must be created with every
/// usage any pass requires.
pub struct RenderGraphBuilder<'a> {
    registry: &'a mut RenderGraphRegistry,
    pass: &'a mut RenderGraphPass,
}

impl<'a> RenderGraphBuilder<'a> {
    pub(super) fn new(
        registry: &'a mut RenderGraphRegistry,
        pass: &'a mut RenderGraphPass,
    ) -> Self {
        RenderGraphBuilder { registry, pass }
    }

    /// The queue this pass will be submitted to. Defaults to the graphics queue.
    pub fn set_queue(
        &mut self,
        queue: OpalQueueType,
    ) {
        self.pass.queue = queue;
    }

    /// Whether the graph wraps this pass in an implicit renderpass scope. Defaults to
    /// [`RenderGraphPassType::Render`].
    pub fn set_pass_type(
        &mut self,
        pass_type: RenderGraphPassType,
    ) {
        self.pass.pass_type = pass_type;
    }

    /// Register a transient texture owned by the graph for this frame
    pub fn create_texture(
        &mut self,
        name: RenderGraphResourceName,
        texture_def: OpalTextureDef,
    ) {
        let id = self.registry.create_texture(name, texture_def);
        self.pass.texture_creates.push(id);
    }

    /// Register a texture backed by an externally-owned physical handle (e.g. the swapchain
    /// image). `initial_state` seeds the resource's lifetime; the first barrier transitions out
    /// of it.
    pub fn import_texture(
        &mut self,
        name: RenderGraphResourceName,
        texture: OpalTexture,
        texture_def: OpalTextureDef,
        initial_state: OpalResourceState,
    ) {
        let id = self
            .registry
            .import_texture(name, texture, texture_def, initial_state);
        self.pass.texture_creates.push(id);
    }

    /// Register a transient buffer owned by the graph for this frame
    pub fn create_buffer(
        &mut self,
        name: RenderGraphResourceName,
        buffer_def: OpalBufferDef,
    ) {
        let id = self.registry.create_buffer(name, buffer_def);
        self.pass.buffer_creates.push(id);
    }

    pub fn read_texture(
        &mut self,
        name: RenderGraphResourceName,
        state: OpalResourceState,
    ) {
        let id = self.registry.texture_index(name);
        self.registry
            .add_texture_resource_type(id, texture_resource_type_for_state(state));
        self.pass
            .texture_reads
            .push(RenderGraphTextureAccess { texture: id, state });

        self.add_attachment(id, state, RenderGraphAccess::Read, None, None);
    }

    /// `clear_value` controls the attachment load policy when `state` has an attachment role:
    /// `Some` clears, `None` leaves the previous contents undefined (don't-care). Contents are
    /// always stored.
    pub fn write_texture(
        &mut self,
        name: RenderGraphResourceName,
        state: OpalResourceState,
        clear_value: Option<AttachmentClearValue>,
        array_slice: Option<u16>,
    ) {
        let id = self.registry.texture_index(name);
        self.registry
            .add_texture_resource_type(id, texture_resource_type_for_state(state));
        self.pass
            .texture_writes
            .push(RenderGraphTextureAccess { texture: id, state });

        self.add_attachment(
            id,
            state,
            RenderGraphAccess::Write,
            clear_value,
            array_slice,
        );
    }

    pub fn read_write_texture(
        &mut self,
        name: RenderGraphResourceName,
        state: OpalResourceState,
        array_slice: Option<u16>,
    ) {
        let id = self.registry.texture_index(name);
        self.registry
            .add_texture_resource_type(id, texture_resource_type_for_state(state));
        self.pass
            .texture_modifies
            .push(RenderGraphTextureAccess { texture: id, state });

        self.add_attachment(id, state, RenderGraphAccess::ReadWrite, None, array_slice);
    }

    pub fn read_buffer(
        &mut self,
        name: RenderGraphResourceName,
        state: OpalResourceState,
    ) {
        let id = self.registry.buffer_index(name);
        self.registry
            .add_buffer_resource_type(id, buffer_resource_type_for_state(state));
        self.pass
            .buffer_reads
            .push(RenderGraphBufferAccess { buffer: id, state });
    }

    pub fn write_buffer(
        &mut self,
        name: RenderGraphResourceName,
        state: OpalResourceState,
    ) {
        let id = self.registry.buffer_index(name);
        self.registry
            .add_buffer_resource_type(id, buffer_resource_type_for_state(state));
        self.pass
            .buffer_writes
            .push(RenderGraphBufferAccess { buffer: id, state });
    }

    pub fn read_write_buffer(
        &mut self,
        name: RenderGraphResourceName,
        state: OpalResourceState,
    ) {
        let id = self.registry.buffer_index(name);
        self.registry
            .add_buffer_resource_type(id, buffer_resource_type_for_state(state));
        self.pass
            .buffer_modifies
            .push(RenderGraphBufferAccess { buffer: id, state });
    }

    // When a declared state has an attachment role, the access also contributes renderpass layout
    // metadata. Load policy: Read loads, Write clears when a clear value is given and discards
    // otherwise, ReadWrite loads. Contents are always stored.
    fn add_attachment(
        &mut self,
        texture: GraphTextureId,
        state: OpalResourceState,
        access: RenderGraphAccess,
        clear_value: Option<AttachmentClearValue>,
        array_slice: Option<u16>,
    ) {
        let role = match state.attachment_role() {
            Some(role) => role,
            None => return,
        };

        let load_op = match access {
            RenderGraphAccess::Read | RenderGraphAccess::ReadWrite => OpalLoadOp::Load,
            RenderGraphAccess::Write => {
                if clear_value.is_some() {
                    OpalLoadOp::Clear
                } else {
                    OpalLoadOp::DontCare
                }
            }
        };

        match role {
            OpalAttachmentRole::Color => {
                self.pass
                    .color_attachments
                    .push(RenderGraphColorAttachmentInfo {
                        texture,
                        load_op,
                        store_op: OpalStoreOp::Store,
                        clear_value: clear_value.map(|x| x.to_color_clear_value()),
                        array_slice,
                    });
            }
            OpalAttachmentRole::Depth => {
                // If this trips, two accesses declared a depth attachment for the same pass
                assert!(self.pass.depth_attachment.is_none());
                self.pass.depth_attachment = Some(RenderGraphDepthAttachmentInfo {
                    texture,
                    load_op,
                    store_op: OpalStoreOp::Store,
                    clear_value: clear_value.map(|x| x.to_depth_stencil_clear_value()),
                    array_slice,
                });
            }
            OpalAttachmentRole::Resolve => {
                self.pass
                    .resolve_attachments
                    .push(RenderGraphResolveAttachmentInfo {
                        texture,
                        store_op: OpalStoreOp::Store,
                        array_slice,
                    });
            }
        }
    }
}
