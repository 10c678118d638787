use super::{RenderGraphCache, RenderGraphResourceName};
use fnv::FnvHashMap;
use opal_api::{
    DeviceContext, OpalBuffer, OpalBufferDef, OpalResourceState, OpalResourceType, OpalResult,
    OpalTexture, OpalTextureDef,
};
use std::sync::Arc;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GraphTextureId(pub(super) usize);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GraphBufferId(pub(super) usize);

struct RegisteredTexture {
    name: RenderGraphResourceName,
    texture_def: OpalTextureDef,
    initial_state: OpalResourceState,
    // Set for resources backed by an externally-owned physical texture (e.g. a swapchain image);
    // these bypass the cache entirely
    imported: Option<OpalTexture>,
    resolved: Option<OpalTexture>,
}

struct RegisteredBuffer {
    name: RenderGraphResourceName,
    buffer_def: OpalBufferDef,
    resolved: Option<OpalBuffer>,
}

/// Maps the logical, name-addressed resources that passes declare against onto physical device
/// resources. Logical entries live for one frame; physical allocation is delegated to the
/// [`RenderGraphCache`] and happens lazily on first use during evaluation, once every usage flag
/// from every pass has been unioned into the descriptor.
///
/// Duplicate creation and access to nonexistent resources are authoring bugs in pass-construction
/// code and assert rather than returning errors; silent recovery would desynchronize the barrier
/// compiler.
pub struct RenderGraphRegistry {
    device_context: Arc<dyn DeviceContext>,
    cache: RenderGraphCache,

    textures: Vec<RegisteredTexture>,
    texture_lookup: FnvHashMap<RenderGraphResourceName, GraphTextureId>,
    buffers: Vec<RegisteredBuffer>,
    buffer_lookup: FnvHashMap<RenderGraphResourceName, GraphBufferId>,
}

impl RenderGraphRegistry {
    pub(super) fn new(device_context: Arc<dyn DeviceContext>) -> Self {
        RenderGraphRegistry {
            device_context,
            cache: RenderGraphCache::new(),
            textures: Default::default(),
            texture_lookup: Default::default(),
            buffers: Default::default(),
            buffer_lookup: Default::default(),
        }
    }

    /// Register a new transient texture. The physical texture is not created until first use
    /// during evaluation.
    pub fn create_texture(
        &mut self,
        name: RenderGraphResourceName,
        texture_def: OpalTextureDef,
    ) -> GraphTextureId {
        let id = GraphTextureId(self.textures.len());
        self.textures.push(RegisteredTexture {
            name,
            texture_def,
            initial_state: OpalResourceState::UNDEFINED,
            imported: None,
            resolved: None,
        });

        let old = self.texture_lookup.insert(name, id);
        // If this trips, two passes created a resource with the same name this frame
        assert!(old.is_none(), "texture {:?} already exists", name);
        id
    }

    /// Register a texture backed by an externally-owned physical handle. `initial_state` is the
    /// state the texture is in when the frame begins.
    pub fn import_texture(
        &mut self,
        name: RenderGraphResourceName,
        texture: OpalTexture,
        texture_def: OpalTextureDef,
        initial_state: OpalResourceState,
    ) -> GraphTextureId {
        let id = GraphTextureId(self.textures.len());
        self.textures.push(RegisteredTexture {
            name,
            texture_def,
            initial_state,
            imported: Some(texture),
            resolved: None,
        });

        let old = self.texture_lookup.insert(name, id);
        assert!(old.is_none(), "texture {:?} already exists", name);
        id
    }

    /// Register a new transient buffer
    pub fn create_buffer(
        &mut self,
        name: RenderGraphResourceName,
        buffer_def: OpalBufferDef,
    ) -> GraphBufferId {
        let id = GraphBufferId(self.buffers.len());
        self.buffers.push(RegisteredBuffer {
            name,
            buffer_def,
            resolved: None,
        });

        let old = self.buffer_lookup.insert(name, id);
        assert!(old.is_none(), "buffer {:?} already exists", name);
        id
    }

    /// Union a usage flag into the texture's descriptor. The concrete GPU resource must be created
    /// with every usage any pass requires, so this is called for every declared access.
    pub fn add_texture_resource_type(
        &mut self,
        texture: GraphTextureId,
        resource_type: OpalResourceType,
    ) {
        let entry = &mut self.textures[texture.0];
        assert!(
            entry.resolved.is_none(),
            "texture {:?} was resolved before its usage flags were final",
            entry.name
        );
        entry.texture_def.resource_type |= resource_type;
    }

    pub fn add_buffer_resource_type(
        &mut self,
        buffer: GraphBufferId,
        resource_type: OpalResourceType,
    ) {
        let entry = &mut self.buffers[buffer.0];
        assert!(
            entry.resolved.is_none(),
            "buffer {:?} was resolved before its usage flags were final",
            entry.name
        );
        entry.buffer_def.resource_type |= resource_type;
    }

    pub fn texture_exists(
        &self,
        name: RenderGraphResourceName,
    ) -> bool {
        self.texture_lookup.contains_key(name)
    }

    pub fn buffer_exists(
        &self,
        name: RenderGraphResourceName,
    ) -> bool {
        self.buffer_lookup.contains_key(name)
    }

    pub fn texture_index(
        &self,
        name: RenderGraphResourceName,
    ) -> GraphTextureId {
        *self
            .texture_lookup
            .get(name)
            .unwrap_or_else(|| panic!("texture {:?} does not exist", name))
    }

    pub fn buffer_index(
        &self,
        name: RenderGraphResourceName,
    ) -> GraphBufferId {
        *self
            .buffer_lookup
            .get(name)
            .unwrap_or_else(|| panic!("buffer {:?} does not exist", name))
    }

    /// The texture's descriptor as accumulated so far
    pub fn texture_info(
        &self,
        name: RenderGraphResourceName,
    ) -> &OpalTextureDef {
        &self.textures[self.texture_index(name).0].texture_def
    }

    pub fn buffer_info(
        &self,
        name: RenderGraphResourceName,
    ) -> &OpalBufferDef {
        &self.buffers[self.buffer_index(name).0].buffer_def
    }

    /// The physical texture for a logical name. Lazily resolves through the cache on first call,
    /// keyed by the now-finalized descriptor, and memoizes the handle for the rest of the frame.
    /// Only valid during evaluation; resolving earlier would pin the descriptor before all passes
    /// have declared their usage flags.
    pub fn texture(
        &mut self,
        name: RenderGraphResourceName,
    ) -> OpalResult<OpalTexture> {
        let id = self.texture_index(name);
        self.texture_by_id(id)
    }

    pub fn texture_by_id(
        &mut self,
        texture: GraphTextureId,
    ) -> OpalResult<OpalTexture> {
        let entry = &mut self.textures[texture.0];
        if let Some(imported) = entry.imported {
            return Ok(imported);
        }

        if let Some(resolved) = entry.resolved {
            return Ok(resolved);
        }

        let resolved = self
            .cache
            .get_or_create_texture(&*self.device_context, &entry.texture_def)?;
        entry.resolved = Some(resolved);
        Ok(resolved)
    }

    pub fn buffer(
        &mut self,
        name: RenderGraphResourceName,
    ) -> OpalResult<OpalBuffer> {
        let id = self.buffer_index(name);
        self.buffer_by_id(id)
    }

    pub fn buffer_by_id(
        &mut self,
        buffer: GraphBufferId,
    ) -> OpalResult<OpalBuffer> {
        let entry = &mut self.buffers[buffer.0];
        if let Some(resolved) = entry.resolved {
            return Ok(resolved);
        }

        let resolved = self
            .cache
            .get_or_create_buffer(&*self.device_context, &entry.buffer_def)?;
        entry.resolved = Some(resolved);
        Ok(resolved)
    }

    /// Logical textures that have a physical handle bound this frame
    pub fn alive_texture_count(&self) -> usize {
        self.textures
            .iter()
            .filter(|x| x.resolved.is_some() || x.imported.is_some())
            .count()
    }

    pub fn alive_buffer_count(&self) -> usize {
        self.buffers.iter().filter(|x| x.resolved.is_some()).count()
    }

    pub fn cache(&self) -> &RenderGraphCache {
        &self.cache
    }

    pub(super) fn cache_mut(&mut self) -> &mut RenderGraphCache {
        &mut self.cache
    }

    pub(super) fn device_context(&self) -> &Arc<dyn DeviceContext> {
        &self.device_context
    }

    pub(super) fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub(super) fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub(super) fn texture_name(
        &self,
        texture: GraphTextureId,
    ) -> RenderGraphResourceName {
        self.textures[texture.0].name
    }

    pub(super) fn buffer_name(
        &self,
        buffer: GraphBufferId,
    ) -> RenderGraphResourceName {
        self.buffers[buffer.0].name
    }

    pub(super) fn texture_def(
        &self,
        texture: GraphTextureId,
    ) -> &OpalTextureDef {
        &self.textures[texture.0].texture_def
    }

    pub(super) fn texture_initial_state(
        &self,
        texture: GraphTextureId,
    ) -> OpalResourceState {
        self.textures[texture.0].initial_state
    }

    /// Drop all logical entries and name bindings. The cache and its pools are untouched; physical
    /// resources resolved this frame simply return to the pool once their in-flight window passes.
    pub(super) fn reset(&mut self) {
        self.textures.clear();
        self.texture_lookup.clear();
        self.buffers.clear();
        self.buffer_lookup.clear();
    }
}
