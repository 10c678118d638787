use crate::MAX_FRAMES_IN_FLIGHT;
use fnv::FnvHashMap;
use opal_api::{
    DeviceContext, OpalBuffer, OpalBufferDef, OpalFramebuffer, OpalFramebufferDef, OpalRenderPass,
    OpalRenderPassDef, OpalResult, OpalTexture, OpalTextureDef,
};
use std::num::Wrapping;

/// Pooled entries that have gone unused for this many frames are destroyed through the device
const EXPIRE_UNUSED_FRAME_COUNT: u32 = 60;

// If frame_index matches or exceeds target, the subtraction wraps to a very high value
fn frame_reached(
    frame_index: Wrapping<u32>,
    target: Wrapping<u32>,
) -> bool {
    target - frame_index > Wrapping(std::u32::MAX / 2)
}

/// A transient resource owned by the cache. `in_use` is held for MAX_FRAMES_IN_FLIGHT frames
/// after the last frame that resolved it, since the GPU may still be consuming those frames.
struct CachedResource<T> {
    resource: T,
    in_use: bool,
    live_until_frame: Wrapping<u32>,
    last_used_frame: Wrapping<u32>,
}

/// A cached immutable object (renderpass/framebuffer), reused by descriptor until it expires
struct CachedObject<T> {
    resource: T,
    last_used_frame: Wrapping<u32>,
}

/// Pools physical GPU resources keyed by their descriptor so that transient frame-graph resources
/// can be recycled across frames instead of recreated. Textures and buffers are N-buffered: a
/// resource resolved during frame F returns to the free pool once frame F is known to be off the
/// GPU. Renderpass and framebuffer objects are cached by descriptor and expire when unused.
pub struct RenderGraphCache {
    frame_index: Wrapping<u32>,

    textures: FnvHashMap<OpalTextureDef, Vec<CachedResource<OpalTexture>>>,
    buffers: FnvHashMap<OpalBufferDef, Vec<CachedResource<OpalBuffer>>>,
    render_passes: FnvHashMap<OpalRenderPassDef, CachedObject<OpalRenderPass>>,
    framebuffers: FnvHashMap<OpalFramebufferDef, CachedObject<OpalFramebuffer>>,
}

impl RenderGraphCache {
    pub fn new() -> Self {
        RenderGraphCache {
            frame_index: Wrapping(0),
            textures: Default::default(),
            buffers: Default::default(),
            render_passes: Default::default(),
            framebuffers: Default::default(),
        }
    }

    /// Reuse a free pooled texture with an identical descriptor, or create one. The returned
    /// texture is marked active for the next MAX_FRAMES_IN_FLIGHT frames.
    pub fn get_or_create_texture(
        &mut self,
        device_context: &dyn DeviceContext,
        texture_def: &OpalTextureDef,
    ) -> OpalResult<OpalTexture> {
        let frame_index = self.frame_index;
        let pool = self.textures.entry(texture_def.clone()).or_default();

        if let Some(entry) = pool.iter_mut().find(|x| !x.in_use) {
            log::trace!("reuse pooled texture {:?} for {:?}", entry.resource, texture_def);
            entry.in_use = true;
            entry.live_until_frame = frame_index + Wrapping(MAX_FRAMES_IN_FLIGHT as u32 + 1);
            entry.last_used_frame = frame_index;
            return Ok(entry.resource);
        }

        texture_def.verify();
        let resource = device_context.create_texture(texture_def)?;
        log::trace!("create texture {:?} for {:?}", resource, texture_def);
        pool.push(CachedResource {
            resource,
            in_use: true,
            live_until_frame: frame_index + Wrapping(MAX_FRAMES_IN_FLIGHT as u32 + 1),
            last_used_frame: frame_index,
        });
        Ok(resource)
    }

    /// Reuse a free pooled buffer with an identical descriptor, or create one
    pub fn get_or_create_buffer(
        &mut self,
        device_context: &dyn DeviceContext,
        buffer_def: &OpalBufferDef,
    ) -> OpalResult<OpalBuffer> {
        let frame_index = self.frame_index;
        let pool = self.buffers.entry(buffer_def.clone()).or_default();

        if let Some(entry) = pool.iter_mut().find(|x| !x.in_use) {
            log::trace!("reuse pooled buffer {:?} for {:?}", entry.resource, buffer_def);
            entry.in_use = true;
            entry.live_until_frame = frame_index + Wrapping(MAX_FRAMES_IN_FLIGHT as u32 + 1);
            entry.last_used_frame = frame_index;
            return Ok(entry.resource);
        }

        buffer_def.verify();
        let resource = device_context.create_buffer(buffer_def)?;
        log::trace!("create buffer {:?} for {:?}", resource, buffer_def);
        pool.push(CachedResource {
            resource,
            in_use: true,
            live_until_frame: frame_index + Wrapping(MAX_FRAMES_IN_FLIGHT as u32 + 1),
            last_used_frame: frame_index,
        });
        Ok(resource)
    }

    /// Renderpass objects are immutable and shareable, so one per descriptor is enough
    pub fn get_or_create_render_pass(
        &mut self,
        device_context: &dyn DeviceContext,
        render_pass_def: &OpalRenderPassDef,
    ) -> OpalResult<OpalRenderPass> {
        let frame_index = self.frame_index;
        if let Some(entry) = self.render_passes.get_mut(render_pass_def) {
            entry.last_used_frame = frame_index;
            return Ok(entry.resource);
        }

        let resource = device_context.create_render_pass(render_pass_def)?;
        log::trace!("create render pass {:?} for {:?}", resource, render_pass_def);
        self.render_passes.insert(
            render_pass_def.clone(),
            CachedObject {
                resource,
                last_used_frame: frame_index,
            },
        );
        Ok(resource)
    }

    pub fn get_or_create_framebuffer(
        &mut self,
        device_context: &dyn DeviceContext,
        framebuffer_def: &OpalFramebufferDef,
    ) -> OpalResult<OpalFramebuffer> {
        let frame_index = self.frame_index;
        if let Some(entry) = self.framebuffers.get_mut(framebuffer_def) {
            entry.last_used_frame = frame_index;
            return Ok(entry.resource);
        }

        let resource = device_context.create_framebuffer(framebuffer_def)?;
        log::trace!("create framebuffer {:?} for {:?}", resource, framebuffer_def);
        self.framebuffers.insert(
            framebuffer_def.clone(),
            CachedObject {
                resource,
                last_used_frame: frame_index,
            },
        );
        Ok(resource)
    }

    /// Number of textures currently tagged active (resolved within the last MAX_FRAMES_IN_FLIGHT
    /// frames)
    pub fn active_texture_count(&self) -> usize {
        self.textures
            .values()
            .map(|pool| pool.iter().filter(|x| x.in_use).count())
            .sum()
    }

    pub fn active_buffer_count(&self) -> usize {
        self.buffers
            .values()
            .map(|pool| pool.iter().filter(|x| x.in_use).count())
            .sum()
    }

    /// Total pooled textures, active and free
    pub fn pooled_texture_count(&self) -> usize {
        self.textures.values().map(|pool| pool.len()).sum()
    }

    pub fn pooled_buffer_count(&self) -> usize {
        self.buffers.values().map(|pool| pool.len()).sum()
    }

    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    /// Call once per frame after evaluation. Advances the frame index, returns resources whose
    /// in-flight window has passed to the free pool, and destroys pooled entries that have gone
    /// unused long enough to be considered dead weight.
    pub fn on_frame_complete(
        &mut self,
        device_context: &dyn DeviceContext,
    ) -> OpalResult<()> {
        self.frame_index += Wrapping(1);
        let frame_index = self.frame_index;

        let mut dropped_textures = Vec::default();
        for pool in self.textures.values_mut() {
            for entry in pool.iter_mut() {
                if entry.in_use && frame_reached(frame_index, entry.live_until_frame) {
                    entry.in_use = false;
                }
            }

            pool.retain(|entry| {
                let expired = !entry.in_use
                    && frame_reached(
                        frame_index,
                        entry.last_used_frame + Wrapping(EXPIRE_UNUSED_FRAME_COUNT),
                    );
                if expired {
                    dropped_textures.push(entry.resource);
                }
                !expired
            });
        }
        self.textures.retain(|_, pool| !pool.is_empty());
        for texture in dropped_textures {
            log::trace!("destroy expired pooled texture {:?}", texture);
            device_context.destroy_texture(texture)?;
        }

        let mut dropped_buffers = Vec::default();
        for pool in self.buffers.values_mut() {
            for entry in pool.iter_mut() {
                if entry.in_use && frame_reached(frame_index, entry.live_until_frame) {
                    entry.in_use = false;
                }
            }

            pool.retain(|entry| {
                let expired = !entry.in_use
                    && frame_reached(
                        frame_index,
                        entry.last_used_frame + Wrapping(EXPIRE_UNUSED_FRAME_COUNT),
                    );
                if expired {
                    dropped_buffers.push(entry.resource);
                }
                !expired
            });
        }
        self.buffers.retain(|_, pool| !pool.is_empty());
        for buffer in dropped_buffers {
            log::trace!("destroy expired pooled buffer {:?}", buffer);
            device_context.destroy_buffer(buffer)?;
        }

        // Framebuffers must go before renderpasses since they were created against them
        let mut dropped_framebuffers = Vec::default();
        self.framebuffers.retain(|_, entry| {
            let expired = frame_reached(
                frame_index,
                entry.last_used_frame + Wrapping(EXPIRE_UNUSED_FRAME_COUNT),
            );
            if expired {
                dropped_framebuffers.push(entry.resource);
            }
            !expired
        });
        for framebuffer in dropped_framebuffers {
            log::trace!("destroy expired framebuffer {:?}", framebuffer);
            device_context.destroy_framebuffer(framebuffer)?;
        }

        let mut dropped_render_passes = Vec::default();
        self.render_passes.retain(|_, entry| {
            let expired = frame_reached(
                frame_index,
                entry.last_used_frame + Wrapping(EXPIRE_UNUSED_FRAME_COUNT),
            );
            if expired {
                dropped_render_passes.push(entry.resource);
            }
            !expired
        });
        for render_pass in dropped_render_passes {
            log::trace!("destroy expired render pass {:?}", render_pass);
            device_context.destroy_render_pass(render_pass)?;
        }

        Ok(())
    }

    /// Immediately destroy everything. We assume the device is idle and nothing is in flight.
    pub fn destroy(
        &mut self,
        device_context: &dyn DeviceContext,
    ) -> OpalResult<()> {
        for (_, pool) in self.textures.drain() {
            for entry in pool {
                device_context.destroy_texture(entry.resource)?;
            }
        }

        for (_, pool) in self.buffers.drain() {
            for entry in pool {
                device_context.destroy_buffer(entry.resource)?;
            }
        }

        for (_, entry) in self.framebuffers.drain() {
            device_context.destroy_framebuffer(entry.resource)?;
        }

        for (_, entry) in self.render_passes.drain() {
            device_context.destroy_render_pass(entry.resource)?;
        }

        Ok(())
    }
}

impl Default for RenderGraphCache {
    fn default() -> Self {
        Self::new()
    }
}
