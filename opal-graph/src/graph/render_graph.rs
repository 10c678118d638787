use super::graph_pass::{
    PassBufferAcquireBarrier, PassBufferBarrier, PassBufferReleaseBarrier,
    PassTextureAcquireBarrier, PassTextureBarrier, PassTextureReleaseBarrier, RenderGraphPass,
};
use super::{
    Blackboard, BlackboardValue, GraphBufferId, GraphTextureId, RenderGraphAccess,
    RenderGraphBuilder, RenderGraphPassName, RenderGraphPassType, RenderGraphRegistry,
};
use fnv::FnvHashSet;
use opal_api::{
    CommandWriter, DeviceContext, OpalAttachmentDef, OpalBufferBarrier,
    OpalBarrierQueueTransition, OpalColorClearValue, OpalDepthStencilClearValue, OpalExtents2D,
    OpalFramebuffer, OpalFramebufferAttachment, OpalFramebufferDef, OpalLoadOp, OpalQueueType,
    OpalRenderPass, OpalRenderPassDef, OpalResourceState, OpalResult, OpalSemaphore,
    OpalSemaphoreWait, OpalTextureBarrier,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-frame lifecycle of the graph. `reset` must run exactly once per frame before the next
/// `add_pass` cycle begins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RenderGraphState {
    Idle,
    Building,
    Compiled,
    Evaluated,
}

/// One access within a resource's lifetime, in pass-declaration order
#[derive(Debug, Copy, Clone)]
struct UsageSnapshot {
    access: RenderGraphAccess,
    state: OpalResourceState,
    pass_index: usize,
    queue: OpalQueueType,
}

/// The ordered sequence of a resource's accesses across one frame's pass list. The first
/// snapshot's source state is `initial_state`; the last snapshot implicitly defines the final
/// state.
#[derive(Debug)]
struct ResourceLifetime {
    initial_state: OpalResourceState,
    snapshots: Vec<UsageSnapshot>,
}

/// Read-only diagnostics snapshot, refreshed by `evaluate`
#[derive(Debug, Clone, Default)]
pub struct RenderGraphStats {
    pub pass_count: usize,
    pub render_pass_count: usize,
    pub alive_texture_count: usize,
    pub alive_buffer_count: usize,
    pub cached_render_pass_count: usize,
    pub cached_framebuffer_count: usize,
    pub compile_time: Duration,
    pub evaluate_time: Duration,
    pub pass_timings: Vec<(RenderGraphPassName, Duration)>,
}

/// The frame graph. Rendering code registers passes with [`RenderGraph::add_pass`]; `compile`
/// derives per-resource lifetimes and synthesizes barriers, queue-ownership transfers, and
/// semaphores; `evaluate` executes the passes in declaration order, batching command-buffer
/// submission by target queue.
///
/// Passes execute in the order they were added. The graph never reorders them, so authoring code
/// must add passes in a valid topological order of their resource dependencies.
///
/// Single-threaded per frame: construction, compilation, and evaluation all run on one thread,
/// and `evaluate` runs to completion or the pass list is left torn (no rollback).
pub struct RenderGraph {
    registry: RenderGraphRegistry,
    blackboard: Blackboard,
    passes: Vec<RenderGraphPass>,

    // Indexed by GraphTextureId / GraphBufferId; the two index spaces are independent
    texture_lifetimes: Vec<ResourceLifetime>,
    buffer_lifetimes: Vec<ResourceLifetime>,

    // Cross-queue semaphores created by compile this frame, destroyed at reset
    frame_semaphores: Vec<OpalSemaphore>,

    state: RenderGraphState,
    stats: RenderGraphStats,
}

impl RenderGraph {
    pub fn new(device_context: Arc<dyn DeviceContext>) -> Self {
        RenderGraph {
            registry: RenderGraphRegistry::new(device_context),
            blackboard: Default::default(),
            passes: Default::default(),
            texture_lifetimes: Default::default(),
            buffer_lifetimes: Default::default(),
            frame_semaphores: Default::default(),
            state: RenderGraphState::Idle,
            stats: Default::default(),
        }
    }

    /// Register a pass. `construct_fn` receives the builder, declares the pass's resource
    /// accesses, and returns the deferred execution callback that will record the pass's commands
    /// during evaluation. Declarations are captured by value; the callback runs exactly once.
    pub fn add_pass<ConstructFnT, ExecuteFnT>(
        &mut self,
        name: RenderGraphPassName,
        construct_fn: ConstructFnT,
    ) where
        ConstructFnT: FnOnce(&mut RenderGraphBuilder) -> ExecuteFnT,
        ExecuteFnT:
            FnOnce(&mut RenderGraphRegistry, &mut dyn CommandWriter) -> OpalResult<()> + 'static,
    {
        assert!(
            matches!(
                self.state,
                RenderGraphState::Idle | RenderGraphState::Building
            ),
            "add_pass called without resetting the previous frame"
        );
        self.state = RenderGraphState::Building;

        let mut pass = RenderGraphPass::new(name);
        let mut builder = RenderGraphBuilder::new(&mut self.registry, &mut pass);
        let execute_fn = (construct_fn)(&mut builder);
        pass.executable = Some(Box::new(execute_fn));

        log::trace!("added pass {} {:?}", self.passes.len(), name);
        self.passes.push(pass);
    }

    /// Walk all passes to build per-resource lifetimes, then synthesize the barriers and
    /// semaphores needed to execute them correctly
    pub fn compile(&mut self) -> OpalResult<()> {
        assert!(
            matches!(
                self.state,
                RenderGraphState::Idle | RenderGraphState::Building
            ),
            "compile called twice in one frame"
        );

        let compile_start = Instant::now();
        self.construct_resource_lifetimes();
        self.construct_sync_structures()?;
        self.stats.compile_time = compile_start.elapsed();

        log::debug!(
            "compiled {} passes ({} textures, {} buffers, {} semaphores)",
            self.passes.len(),
            self.registry.texture_count(),
            self.registry.buffer_count(),
            self.frame_semaphores.len()
        );

        self.state = RenderGraphState::Compiled;
        Ok(())
    }

    #[profiling::function]
    fn construct_resource_lifetimes(&mut self) {
        self.texture_lifetimes = (0..self.registry.texture_count())
            .map(|index| ResourceLifetime {
                initial_state: self.registry.texture_initial_state(GraphTextureId(index)),
                snapshots: Vec::default(),
            })
            .collect();
        self.buffer_lifetimes = (0..self.registry.buffer_count())
            .map(|_| ResourceLifetime {
                initial_state: OpalResourceState::UNDEFINED,
                snapshots: Vec::default(),
            })
            .collect();

        for (pass_index, pass) in self.passes.iter().enumerate() {
            let queue = pass.queue;
            let mut seen_textures = FnvHashSet::<GraphTextureId>::default();
            let mut seen_buffers = FnvHashSet::<GraphBufferId>::default();

            let texture_accesses = pass
                .texture_reads
                .iter()
                .map(|x| (x.texture, x.state, RenderGraphAccess::Read))
                .chain(
                    pass.texture_writes
                        .iter()
                        .map(|x| (x.texture, x.state, RenderGraphAccess::Write)),
                )
                .chain(
                    pass.texture_modifies
                        .iter()
                        .map(|x| (x.texture, x.state, RenderGraphAccess::ReadWrite)),
                );

            for (texture, state, access) in texture_accesses {
                // If this trips, the texture was used in multiple ways during the same pass
                assert!(seen_textures.insert(texture));
                self.texture_lifetimes[texture.0].snapshots.push(UsageSnapshot {
                    access,
                    state,
                    pass_index,
                    queue,
                });
            }

            let buffer_accesses = pass
                .buffer_reads
                .iter()
                .map(|x| (x.buffer, x.state, RenderGraphAccess::Read))
                .chain(
                    pass.buffer_writes
                        .iter()
                        .map(|x| (x.buffer, x.state, RenderGraphAccess::Write)),
                )
                .chain(
                    pass.buffer_modifies
                        .iter()
                        .map(|x| (x.buffer, x.state, RenderGraphAccess::ReadWrite)),
                );

            for (buffer, state, access) in buffer_accesses {
                // If this trips, the buffer was used in multiple ways during the same pass
                assert!(seen_buffers.insert(buffer));
                self.buffer_lifetimes[buffer.0].snapshots.push(UsageSnapshot {
                    access,
                    state,
                    pass_index,
                    queue,
                });
            }
        }
    }

    /// For each resource lifetime: the first access transitions out of the initial state; every
    /// consecutive pair either crosses queues (semaphore + release/acquire ownership transfer),
    /// is a read following a read in an identical state (no synchronization needed), or gets a
    /// plain same-queue barrier.
    #[profiling::function]
    fn construct_sync_structures(&mut self) -> OpalResult<()> {
        let device_context = self.registry.device_context().clone();

        for index in 0..self.texture_lifetimes.len() {
            let id = GraphTextureId(index);
            let lifetime = &self.texture_lifetimes[index];
            if lifetime.snapshots.is_empty() {
                log::warn!(
                    "texture {:?} was created but never accessed by any pass",
                    self.registry.texture_name(id)
                );
                continue;
            }

            let first = lifetime.snapshots[0];
            self.passes[first.pass_index]
                .texture_barriers
                .push(PassTextureBarrier {
                    texture: id,
                    src_state: lifetime.initial_state,
                    dst_state: first.state,
                });

            for i in 1..lifetime.snapshots.len() {
                let prev = lifetime.snapshots[i - 1];
                let curr = lifetime.snapshots[i];

                if prev.queue != curr.queue {
                    let semaphore = device_context.create_semaphore()?;
                    self.frame_semaphores.push(semaphore);

                    log::trace!(
                        "texture {:?} crosses {:?} -> {:?}, semaphore {:?}",
                        self.registry.texture_name(id),
                        prev.queue,
                        curr.queue,
                        semaphore
                    );

                    self.passes[prev.pass_index].signal_semaphores.push(semaphore);
                    self.passes[curr.pass_index]
                        .wait_semaphores
                        .push(OpalSemaphoreWait {
                            semaphore,
                            stage: curr.state.pipeline_stage(),
                        });

                    self.passes[prev.pass_index]
                        .texture_release_barriers
                        .push(PassTextureReleaseBarrier {
                            texture: id,
                            src_state: prev.state,
                            dst_state: curr.state,
                            destination_queue: curr.queue,
                        });
                    self.passes[curr.pass_index]
                        .texture_acquire_barriers
                        .push(PassTextureAcquireBarrier {
                            texture: id,
                            src_state: prev.state,
                            dst_state: curr.state,
                            source_queue: prev.queue,
                        });
                } else if prev.state == curr.state && curr.access == RenderGraphAccess::Read {
                    // Back-to-back reads in an already-correct layout need no synchronization.
                    // Note the asymmetry: a write following a read in the same state still gets a
                    // barrier below.
                    log::trace!(
                        "texture {:?} read-after-read in {:?}, no barrier",
                        self.registry.texture_name(id),
                        curr.state
                    );
                } else {
                    self.passes[curr.pass_index]
                        .texture_barriers
                        .push(PassTextureBarrier {
                            texture: id,
                            src_state: prev.state,
                            dst_state: curr.state,
                        });
                }
            }
        }

        for index in 0..self.buffer_lifetimes.len() {
            let id = GraphBufferId(index);
            let lifetime = &self.buffer_lifetimes[index];
            if lifetime.snapshots.is_empty() {
                log::warn!(
                    "buffer {:?} was created but never accessed by any pass",
                    self.registry.buffer_name(id)
                );
                continue;
            }

            let first = lifetime.snapshots[0];
            self.passes[first.pass_index]
                .buffer_barriers
                .push(PassBufferBarrier {
                    buffer: id,
                    src_state: lifetime.initial_state,
                    dst_state: first.state,
                });

            for i in 1..lifetime.snapshots.len() {
                let prev = lifetime.snapshots[i - 1];
                let curr = lifetime.snapshots[i];

                if prev.queue != curr.queue {
                    let semaphore = device_context.create_semaphore()?;
                    self.frame_semaphores.push(semaphore);

                    log::trace!(
                        "buffer {:?} crosses {:?} -> {:?}, semaphore {:?}",
                        self.registry.buffer_name(id),
                        prev.queue,
                        curr.queue,
                        semaphore
                    );

                    self.passes[prev.pass_index].signal_semaphores.push(semaphore);
                    self.passes[curr.pass_index]
                        .wait_semaphores
                        .push(OpalSemaphoreWait {
                            semaphore,
                            stage: curr.state.pipeline_stage(),
                        });

                    self.passes[prev.pass_index]
                        .buffer_release_barriers
                        .push(PassBufferReleaseBarrier {
                            buffer: id,
                            src_state: prev.state,
                            dst_state: curr.state,
                            destination_queue: curr.queue,
                        });
                    self.passes[curr.pass_index]
                        .buffer_acquire_barriers
                        .push(PassBufferAcquireBarrier {
                            buffer: id,
                            src_state: prev.state,
                            dst_state: curr.state,
                            source_queue: prev.queue,
                        });
                } else if prev.state == curr.state && curr.access == RenderGraphAccess::Read {
                    log::trace!(
                        "buffer {:?} read-after-read in {:?}, no barrier",
                        self.registry.buffer_name(id),
                        curr.state
                    );
                } else {
                    self.passes[curr.pass_index]
                        .buffer_barriers
                        .push(PassBufferBarrier {
                            buffer: id,
                            src_state: prev.state,
                            dst_state: curr.state,
                        });
                }
            }
        }

        Ok(())
    }

    /// Execute all passes in declaration order, recording into queue-specific command buffers. A
    /// submission is issued whenever the target queue changes or the previous pass signaled a
    /// cross-queue semaphore (the consuming queue may not wait on a semaphore that has not been
    /// submitted for signal).
    pub fn evaluate(&mut self) -> OpalResult<()> {
        profiling::scope!("Evaluate Render Graph");
        assert!(
            self.state == RenderGraphState::Compiled,
            "evaluate called on an uncompiled graph"
        );

        let evaluate_start = Instant::now();
        let device_context = self.registry.device_context().clone();

        let mut command_writer: Option<Box<dyn CommandWriter>> = None;
        let mut writer_queue = OpalQueueType::Graphics;
        let mut pending_waits: Vec<OpalSemaphoreWait> = Vec::default();
        let mut pending_signals: Vec<OpalSemaphore> = Vec::default();
        let mut submit_pending = false;

        self.stats.pass_timings.clear();
        let mut render_pass_count = 0;

        for pass_index in 0..self.passes.len() {
            let pass_queue = self.passes[pass_index].queue;

            if let Some(writer) = command_writer.take() {
                if pass_queue != writer_queue || submit_pending {
                    device_context.submit_command_buffer(
                        writer,
                        writer_queue,
                        &pending_waits,
                        &pending_signals,
                    )?;
                    pending_waits.clear();
                    pending_signals.clear();
                } else {
                    command_writer = Some(writer);
                }
            }
            submit_pending = false;

            if command_writer.is_none() {
                writer_queue = pass_queue;
                command_writer = Some(device_context.begin_command_buffer(pass_queue)?);
            }
            // unwrap is safe, assigned above if it was None
            let writer = command_writer.as_mut().unwrap();

            pending_waits.extend_from_slice(&self.passes[pass_index].wait_semaphores);

            let pass_start = Instant::now();
            if self.evaluate_pass(pass_index, writer.as_mut())? {
                render_pass_count += 1;
            }
            let pass = &self.passes[pass_index];
            self.stats
                .pass_timings
                .push((pass.name, pass_start.elapsed()));

            pending_signals.extend_from_slice(&pass.signal_semaphores);
            submit_pending = pass.has_cross_queue_signals();
        }

        if let Some(writer) = command_writer.take() {
            device_context.submit_command_buffer(
                writer,
                writer_queue,
                &pending_waits,
                &pending_signals,
            )?;
        }

        self.stats.pass_count = self.passes.len();
        self.stats.render_pass_count = render_pass_count;
        self.stats.alive_texture_count = self.registry.alive_texture_count();
        self.stats.alive_buffer_count = self.registry.alive_buffer_count();
        self.stats.cached_render_pass_count = self.registry.cache().render_pass_count();
        self.stats.cached_framebuffer_count = self.registry.cache().framebuffer_count();
        self.stats.evaluate_time = evaluate_start.elapsed();

        log::debug!(
            "evaluated {} passes in {:?}",
            self.stats.pass_count,
            self.stats.evaluate_time
        );

        self.state = RenderGraphState::Evaluated;
        Ok(())
    }

    // Returns true if the pass executed inside a renderpass scope
    fn evaluate_pass(
        &mut self,
        pass_index: usize,
        command_writer: &mut dyn CommandWriter,
    ) -> OpalResult<bool> {
        profiling::scope!("pass", self.passes[pass_index].name);
        log::trace!(
            "evaluate pass {} {:?}",
            pass_index,
            self.passes[pass_index].name
        );

        //
        // Acquire barriers first (claim ownership from the sending queue), then plain same-queue
        // transitions
        //
        let mut texture_barriers = Vec::default();
        let mut buffer_barriers = Vec::default();

        for barrier in &self.passes[pass_index].texture_acquire_barriers {
            texture_barriers.push(OpalTextureBarrier {
                texture: self.registry.texture_by_id(barrier.texture)?,
                src_state: barrier.src_state,
                dst_state: barrier.dst_state,
                queue_transition: OpalBarrierQueueTransition::AcquireFrom(barrier.source_queue),
            });
        }
        for barrier in &self.passes[pass_index].texture_barriers {
            texture_barriers.push(OpalTextureBarrier {
                texture: self.registry.texture_by_id(barrier.texture)?,
                src_state: barrier.src_state,
                dst_state: barrier.dst_state,
                queue_transition: OpalBarrierQueueTransition::None,
            });
        }
        for barrier in &self.passes[pass_index].buffer_acquire_barriers {
            buffer_barriers.push(OpalBufferBarrier {
                buffer: self.registry.buffer_by_id(barrier.buffer)?,
                src_state: barrier.src_state,
                dst_state: barrier.dst_state,
                queue_transition: OpalBarrierQueueTransition::AcquireFrom(barrier.source_queue),
            });
        }
        for barrier in &self.passes[pass_index].buffer_barriers {
            buffer_barriers.push(OpalBufferBarrier {
                buffer: self.registry.buffer_by_id(barrier.buffer)?,
                src_state: barrier.src_state,
                dst_state: barrier.dst_state,
                queue_transition: OpalBarrierQueueTransition::None,
            });
        }

        if !texture_barriers.is_empty() || !buffer_barriers.is_empty() {
            command_writer.cmd_resource_barrier(&buffer_barriers, &texture_barriers)?;
        }

        //
        // The pass body, wrapped in a renderpass scope if this is a render pass with attachments
        //
        let is_render = self.passes[pass_index].pass_type == RenderGraphPassType::Render
            && self.has_attachments(pass_index);

        if is_render {
            let (render_pass, framebuffer, extents, color_clears, depth_clear) =
                self.resolve_render_pass(pass_index)?;
            command_writer.cmd_begin_render_pass(
                render_pass,
                framebuffer,
                extents,
                &color_clears,
                depth_clear,
            )?;

            if let Some(executable) = self.passes[pass_index].executable.take() {
                executable.execute(&mut self.registry, command_writer)?;
            }

            command_writer.cmd_end_render_pass()?;
        } else if let Some(executable) = self.passes[pass_index].executable.take() {
            executable.execute(&mut self.registry, command_writer)?;
        }

        //
        // Release barriers after the pass body: relinquish ownership to the consuming queues
        //
        let mut texture_barriers = Vec::default();
        let mut buffer_barriers = Vec::default();

        for barrier in &self.passes[pass_index].texture_release_barriers {
            texture_barriers.push(OpalTextureBarrier {
                texture: self.registry.texture_by_id(barrier.texture)?,
                src_state: barrier.src_state,
                dst_state: barrier.dst_state,
                queue_transition: OpalBarrierQueueTransition::ReleaseTo(barrier.destination_queue),
            });
        }
        for barrier in &self.passes[pass_index].buffer_release_barriers {
            buffer_barriers.push(OpalBufferBarrier {
                buffer: self.registry.buffer_by_id(barrier.buffer)?,
                src_state: barrier.src_state,
                dst_state: barrier.dst_state,
                queue_transition: OpalBarrierQueueTransition::ReleaseTo(barrier.destination_queue),
            });
        }

        if !texture_barriers.is_empty() || !buffer_barriers.is_empty() {
            command_writer.cmd_resource_barrier(&buffer_barriers, &texture_barriers)?;
        }

        Ok(is_render)
    }

    fn has_attachments(
        &self,
        pass_index: usize,
    ) -> bool {
        let pass = &self.passes[pass_index];
        !pass.color_attachments.is_empty()
            || pass.depth_attachment.is_some()
            || !pass.resolve_attachments.is_empty()
    }

    // Resolve the cached renderpass/framebuffer objects for a render pass from its accumulated
    // attachment metadata. Attachment order in the framebuffer is colors, depth, resolves.
    fn resolve_render_pass(
        &mut self,
        pass_index: usize,
    ) -> OpalResult<(
        OpalRenderPass,
        OpalFramebuffer,
        OpalExtents2D,
        Vec<OpalColorClearValue>,
        Option<OpalDepthStencilClearValue>,
    )> {
        let mut render_pass_def = OpalRenderPassDef::default();
        let mut attachments = Vec::default();
        let mut extents: Option<OpalExtents2D> = None;
        let mut color_clears = Vec::default();
        let mut depth_clear = None;

        for color_index in 0..self.passes[pass_index].color_attachments.len() {
            let info = self.passes[pass_index].color_attachments[color_index].clone();
            let texture_def = self.registry.texture_def(info.texture);
            render_pass_def.color_attachments.push(OpalAttachmentDef {
                format: texture_def.format,
                sample_count: texture_def.sample_count,
                load_op: info.load_op,
                store_op: info.store_op,
            });
            extents.get_or_insert(texture_def.extents.to_2d());
            color_clears.push(info.clear_value.unwrap_or_default());
            attachments.push(OpalFramebufferAttachment {
                texture: self.registry.texture_by_id(info.texture)?,
                array_slice: info.array_slice,
            });
        }

        if let Some(info) = self.passes[pass_index].depth_attachment.clone() {
            let texture_def = self.registry.texture_def(info.texture);
            render_pass_def.depth_attachment = Some(OpalAttachmentDef {
                format: texture_def.format,
                sample_count: texture_def.sample_count,
                load_op: info.load_op,
                store_op: info.store_op,
            });
            extents.get_or_insert(texture_def.extents.to_2d());
            depth_clear = info.clear_value;
            attachments.push(OpalFramebufferAttachment {
                texture: self.registry.texture_by_id(info.texture)?,
                array_slice: info.array_slice,
            });
        }

        for resolve_index in 0..self.passes[pass_index].resolve_attachments.len() {
            let info = self.passes[pass_index].resolve_attachments[resolve_index].clone();
            let texture_def = self.registry.texture_def(info.texture);
            render_pass_def.resolve_attachments.push(OpalAttachmentDef {
                format: texture_def.format,
                sample_count: texture_def.sample_count,
                load_op: OpalLoadOp::DontCare,
                store_op: info.store_op,
            });
            attachments.push(OpalFramebufferAttachment {
                texture: self.registry.texture_by_id(info.texture)?,
                array_slice: info.array_slice,
            });
        }

        let device_context = self.registry.device_context().clone();
        let render_pass = self
            .registry
            .cache_mut()
            .get_or_create_render_pass(&*device_context, &render_pass_def)?;

        let extents = extents.unwrap_or_default();
        let framebuffer_def = OpalFramebufferDef {
            render_pass,
            attachments,
            extents,
        };
        let framebuffer = self
            .registry
            .cache_mut()
            .get_or_create_framebuffer(&*device_context, &framebuffer_def)?;

        Ok((render_pass, framebuffer, extents, color_clears, depth_clear))
    }

    /// Clear all per-frame state: destroy this frame's cross-queue semaphores, drop the pass list
    /// and lifetime tables, clear the blackboard, reset the registry, and advance the resource
    /// cache. Must run exactly once per frame, after `evaluate`.
    pub fn reset(&mut self) -> OpalResult<()> {
        assert!(
            self.state == RenderGraphState::Evaluated,
            "reset called mid-frame"
        );

        let device_context = self.registry.device_context().clone();
        for semaphore in self.frame_semaphores.drain(..) {
            device_context.destroy_semaphore(semaphore)?;
        }

        self.passes.clear();
        self.texture_lifetimes.clear();
        self.buffer_lifetimes.clear();
        self.blackboard.clear();
        self.registry.reset();
        self.registry
            .cache_mut()
            .on_frame_complete(&*device_context)?;

        self.state = RenderGraphState::Idle;
        Ok(())
    }

    /// Tear down everything the graph owns. The device must be idle.
    pub fn destroy(&mut self) -> OpalResult<()> {
        let device_context = self.registry.device_context().clone();
        for semaphore in self.frame_semaphores.drain(..) {
            device_context.destroy_semaphore(semaphore)?;
        }

        self.passes.clear();
        self.texture_lifetimes.clear();
        self.buffer_lifetimes.clear();
        self.blackboard.clear();
        self.registry.reset();
        self.registry.cache_mut().destroy(&*device_context)?;

        self.state = RenderGraphState::Idle;
        Ok(())
    }

    pub fn write_blackboard(
        &mut self,
        key: &'static str,
        value: impl Into<BlackboardValue>,
    ) {
        self.blackboard.write(key, value);
    }

    pub fn read_blackboard(
        &self,
        key: &str,
    ) -> Option<&BlackboardValue> {
        self.blackboard.read(key)
    }

    pub fn registry(&self) -> &RenderGraphRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &RenderGraphStats {
        &self.stats
    }
}
