use super::*;
use opal_api::{
    CommandWriter, DeviceContext, OpalBarrierQueueTransition, OpalBuffer, OpalBufferBarrier,
    OpalBufferDef, OpalColorClearValue, OpalDepthStencilClearValue, OpalExtents2D, OpalExtents3D,
    OpalFormat, OpalFramebuffer, OpalFramebufferDef, OpalLoadOp, OpalQueueType, OpalRenderPass,
    OpalRenderPassDef, OpalResourceState, OpalResourceType, OpalResult, OpalSemaphore,
    OpalSemaphoreWait, OpalStoreOp, OpalTexture, OpalTextureBarrier, OpalTextureDef,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

fn init_log() {
    let _ = env_logger::Builder::from_default_env()
        .is_test(true)
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
enum RecordedCommand {
    Barrier {
        buffers: Vec<OpalBufferBarrier>,
        textures: Vec<OpalTextureBarrier>,
    },
    BeginRenderPass {
        render_pass: OpalRenderPass,
        framebuffer: OpalFramebuffer,
        extents: OpalExtents2D,
        color_clear_values: Vec<OpalColorClearValue>,
        depth_stencil_clear_value: Option<OpalDepthStencilClearValue>,
    },
    EndRenderPass,
    Marker(&'static str),
}

#[derive(Debug, Clone)]
struct RecordedSubmit {
    queue: OpalQueueType,
    wait_semaphores: Vec<OpalSemaphoreWait>,
    signal_semaphores: Vec<OpalSemaphore>,
    commands: Vec<RecordedCommand>,
}

#[derive(Default)]
struct TestCommandWriter {
    commands: Vec<RecordedCommand>,
}

impl TestCommandWriter {
    fn marker(
        command_writer: &mut dyn CommandWriter,
        name: &'static str,
    ) {
        command_writer
            .as_any_mut()
            .downcast_mut::<TestCommandWriter>()
            .unwrap()
            .commands
            .push(RecordedCommand::Marker(name));
    }
}

impl CommandWriter for TestCommandWriter {
    fn cmd_resource_barrier(
        &mut self,
        buffer_barriers: &[OpalBufferBarrier],
        texture_barriers: &[OpalTextureBarrier],
    ) -> OpalResult<()> {
        self.commands.push(RecordedCommand::Barrier {
            buffers: buffer_barriers.to_vec(),
            textures: texture_barriers.to_vec(),
        });
        Ok(())
    }

    fn cmd_begin_render_pass(
        &mut self,
        render_pass: OpalRenderPass,
        framebuffer: OpalFramebuffer,
        extents: OpalExtents2D,
        color_clear_values: &[OpalColorClearValue],
        depth_stencil_clear_value: Option<OpalDepthStencilClearValue>,
    ) -> OpalResult<()> {
        self.commands.push(RecordedCommand::BeginRenderPass {
            render_pass,
            framebuffer,
            extents,
            color_clear_values: color_clear_values.to_vec(),
            depth_stencil_clear_value,
        });
        Ok(())
    }

    fn cmd_end_render_pass(&mut self) -> OpalResult<()> {
        self.commands.push(RecordedCommand::EndRenderPass);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Hands out unique handles and records every submission so tests can assert on the exact
/// barrier/semaphore structure the graph produced
#[derive(Default)]
struct TestDeviceContext {
    next_handle: AtomicU64,
    textures_created: AtomicU64,
    textures_destroyed: AtomicU64,
    buffers_created: AtomicU64,
    buffers_destroyed: AtomicU64,
    semaphores_created: AtomicU64,
    semaphores_destroyed: AtomicU64,
    render_passes_created: AtomicU64,
    framebuffers_created: AtomicU64,
    render_pass_defs: Mutex<Vec<OpalRenderPassDef>>,
    framebuffer_defs: Mutex<Vec<OpalFramebufferDef>>,
    submits: Mutex<Vec<RecordedSubmit>>,
}

impl TestDeviceContext {
    fn allocate_handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn submits(&self) -> Vec<RecordedSubmit> {
        self.submits.lock().unwrap().clone()
    }

    fn render_pass_defs(&self) -> Vec<OpalRenderPassDef> {
        self.render_pass_defs.lock().unwrap().clone()
    }

    fn textures_created(&self) -> u64 {
        self.textures_created.load(Ordering::Relaxed)
    }

    fn semaphores_created(&self) -> u64 {
        self.semaphores_created.load(Ordering::Relaxed)
    }

    fn semaphores_destroyed(&self) -> u64 {
        self.semaphores_destroyed.load(Ordering::Relaxed)
    }
}

impl DeviceContext for TestDeviceContext {
    fn create_texture(
        &self,
        texture_def: &OpalTextureDef,
    ) -> OpalResult<OpalTexture> {
        texture_def.verify();
        self.textures_created.fetch_add(1, Ordering::Relaxed);
        Ok(OpalTexture(self.allocate_handle()))
    }

    fn destroy_texture(
        &self,
        _texture: OpalTexture,
    ) -> OpalResult<()> {
        self.textures_destroyed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn create_buffer(
        &self,
        buffer_def: &OpalBufferDef,
    ) -> OpalResult<OpalBuffer> {
        buffer_def.verify();
        self.buffers_created.fetch_add(1, Ordering::Relaxed);
        Ok(OpalBuffer(self.allocate_handle()))
    }

    fn destroy_buffer(
        &self,
        _buffer: OpalBuffer,
    ) -> OpalResult<()> {
        self.buffers_destroyed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn create_semaphore(&self) -> OpalResult<OpalSemaphore> {
        self.semaphores_created.fetch_add(1, Ordering::Relaxed);
        Ok(OpalSemaphore(self.allocate_handle()))
    }

    fn destroy_semaphore(
        &self,
        _semaphore: OpalSemaphore,
    ) -> OpalResult<()> {
        self.semaphores_destroyed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn create_render_pass(
        &self,
        render_pass_def: &OpalRenderPassDef,
    ) -> OpalResult<OpalRenderPass> {
        self.render_passes_created.fetch_add(1, Ordering::Relaxed);
        self.render_pass_defs
            .lock()
            .unwrap()
            .push(render_pass_def.clone());
        Ok(OpalRenderPass(self.allocate_handle()))
    }

    fn destroy_render_pass(
        &self,
        _render_pass: OpalRenderPass,
    ) -> OpalResult<()> {
        Ok(())
    }

    fn create_framebuffer(
        &self,
        framebuffer_def: &OpalFramebufferDef,
    ) -> OpalResult<OpalFramebuffer> {
        self.framebuffers_created.fetch_add(1, Ordering::Relaxed);
        self.framebuffer_defs
            .lock()
            .unwrap()
            .push(framebuffer_def.clone());
        Ok(OpalFramebuffer(self.allocate_handle()))
    }

    fn destroy_framebuffer(
        &self,
        _framebuffer: OpalFramebuffer,
    ) -> OpalResult<()> {
        Ok(())
    }

    fn begin_command_buffer(
        &self,
        _queue: OpalQueueType,
    ) -> OpalResult<Box<dyn CommandWriter>> {
        Ok(Box::new(TestCommandWriter::default()))
    }

    fn submit_command_buffer(
        &self,
        mut command_buffer: Box<dyn CommandWriter>,
        queue: OpalQueueType,
        wait_semaphores: &[OpalSemaphoreWait],
        signal_semaphores: &[OpalSemaphore],
    ) -> OpalResult<()> {
        let writer = command_buffer
            .as_any_mut()
            .downcast_mut::<TestCommandWriter>()
            .unwrap();
        self.submits.lock().unwrap().push(RecordedSubmit {
            queue,
            wait_semaphores: wait_semaphores.to_vec(),
            signal_semaphores: signal_semaphores.to_vec(),
            commands: std::mem::take(&mut writer.commands),
        });
        Ok(())
    }
}

fn test_device() -> Arc<TestDeviceContext> {
    init_log();
    Arc::new(TestDeviceContext::default())
}

fn color_texture_def() -> OpalTextureDef {
    OpalTextureDef {
        extents: OpalExtents3D {
            width: 800,
            height: 600,
            depth: 1,
        },
        format: OpalFormat::R8G8B8A8_UNORM,
        ..Default::default()
    }
}

fn run_frame(graph: &mut RenderGraph) {
    graph.compile().unwrap();
    graph.evaluate().unwrap();
    graph.reset().unwrap();
}

fn all_texture_barriers(submits: &[RecordedSubmit]) -> Vec<OpalTextureBarrier> {
    submits
        .iter()
        .flat_map(|submit| submit.commands.iter())
        .filter_map(|command| match command {
            RecordedCommand::Barrier { textures, .. } => Some(textures.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn all_buffer_barriers(submits: &[RecordedSubmit]) -> Vec<OpalBufferBarrier> {
    submits
        .iter()
        .flat_map(|submit| submit.commands.iter())
        .filter_map(|command| match command {
            RecordedCommand::Barrier { buffers, .. } => Some(buffers.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

#[test]
fn single_pass_no_synchronization() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture(
            "color",
            OpalResourceState::RENDER_TARGET,
            Some(AttachmentClearValue::Color(OpalColorClearValue(
                [0.0, 0.0, 0.0, 1.0],
            ))),
            None,
        );
        |_registry: &mut RenderGraphRegistry, command_writer: &mut dyn CommandWriter| {
            TestCommandWriter::marker(command_writer, "opaque");
            Ok(())
        }
    });
    run_frame(&mut graph);

    let submits = device.submits();
    assert_eq!(1, submits.len());
    assert_eq!(OpalQueueType::Graphics, submits[0].queue);
    assert!(submits[0].wait_semaphores.is_empty());
    assert!(submits[0].signal_semaphores.is_empty());
    assert_eq!(0, device.semaphores_created());

    let barriers = all_texture_barriers(&submits);
    assert_eq!(1, barriers.len());
    assert_eq!(OpalResourceState::UNDEFINED, barriers[0].src_state);
    assert_eq!(OpalResourceState::RENDER_TARGET, barriers[0].dst_state);
    assert_eq!(OpalBarrierQueueTransition::None, barriers[0].queue_transition);
}

#[test]
fn render_pass_wraps_executable() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, command_writer: &mut dyn CommandWriter| {
            TestCommandWriter::marker(command_writer, "draw");
            Ok(())
        }
    });
    run_frame(&mut graph);

    let submits = device.submits();
    let commands = &submits[0].commands;

    // Barrier, begin, body, end
    assert_eq!(4, commands.len());
    assert!(matches!(commands[0], RecordedCommand::Barrier { .. }));
    match &commands[1] {
        RecordedCommand::BeginRenderPass {
            extents,
            color_clear_values,
            ..
        } => {
            assert_eq!(
                OpalExtents2D {
                    width: 800,
                    height: 600
                },
                *extents
            );
            // No clear value declared, don't-care load with a default clear slot
            assert_eq!(1, color_clear_values.len());
        }
        other => panic!("expected BeginRenderPass, got {:?}", other),
    }
    assert_eq!(RecordedCommand::Marker("draw"), commands[2]);
    assert_eq!(RecordedCommand::EndRenderPass, commands[3]);

    assert_eq!(1, graph.stats().render_pass_count);
}

#[test]
fn callback_pass_gets_raw_writer() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("upload", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.create_buffer(
            "staging",
            OpalBufferDef {
                size: 1024,
                ..Default::default()
            },
        );
        builder.write_buffer("staging", OpalResourceState::COPY_DST);
        |_registry: &mut RenderGraphRegistry, command_writer: &mut dyn CommandWriter| {
            TestCommandWriter::marker(command_writer, "upload");
            Ok(())
        }
    });
    run_frame(&mut graph);

    let submits = device.submits();
    assert!(!submits[0]
        .commands
        .iter()
        .any(|x| matches!(x, RecordedCommand::BeginRenderPass { .. })));
    assert_eq!(0, graph.stats().render_pass_count);
}

#[test]
fn write_then_sampled_read_single_queue() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("postprocess", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("color", OpalResourceState::PIXEL_SHADER_RESOURCE);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    let submits = device.submits();
    // Same queue, no cross-queue signals, so both passes batch into one submission
    assert_eq!(1, submits.len());
    assert_eq!(0, device.semaphores_created());

    let barriers = all_texture_barriers(&submits);
    assert_eq!(2, barriers.len());
    assert_eq!(OpalResourceState::UNDEFINED, barriers[0].src_state);
    assert_eq!(OpalResourceState::RENDER_TARGET, barriers[0].dst_state);
    assert_eq!(OpalResourceState::RENDER_TARGET, barriers[1].src_state);
    assert_eq!(
        OpalResourceState::PIXEL_SHADER_RESOURCE,
        barriers[1].dst_state
    );
}

#[test]
fn read_after_read_is_elided() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    for name in ["bloom", "tonemap"] {
        graph.add_pass(name, |builder| {
            builder.set_pass_type(RenderGraphPassType::Callback);
            builder.read_texture("color", OpalResourceState::PIXEL_SHADER_RESOURCE);
            |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
        });
    }
    run_frame(&mut graph);

    // Initial transition plus one into the sampled state; the second read needs nothing
    let barriers = all_texture_barriers(&device.submits());
    assert_eq!(2, barriers.len());
}

#[test]
fn write_after_read_same_state_is_not_elided() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("produce", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.create_texture("scratch", color_texture_def());
        builder.write_texture("scratch", OpalResourceState::UNORDERED_ACCESS, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("inspect", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("scratch", OpalResourceState::UNORDERED_ACCESS);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("overwrite", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.write_texture("scratch", OpalResourceState::UNORDERED_ACCESS, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    let barriers = all_texture_barriers(&device.submits());
    // The read after the write is elided (same state), but the write after the read is not
    assert_eq!(2, barriers.len());
    assert_eq!(OpalResourceState::UNDEFINED, barriers[0].src_state);
    assert_eq!(OpalResourceState::UNORDERED_ACCESS, barriers[1].src_state);
    assert_eq!(OpalResourceState::UNORDERED_ACCESS, barriers[1].dst_state);
}

#[test]
fn cross_queue_texture_handoff() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("shadow", |builder| {
        builder.create_texture("shadow_map", color_texture_def());
        builder.write_texture("shadow_map", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("lighting", |builder| {
        builder.set_queue(OpalQueueType::Compute);
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("shadow_map", OpalResourceState::SHADER_RESOURCE);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    assert_eq!(1, device.semaphores_created());
    let submits = device.submits();
    assert_eq!(2, submits.len());

    let graphics = &submits[0];
    let compute = &submits[1];
    assert_eq!(OpalQueueType::Graphics, graphics.queue);
    assert_eq!(OpalQueueType::Compute, compute.queue);

    // Producer signals, consumer waits at the stage that consumes the new state
    assert_eq!(1, graphics.signal_semaphores.len());
    assert_eq!(1, compute.wait_semaphores.len());
    assert_eq!(
        graphics.signal_semaphores[0],
        compute.wait_semaphores[0].semaphore
    );
    assert_eq!(
        OpalResourceState::SHADER_RESOURCE.pipeline_stage(),
        compute.wait_semaphores[0].stage
    );

    // Release after the producing pass, acquire before the consuming pass
    let release = all_texture_barriers(std::slice::from_ref(graphics))
        .into_iter()
        .find(|x| x.queue_transition != OpalBarrierQueueTransition::None)
        .unwrap();
    assert_eq!(
        OpalBarrierQueueTransition::ReleaseTo(OpalQueueType::Compute),
        release.queue_transition
    );
    assert_eq!(OpalResourceState::RENDER_TARGET, release.src_state);
    assert_eq!(OpalResourceState::SHADER_RESOURCE, release.dst_state);

    let acquire = all_texture_barriers(std::slice::from_ref(compute))
        .into_iter()
        .find(|x| x.queue_transition != OpalBarrierQueueTransition::None)
        .unwrap();
    assert_eq!(
        OpalBarrierQueueTransition::AcquireFrom(OpalQueueType::Graphics),
        acquire.queue_transition
    );
    assert_eq!(release.src_state, acquire.src_state);
    assert_eq!(release.dst_state, acquire.dst_state);
}

#[test]
fn compute_to_graphics_buffer_handoff() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("skin", |builder| {
        builder.set_queue(OpalQueueType::Compute);
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.create_buffer(
            "skinned_vertices",
            OpalBufferDef {
                size: 64 * 1024,
                ..Default::default()
            },
        );
        builder.write_buffer("skinned_vertices", OpalResourceState::UNORDERED_ACCESS);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("draw", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_buffer(
            "skinned_vertices",
            OpalResourceState::VERTEX_AND_UNIFORM_BUFFER,
        );
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    assert_eq!(1, device.semaphores_created());
    let submits = device.submits();
    assert_eq!(2, submits.len());
    assert_eq!(OpalQueueType::Compute, submits[0].queue);
    assert_eq!(OpalQueueType::Graphics, submits[1].queue);
    assert_eq!(
        OpalResourceState::VERTEX_AND_UNIFORM_BUFFER.pipeline_stage(),
        submits[1].wait_semaphores[0].stage
    );

    let barriers = all_buffer_barriers(&submits);
    assert!(barriers.iter().any(|x| x.queue_transition
        == OpalBarrierQueueTransition::ReleaseTo(OpalQueueType::Graphics)));
    assert!(barriers.iter().any(|x| x.queue_transition
        == OpalBarrierQueueTransition::AcquireFrom(OpalQueueType::Compute)));
}

#[test]
fn submissions_batch_by_queue() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    for name in ["a", "b"] {
        graph.add_pass(name, |builder| {
            builder.set_pass_type(RenderGraphPassType::Callback);
            |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
        });
    }
    graph.add_pass("c", |builder| {
        builder.set_queue(OpalQueueType::Compute);
        builder.set_pass_type(RenderGraphPassType::Callback);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("d", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    let queues: Vec<_> = device.submits().iter().map(|x| x.queue).collect();
    assert_eq!(
        vec![
            OpalQueueType::Graphics,
            OpalQueueType::Compute,
            OpalQueueType::Graphics
        ],
        queues
    );
}

#[test]
fn cross_queue_signal_splits_submission() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("produce", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.create_texture("shared", color_texture_def());
        builder.write_texture("shared", OpalResourceState::UNORDERED_ACCESS, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    // Same queue as the producer, but the producer's signal must be submitted before the
    // consumer's queue can wait on it, so this pass lands in its own submission
    graph.add_pass("unrelated", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("consume", |builder| {
        builder.set_queue(OpalQueueType::Compute);
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("shared", OpalResourceState::SHADER_RESOURCE);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    let submits = device.submits();
    assert_eq!(3, submits.len());
    assert_eq!(1, submits[0].signal_semaphores.len());
    assert!(submits[1].signal_semaphores.is_empty());
    assert_eq!(1, submits[2].wait_semaphores.len());
}

#[test]
fn dead_resource_is_skipped() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
        // Registered but never read or written by anyone
        builder.create_texture("debug_overlay", color_texture_def());
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    // Only the live texture got a physical allocation
    assert_eq!(1, device.textures_created());
    assert_eq!(1, all_texture_barriers(&device.submits()).len());
}

#[test]
fn attachment_load_ops() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("cleared", |builder| {
        builder.create_texture("a", color_texture_def());
        builder.write_texture(
            "a",
            OpalResourceState::RENDER_TARGET,
            Some(AttachmentClearValue::Color(OpalColorClearValue(
                [1.0, 0.0, 0.0, 1.0],
            ))),
            None,
        );
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("discarded", |builder| {
        builder.create_texture("b", color_texture_def());
        builder.write_texture("b", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("modified", |builder| {
        builder.read_write_texture("a", OpalResourceState::RENDER_TARGET, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    let defs = device.render_pass_defs();
    assert_eq!(3, defs.len());
    assert_eq!(OpalLoadOp::Clear, defs[0].color_attachments[0].load_op);
    assert_eq!(OpalLoadOp::DontCare, defs[1].color_attachments[0].load_op);
    assert_eq!(OpalLoadOp::Load, defs[2].color_attachments[0].load_op);
    for def in &defs {
        assert_eq!(OpalStoreOp::Store, def.color_attachments[0].store_op);
    }

    // The cleared pass forwarded its clear value to the renderpass begin
    let submits = device.submits();
    match &submits[0].commands[1] {
        RecordedCommand::BeginRenderPass {
            color_clear_values, ..
        } => {
            assert_eq!(OpalColorClearValue([1.0, 0.0, 0.0, 1.0]), color_clear_values[0]);
        }
        other => panic!("expected BeginRenderPass, got {:?}", other),
    }
}

#[test]
fn depth_attachment_clear() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("depth_prepass", |builder| {
        builder.create_texture(
            "depth",
            OpalTextureDef {
                extents: OpalExtents3D {
                    width: 800,
                    height: 600,
                    depth: 1,
                },
                format: OpalFormat::D32_SFLOAT,
                ..Default::default()
            },
        );
        builder.write_texture(
            "depth",
            OpalResourceState::DEPTH_WRITE,
            Some(AttachmentClearValue::DepthStencil(
                OpalDepthStencilClearValue {
                    depth: 1.0,
                    stencil: 0,
                },
            )),
            None,
        );
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    let defs = device.render_pass_defs();
    assert!(defs[0].color_attachments.is_empty());
    let depth = defs[0].depth_attachment.as_ref().unwrap();
    assert_eq!(OpalLoadOp::Clear, depth.load_op);
    assert_eq!(OpalFormat::D32_SFLOAT, depth.format);

    match &device.submits()[0].commands[1] {
        RecordedCommand::BeginRenderPass {
            depth_stencil_clear_value,
            ..
        } => {
            assert_eq!(
                Some(OpalDepthStencilClearValue {
                    depth: 1.0,
                    stencil: 0
                }),
                *depth_stencil_clear_value
            );
        }
        other => panic!("expected BeginRenderPass, got {:?}", other),
    }
}

#[test]
#[should_panic]
fn duplicate_create_panics() {
    let device = test_device();
    let mut graph = RenderGraph::new(device);

    graph.add_pass("first", |builder| {
        builder.create_texture("color", color_texture_def());
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("second", |builder| {
        builder.create_texture("color", color_texture_def());
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
}

#[test]
fn usage_flags_accumulate_before_resolve() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("postprocess", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("color", OpalResourceState::PIXEL_SHADER_RESOURCE);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });

    let info = graph.registry().texture_info("color");
    assert!(info
        .resource_type
        .contains(OpalResourceType::RENDER_TARGET_COLOR | OpalResourceType::TEXTURE));

    run_frame(&mut graph);
    assert_eq!(1, device.textures_created());
}

#[test]
fn transient_textures_recycle_across_frames() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    for _ in 0..10 {
        graph.add_pass("opaque", |builder| {
            builder.create_texture("color", color_texture_def());
            builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
            |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
        });
        run_frame(&mut graph);
    }

    // With 2 frames in flight a resolved texture stays reserved for frames F..F+2, so the pool
    // grows to 4 and then recycles
    assert_eq!(4, device.textures_created());
    assert_eq!(4, graph.registry().cache().pooled_texture_count());

    // Reset dropped the logical bindings but kept the pool
    assert_eq!(0, graph.registry().alive_texture_count());
}

#[test]
fn imported_texture_bypasses_cache() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    let swapchain_image = OpalTexture(9999);
    graph.add_pass("composite", |builder| {
        builder.import_texture(
            "swapchain",
            swapchain_image,
            color_texture_def(),
            OpalResourceState::PRESENT,
        );
        builder.write_texture("swapchain", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    assert_eq!(0, device.textures_created());
    let barriers = all_texture_barriers(&device.submits());
    assert_eq!(1, barriers.len());
    assert_eq!(swapchain_image, barriers[0].texture);
    // The imported initial state seeds the first transition
    assert_eq!(OpalResourceState::PRESENT, barriers[0].src_state);
    assert_eq!(OpalResourceState::RENDER_TARGET, barriers[0].dst_state);
}

#[test]
fn render_pass_objects_cached_across_frames() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    for _ in 0..2 {
        graph.add_pass("opaque", |builder| {
            builder.create_texture("color", color_texture_def());
            builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
            |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
        });
        run_frame(&mut graph);
    }

    // The renderpass descriptor is identical both frames; the framebuffer is keyed on the
    // physical texture, which differs while the first frame's texture is still in flight
    assert_eq!(
        1,
        device.render_passes_created.load(Ordering::Relaxed)
    );
    assert_eq!(2, device.framebuffers_created.load(Ordering::Relaxed));
}

#[test]
fn semaphores_destroyed_at_reset() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("produce", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.create_texture("shared", color_texture_def());
        builder.write_texture("shared", OpalResourceState::UNORDERED_ACCESS, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("consume", |builder| {
        builder.set_queue(OpalQueueType::Compute);
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("shared", OpalResourceState::SHADER_RESOURCE);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    assert_eq!(1, device.semaphores_created());
    assert_eq!(1, device.semaphores_destroyed());
}

#[test]
fn blackboard_cleared_at_reset() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.write_blackboard(
        "shadow_map_extents",
        OpalExtents2D {
            width: 2048,
            height: 2048,
        },
    );
    graph.write_blackboard("ssao_enabled", true);

    assert_eq!(
        Some(&BlackboardValue::Extents(OpalExtents2D {
            width: 2048,
            height: 2048
        })),
        graph.read_blackboard("shadow_map_extents")
    );
    assert_eq!(
        Some(&BlackboardValue::Bool(true)),
        graph.read_blackboard("ssao_enabled")
    );

    graph.add_pass("noop", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    run_frame(&mut graph);

    assert_eq!(None, graph.read_blackboard("shadow_map_extents"));
    assert_eq!(None, graph.read_blackboard("ssao_enabled"));
}

#[test]
fn executable_resolves_physical_resources() {
    let device = test_device();
    let mut graph = RenderGraph::new(device.clone());

    graph.add_pass("upload", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.create_buffer(
            "instances",
            OpalBufferDef {
                size: 4096,
                ..Default::default()
            },
        );
        builder.write_buffer("instances", OpalResourceState::COPY_DST);
        |registry: &mut RenderGraphRegistry, command_writer: &mut dyn CommandWriter| {
            // Same handle the barrier compiler resolved for this frame
            let buffer = registry.buffer("instances")?;
            assert_ne!(OpalBuffer(0), buffer);
            TestCommandWriter::marker(command_writer, "copy");
            Ok(())
        }
    });
    run_frame(&mut graph);

    assert_eq!(1, device.buffers_created.load(Ordering::Relaxed));
}

#[test]
fn stats_reflect_frame() {
    let device = test_device();
    let mut graph = RenderGraph::new(device);

    graph.add_pass("opaque", |builder| {
        builder.create_texture("color", color_texture_def());
        builder.write_texture("color", OpalResourceState::RENDER_TARGET, None, None);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.add_pass("postprocess", |builder| {
        builder.set_pass_type(RenderGraphPassType::Callback);
        builder.read_texture("color", OpalResourceState::PIXEL_SHADER_RESOURCE);
        |_registry: &mut RenderGraphRegistry, _command_writer: &mut dyn CommandWriter| Ok(())
    });
    graph.compile().unwrap();
    graph.evaluate().unwrap();

    let stats = graph.stats();
    assert_eq!(2, stats.pass_count);
    assert_eq!(1, stats.render_pass_count);
    assert_eq!(1, stats.alive_texture_count);
    assert_eq!(1, stats.cached_render_pass_count);
    assert_eq!(2, stats.pass_timings.len());
    assert_eq!("opaque", stats.pass_timings[0].0);
    assert_eq!("postprocess", stats.pass_timings[1].0);

    graph.reset().unwrap();
}
