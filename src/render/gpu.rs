use crate::encode::codec::InputSurface;
use crate::foundation::core::Frame;
use crate::foundation::error::{DaylapseError, DaylapseResult};
use crate::render::surface::{PresentationClock, SurfaceRenderer, surface_time_ns};

const QUAD_SHADER: &str = r#"
struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) uv: vec2<f32>,
};

@vertex
fn vs(@location(0) pos: vec2<f32>, @location(1) uv: vec2<f32>) -> VsOut {
  var o: VsOut;
  o.pos = vec4<f32>(pos, 0.0, 1.0);
  o.uv = uv;
  return o;
}

@group(0) @binding(0) var t_src: texture_2d<f32>;
@group(0) @binding(1) var s_src: sampler;

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  return textureSample(t_src, s_src, in.uv);
}
"#;

/// Triangle-strip quad: clip-space position then texture coordinate, v pointing down.
const QUAD_VERTICES: [[f32; 4]; 4] = [
    [-1.0, -1.0, 0.0, 1.0],
    [1.0, -1.0, 1.0, 1.0],
    [-1.0, 1.0, 0.0, 0.0],
    [1.0, 1.0, 1.0, 0.0],
];

struct FrameTexture {
    bind_group: wgpu::BindGroup,
    texture: wgpu::Texture,
    width: u32,
    height: u32,
}

// Fields drop top to bottom: frame texture and targets before the pipeline, device last.
struct Gpu {
    frame: Option<FrameTexture>,
    readback: wgpu::Buffer,
    readback_bytes_per_row: u32,
    target_view: wgpu::TextureView,
    target: wgpu::Texture,
    vertices: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
    queue: wgpu::Queue,
    device: wgpu::Device,
}

/// Headless `wgpu` renderer: frame texture, pass-through quad, row-padded readback.
pub struct GpuSurfaceRenderer {
    gpu: Option<Gpu>,
    surface: Option<Box<dyn InputSurface>>,
    clock: PresentationClock,
    pixels: Vec<u8>,
}

impl GpuSurfaceRenderer {
    /// Acquire an adapter and device and build the quad pipeline for `surface`'s size.
    ///
    /// On failure the surface is released before the error is returned.
    pub fn new(surface: Box<dyn InputSurface>) -> DaylapseResult<Self> {
        Self::with_device(surface, Gpu::new)
    }

    fn with_device(
        mut surface: Box<dyn InputSurface>,
        init: impl FnOnce(u32, u32) -> DaylapseResult<Gpu>,
    ) -> DaylapseResult<Self> {
        let (width, height) = (surface.width(), surface.height());
        let gpu = if width == 0 || height == 0 {
            Err(DaylapseError::resource(format!(
                "input surface has zero area ({width}x{height})"
            )))
        } else {
            init(width, height)
        };
        let gpu = match gpu {
            Ok(gpu) => gpu,
            Err(e) => {
                surface.release();
                return Err(e);
            }
        };
        tracing::debug!(width, height, "gpu renderer initialized");
        Ok(Self {
            gpu: Some(gpu),
            surface: Some(surface),
            clock: PresentationClock::new(),
            pixels: Vec::with_capacity((width as usize) * (height as usize) * 4),
        })
    }
}

impl SurfaceRenderer for GpuSurfaceRenderer {
    fn name(&self) -> &str {
        "gpu"
    }

    fn draw(&mut self, frame: &Frame, presentation_time_us: u64) -> DaylapseResult<()> {
        let (Some(gpu), Some(surface)) = (self.gpu.as_mut(), self.surface.as_mut()) else {
            return Err(DaylapseError::render("draw after release"));
        };
        if frame.is_empty() {
            return Err(DaylapseError::invalid_frame("cannot draw an empty frame"));
        }
        self.clock.advance(presentation_time_us)?;

        gpu.upload(frame);
        gpu.render_into(&mut self.pixels, surface.width(), surface.height())?;
        surface.queue_frame(&self.pixels, surface_time_ns(presentation_time_us))
    }

    fn release(&mut self) {
        // Gpu resources go first (see field order), then the surface.
        let had_gpu = self.gpu.take().is_some();
        if let Some(mut surface) = self.surface.take() {
            surface.release();
        }
        if had_gpu {
            tracing::debug!("gpu renderer released");
        }
    }
}

impl Gpu {
    fn new(width: u32, height: u32) -> DaylapseResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| match e {
            wgpu::RequestAdapterError::NotFound { .. } => {
                DaylapseError::resource("no gpu adapter available")
            }
            other => DaylapseError::resource(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("daylapse_device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .map_err(|e| DaylapseError::resource(format!("wgpu request_device failed: {e:?}")))?;

        let bytes_per_row_unpadded = width
            .checked_mul(4)
            .ok_or_else(|| DaylapseError::resource("render target width overflow"))?;
        let readback_bytes_per_row =
            align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback_size = u64::from(readback_bytes_per_row)
            .checked_mul(u64::from(height))
            .ok_or_else(|| DaylapseError::resource("readback buffer size overflow"))?;

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("daylapse_target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("daylapse_readback"),
            size: readback_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut vertex_bytes = Vec::with_capacity(QUAD_VERTICES.len() * 16);
        for v in QUAD_VERTICES {
            for f in v {
                vertex_bytes.extend_from_slice(&f.to_le_bytes());
            }
        }
        let vertices = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("daylapse_quad"),
            size: vertex_bytes.len() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&vertices, 0, &vertex_bytes);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("daylapse_linear_clamp"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("daylapse_quad_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("daylapse_quad_shader"),
            source: wgpu::ShaderSource::Wgsl(QUAD_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("daylapse_quad_pl"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("daylapse_quad_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: 16,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        },
                        wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 8,
                            shader_location: 1,
                        },
                    ],
                }],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            sampler,
            vertices,
            target,
            target_view,
            readback,
            readback_bytes_per_row,
            frame: None,
        })
    }

    fn upload(&mut self, frame: &Frame) {
        let (width, height) = frame.dimensions();
        let reuse = self
            .frame
            .as_ref()
            .is_some_and(|t| t.width == width && t.height == height);
        if !reuse {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("daylapse_frame"),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("daylapse_frame_bg"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                ],
            });
            self.frame = Some(FrameTexture {
                texture,
                bind_group,
                width,
                height,
            });
        }

        if let Some(tex) = self.frame.as_ref() {
            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &tex.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                frame.as_raw(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(width * 4),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }
    }

    fn render_into(&mut self, out: &mut Vec<u8>, width: u32, height: u32) -> DaylapseResult<()> {
        let tex = self
            .frame
            .as_ref()
            .ok_or_else(|| DaylapseError::render("no frame uploaded"))?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("daylapse_quad_encoder"),
            });
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("daylapse_quad_rp"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &tex.bind_group, &[]);
            rp.set_vertex_buffer(0, self.vertices.slice(..));
            rp.draw(0..4, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.readback_bytes_per_row),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let buffer_slice = self.readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| DaylapseError::render(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| DaylapseError::render("readback channel closed"))?
            .map_err(|e| DaylapseError::render(format!("readback map failed: {e:?}")))?;

        {
            let mapped = buffer_slice.get_mapped_range();
            let row_bytes = (width as usize) * 4;
            let padded_row_bytes = self.readback_bytes_per_row as usize;
            out.clear();
            for row in 0..height as usize {
                let start = row * padded_row_bytes;
                out.extend_from_slice(&mapped[start..start + row_bytes]);
            }
        }
        self.readback.unmap();
        Ok(())
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

#[cfg(test)]
#[path = "../../tests/unit/render/gpu.rs"]
mod tests;
