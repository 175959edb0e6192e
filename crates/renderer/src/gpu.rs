//! wgpu rasterizer for the banded overlay.
//!
//! The device, queue, pipeline, sampler and bind group layout live as long
//! as the [`GpuRasterizer`]. Everything created for a single render is owned
//! by a [`FrameResources`] value and destroyed when it drops, so every exit
//! path of [`GpuRasterizer::render`] releases its GPU memory.

use std::sync::mpsc;

use bytemuck::{Pod, Zeroable};
use precip_grid::Grid;
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;

use crate::error::{RenderError, Result};
use crate::legend::{BAND_COUNT, LEGEND_BANDS};
use crate::raster::{PixelRaster, RenderOptions};
use crate::texture::{pack_grid, PackedTexture, BAND_EDGES};

const SHADER_SOURCE: &str = include_str!("shaders/banded.wgsl");

const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Vertex {
    position: [f32; 2],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

/// Two triangles covering clip space.
const QUAD: [Vertex; 6] = [
    Vertex { position: [-1.0, -1.0] },
    Vertex { position: [1.0, -1.0] },
    Vertex { position: [1.0, 1.0] },
    Vertex { position: [-1.0, -1.0] },
    Vertex { position: [1.0, 1.0] },
    Vertex { position: [-1.0, 1.0] },
];

/// Uniform block; layout matches `Uniforms` in `banded.wgsl` (192 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct BandUniforms {
    effective_max: f32,
    opacity: f32,
    output_size: [f32; 2],
    edges: [[f32; 4]; 2],
    colors: [[f32; 4]; BAND_COUNT],
}

impl BandUniforms {
    fn new(effective_max: f32, opacity: f32, width: u32, height: u32) -> Self {
        let mut edges = [[0.0f32; 4]; 2];
        for (i, edge) in BAND_EDGES.iter().enumerate() {
            edges[i / 4][i % 4] = *edge;
        }

        let mut colors = [[0.0f32; 4]; BAND_COUNT];
        for (slot, band) in colors.iter_mut().zip(LEGEND_BANDS.iter()) {
            *slot = band.color.to_f32_array();
        }

        Self {
            effective_max,
            opacity,
            output_size: [width as f32, height as f32],
            edges,
            colors,
        }
    }
}

/// Bytes per row of a buffer copy, padded to the copy alignment.
fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * 4;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Strip row padding from a mapped readback buffer.
fn copy_tight_rows(mapped: &[u8], width: u32, height: u32, padded_bpr: u32) -> Vec<u8> {
    let row_bytes = width as usize * 4;
    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * padded_bpr as usize;
        pixels.extend_from_slice(&mapped[start..start + row_bytes]);
    }
    pixels
}

/// GPU rasterizer producing hard-banded overlays.
pub struct GpuRasterizer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuRasterizer {
    /// Acquire an adapter and device and build the pipeline.
    ///
    /// Tries a high-performance hardware adapter first, then the fallback
    /// adapter. Fails with [`RenderError::RasterizerUnavailable`] when
    /// neither can be created.
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = match request_adapter(&instance, false).await {
            Some(adapter) => adapter,
            None => {
                warn!("No hardware GPU adapter found, trying fallback adapter");
                request_adapter(&instance, true).await.ok_or_else(|| {
                    RenderError::RasterizerUnavailable("no GPU adapter found".to_string())
                })?
            }
        };
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("precip-overlay-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::RasterizerUnavailable(format!("request device: {}", e)))?;

        device.on_uncaptured_error(Box::new(|e| {
            error!(error = %e, "Uncaptured GPU error");
        }));

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let (pipeline, bind_group_layout, sampler) = build_pipeline(&device);
        if let Some(e) = device.pop_error_scope().await {
            return Err(RenderError::gpu(format!("pipeline creation: {}", e)));
        }

        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU rasterizer ready"
        );

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            sampler,
            adapter_info,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_info.name
    }

    pub fn backend(&self) -> wgpu::Backend {
        self.adapter_info.backend
    }

    /// Rasterize `grid` into a `(M * scale) x (N * scale)` raster.
    pub async fn render(&self, grid: &Grid, options: &RenderOptions) -> Result<PixelRaster> {
        options.validate()?;
        let (width, height) = options.output_size(grid)?;

        let max_dim = self.device.limits().max_texture_dimension_2d;
        if width > max_dim || height > max_dim {
            return Err(RenderError::invalid_options(format!(
                "{}x{} raster exceeds the device texture limit of {}",
                width, height, max_dim
            )));
        }

        let texture = pack_grid(grid);
        let uniforms = BandUniforms::new(texture.effective_max(), options.opacity, width, height);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let frame = FrameResources::new(self, &texture, &uniforms, width, height);
        self.draw(&frame);
        if let Some(e) = self.device.pop_error_scope().await {
            return Err(RenderError::gpu(e.to_string()));
        }

        let pixels = frame.read_back(&self.device)?;
        debug!(
            width,
            height,
            effective_max = texture.effective_max(),
            flipped = texture.flipped(),
            "GPU raster complete"
        );
        PixelRaster::from_rgba(width, height, pixels)
    }

    fn draw(&self, frame: &FrameResources) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("overlay pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &frame.bind_group, &[]);
            pass.set_vertex_buffer(0, frame.vertex_buffer.slice(..));
            pass.draw(0..QUAD.len() as u32, 0..1);
        }

        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &frame.target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &frame.readback,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(frame.padded_bpr),
                    rows_per_image: Some(frame.height),
                },
            },
            wgpu::Extent3d {
                width: frame.width,
                height: frame.height,
                depth_or_array_layers: 1,
            },
        );

        self.queue.submit(Some(encoder.finish()));
    }
}

/// Create a rasterizer, render one grid and release everything.
pub async fn render_once(grid: &Grid, options: &RenderOptions) -> Result<PixelRaster> {
    let rasterizer = GpuRasterizer::new().await?;
    rasterizer.render(grid, options).await
}

async fn request_adapter(instance: &wgpu::Instance, fallback: bool) -> Option<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: fallback,
        })
        .await
}

fn build_pipeline(
    device: &wgpu::Device,
) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout, wgpu::Sampler) {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("banded overlay shader"),
        source: wgpu::ShaderSource::Wgsl(SHADER_SOURCE.into()),
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("overlay bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("overlay pl"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("overlay pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "vs_main",
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &VERTEX_ATTRIBUTES,
            }],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: "fs_main",
            // No blending: the target keeps straight alpha.
            targets: &[Some(wgpu::ColorTargetState {
                format: TEXTURE_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("overlay sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    (pipeline, bind_group_layout, sampler)
}

/// GPU objects created for a single render, destroyed on drop.
struct FrameResources {
    grid_texture: wgpu::Texture,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    readback: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
    padded_bpr: u32,
}

impl FrameResources {
    fn new(
        rasterizer: &GpuRasterizer,
        texture: &PackedTexture,
        uniforms: &BandUniforms,
        width: u32,
        height: u32,
    ) -> Self {
        let device = &rasterizer.device;

        let grid_extent = wgpu::Extent3d {
            width: texture.width(),
            height: texture.height(),
            depth_or_array_layers: 1,
        };
        let grid_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("grid texture"),
            size: grid_extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        rasterizer.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &grid_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            texture.texels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * texture.width()),
                rows_per_image: Some(texture.height()),
            },
            grid_extent,
        );
        let grid_view = grid_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("band uniforms"),
            contents: bytemuck::bytes_of(uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("overlay target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TEXTURE_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let padded_bpr = padded_bytes_per_row(width);
        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("overlay readback"),
            size: padded_bpr as u64 * height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("overlay bg"),
            layout: &rasterizer.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&grid_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&rasterizer.sampler),
                },
            ],
        });

        Self {
            grid_texture,
            target,
            target_view,
            vertex_buffer,
            uniform_buffer,
            readback,
            bind_group,
            width,
            height,
            padded_bpr,
        }
    }

    /// Map the readback buffer and return tightly packed RGBA rows.
    fn read_back(&self, device: &wgpu::Device) -> Result<Vec<u8>> {
        let slice = self.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        device.poll(wgpu::Maintain::Wait);

        rx.recv()
            .map_err(|_| RenderError::gpu("readback callback was dropped"))?
            .map_err(|e| RenderError::gpu(format!("map readback buffer: {}", e)))?;

        let pixels = {
            let mapped = slice.get_mapped_range();
            copy_tight_rows(&mapped, self.width, self.height, self.padded_bpr)
        };
        self.readback.unmap();
        Ok(pixels)
    }
}

impl Drop for FrameResources {
    fn drop(&mut self) {
        self.grid_texture.destroy();
        self.target.destroy();
        self.vertex_buffer.destroy();
        self.uniform_buffer.destroy();
        self.readback.destroy();
        debug!(width = self.width, height = self.height, "Released frame resources");
    }
}
