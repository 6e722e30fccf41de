//! wgpu backed shader collaborator
//!
//! The uploader turns each point batch handed over by a geometry into a vertex
//! buffer. Pipelines, bind groups and render passes belong to the caller.

use bytemuck::{Pod, Zeroable};
use pointscope_core::{Error, Matrix4, PointVertex, Result, ShaderProgram};
use wgpu::util::DeviceExt;

/// Vertex buffer layout for types uploaded to the GPU
pub trait GpuVertex: Pod {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a>;
}

impl GpuVertex for PointVertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Intensity
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        }
    }
}

/// Camera uniform data
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn from_matrix(mvp: &Matrix4<f32>) -> Self {
        Self {
            view_proj: (*mvp).into(),
        }
    }
}

/// Device and queue used for uploads
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter: wgpu::Adapter,
}

impl GpuContext {
    /// Request a high performance adapter without a surface
    pub async fn new() -> Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Gpu("Failed to find suitable adapter".to_string()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("pointscope device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| Error::Gpu(format!("Failed to create device: {}", e)))?;

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }
}

/// One uploaded batch
#[derive(Debug)]
pub struct GpuBatch {
    pub buffer: wgpu::Buffer,
    pub vertex_count: u32,
    /// Index into [`GpuPointUploader::transforms`] of the MVP in effect
    pub transform: usize,
}

/// Uploads point batches to vertex buffers for a frame
pub struct GpuPointUploader<'a> {
    device: &'a wgpu::Device,
    batches: Vec<GpuBatch>,
    transforms: Vec<CameraUniform>,
}

impl<'a> GpuPointUploader<'a> {
    pub fn new(device: &'a wgpu::Device) -> Self {
        Self {
            device,
            batches: Vec::new(),
            transforms: Vec::new(),
        }
    }

    pub fn batches(&self) -> &[GpuBatch] {
        &self.batches
    }

    /// Model-view-projections set during the frame, in order
    pub fn transforms(&self) -> &[CameraUniform] {
        &self.transforms
    }

    /// Hand the uploaded buffers to the render pass and start a new frame
    pub fn take_batches(&mut self) -> Vec<GpuBatch> {
        self.transforms.clear();
        std::mem::take(&mut self.batches)
    }

    pub fn vertex_count(&self) -> usize {
        self.batches.iter().map(|b| b.vertex_count as usize).sum()
    }
}

impl ShaderProgram for GpuPointUploader<'_> {
    fn set_model_view_projection(&mut self, mvp: &Matrix4<f32>) {
        self.transforms.push(CameraUniform::from_matrix(mvp));
    }

    fn draw_points(&mut self, vertices: &[PointVertex]) {
        if vertices.is_empty() {
            return;
        }
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pointscope point batch"),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.batches.push(GpuBatch {
            buffer,
            vertex_count: vertices.len() as u32,
            transform: self.transforms.len().saturating_sub(1),
        });
    }
}
