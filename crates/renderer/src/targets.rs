//! Everything built from the swapchain's format and extent.
//!
//! [`RenderTargets`] groups the swapchain with the render pass, pipeline and
//! framebuffers derived from it, so that recreation is a single drop followed
//! by a single build.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use vkframe_core::ShaderConfig;
use vkframe_rhi::device::Device;
use vkframe_rhi::framebuffer::{Framebuffer, create_framebuffers};
use vkframe_rhi::instance::Instance;
use vkframe_rhi::pipeline::{
    CullMode, FrontFace, GraphicsPipelineBuilder, Pipeline, PipelineLayout, PrimitiveTopology,
};
use vkframe_rhi::render_pass::RenderPass;
use vkframe_rhi::shader::{Shader, ShaderStage, read_binary_file};
use vkframe_rhi::swapchain::Swapchain;
use vkframe_rhi::vertex::ColorVertex;
use vkframe_rhi::{RhiError, RhiResult};

const SHADER_ENTRY_POINT: &str = "main";

/// SPIR-V bytecode for the two pipeline stages, read once at startup and
/// reused by every rebuild.
#[derive(Debug, Clone)]
pub struct ShaderCode {
    pub vertex: Vec<u8>,
    pub fragment: Vec<u8>,
}

impl ShaderCode {
    /// Reads both stages from the configured paths.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::ShaderError`] if either file is missing or empty.
    pub fn load(config: &ShaderConfig) -> RhiResult<Self> {
        Ok(Self {
            vertex: read_stage(&config.vertex, ShaderStage::Vertex)?,
            fragment: read_stage(&config.fragment, ShaderStage::Fragment)?,
        })
    }
}

fn read_stage(path: &Path, stage: ShaderStage) -> RhiResult<Vec<u8>> {
    let bytes = read_binary_file(path);
    if bytes.is_empty() {
        return Err(RhiError::ShaderError(format!(
            "No {} shader bytecode at {:?}",
            stage, path
        )));
    }
    debug!("Read {} bytes of {} shader from {:?}", bytes.len(), stage, path);
    Ok(bytes)
}

/// The swapchain and the objects that depend on it.
///
/// Fields are declared in destruction order: framebuffers, pipeline,
/// pipeline layout, render pass, then the swapchain with its image views.
pub struct RenderTargets {
    framebuffers: Vec<Framebuffer>,
    pipeline: Pipeline,
    /// Kept alive for the pipeline; never bound directly.
    _pipeline_layout: PipelineLayout,
    render_pass: RenderPass,
    swapchain: Swapchain,
}

impl RenderTargets {
    /// Builds swapchain, image views, render pass, pipeline and
    /// framebuffers, in that order.
    ///
    /// `drawable` must be non-zero in both dimensions.
    ///
    /// # Errors
    ///
    /// Returns the first creation error; objects built so far are dropped.
    pub fn new(
        instance: &Instance,
        device: &Arc<Device>,
        surface: vk::SurfaceKHR,
        drawable: (u32, u32),
        shaders: &ShaderCode,
    ) -> RhiResult<Self> {
        let swapchain = Swapchain::new(instance, device.clone(), surface, drawable)?;
        let extent = swapchain.extent();

        let render_pass = RenderPass::new(device.clone(), swapchain.format())?;

        let vertex_shader = Shader::from_spirv_bytes(
            device.clone(),
            &shaders.vertex,
            ShaderStage::Vertex,
            SHADER_ENTRY_POINT,
        )?;
        let fragment_shader = Shader::from_spirv_bytes(
            device.clone(),
            &shaders.fragment,
            ShaderStage::Fragment,
            SHADER_ENTRY_POINT,
        )?;

        let pipeline_layout = PipelineLayout::new(device.clone(), &[], &[])?;
        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vertex_shader)
            .fragment_shader(&fragment_shader)
            .vertex_binding(ColorVertex::binding_description())
            .vertex_attributes(&ColorVertex::attribute_descriptions())
            .topology(PrimitiveTopology::TriangleList)
            .cull_mode(CullMode::Back)
            .front_face(FrontFace::Clockwise)
            .extent(extent)
            .render_pass(render_pass.handle())
            .subpass(0)
            .build(device.clone(), &pipeline_layout)?;

        let framebuffers =
            create_framebuffers(device, render_pass.handle(), swapchain.image_views(), extent)?;

        let targets = Self {
            framebuffers,
            pipeline,
            _pipeline_layout: pipeline_layout,
            render_pass,
            swapchain,
        };
        check_counts(
            targets.swapchain.image_count(),
            targets.swapchain.image_views().len(),
            targets.framebuffers.len(),
        )?;

        info!(
            "Render targets built: {}x{}, {} images",
            extent.width,
            extent.height,
            targets.framebuffers.len()
        );
        Ok(targets)
    }

    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    #[inline]
    pub fn render_pass(&self) -> &RenderPass {
        &self.render_pass
    }

    #[inline]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The framebuffer that renders into swapchain image `index`.
    pub fn framebuffer(&self, index: usize) -> Option<&Framebuffer> {
        self.framebuffers.get(index)
    }

    /// Number of swapchain images, views and framebuffers.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.framebuffers.len()
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.swapchain.extent()
    }
}

fn check_counts(images: usize, views: usize, framebuffers: usize) -> RhiResult<()> {
    if images == views && views == framebuffers {
        Ok(())
    } else {
        Err(RhiError::SwapchainError(format!(
            "Mismatched swapchain objects: {} images, {} views, {} framebuffers",
            images, views, framebuffers
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_check_counts() {
        assert!(check_counts(3, 3, 3).is_ok());
        assert!(check_counts(3, 2, 3).is_err());
        assert!(check_counts(3, 3, 2).is_err());
    }

    #[test]
    fn test_shader_code_missing_file() {
        let config = ShaderConfig {
            vertex: PathBuf::from("does/not/exist.vert.spv"),
            fragment: PathBuf::from("does/not/exist.frag.spv"),
        };
        let err = ShaderCode::load(&config).unwrap_err();
        assert!(matches!(err, RhiError::ShaderError(_)));
    }

    #[test]
    fn test_shader_code_reads_both_stages() {
        let dir = std::env::temp_dir().join(format!("vkframe-shaders-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let vertex = dir.join("vert.spv");
        let fragment = dir.join("frag.spv");
        std::fs::write(&vertex, [0x03, 0x02, 0x23, 0x07]).unwrap();
        std::fs::write(&fragment, [0x03, 0x02, 0x23, 0x07, 0, 0, 0, 0]).unwrap();

        let code = ShaderCode::load(&ShaderConfig { vertex, fragment }).unwrap();
        assert_eq!(code.vertex.len(), 4);
        assert_eq!(code.fragment.len(), 8);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
