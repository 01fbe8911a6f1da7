pub mod frame;
pub mod gpu;
pub mod pipeline;
pub mod surface;

pub use frame::{OffscreenTarget, TEXTURE_FORMAT};
pub use gpu::GpuContext;
pub use pipeline::{ShaderPipeline, ShaderUniforms};
pub use surface::{hsl_to_rgb, parse_hex_color, Rgb, Surface};
