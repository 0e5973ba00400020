mod buffer;
pub use buffer::BufferObj;

mod gpu_context;
pub use gpu_context::GpuContext;

pub mod node;
pub use node::ComputeNode;

pub mod shader;
pub use shader::create_shader_module;
