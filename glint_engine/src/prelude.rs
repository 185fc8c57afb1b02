pub use crate::{
    config::{Config, ConfigError},
    include_resource,
    logger::UnwrapOrLog,
    rendering::{
        shaders::{ShaderError, ShaderProgram, ShaderSource, ShaderStage},
        RenderContext,
    },
    resources::{Resource, ResourceBuilder, ResourceState, Resources},
    Workbench, WorkbenchInitError,
};
