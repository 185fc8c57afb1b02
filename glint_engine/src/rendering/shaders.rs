use crate::rendering::RenderContext;
use err_derive::Error;
use glow::HasContext;
use hashbrown::HashMap;
use log::error;
use nalgebra_glm as glm;
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Longest info log we keep around, matching the fixed reporting window
/// drivers get queried with.
pub const MAX_INFO_LOG_LEN: usize = 1024;

const LOG_SEPARATOR: &str = "-- --------------------------------------------------- --";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
}

impl ShaderStage {
    pub fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VERTEX",
            ShaderStage::Fragment => "FRAGMENT",
            ShaderStage::Geometry => "GEOMETRY",
        }
    }

    fn gl_kind(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error(display = "Failed to read {} shader {:?}: {}", stage, path, err)]
    SourceRead {
        stage: ShaderStage,
        path: PathBuf,
        err: io::Error,
    },
    #[error(display = "Failed to create {} shader object: {}", stage, err)]
    ObjectCreation { stage: ShaderStage, err: String },
    #[error(display = "Failed to compile {} shader:\n{}", stage, log)]
    Compile { stage: ShaderStage, log: String },
    #[error(display = "Failed to create program object: {}", err)]
    ProgramCreation { err: String },
    #[error(display = "Failed to link program:\n{}", log)]
    Link { log: String },
}

/// GLSL text for one program, read from disk. The geometry stage is
/// optional, the other two are not.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

impl ShaderSource {
    pub fn load<P: AsRef<Path>>(
        vertex: P,
        fragment: P,
        geometry: Option<P>,
    ) -> Result<ShaderSource, ShaderError> {
        let vertex = read_stage(ShaderStage::Vertex, vertex.as_ref())?;
        let fragment = read_stage(ShaderStage::Fragment, fragment.as_ref())?;
        let geometry = match geometry {
            Some(path) => Some(read_stage(ShaderStage::Geometry, path.as_ref())?),
            None => None,
        };

        Ok(ShaderSource {
            vertex,
            fragment,
            geometry,
        })
    }

    pub fn stages(&self) -> impl Iterator<Item = (ShaderStage, &str)> {
        let geometry = self
            .geometry
            .as_ref()
            .map(|source| (ShaderStage::Geometry, source.as_str()));

        vec![
            (ShaderStage::Vertex, self.vertex.as_str()),
            (ShaderStage::Fragment, self.fragment.as_str()),
        ]
        .into_iter()
        .chain(geometry)
    }
}

/// A linked GL shader program. The handle is released when this is dropped,
/// so teardown follows scope instead of GC timing.
pub struct ShaderProgram {
    ctx: RenderContext,
    handle: glow::Program,
    locations: LocationCache<glow::UniformLocation>,
}

impl ShaderProgram {
    /// Compiles every stage and links them. All stages get compiled even
    /// after one fails, so a single run reports every broken stage, but the
    /// returned error is the first failure in pipeline order and nothing
    /// gets linked.
    pub fn new(ctx: &RenderContext, source: &ShaderSource) -> Result<Self, ShaderError> {
        let gl = ctx.gl();

        let mut stages = Vec::with_capacity(3);
        let mut failure = None;

        for (stage, stage_source) in source.stages() {
            match compile_stage(gl, stage, stage_source) {
                Ok(shader) => stages.push(shader),
                Err(err) => {
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
            }
        }

        if let Some(err) = failure {
            release_stages(gl, None, &stages);
            return Err(err);
        }

        let program = match unsafe { gl.create_program() } {
            Ok(program) => program,
            Err(err) => {
                release_stages(gl, None, &stages);
                let err = ShaderError::ProgramCreation { err };
                error!("{}", err);
                return Err(err);
            }
        };

        unsafe {
            for shader in &stages {
                gl.attach_shader(program, *shader);
            }

            gl.link_program(program);
        }

        let linked = unsafe { gl.get_program_link_status(program) };
        let log = if linked {
            String::new()
        } else {
            truncate_info_log(unsafe { gl.get_program_info_log(program) })
        };

        // The stage objects are done for whether or not the link worked
        release_stages(gl, Some(program), &stages);

        if linked {
            Ok(ShaderProgram {
                ctx: ctx.clone(),
                handle: program,
                locations: LocationCache::new(),
            })
        } else {
            unsafe { gl.delete_program(program) };
            error!("Failed to link program:\n{}\n{}", log, LOG_SEPARATOR);
            Err(ShaderError::Link { log })
        }
    }

    pub fn from_paths<P: AsRef<Path>>(
        ctx: &RenderContext,
        vertex: P,
        fragment: P,
        geometry: Option<P>,
    ) -> Result<Self, ShaderError> {
        let source = ShaderSource::load(vertex, fragment, geometry)?;
        ShaderProgram::new(ctx, &source)
    }

    pub fn handle(&self) -> glow::Program {
        self.handle
    }

    pub fn bind(&self) {
        unsafe { self.ctx.gl().use_program(Some(self.handle)) };
        self.ctx.set_active_program(Some(self.handle));
    }

    pub fn is_bound(&self) -> bool {
        self.ctx.active_program() == Some(self.handle)
    }

    pub fn set_bool(&self, name: &str, value: bool) {
        self.set_int(name, value as i32);
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.assert_bound(name);
        unsafe {
            self.ctx
                .gl()
                .uniform_1_i32(self.location(name).as_ref(), value)
        };
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.assert_bound(name);
        unsafe {
            self.ctx
                .gl()
                .uniform_1_f32(self.location(name).as_ref(), value)
        };
    }

    pub fn set_vec2(&self, name: &str, value: &glm::Vec2) {
        self.assert_bound(name);
        unsafe {
            self.ctx
                .gl()
                .uniform_2_f32(self.location(name).as_ref(), value.x, value.y)
        };
    }

    pub fn set_vec3(&self, name: &str, value: &glm::Vec3) {
        self.assert_bound(name);
        unsafe {
            self.ctx.gl().uniform_3_f32(
                self.location(name).as_ref(),
                value.x,
                value.y,
                value.z,
            )
        };
    }

    pub fn set_vec4(&self, name: &str, value: &glm::Vec4) {
        self.assert_bound(name);
        unsafe {
            self.ctx.gl().uniform_4_f32(
                self.location(name).as_ref(),
                value.x,
                value.y,
                value.z,
                value.w,
            )
        };
    }

    pub fn set_mat3(&self, name: &str, value: &glm::Mat3) {
        self.assert_bound(name);
        unsafe {
            self.ctx.gl().uniform_matrix_3_f32_slice(
                self.location(name).as_ref(),
                false,
                value.as_slice(),
            )
        };
    }

    pub fn set_mat4(&self, name: &str, value: &glm::Mat4) {
        self.assert_bound(name);
        unsafe {
            self.ctx.gl().uniform_matrix_4_f32_slice(
                self.location(name).as_ref(),
                false,
                value.as_slice(),
            )
        };
    }

    // Locations never change after linking, so lookups are cached. Unknown
    // names cache as None, which the uniform calls treat as a no-op.
    fn location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.locations.resolve(name, |name| unsafe {
            self.ctx.gl().get_uniform_location(self.handle, name)
        })
    }

    fn assert_bound(&self, name: &str) {
        debug_assert!(
            self.is_bound(),
            "uniform \"{}\" set on a program that is not bound",
            name
        );
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        // Drop the tracker claim before the handle goes away
        if self.ctx.active_program() == Some(self.handle) {
            self.ctx.set_active_program(None);
        }

        unsafe { self.ctx.gl().delete_program(self.handle) };
    }
}

/// Per program memo of name to location lookups, misses included. The query
/// runs at most once per name.
struct LocationCache<T> {
    locations: RefCell<HashMap<String, Option<T>>>,
}

impl<T: Clone> LocationCache<T> {
    fn new() -> Self {
        LocationCache {
            locations: RefCell::new(HashMap::new()),
        }
    }

    fn resolve<F>(&self, name: &str, query: F) -> Option<T>
    where
        F: FnOnce(&str) -> Option<T>,
    {
        if let Some(cached) = self.locations.borrow().get(name) {
            return cached.clone();
        }

        let location = query(name);
        self.locations
            .borrow_mut()
            .insert(name.to_owned(), location.clone());

        location
    }
}

fn read_stage(stage: ShaderStage, path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|err| {
        let err = ShaderError::SourceRead {
            stage,
            path: path.to_owned(),
            err,
        };
        error!("{}", err);
        err
    })
}

fn compile_stage(
    gl: &glow::Context,
    stage: ShaderStage,
    source: &str,
) -> Result<glow::Shader, ShaderError> {
    unsafe {
        let shader = match gl.create_shader(stage.gl_kind()) {
            Ok(shader) => shader,
            Err(err) => {
                let err = ShaderError::ObjectCreation { stage, err };
                error!("{}", err);
                return Err(err);
            }
        };

        gl.shader_source(shader, source);
        gl.compile_shader(shader);

        if gl.get_shader_compile_status(shader) {
            Ok(shader)
        } else {
            let log = truncate_info_log(gl.get_shader_info_log(shader));
            gl.delete_shader(shader);
            error!(
                "Failed to compile {} shader:\n{}\n{}",
                stage, log, LOG_SEPARATOR
            );
            Err(ShaderError::Compile { stage, log })
        }
    }
}

fn release_stages(gl: &glow::Context, program: Option<glow::Program>, stages: &[glow::Shader]) {
    unsafe {
        for shader in stages {
            if let Some(program) = program {
                gl.detach_shader(program, *shader);
            }

            gl.delete_shader(*shader);
        }
    }
}

// Driver info logs are unbounded, keep only what fits the reporting window
fn truncate_info_log(mut log: String) -> String {
    if log.len() > MAX_INFO_LOG_LEN {
        let mut end = MAX_INFO_LOG_LEN;
        while !log.is_char_boundary(end) {
            end -= 1;
        }

        log.truncate(end);
    }

    log
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn write_source(name: &str, content: &str) -> PathBuf {
        let path = env::temp_dir().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn stage_labels() {
        assert_eq!(ShaderStage::Vertex.to_string(), "VERTEX");
        assert_eq!(ShaderStage::Fragment.to_string(), "FRAGMENT");
        assert_eq!(ShaderStage::Geometry.to_string(), "GEOMETRY");
    }

    #[test]
    fn stage_gl_kinds() {
        assert_eq!(ShaderStage::Vertex.gl_kind(), glow::VERTEX_SHADER);
        assert_eq!(ShaderStage::Fragment.gl_kind(), glow::FRAGMENT_SHADER);
        assert_eq!(ShaderStage::Geometry.gl_kind(), glow::GEOMETRY_SHADER);
    }

    #[test]
    fn loads_both_required_stages() {
        let vert = write_source("glint_load.vert", "void main() {}\n");
        let frag = write_source("glint_load.frag", "out vec4 color;\n");

        let source = ShaderSource::load(&vert, &frag, None).unwrap();
        assert_eq!(source.vertex, "void main() {}\n");
        assert_eq!(source.fragment, "out vec4 color;\n");
        assert!(source.geometry.is_none());
    }

    #[test]
    fn loads_optional_geometry_stage() {
        let vert = write_source("glint_geom.vert", "v");
        let frag = write_source("glint_geom.frag", "f");
        let geom = write_source("glint_geom.geom", "g");

        let source = ShaderSource::load(&vert, &frag, Some(&geom)).unwrap();
        assert_eq!(source.geometry.as_deref(), Some("g"));
    }

    #[test]
    fn missing_file_reports_its_stage() {
        let vert = write_source("glint_missing.vert", "v");
        let frag = env::temp_dir().join("glint_missing_nonexistent.frag");

        match ShaderSource::load(&vert, &frag, None) {
            Err(ShaderError::SourceRead { stage, path, .. }) => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(path, frag);
            }
            other => panic!("expected read error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn stages_iterate_in_pipeline_order() {
        let source = ShaderSource {
            vertex: "v".into(),
            fragment: "f".into(),
            geometry: Some("g".into()),
        };

        let stages: Vec<_> = source.stages().collect();
        assert_eq!(
            stages,
            vec![
                (ShaderStage::Vertex, "v"),
                (ShaderStage::Fragment, "f"),
                (ShaderStage::Geometry, "g"),
            ]
        );

        let without_geometry = ShaderSource {
            geometry: None,
            ..source
        };
        assert_eq!(without_geometry.stages().count(), 2);
    }

    #[test]
    fn compile_error_display_names_the_stage() {
        let err = ShaderError::Compile {
            stage: ShaderStage::Geometry,
            log: "0:1(1): error: syntax error".into(),
        };

        let message = err.to_string();
        assert!(message.contains("GEOMETRY"));
        assert!(message.contains("syntax error"));
    }

    #[test]
    fn read_error_display_carries_stage_and_path() {
        let err = ShaderError::SourceRead {
            stage: ShaderStage::Vertex,
            path: PathBuf::from("shaders/normal.vert"),
            err: io::Error::new(io::ErrorKind::NotFound, "not found"),
        };

        let message = err.to_string();
        assert!(message.contains("VERTEX"));
        assert!(message.contains("shaders/normal.vert"));
    }

    #[test]
    fn link_error_display_carries_the_log() {
        let err = ShaderError::Link {
            log: "error: no main".into(),
        };

        assert!(err.to_string().contains("error: no main"));
    }

    #[test]
    fn location_cache_records_misses() {
        let cache = LocationCache::new();
        let mut resolved = 0;

        let first = cache.resolve("missing", |_| {
            resolved += 1;
            None::<u32>
        });
        let second = cache.resolve("missing", |_| {
            resolved += 1;
            Some(7)
        });

        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(resolved, 1);
    }

    #[test]
    fn location_cache_resolves_each_name_once() {
        let cache = LocationCache::new();
        let mut resolved = 0;

        for _ in 0..3 {
            let location = cache.resolve("color", |_| {
                resolved += 1;
                Some(4u32)
            });

            assert_eq!(location, Some(4));
        }

        assert_eq!(resolved, 1);

        assert_eq!(
            cache.resolve("model", |_| {
                resolved += 1;
                Some(9)
            }),
            Some(9)
        );
        assert_eq!(resolved, 2);
    }

    #[test]
    fn short_info_logs_pass_through() {
        let log = "0:3(12): error: `color` undeclared".to_owned();
        assert_eq!(truncate_info_log(log.clone()), log);
    }

    #[test]
    fn long_info_logs_get_cut_to_the_window() {
        let log = "e".repeat(MAX_INFO_LOG_LEN * 2);
        assert_eq!(truncate_info_log(log).len(), MAX_INFO_LOG_LEN);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let mut log = "e".repeat(MAX_INFO_LOG_LEN - 1);
        log.push('ä');
        log.push_str("rest");

        let truncated = truncate_info_log(log);
        assert_eq!(truncated.len(), MAX_INFO_LOG_LEN - 1);
        assert!(truncated.chars().all(|c| c == 'e'));
    }

    #[test]
    fn mat4_slice_is_column_major() {
        let mat = glm::translate(&glm::Mat4::identity(), &glm::vec3(2.0, 3.0, 4.0));
        let slice = mat.as_slice();

        // Translation lands in the last column when the layout is column
        // major, which is what the matrix uploads rely on
        assert_eq!(slice.len(), 16);
        assert_eq!(&slice[12..15], &[2.0, 3.0, 4.0][..]);
    }
}
