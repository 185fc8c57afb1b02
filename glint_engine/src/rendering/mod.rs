pub mod shaders;

use glow::HasContext;
use std::cell::Cell;
use std::os::raw::c_void;
use std::rc::Rc;

/// Handle to the GL function table of the host's rendering context.
///
/// GL state is bound to one thread, so this is neither Send nor Sync.
/// Clones share the function table and the active program tracker.
#[derive(Clone)]
pub struct RenderContext {
    inner: Rc<ContextInner>,
}

struct ContextInner {
    gl: glow::Context,
    active_program: Cell<Option<glow::Program>>,
}

impl RenderContext {
    pub fn new(gl: glow::Context) -> Self {
        RenderContext {
            inner: Rc::new(ContextInner {
                gl,
                active_program: Cell::new(None),
            }),
        }
    }

    /// The loader has to belong to a GL context that is current on this
    /// thread, and the returned value must not outlive that context.
    pub unsafe fn from_loader_function<F>(loader: F) -> Self
    where
        F: FnMut(&str) -> *const c_void,
    {
        Self::new(glow::Context::from_loader_function(loader))
    }

    pub fn gl(&self) -> &glow::Context {
        &self.inner.gl
    }

    pub fn active_program(&self) -> Option<glow::Program> {
        self.inner.active_program.get()
    }

    pub fn clear_program(&self) {
        unsafe { self.inner.gl.use_program(None) };
        self.inner.active_program.set(None);
    }

    pub(crate) fn set_active_program(&self, program: Option<glow::Program>) {
        self.inner.active_program.set(program);
    }
}
