use crate::{config::Config, rendering::shaders::ShaderSource};
use hashbrown::HashMap;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    thread,
};

#[derive(Debug)]
pub enum Resource {
    Config(Config),
    Shader(ShaderSource),
}

#[derive(Debug)]
pub enum ResourceState {
    Loaded(Resource),
    Loading,
    Failed(String),
}

impl ResourceState {
    pub fn is_loaded(&self) -> bool {
        if let ResourceState::Loaded(_) = self {
            true
        } else {
            false
        }
    }

    pub fn is_failed(&self) -> bool {
        if let ResourceState::Failed(_) = self {
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
pub struct Resources {
    resources: Arc<Mutex<HashMap<String, Arc<ResourceState>>>>,
}

impl Resources {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_resource<F: 'static>(&self, name: impl AsRef<str>, load: F)
    where
        F: FnOnce() -> Result<Resource, String> + Send + Sync,
    {
        let name = name.as_ref().to_owned();

        {
            let mut res = self.resources.lock().unwrap();
            (*res).insert(name.clone(), Arc::new(ResourceState::Loading));
        }

        thread::spawn({
            let res = self.resources.clone();
            move || {
                let state = match load() {
                    Ok(loaded) => ResourceState::Loaded(loaded),
                    Err(err) => ResourceState::Failed(err),
                };

                let mut res = res.lock().unwrap();
                if let Some(val) = (*res).get_mut(&name) {
                    *(val) = Arc::new(state);
                }
            }
        });
    }

    pub fn get_resource(&self, name: impl AsRef<str>) -> Arc<ResourceState> {
        {
            let res = self.resources.lock().unwrap();
            (*res)
                .get(name.as_ref())
                .expect("Called get_resource() on nonexistent resource")
                .clone()
        }
    }

    pub fn pending(&self) -> usize {
        let res = self.resources.lock().unwrap();
        (*res)
            .values()
            .filter(|state| !state.is_loaded() && !state.is_failed())
            .count()
    }

    pub fn entries(&self) -> Vec<(String, Arc<ResourceState>)> {
        let res = self.resources.lock().unwrap();
        (*res)
            .iter()
            .map(|(name, state)| (name.clone(), state.clone()))
            .collect()
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            resources: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub struct ResourceBuilder {
    pub resources: Arc<Resources>,
    pub dev: bool,
}

impl ResourceBuilder {
    pub fn with_config<P: AsRef<Path> + Send + Sync + 'static>(
        self,
        name: impl AsRef<str>,
        path: P,
        template: &'static [u8],
    ) -> ResourceBuilder {
        let dev = self.dev;

        self.resources.add_resource(name, move || {
            let config = Config::new(
                resource_path(path.as_ref(), dev),
                &String::from_utf8_lossy(template),
            )
            .map_err(|err| err.to_string())?;

            Ok(Resource::Config(config))
        });

        self
    }

    pub fn with_shader<P: AsRef<Path> + Send + Sync + 'static>(
        self,
        name: impl AsRef<str>,
        vert_path: P,
        frag_path: P,
        geom_path: Option<P>,
    ) -> ResourceBuilder {
        let dev = self.dev;

        self.resources.add_resource(name, move || {
            let source = ShaderSource::load(
                resource_path(vert_path.as_ref(), dev),
                resource_path(frag_path.as_ref(), dev),
                geom_path
                    .as_ref()
                    .map(|path| resource_path(path.as_ref(), dev)),
            )
            .map_err(|err| err.to_string())?;

            Ok(Resource::Shader(source))
        });

        self
    }
}

fn resource_path(path: impl AsRef<Path>, dev: bool) -> PathBuf {
    let mut res_path = PathBuf::from(if dev { "./resources/" } else { "./" });

    res_path.push(path);

    res_path
}
