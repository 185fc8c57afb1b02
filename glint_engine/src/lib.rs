pub mod config;
pub mod logger;
pub mod prelude;
pub mod rendering;
pub mod resources;

use crate::{
    logger::{Logger, LoggerInitError},
    resources::{Resource, ResourceBuilder, ResourceState, Resources},
};
use clap::{App, Arg};
use err_derive::Error;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[macro_export]
macro_rules! include_resource {
    ($file:expr) => {
        include_bytes!(concat!("../../resources/", $file))
    };
}

#[derive(Debug, Error)]
pub enum WorkbenchInitError {
    #[error(display = "Failed to init logger: {}", err)]
    LoggerInit { err: LoggerInitError },
}

pub struct Workbench {
    pub resources: Arc<Resources>,
}

impl Workbench {
    #[allow(clippy::new_ret_no_self)]
    pub fn new<RB>(version: &str, resources: RB) -> Result<Self, WorkbenchInitError>
    where
        RB: FnOnce(ResourceBuilder) -> ResourceBuilder,
    {
        let clap = App::new("glint")
            .version(version)
            .about("A hobby OpenGL shader playground with a selfmade loader written in Rust")
            .arg(Arg::with_name("dev").long("dev").help("Development mode"))
            .arg(
                Arg::with_name("no-color")
                    .long("no-color")
                    .short("c")
                    .help("Don't color the console log"),
            )
            .get_matches();

        Logger::init(!clap.is_present("no-color"))
            .map_err(|err| WorkbenchInitError::LoggerInit { err })?;

        let res = Arc::new(Resources::new());

        resources(ResourceBuilder {
            resources: res.clone(),
            dev: clap.is_present("dev"),
        });

        info!("Workbench initialized");

        Ok(Workbench { resources: res })
    }

    pub fn run(&self) {
        for _ in 0..=100 {
            if self.resources.pending() == 0 {
                break;
            }

            thread::sleep(Duration::from_millis(50));
        }

        let mut entries = self.resources.entries();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, state) in &entries {
            if let ResourceState::Loaded(Resource::Config(config)) = &**state {
                if let Some(title) = config.title() {
                    info!("{}", title);
                }

                if let Some(dir) = config.shader_dir() {
                    debug!("Shader directory: {:?}", dir);
                }
            }
        }

        for (name, state) in &entries {
            match &**state {
                ResourceState::Loaded(_) => info!("Resource \"{}\" loaded", name),
                ResourceState::Loading => warn!("Resource \"{}\" is still loading", name),
                ResourceState::Failed(err) => error!("Resource \"{}\" failed: {}", name, err),
            }
        }

        info!("Exiting...");
    }
}
