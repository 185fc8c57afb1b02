use err_derive::Error;
use serde_yaml::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(display = "Failed to read config file: {}", err)]
    ReadConfigFile { err: io::Error },
    #[error(display = "Failed to parse config: {}", err)]
    ParseConfig { err: serde_yaml::Error },
    #[error(
        display = "The structure of \"{}\" is not valid, please refer to:\n{}",
        path_str,
        template
    )]
    StructureValidation { path_str: String, template: String },
}

#[derive(Debug)]
pub struct Config {
    conf: Value,
}

impl Config {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(path: impl AsRef<Path>, template_src: &str) -> Result<Config, ConfigError> {
        let conf_src = match fs::read_to_string(&path) {
            Ok(conf_src) => conf_src,
            Err(err) => {
                return Err(ConfigError::ReadConfigFile { err });
            }
        };

        let conf = match serde_yaml::from_str(&conf_src) {
            Ok(conf) => conf,
            Err(err) => return Err(ConfigError::ParseConfig { err }),
        };

        let template = match serde_yaml::from_str(template_src) {
            Ok(template) => template,
            Err(err) => panic!("Template is invalid: {}", err),
        };

        if matches_template(&conf, &template) {
            Ok(Config { conf })
        } else {
            Err(ConfigError::StructureValidation {
                path_str: path.as_ref().to_string_lossy().into_owned(),
                template: template_src.to_owned(),
            })
        }
    }

    pub fn get(&self) -> &Value {
        &self.conf
    }

    pub fn title(&self) -> Option<&str> {
        self.conf.get("title").and_then(Value::as_str)
    }

    pub fn shader_dir(&self) -> Option<PathBuf> {
        self.conf
            .get("shaders")
            .and_then(|shaders| shaders.get("dir"))
            .and_then(Value::as_str)
            .map(PathBuf::from)
    }
}

// The template describes shapes, not values: a null on the right marks an
// optional string slot, and a one element sequence on the right is the shape
// of every element on the left. Mapping keys have to match exactly.
fn matches_template(conf: &Value, template: &Value) -> bool {
    match (conf, template) {
        (_, Value::Null) => conf.is_null() || conf.is_string(),
        (Value::Bool(_), Value::Bool(_)) => true,
        (Value::Number(_), Value::Number(_)) => true,
        (Value::String(_), Value::String(_)) => true,
        (Value::Sequence(seq), Value::Sequence(template_seq)) => match template_seq.first() {
            Some(shape) => seq.iter().all(|val| matches_template(val, shape)),
            None => seq.is_empty(),
        },
        (Value::Mapping(map), Value::Mapping(template_map)) => {
            map.len() == template_map.len()
                && template_map.iter().all(|(key, shape)| {
                    map.get(key)
                        .map_or(false, |val| matches_template(val, shape))
                })
        }
        _ => false,
    }
}
