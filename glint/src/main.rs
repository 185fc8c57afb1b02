use glint_engine::prelude::*;

fn main() {
    let workbench = Workbench::new("Indev", |res_builder| {
        res_builder
            .with_config("config", "config.yml", include_resource!("config.yml"))
            .with_shader(
                "shader_normal",
                "shaders/normal.vert",
                "shaders/normal.frag",
                None,
            )
            .with_shader(
                "shader_wire",
                "shaders/wire.vert",
                "shaders/wire.frag",
                Some("shaders/wire.geom"),
            )
    })
    .unwrap();

    workbench.run();
}
