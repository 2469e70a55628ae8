use glam::*;
use glow::HasContext;
use sdl2::keyboard::Keycode;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::abs::*;
use crate::config::Settings;

mod abs;
mod config;
mod model;

const WINDOW_TITLE: &str = "TexBlend";

const SETTINGS_PATH: &str = "settings.json";
const QUAD_VERT_PATH: &str = "assets/shaders/quad.vert";
const QUAD_FRAG_PATH: &str = "assets/shaders/quad.frag";
const MODEL_VERT_PATH: &str = "assets/shaders/model.vert";
const MODEL_FRAG_PATH: &str = "assets/shaders/model.frag";
const BASE_TEXTURE_PATH: &str = "assets/textures/container.png";
const OVERLAY_TEXTURE_PATH: &str = "assets/textures/overlay.png";
const MODEL_PATH: &str = "assets/models/cube.gltf";

const WEIGHT_MAX: f32 = 1.0;
const WEIGHT_MIN: f32 = 0.0;
const WEIGHT_STEP: f32 = 0.05;

/// Vertex of the blended quad: position, color and texture coordinates.
#[derive(Clone, Copy)]
#[repr(C, packed)]
struct QuadVertex {
    position: Vec3,
    color: Vec3,
    uv: Vec2,
}

impl Vertex for QuadVertex {
    fn vertex_attribs(gl: &glow::Context) {
        unsafe {
            let stride = std::mem::size_of::<QuadVertex>() as i32;

            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(0);

            gl.vertex_attrib_pointer_f32(
                1,
                3,
                glow::FLOAT,
                false,
                stride,
                std::mem::size_of::<Vec3>() as i32,
            );
            gl.enable_vertex_attrib_array(1);

            gl.vertex_attrib_pointer_f32(
                2,
                2,
                glow::FLOAT,
                false,
                stride,
                2 * std::mem::size_of::<Vec3>() as i32,
            );
            gl.enable_vertex_attrib_array(2);
        }
    }
}

fn quad_vertices() -> [QuadVertex; 4] {
    [
        QuadVertex {
            position: vec3(0.5, 0.5, 0.0),
            color: vec3(1.0, 0.0, 0.0),
            uv: vec2(1.0, 1.0),
        },
        QuadVertex {
            position: vec3(0.5, -0.5, 0.0),
            color: vec3(0.0, 1.0, 0.0),
            uv: vec2(1.0, 0.0),
        },
        QuadVertex {
            position: vec3(-0.5, -0.5, 0.0),
            color: vec3(0.0, 0.0, 1.0),
            uv: vec2(0.0, 0.0),
        },
        QuadVertex {
            position: vec3(-0.5, 0.5, 0.0),
            color: vec3(1.0, 1.0, 0.0),
            uv: vec2(0.0, 1.0),
        },
    ]
}

const QUAD_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

fn step_weight(weight: f32, delta: f32) -> f32 {
    (weight + delta).clamp(WEIGHT_MIN, WEIGHT_MAX)
}

fn setup_logging() -> Result<(), log::SetLoggerError> {
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {} {}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply()
}

/// Loads a texture image from disk, falling back to the checkerboard
/// placeholder when the file is missing or does not decode.
fn load_texture(gl: &Arc<glow::Context>, path: &str, flip: bool) -> Texture {
    match image::open(path) {
        Ok(img) => {
            let img = if flip { img.flipv() } else { img };
            Texture::new(gl, &img)
        }
        Err(e) => {
            log::error!("Failed to load texture {}: {}", path, e);
            Texture::placeholder(gl)
        }
    }
}

/// Forwards driver debug messages to the logger when the context offers them.
#[cfg(debug_assertions)]
fn install_gl_debug(app: &mut App) {
    let Some(gl) = Arc::get_mut(&mut app.gl) else {
        return;
    };
    if !gl.supported_extensions().contains("GL_KHR_debug") {
        return;
    }
    unsafe {
        gl.enable(glow::DEBUG_OUTPUT);
        gl.debug_message_callback(|_source, _kind, id, severity, message| match severity {
            glow::DEBUG_SEVERITY_HIGH => log::error!("GL [{}]: {}", id, message),
            glow::DEBUG_SEVERITY_MEDIUM => log::warn!("GL [{}]: {}", id, message),
            _ => log::debug!("GL [{}]: {}", id, message),
        });
    }
}

fn main() {
    if let Err(e) = setup_logging() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let settings = Settings::load_or_default(SETTINGS_PATH);

    let mut app = match App::new(
        WINDOW_TITLE,
        settings.width,
        settings.height,
        settings.fullscreen,
    ) {
        Ok(app) => app,
        Err(e) => {
            log::error!("Failed to create window: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&mut app, &settings) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(app: &mut App, settings: &Settings) -> Result<(), String> {
    #[cfg(debug_assertions)]
    install_gl_debug(app);

    unsafe {
        app.gl.enable(glow::DEPTH_TEST);
        app.gl.enable(glow::BLEND);
        app.gl
            .blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
    }

    let swap_interval = if settings.vsync {
        sdl2::video::SwapInterval::VSync
    } else {
        sdl2::video::SwapInterval::Immediate
    };
    if let Err(e) = app.video_subsystem.gl_set_swap_interval(swap_interval) {
        log::warn!("Failed to set swap interval: {}", e);
    }

    let quad_program = ShaderProgram::from_files(&app.gl, QUAD_VERT_PATH, QUAD_FRAG_PATH)
        .map_err(|_| "Failed to build the quad shader program".to_string())?;
    let model_program = ShaderProgram::from_files(&app.gl, MODEL_VERT_PATH, MODEL_FRAG_PATH)
        .map_err(|_| "Failed to build the model shader program".to_string())?;

    let base_texture = load_texture(&app.gl, BASE_TEXTURE_PATH, false);
    let overlay_texture = load_texture(&app.gl, OVERLAY_TEXTURE_PATH, true);

    let quad_mesh = Mesh::new(&app.gl, &quad_vertices(), &QUAD_INDICES, glow::TRIANGLES);

    let model_path = settings.model.as_deref().unwrap_or(MODEL_PATH);
    let model_meshes = match model::load_model(model_path) {
        Ok(data) => {
            let meshes = data.upload(&app.gl);
            log::info!("Loaded {} with {} mesh(es)", model_path, meshes.len());
            meshes
        }
        Err(e) => {
            log::error!("Failed to load model {}: {}", model_path, e);
            Vec::new()
        }
    };

    // The samplers never change; bind them to their units once.
    quad_program.use_program();
    quad_program.set_uniform("texture1", 0);
    quad_program.set_uniform("texture2", 1);

    let (width, height) = app.window.size();
    let mut projection =
        Mat4::perspective_rh_gl(45f32.to_radians(), width as f32 / height as f32, 0.1, 100.0);
    let view = Mat4::look_at_rh(vec3(0.0, 0.8, 3.0), Vec3::ZERO, Vec3::Y);

    let mut keys_down: HashSet<Keycode> = HashSet::new();
    let mut weight = 0.5f32;
    let mut time = 0.0f32;
    let mut last_time = Instant::now();

    'running: loop {
        for event in app.event_pump.poll_iter() {
            match event {
                sdl2::event::Event::Quit { .. } => break 'running,
                sdl2::event::Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => {
                    log::info!("Registered escape key press, closing the program");
                    break 'running;
                }
                sdl2::event::Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => {
                    match key {
                        Keycode::Up => {
                            log::info!("Registered up arrow key press, increasing texture weight")
                        }
                        Keycode::Down => {
                            log::info!("Registered down arrow key press, decreasing texture weight")
                        }
                        _ => {}
                    }
                    keys_down.insert(key);
                }
                sdl2::event::Event::KeyUp {
                    keycode: Some(key), ..
                } => {
                    keys_down.remove(&key);
                }
                sdl2::event::Event::Window {
                    win_event: sdl2::event::WindowEvent::Resized(w, h),
                    ..
                } => {
                    unsafe {
                        app.gl.viewport(0, 0, w, h);
                    }
                    projection = Mat4::perspective_rh_gl(
                        45f32.to_radians(),
                        w as f32 / h as f32,
                        0.1,
                        100.0,
                    );
                }
                _ => {}
            }
        }

        let dt = (Instant::now() - last_time).as_secs_f32().min(2.0);
        last_time = Instant::now();
        time += dt;

        if keys_down.contains(&Keycode::Up) {
            weight = step_weight(weight, WEIGHT_STEP);
        }
        if keys_down.contains(&Keycode::Down) {
            weight = step_weight(weight, -WEIGHT_STEP);
        }

        unsafe {
            app.gl.clear_color(0.2, 0.3, 0.3, 1.0);
            app.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        if !model_meshes.is_empty() {
            model_program.use_program();
            model_program.set_uniform("model", Mat4::from_rotation_y(time * 0.8));
            model_program.set_uniform("view", view);
            model_program.set_uniform("projection", projection);
            model_program.set_uniform("base_color", vec3(0.85, 0.55, 0.3));
            model_program.set_uniform("light_dir", vec3(-0.4, -1.0, -0.6));
            for mesh in &model_meshes {
                mesh.draw();
            }
        }

        quad_program.use_program();
        base_texture.bind_to_unit(0);
        overlay_texture.bind_to_unit(1);
        quad_program.set_uniform("weight", weight);
        quad_mesh.draw();

        app.window.gl_swap_window();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_steps_by_the_increment() {
        assert!((step_weight(0.5, WEIGHT_STEP) - 0.55).abs() < 1e-6);
        assert!((step_weight(0.5, -WEIGHT_STEP) - 0.45).abs() < 1e-6);
    }

    #[test]
    fn weight_clamps_at_both_ends() {
        assert_eq!(step_weight(0.99, WEIGHT_STEP), WEIGHT_MAX);
        assert_eq!(step_weight(0.01, -WEIGHT_STEP), WEIGHT_MIN);
        assert_eq!(step_weight(WEIGHT_MAX, WEIGHT_STEP), WEIGHT_MAX);
        assert_eq!(step_weight(WEIGHT_MIN, -WEIGHT_STEP), WEIGHT_MIN);
    }

    #[test]
    fn quad_indices_reference_existing_vertices() {
        let vertices = quad_vertices();
        assert!(
            QUAD_INDICES
                .iter()
                .all(|&i| (i as usize) < vertices.len())
        );
    }

    #[test]
    fn quad_vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<QuadVertex>(), 32);
    }
}
