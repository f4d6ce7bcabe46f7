//! Headless demo drawing a small scene graph through the recording backend

use std::error::Error;
use std::f32::consts::FRAC_PI_4;

use scenery::prelude::*;
use scenery::renderer::{BlendingFactor, BlendingState, CapabilitiesState, Command};
use scenery::scene::nodes;

const VERTEX_SHADER: &str = r"
attribute vec2 a_position;
attribute vec2 a_uv;
uniform mat4 u_matrix;
varying vec2 v_uv;
void main() {
    v_uv = a_uv;
    gl_Position = u_matrix * vec4(a_position, 0.0, 1.0);
}
";

const FRAGMENT_SHADER: &str = r"
uniform sampler2D u_texture;
uniform vec4 u_tint;
varying vec2 v_uv;
void main() {
    gl_FragColor = texture2D(u_texture, v_uv) * u_tint;
}
";

/// Interleaved position and uv
const QUAD_VERTICES: [[f32; 4]; 4] = [
    [-0.5, -0.5, 0.0, 0.0],
    [0.5, -0.5, 1.0, 0.0],
    [0.5, 0.5, 1.0, 1.0],
    [-0.5, 0.5, 0.0, 1.0],
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    log::info!("Starting scenery demo");

    // Scene
    let mut world = World::new();
    let root = world.instantiate_with(
        (Name::new("root"),),
        None,
        Transform2::from_translation(Vec2::new(640.0, 360.0)),
    );
    let root_node = world
        .node(root)
        .cloned()
        .ok_or("root instance has no node")?;

    for (i, name) in ["left", "center", "right"].into_iter().enumerate() {
        let offset = (i as f32 - 1.0) * 200.0;
        let transform = Transform2::new(
            Vec2::new(offset, 0.0),
            FRAC_PI_4 * i as f32,
            Vec2::splat(64.0),
        );
        world.instantiate_with((Name::new(name),), Some(&root_node), transform);
    }

    // Resources
    let mut render: Render = Render::headless(RenderConfig::default());

    let shader = render.create_shader(VERTEX_SHADER.as_bytes(), FRAGMENT_SHADER.as_bytes())?;

    let checker: Vec<u8> = (0..16u32)
        .flat_map(|i| {
            let v = if (i + i / 4) % 2 == 0 { 255 } else { 32 };
            [v, v, v, 255]
        })
        .collect();
    let texture =
        render.create_texture_with_data(UVec2::new(4, 4), PixelType::Rgba8.into(), &checker)?;

    let decl = VertexDeclaration::new()
        .add_attribute_of::<Vec2>("a_position")
        .add_attribute_of::<Vec2>("a_uv");
    let vertices =
        render.create_vertex_buffer_from(&QUAD_VERTICES, decl, BufferUsage::StaticDraw)?;
    let indices = render.create_index_buffer_u16(&QUAD_INDICES, BufferUsage::StaticDraw)?;

    let geometry = Geometry::new()
        .with_vertices(vertices)
        .with_indices(indices)
        .with_topology(Topology::Triangles);

    let blended = StateBlock::default()
        .with_blending(
            BlendingState::default()
                .with_factor(BlendingFactor::SrcAlpha, BlendingFactor::OneMinusSrcAlpha),
        )
        .with_capabilities(CapabilitiesState::default().with_blending(true));

    let overlay = PropertyBlock::new().with_property("u_tint", Vec4::new(1.0, 1.0, 1.0, 0.5));
    let material = Material::new()
        .with_pass(PassState::new(shader.clone()))
        .with_pass(
            PassState::new(shader)
                .with_states(blended)
                .with_properties(overlay),
        )
        .with_properties(
            PropertyBlock::new()
                .with_sampler("u_texture", SamplerState::new(texture))
                .with_property("u_tint", Vec4::ONE),
        );

    // Frame
    render.clear_all();

    let mut drawables = Vec::new();
    nodes::extract_children(
        &root_node,
        &mut drawables,
        TraverseOptions::new().recursive(true),
    );
    for node in &drawables {
        let properties = PropertyBlock::new().with_property("u_matrix", node.world_matrix());
        render.draw_with_properties(&material, &geometry, &properties)?;
    }

    let stats = render.stats();
    log::info!(
        "Drew {} nodes: {} draw calls, {} passes, {} state changes, {} commands",
        drawables.len(),
        stats.draw_calls,
        stats.passes,
        stats.state_changes,
        stats.commands
    );

    let state_commands = render
        .backend()
        .commands()
        .iter()
        .filter(|command| {
            matches!(
                command,
                Command::SetBlending(_) | Command::SetCapabilities(_)
            )
        })
        .count();
    log::info!("Blending toggles submitted: {state_commands}");

    // Snapshot
    let snapshot = SceneSnapshot::capture("demo", &root_node, Some(&world));
    log::info!("Scene snapshot:\n{}", snapshot.to_ron_string()?);

    world.destroy_instance(root, true);
    log::info!("Remaining instances: {}", world.len());

    Ok(())
}
