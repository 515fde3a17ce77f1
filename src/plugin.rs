//! Bevy glue: ticks the streamer every frame and mirrors its chunks into
//! mesh entities
//!
//! Chunk entities are pooled together with their chunks: a pooled chunk's
//! entity is hidden, and shown again (moved and re-uploaded) on reuse.

use std::collections::HashMap;
use std::path::PathBuf;

use bevy::input::ButtonInput;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, PrimitiveTopology};
use bevy::render::render_asset::RenderAssetUsages;

use crate::audio::SpectrumFrames;
use crate::chunk::{Chunk, ChunkId, DebugColors};
use crate::components::{TerrainChunk, TerrainFocus};
use crate::config::TerrainSettings;
use crate::interfaces::{PlayerPosition, RoadPath, Silence, SpectrumSource};
use crate::road::RoadTrack;
use crate::streamer::{Collaborators, DynamicTerrain};
use crate::vertex::DecorationId;

/* ===========================================================
   events & resources
   =========================================================== */
/// Loading and the initial mountain are done; the road may start.
#[derive(Event, Debug, Clone, Copy)]
pub struct TerrainReady;

/// Decorations whose ground was claimed by the road or unloaded.
#[derive(Event, Debug, Clone)]
pub struct DecorationsRemoved(pub Vec<DecorationId>);

#[derive(Resource)]
pub struct TerrainMaterial(pub Handle<StandardMaterial>);

struct ChunkEntity {
    entity: Entity,
    mesh: Handle<Mesh>,
    revision: u64,
    coord: IVec2,
    visible: bool,
}

/// one render entity per chunk, for the lifetime of the chunk
#[derive(Resource, Default)]
pub struct ChunkEntities {
    by_id: HashMap<ChunkId, ChunkEntity>,
}

impl ChunkEntities {
    pub fn entity(&self, id: ChunkId) -> Option<Entity> {
        self.by_id.get(&id).map(|e| e.entity)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// where the streamer looks this frame
struct Focus {
    position: Vec3,
    progress: f32,
}

impl PlayerPosition for Focus {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn road_progress(&self) -> f32 {
        self.progress
    }
}

/* ===========================================================
   plugin
   =========================================================== */
/// Settings come from an inserted `TerrainSettings` resource, else from
/// `config_path`, else the defaults.
#[derive(Default)]
pub struct TerrainPlugin {
    pub config_path: Option<PathBuf>,
}

impl TerrainPlugin {
    fn settings(&self, app: &App) -> TerrainSettings {
        if let Some(settings) = app.world().get_resource::<TerrainSettings>() {
            return settings.clone();
        }
        let Some(path) = self.config_path.as_ref().filter(|p| p.exists()) else {
            return TerrainSettings::default();
        };
        match TerrainSettings::load(path) {
            Ok(settings) => {
                info!("terrain settings loaded from {}", path.display());
                settings
            }
            Err(e) => {
                error!("{}: {}; using default terrain settings", path.display(), e);
                TerrainSettings::default()
            }
        }
    }
}

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        let terrain = DynamicTerrain::new_or_default(self.settings(app));

        app.insert_resource(terrain.settings().clone())
            .insert_resource(terrain)
            .init_resource::<ChunkEntities>()
            .add_event::<TerrainReady>()
            .add_event::<DecorationsRemoved>()
            .add_systems(Startup, setup_terrain_material)
            .add_systems(
                Update,
                (
                    stream_terrain_system,
                    sync_chunk_meshes_system,
                    debug_colors_toggle_system,
                    dump_vertex_map_system,
                )
                    .chain(),
            );
    }
}

fn setup_terrain_material(mut commands: Commands, mut materials: ResMut<Assets<StandardMaterial>>) {
    let handle = materials.add(StandardMaterial {
        base_color: Color::srgb(0.95, 0.78, 0.55),
        perceptual_roughness: 0.95,
        ..default()
    });
    commands.insert_resource(TerrainMaterial(handle));
}

/* ===========================================================
   stream_terrain_system – one streamer cycle per frame
   =========================================================== */
pub fn stream_terrain_system(
    mut terrain: ResMut<DynamicTerrain>,
    focus_q: Query<&Transform, With<TerrainFocus>>,
    mut spectrum: Option<ResMut<SpectrumFrames>>,
    road: Option<Res<RoadTrack>>,
    mut ready: EventWriter<TerrainReady>,
    mut removed: EventWriter<DecorationsRemoved>,
) {
    let position = focus_q.get_single().map(|tf| tf.translation).unwrap_or(Vec3::ZERO);
    let road: Option<&RoadTrack> = road.as_deref().filter(|r| r.is_loaded());
    let focus = Focus {
        position,
        progress: road.map_or(0.0, |r| r.progress_near(position)),
    };

    let mut silence = Silence;
    let source: &mut dyn SpectrumSource = match spectrum.as_deref_mut() {
        Some(frames) => frames,
        None => &mut silence,
    };
    let mut collab = Collaborators {
        player: &focus,
        spectrum: source,
        road: road.map(|r| r as &dyn RoadPath),
    };

    let report = terrain.tick(&mut collab);
    if report.terrain_ready {
        ready.send(TerrainReady);
    }
    if report.pooled > 0 || report.reused > 0 {
        debug!(
            "chunks: {} new, {} reused, {} pooled, {} serviced",
            report.created, report.reused, report.pooled, report.serviced
        );
    }

    let ids = terrain.take_removed_decorations();
    if !ids.is_empty() {
        removed.send(DecorationsRemoved(ids));
    }
}

/* ===========================================================
   sync_chunk_meshes_system – upload changed chunks, hide pooled
   =========================================================== */
fn write_chunk_mesh(mesh: &mut Mesh, chunk: &Chunk) {
    let positions: Vec<[f32; 3]> = chunk.positions().iter().map(|p| p.to_array()).collect();
    let normals: Vec<[f32; 3]> = chunk.normals().iter().map(|n| n.to_array()).collect();
    mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, positions);
    mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals);
    mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, chunk.uvs().to_vec());
    mesh.insert_attribute(Mesh::ATTRIBUTE_COLOR, chunk.colors().to_vec());
}

fn chunk_mesh(chunk: &Chunk) -> Mesh {
    let mut mesh = Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default());
    write_chunk_mesh(&mut mesh, chunk);
    mesh.insert_indices(Indices::U32(chunk.triangles().to_vec()));
    mesh
}

pub fn sync_chunk_meshes_system(
    mut commands: Commands,
    terrain: Res<DynamicTerrain>,
    material: Option<Res<TerrainMaterial>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut entities: ResMut<ChunkEntities>,
) {
    let Some(material) = material else { return };

    for chunk in terrain.active_chunks() {
        let Some(slot) = entities.by_id.get_mut(&chunk.id()) else {
            let mesh = meshes.add(chunk_mesh(chunk));
            let entity = commands
                .spawn((
                    Mesh3d(mesh.clone()),
                    MeshMaterial3d(material.0.clone()),
                    Transform::from_translation(chunk.origin()),
                    Visibility::Visible,
                    TerrainChunk { coord: chunk.coord() },
                ))
                .id();
            entities.by_id.insert(chunk.id(), ChunkEntity {
                entity,
                mesh,
                revision: chunk.revision(),
                coord: chunk.coord(),
                visible: true,
            });
            continue;
        };

        if slot.revision != chunk.revision() || slot.coord != chunk.coord() {
            if let Some(mesh) = meshes.get_mut(&slot.mesh) {
                write_chunk_mesh(mesh, chunk);
            }
            slot.revision = chunk.revision();
        }
        if slot.coord != chunk.coord() || !slot.visible {
            commands.entity(slot.entity).insert((
                Transform::from_translation(chunk.origin()),
                Visibility::Visible,
                TerrainChunk { coord: chunk.coord() },
            ));
            slot.coord = chunk.coord();
            slot.visible = true;
        }
    }

    /* pooled chunks keep their entity, hidden ---------------------------- */
    for chunk in terrain.pooled_chunks() {
        if let Some(slot) = entities.by_id.get_mut(&chunk.id()) {
            if slot.visible {
                commands.entity(slot.entity).insert(Visibility::Hidden);
                slot.visible = false;
            }
        }
    }
}

/* ===========================================================
   debug keys
   =========================================================== */
/// F3 toggles the constrained-vertex colouring
pub fn debug_colors_toggle_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut terrain: ResMut<DynamicTerrain>,
    mut mode: Local<DebugColors>,
) {
    if !keys.just_pressed(KeyCode::F3) {
        return;
    }
    *mode = match *mode {
        DebugColors::Off => DebugColors::Constrained,
        DebugColors::Constrained => DebugColors::Off,
    };
    info!("terrain debug colours: {:?}", *mode);
    terrain.set_debug_colors(*mode);
}

/// F12 writes the vertex map next to the executable's working directory
pub fn dump_vertex_map_system(keys: Res<ButtonInput<KeyCode>>, terrain: Res<DynamicTerrain>) {
    if keys.just_pressed(KeyCode::F12) {
        if let Err(e) = terrain.vertex_map().dump_to_file("vmap.txt") {
            error!("vertex map dump failed: {}", e);
        }
    }
}
