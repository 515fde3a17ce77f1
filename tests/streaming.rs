//! end‑to‑end streaming: load window, pooling and mirror bookkeeping

use std::collections::HashSet;

use bevy::math::{IVec2, Vec3, Vec3Swizzles};

use music_terrain::budget::FrameBudget;
use music_terrain::coords::window;
use music_terrain::interfaces::Silence;
use music_terrain::streamer::{Collaborators, TickReport};
use music_terrain::{ChunkGenerationMode, DynamicTerrain, TerrainSettings};

fn settings(mode: ChunkGenerationMode) -> TerrainSettings {
    TerrainSettings {
        chunk_size: 100.0,
        chunk_resolution: 8,
        chunk_load_radius: 4,
        generation_mode: mode,
        ..TerrainSettings::default()
    }
}

fn tick(terrain: &mut DynamicTerrain, player: Vec3) -> TickReport {
    let mut silence = Silence;
    let mut collab = Collaborators {
        player: &player,
        spectrum: &mut silence,
        road: None,
    };
    terrain.tick_with(&mut collab, &FrameBudget::unlimited())
}

fn until_ready(terrain: &mut DynamicTerrain, player: Vec3) {
    for _ in 0..500 {
        if terrain.is_ready() {
            return;
        }
        tick(terrain, player);
    }
    panic!("terrain never became ready");
}

/// every mirror points at a live chunk that maps the vertex to that index
fn assert_mirrors_consistent(terrain: &DynamicTerrain) {
    for v in terrain.vertex_map().iter() {
        for m in &v.mirrors {
            let chunk = terrain
                .chunk(m.chunk)
                .unwrap_or_else(|| panic!("vertex {:?} mirrors unloaded chunk {:?}", v.coord, m.chunk));
            assert_eq!(chunk.local_index_of(v.coord).unwrap(), m.index);
        }
    }
}

#[test]
fn square_window_loads_81_chunks() {
    let mut terrain = DynamicTerrain::new(settings(ChunkGenerationMode::Square)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);
    assert_eq!(terrain.active_count(), 81);
    assert_eq!(terrain.pooled_count(), 0);
    // 9 chunks of 7 cells plus the closing row
    assert_eq!(terrain.vertex_map().len(), 64 * 64);
    assert_eq!(terrain.vertex_map().bounds(), Some((IVec2::splat(-28), IVec2::splat(35))));
}

#[test]
fn circular_window_loads_49_chunks() {
    let mut terrain = DynamicTerrain::new(settings(ChunkGenerationMode::Circular)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);
    assert_eq!(terrain.active_count(), 49);
    assert!(terrain.chunk(IVec2::new(4, 0)).is_some());
    assert!(terrain.chunk(IVec2::new(3, 3)).is_none());
}

#[test]
fn moving_one_chunk_recycles_a_column() {
    let mut terrain = DynamicTerrain::new(settings(ChunkGenerationMode::Square)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);
    let ids_before: Vec<_> = (-4..=4)
        .filter_map(|y| terrain.chunk(IVec2::new(-4, y)).map(|c| c.id()))
        .collect();
    assert_eq!(ids_before.len(), 9);

    let report = tick(&mut terrain, Vec3::new(100.0, 0.0, 0.0));
    assert_eq!(terrain.player_chunk(), IVec2::new(1, 0));
    assert_eq!(report.pooled, 9);
    assert_eq!(report.reused, 9);
    assert_eq!(report.created, 0);
    assert_eq!(terrain.active_count(), 81);
    assert_eq!(terrain.pooled_count(), 0);

    for y in -4..=4 {
        assert!(terrain.chunk(IVec2::new(-4, y)).is_none());
        let fresh = terrain.chunk(IVec2::new(5, y)).unwrap();
        assert!(ids_before.contains(&fresh.id()));
        assert_eq!(fresh.first_vertex(), IVec2::new(35, y * 7));
    }
    assert_mirrors_consistent(&terrain);

    // the dropped column's private vertices are kept but unmirrored
    let orphan = terrain.vertex_map().vertex(IVec2::new(-25, 0)).unwrap();
    assert!(orphan.mirrors.is_empty());
    assert!(!terrain.vertex_map().get_height(IVec2::new(-25, 0)).is_nan());
}

#[test]
fn moving_back_reuses_pooled_chunks() {
    let mut terrain = DynamicTerrain::new(settings(ChunkGenerationMode::Square)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);
    tick(&mut terrain, Vec3::new(100.0, 0.0, 0.0));
    let report = tick(&mut terrain, Vec3::ZERO);
    assert_eq!((report.pooled, report.reused, report.created), (9, 9, 0));
    assert_mirrors_consistent(&terrain);
}

#[test]
fn shared_vertices_mirror_every_chunk() {
    let mut terrain = DynamicTerrain::new(settings(ChunkGenerationMode::Square)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);
    let vmap = terrain.vertex_map();
    let mirrors = |x, y| vmap.vertex(IVec2::new(x, y)).map(|v| v.mirrors.len());

    assert_eq!(mirrors(3, 3), Some(1)); // interior
    assert_eq!(mirrors(7, 3), Some(2)); // edge between two chunks
    assert_eq!(mirrors(7, 7), Some(4)); // corner of four
    assert_eq!(mirrors(-28, -28), Some(1)); // outer corner of the window
    assert_mirrors_consistent(&terrain);
}

#[test]
fn heights_agree_across_shared_borders() {
    let mut terrain = DynamicTerrain::new(settings(ChunkGenerationMode::Square)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);

    let corner = IVec2::new(14, 21);
    assert!(terrain.set_height(corner, -12.5));
    for v in terrain.vertex_map().vertex(corner).unwrap().mirrors.clone() {
        let chunk = terrain.chunk(v.chunk).unwrap();
        assert_eq!(chunk.positions()[v.index].y, -12.5);
    }
}

fn assert_window_exact(terrain: &DynamicTerrain, mode: ChunkGenerationMode) {
    let expected: HashSet<IVec2> = window(mode, terrain.player_chunk(), 4).collect();
    let active: Vec<IVec2> = terrain.active_chunks().map(|c| c.coord()).collect();
    let unique: HashSet<IVec2> = active.iter().copied().collect();
    assert_eq!(active.len(), unique.len(), "duplicate chunk coordinates");
    assert_eq!(unique, expected);
}

fn walk(mode: ChunkGenerationMode) {
    let mut terrain = DynamicTerrain::new(settings(mode)).unwrap();
    until_ready(&mut terrain, Vec3::ZERO);
    assert_window_exact(&terrain, mode);

    let path = [
        Vec3::new(100.0, 0.0, 0.0),    // one chunk +x
        Vec3::new(200.0, 0.0, 100.0),  // diagonal
        Vec3::new(210.0, 0.0, 140.0),  // same chunk
        Vec3::new(480.0, 0.0, -160.0), // three chunks at once
        Vec3::new(-20.0, 0.0, -20.0),  // back home
        Vec3::new(-949.0, 0.0, 951.0), // beyond the whole window
        Vec3::new(-860.0, 0.0, 860.0),
    ];
    let mut total = terrain.active_count();
    for p in path {
        let report = tick(&mut terrain, p);
        let expected = (p.xz() / 100.0 + 0.5).floor().as_ivec2();
        assert_eq!(terrain.player_chunk(), expected);
        assert_window_exact(&terrain, mode);
        total += report.created;
        // chunks are only ever parked, never dropped
        assert_eq!(terrain.active_count() + terrain.pooled_count(), total);
        assert_mirrors_consistent(&terrain);
    }
}

#[test]
fn square_window_stays_exact_on_a_walk() {
    walk(ChunkGenerationMode::Square);
}

#[test]
fn circular_window_stays_exact_on_a_walk() {
    walk(ChunkGenerationMode::Circular);
}
