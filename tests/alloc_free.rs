//! Allocation-free render path tests.
//!
//! These tests verify that `Engine::render_i16()` does not allocate once the
//! engine is built. They render several seconds of the fixture song and
//! the demo to cover note-on, release, retrigger and noise bursts.
//!
//! Just run `cargo test`; no feature flags needed.

use assert_no_alloc::{assert_no_alloc, AllocDisabler};

#[cfg(debug_assertions)]
#[global_allocator]
static A: AllocDisabler = AllocDisabler;

use ct_engine::{Engine, BLOCK_SIZE};
use std::path::PathBuf;

fn fixture(name: &str) -> ct_ir::Song {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/songs").join(name);
    ct_formats::load_song_file(&path).unwrap()
}

/// Render `seconds` of a song, aborting on any heap allocation.
fn assert_render_alloc_free(song: ct_ir::Song, seconds: usize) {
    let mut engine = Engine::new(&song).unwrap();
    let blocks = engine.sample_rate() as usize * seconds / BLOCK_SIZE;
    let mut block = [0i16; BLOCK_SIZE];

    assert_no_alloc(|| {
        for _ in 0..blocks {
            engine.render_i16(&mut block);
        }
    });
}

#[test]
fn groove_alloc_free() {
    assert_render_alloc_free(fixture("groove.toml"), 5);
}

#[test]
fn demo_alloc_free() {
    assert_render_alloc_free(ct_master::demo_song(), 5);
}

#[test]
fn raw_mix_alloc_free() {
    let mut engine = Engine::new(&fixture("groove.toml")).unwrap();
    let mut buf = [0i32; 1000];
    assert_no_alloc(|| {
        for _ in 0..100 {
            engine.render(&mut buf);
        }
    });
}
