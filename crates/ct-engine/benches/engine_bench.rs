use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ct_engine::{Engine, BLOCK_SIZE};
use ct_ir::{Channel, ClockConfig, NoiseConfig, Song, Step, Track, VoiceConfig};

fn busy_song() -> Song {
    let mut song = Song::new("bench", ClockConfig::default());
    for ch in 0..4u8 {
        let steps = (0..16u8)
            .map(|i| match i % 4 {
                0 => Step::Note { semitone: (i + ch) % 12, octave: 2 },
                3 => Step::NoteOff,
                _ => Step::Sustain,
            })
            .collect();
        let config = VoiceConfig { vibrato_depth: 64, pulse_width: ch % 3, ..Default::default() };
        song.add_channel(Channel::pulse(Track::new("lead", steps), config));
    }
    let hits = (0..16).map(|i| if i % 4 == 2 { Step::Trigger } else { Step::Sustain }).collect();
    song.add_channel(Channel::noise(Track::new("snare", hits), NoiseConfig::default()));
    song
}

fn render_block(c: &mut Criterion) {
    let song = busy_song();
    let mut engine = Engine::new(&song).unwrap();
    let mut buf = [0i16; BLOCK_SIZE];
    c.bench_function("render_i16 block", |b| {
        b.iter(|| {
            engine.render_i16(&mut buf);
            black_box(&buf);
        })
    });
}

fn render_one_second(c: &mut Criterion) {
    let song = busy_song();
    c.bench_function("render 1s", |b| {
        b.iter(|| {
            let mut engine = Engine::new(&song).unwrap();
            let rate = engine.sample_rate() as usize;
            black_box(engine.render_samples(rate))
        })
    });
}

criterion_group!(benches, render_block, render_one_second);
criterion_main!(benches);
