use criterion::{black_box, criterion_group, criterion_main, Criterion};
use m4_engine::{AudioMixer, OscillatorSlot, Synth, Waveform, BUFFER_LEN, SAMPLE_RATE};

fn bench_mixer_fill(c: &mut Criterion) {
    let mut mixer = AudioMixer::new(SAMPLE_RATE);
    mixer.set_note(60);
    let mut buffer = [0u16; BUFFER_LEN];

    c.bench_function("mixer_fill_3_squares", |b| {
        b.iter(|| {
            mixer.fill_buffer(black_box(&mut buffer));
        })
    });

    let mut mixer = AudioMixer::new(SAMPLE_RATE);
    mixer.oscillator_mut(OscillatorSlot::Two).set_waveform(Waveform::Sawtooth);
    mixer.set_note(45);

    c.bench_function("mixer_fill_mixed_waveforms", |b| {
        b.iter(|| {
            mixer.fill_buffer(black_box(&mut buffer));
        })
    });
}

fn bench_synth_with_midi(c: &mut Criterion) {
    let mut synth = Synth::new(SAMPLE_RATE);
    let mut buffer = [0u16; BUFFER_LEN];
    let mut note = 48u8;

    c.bench_function("synth_fill_with_note_change", |b| {
        b.iter(|| {
            note = if note >= 72 { 48 } else { note + 1 };
            synth.receive_midi(0x90);
            synth.receive_midi(note);
            synth.receive_midi(100);
            synth.fill_buffer(black_box(&mut buffer));
        })
    });
}

criterion_group!(benches, bench_mixer_fill, bench_synth_with_midi);
criterion_main!(benches);
