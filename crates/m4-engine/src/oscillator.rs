//! A single tone generator: waveform, level and detune.

use core::fmt;

use m4_midi::NO_NOTE;

use crate::frequency::FrequencyTable;

/// Full-scale unsigned sample value.
pub const MAX_AMPLITUDE: f32 = 65535.0;

/// Highest oscillator level.
pub const LEVEL_MAX: u8 = 10;

/// Fine detune bounds in cents.
pub const CENT_MIN: i8 = -100;
pub const CENT_MAX: i8 = 100;

/// Coarse detune bounds reachable by stepping.
pub const SEMITONE_MIN: i8 = -24;
pub const SEMITONE_MAX: i8 = 24;

/// Oscillator waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Oscillator disabled.
    None,
    #[default]
    Square,
    Sawtooth,
}

impl Waveform {
    /// Next waveform when stepping up (None → Sawtooth → Square → None).
    pub fn next(self) -> Self {
        match self {
            Waveform::None => Waveform::Sawtooth,
            Waveform::Sawtooth => Waveform::Square,
            Waveform::Square => Waveform::None,
        }
    }

    /// Next waveform when stepping down (None → Square → Sawtooth → None).
    pub fn prev(self) -> Self {
        match self {
            Waveform::None => Waveform::Square,
            Waveform::Square => Waveform::Sawtooth,
            Waveform::Sawtooth => Waveform::None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::None => "None",
            Waveform::Square => "Square",
            Waveform::Sawtooth => "Sawtooth",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction for bounded parameter steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Up,
    Down,
}

/// Oscillator setting addressed by a parameter menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parameter {
    Waveform,
    Level,
    Cent,
    Semitone,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Waveform,
        Parameter::Level,
        Parameter::Cent,
        Parameter::Semitone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Parameter::Waveform => "Waveform",
            Parameter::Level => "Level",
            Parameter::Cent => "Cent",
            Parameter::Semitone => "Semitone",
        }
    }
}

/// Display form of one oscillator setting, e.g. `Square`, `10`, `+8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParameterLabel {
    Waveform(Waveform),
    Level(u8),
    Detune(i8),
}

impl fmt::Display for ParameterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLabel::Waveform(w) => write!(f, "{}", w),
            ParameterLabel::Level(level) => write!(f, "{}", level),
            ParameterLabel::Detune(v) => write!(f, "{:+}", v),
        }
    }
}

/// One tone generator.
///
/// Parameters are plain scalars; the UI mutates them between buffer fills.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Oscillator {
    waveform: Waveform,
    /// Relative loudness, 0-10.
    level: u8,
    /// Fine detune in hundredths of a semitone, -100..=100.
    cent: i8,
    /// Coarse detune in semitones.
    semitone: i8,
}

impl Oscillator {
    pub fn new(waveform: Waveform, level: u8, cent: i8, semitone: i8) -> Self {
        let mut osc = Self::default();
        osc.set_waveform(waveform);
        osc.set_level(level);
        osc.set_cent(cent);
        osc.set_semitone(semitone);
        osc
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn cent(&self) -> i8 {
        self.cent
    }

    pub fn semitone(&self) -> i8 {
        self.semitone
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Set the level, pinned to 0-10.
    pub fn set_level(&mut self, level: u8) {
        self.level = level.min(LEVEL_MAX);
    }

    /// Set the fine detune, pinned to ±100 cents.
    pub fn set_cent(&mut self, cent: i8) {
        self.cent = cent.clamp(CENT_MIN, CENT_MAX);
    }

    pub fn set_semitone(&mut self, semitone: i8) {
        self.semitone = semitone;
    }

    pub fn step_waveform(&mut self, step: Step) {
        self.waveform = match step {
            Step::Up => self.waveform.next(),
            Step::Down => self.waveform.prev(),
        };
    }

    pub fn step_level(&mut self, step: Step) {
        self.level = match step {
            Step::Up if self.level < LEVEL_MAX => self.level + 1,
            Step::Down if self.level > 0 => self.level - 1,
            _ => self.level,
        };
    }

    pub fn step_cent(&mut self, step: Step) {
        self.cent = match step {
            Step::Up if self.cent < CENT_MAX => self.cent + 1,
            Step::Down if self.cent > CENT_MIN => self.cent - 1,
            _ => self.cent,
        };
    }

    pub fn step_semitone(&mut self, step: Step) {
        self.semitone = match step {
            Step::Up if self.semitone < SEMITONE_MAX => self.semitone + 1,
            Step::Down if self.semitone > SEMITONE_MIN => self.semitone - 1,
            _ => self.semitone,
        };
    }

    /// Step any parameter by one.
    pub fn step(&mut self, parameter: Parameter, step: Step) {
        match parameter {
            Parameter::Waveform => self.step_waveform(step),
            Parameter::Level => self.step_level(step),
            Parameter::Cent => self.step_cent(step),
            Parameter::Semitone => self.step_semitone(step),
        }
    }

    pub fn label(&self, parameter: Parameter) -> ParameterLabel {
        match parameter {
            Parameter::Waveform => ParameterLabel::Waveform(self.waveform),
            Parameter::Level => ParameterLabel::Level(self.level),
            Parameter::Cent => ParameterLabel::Detune(self.cent),
            Parameter::Semitone => ParameterLabel::Detune(self.semitone),
        }
    }

    /// Length of one waveform cycle in samples for `note`, after detune.
    ///
    /// Returns 0.0 for [`NO_NOTE`] and for detuned pitches that fall off the
    /// table; callers treat 0.0 as "contribute nothing".
    pub fn samples_per_cycle(&self, table: &FrequencyTable, note: u8, sample_rate: u32) -> f32 {
        if note == NO_NOTE {
            return 0.0;
        }

        let index = note as i32 + self.semitone as i32;
        let base = table.frequency(index);
        if base <= 0.0 {
            return 0.0;
        }

        // Cents interpolate linearly toward the neighbouring semitone.
        let fraction = self.cent as f32 / 100.0;
        let frequency = if self.cent > 0 {
            let upper = table.frequency(index + 1);
            if upper > 0.0 {
                base + (upper - base) * fraction
            } else {
                base
            }
        } else if self.cent < 0 {
            let lower = table.frequency(index - 1);
            if lower > 0.0 {
                base + (base - lower) * fraction
            } else {
                base
            }
        } else {
            base
        };

        sample_rate as f32 / frequency
    }

    /// Add this oscillator's output for `note` into `buffer`.
    ///
    /// `first_sample` is the absolute sample position of `buffer[0]`; phase is
    /// derived from it alone, so consecutive calls join seamlessly. Peak level
    /// is divided by `active_count` so the summed bank never exceeds full scale.
    pub fn mix_into(
        &self,
        table: &FrequencyTable,
        buffer: &mut [u16],
        active_count: u8,
        note: u8,
        first_sample: u64,
        sample_rate: u32,
    ) {
        if self.waveform == Waveform::None || active_count == 0 {
            return;
        }

        let cycle = self.samples_per_cycle(table, note, sample_rate) as f64;
        if cycle <= 0.0 {
            return;
        }

        let peak = MAX_AMPLITUDE * (self.level as f32 / LEVEL_MAX as f32) / active_count as f32;

        for (i, sample) in buffer.iter_mut().enumerate() {
            let position = (libm::fmod((first_sample + i as u64) as f64, cycle) / cycle) as f32;
            let value = match self.waveform {
                Waveform::Square if position > 0.5 => peak,
                Waveform::Sawtooth => peak * position,
                _ => 0.0,
            };
            *sample = sample.saturating_add(value as u16);
        }
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self {
            waveform: Waveform::Square,
            level: LEVEL_MAX,
            cent: 0,
            semitone: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SAMPLE_RATE: u32 = 44100;

    fn table() -> FrequencyTable {
        FrequencyTable::new()
    }

    #[test]
    fn default_is_full_level_square() {
        let osc = Oscillator::default();
        assert_eq!(osc.waveform(), Waveform::Square);
        assert_eq!(osc.level(), 10);
        assert_eq!(osc.cent(), 0);
        assert_eq!(osc.semitone(), 0);
    }

    #[test]
    fn setters_pin_level_and_cent() {
        let mut osc = Oscillator::default();
        osc.set_level(42);
        assert_eq!(osc.level(), 10);
        osc.set_cent(-120);
        assert_eq!(osc.cent(), -100);
        osc.set_cent(101);
        assert_eq!(osc.cent(), 100);
        osc.set_semitone(-40);
        assert_eq!(osc.semitone(), -40);
    }

    #[test]
    fn samples_per_cycle_for_reference_pitch() {
        let osc = Oscillator::default();
        let spc = osc.samples_per_cycle(&table(), 57, SAMPLE_RATE);
        assert_relative_eq!(spc, 44100.0 / 440.0, max_relative = 1e-5);
    }

    #[test]
    fn no_note_has_zero_cycle() {
        let osc = Oscillator::default();
        assert_eq!(osc.samples_per_cycle(&table(), NO_NOTE, SAMPLE_RATE), 0.0);
    }

    #[test]
    fn semitone_shifts_pitch() {
        let t = table();
        let osc = Oscillator::new(Waveform::Square, 10, 0, 12);
        let shifted = osc.samples_per_cycle(&t, 48, SAMPLE_RATE);
        let plain = Oscillator::default().samples_per_cycle(&t, 60, SAMPLE_RATE);
        assert_relative_eq!(shifted, plain, max_relative = 1e-6);
    }

    #[test]
    fn positive_cent_interpolates_upward() {
        let t = table();
        let osc = Oscillator::new(Waveform::Square, 10, 50, 0);
        let expected_hz = t.frequency(60) + (t.frequency(61) - t.frequency(60)) * 0.5;
        let spc = osc.samples_per_cycle(&t, 60, SAMPLE_RATE);
        assert_relative_eq!(spc, 44100.0 / expected_hz, max_relative = 1e-5);
    }

    #[test]
    fn negative_cent_interpolates_downward() {
        let t = table();
        let osc = Oscillator::new(Waveform::Square, 10, -25, 0);
        let expected_hz = t.frequency(60) - (t.frequency(60) - t.frequency(59)) * 0.25;
        let spc = osc.samples_per_cycle(&t, 60, SAMPLE_RATE);
        assert_relative_eq!(spc, 44100.0 / expected_hz, max_relative = 1e-5);
    }

    #[test]
    fn full_cent_reaches_neighbour() {
        let t = table();
        let up = Oscillator::new(Waveform::Square, 10, 100, 0).samples_per_cycle(&t, 60, SAMPLE_RATE);
        let next = Oscillator::default().samples_per_cycle(&t, 61, SAMPLE_RATE);
        assert_relative_eq!(up, next, max_relative = 1e-5);
    }

    #[test]
    fn detune_past_table_top_is_silent() {
        let osc = Oscillator::new(Waveform::Square, 10, 0, 24);
        assert_eq!(osc.samples_per_cycle(&table(), 120, SAMPLE_RATE), 0.0);
    }

    #[test]
    fn detune_below_table_is_silent() {
        let osc = Oscillator::new(Waveform::Square, 10, 0, -24);
        assert_eq!(osc.samples_per_cycle(&table(), 10, SAMPLE_RATE), 0.0);
    }

    #[test]
    fn cent_at_table_edge_saturates() {
        let t = table();
        let top = Oscillator::new(Waveform::Square, 10, 50, 0).samples_per_cycle(&t, 127, SAMPLE_RATE);
        let plain = Oscillator::default().samples_per_cycle(&t, 127, SAMPLE_RATE);
        assert_eq!(top, plain);
    }

    #[test]
    fn none_waveform_leaves_buffer_unchanged() {
        let osc = Oscillator::new(Waveform::None, 10, 0, 0);
        let mut buffer = [1234u16; 64];
        osc.mix_into(&table(), &mut buffer, 1, 60, 0, SAMPLE_RATE);
        assert!(buffer.iter().all(|&s| s == 1234));
    }

    #[test]
    fn square_is_low_then_high() {
        let osc = Oscillator::default();
        let t = table();
        // Note 57 = 440 Hz, about 100.2 samples per cycle.
        let mut buffer = [0u16; 100];
        osc.mix_into(&t, &mut buffer, 1, 57, 0, SAMPLE_RATE);
        assert!(buffer[..50].iter().all(|&s| s == 0));
        assert!(buffer[51..].iter().all(|&s| s == 65535));
    }

    #[test]
    fn sawtooth_ramps_up() {
        let osc = Oscillator::new(Waveform::Sawtooth, 10, 0, 0);
        let mut buffer = [0u16; 100];
        osc.mix_into(&table(), &mut buffer, 1, 57, 0, SAMPLE_RATE);
        assert_eq!(buffer[0], 0);
        assert!(buffer.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn level_scales_peak() {
        let osc = Oscillator::new(Waveform::Square, 5, 0, 0);
        let mut buffer = [0u16; 100];
        osc.mix_into(&table(), &mut buffer, 1, 57, 0, SAMPLE_RATE);
        assert_eq!(*buffer.iter().max().unwrap(), 32767);
    }

    #[test]
    fn active_count_divides_peak() {
        let osc = Oscillator::default();
        let mut buffer = [0u16; 100];
        osc.mix_into(&table(), &mut buffer, 3, 57, 0, SAMPLE_RATE);
        assert_eq!(*buffer.iter().max().unwrap(), 21845);
    }

    #[test]
    fn mixing_is_additive() {
        let osc = Oscillator::default();
        let mut buffer = [100u16; 100];
        osc.mix_into(&table(), &mut buffer, 2, 57, 0, SAMPLE_RATE);
        assert_eq!(buffer[0], 100);
        assert_eq!(buffer[99], 100 + 32767);
    }

    #[test]
    fn phase_follows_absolute_position() {
        let osc = Oscillator::new(Waveform::Sawtooth, 10, 8, 0);
        let t = table();
        let mut whole = [0u16; 300];
        osc.mix_into(&t, &mut whole, 1, 64, 1000, SAMPLE_RATE);

        let mut tail = [0u16; 100];
        osc.mix_into(&t, &mut tail, 1, 64, 1200, SAMPLE_RATE);
        assert_eq!(&whole[200..], &tail[..]);
    }

    #[test]
    fn level_steps_are_bounded() {
        let mut osc = Oscillator::default();
        osc.step_level(Step::Up);
        assert_eq!(osc.level(), 10);
        for _ in 0..20 {
            osc.step_level(Step::Down);
        }
        assert_eq!(osc.level(), 0);
    }

    #[test]
    fn cent_and_semitone_steps_are_bounded() {
        let mut osc = Oscillator::new(Waveform::Square, 10, 99, 23);
        osc.step_cent(Step::Up);
        osc.step_cent(Step::Up);
        osc.step_semitone(Step::Up);
        osc.step_semitone(Step::Up);
        assert_eq!(osc.cent(), 100);
        assert_eq!(osc.semitone(), 24);

        let mut osc = Oscillator::new(Waveform::Square, 10, -100, -24);
        osc.step_cent(Step::Down);
        osc.step_semitone(Step::Down);
        assert_eq!(osc.cent(), -100);
        assert_eq!(osc.semitone(), -24);
    }

    #[test]
    fn waveform_cycles_both_ways() {
        let mut osc = Oscillator::new(Waveform::None, 10, 0, 0);
        osc.step_waveform(Step::Up);
        assert_eq!(osc.waveform(), Waveform::Sawtooth);
        osc.step_waveform(Step::Up);
        assert_eq!(osc.waveform(), Waveform::Square);
        osc.step_waveform(Step::Up);
        assert_eq!(osc.waveform(), Waveform::None);

        osc.step_waveform(Step::Down);
        assert_eq!(osc.waveform(), Waveform::Square);
        osc.step_waveform(Step::Down);
        assert_eq!(osc.waveform(), Waveform::Sawtooth);
        osc.step_waveform(Step::Down);
        assert_eq!(osc.waveform(), Waveform::None);
    }

    #[test]
    fn labels_for_menu() {
        let osc = Oscillator::new(Waveform::Square, 10, 8, -3);
        assert_eq!(osc.label(Parameter::Waveform).to_string(), "Square");
        assert_eq!(osc.label(Parameter::Level).to_string(), "10");
        assert_eq!(osc.label(Parameter::Cent).to_string(), "+8");
        assert_eq!(osc.label(Parameter::Semitone).to_string(), "-3");
        assert_eq!(Oscillator::default().label(Parameter::Cent).to_string(), "+0");
    }

    #[test]
    fn generic_step_dispatches() {
        let mut osc = Oscillator::default();
        osc.step(Parameter::Level, Step::Down);
        osc.step(Parameter::Cent, Step::Up);
        osc.step(Parameter::Semitone, Step::Down);
        osc.step(Parameter::Waveform, Step::Down);
        assert_eq!(osc, Oscillator::new(Waveform::Sawtooth, 9, 1, -1));
    }
}
