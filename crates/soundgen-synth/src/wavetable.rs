//! Band-limited wavetables built by additive synthesis.
//!
//! Every table-backed shape is stored as a ladder of frequency bands. Band
//! `k` holds one cycle of the shape summed from the integer harmonics that
//! stay under the band limit for a fundamental of `MIN_FREQ * sqrt(2)^k`.
//! A lookup blends the two bands bracketing the requested frequency, so the
//! harmonic content fades smoothly as pitch rises and nothing aliases.
//!
//! ```text
//!   band 0   ~1000 harmonics   fundamental   20 Hz
//!   band 1    ~707 harmonics   fundamental   28 Hz
//!   band 2    ~500 harmonics   fundamental   40 Hz
//!   ...
//!   band 18     ~2 harmonics   fundamental 10240 Hz
//! ```
//!
//! The harmonic series is chosen once per table generation pass; lookups
//! only pick a precomputed table.

use core::f32::consts::{FRAC_1_PI, FRAC_2_PI, TAU};
use core::f64::consts::{FRAC_PI_2, PI, SQRT_2};
use core::fmt;
use libm::{floorf, log2f, sin, sinf};

/// Number of samples in one table cycle.
pub const TABLE_SIZE: usize = 2048;

/// Fundamental of the widest band, in Hz.
pub const MIN_FREQ: f32 = 20.0;

/// Upper bound on the band limit regardless of sample rate, in Hz.
pub const MAX_BAND_LIMIT: f32 = 20_000.0;

/// Waveform shapes an oscillator can produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub enum WaveShape {
    /// Pure sine.
    #[default]
    Sine,
    /// Positive half of a sine, silent (DC-corrected) during the negative half.
    HalfSine,
    /// Full-wave rectified sine with its DC offset removed.
    AbsSine,
    /// Rectified sine kept only on the rising quarter of each half cycle.
    QuarterSine,
    /// Double-speed sine during the first half cycle, silent in the second.
    PulseSine,
    /// 50% duty square.
    Square,
    /// Falling sawtooth.
    Saw,
}

impl WaveShape {
    /// Every shape, in document order.
    pub const ALL: [WaveShape; 7] = [
        WaveShape::Sine,
        WaveShape::HalfSine,
        WaveShape::AbsSine,
        WaveShape::QuarterSine,
        WaveShape::PulseSine,
        WaveShape::Square,
        WaveShape::Saw,
    ];

    /// Name used in instrument documents.
    pub fn name(self) -> &'static str {
        match self {
            WaveShape::Sine => "sine",
            WaveShape::HalfSine => "halfSine",
            WaveShape::AbsSine => "absSine",
            WaveShape::QuarterSine => "quarterSine",
            WaveShape::PulseSine => "pulseSine",
            WaveShape::Square => "square",
            WaveShape::Saw => "saw",
        }
    }
}

impl fmt::Display for WaveShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One term of a harmonic series: `amplitude * sin(i * x + phase)`.
#[derive(Clone, Copy)]
struct Partial {
    amplitude: f64,
    phase: f64,
}

impl Partial {
    const SILENT: Partial = Partial {
        amplitude: 0.0,
        phase: 0.0,
    };
}

/// Harmonic series backing a table. The sum is scaled by `4/pi`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Series {
    /// 50% pulse, cosine phase: +1 around phase 0, -1 around phase 0.5.
    Square,
    /// `|sin x| - 2/pi`, even cosine harmonics only.
    AbsSine,
    /// `(pi - x) / pi`.
    Saw,
}

impl Series {
    fn partial(self, i: usize) -> Partial {
        if i == 0 {
            return Partial::SILENT;
        }
        let n = i as f64;
        match self {
            Series::Square => match i % 4 {
                1 => Partial {
                    amplitude: 1.0 / n,
                    phase: FRAC_PI_2,
                },
                3 => Partial {
                    amplitude: -1.0 / n,
                    phase: FRAC_PI_2,
                },
                _ => Partial::SILENT,
            },
            Series::AbsSine => {
                if i % 2 == 0 {
                    Partial {
                        amplitude: -1.0 / (n * n - 1.0),
                        phase: FRAC_PI_2,
                    }
                } else {
                    Partial::SILENT
                }
            }
            Series::Saw => Partial {
                amplitude: 0.5 / n,
                phase: 0.0,
            },
        }
    }
}

/// Ladder of band tables for one series, widest band first.
#[derive(Clone)]
struct BandTables {
    bands: Vec<Box<[f32]>>,
}

impl BandTables {
    fn generate(series: Series, band_limit: f32) -> Self {
        // Harmonic ceiling per band; bands stop once fewer than sqrt(2)
        // harmonics would fit.
        let mut ceilings = Vec::new();
        let mut num_sines = f64::from(band_limit) / f64::from(MIN_FREQ);
        while num_sines >= SQRT_2 {
            ceilings.push(num_sines);
            num_sines /= SQRT_2;
        }

        // Narrow bands are prefixes of wider ones, so build from the top
        // band down and keep adding harmonics to one accumulator.
        let mut acc = vec![series.partial(0).amplitude; TABLE_SIZE];
        let mut bands = Vec::with_capacity(ceilings.len());
        let mut harmonic = 1usize;
        let step = 2.0 * PI / TABLE_SIZE as f64;

        for &ceiling in ceilings.iter().rev() {
            while (harmonic as f64) < ceiling {
                let partial = series.partial(harmonic);
                if partial.amplitude != 0.0 {
                    for (j, sample) in acc.iter_mut().enumerate() {
                        let turns = (j * harmonic) % TABLE_SIZE;
                        *sample += sin(turns as f64 * step + partial.phase) * partial.amplitude;
                    }
                }
                harmonic += 1;
            }
            bands.push(
                acc.iter()
                    .map(|&s| (s * 4.0 / PI) as f32)
                    .collect::<Box<[f32]>>(),
            );
        }

        bands.reverse();
        Self { bands }
    }

    /// Blend the bands bracketing `freq`, treating a band past the end as silence.
    ///
    /// `limit` is the highest frequency this lookup may produce; lowering it
    /// below `band_limit` selects narrower bands.
    fn sample(&self, phase: f32, freq: f32, limit: f32, band_limit: f32) -> f32 {
        if limit <= 0.0 {
            return 0.0;
        }
        let scaled = freq * band_limit / limit / MIN_FREQ;
        let position = if scaled > 1.0 {
            log2f(scaled) * 2.0
        } else {
            0.0
        };
        let band = position as usize;
        if band >= self.bands.len() {
            return 0.0;
        }
        let frac = position - band as f32;
        let lower = self.read(band, phase);
        let upper = self.read(band + 1, phase);
        lower + frac * (upper - lower)
    }

    #[inline]
    fn read(&self, band: usize, phase: f32) -> f32 {
        let Some(table) = self.bands.get(band) else {
            return 0.0;
        };
        let position = phase * TABLE_SIZE as f32;
        let index = position as usize;
        let frac = position - index as f32;
        let a = table[index % TABLE_SIZE];
        let b = table[(index + 1) % TABLE_SIZE];
        a + frac * (b - a)
    }
}

/// Shared cache of band-limited tables.
///
/// Built once for a band limit (`min(20 kHz, sample_rate / 2)`) and read
/// concurrently by every oscillator afterwards. Changing to a sample rate
/// with a different band limit requires a new cache.
///
/// # Example
///
/// ```rust
/// use soundgen_synth::{WaveShape, WaveTable};
///
/// let table = WaveTable::new(48000.0);
/// let s = table.sample(WaveShape::Square, 440.0, 0.1);
/// assert!(s.abs() <= 1.0);
/// ```
#[derive(Clone)]
pub struct WaveTable {
    sample_rate: f32,
    band_limit: f32,
    square: BandTables,
    abs_sine: BandTables,
    saw: BandTables,
}

impl WaveTable {
    /// Build every table for the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let band_limit = Self::band_limit_for(sample_rate);
        Self {
            sample_rate,
            band_limit,
            square: BandTables::generate(Series::Square, band_limit),
            abs_sine: BandTables::generate(Series::AbsSine, band_limit),
            saw: BandTables::generate(Series::Saw, band_limit),
        }
    }

    /// Band limit a cache built for `sample_rate` would use.
    pub fn band_limit_for(sample_rate: f32) -> f32 {
        MAX_BAND_LIMIT.min(sample_rate * 0.5)
    }

    /// Sample rate this cache was built for.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Highest frequency any lookup produces, in Hz.
    pub fn band_limit(&self) -> f32 {
        self.band_limit
    }

    /// Number of bands per table-backed shape.
    pub fn band_count(&self) -> usize {
        self.square.bands.len()
    }

    /// Whether this cache can serve `sample_rate` without rebuilding.
    pub fn is_compatible(&self, sample_rate: f32) -> bool {
        Self::band_limit_for(sample_rate) == self.band_limit
    }

    /// Band-limited sample of `wave` at `freq` Hz and `phase` (cycles).
    ///
    /// Phase may be any value; only its fractional part is used. Output
    /// fades toward silence as `freq` approaches the band limit.
    pub fn sample(&self, wave: WaveShape, freq: f32, phase: f32) -> f32 {
        let phase = wrap(phase);
        let limit = self.band_limit;
        match wave {
            WaveShape::Sine => sine(phase, freq, limit),
            WaveShape::AbsSine => self.abs_sine.sample(phase, freq, limit, limit),
            WaveShape::HalfSine => {
                let rectified = self.abs_sine.sample(phase, freq, limit, limit);
                0.5 * (sine(phase, freq, limit) + rectified)
            }
            WaveShape::QuarterSine => {
                let half = limit * 0.5;
                let rectified = self.abs_sine.sample(phase, freq, half, limit) + FRAC_2_PI;
                let gate = self.gate(2.0 * phase - 0.25, 2.0 * freq, half);
                rectified * gate - FRAC_1_PI
            }
            WaveShape::PulseSine => {
                let doubled = sine(wrap(2.0 * phase), 2.0 * freq, limit);
                doubled * self.gate(phase - 0.25, freq, limit - 2.0 * freq)
            }
            WaveShape::Square => 0.5 * self.square.sample(phase, freq, limit, limit),
            WaveShape::Saw => 0.5 * self.saw.sample(phase, freq, limit, limit),
        }
    }

    /// 0..1 gate open for the half cycle centred on `phase == 0`.
    #[inline]
    fn gate(&self, phase: f32, freq: f32, limit: f32) -> f32 {
        let square = self.square.sample(wrap(phase), freq, limit, self.band_limit);
        (0.5 * (square + 1.0)).clamp(0.0, 1.0)
    }
}

impl fmt::Debug for WaveTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaveTable")
            .field("sample_rate", &self.sample_rate)
            .field("band_limit", &self.band_limit)
            .field("bands", &self.band_count())
            .finish_non_exhaustive()
    }
}

/// Fractional part of `phase`, in `[0, 1)`.
#[inline]
fn wrap(phase: f32) -> f32 {
    let wrapped = phase - floorf(phase);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Sine with a linear fade to silence over the top octave below `limit`.
#[inline]
fn sine(phase: f32, freq: f32, limit: f32) -> f32 {
    if limit <= 0.0 {
        return 0.0;
    }
    let amplitude = (2.0 * (1.0 - freq / limit)).clamp(0.0, 1.0);
    if amplitude == 0.0 {
        return 0.0;
    }
    sinf(TAU * phase) * amplitude
}
