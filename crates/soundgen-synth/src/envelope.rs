//! Piecewise-linear amplitude envelopes.
//!
//! An envelope is a list of points, each reached `dx` seconds after the
//! previous one, plus an optional sustain point and a release rate. ADSR
//! settings are a convenience that lowers to three points.
//!
//! ```text
//!   level
//!    1 |    /\
//!      |   /  \________          sustain point = 3
//!    s |  /            \
//!      | /              \        release: linear at `release` per second
//!    0 |/________________\___
//!       attack decay  gate off
//! ```

use libm::ceilf;
use thiserror::Error;

/// Errors from envelope validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvelopeError {
    /// A point-list envelope needs at least one point.
    #[error("envelope has no points")]
    NoPoints,

    /// Sustain point index is past the end of the point list.
    #[error("sustain point {sustain_point} is out of range for {len} points")]
    SustainOutOfRange {
        /// The 1-indexed sustain point.
        sustain_point: usize,
        /// Number of points.
        len: usize,
    },

    /// A segment duration is negative or not finite.
    #[error("point {index} has invalid duration {dx}")]
    InvalidDuration {
        /// 0-indexed point.
        index: usize,
        /// The offending duration in seconds.
        dx: f32,
    },

    /// A point level is outside 0..=1.
    #[error("point {index} has level {y} outside 0..=1")]
    InvalidLevel {
        /// 0-indexed point.
        index: usize,
        /// The offending level.
        y: f32,
    },

    /// A rate must be positive and finite.
    #[error("{name} rate must be positive, got {value}")]
    InvalidRate {
        /// Which rate (`attack`, `decay`, `release`).
        name: &'static str,
        /// The offending value.
        value: f32,
    },

    /// ADSR sustain level is outside 0..=1.
    #[error("sustain level {0} outside 0..=1")]
    InvalidSustain(f32),
}

/// One envelope breakpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvelopePoint {
    /// Seconds from the previous point. Ignored on the first point.
    pub dx: f32,
    /// Level reached at this point, 0..=1.
    pub y: f32,
}

impl EnvelopePoint {
    /// Create a point.
    pub const fn new(dx: f32, y: f32) -> Self {
        Self { dx, y }
    }
}

/// Attack/decay/release rates (level per second) and a sustain level.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdsrParams {
    /// Rise rate from 0 to 1.
    pub attack: f32,
    /// Fall rate from 1 toward the sustain level.
    pub decay: f32,
    /// Held level while the gate is on.
    pub sustain: f32,
    /// Fall rate after gate-off.
    pub release: f32,
}

impl Default for AdsrParams {
    /// 125 ms attack, 100 ms decay to 0.5, 200 ms release from full level.
    fn default() -> Self {
        Self {
            attack: 8.0,
            decay: 5.0,
            sustain: 0.5,
            release: 5.0,
        }
    }
}

impl AdsrParams {
    /// Check rates are positive and sustain is a valid level.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        for (name, value) in [
            ("attack", self.attack),
            ("decay", self.decay),
            ("release", self.release),
        ] {
            check_rate(name, value)?;
        }
        if !(0.0..=1.0).contains(&self.sustain) {
            return Err(EnvelopeError::InvalidSustain(self.sustain));
        }
        Ok(())
    }

    /// Lower to `[(0, 0), (1/attack, 1), ((1 - sustain)/decay, sustain)]`
    /// sustaining on the third point.
    pub fn to_points(&self) -> PointEnvelope {
        PointEnvelope {
            points: vec![
                EnvelopePoint::new(0.0, 0.0),
                EnvelopePoint::new(1.0 / self.attack, 1.0),
                EnvelopePoint::new((1.0 - self.sustain) / self.decay, self.sustain),
            ],
            sustain_point: 3,
            release: self.release,
        }
    }
}

/// Explicit breakpoint envelope.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct PointEnvelope {
    /// Breakpoints in time order.
    pub points: Vec<EnvelopePoint>,
    /// 1-indexed point to hold while gated; 0 means no sustain.
    pub sustain_point: usize,
    /// Fall rate after gate-off or after the last point, level per second.
    pub release: f32,
}

impl PointEnvelope {
    /// Check the point list, sustain index and release rate.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.points.is_empty() {
            return Err(EnvelopeError::NoPoints);
        }
        if self.sustain_point > self.points.len() {
            return Err(EnvelopeError::SustainOutOfRange {
                sustain_point: self.sustain_point,
                len: self.points.len(),
            });
        }
        check_rate("release", self.release)?;
        for (index, point) in self.points.iter().enumerate() {
            if !point.dx.is_finite() || point.dx < 0.0 {
                return Err(EnvelopeError::InvalidDuration { index, dx: point.dx });
            }
            if !(0.0..=1.0).contains(&point.y) {
                return Err(EnvelopeError::InvalidLevel { index, y: point.y });
            }
        }
        Ok(())
    }

    /// The same envelope with its sustain removed, so it plays through once
    /// and releases regardless of the gate.
    pub fn one_shot(mut self) -> Self {
        self.sustain_point = 0;
        self
    }

    /// Ramp from 0 to `level` over `ramp` seconds, hold, and release at the
    /// same speed.
    pub fn flat(level: f32, ramp: f32) -> Self {
        Self {
            points: vec![EnvelopePoint::new(0.0, 0.0), EnvelopePoint::new(ramp, level)],
            sustain_point: 2,
            release: 1.0 / ramp,
        }
    }
}

/// Envelope settings as stored in an instrument.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "tag", rename_all = "lowercase")
)]
pub enum EnvelopeSpec {
    /// Attack/decay/sustain/release rates.
    Adsr(AdsrParams),
    /// Explicit breakpoints.
    Points(PointEnvelope),
}

impl Default for EnvelopeSpec {
    fn default() -> Self {
        EnvelopeSpec::Adsr(AdsrParams::default())
    }
}

impl EnvelopeSpec {
    /// Validate whichever form this is.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        match self {
            EnvelopeSpec::Adsr(adsr) => adsr.validate(),
            EnvelopeSpec::Points(points) => points.validate(),
        }
    }

    /// Breakpoint form of this envelope.
    pub fn to_points(&self) -> PointEnvelope {
        match self {
            EnvelopeSpec::Adsr(adsr) => adsr.to_points(),
            EnvelopeSpec::Points(points) => points.clone(),
        }
    }

    /// Drum form: same points, no sustain.
    pub fn one_shot(&self) -> Self {
        EnvelopeSpec::Points(self.to_points().one_shot())
    }

    /// See [`PointEnvelope::flat`].
    pub fn flat(level: f32, ramp: f32) -> Self {
        EnvelopeSpec::Points(PointEnvelope::flat(level, ramp))
    }
}

fn check_rate(name: &'static str, value: f32) -> Result<(), EnvelopeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EnvelopeError::InvalidRate { name, value })
    }
}

/// Envelope playback state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Walking the point list.
    #[default]
    Normal,
    /// Holding the sustain point while gated.
    Sustain,
    /// Falling linearly toward zero.
    Release,
    /// Silent; will not produce output again.
    Stopped,
}

/// Running envelope instance, stepped once per sample.
///
/// # Example
///
/// ```rust
/// use soundgen_synth::{AdsrParams, Envelope, EnvelopeSpec, EnvelopeState};
///
/// let spec = EnvelopeSpec::Adsr(AdsrParams { attack: 100.0, decay: 100.0, sustain: 0.5, release: 100.0 });
/// let mut env = Envelope::new(&spec, 1000.0).unwrap();
///
/// for _ in 0..100 {
///     env.step(true);
/// }
/// assert_eq!(env.state(), EnvelopeState::Sustain);
/// assert_eq!(env.position(), 0.5);
///
/// for _ in 0..100 {
///     env.step(false);
/// }
/// assert!(env.is_stopped());
/// ```
#[derive(Debug, Clone)]
pub struct Envelope {
    points: Vec<EnvelopePoint>,
    sustain_point: usize,
    release_rate: f32,
    sample_period: f64,

    state: EnvelopeState,
    position: f32,
    /// 1-indexed point the current segment heads toward.
    point_index: usize,
    /// Seconds left in the current segment, carried across segments.
    segment_timer: f64,
    segment_rate: f32,
    slope: f32,
    target: f32,
    release_step: f32,
    release_remaining: u32,
}

impl Envelope {
    /// Validate `spec` and start it at its first point.
    pub fn new(spec: &EnvelopeSpec, sample_rate: f32) -> Result<Self, EnvelopeError> {
        spec.validate()?;
        let PointEnvelope {
            points,
            sustain_point,
            release,
        } = spec.to_points();
        let position = points[0].y;
        let mut env = Self {
            points,
            sustain_point,
            release_rate: release,
            sample_period: 1.0 / f64::from(sample_rate),
            state: EnvelopeState::Normal,
            position,
            point_index: 0,
            segment_timer: 0.0,
            segment_rate: 0.0,
            slope: 0.0,
            target: position,
            release_step: release / sample_rate,
            release_remaining: 0,
        };
        env.next_point();
        Ok(env)
    }

    /// Current level.
    #[inline]
    pub fn position(&self) -> f32 {
        self.position
    }

    /// Current playback state.
    #[inline]
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// True once the release has run out.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.state == EnvelopeState::Stopped
    }

    /// Advance one sample. `gate == false` outside of release starts the release.
    pub fn step(&mut self, gate: bool) {
        match self.state {
            EnvelopeState::Normal => {
                if !gate {
                    self.enter_release();
                    return;
                }
                self.segment_timer -= self.sample_period;
                if self.segment_timer > 0.0 {
                    let next = self.position + self.slope;
                    self.position = if self.slope >= 0.0 {
                        next.min(self.target)
                    } else {
                        next.max(self.target)
                    };
                } else {
                    self.next_point();
                }
            }
            EnvelopeState::Sustain => {
                if !gate {
                    self.enter_release();
                }
            }
            EnvelopeState::Release => {
                if self.release_remaining <= 1 {
                    self.position = 0.0;
                    self.state = EnvelopeState::Stopped;
                } else {
                    self.release_remaining -= 1;
                    self.position = (self.position - self.release_step).max(0.0);
                }
            }
            EnvelopeState::Stopped => {}
        }
    }

    /// Start the release now, whatever the gate does next.
    pub fn release(&mut self) {
        if matches!(self.state, EnvelopeState::Normal | EnvelopeState::Sustain) {
            self.enter_release();
        }
    }

    /// Retune to a new sample rate without restarting.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_period = 1.0 / f64::from(sample_rate);
        self.slope = self.segment_rate / sample_rate;
        self.release_step = self.release_rate / sample_rate;
        if self.state == EnvelopeState::Release {
            self.release_remaining = self.release_samples();
        }
    }

    fn next_point(&mut self) {
        self.point_index += 1;
        if self.point_index == self.sustain_point {
            self.position = self.points[self.point_index - 1].y;
            self.state = EnvelopeState::Sustain;
        } else if self.point_index > self.points.len() {
            self.enter_release();
        } else if let Some(&to) = self.points.get(self.point_index) {
            let from = self.points[self.point_index - 1];
            self.position = from.y;
            self.target = to.y;
            self.segment_timer += f64::from(to.dx);
            self.segment_rate = if to.dx > 0.0 {
                (to.y - from.y) / to.dx
            } else {
                0.0
            };
            self.slope = self.segment_rate * self.sample_period as f32;
        } else {
            // Last point without sustain: hold it until the next step releases.
            self.position = self.points[self.point_index - 1].y;
        }
    }

    fn enter_release(&mut self) {
        self.state = EnvelopeState::Release;
        self.release_remaining = self.release_samples();
    }

    fn release_samples(&self) -> u32 {
        if self.position <= 0.0 {
            0
        } else {
            ceilf(self.position / self.release_step) as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 1000.0;

    fn adsr(attack: f32, decay: f32, sustain: f32, release: f32) -> EnvelopeSpec {
        EnvelopeSpec::Adsr(AdsrParams {
            attack,
            decay,
            sustain,
            release,
        })
    }

    #[test]
    fn adsr_lowers_to_three_points() {
        let points = AdsrParams {
            attack: 4.0,
            decay: 2.0,
            sustain: 0.6,
            release: 1.0,
        }
        .to_points();
        assert_eq!(points.sustain_point, 3);
        assert_eq!(points.points[1], EnvelopePoint::new(0.25, 1.0));
        assert!((points.points[2].dx - 0.2).abs() < 1e-6);
        assert_eq!(points.points[2].y, 0.6);
    }

    #[test]
    fn attack_reaches_peak_then_sustains() {
        let mut env = Envelope::new(&adsr(10.0, 10.0, 0.5, 10.0), SR).unwrap();
        assert_eq!(env.position(), 0.0);

        let mut peak = 0.0f32;
        let mut last = 0.0;
        for _ in 0..101 {
            env.step(true);
            assert!(env.position() >= last);
            last = env.position();
            peak = peak.max(last);
        }
        assert_eq!(peak, 1.0);

        for _ in 0..200 {
            env.step(true);
        }
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.position(), 0.5);

        // Held indefinitely while gated.
        for _ in 0..10_000 {
            env.step(true);
        }
        assert_eq!(env.position(), 0.5);
        assert!(!env.is_stopped());
    }

    #[test]
    fn release_stops_within_bound() {
        let mut env = Envelope::new(&adsr(100.0, 100.0, 0.8, 4.0), SR).unwrap();
        for _ in 0..50 {
            env.step(true);
        }
        assert_eq!(env.state(), EnvelopeState::Sustain);

        let start = env.position();
        let bound = ceilf(start / (4.0 / SR)) as usize;
        let mut last = start;
        let mut steps = 0;
        while !env.is_stopped() {
            env.step(false);
            assert!(env.position() <= last);
            last = env.position();
            steps += 1;
            assert!(steps <= bound, "still running after {steps} steps");
        }
        assert_eq!(env.position(), 0.0);
    }

    #[test]
    fn gate_off_mid_attack_releases() {
        let mut env = Envelope::new(&adsr(1.0, 1.0, 0.5, 100.0), SR).unwrap();
        for _ in 0..100 {
            env.step(true);
        }
        assert_eq!(env.state(), EnvelopeState::Normal);
        env.step(false);
        assert_eq!(env.state(), EnvelopeState::Release);
    }

    #[test]
    fn one_shot_plays_through_and_stops() {
        let spec = EnvelopeSpec::Points(
            PointEnvelope {
                points: vec![
                    EnvelopePoint::new(0.0, 0.0),
                    EnvelopePoint::new(0.01, 1.0),
                    EnvelopePoint::new(0.05, 0.2),
                ],
                sustain_point: 3,
                release: 10.0,
            }
            .one_shot(),
        );
        let mut env = Envelope::new(&spec, SR).unwrap();
        let mut steps = 0;
        while !env.is_stopped() {
            env.step(true);
            steps += 1;
            assert!(steps < 1000);
        }
        assert!(steps > 60);
    }

    #[test]
    fn forced_release_ignores_gate() {
        let mut env = Envelope::new(&EnvelopeSpec::flat(1.0, 0.001), SR).unwrap();
        for _ in 0..5 {
            env.step(true);
        }
        env.release();
        assert_eq!(env.state(), EnvelopeState::Release);
        for _ in 0..10 {
            env.step(true);
        }
        assert!(env.is_stopped());
        env.release();
        assert!(env.is_stopped());
    }

    #[test]
    fn spec_one_shot_drops_sustain() {
        let drum = EnvelopeSpec::default().one_shot();
        let EnvelopeSpec::Points(points) = &drum else {
            panic!("expected points, got {drum:?}");
        };
        assert_eq!(points.sustain_point, 0);
        assert_eq!(points.points.len(), 3);
    }

    #[test]
    fn zero_length_segment_jumps() {
        let spec = EnvelopeSpec::Points(PointEnvelope {
            points: vec![EnvelopePoint::new(0.0, 0.0), EnvelopePoint::new(0.0, 0.7)],
            sustain_point: 2,
            release: 1.0,
        });
        let mut env = Envelope::new(&spec, SR).unwrap();
        env.step(true);
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.position(), 0.7);
    }

    #[test]
    fn single_point_envelope() {
        let spec = EnvelopeSpec::Points(PointEnvelope {
            points: vec![EnvelopePoint::new(0.0, 0.4)],
            sustain_point: 1,
            release: 1.0,
        });
        let env = Envelope::new(&spec, SR).unwrap();
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.position(), 0.4);
    }

    #[test]
    fn flat_envelope_holds_level() {
        let mut env = Envelope::new(&EnvelopeSpec::flat(0.3, 0.01), SR).unwrap();
        for _ in 0..50 {
            env.step(true);
        }
        assert_eq!(env.state(), EnvelopeState::Sustain);
        assert_eq!(env.position(), 0.3);
    }

    #[test]
    fn sample_rate_change_during_release() {
        let mut env = Envelope::new(&adsr(1000.0, 1000.0, 1.0, 1.0), SR).unwrap();
        for _ in 0..5 {
            env.step(true);
        }
        env.step(false);
        env.set_sample_rate(100.0);
        let mut steps = 0;
        while !env.is_stopped() {
            env.step(false);
            steps += 1;
        }
        // Full level at 1/s, 100 Hz: about 100 samples.
        assert!((95..=101).contains(&steps), "{steps}");
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert_eq!(
            EnvelopeSpec::Points(PointEnvelope {
                points: vec![],
                sustain_point: 0,
                release: 1.0
            })
            .validate(),
            Err(EnvelopeError::NoPoints)
        );
        assert!(matches!(
            PointEnvelope {
                points: vec![EnvelopePoint::new(0.0, 0.0)],
                sustain_point: 2,
                release: 1.0
            }
            .validate(),
            Err(EnvelopeError::SustainOutOfRange { .. })
        ));
        assert!(matches!(
            adsr(0.0, 1.0, 0.5, 1.0).validate(),
            Err(EnvelopeError::InvalidRate { name: "attack", .. })
        ));
        assert_eq!(
            adsr(1.0, 1.0, 1.5, 1.0).validate(),
            Err(EnvelopeError::InvalidSustain(1.5))
        );
        assert!(Envelope::new(&adsr(1.0, 1.0, 0.5, f32::NAN), SR).is_err());
    }
}
