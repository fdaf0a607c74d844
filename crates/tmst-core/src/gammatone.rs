//! Complex all-pole gammatone filter.
//!
//! A gammatone of order `n` is approximated by `n` cascaded complex one-pole
//! sections sharing the pole
//!
//! ```text
//! a = exp(-2*pi*b/fs) * exp(j*2*pi*fc/fs)
//! ```
//!
//! where `b` is the filter bandwidth parameter in Hz. Each stage computes
//! `y[n] = x[n] + a*y[n-1]`, so the filter is unconditionally stable for any
//! `b > 0`. The cascade output is complex (it only passes positive
//! frequencies); twice its real part is the real-valued channel signal with
//! unity gain at `fc`.

use core::f64::consts::PI;
use libm::{cos, exp, pow, sin, sqrt};

/// Maximum supported gammatone order.
pub const MAX_GAMMATONE_ORDER: usize = 8;

/// Gammatone bandwidth scale relative to the ERB of the center frequency.
pub const GAMMATONE_ERB_FACTOR: f64 = 1.019;

/// Complex gammatone filter state.
#[derive(Debug, Clone)]
pub struct GammatoneFilter {
    pole_re: f64,
    pole_im: f64,
    gain: f64,
    order: usize,
    state_re: [f64; MAX_GAMMATONE_ORDER],
    state_im: [f64; MAX_GAMMATONE_ORDER],
}

impl GammatoneFilter {
    /// Creates a gammatone filter.
    ///
    /// # Arguments
    ///
    /// * `center_hz` - Center frequency in Hz
    /// * `bandwidth_hz` - Bandwidth parameter `b` in Hz (typically 1.019 * ERB)
    /// * `order` - Number of cascaded stages, clamped to `1..=MAX_GAMMATONE_ORDER`
    /// * `sample_rate` - Sample rate in Hz
    pub fn new(center_hz: f64, bandwidth_hz: f64, order: usize, sample_rate: f64) -> Self {
        let order = order.clamp(1, MAX_GAMMATONE_ORDER);
        let radius = exp(-2.0 * PI * bandwidth_hz / sample_rate);
        let theta = 2.0 * PI * center_hz / sample_rate;

        Self {
            pole_re: radius * cos(theta),
            pole_im: radius * sin(theta),
            // Each stage has gain 1/(1 - r) at fc
            gain: pow(1.0 - radius, order as f64),
            order,
            state_re: [0.0; MAX_GAMMATONE_ORDER],
            state_im: [0.0; MAX_GAMMATONE_ORDER],
        }
    }

    /// Filter order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Pole radius `exp(-2*pi*b/fs)`.
    pub fn pole_radius(&self) -> f64 {
        sqrt(self.pole_re * self.pole_re + self.pole_im * self.pole_im)
    }

    /// Processes one real sample, returning the complex output `(re, im)`.
    #[inline]
    pub fn process_complex(&mut self, input: f64) -> (f64, f64) {
        let mut re = input * self.gain;
        let mut im = 0.0;

        for stage in 0..self.order {
            let prev_re = self.state_re[stage];
            let prev_im = self.state_im[stage];
            let y_re = re + self.pole_re * prev_re - self.pole_im * prev_im;
            let y_im = im + self.pole_re * prev_im + self.pole_im * prev_re;
            self.state_re[stage] = y_re;
            self.state_im[stage] = y_im;
            re = y_re;
            im = y_im;
        }

        (re, im)
    }

    /// Processes one real sample, returning the real channel output.
    #[inline]
    pub fn process(&mut self, input: f64) -> f64 {
        2.0 * self.process_complex(input).0
    }

    /// Clears all stage states.
    pub fn clear(&mut self) {
        self.state_re = [0.0; MAX_GAMMATONE_ORDER];
        self.state_im = [0.0; MAX_GAMMATONE_ORDER];
    }
}

/// Delay (in seconds) of the gammatone envelope peak: `(order - 1) / (2*pi*b)`.
///
/// Advancing a channel by this amount aligns the envelope maxima of all
/// channels for an impulse input.
pub fn gammatone_group_delay(bandwidth_hz: f64, order: usize) -> f64 {
    if bandwidth_hz <= 0.0 {
        return 0.0;
    }
    (order.max(1) - 1) as f64 / (2.0 * PI * bandwidth_hz)
}
