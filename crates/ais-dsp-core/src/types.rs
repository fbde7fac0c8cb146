//! Core types for AIS DSP processing.

#[allow(unused_imports)]
use micromath::F32Ext;

/// Complex baseband sample.
///
/// In-phase (I) and Quadrature (Q) components are the real and imaginary
/// parts of the signal delivered by the capture source (`fc32` layout).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct IqSample {
    /// In-phase component (real part)
    pub i: f32,
    /// Quadrature component (imaginary part)
    pub q: f32,
}

impl IqSample {
    /// Zero sample.
    pub const ZERO: Self = Self { i: 0.0, q: 0.0 };

    /// Create a new IQ sample.
    #[must_use]
    #[inline]
    pub const fn new(i: f32, q: f32) -> Self {
        Self { i, q }
    }

    /// Unit-magnitude sample at the given phase in radians, `e^(j*phase)`.
    #[must_use]
    #[inline]
    pub fn from_phase(phase: f32) -> Self {
        Self {
            i: phase.cos(),
            q: phase.sin(),
        }
    }

    /// Magnitude squared (avoids sqrt for comparisons and power estimates).
    #[must_use]
    #[inline]
    pub fn magnitude_squared(&self) -> f32 {
        self.i * self.i + self.q * self.q
    }

    /// Magnitude (absolute value).
    #[must_use]
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    /// Phase angle in radians (-π to π).
    #[must_use]
    #[inline]
    pub fn phase(&self) -> f32 {
        self.q.atan2(self.i)
    }

    /// Complex multiply with another sample.
    #[must_use]
    #[inline]
    pub fn multiply(&self, other: Self) -> Self {
        Self {
            i: self.i * other.i - self.q * other.q,
            q: self.i * other.q + self.q * other.i,
        }
    }

    /// Complex conjugate (negate Q component).
    #[must_use]
    #[inline]
    pub const fn conjugate(&self) -> Self {
        Self {
            i: self.i,
            q: -self.q,
        }
    }

    /// Phase advance from `previous` to `self`, `arg(self * conj(previous))`.
    ///
    /// This is the per-sample instantaneous frequency in radians used by
    /// the quadrature discriminator.
    #[must_use]
    #[inline]
    pub fn phase_delta(&self, previous: Self) -> f32 {
        self.multiply(previous.conjugate()).phase()
    }

    /// Scale by a real factor.
    #[must_use]
    #[inline]
    pub fn scale(&self, factor: f32) -> Self {
        Self {
            i: self.i * factor,
            q: self.q * factor,
        }
    }
}

impl core::ops::Add for IqSample {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.i + other.i, self.q + other.q)
    }
}

impl core::ops::AddAssign for IqSample {
    fn add_assign(&mut self, other: Self) {
        self.i += other.i;
        self.q += other.q;
    }
}

impl core::ops::Sub for IqSample {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.i - other.i, self.q - other.q)
    }
}

impl core::ops::Mul<f32> for IqSample {
    type Output = Self;

    fn mul(self, factor: f32) -> Self {
        self.scale(factor)
    }
}

impl core::ops::Mul for IqSample {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        self.multiply(other)
    }
}

/// Per-channel demodulator health, sampled by observers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalMetrics {
    /// Smoothed input power (linear, relative to full scale).
    pub power: f32,
    /// Current recovered samples-per-symbol estimate.
    pub omega: f32,
    /// Current fractional timing phase, 0.0 to 1.0.
    pub mu: f32,
    /// Last timing error detector output.
    pub timing_error: f32,
}

impl SignalMetrics {
    /// Input power in dBFS.
    #[must_use]
    pub fn power_db(&self) -> f32 {
        10.0 * self.power.max(1e-12).log10()
    }
}
