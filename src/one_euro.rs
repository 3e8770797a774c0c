//! One-Euro adaptive low-pass filters.
//!
//! Every filter keeps two low-pass stages: one on the estimated derivative
//! of the signal, one on the signal itself. The cutoff of the second stage
//! grows with the filtered speed, so slow jitter is smoothed hard while fast
//! motion goes through with little lag.
//!
//! Invalid parameters are only reported through `log::warn!`; filters keep
//! running with whatever they were given.

use nalgebra as na;

use crate::config::OneEuroParams;
use crate::Float;

/// `α = 1 / (1 + τ / Te)` with `τ = 1 / (2π·cutoff)` and `Te = 1 / freq`.
#[inline]
pub fn smoothing_factor<F: Float>(freq: F, cutoff: F) -> F {
    let te = F::one() / freq;
    let tau = F::one() / ((F::one() + F::one()) * F::PI() * cutoff);

    F::one() / (F::one() + tau / te)
}

fn check_positive<F: Float>(name: &str, value: F) {
    if value <= F::zero() {
        log::warn!("{} should be >0, got {:?}", name, value);
    }
}

#[derive(Debug, Clone)]
pub struct LowPassFilter<F> {
    alpha: F,
    raw: F,
    value: F,
    initialized: bool,
}

impl<F: Float> LowPassFilter<F> {
    pub fn new(alpha: F) -> Self {
        let mut filter = Self {
            alpha,
            raw: F::zero(),
            value: F::zero(),
            initialized: false,
        };
        filter.set_alpha(alpha);
        filter
    }

    pub fn set_alpha(&mut self, alpha: F) {
        if alpha <= F::zero() || alpha > F::one() {
            log::warn!("alpha should be in (0.0, 1.0], got {:?}", alpha);
        }

        self.alpha = alpha;
    }

    /// First call passes `value` through and initializes the filter.
    pub fn filter(&mut self, value: F) -> F {
        self.value = if self.initialized {
            self.value + self.alpha * (value - self.value)
        } else {
            self.initialized = true;
            value
        };
        self.raw = value;

        self.value
    }

    #[inline]
    pub fn filter_with_alpha(&mut self, value: F, alpha: F) -> F {
        self.set_alpha(alpha);
        self.filter(value)
    }

    #[inline]
    pub fn last_raw(&self) -> Option<F> {
        self.initialized.then(|| self.raw)
    }

    #[inline]
    pub fn last_value(&self) -> Option<F> {
        self.initialized.then(|| self.value)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn reset(&mut self) {
        self.raw = F::zero();
        self.value = F::zero();
        self.initialized = false;
    }
}

/// Sampling frequency tracker shared by the filter variants.
#[derive(Debug, Clone)]
struct SampleClock<F> {
    freq: F,
    last_time: Option<F>,
}

impl<F: Float> SampleClock<F> {
    fn new(freq: F) -> Self {
        Self {
            freq,
            last_time: None,
        }
    }

    // equal timestamps keep the previous frequency
    fn tick(&mut self, timestamp: Option<F>) {
        if let (Some(last), Some(now)) = (self.last_time, timestamp) {
            if now > last {
                self.freq = F::one() / (now - last);
            }
        }

        if timestamp.is_some() {
            self.last_time = timestamp;
        }
    }

    #[inline]
    fn alpha(&self, cutoff: F) -> F {
        smoothing_factor(self.freq, cutoff)
    }
}

/// Cutoff parameters shared by the filter variants.
#[derive(Debug, Clone)]
struct Cutoffs<F> {
    mincutoff: F,
    beta: F,
    dcutoff: F,
}

impl<F: Float> Cutoffs<F> {
    fn new(mincutoff: F, beta: F, dcutoff: F) -> Self {
        check_positive("mincutoff", mincutoff);
        check_positive("dcutoff", dcutoff);

        Self {
            mincutoff,
            beta,
            dcutoff,
        }
    }

    #[inline]
    fn adaptive(&self, speed: F) -> F {
        self.mincutoff + self.beta * speed.abs()
    }
}

macro_rules! impl_params {
    (@body $f:ty) => {
        #[inline]
        pub fn frequency(&self) -> $f {
            self.clock.freq
        }

        pub fn set_frequency(&mut self, freq: $f) {
            check_positive("freq", freq);
            self.clock.freq = freq;
        }

        pub fn set_mincutoff(&mut self, mincutoff: $f) {
            check_positive("mincutoff", mincutoff);
            self.cutoffs.mincutoff = mincutoff;
        }

        pub fn set_beta(&mut self, beta: $f) {
            self.cutoffs.beta = beta;
        }

        pub fn set_dcutoff(&mut self, dcutoff: $f) {
            check_positive("dcutoff", dcutoff);
            self.cutoffs.dcutoff = dcutoff;
        }

        pub fn set_params(&mut self, mincutoff: $f, beta: $f) {
            self.set_mincutoff(mincutoff);
            self.set_beta(beta);
        }
    };
    ($name:ident<$f:ident>) => {
        impl<$f: Float> $name<$f> {
            impl_params!(@body $f);
        }
    };
    ($name:ident, $f:ty) => {
        impl $name {
            impl_params!(@body $f);
        }
    };
}

/// Scalar One-Euro filter.
#[derive(Debug, Clone)]
pub struct OneEuroFilter<F> {
    clock: SampleClock<F>,
    cutoffs: Cutoffs<F>,
    x: LowPassFilter<F>,
    dx: LowPassFilter<F>,
}

impl<F: Float> OneEuroFilter<F> {
    pub fn new(freq: F, mincutoff: F, beta: F, dcutoff: F) -> Self {
        check_positive("freq", freq);

        Self {
            clock: SampleClock::new(freq),
            cutoffs: Cutoffs::new(mincutoff, beta, dcutoff),
            x: LowPassFilter::new(F::one()),
            dx: LowPassFilter::new(F::one()),
        }
    }

    /// Filters `value` observed at `timestamp` (seconds). Without timestamps
    /// the configured frequency is used.
    pub fn filter(&mut self, value: F, timestamp: Option<F>) -> F {
        self.clock.tick(timestamp);

        let dx = match self.x.last_raw() {
            Some(prev) => (value - prev) * self.clock.freq,
            None => F::zero(),
        };

        let edx = self
            .dx
            .filter_with_alpha(dx, self.clock.alpha(self.cutoffs.dcutoff));
        let cutoff = self.cutoffs.adaptive(edx);

        self.x.filter_with_alpha(value, self.clock.alpha(cutoff))
    }

    #[inline]
    pub fn last_value(&self) -> Option<F> {
        self.x.last_value()
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.dx.reset();
        self.clock.last_time = None;
    }
}

impl_params!(OneEuroFilter<F>);

/// Two-axis One-Euro filter. Both axes share one adaptive cutoff driven by
/// the norm of the 2-D speed, so a point moving diagonally is not smoothed
/// differently per axis.
#[derive(Debug, Clone)]
pub struct OneEuroFilterXY<F> {
    clock: SampleClock<F>,
    cutoffs: Cutoffs<F>,
    x: LowPassFilter<F>,
    y: LowPassFilter<F>,
    dx: LowPassFilter<F>,
    dy: LowPassFilter<F>,
}

impl<F: Float> OneEuroFilterXY<F> {
    pub fn new(freq: F, mincutoff: F, beta: F, dcutoff: F) -> Self {
        check_positive("freq", freq);

        Self {
            clock: SampleClock::new(freq),
            cutoffs: Cutoffs::new(mincutoff, beta, dcutoff),
            x: LowPassFilter::new(F::one()),
            y: LowPassFilter::new(F::one()),
            dx: LowPassFilter::new(F::one()),
            dy: LowPassFilter::new(F::one()),
        }
    }

    pub fn filter(&mut self, value: na::Vector2<F>, timestamp: Option<F>) -> na::Vector2<F> {
        self.clock.tick(timestamp);

        let freq = self.clock.freq;
        let (dx, dy) = match (self.x.last_raw(), self.y.last_raw()) {
            (Some(px), Some(py)) => ((value[0] - px) * freq, (value[1] - py) * freq),
            _ => (F::zero(), F::zero()),
        };

        let da = self.clock.alpha(self.cutoffs.dcutoff);
        let edx = self.dx.filter_with_alpha(dx, da);
        let edy = self.dy.filter_with_alpha(dy, da);

        let a = self.clock.alpha(self.cutoffs.adaptive(edx.hypot(edy)));

        na::Vector2::new(
            self.x.filter_with_alpha(value[0], a),
            self.y.filter_with_alpha(value[1], a),
        )
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.dx.reset();
        self.dy.reset();
        self.clock.last_time = None;
    }
}

impl_params!(OneEuroFilterXY<F>);

/// Spherical interpolation along the shortest arc. Falls back to `to` when
/// the two rotations are too close for slerp to be well defined.
#[inline]
fn slerp(
    from: &na::UnitQuaternion<f32>,
    to: &na::UnitQuaternion<f32>,
    t: f32,
) -> na::UnitQuaternion<f32> {
    from.try_slerp(to, t, f32::EPSILON).unwrap_or(*to)
}

/// One-Euro filter over orientations.
///
/// The speed is the rotation still separating the input from the last
/// filtered orientation, with its angle scaled by the sampling frequency.
/// It is smoothed with slerp and its angle drives the adaptive cutoff, so a
/// held step keeps the cutoff high until the output has caught up. Angles
/// past π wrap like any axis-angle rotation. The orientation itself is also
/// smoothed with slerp.
#[derive(Debug, Clone)]
pub struct OneEuroFilterQuat {
    clock: SampleClock<f32>,
    cutoffs: Cutoffs<f32>,
    value: Option<na::UnitQuaternion<f32>>,
    speed: na::UnitQuaternion<f32>,
}

impl OneEuroFilterQuat {
    pub fn new(freq: f32, mincutoff: f32, beta: f32, dcutoff: f32) -> Self {
        check_positive("freq", freq);

        Self {
            clock: SampleClock::new(freq),
            cutoffs: Cutoffs::new(mincutoff, beta, dcutoff),
            value: None,
            speed: na::UnitQuaternion::identity(),
        }
    }

    pub fn filter(
        &mut self,
        rotation: na::UnitQuaternion<f32>,
        timestamp: Option<f32>,
    ) -> na::UnitQuaternion<f32> {
        self.clock.tick(timestamp);

        let value = match self.value {
            Some(value) => value,
            None => {
                self.value = Some(rotation);
                self.speed = na::UnitQuaternion::identity();

                return rotation;
            }
        };

        // R_new = dR * R_prev
        let delta = rotation * value.inverse();
        let speed = match delta.axis_angle() {
            Some((axis, angle)) => {
                na::UnitQuaternion::from_axis_angle(&axis, angle * self.clock.freq)
            }
            None => na::UnitQuaternion::identity(),
        };

        self.speed = slerp(&self.speed, &speed, self.clock.alpha(self.cutoffs.dcutoff));

        let a = self.clock.alpha(self.cutoffs.adaptive(self.speed.angle()));
        let filtered = na::UnitQuaternion::new_normalize(slerp(&value, &rotation, a).into_inner());

        self.value = Some(filtered);

        filtered
    }

    /// Smoothed angular speed, as a rotation whose angle is in rad/s.
    #[inline]
    pub fn speed(&self) -> na::UnitQuaternion<f32> {
        self.speed
    }

    pub fn reset(&mut self) {
        self.value = None;
        self.speed = na::UnitQuaternion::identity();
        self.clock.last_time = None;
    }
}

impl_params!(OneEuroFilterQuat, f32);

impl From<(f32, OneEuroParams)> for OneEuroFilter<f32> {
    fn from((freq, p): (f32, OneEuroParams)) -> Self {
        Self::new(freq, p.mincutoff, p.beta, p.dcutoff)
    }
}

impl From<(f32, OneEuroParams)> for OneEuroFilterXY<f32> {
    fn from((freq, p): (f32, OneEuroParams)) -> Self {
        Self::new(freq, p.mincutoff, p.beta, p.dcutoff)
    }
}

impl From<(f32, OneEuroParams)> for OneEuroFilterQuat {
    fn from((freq, p): (f32, OneEuroParams)) -> Self {
        Self::new(freq, p.mincutoff, p.beta, p.dcutoff)
    }
}
