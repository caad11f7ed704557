//! Random sampler for error injection

use rand::Rng;

use crate::traits::FaultSampler;

/// Draws from the thread-local generator.
///
/// `rand`'s standard `f64` distribution covers `[0, 1)`, so a sample is
/// never equal to 1.0 and an error rate of 1.0 rejects every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSampler;

impl ThreadRngSampler {
    pub fn new() -> Self {
        Self
    }
}

impl FaultSampler for ThreadRngSampler {
    fn sample(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}
