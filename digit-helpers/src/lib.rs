use ndarray::{NdFloat, ScalarOperand};
use num_traits::{FromPrimitive, NumCast};
use rand::distr::uniform::SampleUniform;

use std::iter::Sum;

// Include submodules
mod common;
mod histogram;

// Re-export types from submodules
pub use common::{softmax, Probabilities, ProbabilityError, NORMALIZATION_TOLERANCE};
pub use histogram::Histogram;

/// Number of digit classes an MNIST classifier scores.
pub const DIGIT_CLASSES: usize = 10;

pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Sum
    + SampleUniform
    + ScalarOperand
    + std::marker::Unpin
{
    fn cast<T: NumCast>(x: T) -> Option<Self> {
        NumCast::from(x)
    }
}

impl Float for f32 {}

impl Float for f64 {}
