use ndarray::{Array1, ArrayView1};
use crate::Float;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// How far the sum of a distribution may drift from 1.
pub const NORMALIZATION_TOLERANCE: f64 = 1e-4;

/// Errors that can occur when building a probability distribution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbabilityError {
    /// A distribution needs at least one class
    #[error("cannot build a distribution from an empty vector")]
    Empty,
    /// NaN or infinite score (usually a broken model artifact)
    #[error("value for class {index} is not finite")]
    NonFinite { index: usize },
    #[error("value for class {index} is negative")]
    Negative { index: usize },
    #[error("values sum to {sum}, expected 1")]
    NotNormalized { sum: f64 },
    #[error("weights have zero total mass")]
    ZeroMass,
}

/// A discrete probability distribution over class indices.
///
/// Every value is finite and non-negative and the values sum to 1 (within
/// [`NORMALIZATION_TOLERANCE`]). The only ways to build one are [`softmax`],
/// [`Probabilities::try_from_vec`] and [`Probabilities::from_weights`], all of
/// which enforce this.
///
/// F: The float type of the scores (e.g., f32, f64).
#[derive(Debug, Clone, PartialEq)]
pub struct Probabilities<F: Float> {
    values: Array1<F>,
}

/// Turns raw model outputs (logits) into a probability distribution.
///
/// `softmax(x_i) = exp(x_i - max) / sum_j(exp(x_j - max))`
///
/// Subtracting the maximum keeps `exp` from overflowing on large logits.
///
/// # Errors
///
/// Returns `ProbabilityError::Empty` for an empty input and
/// `ProbabilityError::NonFinite` if any logit is NaN or infinite.
pub fn softmax<F: Float>(logits: ArrayView1<F>) -> Result<Probabilities<F>, ProbabilityError> {
    if logits.is_empty() {
        return Err(ProbabilityError::Empty);
    }
    if let Some(index) = logits.iter().position(|v| !v.is_finite()) {
        return Err(ProbabilityError::NonFinite { index });
    }

    let max = logits.iter().copied().fold(F::neg_infinity(), F::max);
    let exp = logits.mapv(|v| (v - max).exp());
    // The max element contributes exp(0) = 1, so the total is at least 1.
    let total = exp.sum();

    Ok(Probabilities { values: exp / total })
}

impl<F: Float> Probabilities<F> {
    /// Same as [`softmax`].
    pub fn from_logits(logits: ArrayView1<F>) -> Result<Self, ProbabilityError> {
        softmax(logits)
    }

    /// Wraps values that are already a distribution, e.g. the output of a
    /// network whose last layer is a softmax.
    ///
    /// # Errors
    ///
    /// Fails if the vector is empty, holds a non-finite or negative value, or
    /// does not sum to 1.
    pub fn try_from_vec(values: Vec<F>) -> Result<Self, ProbabilityError> {
        let values = Array1::from(values);
        check_entries(values.view())?;

        let sum = values.sum();
        let tolerance = F::cast(NORMALIZATION_TOLERANCE).unwrap_or_else(F::epsilon);
        if (sum - F::one()).abs() > tolerance {
            return Err(ProbabilityError::NotNormalized {
                sum: sum.to_f64().unwrap_or(f64::NAN),
            });
        }

        Ok(Self { values })
    }

    /// Normalizes non-negative weights so that they sum to 1.
    ///
    /// # Errors
    ///
    /// Fails like [`Probabilities::try_from_vec`] on bad entries, and with
    /// `ProbabilityError::ZeroMass` when every weight is zero.
    pub fn from_weights(weights: ArrayView1<F>) -> Result<Self, ProbabilityError> {
        check_entries(weights)?;

        let total = weights.sum();
        if total <= F::zero() {
            return Err(ProbabilityError::ZeroMass);
        }

        Ok(Self {
            values: weights.mapv(|w| w / total),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false, a distribution has at least one class.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Probability of `class`, `None` if the index is out of range.
    pub fn get(&self, class: usize) -> Option<F> {
        self.values.get(class).copied()
    }

    pub fn values(&self) -> ArrayView1<'_, F> {
        self.values.view()
    }

    pub fn to_vec(&self) -> Vec<F> {
        self.values.to_vec()
    }

    /// The most likely class and its probability. Ties go to the lowest index.
    pub fn top(&self) -> (usize, F) {
        let mut best = (0, self.values[0]);
        for (class, &p) in self.values.iter().enumerate().skip(1) {
            if p > best.1 {
                best = (class, p);
            }
        }
        best
    }

    /// All classes ordered from most to least likely.
    pub fn ranked(&self) -> Vec<(usize, F)> {
        let mut ranked: Vec<(usize, F)> = self.values.iter().copied().enumerate().collect();
        // Values are finite, so `partial_cmp` never actually fails here.
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        ranked
    }
}

impl<F: Float> Display for Probabilities<F> {
    /// Formats like a printed numpy vector: `[0.0123 0.9001 ...]`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, p) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:.4}", p)?;
        }
        write!(f, "]")
    }
}

fn check_entries<F: Float>(values: ArrayView1<F>) -> Result<(), ProbabilityError> {
    if values.is_empty() {
        return Err(ProbabilityError::Empty);
    }
    for (index, v) in values.iter().enumerate() {
        if !v.is_finite() {
            return Err(ProbabilityError::NonFinite { index });
        }
        if *v < F::zero() {
            return Err(ProbabilityError::Negative { index });
        }
    }
    Ok(())
}
