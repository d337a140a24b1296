//! Named loss terms and their composition into the two optimized losses.

use std::{collections::BTreeMap, fmt};

use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use crate::{
    config::TrainingConfig,
    error::{DeepFillError, DeepFillResult, EvalError},
};

/// A loss term reported by the trainer or composed by the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LossTerm {
    /// Discounted reconstruction loss inside the holes.
    L1,
    /// Reconstruction loss on the known context.
    Ae,
    /// Generator adversarial loss.
    WganG,
    /// Critic adversarial loss.
    WganD,
    /// Critic gradient penalty.
    WganGp,
    /// Composite generator loss.
    G,
    /// Composite discriminator loss.
    D,
}

impl LossTerm {
    /// Terms in the order they are logged.
    pub const LOGGED: [Self; 7] = [
        Self::L1,
        Self::Ae,
        Self::WganG,
        Self::WganD,
        Self::WganGp,
        Self::G,
        Self::D,
    ];

    /// The name used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::Ae => "ae",
            Self::WganG => "wgan_g",
            Self::WganD => "wgan_d",
            Self::WganGp => "wgan_gp",
            Self::G => "g",
            Self::D => "d",
        }
    }
}

impl fmt::Display for LossTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights of the composite losses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossWeights {
    pub l1: f64,
    pub ae: f64,
    pub gan: f64,
    pub gradient_penalty: f64,
}

impl LossWeights {
    pub const fn from_training(config: &TrainingConfig) -> Self {
        Self {
            l1: config.l1_loss_alpha,
            ae: config.ae_loss_alpha,
            gan: config.gan_loss_alpha,
            gradient_penalty: config.wgan_gp_lambda,
        }
    }
}

/// The loss terms of one evaluation.
///
/// Every term is a rank-1 tensor with one value per replica until
/// [`LossBundle::reduce_replicas`] is applied, and exactly one value after.
#[derive(Debug, Clone)]
pub struct LossBundle<B: Backend> {
    terms: BTreeMap<LossTerm, Tensor<B, 1>>,
}

impl<B: Backend> Default for LossBundle<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> LossBundle<B> {
    pub const fn new() -> Self {
        Self {
            terms: BTreeMap::new(),
        }
    }

    /// Adds or replaces a term.
    pub fn insert(&mut self, term: LossTerm, value: Tensor<B, 1>) {
        self.terms.insert(term, value);
    }

    /// Builder-style [`LossBundle::insert`].
    #[must_use]
    pub fn with(mut self, term: LossTerm, value: Tensor<B, 1>) -> Self {
        self.insert(term, value);
        self
    }

    pub fn get(&self, term: LossTerm) -> Option<&Tensor<B, 1>> {
        self.terms.get(&term)
    }

    pub fn contains(&self, term: LossTerm) -> bool {
        self.terms.contains_key(&term)
    }

    pub fn terms(&self) -> impl Iterator<Item = LossTerm> + '_ {
        self.terms.keys().copied()
    }

    /// Averages every multi-replica term to a single value.
    #[must_use]
    pub fn reduce_replicas(self) -> Self {
        Self {
            terms: self
                .terms
                .into_iter()
                .map(|(term, value)| (term, burn_extra_ops::reduce_replicas(value)))
                .collect(),
        }
    }

    fn require(&self, term: LossTerm) -> DeepFillResult<Tensor<B, 1>> {
        self.get(term)
            .cloned()
            .ok_or(DeepFillError::MissingLossTerm {
                term: term.as_str(),
            })
    }

    /// `d = wgan_d + gradient_penalty * wgan_gp`
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::MissingLossTerm)` if a component is absent.
    pub fn discriminator_loss(&self, weights: &LossWeights) -> DeepFillResult<Tensor<B, 1>> {
        Ok(self.require(LossTerm::WganD)?
            + self
                .require(LossTerm::WganGp)?
                .mul_scalar(weights.gradient_penalty))
    }

    /// `g = l1 * l1_weight + ae * ae_weight + wgan_g * gan_weight`
    ///
    /// # Errors
    ///
    /// Returns `Err(DeepFillError::MissingLossTerm)` if a component is absent.
    pub fn generator_loss(&self, weights: &LossWeights) -> DeepFillResult<Tensor<B, 1>> {
        Ok(self.require(LossTerm::L1)?.mul_scalar(weights.l1)
            + self.require(LossTerm::Ae)?.mul_scalar(weights.ae)
            + self.require(LossTerm::WganG)?.mul_scalar(weights.gan))
    }

    /// Host value of a term, averaged over replicas. Absent terms read as 0.
    pub fn value(&self, term: LossTerm) -> f64 {
        self.get(term).map_or(0.0, |value| {
            value.clone().mean().into_scalar().elem::<f64>()
        })
    }

    /// Fails on the first term holding NaN or infinity.
    ///
    /// # Errors
    ///
    /// Returns `Err(EvalError::NonFinite)` naming the offending term.
    pub fn check_finite(&self) -> Result<(), EvalError> {
        for term in self.terms() {
            let value = self.value(term);
            if !value.is_finite() {
                return Err(EvalError::NonFinite {
                    term: term.as_str(),
                    value,
                });
            }
        }
        Ok(())
    }
}
