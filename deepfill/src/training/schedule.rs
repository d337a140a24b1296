//! Update schedule of the adversarial training loop.

use super::trainer::Network;

/// One step of the per-iteration parameter update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePhase {
    ZeroDiscriminatorGrads,
    DiscriminatorBackward,
    ZeroGeneratorGrads,
    GeneratorBackward,
    GeneratorStep,
    DiscriminatorStep,
}

impl UpdatePhase {
    /// The network a phase acts on.
    pub const fn network(self) -> Network {
        match self {
            Self::ZeroDiscriminatorGrads | Self::DiscriminatorBackward | Self::DiscriminatorStep => {
                Network::Discriminator
            }
            Self::ZeroGeneratorGrads | Self::GeneratorBackward | Self::GeneratorStep => {
                Network::Generator
            }
        }
    }
}

const CRITIC_ONLY: [UpdatePhase; 3] = [
    UpdatePhase::ZeroDiscriminatorGrads,
    UpdatePhase::DiscriminatorBackward,
    UpdatePhase::DiscriminatorStep,
];

// The generator step lands before the discriminator step.
const CRITIC_AND_GENERATOR: [UpdatePhase; 6] = [
    UpdatePhase::ZeroDiscriminatorGrads,
    UpdatePhase::DiscriminatorBackward,
    UpdatePhase::ZeroGeneratorGrads,
    UpdatePhase::GeneratorBackward,
    UpdatePhase::GeneratorStep,
    UpdatePhase::DiscriminatorStep,
];

/// The phases of one iteration, in execution order.
pub const fn update_phases(update_generator: bool) -> &'static [UpdatePhase] {
    if update_generator {
        &CRITIC_AND_GENERATOR
    } else {
        &CRITIC_ONLY
    }
}

/// Whether `iteration` updates the generator.
pub const fn updates_generator(iteration: usize, n_critic: usize) -> bool {
    n_critic != 0 && iteration % n_critic == 0
}

/// Whether a side effect with period `every` fires at `iteration`.
pub const fn is_due(iteration: usize, every: usize) -> bool {
    every != 0 && iteration % every == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_schedule() {
        let updates: Vec<usize> = (1..=10).filter(|&i| updates_generator(i, 2)).collect();
        assert_eq!(updates, vec![2, 4, 6, 8, 10]);

        let updates: Vec<usize> = (1..=12).filter(|&i| updates_generator(i, 5)).collect();
        assert_eq!(updates, vec![5, 10]);
    }

    #[test]
    fn test_generator_step_precedes_discriminator_step() {
        let phases = update_phases(true);
        let position = |phase| phases.iter().position(|p| *p == phase).unwrap();

        assert!(position(UpdatePhase::DiscriminatorBackward) < position(UpdatePhase::GeneratorBackward));
        assert!(position(UpdatePhase::GeneratorStep) < position(UpdatePhase::DiscriminatorStep));
        assert_eq!(phases.last(), Some(&UpdatePhase::DiscriminatorStep));
    }

    #[test]
    fn test_critic_only_iteration_leaves_generator_alone() {
        assert!(update_phases(false)
            .iter()
            .all(|phase| phase.network() == Network::Discriminator));
    }

    #[test]
    fn test_is_due() {
        assert!(is_due(10, 5));
        assert!(!is_due(11, 5));
        assert!(!is_due(10, 0));
    }
}
