//! Sampler selection by configuration.
//!
//! `SamplerConfig` is the serializable description of a policy, `Sampler` the
//! validated closed set built from it.
//!
//! @version 0.1.0
//! @author `AutomataNexus` Development Team

use ndarray::{Array1, Array2, Array3};
use serde::{Deserialize, Serialize};

use crate::beam::BeamCache;
use crate::contrastive::{ContrastiveConfig, ContrastiveSampler, ContrastiveState};
use crate::decode::{SelectionPolicy, StepContext};
use crate::error::{SamplerError, SamplerResult};
use crate::greedy::GreedySampler;
use crate::next::NextTokenFn;
use crate::top_p::{TopPConfig, TopPSampler};

// =============================================================================
// SamplerConfig
// =============================================================================

/// Serializable sampler description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SamplerConfig {
    /// Argmax decoding.
    Greedy,
    /// Nucleus sampling.
    TopP(TopPConfig),
    /// Contrastive search.
    Contrastive(ContrastiveConfig),
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig::TopP(TopPConfig::default())
    }
}

impl SamplerConfig {
    /// Policy name as used in serialized configs.
    pub fn name(&self) -> &'static str {
        match self {
            SamplerConfig::Greedy => "greedy",
            SamplerConfig::TopP(_) => "top_p",
            SamplerConfig::Contrastive(_) => "contrastive",
        }
    }
}

// =============================================================================
// Sampler
// =============================================================================

/// Any of the available selection policies.
#[derive(Debug, Clone)]
pub enum Sampler {
    /// Argmax decoding.
    Greedy(GreedySampler),
    /// Nucleus sampling.
    TopP(TopPSampler),
    /// Contrastive search.
    Contrastive(ContrastiveSampler),
}

/// Per-call state of a [`Sampler`].
#[derive(Debug, Clone)]
pub enum SamplerState {
    /// Greedy and top-p keep nothing between steps.
    Stateless,
    /// Carried contrastive logits and hidden states.
    Contrastive(ContrastiveState),
}

impl Sampler {
    /// Validates `config` and builds the matching policy.
    pub fn from_config(config: SamplerConfig) -> SamplerResult<Self> {
        Ok(match config {
            SamplerConfig::Greedy => Sampler::Greedy(GreedySampler::new()),
            SamplerConfig::TopP(config) => Sampler::TopP(TopPSampler::new(config)?),
            SamplerConfig::Contrastive(config) => {
                Sampler::Contrastive(ContrastiveSampler::new(config)?)
            }
        })
    }

    /// Serializable description of this sampler.
    pub fn config(&self) -> SamplerConfig {
        match self {
            Sampler::Greedy(_) => SamplerConfig::Greedy,
            Sampler::TopP(sampler) => SamplerConfig::TopP(sampler.config().clone()),
            Sampler::Contrastive(sampler) => SamplerConfig::Contrastive(sampler.config().clone()),
        }
    }
}

impl<C: BeamCache> SelectionPolicy<C> for Sampler {
    type State = SamplerState;

    fn begin<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        prompt: &Array2<u32>,
        cache: C,
        index: usize,
        hidden_states: Option<Array3<f32>>,
    ) -> SamplerResult<(SamplerState, C)> {
        match self {
            Sampler::Greedy(_) | Sampler::TopP(_) => Ok((SamplerState::Stateless, cache)),
            Sampler::Contrastive(sampler) => {
                let (state, cache) = sampler.begin(next, prompt, cache, index, hidden_states)?;
                Ok((SamplerState::Contrastive(state), cache))
            }
        }
    }

    fn select<N: NextTokenFn<C>>(
        &mut self,
        next: &mut N,
        state: &mut SamplerState,
        ctx: &StepContext<'_>,
        cache: C,
    ) -> SamplerResult<(Array1<u32>, C)> {
        match (self, state) {
            (Sampler::Greedy(sampler), SamplerState::Stateless) => {
                sampler.select(next, &mut (), ctx, cache)
            }
            (Sampler::TopP(sampler), SamplerState::Stateless) => {
                sampler.select(next, &mut (), ctx, cache)
            }
            (Sampler::Contrastive(sampler), SamplerState::Contrastive(state)) => {
                sampler.select(next, state, ctx, cache)
            }
            _ => Err(SamplerError::InvalidInput(
                "sampler state does not belong to this sampler".to_string(),
            )),
        }
    }
}

impl From<GreedySampler> for Sampler {
    fn from(sampler: GreedySampler) -> Self {
        Sampler::Greedy(sampler)
    }
}

impl From<TopPSampler> for Sampler {
    fn from(sampler: TopPSampler) -> Self {
        Sampler::TopP(sampler)
    }
}

impl From<ContrastiveSampler> for Sampler {
    fn from(sampler: ContrastiveSampler) -> Self {
        Sampler::Contrastive(sampler)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::SampleOptions;
    use crate::next::StepOutput;

    #[test]
    fn test_config_json_tags() {
        let config: SamplerConfig =
            serde_json::from_str(r#"{"type": "top_p", "p": 0.9, "seed": 1}"#).unwrap();
        assert_eq!(config, SamplerConfig::TopP(TopPConfig::new(0.9).with_seed(1)));
        assert_eq!(config.name(), "top_p");

        let greedy: SamplerConfig = serde_json::from_str(r#"{"type": "greedy"}"#).unwrap();
        assert_eq!(greedy, SamplerConfig::Greedy);

        let json = serde_json::to_string(&SamplerConfig::Contrastive(ContrastiveConfig::new(3, 0.4)))
            .unwrap();
        assert!(json.contains(r#""type":"contrastive""#));
    }

    #[test]
    fn test_from_config_validates() {
        assert!(Sampler::from_config(SamplerConfig::TopP(TopPConfig::new(2.0))).is_err());
        assert!(Sampler::from_config(SamplerConfig::Contrastive(ContrastiveConfig::new(0, 0.5))).is_err());

        let sampler = Sampler::from_config(SamplerConfig::Contrastive(ContrastiveConfig::new(2, 0.1)))
            .unwrap();
        assert_eq!(sampler.config(), SamplerConfig::Contrastive(ContrastiveConfig::new(2, 0.1)));
    }

    #[test]
    fn test_every_variant_decodes() {
        let next = |prompt: &Array2<u32>, cache: (), _index: usize| -> SamplerResult<StepOutput<()>> {
            let batch = prompt.nrows();
            let mut logits = Array2::zeros((batch, 5));
            logits.column_mut(3).fill(1e9);
            Ok(StepOutput::new(logits, Array2::ones((batch, 2)), cache))
        };
        let configs = [
            SamplerConfig::Greedy,
            SamplerConfig::TopP(TopPConfig::new(0.5).with_seed(0)),
            SamplerConfig::Contrastive(ContrastiveConfig::new(2, 0.0)),
        ];
        for config in configs {
            let mut sampler = Sampler::from_config(config).unwrap();
            let output = sampler
                .sample(next, Array2::zeros((2, 4)), (), SampleOptions::new())
                .unwrap();
            assert!(output.iter().all(|&t| t == 3));
        }
    }
}
