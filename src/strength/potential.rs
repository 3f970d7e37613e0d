use serde::Serialize;

/// Inputs of the potential and quality sub-scores that do not come from
/// engagement data. Each value is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PotentialInputs {
    pub genre_fit: f64,
    pub market_position: f64,
    pub demographic_appeal: f64,
}

impl PotentialInputs {
    pub fn clamped(self) -> Self {
        Self {
            genre_fit: self.genre_fit.clamp(0.0, 1.0),
            market_position: self.market_position.clamp(0.0, 1.0),
            demographic_appeal: self.demographic_appeal.clamp(0.0, 1.0),
        }
    }
}

/// Source of per-artist potential inputs.
pub trait PotentialModel: Send + Sync {
    fn inputs(&self, artist_id: &str) -> PotentialInputs;
}

/// Returns the same inputs for every artist.
#[derive(Debug, Clone)]
pub struct ConstantPotentialModel {
    inputs: PotentialInputs,
}

impl ConstantPotentialModel {
    pub const DEFAULT_GENRE_FIT: f64 = 0.8;
    pub const DEFAULT_MARKET_POSITION: f64 = 0.75;
    pub const DEFAULT_DEMOGRAPHIC_APPEAL: f64 = 0.7;

    pub fn new(genre_fit: f64, market_position: f64, demographic_appeal: f64) -> Self {
        Self {
            inputs: PotentialInputs {
                genre_fit,
                market_position,
                demographic_appeal,
            }
            .clamped(),
        }
    }
}

impl Default for ConstantPotentialModel {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_GENRE_FIT,
            Self::DEFAULT_MARKET_POSITION,
            Self::DEFAULT_DEMOGRAPHIC_APPEAL,
        )
    }
}

impl PotentialModel for ConstantPotentialModel {
    fn inputs(&self, _artist_id: &str) -> PotentialInputs {
        self.inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let inputs = ConstantPotentialModel::default().inputs("anyone");
        assert_eq!(inputs.genre_fit, 0.8);
        assert_eq!(inputs.market_position, 0.75);
        assert_eq!(inputs.demographic_appeal, 0.7);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let inputs = ConstantPotentialModel::new(1.5, -0.2, 0.4).inputs("a1");
        assert_eq!(inputs.genre_fit, 1.0);
        assert_eq!(inputs.market_position, 0.0);
        assert_eq!(inputs.demographic_appeal, 0.4);
    }
}
