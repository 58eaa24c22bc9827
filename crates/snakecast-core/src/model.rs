// Availability model adapter.
//
// The pipeline only needs `predict_proba`; anything that can score a row
// of named features plugs in behind `DraftModel`.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ModelConfig;
use crate::error::DraftError;
use crate::features::FeatureMatrix;

/// Identity of a fitted model and the feature columns it consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelMetadata {
    pub name: String,
    pub data_number: String,
    pub model_number: String,
    pub description: String,
    /// Column names, in the order the model expects them.
    pub features: Vec<String>,
}

impl ModelMetadata {
    /// Versioned identifier, e.g. `LogisticRegression_v01_v001`.
    pub fn version_name(&self) -> String {
        format!("{}_{}_{}", self.name, self.data_number, self.model_number)
    }
}

/// A probability model over feature rows.
pub trait DraftModel {
    fn metadata(&self) -> &ModelMetadata;

    /// Probability, per row, that the candidate is taken before the
    /// observer's comparison pick. Rows hold `metadata().features` in order.
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DraftError>;
}

// ---------------------------------------------------------------------------
// Logistic regression
// ---------------------------------------------------------------------------

/// A fitted logistic regression: `sigmoid(intercept + coefficients . x)`.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    metadata: ModelMetadata,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(metadata: ModelMetadata, coefficients: Vec<f64>, intercept: f64) -> Self {
        LogisticModel {
            metadata,
            coefficients,
            intercept,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        let metadata = ModelMetadata {
            name: config.name.clone(),
            data_number: config.data_number.clone(),
            model_number: config.model_number.clone(),
            description: config.description.clone(),
            features: config.features.clone(),
        };
        LogisticModel::new(metadata, config.coefficients.clone(), config.intercept)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl DraftModel for LogisticModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, DraftError> {
        if self.coefficients.len() != self.metadata.features.len() {
            return Err(DraftError::PredictionUnavailable {
                reason: format!(
                    "model has {} coefficients for {} features",
                    self.coefficients.len(),
                    self.metadata.features.len()
                ),
            });
        }
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != self.coefficients.len() {
                    return Err(DraftError::PredictionUnavailable {
                        reason: format!(
                            "row {i} has {} values, model expects {}",
                            row.len(),
                            self.coefficients.len()
                        ),
                    });
                }
                let z = self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(x, w)| x * w)
                        .sum::<f64>();
                Ok(sigmoid(z))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Prediction over a feature matrix
// ---------------------------------------------------------------------------

/// Score every row of `matrix`, aligned with `matrix.rows`.
///
/// Outputs that are not a finite probability in [0, 1] (for instance rows
/// with unknown window features) come back as `None`. Any failure to score
/// the matrix as a whole is `PredictionUnavailable`.
pub fn predict_rows(
    model: &dyn DraftModel,
    matrix: &FeatureMatrix,
) -> Result<Vec<Option<f64>>, DraftError> {
    if matrix.is_empty() {
        return Ok(Vec::new());
    }
    let inputs = matrix.select(&model.metadata().features)?;
    let raw = model
        .predict_proba(&inputs)
        .map_err(|e| match e {
            DraftError::PredictionUnavailable { .. } => e,
            other => DraftError::PredictionUnavailable {
                reason: other.to_string(),
            },
        })?;

    if raw.len() != matrix.len() {
        return Err(DraftError::PredictionUnavailable {
            reason: format!(
                "model returned {} probabilities for {} rows",
                raw.len(),
                matrix.len()
            ),
        });
    }

    let mut unknown = 0usize;
    let probabilities: Vec<Option<f64>> = raw
        .into_iter()
        .map(|p| {
            if p.is_finite() && (0.0..=1.0).contains(&p) {
                Some(p)
            } else {
                unknown += 1;
                None
            }
        })
        .collect();

    if unknown > 0 {
        warn!(
            "{} of {} rows have no usable probability from {}",
            unknown,
            probabilities.len(),
            model.metadata().version_name()
        );
    }
    debug!(
        "Scored {} rows at pick {} with {}",
        probabilities.len(),
        matrix.context.pick_number,
        model.metadata().version_name()
    );

    Ok(probabilities)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{FeatureConfig, MissingWindowPolicy};
    use crate::expand::expand_available;
    use crate::expand::tests::pool;
    use crate::expand::PickContext;
    use crate::features::FeatureEngine;
    use std::collections::HashSet;

    pub(crate) fn metadata(features: &[&str]) -> ModelMetadata {
        ModelMetadata {
            name: "LogisticRegression".into(),
            data_number: "v01".into(),
            model_number: "v001".into(),
            description: "test model".into(),
            features: features.iter().map(|f| f.to_string()).collect(),
        }
    }

    /// Always fails, to exercise degraded predictions.
    pub(crate) struct BrokenModel(pub ModelMetadata);

    impl DraftModel for BrokenModel {
        fn metadata(&self) -> &ModelMetadata {
            &self.0
        }

        fn predict_proba(&self, _rows: &[Vec<f64>]) -> Result<Vec<f64>, DraftError> {
            Err(DraftError::PredictionUnavailable {
                reason: "model offline".into(),
            })
        }
    }

    fn context(next: Option<u32>) -> PickContext {
        PickContext {
            draft_id: "d1".into(),
            entry_id: "e2".into(),
            username: "user2".into(),
            round: 1,
            pick_number: 2,
            pick_label: "1.02".into(),
            actual_next_pick_number: next,
        }
    }

    #[test]
    fn version_name_joins_parts() {
        assert_eq!(metadata(&[]).version_name(), "LogisticRegression_v01_v001");
    }

    #[test]
    fn logistic_applies_intercept_and_weights() {
        let model = LogisticModel::new(metadata(&["a", "b"]), vec![1.0, -2.0], 0.5);
        let probs = model
            .predict_proba(&[vec![0.0, 0.0], vec![1.5, 1.0], vec![-0.5, 0.0]])
            .unwrap();
        assert!((probs[0] - sigmoid(0.5)).abs() < 1e-12);
        assert!((probs[1] - 0.5).abs() < 1e-12);
        assert!((probs[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn logistic_rejects_wrong_row_width() {
        let model = LogisticModel::new(metadata(&["a", "b"]), vec![1.0, 1.0], 0.0);
        let err = model.predict_proba(&[vec![1.0]]).unwrap_err();
        assert!(matches!(err, DraftError::PredictionUnavailable { .. }));
    }

    #[test]
    fn in_window_candidates_score_higher() {
        let candidates = pool(12);
        let expansion = expand_available(context(Some(7)), &candidates, &HashSet::new());
        let matrix = FeatureEngine::new(FeatureConfig::default()).compute(&expansion);
        let model = LogisticModel::new(
            metadata(&["in_window", "rank_window_diff"]),
            vec![2.0, -0.2],
            0.0,
        );
        let probs = predict_rows(&model, &matrix).unwrap();
        assert_eq!(probs.len(), 12);
        let probs: Vec<f64> = probs.into_iter().map(|p| p.unwrap()).collect();
        assert!(probs.windows(2).all(|w| w[0] >= w[1]));
        assert!(probs[0] > 0.5);
        assert!(probs[11] < 0.5);
    }

    #[test]
    fn unknown_column_degrades() {
        let candidates = pool(3);
        let expansion = expand_available(context(Some(7)), &candidates, &HashSet::new());
        let matrix = FeatureEngine::new(FeatureConfig::default()).compute(&expansion);
        let model = LogisticModel::new(metadata(&["adp_squared"]), vec![1.0], 0.0);
        assert!(matches!(
            predict_rows(&model, &matrix),
            Err(DraftError::PredictionUnavailable { .. })
        ));
    }

    #[test]
    fn broken_model_degrades() {
        let candidates = pool(3);
        let expansion = expand_available(context(Some(7)), &candidates, &HashSet::new());
        let matrix = FeatureEngine::new(FeatureConfig::default()).compute(&expansion);
        let model = BrokenModel(metadata(&["in_window"]));
        assert_eq!(
            predict_rows(&model, &matrix).unwrap_err(),
            DraftError::PredictionUnavailable {
                reason: "model offline".into()
            }
        );
    }

    #[test]
    fn nan_features_give_unknown_probabilities() {
        let config = FeatureConfig {
            missing_window: MissingWindowPolicy::Propagate,
            ..FeatureConfig::default()
        };
        let candidates = pool(4);
        let expansion = expand_available(context(None), &candidates, &HashSet::new());
        let matrix = FeatureEngine::new(config).compute(&expansion);
        let model = LogisticModel::new(metadata(&["in_window", "current_rank"]), vec![1.0, 0.1], 0.0);
        let probs = predict_rows(&model, &matrix).unwrap();
        assert_eq!(probs, vec![None; 4]);
    }

    #[test]
    fn from_config_copies_metadata() {
        let config = ModelConfig {
            name: "LogisticRegression".into(),
            data_number: "v02".into(),
            model_number: "v003".into(),
            description: String::new(),
            features: vec!["in_window".into()],
            coefficients: vec![1.5],
            intercept: -0.2,
        };
        let model = LogisticModel::from_config(&config);
        assert_eq!(model.metadata().version_name(), "LogisticRegression_v02_v003");
        assert_eq!(model.metadata().features, vec!["in_window".to_string()]);
    }
}
