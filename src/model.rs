//! The pre-trained scoring model: a dictionary vectorizer that one-hot encodes
//! categorical tokens, followed by a linear regressor.

use crate::error::{PipelineError, Result};
use crate::types::FeatureRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// What to do with a categorical token the vectorizer was not trained on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnseenCategoryPolicy {
    #[default]
    Error,
    Ignore,
}

impl FromStr for UnseenCategoryPolicy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "ignore" => Ok(Self::Ignore),
            other => Err(PipelineError::Config(format!(
                "unseen category policy must be 'error' or 'ignore', got '{}'",
                other
            ))),
        }
    }
}

/// Sparse row-major feature matrix; each row lists `(column, value)` pairs
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub n_features: usize,
    pub rows: Vec<Vec<(usize, f64)>>,
}

impl FeatureMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone)]
pub struct DictVectorizer {
    feature_names: Vec<String>,
    separator: String,
    vocabulary: HashMap<String, usize>,
}

impl DictVectorizer {
    pub fn new(feature_names: Vec<String>, separator: impl Into<String>) -> Result<Self> {
        let mut vocabulary = HashMap::with_capacity(feature_names.len());
        for (i, name) in feature_names.iter().enumerate() {
            if vocabulary.insert(name.clone(), i).is_some() {
                return Err(PipelineError::Schema(format!("duplicate feature name '{}'", name)));
            }
        }
        Ok(Self { feature_names, separator: separator.into(), vocabulary })
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// One-hot encodes `fields` of every record into a feature matrix.
    pub fn transform(
        &self,
        records: &[&FeatureRecord],
        fields: &[&str],
        policy: UnseenCategoryPolicy,
    ) -> Result<FeatureMatrix> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let mut row = Vec::with_capacity(fields.len());
            for field in fields {
                let token = record.get(field).ok_or_else(|| {
                    PipelineError::Schema(format!("feature record has no field '{}'", field))
                })?;
                let name = format!("{}{}{}", field, self.separator, token);
                match (self.vocabulary.get(&name), policy) {
                    (Some(&column), _) => row.push((column, 1.0)),
                    (None, UnseenCategoryPolicy::Ignore) => {}
                    (None, UnseenCategoryPolicy::Error) => {
                        return Err(PipelineError::UnseenCategory {
                            field: field.to_string(),
                            value: token.to_string(),
                        })
                    }
                }
            }
            row.sort_unstable_by_key(|(column, _)| *column);
            rows.push(row);
        }
        Ok(FeatureMatrix { n_features: self.n_features(), rows })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if x.n_features != self.coef.len() {
            return Err(PipelineError::Schema(format!(
                "model expects {} features, matrix has {}",
                self.coef.len(),
                x.n_features
            )));
        }
        x.rows
            .iter()
            .map(|row| {
                row.iter().try_fold(self.intercept, |acc, &(column, value)| {
                    self.coef
                        .get(column)
                        .map(|c| acc + c * value)
                        .ok_or_else(|| PipelineError::Schema(format!("feature column {} out of range", column)))
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct VectorizerFile {
    feature_names: Vec<String>,
    #[serde(default = "default_separator")]
    separator: String,
}

fn default_separator() -> String {
    "=".to_string()
}

#[derive(Deserialize)]
struct ArtifactFile {
    vectorizer: VectorizerFile,
    regressor: LinearRegression,
}

/// The (encoder, regressor) pair, loaded once and only read afterwards
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub encoder: DictVectorizer,
    pub regressor: LinearRegression,
}

impl ModelArtifact {
    pub fn new(encoder: DictVectorizer, regressor: LinearRegression) -> Result<Self> {
        if encoder.n_features() != regressor.coef.len() {
            return Err(PipelineError::Schema(format!(
                "vectorizer has {} features but regressor has {} coefficients",
                encoder.n_features(),
                regressor.coef.len()
            )));
        }
        Ok(Self { encoder, regressor })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: ArtifactFile = serde_json::from_str(json)?;
        let encoder = DictVectorizer::new(file.vectorizer.feature_names, file.vectorizer.separator)?;
        Self::new(encoder, file.regressor)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PipelineError::NotFound(format!("model artifact {}", path.display())),
            _ => PipelineError::Io(e),
        })?;
        let model = Self::from_json_str(&json)?;
        info!(path = %path.display(), features = model.encoder.n_features(), "Loaded model artifact");
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "vectorizer": { "feature_names": ["DOlocationID=-1", "DOlocationID=1", "PUlocationID=-1", "PUlocationID=1"] },
        "regressor": { "coef": [1.0, 2.0, 3.0, 4.0], "intercept": 10.0 }
    }"#;

    fn record(pu: &str, dol: &str) -> FeatureRecord {
        let mut r = FeatureRecord::new();
        r.insert("PUlocationID", pu);
        r.insert("DOlocationID", dol);
        r
    }

    const FIELDS: [&str; 2] = ["PUlocationID", "DOlocationID"];

    #[test]
    fn loads_artifact_with_default_separator() {
        let model = ModelArtifact::from_json_str(ARTIFACT).unwrap();
        assert_eq!(model.encoder.n_features(), 4);
        assert_eq!(model.regressor.intercept, 10.0);
    }

    #[test]
    fn rejects_coef_length_mismatch() {
        let bad = r#"{
            "vectorizer": { "feature_names": ["a=1", "a=2"] },
            "regressor": { "coef": [1.0], "intercept": 0.0 }
        }"#;
        assert!(matches!(ModelArtifact::from_json_str(bad), Err(PipelineError::Schema(_))));
    }

    #[test]
    fn rejects_duplicate_feature_names() {
        assert!(DictVectorizer::new(vec!["a=1".into(), "a=1".into()], "=").is_err());
    }

    #[test]
    fn transform_one_hot_encodes_tokens() {
        let model = ModelArtifact::from_json_str(ARTIFACT).unwrap();
        let a = record("-1", "1");
        let x = model.encoder.transform(&[&a], &FIELDS, UnseenCategoryPolicy::Error).unwrap();
        assert_eq!(x.n_rows(), 1);
        assert_eq!(x.rows[0], vec![(1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn predict_adds_intercept_and_weights() {
        let model = ModelArtifact::from_json_str(ARTIFACT).unwrap();
        let a = record("-1", "-1");
        let b = record("1", "1");
        let x = model.encoder.transform(&[&a, &b], &FIELDS, UnseenCategoryPolicy::Error).unwrap();
        let y = model.regressor.predict(&x).unwrap();
        assert_eq!(y, vec![10.0 + 3.0 + 1.0, 10.0 + 4.0 + 2.0]);
    }

    #[test]
    fn unseen_category_follows_policy() {
        let model = ModelArtifact::from_json_str(ARTIFACT).unwrap();
        let r = record("265", "1");

        let err = model.encoder.transform(&[&r], &FIELDS, UnseenCategoryPolicy::Error).unwrap_err();
        match err {
            PipelineError::UnseenCategory { field, value } => {
                assert_eq!(field, "PUlocationID");
                assert_eq!(value, "265");
            }
            other => panic!("unexpected error: {other}"),
        }

        let x = model.encoder.transform(&[&r], &FIELDS, UnseenCategoryPolicy::Ignore).unwrap();
        assert_eq!(x.rows[0], vec![(1, 1.0)]);
    }

    #[test]
    fn missing_field_is_schema_error() {
        let model = ModelArtifact::from_json_str(ARTIFACT).unwrap();
        let mut r = FeatureRecord::new();
        r.insert("PUlocationID", "1");
        let err = model.encoder.transform(&[&r], &FIELDS, UnseenCategoryPolicy::Ignore).unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
    }

    #[test]
    fn predict_rejects_matrix_width_mismatch() {
        let reg = LinearRegression { coef: vec![1.0, 2.0], intercept: 0.0 };
        let x = FeatureMatrix { n_features: 3, rows: vec![vec![]] };
        assert!(reg.predict(&x).is_err());
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("IGNORE".parse::<UnseenCategoryPolicy>().unwrap(), UnseenCategoryPolicy::Ignore);
        assert_eq!("error".parse::<UnseenCategoryPolicy>().unwrap(), UnseenCategoryPolicy::Error);
        assert!("skip".parse::<UnseenCategoryPolicy>().is_err());
    }
}
