use crate::error::Result;
use crate::model::{DictVectorizer, LinearRegression, UnseenCategoryPolicy};
use crate::types::{FeatureRecord, PreparedTrip};
use tracing::{debug, instrument};

/// Encodes the categorical fields and applies the regressor, one prediction per record
#[instrument(skip_all, fields(rows = records.len()))]
pub fn score(
    records: &[PreparedTrip],
    categorical_fields: &[&str],
    encoder: &DictVectorizer,
    model: &LinearRegression,
    policy: UnseenCategoryPolicy,
) -> Result<Vec<f64>> {
    let features: Vec<&FeatureRecord> = records.iter().map(|r| &r.features).collect();
    let x = encoder.transform(&features, categorical_fields, policy)?;
    debug!(n_features = x.n_features, "Built feature matrix");
    model.predict(&x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::CATEGORICAL_FIELDS;
    use crate::error::PipelineError;
    use crate::fixtures::fixture_trips;
    use crate::model::ModelArtifact;
    use crate::pipeline::prepare::prepare;

    fn model() -> ModelArtifact {
        ModelArtifact::from_json_str(
            r#"{
                "vectorizer": { "feature_names": ["DOlocationID=-1", "DOlocationID=1", "PUlocationID=-1", "PUlocationID=1"] },
                "regressor": { "coef": [0.5, 1.5, 2.0, -1.0], "intercept": 10.0 }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn scores_prepared_fixture() {
        let model = model();
        let prepared = prepare(&fixture_trips(), &CATEGORICAL_FIELDS).unwrap();
        let y = score(&prepared, &CATEGORICAL_FIELDS, &model.encoder, &model.regressor, UnseenCategoryPolicy::Error)
            .unwrap();
        assert_eq!(y, vec![12.5, 10.5]);
    }

    #[test]
    fn empty_input_scores_nothing() {
        let model = model();
        let y = score(&[], &CATEGORICAL_FIELDS, &model.encoder, &model.regressor, UnseenCategoryPolicy::Error).unwrap();
        assert!(y.is_empty());
    }

    #[test]
    fn unseen_location_is_a_value_error() {
        let model = model();
        let mut trips = fixture_trips();
        trips[1].do_location_id = Some(42);
        let prepared = prepare(&trips, &CATEGORICAL_FIELDS).unwrap();
        let err = score(&prepared, &CATEGORICAL_FIELDS, &model.encoder, &model.regressor, UnseenCategoryPolicy::Error)
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnseenCategory { .. }));

        let y = score(&prepared, &CATEGORICAL_FIELDS, &model.encoder, &model.regressor, UnseenCategoryPolicy::Ignore)
            .unwrap();
        assert_eq!(y, vec![12.5, 9.0]);
    }
}
