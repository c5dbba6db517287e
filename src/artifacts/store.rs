//! Process-wide store of pre-trained artifacts

use crate::artifacts::freq_maps::FrequencyMaps;
use crate::artifacts::scaler::Scaler;
use crate::config::ArtifactsConfig;
use crate::error::ScoringError;
use crate::models::{InferenceDispatcher, ModelLoader};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

static GLOBAL: OnceCell<Arc<ArtifactStore>> = OnceCell::new();

/// Models, scaler and frequency maps, read-only once loaded
pub struct ArtifactStore {
    dispatcher: InferenceDispatcher,
    scaler: Arc<Scaler>,
    freq_maps: Arc<FrequencyMaps>,
}

impl ArtifactStore {
    pub fn new(dispatcher: InferenceDispatcher, scaler: Scaler, freq_maps: FrequencyMaps) -> Self {
        Self {
            dispatcher,
            scaler: Arc::new(scaler),
            freq_maps: Arc::new(freq_maps),
        }
    }

    /// Load every artifact named in `config`.
    ///
    /// Any failure is an [`ScoringError::ArtifactLoad`] naming the offending file.
    pub fn load(config: &ArtifactsConfig) -> Result<Self, ScoringError> {
        let scaler = Scaler::load(&config.scaler)
            .map_err(|e| ScoringError::artifact_load(&config.scaler, &e))?;
        info!(
            path = %config.scaler.display(),
            columns = scaler.column_count(),
            "Scaler loaded"
        );

        let freq_maps = FrequencyMaps::load(&config.freq_maps)
            .map_err(|e| ScoringError::artifact_load(&config.freq_maps, &e))?;
        info!(
            path = %config.freq_maps.display(),
            columns = freq_maps.column_count(),
            "Frequency maps loaded"
        );

        if config.models.is_empty() {
            return Err(ScoringError::ArtifactLoad {
                path: PathBuf::from("artifacts.models"),
                reason: "no models configured".to_string(),
            });
        }

        let loader = ModelLoader::with_threads(config.onnx_threads);
        let models = loader
            .load_all_models(&config.models)
            .map_err(|(artifact, e)| ScoringError::artifact_load(&artifact.path, &e))?;

        // Models that declare their input width must agree with the scaler
        for (artifact, (_, model)) in config.models.iter().zip(&models) {
            if let Some(width) = model.input_width() {
                if width != scaler.column_count() {
                    return Err(ScoringError::ArtifactLoad {
                        path: artifact.path.clone(),
                        reason: format!(
                            "model `{}` takes {} features but the scaler produces {}",
                            artifact.name,
                            width,
                            scaler.column_count()
                        ),
                    });
                }
            }
        }

        let store = Self::new(InferenceDispatcher::new(models), scaler, freq_maps);

        info!(
            models = ?store.dispatcher.model_names(),
            "Artifacts loaded"
        );
        Ok(store)
    }

    /// The process-wide store, loaded on first use.
    ///
    /// Concurrent first callers block until the single load finishes and then
    /// share its result. Later calls return the cached store and ignore
    /// `config`. A failed load is not cached, but callers treat it as fatal.
    pub fn global(config: &ArtifactsConfig) -> Result<Arc<ArtifactStore>, ScoringError> {
        GLOBAL
            .get_or_try_init(|| Self::load(config).map(Arc::new))
            .map(Arc::clone)
    }

    pub fn dispatcher(&self) -> &InferenceDispatcher {
        &self.dispatcher
    }

    pub fn scaler(&self) -> &Arc<Scaler> {
        &self.scaler
    }

    pub fn freq_maps(&self) -> &Arc<FrequencyMaps> {
        &self.freq_maps
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::artifacts::scaler::DEFAULT_FEATURE_COLUMNS;
    use crate::config::ModelArtifact;
    use std::path::Path;
    use std::thread;

    /// Write a complete JSON artifact set (19 columns, two models) into `dir`
    pub(crate) fn write_artifacts(dir: &Path) -> ArtifactsConfig {
        let n = DEFAULT_FEATURE_COLUMNS.len();
        let scaler = serde_json::json!({
            "kind": "standard",
            "feature_names_in": DEFAULT_FEATURE_COLUMNS,
            "mean": vec![0.0; n],
            "scale": vec![1.0; n],
        });

        let freq_maps = serde_json::json!({
            "category": {"grocery_pos": 0.003, "shopping_net": 0.075, "gas_transport": 0.101},
            "state": {"New York": 0.064, "Texas": 0.073},
            "city": {"New York City": 0.0012},
            "job": {"Engineer": 0.0004},
            "merchant": {"fraud_Kirlin and Sons": 0.0013},
            "zip": {"10001": 0.0002},
        });

        // Weights only on amt (index 1) and hour (index 8)
        let mut coef = vec![0.0; n];
        coef[1] = 0.01;
        coef[8] = -0.05;
        let lr = serde_json::json!({
            "kind": "logistic_regression",
            "coef": [coef],
            "intercept": [-1.0],
        });

        // Split on amt: <= 500 mostly legitimate, above mostly fraud
        let tree = serde_json::json!({
            "kind": "decision_tree",
            "children_left": [1, -1, -1],
            "children_right": [2, -1, -1],
            "feature": [1, -2, -2],
            "threshold": [500.0, -2.0, -2.0],
            "value": [[900.0, 100.0], [880.0, 20.0], [20.0, 80.0]],
            "n_features": n,
        });

        let write = |name: &str, value: &serde_json::Value| {
            let path = dir.join(name);
            std::fs::write(&path, serde_json::to_vec(value).unwrap()).unwrap();
            path
        };

        ArtifactsConfig {
            models: vec![
                ModelArtifact::new("Logistic Regression", write("logistic_regression.json", &lr)),
                ModelArtifact::new("Decision Tree", write("decision_tree.json", &tree)),
            ],
            scaler: write("scaler.json", &scaler),
            freq_maps: write("freq_maps.json", &freq_maps),
            onnx_threads: 1,
        }
    }

    #[test]
    fn test_load_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());

        let store = ArtifactStore::load(&config).unwrap();
        assert_eq!(
            store.dispatcher().model_names(),
            &["Logistic Regression".to_string(), "Decision Tree".to_string()]
        );
        assert_eq!(store.scaler().column_count(), 19);
        assert_eq!(store.freq_maps().lookup("category", "grocery_pos"), 0.003);
    }

    #[test]
    fn test_category_choices_from_loaded_maps() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::load(&write_artifacts(dir.path())).unwrap();

        assert_eq!(
            store.freq_maps().categories("category"),
            vec!["gas_transport", "grocery_pos", "shopping_net"]
        );
    }

    #[test]
    fn test_missing_artifact_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_artifacts(dir.path());
        config.freq_maps = dir.path().join("absent.json");

        let err = ArtifactStore::load(&config).err().unwrap();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_corrupt_model_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());
        std::fs::write(&config.models[1].path, b"{ not json").unwrap();

        let err = ArtifactStore::load(&config).err().unwrap();
        assert_eq!(err.kind(), "artifact_load");
        assert!(err.to_string().contains("decision_tree.json"));
    }

    #[test]
    fn test_model_width_must_match_scaler() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());
        std::fs::write(
            &config.models[0].path,
            br#"{"kind": "logistic_regression", "coef": [[1.0, 2.0]], "intercept": [0.0]}"#,
        )
        .unwrap();

        let err = ArtifactStore::load(&config).err().unwrap();
        assert!(err.to_string().contains("logistic_regression.json"));
        assert!(err.to_string().contains("takes 2 features"));
    }

    #[test]
    fn test_no_models_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_artifacts(dir.path());
        config.models.clear();

        assert!(ArtifactStore::load(&config).is_err());
    }

    #[test]
    fn test_global_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_artifacts(dir.path());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let config = config.clone();
                thread::spawn(move || ArtifactStore::global(&config).ok().unwrap())
            })
            .collect();

        let stores: Vec<Arc<ArtifactStore>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        for store in &stores[1..] {
            assert!(Arc::ptr_eq(&stores[0], store));
        }

        // Later calls reuse the cached store even with other paths
        let other = ArtifactsConfig::in_dir("/nonexistent");
        let again = ArtifactStore::global(&other).ok().unwrap();
        assert!(Arc::ptr_eq(&stores[0], &again));
    }
}
