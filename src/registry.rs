use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::gesture_classifier::{Classifier, OnnxClassifier};
use crate::types::Scheme;

/// Clasificadores cargados por esquema. Se construye una vez al arrancar y
/// después solo se lee.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<Scheme, Arc<dyn Classifier>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un clasificador (para construir el registro a mano)
    pub fn with(mut self, scheme: Scheme, classifier: Arc<dyn Classifier>) -> Self {
        self.models.insert(scheme, classifier);
        self
    }

    /// Carga los modelos ONNX configurados. Un modelo que falta o no carga
    /// deja su hueco vacío; el proceso sigue.
    pub fn load(config: &Config) -> Self {
        let mut registry = Self::new();

        for scheme in Scheme::ALL {
            let paths = config.model_paths(scheme);

            if !paths.model.exists() {
                warn!(scheme = %scheme, path = %paths.model.display(), "Modelo no encontrado");
                continue;
            }

            let classes = paths.classes.as_deref().filter(|p| p.exists());
            match OnnxClassifier::new(&paths.model, classes, config.workers) {
                Ok(classifier) => {
                    if let Some(width) = classifier.input_width() {
                        if width != scheme.feature_len() {
                            warn!(
                                scheme = %scheme,
                                expected = scheme.feature_len(),
                                declared = width,
                                "El modelo declara un ancho de entrada distinto"
                            );
                        }
                    }
                    info!(
                        scheme = %scheme,
                        features = scheme.feature_len(),
                        classes = classifier.labels().len(),
                        "✅ Modelo cargado"
                    );
                    registry.models.insert(scheme, Arc::new(classifier));
                }
                Err(e) => {
                    warn!(scheme = %scheme, error = %e, "❌ No se pudo cargar el modelo");
                }
            }
        }

        registry
    }

    pub fn get(&self, scheme: Scheme) -> Option<&Arc<dyn Classifier>> {
        self.models.get(&scheme)
    }

    pub fn is_loaded(&self, scheme: Scheme) -> bool {
        self.models.contains_key(&scheme)
    }

    /// Esquemas con modelo cargado
    pub fn loaded(&self) -> Vec<Scheme> {
        self.models.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture_classifier::ClassifierError;

    struct Fixed(&'static str);

    impl Classifier for Fixed {
        fn predict(&self, _features: &[f32]) -> Result<String, ClassifierError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_manual_registry() {
        let registry = ModelRegistry::new().with(Scheme::SingleHand, Arc::new(Fixed("A")));
        assert!(registry.is_loaded(Scheme::SingleHand));
        assert!(!registry.is_loaded(Scheme::TwoHand));
        assert_eq!(registry.loaded(), vec![Scheme::SingleHand]);

        let classifier = registry.get(Scheme::SingleHand).unwrap();
        assert_eq!(classifier.predict(&[]).unwrap(), "A");
    }

    #[test]
    fn test_missing_artifacts_leave_slots_empty() {
        let config = Config {
            model_dir: "/nonexistent/handsign-models".into(),
            ..Config::default()
        };
        let registry = ModelRegistry::load(&config);
        assert!(registry.loaded().is_empty());
    }
}
