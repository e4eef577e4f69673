use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::assembler::{assemble, AssembleError};
use crate::gesture_classifier::{Classifier, ClassifierError};
use crate::protocol::{PredictRequest, PredictResponse, SchemeId};
use crate::registry::ModelRegistry;
use crate::types::{Hand, Handedness, Scheme};

/// Resultado de una clasificación. Nada de lo que pase por debajo del
/// servicio escapa de otra forma.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    /// Etiqueta predicha por el modelo
    Label(String),
    /// Sin manos: no es un fallo
    NoGesture,
    /// No hay modelo cargado para el esquema pedido (o el id es desconocido)
    ModelUnavailable,
    /// Fallo al ensamblar o al inferir; la causa solo va al log
    PredictionError,
}

impl Prediction {
    pub fn is_fault(&self) -> bool {
        matches!(self, Prediction::ModelUnavailable | Prediction::PredictionError)
    }
}

/// Servicio de clasificación: valida, ensambla y llama al modelo del esquema
#[derive(Clone)]
pub struct ClassificationService {
    registry: Arc<ModelRegistry>,
}

impl ClassificationService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn predict(
        &self,
        scheme_id: Option<&str>,
        hands: &[Hand],
        handedness: &[Handedness],
    ) -> Prediction {
        if hands.is_empty() {
            return Prediction::NoGesture;
        }

        let (scheme, classifier) = match self.classifier_for(scheme_id) {
            Ok(found) => found,
            Err(prediction) => return prediction,
        };

        classify(scheme, classifier.as_ref(), hands, handedness)
    }

    /// Atiende una petición sin tipar. Solo se decodifica lo que el esquema
    /// usa, y después de comprobar que hay manos y modelo.
    pub fn handle(&self, request: &PredictRequest) -> PredictResponse {
        PredictResponse::from(self.handle_prediction(request))
    }

    fn handle_prediction(&self, request: &PredictRequest) -> Prediction {
        match request.hand_count() {
            Ok(0) => return Prediction::NoGesture,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Petición inválida");
                return Prediction::PredictionError;
            }
        }

        let scheme_id = match request.scheme_id() {
            SchemeId::Default => None,
            SchemeId::Named(id) => Some(id),
            SchemeId::Invalid => {
                warn!(model_type = %request.model_type, "model_type no es un string");
                return Prediction::ModelUnavailable;
            }
        };

        let (scheme, classifier) = match self.classifier_for(scheme_id) {
            Ok(found) => found,
            Err(prediction) => return prediction,
        };

        match request.decode_inputs(scheme) {
            Ok((hands, handedness)) => classify(scheme, classifier.as_ref(), &hands, &handedness),
            Err(e) => {
                warn!(scheme = %scheme, error = %e, "Petición inválida");
                Prediction::PredictionError
            }
        }
    }

    fn classifier_for(
        &self,
        scheme_id: Option<&str>,
    ) -> Result<(Scheme, &Arc<dyn Classifier>), Prediction> {
        let scheme = Scheme::resolve(scheme_id).map_err(|e| {
            warn!(error = %e, "Esquema no soportado");
            Prediction::ModelUnavailable
        })?;

        match self.registry.get(scheme) {
            Some(classifier) => Ok((scheme, classifier)),
            None => {
                warn!(scheme = %scheme, "Modelo no cargado");
                Err(Prediction::ModelUnavailable)
            }
        }
    }
}

fn classify(
    scheme: Scheme,
    classifier: &dyn Classifier,
    hands: &[Hand],
    handedness: &[Handedness],
) -> Prediction {
    match run_pipeline(scheme, classifier, hands, handedness) {
        Ok(label) => {
            debug!(scheme = %scheme, label = %label, "Predicción");
            Prediction::Label(label)
        }
        Err(e) => {
            error!(scheme = %scheme, error = %e, "Error en predicción");
            Prediction::PredictionError
        }
    }
}

/// Fallos internos del pipeline; solo se registran en el log
#[derive(Error, Debug)]
enum PipelineError {
    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Vector de {actual} características, el modelo espera {expected}")]
    FeatureLen { expected: usize, actual: usize },

    #[error("Pánico en el clasificador: {0}")]
    Panic(String),
}

fn run_pipeline(
    scheme: Scheme,
    classifier: &dyn Classifier,
    hands: &[Hand],
    handedness: &[Handedness],
) -> Result<String, PipelineError> {
    let features = assemble(scheme, hands, handedness)?;

    if features.len() != scheme.feature_len() {
        return Err(PipelineError::FeatureLen {
            expected: scheme.feature_len(),
            actual: features.len(),
        });
    }

    // Un pánico dentro del modelo también acaba en PredictionError
    match panic::catch_unwind(AssertUnwindSafe(|| classifier.predict(&features))) {
        Ok(result) => Ok(result?),
        Err(payload) => Err(PipelineError::Panic(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, LANDMARKS_PER_HAND};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Clasificador de prueba: cuenta llamadas y devuelve la longitud recibida
    #[derive(Default)]
    struct Recorder {
        calls: AtomicUsize,
    }

    impl Classifier for Recorder {
        fn predict(&self, features: &[f32]) -> Result<String, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("len={}", features.len()))
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn predict(&self, _features: &[f32]) -> Result<String, ClassifierError> {
            Err(ClassifierError::NoOutputTensor)
        }
    }

    struct Panicking;

    impl Classifier for Panicking {
        fn predict(&self, _features: &[f32]) -> Result<String, ClassifierError> {
            panic!("modelo roto")
        }
    }

    fn hand(scale: f32) -> Hand {
        (0..LANDMARKS_PER_HAND)
            .map(|i| Landmark::new(scale * i as f32, scale * (i % 3) as f32, 0.0))
            .collect()
    }

    fn service_with(scheme: Scheme, classifier: Arc<dyn Classifier>) -> ClassificationService {
        ClassificationService::new(Arc::new(ModelRegistry::new().with(scheme, classifier)))
    }

    #[test]
    fn test_empty_hands_is_no_gesture() {
        let recorder = Arc::new(Recorder::default());
        let service = service_with(Scheme::TwoHand, recorder.clone());

        assert_eq!(service.predict(None, &[], &[]), Prediction::NoGesture);
        // Incluso con un esquema desconocido
        assert_eq!(service.predict(Some("asl"), &[], &[]), Prediction::NoGesture);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_scheme() {
        let service = service_with(Scheme::TwoHand, Arc::new(Recorder::default()));
        assert_eq!(
            service.predict(Some("asl"), &[hand(1.0)], &[Handedness::left()]),
            Prediction::ModelUnavailable
        );
    }

    #[test]
    fn test_scheme_without_model() {
        let service = service_with(Scheme::TwoHand, Arc::new(Recorder::default()));
        assert_eq!(
            service.predict(Some("sibi"), &[hand(1.0)], &[]),
            Prediction::ModelUnavailable
        );
    }

    #[test]
    fn test_default_scheme_is_two_hand() {
        let service = service_with(Scheme::TwoHand, Arc::new(Recorder::default()));
        assert_eq!(
            service.predict(None, &[hand(1.0)], &[Handedness::left()]),
            Prediction::Label("len=420".to_string())
        );
    }

    #[test]
    fn test_single_hand_vector() {
        let recorder = Arc::new(Recorder::default());
        let service = service_with(Scheme::SingleHand, recorder.clone());
        assert_eq!(
            service.predict(Some("sibi"), &[hand(1.0), hand(2.0)], &[]),
            Prediction::Label("len=210".to_string())
        );
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wrong_landmark_count_is_prediction_error() {
        let recorder = Arc::new(Recorder::default());
        let service = service_with(Scheme::SingleHand, recorder.clone());
        let mut short = hand(1.0);
        short.truncate(5);

        assert_eq!(
            service.predict(Some("sibi"), &[short], &[]),
            Prediction::PredictionError
        );
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_classifier_faults_are_contained() {
        let service = service_with(Scheme::TwoHand, Arc::new(Failing));
        assert_eq!(
            service.predict(None, &[hand(1.0)], &[Handedness::right()]),
            Prediction::PredictionError
        );

        let service = service_with(Scheme::TwoHand, Arc::new(Panicking));
        assert_eq!(
            service.predict(None, &[hand(1.0)], &[Handedness::right()]),
            Prediction::PredictionError
        );
    }

    #[test]
    fn test_is_fault() {
        assert!(!Prediction::Label("A".into()).is_fault());
        assert!(!Prediction::NoGesture.is_fault());
        assert!(Prediction::ModelUnavailable.is_fault());
        assert!(Prediction::PredictionError.is_fault());
    }
}
