//! Clasificación de señas (SIBI / BISINDO) a partir de landmarks de mano.
//!
//! landmarks + lateralidad + esquema → distancias normalizadas por mano →
//! vector de 210/420 características → clasificador ONNX → etiqueta.

pub mod assembler;
pub mod config;
pub mod csv_loader;
pub mod feature_extractor;
pub mod gesture_classifier;
pub mod protocol;
pub mod registry;
pub mod service;
pub mod types;
pub mod worker_pool;

pub use assembler::{assemble, AssembleError, FeatureAssembler};
pub use config::Config;
pub use feature_extractor::featurize;
pub use gesture_classifier::{Classifier, ClassifierError, OnnxClassifier};
pub use protocol::{PredictRequest, PredictResponse};
pub use registry::ModelRegistry;
pub use service::{ClassificationService, Prediction};
pub use types::{FeatureVector, Hand, Handedness, Landmark, Scheme};
