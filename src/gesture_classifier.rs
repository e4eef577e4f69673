use ort::session::Session;
use ort::tensor::TensorElementType;
use ort::value::{Tensor, ValueType};
use parking_lot::{Mutex, MutexGuard};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tracing::{debug, info};

/// Etiquetas por defecto cuando no hay classes.json: alfabeto A-Z
pub const ALPHABET_LABELS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("ONNX Runtime error: {0}")]
    OnnxError(#[from] ort::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid feature size: expected {expected}, got {actual}")]
    InvalidFeatureSize { expected: usize, actual: usize },

    #[error("No output tensor found")]
    NoOutputTensor,

    #[error("Missing ONNX {kind}")]
    MissingIo { kind: &'static str },

    #[error("Class index {index} out of range ({classes} classes)")]
    LabelOutOfRange { index: usize, classes: usize },
}

/// Predictor opaco: un vector de características → una etiqueta.
///
/// Se comparte entre hilos en modo solo lectura.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &[f32]) -> Result<String, ClassifierError>;
}

#[derive(Debug, Deserialize)]
struct ClassesJson {
    index_to_class: HashMap<String, String>,
}

/// Carga la lista de clases ordenada por índice desde classes.json
pub fn load_classes(path: impl AsRef<Path>) -> Result<Vec<String>, ClassifierError> {
    let content = fs::read_to_string(path)?;
    parse_classes(&content)
}

fn parse_classes(content: &str) -> Result<Vec<String>, ClassifierError> {
    let data: ClassesJson = serde_json::from_str(content)?;

    // Convertir HashMap a Vec ordenado por índice
    let mut pairs: Vec<(usize, String)> = data
        .index_to_class
        .into_iter()
        .filter_map(|(k, v)| k.parse::<usize>().ok().map(|idx| (idx, v)))
        .collect();

    pairs.sort_by_key(|(idx, _)| *idx);
    Ok(pairs.into_iter().map(|(_, name)| name).collect())
}

/// De dónde sale la etiqueta en las salidas del modelo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    /// Tensor float de probabilidades/puntuaciones: argmax
    Scores,
    /// Tensor int64 con el índice de clase
    ClassIndex,
}

/// Clasificador ONNX (p. ej. un pipeline de sklearn exportado con zipmap=False).
///
/// `Session::run` necesita `&mut`, así que cada sesión va tras su propio
/// lock; con varias sesiones los workers infieren en paralelo.
pub struct OnnxClassifier {
    sessions: Vec<Mutex<Session>>,
    next: AtomicUsize,
    labels: Vec<String>,
    input_name: String,
    output_name: String,
    output_kind: OutputKind,
    input_width: Option<usize>,
}

impl OnnxClassifier {
    /// Carga modelo y, si existe, su classes.json. Abre `sessions` sesiones
    /// del mismo modelo (mínimo una).
    pub fn new(
        model_path: impl AsRef<Path>,
        classes_path: Option<&Path>,
        sessions: usize,
    ) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();

        let labels = match classes_path {
            Some(path) => load_classes(path)?,
            None => ALPHABET_LABELS.iter().map(|s| s.to_string()).collect(),
        };

        let session = Session::builder()?.commit_from_file(model_path)?;

        let input = session
            .inputs
            .first()
            .ok_or(ClassifierError::MissingIo { kind: "input" })?;
        let input_name = input.name.clone();
        let input_width = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape
                .last()
                .copied()
                .filter(|&dim| dim > 0)
                .map(|dim| dim as usize),
            _ => None,
        };

        let scores = session.outputs.iter().find(|output| {
            matches!(
                output.output_type,
                ValueType::Tensor {
                    ty: TensorElementType::Float32,
                    ..
                }
            )
        });
        let (output_name, output_kind) = match scores {
            Some(output) => (output.name.clone(), OutputKind::Scores),
            None => session
                .outputs
                .iter()
                .find(|output| {
                    matches!(
                        output.output_type,
                        ValueType::Tensor {
                            ty: TensorElementType::Int64,
                            ..
                        }
                    )
                })
                .map(|output| (output.name.clone(), OutputKind::ClassIndex))
                .ok_or(ClassifierError::MissingIo { kind: "output" })?,
        };

        let mut pool = vec![Mutex::new(session)];
        for _ in 1..sessions {
            pool.push(Mutex::new(Session::builder()?.commit_from_file(model_path)?));
        }

        info!(
            model = %model_path.display(),
            classes = labels.len(),
            sessions = pool.len(),
            input = %input_name,
            output = %output_name,
            "Modelo ONNX cargado"
        );

        Ok(Self {
            sessions: pool,
            next: AtomicUsize::new(0),
            labels,
            input_name,
            output_name,
            output_kind,
            input_width,
        })
    }

    /// Obtiene las etiquetas de clases
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Ancho de entrada declarado por el modelo, si es fijo
    pub fn input_width(&self) -> Option<usize> {
        self.input_width
    }

    // Primera sesión libre empezando por turno; si todas están ocupadas,
    // espera a la del turno
    fn session(&self) -> MutexGuard<'_, Session> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let count = self.sessions.len();
        (0..count)
            .find_map(|k| self.sessions[(start + k) % count].try_lock())
            .unwrap_or_else(|| self.sessions[start % count].lock())
    }

    fn label_for(&self, index: usize) -> Result<String, ClassifierError> {
        self.labels
            .get(index)
            .cloned()
            .ok_or(ClassifierError::LabelOutOfRange {
                index,
                classes: self.labels.len(),
            })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<String, ClassifierError> {
        if let Some(expected) = self.input_width {
            if features.len() != expected {
                return Err(ClassifierError::InvalidFeatureSize {
                    expected,
                    actual: features.len(),
                });
            }
        }

        // Tensor de entrada [1, D]
        let input_value = Tensor::from_array((vec![1_usize, features.len()], features.to_vec()))?;

        let mut session = self.session();
        let outputs = session.run(ort::inputs![
            self.input_name.as_str() => &input_value,
        ])?;

        let index = match self.output_kind {
            OutputKind::Scores => {
                let (_, scores) =
                    outputs[self.output_name.as_str()].try_extract_tensor::<f32>()?;
                argmax(scores).ok_or(ClassifierError::NoOutputTensor)?
            }
            OutputKind::ClassIndex => {
                let (_, indices) =
                    outputs[self.output_name.as_str()].try_extract_tensor::<i64>()?;
                let raw = *indices.first().ok_or(ClassifierError::NoOutputTensor)?;
                usize::try_from(raw).map_err(|_| ClassifierError::LabelOutOfRange {
                    index: usize::MAX,
                    classes: self.labels.len(),
                })?
            }
        };

        debug!(index, "Predicción ONNX");
        self.label_for(index)
    }
}

/// Índice del valor máximo; None si está vacío
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((i, score)),
        })
        .map(|(i, _)| i)
}
