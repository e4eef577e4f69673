//! Formato de petición/respuesta del servicio de predicción.
//!
//! Petición:
//! `{"model_type": "sibi", "landmarks_list": [[{x,y,z}, ...]], "handedness_list": [{"label": "Left"}]}`
//!
//! Respuesta: `{"status": 200, "label": "A"}`.
//!
//! La petición se guarda sin tipar: cada mano y cada etiqueta se decodifica
//! solo cuando el esquema la usa, así un campo roto que nadie lee no
//! convierte la petición en error.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::service::Prediction;
use crate::types::{Hand, Handedness, Scheme};

/// Etiqueta cuando no hay manos
pub const NO_GESTURE_LABEL: &str = "--";
pub const MODEL_ERROR_LABEL: &str = "Model Error";
pub const PREDICTION_ERROR_LABEL: &str = "Error";

pub const STATUS_OK: u16 = 200;
pub const STATUS_SERVER_ERROR: u16 = 500;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{field} no es una lista")]
    NotAList { field: &'static str },

    #[error("{field}[{index}] inválido: {source}")]
    Element {
        field: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Id de esquema tal como llega en la petición
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeId<'a> {
    /// Ausente o null: esquema por defecto
    Default,
    Named(&'a str),
    /// Presente pero no es un string
    Invalid,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Id del esquema; ausente = BISINDO
    #[serde(default)]
    pub model_type: Value,
    #[serde(default)]
    pub landmarks_list: Value,
    #[serde(default)]
    pub handedness_list: Value,
}

impl PredictRequest {
    /// Solo falla si el cuerpo no es un objeto JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Construye una petición a partir de datos ya tipados
    pub fn new(model_type: Option<&str>, hands: &[Hand], handedness: &[Handedness]) -> Self {
        Self {
            model_type: model_type.map_or(Value::Null, |id| Value::String(id.to_string())),
            landmarks_list: serde_json::to_value(hands).unwrap_or_default(),
            handedness_list: serde_json::to_value(handedness).unwrap_or_default(),
        }
    }

    pub fn scheme_id(&self) -> SchemeId<'_> {
        match &self.model_type {
            Value::Null => SchemeId::Default,
            Value::String(id) => SchemeId::Named(id),
            _ => SchemeId::Invalid,
        }
    }

    /// Número de manos recibidas, sin decodificarlas
    pub fn hand_count(&self) -> Result<usize, DecodeError> {
        list(&self.landmarks_list, "landmarks_list").map(|items| items.len())
    }

    /// Decodifica solo lo que usa el esquema: la primera mano para SIBI y,
    /// para BISINDO, las manos que tienen etiqueta emparejada.
    pub fn decode_inputs(
        &self,
        scheme: Scheme,
    ) -> Result<(Vec<Hand>, Vec<Handedness>), DecodeError> {
        let hands = list(&self.landmarks_list, "landmarks_list")?;

        match scheme {
            Scheme::SingleHand => {
                let first = hands
                    .iter()
                    .take(1)
                    .enumerate()
                    .map(|(i, v)| element(v, "landmarks_list", i))
                    .collect::<Result<Vec<Hand>, _>>()?;
                Ok((first, Vec::new()))
            }
            Scheme::TwoHand => {
                let labels = list(&self.handedness_list, "handedness_list")?;
                let used = hands.len().min(labels.len());
                let hands = hands[..used]
                    .iter()
                    .enumerate()
                    .map(|(i, v)| element(v, "landmarks_list", i))
                    .collect::<Result<Vec<Hand>, _>>()?;
                let labels = labels[..used]
                    .iter()
                    .enumerate()
                    .map(|(i, v)| element(v, "handedness_list", i))
                    .collect::<Result<Vec<Handedness>, _>>()?;
                Ok((hands, labels))
            }
        }
    }
}

// null cuenta como lista vacía
fn list<'a>(value: &'a Value, field: &'static str) -> Result<&'a [Value], DecodeError> {
    match value {
        Value::Null => Ok(&[]),
        Value::Array(items) => Ok(items),
        _ => Err(DecodeError::NotAList { field }),
    }
}

fn element<T: DeserializeOwned>(
    value: &Value,
    field: &'static str,
    index: usize,
) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|source| DecodeError::Element {
        field,
        index,
        source,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub status: u16,
    pub label: String,
}

impl PredictResponse {
    pub fn new(status: u16, label: impl Into<String>) -> Self {
        Self {
            status,
            label: label.into(),
        }
    }

    /// Respuesta para un cuerpo que no se pudo decodificar
    pub fn malformed() -> Self {
        Self::from(Prediction::PredictionError)
    }
}

impl From<Prediction> for PredictResponse {
    fn from(prediction: Prediction) -> Self {
        match prediction {
            Prediction::Label(label) => Self::new(STATUS_OK, label),
            Prediction::NoGesture => Self::new(STATUS_OK, NO_GESTURE_LABEL),
            Prediction::ModelUnavailable => Self::new(STATUS_SERVER_ERROR, MODEL_ERROR_LABEL),
            Prediction::PredictionError => {
                Self::new(STATUS_SERVER_ERROR, PREDICTION_ERROR_LABEL)
            }
        }
    }
}
