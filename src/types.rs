use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Un punto 3D del tracker de manos, en coordenadas normalizadas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Distancia euclídea a otro landmark
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Mano: secuencia ordenada de landmarks (la posición define la articulación)
pub type Hand = Vec<Landmark>;

/// Vector de características listo para el clasificador
pub type FeatureVector = Vec<f32>;

/// Etiqueta de lateralidad tal como la envía el tracker ("Left" / "Right")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handedness {
    pub label: String,
}

impl Handedness {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn left() -> Self {
        Self::new(LEFT_LABEL)
    }

    pub fn right() -> Self {
        Self::new(RIGHT_LABEL)
    }

    /// Solo "Left" exacto cuenta como mano izquierda
    pub fn is_left(&self) -> bool {
        self.label == LEFT_LABEL
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Esquema desconocido: {0:?}")]
pub struct SchemeError(pub String);

/// Sistema de señas soportado. Cada uno tiene su propio clasificador y layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scheme {
    /// Alfabeto de una mano (SIBI), 210 características
    SingleHand,
    /// Alfabeto de dos manos (BISINDO), 420 características
    TwoHand,
}

impl Scheme {
    pub const ALL: [Scheme; 2] = [Scheme::SingleHand, Scheme::TwoHand];

    /// Identificador externo histórico
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::SingleHand => "sibi",
            Scheme::TwoHand => "bisindo",
        }
    }

    /// Longitud del vector que espera el clasificador de este esquema
    pub fn feature_len(&self) -> usize {
        match self {
            Scheme::SingleHand => HAND_FEATURES,
            Scheme::TwoHand => TWO_HAND_FEATURES,
        }
    }

    /// Resuelve un id opcional; ausente equivale al esquema de dos manos
    pub fn resolve(id: Option<&str>) -> Result<Self, SchemeError> {
        match id {
            Some(id) => id.parse(),
            None => Ok(Scheme::default()),
        }
    }
}

impl Default for Scheme {
    fn default() -> Self {
        Scheme::TwoHand
    }
}

impl FromStr for Scheme {
    type Err = SchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sibi" | "single-hand" => Ok(Scheme::SingleHand),
            "bisindo" | "two-hand" => Ok(Scheme::TwoHand),
            other => Err(SchemeError(other.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constantes del sistema
pub const LANDMARKS_PER_HAND: usize = 21; // convención del tracker
pub const HAND_FEATURES: usize = LANDMARKS_PER_HAND * (LANDMARKS_PER_HAND - 1) / 2; // 210
pub const TWO_HAND_FEATURES: usize = 2 * HAND_FEATURES; // 420
pub const LEFT_LABEL: &str = "Left";
pub const RIGHT_LABEL: &str = "Right";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_lengths() {
        assert_eq!(HAND_FEATURES, 210);
        assert_eq!(TWO_HAND_FEATURES, 420);
        assert_eq!(Scheme::SingleHand.feature_len(), 210);
        assert_eq!(Scheme::TwoHand.feature_len(), 420);
    }

    #[test]
    fn test_scheme_ids() {
        assert_eq!("sibi".parse::<Scheme>(), Ok(Scheme::SingleHand));
        assert_eq!("single-hand".parse::<Scheme>(), Ok(Scheme::SingleHand));
        assert_eq!("bisindo".parse::<Scheme>(), Ok(Scheme::TwoHand));
        assert_eq!("two-hand".parse::<Scheme>(), Ok(Scheme::TwoHand));
        assert_eq!(
            "asl".parse::<Scheme>(),
            Err(SchemeError("asl".to_string()))
        );
        // Sin id se usa el esquema de dos manos
        assert_eq!(Scheme::resolve(None), Ok(Scheme::TwoHand));
    }

    #[test]
    fn test_handedness_left_is_exact() {
        assert!(Handedness::left().is_left());
        assert!(!Handedness::right().is_left());
        assert!(!Handedness::new("left").is_left());
    }
}
