use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::Scheme;

pub const ENV_CONFIG: &str = "HANDSIGN_CONFIG";
pub const ENV_MODEL_DIR: &str = "HANDSIGN_MODEL_DIR";
pub const ENV_WORKERS: &str = "HANDSIGN_WORKERS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error leyendo {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Valor inválido para {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Ficheros de un modelo, relativos a `model_dir`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFiles {
    pub model: String,
    #[serde(default)]
    pub classes: Option<String>,
}

/// Rutas ya resueltas de un modelo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub model: PathBuf,
    pub classes: Option<PathBuf>,
}

/// Parámetros de configuración del servicio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directorio de modelos (default: "models")
    pub model_dir: PathBuf,
    /// Modelo SIBI, 210 características
    pub single_hand: ModelFiles,
    /// Modelo BISINDO, 420 características
    pub two_hand: ModelFiles,
    /// Hilos de inferencia (default: 4)
    pub workers: usize,
    /// Peticiones en cola antes de bloquear (default: 64)
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            single_hand: ModelFiles {
                model: "model_sibi.onnx".to_string(),
                classes: Some("classes_sibi.json".to_string()),
            },
            two_hand: ModelFiles {
                model: "model_bisindo.onnx".to_string(),
                classes: Some("classes_bisindo.json".to_string()),
            },
            workers: 4,
            queue_depth: 64,
        }
    }
}

impl Config {
    /// Defaults → fichero de $HANDSIGN_CONFIG (si existe) → variables de entorno
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(ENV_CONFIG) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Aplica overrides a partir de un lookup clave → valor
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_MODEL_DIR) {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            self.workers = workers
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_WORKERS,
                    value: workers.clone(),
                })?;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers",
                value: "0".to_string(),
            });
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "queue_depth",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn model_files(&self, scheme: Scheme) -> &ModelFiles {
        match scheme {
            Scheme::SingleHand => &self.single_hand,
            Scheme::TwoHand => &self.two_hand,
        }
    }

    pub fn model_paths(&self, scheme: Scheme) -> ModelPaths {
        let files = self.model_files(scheme);
        ModelPaths {
            model: self.model_dir.join(&files.model),
            classes: files.classes.as_ref().map(|c| self.model_dir.join(c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_paths() {
        let config = Config::default();
        let paths = config.model_paths(Scheme::SingleHand);
        assert_eq!(paths.model, PathBuf::from("models/model_sibi.onnx"));
        assert_eq!(
            paths.classes,
            Some(PathBuf::from("models/classes_sibi.json"))
        );
        assert_eq!(
            config.model_paths(Scheme::TwoHand).model,
            PathBuf::from("models/model_bisindo.onnx")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"model_dir": "/srv/models", "workers": 8}"#).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.workers, 8);
        assert_eq!(config.queue_depth, 64);
        assert_eq!(config.two_hand.model, "model_bisindo.onnx");
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> =
            [(ENV_MODEL_DIR, "/opt/handsign"), (ENV_WORKERS, " 2 ")].into();
        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/opt/handsign"));
        assert_eq!(config.workers, 2);
    }

    #[test]
    fn test_invalid_workers() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|key| (key == ENV_WORKERS).then(|| "muchos".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_WORKERS, .. }));

        let err = config
            .apply_overrides(|key| (key == ENV_WORKERS).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "workers", .. }));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("/nonexistent/handsign.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
