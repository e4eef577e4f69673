/*
Clasificador de señas SIBI / BISINDO - Rust + ONNX

Daemon que:
1. Carga los modelos ONNX de cada esquema (si falta uno, sigue sin él)
2. Lee peticiones JSON por stdin, una por línea
3. Calcula las distancias normalizadas por mano y ensambla el vector
4. Clasifica en un pool de workers y responde una línea JSON por petición,
   en el mismo orden de entrada

Ejemplo:
  echo '{"model_type":"sibi","landmarks_list":[[...]],"handedness_list":[{"label":"Right"}]}' \
      | HANDSIGN_MODEL_DIR=./models ./target/release/handsign

Log con RUST_LOG=debug.
*/

use anyhow::{Context, Result};
use crossbeam_channel::{unbounded, Receiver};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use handsign::config::Config;
use handsign::protocol::{PredictRequest, PredictResponse};
use handsign::registry::ModelRegistry;
use handsign::service::ClassificationService;
use handsign::types::Scheme;
use handsign::worker_pool::WorkerPool;

fn init_logging() {
    // Log a stderr: stdout queda para las respuestas
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let config = Config::load().context("Configuración inválida")?;
    info!(
        model_dir = %config.model_dir.display(),
        workers = config.workers,
        "🎯 Clasificador de señas - Rust + ONNX"
    );

    let registry = ModelRegistry::load(&config);
    for scheme in Scheme::ALL {
        if !registry.is_loaded(scheme) {
            warn!(scheme = %scheme, "⚠️  Sin modelo: sus peticiones responderán Model Error");
        }
    }
    info!(schemes = ?registry.loaded(), "Modelos disponibles");

    let service = ClassificationService::new(Arc::new(registry));
    let pool = WorkerPool::new(service, config.workers, config.queue_depth);
    info!(workers = pool.size(), "✅ Pool de workers listo");

    // Las respuestas se escriben en orden de llegada desde un hilo aparte
    let (tx_pending, rx_pending) = unbounded::<Receiver<PredictResponse>>();
    let writer = std::thread::spawn(move || write_responses(rx_pending));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Error leyendo stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let pending = match PredictRequest::from_json(&line) {
            Ok(request) => pool.submit(request),
            Err(e) => {
                warn!(error = %e, "Petición mal formada");
                let (tx, rx) = crossbeam_channel::bounded(1);
                let _ = tx.send(PredictResponse::malformed());
                rx
            }
        };

        if tx_pending.send(pending).is_err() {
            break;
        }
    }

    drop(tx_pending);
    match writer.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("El hilo de salida terminó con pánico"),
    }

    info!("👋 Saliendo...");
    Ok(())
}

fn write_responses(pending: Receiver<Receiver<PredictResponse>>) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for rx in pending {
        let response = rx.recv().unwrap_or_else(|_| PredictResponse::malformed());
        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    Ok(())
}
