use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

use crate::protocol::{PredictRequest, PredictResponse};
use crate::service::ClassificationService;

struct Job {
    request: PredictRequest,
    reply: Sender<PredictResponse>,
}

/// Pool fijo de hilos que comparten un mismo servicio.
///
/// La cola es acotada: `submit` bloquea si hay `queue_depth` peticiones
/// pendientes.
pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(service: ClassificationService, workers: usize, queue_depth: usize) -> Self {
        let (tx, rx) = bounded::<Job>(queue_depth.max(1));

        let workers = (0..workers.max(1))
            .map(|id| {
                let rx: Receiver<Job> = rx.clone();
                let service = service.clone();
                thread::Builder::new()
                    .name(format!("handsign-worker-{}", id))
                    .spawn(move || {
                        while let Ok(job) = rx.recv() {
                            let response = service.handle(&job.request);
                            // El que pidió puede haberse ido; no es un error
                            let _ = job.reply.send(response);
                        }
                        debug!(worker = id, "Worker terminado");
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!(error = %e, "No se pudo lanzar un worker");
                    None
                }
            })
            .collect();

        Self {
            tx: Some(tx),
            workers,
        }
    }

    /// Número de hilos activos
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Encola una petición y devuelve el canal por el que llegará la respuesta
    pub fn submit(&self, request: PredictRequest) -> Receiver<PredictResponse> {
        let (reply, response) = bounded(1);
        let job = Job { request, reply };

        let sent = match &self.tx {
            Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        };

        // Sin workers vivos se responde aquí mismo
        if let Err(job) = sent {
            error!("Cola de workers cerrada");
            let _ = job.reply.send(PredictResponse::malformed());
        }

        response
    }

    /// Encola y espera la respuesta
    pub fn predict(&self, request: PredictRequest) -> PredictResponse {
        self.submit(request)
            .recv()
            .unwrap_or_else(|_| PredictResponse::malformed())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Cerrar la cola para que los workers salgan del bucle
        self.tx.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Un worker terminó con pánico");
            }
        }
    }
}
