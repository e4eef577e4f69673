use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use handsign::assembler::assemble;
use handsign::config::Config;
use handsign::csv_loader::load_gesture_from_csv;
use handsign::protocol::PredictResponse;
use handsign::registry::ModelRegistry;
use handsign::service::ClassificationService;
use handsign::types::Scheme;

const USAGE: &str = "Uso: replay_csv [--scheme sibi|bisindo] [--dump-features] <archivo.csv>";

struct ReplayOptions {
    scheme: Option<String>,
    dump_features: bool,
}

fn parse_args() -> Result<(PathBuf, ReplayOptions)> {
    let mut scheme = None;
    let mut dump_features = false;
    let mut csv_path: Option<PathBuf> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dump-features" => dump_features = true,
            "--scheme" => {
                scheme = Some(args.next().ok_or_else(|| anyhow!("{}", USAGE))?);
            }
            _ => {
                if csv_path.is_some() {
                    bail!("{}", USAGE);
                }
                csv_path = Some(PathBuf::from(arg));
            }
        }
    }

    let csv_path = csv_path.ok_or_else(|| anyhow!("Debes especificar un archivo CSV\n{}", USAGE))?;
    Ok((
        csv_path,
        ReplayOptions {
            scheme,
            dump_features,
        },
    ))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let (csv_path, opts) = parse_args()?;
    println!("🎞️  Reproduciendo gesto desde {:?}", csv_path);

    let gesture = load_gesture_from_csv(&csv_path)?;
    let labels: Vec<&str> = gesture.handedness.iter().map(|h| h.label.as_str()).collect();
    println!("✋ Manos: {} {:?}", gesture.hands.len(), labels);

    let scheme = Scheme::resolve(opts.scheme.as_deref())?;

    if opts.dump_features {
        let features = assemble(scheme, &gesture.hands, &gesture.handedness)
            .context("No se pudo ensamblar el vector")?;
        println!("\n📊 {} features ({}):", features.len(), scheme);
        for (idx, value) in features.iter().enumerate() {
            println!("  {:03}: {:>10.6}", idx, value);
        }
    }

    let config = Config::load()?;
    let service = ClassificationService::new(Arc::new(ModelRegistry::load(&config)));
    let prediction = service.predict(Some(scheme.as_str()), &gesture.hands, &gesture.handedness);
    let failed = prediction.is_fault();
    let response = PredictResponse::from(prediction);

    println!("\n🥇 [{}] {} (status {})", scheme, response.label, response.status);
    if failed {
        bail!("La predicción falló: {}", response.label);
    }

    Ok(())
}
