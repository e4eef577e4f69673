use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use csv::ReaderBuilder;

use crate::types::{Hand, Handedness, Landmark};

/// Manos capturadas de un único gesto, emparejadas por índice
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedGesture {
    pub hands: Vec<Hand>,
    pub handedness: Vec<Handedness>,
}

/// Carga un gesto desde un CSV con formato
/// hand,handedness,landmark,x,y,z ordenado por hand y landmark.
pub fn load_gesture_from_csv(path: impl AsRef<Path>) -> Result<CapturedGesture> {
    let path = path.as_ref();
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("No se pudo abrir el CSV {:?}", path))?;
    read_gesture(reader).with_context(|| format!("CSV inválido: {:?}", path))
}

/// Igual que `load_gesture_from_csv` pero desde cualquier lector
pub fn load_gesture_from_reader<R: Read>(rdr: R) -> Result<CapturedGesture> {
    read_gesture(ReaderBuilder::new().has_headers(true).from_reader(rdr))
}

fn read_gesture<R: Read>(mut reader: csv::Reader<R>) -> Result<CapturedGesture> {
    let mut hands: BTreeMap<usize, (String, BTreeMap<usize, Landmark>)> = BTreeMap::new();

    for (row_idx, result) in reader.records().enumerate() {
        let row = row_idx + 1;
        let record = result.with_context(|| format!("Fila {} inválida", row))?;
        if record.len() < 6 {
            bail!("La fila {} no tiene 6 columnas", row);
        }

        let hand: usize = record[0]
            .trim()
            .parse()
            .with_context(|| format!("hand inválido en fila {}", row))?;
        let label = record[1].trim().to_string();
        let landmark: usize = record[2]
            .trim()
            .parse()
            .with_context(|| format!("landmark inválido en fila {}", row))?;
        let x: f32 = record[3]
            .trim()
            .parse()
            .with_context(|| format!("x inválido en fila {}", row))?;
        let y: f32 = record[4]
            .trim()
            .parse()
            .with_context(|| format!("y inválido en fila {}", row))?;
        let z: f32 = record[5]
            .trim()
            .parse()
            .with_context(|| format!("z inválido en fila {}", row))?;

        let (hand_label, points) = hands
            .entry(hand)
            .or_insert_with(|| (label.clone(), BTreeMap::new()));
        ensure!(
            *hand_label == label,
            "La mano {} cambia de lateralidad en la fila {} ({} → {})",
            hand,
            row,
            hand_label,
            label
        );
        if points.insert(landmark, Landmark::new(x, y, z)).is_some() {
            bail!("Landmark {} repetido en la mano {} (fila {})", landmark, hand, row);
        }
    }

    let mut gesture = CapturedGesture::default();
    for (expected_idx, (hand_idx, (label, points))) in hands.into_iter().enumerate() {
        ensure!(
            hand_idx == expected_idx,
            "Las manos deben ser consecutivas desde 0 (falta la mano {})",
            expected_idx
        );
        let mut hand = Vec::with_capacity(points.len());
        for (expected_lm, (lm_idx, point)) in points.into_iter().enumerate() {
            ensure!(
                lm_idx == expected_lm,
                "Falta el landmark {} en la mano {}",
                expected_lm,
                hand_idx
            );
            hand.push(point);
        }
        gesture.hands.push(hand);
        gesture.handedness.push(Handedness::new(label));
    }

    Ok(gesture)
}
