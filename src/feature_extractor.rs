use crate::types::{FeatureVector, Landmark};

/// Número de pares (i, j) con i < j para `n` landmarks
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Extrae las distancias normalizadas entre todos los pares de landmarks.
///
/// Orden fijo: i ascendente y, para cada i, j ascendente desde i + 1.
/// Para 21 landmarks salen 210 características. El orden forma parte del
/// contrato con el modelo: las posiciones no tienen nombre.
///
/// Cada distancia se divide por la máxima de la misma mano, así el vector no
/// depende del tamaño de la mano ni de la distancia a la cámara. Si todas las
/// distancias son 0 (o no hay pares) el divisor es 1.
/// NaN e infinitos no se sanean.
pub fn featurize(hand: &[Landmark]) -> FeatureVector {
    let mut distances = Vec::with_capacity(pair_count(hand.len()));

    for (i, p1) in hand.iter().enumerate() {
        for p2 in &hand[i + 1..] {
            distances.push(p1.distance(p2));
        }
    }

    let max_dist = max(&distances);
    let divisor = if max_dist == 0.0 { 1.0 } else { max_dist };

    for d in distances.iter_mut() {
        *d /= divisor;
    }

    distances
}

// Con NaN presente el NaN gana, para que se propague al resultado
fn max(data: &[f32]) -> f32 {
    data.iter().fold(0.0f32, |a, &b| if b.is_nan() || b > a { b } else { a })
}
