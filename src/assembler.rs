use crate::feature_extractor::featurize;
use crate::types::{FeatureVector, Hand, Handedness, Scheme, HAND_FEATURES, TWO_HAND_FEATURES};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AssembleError {
    #[error("No hay manos para ensamblar")]
    NoHands,

    #[error("Mano {index}: se esperaban {expected} características, hay {actual}")]
    HandSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

/// Construye el vector de entrada del modelo a partir de las manos detectadas
pub trait FeatureAssembler {
    fn assemble(
        &self,
        hands: &[Hand],
        handedness: &[Handedness],
    ) -> Result<FeatureVector, AssembleError>;
}

/// SIBI: solo la primera mano detectada
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHandAssembler;

impl FeatureAssembler for SingleHandAssembler {
    fn assemble(
        &self,
        hands: &[Hand],
        _handedness: &[Handedness],
    ) -> Result<FeatureVector, AssembleError> {
        let first = hands.first().ok_or(AssembleError::NoHands)?;
        Ok(featurize(first))
    }
}

/// BISINDO: [0, 210) mano izquierda, [210, 420) mano derecha.
///
/// Manos sin etiqueta de lateralidad emparejada se descartan. Cualquier
/// etiqueta distinta de "Left" va al hueco derecho. Con dos manos de la misma
/// etiqueta gana la última.
#[derive(Debug, Clone, Copy, Default)]
pub struct TwoHandAssembler;

impl FeatureAssembler for TwoHandAssembler {
    fn assemble(
        &self,
        hands: &[Hand],
        handedness: &[Handedness],
    ) -> Result<FeatureVector, AssembleError> {
        let mut full_features = vec![0.0; TWO_HAND_FEATURES];

        for (index, (hand, side)) in hands.iter().zip(handedness).enumerate() {
            let features = featurize(hand);
            if features.len() != HAND_FEATURES {
                return Err(AssembleError::HandSizeMismatch {
                    index,
                    expected: HAND_FEATURES,
                    actual: features.len(),
                });
            }

            let offset = if side.is_left() { 0 } else { HAND_FEATURES };
            full_features[offset..offset + HAND_FEATURES].copy_from_slice(&features);
        }

        Ok(full_features)
    }
}

/// Ensambla según el esquema
pub fn assemble(
    scheme: Scheme,
    hands: &[Hand],
    handedness: &[Handedness],
) -> Result<FeatureVector, AssembleError> {
    match scheme {
        Scheme::SingleHand => SingleHandAssembler.assemble(hands, handedness),
        Scheme::TwoHand => TwoHandAssembler.assemble(hands, handedness),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Landmark, LANDMARKS_PER_HAND};

    /// Mano sintética: puntos sobre una espiral desplazada por `offset`
    fn spiral_hand(offset: f32, scale: f32) -> Hand {
        (0..LANDMARKS_PER_HAND)
            .map(|i| {
                let t = i as f32 * 0.4;
                Landmark::new(
                    offset + scale * t.cos() * t,
                    offset + scale * t.sin() * t,
                    scale * 0.01 * i as f32,
                )
            })
            .collect()
    }

    #[test]
    fn test_single_hand_uses_first() {
        let hands = vec![spiral_hand(0.0, 1.0), spiral_hand(5.0, 3.0)];
        let features = assemble(Scheme::SingleHand, &hands, &[]).unwrap();
        assert_eq!(features.len(), HAND_FEATURES);
        assert_eq!(features, featurize(&hands[0]));
    }

    #[test]
    fn test_single_hand_without_hands() {
        assert_eq!(
            assemble(Scheme::SingleHand, &[], &[]),
            Err(AssembleError::NoHands)
        );
    }

    #[test]
    fn test_left_right_slots() {
        let hands = vec![spiral_hand(0.0, 1.0), spiral_hand(2.0, 0.5)];
        let handedness = vec![Handedness::left(), Handedness::right()];
        let features = assemble(Scheme::TwoHand, &hands, &handedness).unwrap();

        assert_eq!(features.len(), TWO_HAND_FEATURES);
        assert_eq!(&features[..HAND_FEATURES], featurize(&hands[0]).as_slice());
        assert_eq!(&features[HAND_FEATURES..], featurize(&hands[1]).as_slice());
    }

    #[test]
    fn test_slot_follows_label_not_position() {
        let hands = vec![spiral_hand(0.0, 1.0), spiral_hand(2.0, 0.5)];
        let handedness = vec![Handedness::right(), Handedness::left()];
        let features = assemble(Scheme::TwoHand, &hands, &handedness).unwrap();

        assert_eq!(&features[..HAND_FEATURES], featurize(&hands[1]).as_slice());
        assert_eq!(&features[HAND_FEATURES..], featurize(&hands[0]).as_slice());
    }

    #[test]
    fn test_duplicate_label_last_wins() {
        let hands = vec![spiral_hand(0.0, 1.0), spiral_hand(2.0, 0.5)];
        let handedness = vec![Handedness::right(), Handedness::right()];
        let features = assemble(Scheme::TwoHand, &hands, &handedness).unwrap();

        assert!(features[..HAND_FEATURES].iter().all(|&v| v == 0.0));
        assert_eq!(&features[HAND_FEATURES..], featurize(&hands[1]).as_slice());
    }

    #[test]
    fn test_unknown_label_goes_right() {
        let hands = vec![spiral_hand(0.0, 1.0)];
        let handedness = vec![Handedness::new("Unknown")];
        let features = assemble(Scheme::TwoHand, &hands, &handedness).unwrap();

        assert!(features[..HAND_FEATURES].iter().all(|&v| v == 0.0));
        assert_eq!(&features[HAND_FEATURES..], featurize(&hands[0]).as_slice());
    }

    #[test]
    fn test_hands_without_label_are_skipped() {
        let hands = vec![spiral_hand(0.0, 1.0), spiral_hand(2.0, 0.5)];
        let handedness = vec![Handedness::left()];
        let features = assemble(Scheme::TwoHand, &hands, &handedness).unwrap();

        assert_eq!(&features[..HAND_FEATURES], featurize(&hands[0]).as_slice());
        assert!(features[HAND_FEATURES..].iter().all(|&v| v == 0.0));

        // Sin etiquetas no se escribe nada
        let features = assemble(Scheme::TwoHand, &hands, &[]).unwrap();
        assert!(features.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_short_hand_rejected() {
        let mut hand = spiral_hand(0.0, 1.0);
        hand.truncate(20);
        let err = assemble(Scheme::TwoHand, &[hand], &[Handedness::left()]).unwrap_err();
        assert_eq!(
            err,
            AssembleError::HandSizeMismatch {
                index: 0,
                expected: 210,
                actual: 190,
            }
        );
    }
}
