//! Greedy (argmax) decoding, one hypothesis per source.

use burn::prelude::*;

use super::beam::{step_log_probs, top_k};
use crate::error::{NmtError, Result};
use crate::vocab::PaddedBatch;
use crate::model::NmtModel;

/// Decode `src_ids` by always taking the most likely next token.
///
/// Returns target ids without `<start>` or `<end>`, at most
/// `max_target_length` of them. `<pad>` and `<start>` are never picked.
pub fn greedy_decode<B: Backend>(
    model: &NmtModel<B>,
    src_ids: &[usize],
    max_target_length: usize,
) -> Result<Vec<usize>> {
    if max_target_length == 0 {
        return Err(NmtError::InvalidBeam(
            "max_target_length must be at least 1".into(),
        ));
    }

    let device = model.device();
    let source = PaddedBatch::from_ids(&[src_ids.to_vec()], model.pad_id())?;
    let encoded = model.encode(&source)?;

    let mut state = encoded.state;
    let mut h_prev = Tensor::<B, 2>::zeros([1, model.hidden_size()], &device);
    let mut token = model.start_id();
    let mut output = Vec::new();

    for _ in 0..max_target_length {
        let tokens = Tensor::<B, 1, Int>::from_data(TensorData::new(vec![token as i64], [1]), &device);
        let step = model.decode_step(tokens, h_prev, &state, &encoded.memory);
        let log_probs = step_log_probs(model, step.fused.clone())?;

        token = match top_k(&log_probs, 1).first() {
            Some(&(id, _)) => id,
            None => break,
        };
        if token == model.end_id() {
            break;
        }
        output.push(token);
        h_prev = step.fused;
        state = step.state;
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NmtConfig;
    use crate::inference::beam::{beam_search, BeamConfig};
    use crate::vocab::{Vocab, VocabPair};
    use burn::backend::NdArray;

    type B = NdArray;

    fn model() -> NmtModel<B> {
        let words = |s: &str| s.split_whitespace().map(String::from).collect::<Vec<_>>();
        let vocab = VocabPair::new(Vocab::from(words("a b c")), Vocab::from(words("x y z")));
        NmtConfig::new()
            .with_embed_size(4)
            .with_hidden_size(5)
            .with_window_size_d(3)
            .with_dropout_rate(0.0)
            .init(&vocab, &Default::default())
            .unwrap()
    }

    #[test]
    fn bounded_by_max_length() {
        let model = model();
        let out = greedy_decode(&model, &[4, 5, 6], 3).unwrap();
        assert!(out.len() <= 3);
        assert!(!out.contains(&model.end_id()));
    }

    #[test]
    fn agrees_with_single_beam() {
        let model = model();
        let greedy = greedy_decode(&model, &[4, 6], 6).unwrap();
        let beam = beam_search(
            &model,
            &[4, 6],
            &BeamConfig {
                search_size: 1,
                max_target_length: 6,
            },
        )
        .unwrap();
        assert_eq!(beam.hypotheses[0].tokens, greedy);
    }

    #[test]
    fn only_unk_left_to_emit() {
        let vocab = VocabPair::new(Vocab::from(vec!["a".to_string()]), Vocab::new());
        let model = NmtConfig::new()
            .with_embed_size(4)
            .with_hidden_size(5)
            .with_window_size_d(3)
            .init::<B>(&vocab, &Default::default())
            .unwrap();
        let out = greedy_decode(&model, &[4], 8).unwrap();
        assert!(out.iter().all(|&t| t == vocab.tar.unk_id()));
    }

    #[test]
    fn out_of_vocabulary_source_rejected() {
        assert!(matches!(
            greedy_decode(&model(), &[4, 7], 3),
            Err(NmtError::TokenOutOfRange { index: 0, id: 7, vocab: 7 })
        ));
    }

    #[test]
    fn zero_length_rejected() {
        assert!(greedy_decode(&model(), &[4], 0).is_err());
    }
}
