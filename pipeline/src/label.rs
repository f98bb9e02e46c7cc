use graphclass_core::graph::GraphClass;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LabelError {
    #[error("expected {expected} class scores, got {actual}")]
    WrongScoreCount { expected: usize, actual: usize },
    #[error("class score {index} is NaN")]
    NotANumber { index: usize },
}

/// Arg-max over the class scores, first index wins ties.
pub fn select_label(scores: &[f32]) -> Result<GraphClass, LabelError> {
    if scores.len() != GraphClass::ALL.len() {
        return Err(LabelError::WrongScoreCount {
            expected: GraphClass::ALL.len(),
            actual: scores.len(),
        });
    }
    if let Some(index) = scores.iter().position(|s| s.is_nan()) {
        return Err(LabelError::NotANumber { index });
    }

    let mut best = 0;
    for (index, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = index;
        }
    }

    GraphClass::from_index(best).ok_or(LabelError::WrongScoreCount {
        expected: GraphClass::ALL.len(),
        actual: scores.len(),
    })
}
