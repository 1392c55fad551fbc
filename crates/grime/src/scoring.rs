//! mAP-50 scoring of predicted detections against ground truth.
//!
//! Per class: detections are sorted by descending confidence and greedily
//! matched to the unmatched same-image ground-truth box of highest IoU,
//! accepting matches at IoU >= 0.5. The precision/recall curve is integrated
//! with the precision envelope. Classes with zero ground-truth instances are
//! excluded from the mean, not scored as zero.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::detection::{Detection, GroundTruthBox};
use crate::error::{Error, Result};

pub const IOU_THRESHOLD: f64 = 0.5;

/// Average precision for one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassAp {
    pub class: String,
    pub ap: f64,
    pub n_truth: usize,
    pub n_detections: usize,
}

/// Dataset-level score: mAP-50 plus the per-class breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapScore {
    pub map50: f64,
    pub per_class: Vec<ClassAp>,
}

/// Compute mAP-50 for per-image predictions against per-image ground truth.
///
/// `predictions[i]` and `truth[i]` describe the same image; the two slices
/// must have equal length.
pub fn map50(predictions: &[Vec<Detection>], truth: &[Vec<GroundTruthBox>]) -> Result<MapScore> {
    if predictions.len() != truth.len() {
        return Err(Error::scoring(format!(
            "prediction/ground-truth image counts differ: {} vs {}",
            predictions.len(),
            truth.len()
        )));
    }
    validate_detections(predictions)?;

    let classes: BTreeSet<&str> = truth
        .iter()
        .flatten()
        .map(|t| t.class.as_str())
        .collect();
    if classes.is_empty() {
        return Err(Error::scoring("ground truth contains no annotated objects"));
    }

    let mut per_class = Vec::with_capacity(classes.len());
    for class in classes {
        per_class.push(class_ap(class, predictions, truth));
    }

    let map50 = per_class.iter().map(|c| c.ap).sum::<f64>() / per_class.len() as f64;
    Ok(MapScore { map50, per_class })
}

fn validate_detections(predictions: &[Vec<Detection>]) -> Result<()> {
    for (img_idx, dets) in predictions.iter().enumerate() {
        for det in dets {
            if !det.confidence.is_finite() || !(0.0..=1.0).contains(&det.confidence) {
                return Err(Error::scoring(format!(
                    "detection for class '{}' in image {} has confidence {} outside [0, 1]",
                    det.class, img_idx, det.confidence
                )));
            }
            if !det.bbox.is_valid() {
                return Err(Error::scoring(format!(
                    "detection for class '{}' in image {} has an invalid box",
                    det.class, img_idx
                )));
            }
        }
    }
    Ok(())
}

fn class_ap(class: &str, predictions: &[Vec<Detection>], truth: &[Vec<GroundTruthBox>]) -> ClassAp {
    // Ground-truth boxes of this class, per image, with match flags.
    let mut class_truth: Vec<Vec<(&GroundTruthBox, bool)>> = truth
        .iter()
        .map(|boxes| {
            boxes
                .iter()
                .filter(|t| t.class == class)
                .map(|t| (t, false))
                .collect()
        })
        .collect();
    let n_truth: usize = class_truth.iter().map(Vec::len).sum();

    // All detections of this class, sorted by descending confidence with a
    // deterministic (image, insertion order) tie-break.
    let mut dets: Vec<(usize, usize, &Detection)> = predictions
        .iter()
        .enumerate()
        .flat_map(|(img_idx, dets)| {
            dets.iter()
                .enumerate()
                .filter(|(_, d)| d.class == class)
                .map(move |(det_idx, d)| (img_idx, det_idx, d))
        })
        .collect();
    dets.sort_by(|a, b| {
        b.2.confidence
            .total_cmp(&a.2.confidence)
            .then(a.0.cmp(&b.0))
            .then(a.1.cmp(&b.1))
    });

    let mut tp_flags = Vec::with_capacity(dets.len());
    for (img_idx, _, det) in &dets {
        let candidates = &mut class_truth[*img_idx];
        let best = candidates
            .iter()
            .enumerate()
            .filter(|(_, (_, matched))| !matched)
            .map(|(i, (t, _))| (i, det.bbox.iou(&t.bbox)))
            .filter(|(_, iou)| *iou >= IOU_THRESHOLD)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match best {
            Some((i, _)) => {
                candidates[i].1 = true;
                tp_flags.push(true);
            }
            None => tp_flags.push(false),
        }
    }

    ClassAp {
        class: class.to_string(),
        ap: average_precision(&tp_flags, n_truth),
        n_truth,
        n_detections: tp_flags.len(),
    }
}

/// Precision-envelope AP over confidence-ordered true-positive flags.
fn average_precision(tp_flags: &[bool], n_truth: usize) -> f64 {
    if n_truth == 0 || tp_flags.is_empty() {
        return 0.0;
    }

    let mut precisions = Vec::with_capacity(tp_flags.len());
    let mut recalls = Vec::with_capacity(tp_flags.len());
    let mut tp_cum = 0usize;
    for (i, &tp) in tp_flags.iter().enumerate() {
        if tp {
            tp_cum += 1;
        }
        precisions.push(tp_cum as f64 / (i + 1) as f64);
        recalls.push(tp_cum as f64 / n_truth as f64);
    }

    // Monotone non-increasing precision envelope, from the right.
    for i in (0..precisions.len().saturating_sub(1)).rev() {
        precisions[i] = precisions[i].max(precisions[i + 1]);
    }

    let mut ap = 0.0;
    let mut prev_recall = 0.0;
    for (p, r) in precisions.iter().zip(&recalls) {
        ap += (r - prev_recall) * p;
        prev_recall = *r;
    }
    ap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::BoundingBox;
    use approx::assert_abs_diff_eq;

    fn gt(class: &str, x: f64) -> GroundTruthBox {
        GroundTruthBox::new(class, BoundingBox::new(x, 0.0, 10.0, 10.0))
    }

    fn det(class: &str, x: f64, conf: f32) -> Detection {
        Detection::new(class, BoundingBox::new(x, 0.0, 10.0, 10.0), conf)
    }

    #[test]
    fn perfect_predictions_score_one() {
        let truth = vec![vec![gt("cat", 0.0), gt("dog", 50.0)]];
        let preds = vec![vec![det("cat", 0.0, 0.9), det("dog", 50.0, 0.8)]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 1.0, epsilon = 1e-12);
        assert!(score.per_class.iter().all(|c| c.ap == 1.0));
    }

    #[test]
    fn zero_matching_detections_score_zero() {
        let truth = vec![vec![gt("cat", 0.0)]];
        let preds = vec![vec![det("cat", 500.0, 0.9)]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn no_detections_at_all_score_zero() {
        let truth = vec![vec![gt("cat", 0.0)]];
        let preds = vec![vec![]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn class_absent_from_ground_truth_is_excluded() {
        // "ghost" detections must not drag the mean down to 0.5.
        let truth = vec![vec![gt("cat", 0.0)]];
        let preds = vec![vec![det("cat", 0.0, 0.9), det("ghost", 0.0, 0.99)]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 1.0, epsilon = 1e-12);
        assert_eq!(score.per_class.len(), 1);
        assert_eq!(score.per_class[0].class, "cat");
    }

    #[test]
    fn mean_is_over_classes_not_boxes() {
        // cat: 2 boxes found perfectly; dog: 1 box missed. mAP = (1 + 0) / 2.
        let truth = vec![vec![gt("cat", 0.0), gt("cat", 50.0), gt("dog", 100.0)]];
        let preds = vec![vec![det("cat", 0.0, 0.9), det("cat", 50.0, 0.8)]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn envelope_integration_matches_hand_computation() {
        // Flags [FP, TP, TP] over 2 truths: envelope precision 2/3 at all
        // recall levels, AP = 2/3.
        let truth = vec![vec![gt("cat", 0.0), gt("cat", 50.0)]];
        let preds = vec![vec![
            det("cat", 500.0, 0.9),
            det("cat", 0.0, 0.8),
            det("cat", 50.0, 0.7),
        ]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn greedy_matching_consumes_each_truth_once() {
        // Two detections on one truth: the higher-confidence one matches,
        // the duplicate is a zero-recall-delta FP, AP stays 1.
        let truth = vec![vec![gt("cat", 0.0)]];
        let preds = vec![vec![det("cat", 0.0, 0.9), det("cat", 1.0, 0.5)]];
        let score = map50(&preds, &truth).unwrap();
        assert_abs_diff_eq!(score.map50, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn mismatched_image_counts_are_a_scoring_error() {
        let truth = vec![vec![gt("cat", 0.0)], vec![]];
        let preds = vec![vec![]];
        assert!(matches!(
            map50(&preds, &truth).unwrap_err(),
            Error::Scoring { .. }
        ));
    }

    #[test]
    fn out_of_range_confidence_is_a_scoring_error() {
        let truth = vec![vec![gt("cat", 0.0)]];
        let preds = vec![vec![det("cat", 0.0, 1.5)]];
        assert!(matches!(
            map50(&preds, &truth).unwrap_err(),
            Error::Scoring { .. }
        ));
    }

    #[test]
    fn empty_ground_truth_is_degenerate() {
        let truth: Vec<Vec<GroundTruthBox>> = vec![vec![], vec![]];
        let preds = vec![vec![], vec![]];
        assert!(map50(&preds, &truth).is_err());
    }
}
