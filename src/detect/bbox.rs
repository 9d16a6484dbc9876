use serde::Serialize;

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

impl BoundingBox {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build a corner-form box from center-form `(cx, cy, w, h)`.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Scale x coordinates by `sx` and y coordinates by `sy`.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self::new(self.xmin * sx, self.ymin * sy, self.xmax * sx, self.ymax * sy)
    }

    pub fn width(&self) -> f32 {
        (self.xmax - self.xmin).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.ymax - self.ymin).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection(&self, other: &Self) -> f32 {
        let xmin = self.xmin.max(other.xmin);
        let ymin = self.ymin.max(other.ymin);
        let xmax = self.xmax.min(other.xmax);
        let ymax = self.ymax.min(other.ymax);
        (xmax - xmin).max(0.0) * (ymax - ymin).max(0.0)
    }

    /// Intersection-over-union. Two zero-area boxes have an IOU of zero.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection(other);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Greedy non-max suppression.
///
/// Returns indices into `boxes` in acceptance order (descending score). The
/// highest-scoring remaining box is accepted on each round and every remaining
/// box whose IOU with it is strictly greater than `iou_threshold` is discarded
/// for good. On equal scores the lower index is accepted first.
pub fn non_max_suppression(boxes: &[BoundingBox], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    debug_assert_eq!(boxes.len(), scores.len());
    let count = boxes.len().min(scores.len());

    // Ascending by score; among ties the lower index sits last so it pops first.
    let mut remaining: Vec<usize> = (0..count).collect();
    remaining.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]).then(b.cmp(&a)));

    let mut keep = Vec::new();
    while let Some(best) = remaining.pop() {
        keep.push(best);
        let accepted = boxes[best];
        remaining.retain(|&idx| accepted.iou(&boxes[idx]) <= iou_threshold);
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cluster() -> (Vec<BoundingBox>, Vec<f32>) {
        let boxes = vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(1.0, 1.0, 11.0, 11.0),
            BoundingBox::new(5.0, 0.0, 15.0, 10.0),
            BoundingBox::new(40.0, 40.0, 50.0, 50.0),
            BoundingBox::new(42.0, 41.0, 52.0, 51.0),
            BoundingBox::new(8.0, 8.0, 20.0, 20.0),
            BoundingBox::new(100.0, 0.0, 100.0, 30.0),
        ];
        let scores = vec![0.9, 0.8, 0.7, 0.6, 0.95, 0.3, 0.5];
        (boxes, scores)
    }

    #[test]
    fn iou_identical_boxes_is_one() {
        let b = BoundingBox::new(2.0, 3.0, 12.0, 9.0);
        assert!((b.iou(&b) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn iou_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(20.0, 0.0, 30.0, 10.0);
        assert_eq!(a.iou(&b), 0.0);
        let c = BoundingBox::new(0.0, 20.0, 10.0, 30.0);
        assert_eq!(a.iou(&c), 0.0);
    }

    #[test]
    fn iou_of_zero_area_boxes_is_zero() {
        let point = BoundingBox::new(5.0, 5.0, 5.0, 5.0);
        let line = BoundingBox::new(5.0, 0.0, 5.0, 10.0);
        assert_eq!(point.iou(&point), 0.0);
        assert_eq!(point.iou(&line), 0.0);
        assert_eq!(line.area(), 0.0);
    }

    #[test]
    fn iou_partial_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn nms_keeps_highest_of_identical_boxes() {
        let b = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        let keep = non_max_suppression(&[b, b], &[0.5, 0.9], 0.45);
        assert_eq!(keep, vec![1]);
    }

    #[test]
    fn nms_keeps_disjoint_boxes_at_any_threshold() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(20.0, 20.0, 30.0, 30.0),
        ];
        for threshold in [0.0, 0.1, 0.45, 0.9, 1.0] {
            let keep = non_max_suppression(&boxes, &[0.3, 0.7], threshold);
            assert_eq!(keep, vec![1, 0], "threshold {}", threshold);
        }
    }

    #[test]
    fn nms_orders_by_descending_score() {
        let (boxes, scores) = sample_cluster();
        let keep = non_max_suppression(&boxes, &scores, 0.45);
        assert_eq!(keep, vec![4, 0, 2, 6, 5]);
        for pair in keep.windows(2) {
            assert!(scores[pair[0]] >= scores[pair[1]]);
        }
    }

    #[test]
    fn nms_suppression_is_permanent() {
        // B overlaps A heavily and is removed; C overlaps only B and survives
        // even though B would have suppressed it.
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(3.0, 0.0, 13.0, 10.0),
            BoundingBox::new(9.0, 0.0, 19.0, 10.0),
        ];
        let keep = non_max_suppression(&boxes, &[0.9, 0.8, 0.7], 0.45);
        assert_eq!(keep, vec![0, 2]);
    }

    #[test]
    fn nms_ties_prefer_lower_index() {
        let b = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let keep = non_max_suppression(&[b, b, b], &[0.6, 0.6, 0.6], 0.45);
        assert_eq!(keep, vec![0]);
    }

    #[test]
    fn nms_is_idempotent() {
        let (boxes, scores) = sample_cluster();
        let keep = non_max_suppression(&boxes, &scores, 0.45);
        let kept_boxes: Vec<BoundingBox> = keep.iter().map(|&i| boxes[i]).collect();
        let kept_scores: Vec<f32> = keep.iter().map(|&i| scores[i]).collect();
        let again = non_max_suppression(&kept_boxes, &kept_scores, 0.45);
        assert_eq!(again, (0..kept_boxes.len()).collect::<Vec<_>>());
    }

    #[test]
    fn nms_lower_threshold_never_keeps_more() {
        let (boxes, scores) = sample_cluster();
        let thresholds = [1.0, 0.9, 0.7, 0.5, 0.45, 0.3, 0.2, 0.1, 0.05, 0.0];
        let mut previous = usize::MAX;
        for threshold in thresholds {
            let kept = non_max_suppression(&boxes, &scores, threshold).len();
            assert!(kept <= previous, "threshold {} kept {}", threshold, kept);
            previous = kept;
        }
    }

    #[test]
    fn nms_empty_input() {
        assert!(non_max_suppression(&[], &[], 0.45).is_empty());
    }
}
