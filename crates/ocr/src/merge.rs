//! Merge same-line detections into translatable units.

use crate::models::{Detection, Region};
use verso_lang::script::is_cjk_text;

/// Minimum vertical overlap, relative to the smaller height, for two boxes
/// to count as the same line.
pub const MIN_VERTICAL_OVERLAP: f32 = 0.5;
/// Floor for the horizontal gap allowance, in pixels.
pub const MIN_GAP_PX: i32 = 24;
/// Gap allowance as a multiple of the larger box height.
pub const GAP_HEIGHT_FACTOR: f32 = 1.5;

fn can_merge(unit: &Region, next: &Region) -> bool {
    if unit.bbox.vertical_overlap_ratio(&next.bbox) < MIN_VERTICAL_OVERLAP {
        return false;
    }
    let tallest = unit.bbox.height().max(next.bbox.height());
    let allowance = MIN_GAP_PX.max((GAP_HEIGHT_FACTOR * tallest as f32) as i32);
    unit.bbox.horizontal_gap(&next.bbox) <= allowance
}

fn join(left: &str, right: &str) -> String {
    if is_cjk_text(left) && is_cjk_text(right) {
        format!("{left}{right}")
    } else {
        format!("{left} {right}")
    }
}

fn absorb(unit: &mut Region, next: Region) {
    unit.text = if next.bbox.left < unit.bbox.left {
        join(&next.text, &unit.text)
    } else {
        join(&unit.text, &next.text)
    };
    unit.bbox = unit.bbox.union(&next.bbox);
    unit.confidence = unit.confidence.min(next.confidence);
}

/// Merge detections into regions.
///
/// Detections are visited in `(top, left)` order. Each one joins the running
/// unit when the two share a line and sit close enough horizontally,
/// otherwise it starts a new unit. Detections without a usable bounding box
/// are dropped.
pub fn merge(detections: &[Detection]) -> Vec<Region> {
    let mut regions: Vec<Region> = detections
        .iter()
        .filter_map(|d| {
            Some(Region {
                bbox: d.bbox()?,
                text: d.text.clone(),
                confidence: d.confidence,
            })
        })
        .collect();
    regions.sort_by_key(|r| (r.bbox.top, r.bbox.left));

    let mut merged: Vec<Region> = Vec::with_capacity(regions.len());
    for region in regions {
        match merged.last_mut() {
            Some(unit) if can_merge(unit, &region) => absorb(unit, region),
            _ => merged.push(region),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, Point};
    use rstest::rstest;

    fn detection(text: &str, left: f32, top: f32, right: f32, bottom: f32, confidence: f32) -> Detection {
        Detection::new(
            vec![
                Point::new(left, top),
                Point::new(right, top),
                Point::new(right, bottom),
                Point::new(left, bottom),
            ],
            text,
            confidence,
        )
    }

    #[test]
    fn test_same_row_merges_into_union() {
        let merged = merge(&[
            detection("Hello", 10.0, 10.0, 60.0, 30.0, 0.9),
            detection("world", 70.0, 12.0, 120.0, 32.0, 0.8),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].bbox, BoundingBox::new(10, 10, 120, 32));
        assert_eq!(merged[0].text, "Hello world");
        assert_eq!(merged[0].confidence, 0.8);
    }

    #[rstest]
    #[case("中文", "标题", "中文标题")]
    #[case("日本", "語です", "日本語です")]
    #[case("中文", "Title", "中文 Title")]
    #[case("Chapter", "一", "Chapter 一")]
    #[case("Hello", "world", "Hello world")]
    fn test_separator_rule(#[case] left: &str, #[case] right: &str, #[case] expected: &str) {
        let merged = merge(&[
            detection(left, 0.0, 0.0, 40.0, 20.0, 0.9),
            detection(right, 45.0, 0.0, 90.0, 20.0, 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, expected);
    }

    #[test]
    fn test_distant_fragments_stay_apart() {
        // Height 20 gives an allowance of max(24, 30) = 30.
        let merged = merge(&[
            detection("left", 0.0, 0.0, 40.0, 20.0, 0.9),
            detection("right", 71.0, 0.0, 110.0, 20.0, 0.9),
        ]);
        assert_eq!(merged.len(), 2);
        let merged = merge(&[
            detection("left", 0.0, 0.0, 40.0, 20.0, 0.9),
            detection("right", 70.0, 0.0, 110.0, 20.0, 0.9),
        ]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_separate_lines_stay_apart() {
        let merged = merge(&[
            detection("line one", 0.0, 0.0, 100.0, 20.0, 0.9),
            detection("line two", 0.0, 25.0, 100.0, 45.0, 0.9),
        ]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "line one");
        assert_eq!(merged[1].text, "line two");
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let merged = merge(&[
            detection("world", 70.0, 12.0, 120.0, 32.0, 0.8),
            detection("Hello", 10.0, 10.0, 60.0, 30.0, 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Hello world");
    }

    #[test]
    fn test_lower_but_leftward_fragment_keeps_reading_order() {
        let merged = merge(&[
            detection("world", 60.0, 0.0, 100.0, 20.0, 0.9),
            detection("Hello", 10.0, 2.0, 50.0, 22.0, 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "Hello world");
        assert_eq!(merged[0].bbox, BoundingBox::new(10, 0, 100, 22));
    }

    #[test]
    fn test_empty_input() {
        assert!(merge(&[]).is_empty());
    }
}
