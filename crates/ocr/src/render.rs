//! Paint translated text over the original regions.

use crate::face::Typeface;
use crate::models::{BoundingBox, Region};
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use verso_lang::script::is_unspaced_text;

/// Smallest font size, in pixels, that is still drawn.
pub const MIN_FONT_SIZE: u32 = 8;
/// Offset outside each bbox corner used to sample the background.
const SAMPLE_MARGIN: i32 = 2;
/// Backgrounds brighter than this get black text, others white.
const LUMINANCE_THRESHOLD: f32 = 128.0;
const ELLIPSIS: char = '…';

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Text fitted into a box: the chosen size and the lines to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub size: f32,
    pub line_height: f32,
    pub lines: Vec<String>,
}

/// Average of the four pixels just outside the bbox corners, clamped to the image.
pub fn sample_background(image: &RgbaImage, bbox: &BoundingBox) -> Rgba<u8> {
    let max_x = image.width().saturating_sub(1) as i32;
    let max_y = image.height().saturating_sub(1) as i32;
    let xs = [bbox.left - SAMPLE_MARGIN, bbox.right + SAMPLE_MARGIN];
    let ys = [bbox.top - SAMPLE_MARGIN, bbox.bottom + SAMPLE_MARGIN];
    let mut sum = [0u32; 4];
    for y in ys {
        for x in xs {
            let px = image.get_pixel(x.clamp(0, max_x) as u32, y.clamp(0, max_y) as u32);
            for (acc, channel) in sum.iter_mut().zip(px.0) {
                *acc += u32::from(channel);
            }
        }
    }
    Rgba(sum.map(|total| (total / 4) as u8))
}

/// Black or white, whichever contrasts with `background`.
pub fn contrast_color(background: Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, _] = background.0;
    let luminance = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    if luminance > LUMINANCE_THRESHOLD { BLACK } else { WHITE }
}

/// Greedy line breaking at `size`, decided per token: words are kept whole,
/// while a run in a script written without spaces is broken between
/// characters once it overflows.
pub fn wrap(face: &dyn Typeface, text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() { word.to_string() } else { format!("{current} {word}") };
        if face.text_width(&candidate, size) <= max_width {
            current = candidate;
        } else if is_unspaced_text(word) {
            if !current.is_empty() {
                current.push(' ');
            }
            for ch in word.chars() {
                current.push(ch);
                if face.text_width(&current, size) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current).trim_end().to_string());
                    current.push(ch);
                }
            }
        } else {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn fits(face: &dyn Typeface, lines: &[String], size: f32, width: f32, height: f32) -> bool {
    let block = face.line_height(size) * lines.len() as f32;
    block <= height && lines.iter().all(|line| face.text_width(line, size) <= width)
}

/// Shorten `line` one character at a time, appending an ellipsis, until it
/// fits `width`. Gives up at the bare ellipsis.
fn truncate(face: &dyn Typeface, line: &str, size: f32, width: f32) -> String {
    if face.text_width(line, size) <= width {
        return line.to_string();
    }
    let mut chars: Vec<char> = line.chars().collect();
    while !chars.is_empty() {
        chars.pop();
        let mut candidate = chars.iter().collect::<String>().trim_end().to_string();
        candidate.push(ELLIPSIS);
        if face.text_width(&candidate, size) <= width {
            return candidate;
        }
    }
    ELLIPSIS.to_string()
}

/// Find the largest size in `MIN_FONT_SIZE..=max(MIN_FONT_SIZE, bbox height)`
/// at which the wrapped text fits the box. If nothing fits, fall back to the
/// minimum size, drop trailing lines until the block fits the height (keeping
/// at least one), then truncate any line that is still too wide.
pub fn fit(face: &dyn Typeface, text: &str, bbox: &BoundingBox) -> Layout {
    let width = bbox.width() as f32;
    let height = bbox.height() as f32;
    let (mut lo, mut hi) = (MIN_FONT_SIZE, MIN_FONT_SIZE.max(bbox.height().max(0) as u32));
    let mut best = None;
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let size = mid as f32;
        let lines = wrap(face, text, size, width);
        if fits(face, &lines, size, width, height) {
            best = Some(Layout {
                size,
                line_height: face.line_height(size),
                lines,
            });
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }
    if let Some(layout) = best {
        return layout;
    }

    let size = MIN_FONT_SIZE as f32;
    let line_height = face.line_height(size);
    let mut lines = wrap(face, text, size, width);
    while lines.len() > 1 && line_height * lines.len() as f32 > height {
        lines.pop();
    }
    let lines = lines.iter().map(|line| truncate(face, line, size, width)).collect();
    Layout { size, line_height, lines }
}

/// Cover `region` with its sampled background and draw `text` centered in it.
///
/// The background is sampled from `source` so that earlier fills on `canvas`
/// never bleed into the sample of a neighbouring region.
pub fn paint(canvas: &mut RgbaImage, source: &RgbaImage, face: &dyn Typeface, region: &Region, text: &str) {
    let bbox = &region.bbox;
    let background = sample_background(source, bbox);
    let (w, h) = (bbox.width().max(1) as u32, bbox.height().max(1) as u32);
    draw_filled_rect_mut(canvas, Rect::at(bbox.left, bbox.top).of_size(w, h), background);

    let layout = fit(face, text, bbox);
    let color = contrast_color(background);
    let block = layout.line_height * layout.lines.len() as f32;
    let mut y = bbox.top as f32 + (bbox.height() as f32 - block) / 2.0;
    for line in &layout.lines {
        let line_width = face.text_width(line, layout.size);
        let x = bbox.left as f32 + (bbox.width() as f32 - line_width) / 2.0;
        face.draw(canvas, line, x.round() as i32, y.round() as i32, layout.size, color);
        y += layout.line_height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::FixedFace;
    use rstest::rstest;

    #[rstest]
    #[case(Rgba([255, 255, 255, 255]), BLACK)]
    #[case(Rgba([0, 0, 0, 255]), WHITE)]
    #[case(Rgba([200, 200, 0, 255]), BLACK)]
    #[case(Rgba([0, 0, 255, 255]), WHITE)]
    #[case(Rgba([127, 127, 127, 255]), WHITE)]
    fn test_contrast(#[case] background: Rgba<u8>, #[case] expected: Rgba<u8>) {
        assert_eq!(contrast_color(background), expected);
    }

    #[test]
    fn test_background_is_average_of_outside_corners() {
        let mut image = RgbaImage::from_pixel(40, 40, Rgba([100, 100, 100, 255]));
        image.put_pixel(8, 8, Rgba([200, 0, 0, 255]));
        image.put_pixel(32, 8, Rgba([0, 200, 0, 255]));
        let bbox = BoundingBox::new(10, 10, 30, 30);
        assert_eq!(sample_background(&image, &bbox), Rgba([100, 100, 50, 255]));
    }

    #[test]
    fn test_background_sampling_clamps_to_image() {
        let image = RgbaImage::from_pixel(10, 10, Rgba([9, 9, 9, 255]));
        let bbox = BoundingBox::new(0, 0, 10, 10);
        assert_eq!(sample_background(&image, &bbox), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn test_word_wrap_breaks_between_words() {
        // FixedFace advances size/2 per char: 10 px at size 20.
        let face = FixedFace;
        let lines = wrap(&face, "aaa bbb ccc", 20.0, 75.0);
        assert_eq!(lines, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn test_character_wrap_for_unspaced_scripts() {
        let face = FixedFace;
        let lines = wrap(&face, "这是中文内容", 20.0, 40.0);
        assert_eq!(lines, vec!["这是中文", "内容"]);
    }

    #[test]
    fn test_character_wrap_survives_spaces_in_unspaced_text() {
        let face = FixedFace;
        // 10 px per char at size 20; the second run alone is 90 px.
        let lines = wrap(&face, "出口 这是很长的中文句子", 20.0, 40.0);
        assert_eq!(lines, vec!["出口 这", "是很长的", "中文句子"]);
        assert!(lines.iter().all(|line| face.text_width(line, 20.0) <= 40.0));
    }

    #[test]
    fn test_fit_keeps_whole_text_of_spaced_unspaced_runs() {
        let face = FixedFace;
        let text = "第一章 这是一段没有空格的很长的中文文本";
        let layout = fit(&face, text, &BoundingBox::new(0, 0, 60, 120));
        let drawn = layout.lines.concat().replace(' ', "");
        assert_eq!(drawn, text.replace(' ', ""));
        assert!(!drawn.contains(ELLIPSIS));
    }

    #[test]
    fn test_fit_picks_largest_size_that_fits() {
        let face = FixedFace;
        // 5 chars at size s is 2.5 * s wide; line height is s.
        let layout = fit(&face, "Hello", &BoundingBox::new(0, 0, 100, 30));
        assert_eq!(layout.size, 30.0);
        assert_eq!(layout.lines, vec!["Hello"]);
        let layout = fit(&face, "Hello", &BoundingBox::new(0, 0, 50, 30));
        assert_eq!(layout.size, 20.0);
    }

    #[test]
    fn test_fit_wraps_before_shrinking_too_far() {
        let face = FixedFace;
        let layout = fit(&face, "one two", &BoundingBox::new(0, 0, 40, 40));
        // "one two" at 20 is 70 wide; wrapped to two lines it is 30 wide, 40 tall.
        assert_eq!(layout.size, 20.0);
        assert_eq!(layout.lines, vec!["one", "two"]);
    }

    #[test]
    fn test_overflow_drops_trailing_lines() {
        let face = FixedFace;
        let layout = fit(&face, "alpha beta gamma delta", &BoundingBox::new(0, 0, 20, 10));
        assert_eq!(layout.size, MIN_FONT_SIZE as f32);
        assert_eq!(layout.lines, vec!["alpha"]);
    }

    #[test]
    fn test_overflowing_single_line_is_truncated_with_ellipsis() {
        let face = FixedFace;
        let layout = fit(&face, "extraordinary", &BoundingBox::new(0, 0, 20, 10));
        assert_eq!(layout.lines, vec!["extr…"]);
        assert!(face.text_width(&layout.lines[0], layout.size) <= 20.0);
    }

    #[test]
    fn test_paint_fills_region_and_draws_text() {
        let source = RgbaImage::from_pixel(120, 60, Rgba([250, 250, 250, 255]));
        let mut canvas = source.clone();
        let region = Region {
            bbox: BoundingBox::new(10, 10, 110, 50),
            text: "source".into(),
            confidence: 0.9,
        };
        paint(&mut canvas, &source, &FixedFace, &region, "Hi");
        // Text pixels are black on a light background.
        assert!(canvas.pixels().any(|p| *p == BLACK));
        // Outside the region is untouched.
        assert_eq!(*canvas.get_pixel(2, 2), Rgba([250, 250, 250, 255]));
    }
}
