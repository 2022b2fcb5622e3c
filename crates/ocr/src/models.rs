/// A point on a detection polygon, in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}
impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in image pixel coordinates.
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}
impl BoundingBox {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Smallest box that contains every point of `polygon`.
    pub fn from_polygon(polygon: &[Point]) -> Option<Self> {
        let first = polygon.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &polygon[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let bbox = Self {
            left: min_x.floor().max(0.0) as i32,
            top: min_y.floor().max(0.0) as i32,
            right: max_x.ceil().max(0.0) as i32,
            bottom: max_y.ceil().max(0.0) as i32,
        };
        (bbox.width() > 0 && bbox.height() > 0).then_some(bbox)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Union rectangle of both boxes.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Overlap of the two vertical spans divided by the smaller height.
    pub fn vertical_overlap_ratio(&self, other: &Self) -> f32 {
        let overlap = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0);
        let smaller = self.height().min(other.height());
        if smaller <= 0 {
            return 0.0;
        }
        overlap as f32 / smaller as f32
    }

    /// Distance between the two horizontal spans; negative when they overlap.
    pub fn horizontal_gap(&self, other: &Self) -> i32 {
        self.left.max(other.left) - self.right.min(other.right)
    }

    /// The four corners, clockwise from top-left.
    pub fn corners(&self) -> Vec<Point> {
        let (l, t, r, b) = (self.left as f32, self.top as f32, self.right as f32, self.bottom as f32);
        vec![Point::new(l, t), Point::new(r, t), Point::new(r, b), Point::new(l, b)]
    }
}

/// One text detection as produced by an OCR engine (and, after preparation,
/// with normalized text).
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub polygon: Vec<Point>,
    pub text: String,
    pub confidence: f32,
}
impl Detection {
    pub fn new(polygon: Vec<Point>, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            polygon,
            text: text.into(),
            confidence,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_polygon(&self.polygon)
    }
}

/// A translatable unit: one or more detections merged into a single box.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub bbox: BoundingBox,
    pub text: String,
    pub confidence: f32,
}

/// Stable fingerprint of a merged region list.
///
/// Changes whenever merging produces different units, so translations cached
/// against an older grouping are never reused.
pub fn fingerprint(regions: &[Region]) -> String {
    let mut hasher = blake3::Hasher::new();
    for region in regions {
        let BoundingBox { left, top, right, bottom } = region.bbox;
        for n in [left, top, right, bottom] {
            hasher.update(&n.to_le_bytes());
        }
        hasher.update(&(region.text.len() as u64).to_le_bytes());
        hasher.update(region.text.as_bytes());
    }
    hasher.finalize().to_string()
}
