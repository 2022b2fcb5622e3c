use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use facet_json::{from_str as from_json, to_string as to_json};
use verso_ocr::{Detection, Point};

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct PointProxy {
    x: f32,
    y: f32,
}
impl From<&Point> for PointProxy {
    fn from(point: &Point) -> Self {
        Self { x: point.x, y: point.y }
    }
}
impl From<PointProxy> for Point {
    fn from(point: PointProxy) -> Self {
        Point::new(point.x, point.y)
    }
}

#[derive(facet::Facet)]
#[cfg_attr(test, derive(Debug, PartialEq))]
pub(crate) struct DetectionProxy {
    #[facet(rename = "p")]
    polygon: Vec<PointProxy>,
    #[facet(rename = "t")]
    text: String,
    #[facet(rename = "c")]
    confidence: f32,
}
impl From<&Detection> for DetectionProxy {
    fn from(detection: &Detection) -> Self {
        Self {
            polygon: detection.polygon.iter().map(Into::into).collect(),
            text: detection.text.clone(),
            confidence: detection.confidence,
        }
    }
}
impl From<DetectionProxy> for Detection {
    fn from(detection: DetectionProxy) -> Self {
        Detection::new(
            detection.polygon.into_iter().map(Into::into).collect(),
            detection.text,
            detection.confidence,
        )
    }
}

pub(crate) fn encode_detections(detections: &[Detection]) -> Result<String> {
    let proxies: Vec<DetectionProxy> = detections.iter().map(Into::into).collect();
    to_json(&proxies).or_raise(|| ErrorKind::InvalidData)
}

pub(crate) fn decode_detections(json: &str) -> Result<Vec<Detection>> {
    let proxies = from_json::<Vec<DetectionProxy>>(json).or_raise(|| ErrorKind::InvalidData)?;
    Ok(proxies.into_iter().map(Into::into).collect())
}

pub(crate) fn encode_translations(translations: &[String]) -> Result<String> {
    to_json(&translations.to_vec()).or_raise(|| ErrorKind::InvalidData)
}

pub(crate) fn decode_translations(json: &str) -> Result<Vec<String>> {
    from_json::<Vec<String>>(json).or_raise(|| ErrorKind::InvalidData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn square(text: &str, confidence: f32) -> Detection {
        let polygon = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        Detection::new(polygon, text, confidence)
    }

    #[test]
    fn test_detection_serialize() {
        let json = to_json(&DetectionProxy::from(&Detection::new(vec![Point::new(1.5, 2.5)], "猫", 0.5))).unwrap();
        assert_eq!(json.as_str(), r#"{"p":[{"x":1.5,"y":2.5}],"t":"猫","c":0.5}"#);
    }

    #[test]
    fn test_detection_deserialize() {
        let obj = from_json::<DetectionProxy>(r#"{"p":[{"x":1,"y":2.5}],"t":"猫","c":0.5}"#).unwrap();
        assert_eq!(Detection::from(obj), Detection::new(vec![Point::new(1.0, 2.5)], "猫", 0.5));
    }

    #[test]
    fn test_detections_survive_storage() {
        let detections = vec![square("第一", 0.9), square("second line", 0.25)];
        let json = encode_detections(&detections).unwrap();
        assert_eq!(decode_detections(&json).unwrap(), detections);
    }

    #[rstest]
    #[case(vec![], "[]")]
    #[case(vec!["one".to_string(), "".to_string()], r#"["one",""]"#)]
    fn test_translations_serialize(#[case] input: Vec<String>, #[case] expected: &str) {
        assert_eq!(encode_translations(&input).unwrap(), expected);
    }

    #[rstest]
    #[case("not json")]
    #[case(r#"{"p":1}"#)]
    fn test_garbage_is_invalid_data(#[case] input: &str) {
        let err = decode_detections(input).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidData));
    }
}
