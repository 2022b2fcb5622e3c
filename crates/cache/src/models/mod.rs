mod facet;

pub(crate) use self::facet::{decode_detections, decode_translations, encode_detections, encode_translations};
