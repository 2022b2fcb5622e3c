use crate::toc::TocNode;
use std::collections::BTreeMap;

/// One translatable document section, usually a chapter file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUnit {
    /// Manifest identifier, unique within the book.
    pub id: String,
    /// Path of the unit inside the container.
    pub href: String,
    pub content: Vec<u8>,
    /// Container paths of the stylesheets this unit links.
    pub stylesheets: Vec<String>,
}

impl ContentUnit {
    pub fn new(id: impl Into<String>, href: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            content: content.into(),
            stylesheets: Vec::new(),
        }
    }

    /// Link `href` from this unit unless it already is.
    pub fn link_stylesheet(&mut self, href: &str) {
        if !self.stylesheets.iter().any(|s| s == href) {
            self.stylesheets.push(href.to_string());
        }
    }
}

/// An image embedded in the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    /// Path of the image inside the container.
    pub name: String,
    pub media_type: String,
    pub content: Vec<u8>,
}

impl ImageAsset {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub href: String,
    pub content: String,
}

/// Descriptive metadata fields that carry prose worth translating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetadataField {
    Title,
    Description,
    Subject,
}

impl MetadataField {
    pub const ALL: [Self; 3] = [Self::Title, Self::Description, Self::Subject];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Description => "description",
            Self::Subject => "subject",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    pub language: Option<String>,
    /// Every field may repeat (several subjects, alternate titles).
    pub fields: BTreeMap<MetadataField, Vec<String>>,
}

impl Metadata {
    pub fn values(&self, field: MetadataField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn push(&mut self, field: MetadataField, value: impl Into<String>) {
        self.fields.entry(field).or_default().push(value.into());
    }
}

/// `(original, translated)` pairs per metadata field.
pub type MetadataChanges = BTreeMap<MetadataField, Vec<(String, String)>>;

/// A loaded document, held fully in memory between load and save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Book {
    /// Content units in reading order.
    pub units: Vec<ContentUnit>,
    pub images: Vec<ImageAsset>,
    pub stylesheets: Vec<Stylesheet>,
    pub metadata: Metadata,
    pub toc: Vec<TocNode>,
}

impl Book {
    /// Content units in reading order.
    pub fn content_units(&self) -> &[ContentUnit] {
        &self.units
    }

    pub fn update_metadata_language(&mut self, language: &str) {
        self.metadata.language = Some(language.to_string());
    }

    /// Replace every non-blank translatable metadata value with
    /// `translate(value)`, returning what changed per field.
    pub fn translate_metadata(&mut self, mut translate: impl FnMut(&str) -> String) -> MetadataChanges {
        let mut changes = MetadataChanges::new();
        for field in MetadataField::ALL {
            let Some(values) = self.metadata.fields.get_mut(&field) else {
                continue;
            };
            for value in values.iter_mut().filter(|v| !v.trim().is_empty()) {
                let translated = translate(value);
                let original = std::mem::replace(value, translated.clone());
                changes.entry(field).or_default().push((original, translated));
            }
        }
        changes
    }

    /// Rewrite every TOC title, at any depth, with `translate(title)`.
    pub fn update_toc_labels(&mut self, mut translate: impl FnMut(&str) -> String) {
        for node in &mut self.toc {
            node.map_titles(&mut translate);
        }
    }

    /// Every TOC title in depth-first order.
    pub fn toc_titles(&self) -> Vec<&str> {
        let mut titles = Vec::new();
        for node in &self.toc {
            node.collect_titles(&mut titles);
        }
        titles
    }

    /// Add (or replace) a stylesheet and link it from every content unit.
    pub fn add_stylesheet(&mut self, href: &str, content: impl Into<String>) {
        let content = content.into();
        match self.stylesheets.iter_mut().find(|s| s.href == href) {
            Some(existing) => existing.content = content,
            None => self.stylesheets.push(Stylesheet { href: href.to_string(), content }),
        }
        for unit in &mut self.units {
            unit.link_stylesheet(href);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> Book {
        let mut metadata = Metadata::default();
        metadata.push(MetadataField::Title, "三体");
        metadata.push(MetadataField::Subject, "科幻");
        metadata.push(MetadataField::Subject, "  ");
        Book {
            units: vec![
                ContentUnit::new("c1", "text/c1.xhtml", "一"),
                ContentUnit::new("c2", "text/c2.xhtml", "二"),
            ],
            metadata,
            toc: vec![
                TocNode::leaf("第一章", "text/c1.xhtml"),
                TocNode::section("第二部", vec![TocNode::leaf("第二章", "text/c2.xhtml")]),
            ],
            ..Book::default()
        }
    }

    #[test]
    fn test_translate_metadata_reports_pairs() {
        let mut book = book();
        let changes = book.translate_metadata(|v| format!("<{v}>"));
        assert_eq!(changes[&MetadataField::Title], vec![("三体".to_string(), "<三体>".to_string())]);
        assert_eq!(changes[&MetadataField::Subject], vec![("科幻".to_string(), "<科幻>".to_string())]);
        assert!(!changes.contains_key(&MetadataField::Description));
        assert_eq!(book.metadata.values(MetadataField::Subject), ["<科幻>", "  "]);
    }

    #[test]
    fn test_update_metadata_language() {
        let mut book = book();
        book.update_metadata_language("en");
        assert_eq!(book.metadata.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_toc_labels_are_rewritten_at_every_depth() {
        let mut book = book();
        book.update_toc_labels(|t| t.replace('第', "No."));
        assert_eq!(book.toc_titles(), vec!["No.一章", "No.二部", "No.二章"]);
        assert_eq!(book.toc[1].children()[0].target(), Some("text/c2.xhtml"));
    }

    #[test]
    fn test_add_stylesheet_links_every_unit_once() {
        let mut book = book();
        book.add_stylesheet("style/cjk.css", "body {}");
        book.add_stylesheet("style/cjk.css", "body { color: red; }");
        assert_eq!(book.stylesheets.len(), 1);
        assert_eq!(book.stylesheets[0].content, "body { color: red; }");
        assert!(book.units.iter().all(|u| u.stylesheets == ["style/cjk.css"]));
    }
}
