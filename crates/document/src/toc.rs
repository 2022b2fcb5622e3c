/// A table-of-contents entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocNode {
    /// A link into the book.
    Leaf { title: String, target: String },
    /// A titled group of entries.
    Section { title: String, children: Vec<TocNode> },
}

impl TocNode {
    pub fn leaf(title: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Leaf {
            title: title.into(),
            target: target.into(),
        }
    }

    pub fn section(title: impl Into<String>, children: Vec<TocNode>) -> Self {
        Self::Section {
            title: title.into(),
            children,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Leaf { title, .. } | Self::Section { title, .. } => title,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Leaf { target, .. } => Some(target),
            Self::Section { .. } => None,
        }
    }

    pub fn children(&self) -> &[TocNode] {
        match self {
            Self::Leaf { .. } => &[],
            Self::Section { children, .. } => children,
        }
    }

    /// Replace this node's title and every descendant's title with `f(title)`.
    pub fn map_titles(&mut self, f: &mut impl FnMut(&str) -> String) {
        match self {
            Self::Leaf { title, .. } => *title = f(title),
            Self::Section { title, children } => {
                *title = f(title);
                for child in children {
                    child.map_titles(f);
                }
            },
        }
    }

    pub(crate) fn collect_titles<'a>(&'a self, into: &mut Vec<&'a str>) {
        into.push(self.title());
        for child in self.children() {
            child.collect_titles(into);
        }
    }
}
