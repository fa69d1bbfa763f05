use super::types::{Document, Element};

/// Label suffix marking a layer whose paths are used as drawn
pub const USE_PATHS_MARKER: char = '*';

/// One layer as known before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    /// Element id of the layer `<g>`
    pub id: String,
    pub name: String,
    /// Paths already present (no stroke-to-path during normalization)
    pub use_paths: bool,
    /// Id of the enclosing layer for sub-layers
    pub parent: Option<String>,
}

/// Ordered list of layers the output is labelled from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LayerManifest {
    entries: Vec<LayerEntry>,
}

impl LayerManifest {
    pub fn new(entries: Vec<LayerEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[LayerEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&LayerEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Direct sub-layers of the layer `id`
    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a LayerEntry> + 'a {
        self.entries
            .iter()
            .filter(move |entry| entry.parent.as_deref() == Some(id))
    }

    /// Discover layers of a source document in document order, sub-layers included.
    /// Layers without an id cannot be addressed and are left out.
    pub fn from_document(document: &Document) -> Self {
        fn walk(elements: &[Element], parent: Option<&str>, entries: &mut Vec<LayerEntry>) {
            for element in elements {
                let mut inner = parent;
                if let Element::Layer(layer) = element
                    && let Some(id) = &layer.id
                {
                    let (name, use_paths) = split_label(layer.label.as_deref().unwrap_or(id));
                    entries.push(LayerEntry {
                        id: id.clone(),
                        name,
                        use_paths,
                        parent: parent.map(str::to_string),
                    });
                    inner = Some(id);
                }
                walk(element.children(), inner, entries);
            }
        }

        let mut entries = Vec::new();
        walk(&document.children, None, &mut entries);
        Self { entries }
    }
}

/// Split a layer label into its name and the use-paths marker
pub fn split_label(label: &str) -> (String, bool) {
    let trimmed = label.trim();
    match trimmed.strip_suffix(USE_PATHS_MARKER) {
        Some(name) => (name.trim_end().to_string(), true),
        None => (trimmed.to_string(), false),
    }
}
