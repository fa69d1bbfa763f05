use tracing::debug;

use super::manifest::{LayerManifest, split_label};
use super::path::{parse_path_data, polygonize};
use super::style::{DEFAULT_LAYER, sanitize_layer_name};
use super::transform::TransformStack;
use super::types::{Document, Element, Layer, Shape, TargetDocument};
use super::warnings::{Warning, Warnings};

/// Output of a document walk
#[derive(Debug, Clone, PartialEq)]
pub struct Collected {
    pub document: TargetDocument,
    pub warnings: Warnings,
}

/// Depth-first walk that flattens every shape into its layer's polylines
pub struct LayerCollector<'a> {
    flatness: f64,
    manifest: &'a LayerManifest,
    target: TargetDocument,
    warnings: Warnings,
}

impl<'a> LayerCollector<'a> {
    pub fn new(flatness: f64, manifest: &'a LayerManifest) -> Self {
        Self {
            flatness,
            manifest,
            target: TargetDocument::new(),
            warnings: Warnings::new(),
        }
    }

    pub fn collect(mut self, document: &Document) -> Collected {
        self.warnings.extend(document.issues.iter().cloned());

        let mut stack = TransformStack::new();
        {
            let mut root = stack.scope(&document.root_transform);
            for child in &document.children {
                self.visit(&mut root, child, DEFAULT_LAYER);
            }
        }

        debug!(
            layers = self.target.layer_count(),
            polylines = self.target.polyline_count(),
            warnings = self.warnings.len(),
            "collected drawing"
        );

        Collected {
            document: self.target,
            warnings: self.warnings,
        }
    }

    fn visit(&mut self, stack: &mut TransformStack, element: &Element, layer: &str) {
        match element {
            Element::Layer(l) => {
                let name = self.layer_name(l);
                self.target.declare_layer(&name);
                let mut scope = stack.scope(&l.transform);
                for child in &l.children {
                    self.visit(&mut scope, child, &name);
                }
            }
            Element::Group(g) => {
                let mut scope = stack.scope(&g.transform);
                for child in &g.children {
                    self.visit(&mut scope, child, layer);
                }
            }
            Element::Shape(shape) => self.visit_shape(stack, shape, layer),
        }
    }

    fn visit_shape(&mut self, stack: &mut TransformStack, shape: &Shape, layer: &str) {
        let commands = match parse_path_data(&shape.data) {
            Ok(commands) => commands,
            Err(error) => {
                debug!(shape = shape.label(), %error, "skipping path");
                self.warnings.push(Warning::InvalidPathData {
                    shape: shape.label().to_string(),
                    error,
                });
                return;
            }
        };

        let scope = stack.scope(&shape.transform);
        let out = polygonize(
            &commands,
            &scope.current(),
            self.flatness,
            shape.filled,
            layer,
        );
        if out.discarded > 0 {
            self.warnings.push(Warning::DegenerateShape {
                shape: shape.label().to_string(),
            });
        }
        for polyline in out.polylines {
            self.target.push(polyline);
        }
    }

    /// Manifest name when listed, else the layer's own label
    fn layer_name(&mut self, layer: &Layer) -> String {
        let listed = layer.id.as_deref().and_then(|id| self.manifest.find(id));
        let name = match listed {
            Some(entry) => entry.name.clone(),
            None => {
                let own = layer
                    .label
                    .as_deref()
                    .or(layer.id.as_deref())
                    .map(|label| split_label(label).0)
                    .unwrap_or_default();
                if !self.manifest.is_empty() {
                    self.warnings.push(Warning::UnlistedLayer { name: own.clone() });
                }
                own
            }
        };
        sanitize_layer_name(&name)
    }
}

/// Walk `document` and flatten it at `flatness`
pub fn collect(document: &Document, flatness: f64, manifest: &LayerManifest) -> Collected {
    LayerCollector::new(flatness, manifest).collect(document)
}
