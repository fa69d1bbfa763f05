use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::scan::Scanner;
use super::transform::parse_transform;
use super::types::{Document, Element, Group, Layer, Shape, Transform};
use super::warnings::Warning;
use crate::error::ConvertError;

/// Elements that never render and are skipped with their whole subtree
const NON_RENDERING: &[&str] = &[
    "defs",
    "metadata",
    "title",
    "desc",
    "style",
    "script",
    "namedview",
    "clipPath",
    "mask",
    "pattern",
    "marker",
    "symbol",
    "linearGradient",
    "radialGradient",
    "filter",
];

/// Containers walked like plain groups
const GROUPS: &[&str] = &["g", "a", "switch"];

/// SVG length converted through its unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub value: f64,
    pub mm_per_unit: f64,
}

impl Length {
    pub fn to_mm(&self) -> f64 {
        self.value * self.mm_per_unit
    }
}

/// Parse an absolute SVG length such as `210mm`, `8.5in` or `300` (px)
pub fn parse_length(text: &str) -> Option<Length> {
    let mut s = Scanner::new(text.trim());
    let value = s.number()?;
    let unit = text.trim()[s.offset()..].trim();
    let mm_per_unit = match unit {
        "" | "px" => 25.4 / 96.0,
        "mm" => 1.0,
        "cm" => 10.0,
        "in" => 25.4,
        "pt" => 25.4 / 72.0,
        "pc" => 25.4 / 6.0,
        "q" | "Q" => 0.25,
        _ => return None,
    };
    Some(Length { value, mm_per_unit })
}

/// `viewBox` as (min-x, min-y, width, height); non-positive sizes are rejected
pub fn parse_view_box(text: &str) -> Option<(f64, f64, f64, f64)> {
    let mut s = Scanner::new(text);
    let mut values = [0.0; 4];
    for value in &mut values {
        s.skip_separators();
        *value = s.number()?;
    }
    s.skip_whitespace();
    if !s.is_at_end() || values[2] <= 0.0 || values[3] <= 0.0 {
        return None;
    }
    Some((values[0], values[1], values[2], values[3]))
}

/// Map user units to output units.
///
/// Without a declared `width` the drawing stays in user units; otherwise the
/// output is in millimetres.
pub fn root_transform(
    width: Option<Length>,
    height: Option<Length>,
    view_box: Option<(f64, f64, f64, f64)>,
) -> Transform {
    let Some(width) = width else {
        return Transform::identity();
    };
    match view_box {
        Some((min_x, min_y, vb_width, vb_height)) => {
            let sx = width.to_mm() / vb_width;
            let sy = height.map(|h| h.to_mm() / vb_height).unwrap_or(sx);
            Transform::scale(sx, sy).compose(&Transform::translate(-min_x, -min_y))
        }
        None => Transform::scale(width.mm_per_unit, width.mm_per_unit),
    }
}

/// Value of `name` in a CSS declaration list (`style` attribute)
pub fn style_property<'s>(style: &'s str, name: &str) -> Option<&'s str> {
    style.split(';').rev().find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim() == name).then(|| value.trim())
    })
}

struct Attributes {
    pairs: Vec<(String, String)>,
}

impl Attributes {
    fn read(e: &BytesStart) -> Self {
        let pairs = e
            .attributes()
            .flatten()
            .map(|attr| {
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let raw = String::from_utf8_lossy(&attr.value);
                let value = quick_xml::escape::unescape(&raw)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| raw.to_string());
                (key, value)
            })
            .collect();
        Self { pairs }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn id(&self) -> Option<String> {
        self.get("id").map(str::to_string)
    }

    /// Own fill setting: `Some(false)` for `fill:none`, `None` when inherited
    fn filled(&self) -> Option<bool> {
        let fill = self
            .get("style")
            .and_then(|style| style_property(style, "fill"))
            .or_else(|| self.get("fill"))?;
        match fill {
            "inherit" => None,
            value => Some(value != "none"),
        }
    }
}

enum Container {
    Root,
    Layer {
        id: Option<String>,
        label: Option<String>,
        transform: Transform,
    },
    Group {
        id: Option<String>,
        transform: Transform,
    },
}

struct Frame {
    container: Container,
    filled: bool,
    children: Vec<Element>,
}

struct TreeBuilder {
    open: Vec<Frame>,
    /// Depth inside a subtree that is being skipped
    skip_depth: usize,
    root_transform: Option<Transform>,
    children: Option<Vec<Element>>,
    issues: Vec<Warning>,
}

impl TreeBuilder {
    fn transform(&mut self, tag: &str, attrs: &Attributes) -> Transform {
        let Some(value) = attrs.get("transform") else {
            return Transform::identity();
        };
        match parse_transform(value) {
            Ok(t) => t,
            Err(error) => {
                self.issues.push(Warning::InvalidTransform {
                    tag: tag.to_string(),
                    value: value.to_string(),
                    error,
                });
                Transform::identity()
            }
        }
    }

    fn start(&mut self, e: &BytesStart, empty: bool) -> Result<(), ConvertError> {
        if self.skip_depth > 0 {
            if !empty {
                self.skip_depth += 1;
            }
            return Ok(());
        }

        let local = e.local_name();
        let tag = String::from_utf8_lossy(local.as_ref()).into_owned();
        let attrs = Attributes::read(e);

        let Some(parent) = self.open.last_mut() else {
            if self.children.is_some() {
                // Content after the root element closed
                return Ok(());
            }
            if tag != "svg" {
                return Err(ConvertError::MissingRoot);
            }
            let width = attrs.get("width").and_then(parse_length);
            let height = attrs.get("height").and_then(parse_length);
            let view_box = attrs.get("viewBox").and_then(parse_view_box);
            self.root_transform = Some(root_transform(width, height, view_box));
            let frame = Frame {
                container: Container::Root,
                filled: attrs.filled().unwrap_or(true),
                children: Vec::new(),
            };
            if empty {
                self.children = Some(Vec::new());
            } else {
                self.open.push(frame);
            }
            return Ok(());
        };
        let inherited_fill = parent.filled;

        if tag == "path" {
            let shape = Shape {
                id: attrs.id(),
                transform: Transform::identity(),
                data: attrs.get("d").unwrap_or_default().to_string(),
                filled: attrs.filled().unwrap_or(inherited_fill),
            };
            let transform = self.transform(&tag, &attrs);
            if let Some(parent) = self.open.last_mut() {
                parent.children.push(Element::Shape(Shape { transform, ..shape }));
            }
            self.skip_subtree(empty);
        } else if GROUPS.contains(&tag.as_str()) {
            let transform = self.transform(&tag, &attrs);
            let id = attrs.id();
            let container = if tag == "g" && attrs.get("inkscape:groupmode") == Some("layer") {
                Container::Layer {
                    id,
                    label: attrs.get("inkscape:label").map(str::to_string),
                    transform,
                }
            } else {
                Container::Group { id, transform }
            };
            let frame = Frame {
                container,
                filled: attrs.filled().unwrap_or(inherited_fill),
                children: Vec::new(),
            };
            if empty {
                self.close(frame);
            } else {
                self.open.push(frame);
            }
        } else if NON_RENDERING.contains(&tag.as_str()) {
            self.skip_subtree(empty);
        } else {
            debug!(tag = %tag, "skipping element that is not a path");
            self.issues.push(Warning::UnsupportedElement { tag });
            self.skip_subtree(empty);
        }
        Ok(())
    }

    fn skip_subtree(&mut self, empty: bool) {
        if !empty {
            self.skip_depth = 1;
        }
    }

    fn end(&mut self) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        if let Some(frame) = self.open.pop() {
            self.close(frame);
        }
    }

    /// Attach a finished container to its parent
    fn close(&mut self, frame: Frame) {
        let element = match frame.container {
            Container::Root => {
                self.children = Some(frame.children);
                return;
            }
            Container::Layer {
                id,
                label,
                transform,
            } => Element::Layer(Layer {
                id,
                label,
                transform,
                children: frame.children,
            }),
            Container::Group { id, transform } => Element::Group(Group {
                id,
                transform,
                children: frame.children,
            }),
        };
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(element);
        }
    }
}

/// Parse a normalized SVG document into the layer/group/path tree
pub fn parse_svg(xml: &str) -> Result<Document, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = TreeBuilder {
        open: Vec::new(),
        skip_depth: 0,
        root_transform: None,
        children: None,
        issues: Vec::new(),
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => builder.start(e, false)?,
            Ok(Event::Empty(ref e)) => builder.start(e, true)?,
            Ok(Event::End(_)) => builder.end(),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConvertError::Xml {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    let children = match (builder.children, builder.open.is_empty()) {
        (Some(children), true) => children,
        (None, true) => return Err(ConvertError::MissingRoot),
        _ => {
            return Err(ConvertError::Xml {
                position: reader.buffer_position() as u64,
                message: "unexpected end of document".to_string(),
            });
        }
    };

    Ok(Document {
        root_transform: builder.root_transform.unwrap_or_default(),
        children,
        issues: builder.issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svg::types::Point;

    fn wrap(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg"
     xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape"
     xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd">
  <sodipodi:namedview id="base"><inkscape:grid id="grid1"/></sodipodi:namedview>
  <defs><path id="hidden" d="M0 0 L5 5"/></defs>
  {}
</svg>"#,
            body
        )
    }

    #[test]
    fn test_parse_length_units() {
        assert_eq!(parse_length("210mm").unwrap().to_mm(), 210.0);
        assert_eq!(parse_length("1in").unwrap().to_mm(), 25.4);
        assert_eq!(parse_length("96").unwrap().to_mm(), 25.4);
        assert_eq!(parse_length(" 2cm ").unwrap().to_mm(), 20.0);
        assert!(parse_length("100%").is_none());
        assert!(parse_length("mm").is_none());
    }

    #[test]
    fn test_parse_view_box() {
        assert_eq!(parse_view_box("0 0 210 297"), Some((0.0, 0.0, 210.0, 297.0)));
        assert_eq!(parse_view_box("-5,-5,10,10"), Some((-5.0, -5.0, 10.0, 10.0)));
        assert_eq!(parse_view_box("0 0 0 10"), None);
        assert_eq!(parse_view_box("0 0 10"), None);
    }

    #[test]
    fn test_root_transform() {
        assert_eq!(root_transform(None, None, None), Transform::identity());

        let t = root_transform(
            parse_length("200mm"),
            parse_length("100mm"),
            Some((10.0, 10.0, 100.0, 50.0)),
        );
        assert_eq!(t.apply(Point::new(10.0, 10.0)), Point::new(0.0, 0.0));
        assert_eq!(t.apply(Point::new(110.0, 60.0)), Point::new(200.0, 100.0));

        let t = root_transform(parse_length("1in"), None, None);
        assert_eq!(t.apply(Point::new(96.0, 0.0)).x, 25.4);
    }

    #[test]
    fn test_style_property() {
        assert_eq!(style_property("fill:none;stroke:#000", "fill"), Some("none"));
        assert_eq!(style_property("stroke:#000; fill : red ", "fill"), Some("red"));
        assert_eq!(style_property("fill:red;fill:none", "fill"), Some("none"));
        assert_eq!(style_property("stroke-width:1", "fill"), None);
    }

    #[test]
    fn test_parse_layers_groups_and_paths() {
        let xml = wrap(
            r#"<g inkscape:groupmode="layer" id="layer1" inkscape:label="Cut &amp; Score" transform="translate(5,5)">
    <g id="g1" transform="scale(2)">
      <path id="p1" d="M0 0 L1 1" style="fill:none;stroke:#000"/>
    </g>
    <path id="p2" d="M0 0 L2 2"><title>note</title></path>
  </g>"#,
        );

        let doc = parse_svg(&xml).unwrap();
        assert!(doc.issues.is_empty(), "{:?}", doc.issues);
        assert_eq!(doc.children.len(), 1);
        let Element::Layer(layer) = &doc.children[0] else {
            panic!("expected a layer, got {:?}", doc.children[0]);
        };
        assert_eq!(layer.id.as_deref(), Some("layer1"));
        assert_eq!(layer.label.as_deref(), Some("Cut & Score"));
        assert_eq!(layer.transform, Transform::translate(5.0, 5.0));
        assert_eq!(layer.children.len(), 2);

        let Element::Group(group) = &layer.children[0] else {
            panic!("expected a group");
        };
        let Element::Shape(p1) = &group.children[0] else {
            panic!("expected a path");
        };
        assert_eq!(p1.data, "M0 0 L1 1");
        assert!(!p1.filled);

        let Element::Shape(p2) = &layer.children[1] else {
            panic!("expected a path");
        };
        assert_eq!(p2.id.as_deref(), Some("p2"));
        assert!(p2.filled);
    }

    #[test]
    fn test_fill_is_inherited_from_groups() {
        let xml = wrap(r#"<g fill="none"><path d="M0 0 L1 1"/><path d="M0 0 L1 1" fill="red"/></g>"#);
        let doc = parse_svg(&xml).unwrap();
        let children = doc.children[0].children();
        assert!(matches!(&children[0], Element::Shape(s) if !s.filled));
        assert!(matches!(&children[1], Element::Shape(s) if s.filled));
    }

    #[test]
    fn test_unsupported_elements_are_reported() {
        let xml = wrap(r#"<rect width="10" height="10"/><text>hi<tspan>x</tspan></text><path d="M0 0 L1 1"/>"#);
        let doc = parse_svg(&xml).unwrap();
        assert_eq!(doc.children.len(), 1);
        let tags: Vec<String> = doc
            .issues
            .iter()
            .map(|w| match w {
                Warning::UnsupportedElement { tag } => tag.clone(),
                other => panic!("unexpected warning {:?}", other),
            })
            .collect();
        assert_eq!(tags, vec!["rect", "text"]);
    }

    #[test]
    fn test_invalid_transform_falls_back_to_identity() {
        let xml = wrap(r#"<g transform="spin(3)"><path d="M0 0 L1 1"/></g>"#);
        let doc = parse_svg(&xml).unwrap();
        assert_eq!(*doc.children[0].transform(), Transform::identity());
        assert!(matches!(doc.issues[0], Warning::InvalidTransform { .. }));
    }

    #[test]
    fn test_root_units() {
        let xml = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100mm" height="50mm" viewBox="0 0 200 100"><path d="M0 0 L1 1"/></svg>"#;
        let doc = parse_svg(xml).unwrap();
        assert_eq!(doc.root_transform, Transform::scale(0.5, 0.5));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(parse_svg("<html/>"), Err(ConvertError::MissingRoot)));
        assert!(matches!(parse_svg(""), Err(ConvertError::MissingRoot)));
        assert!(matches!(
            parse_svg("<svg><g></svg>"),
            Err(ConvertError::Xml { .. })
        ));
    }
}
