//! # Page Model
//!
//! The in-memory page state exchanged with the host editor. A document is an
//! ordered list of pages; each page is an ordered list of positioned elements
//! whose array order is their z-order (later draws on top).
//!
//! Coordinates are page-local: an element's `y` is measured from the top edge
//! of the page that owns it, never from the top of the document. The layout
//! engine converts to a virtual document offset internally and back again.
//!
//! ## Identity
//!
//! Element ids are display keys. Whenever an element is copied onto a page
//! (repeated backgrounds, paginated template content) the copy gets an id of
//! the form `{origin}-pg{n}`. The `origin` field keeps the key the copy was
//! minted from, so re-minting never stacks suffixes and hosts can track an
//! element across reflows by its origin.

use serde::{Deserialize, Serialize};

/// A positioned object on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Display key, unique within its page.
    pub id: String,

    /// The stable key this element was minted from, if it is a page copy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// What kind of element this is.
    pub kind: ElementKind,

    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    /// Rendered content height. Authoritative for layout; zero, negative or
    /// non-finite values fall back to the configured default height.
    #[serde(default)]
    pub height: f64,

    /// Rotation in degrees. Has no effect on layout.
    #[serde(default)]
    pub rotation: f64,

    /// Decorative element repeated on every page and excluded from reflow.
    #[serde(default)]
    pub is_background: bool,

    /// Excluded from drag/resize interaction, but not from layout.
    #[serde(default)]
    pub is_locked: bool,

    #[serde(default)]
    pub style: ElementStyle,
}

/// The different kinds of elements an editor page can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ElementKind {
    Text {
        #[serde(default)]
        content: String,
    },
    Image {
        /// Data URI or URL of the bitmap.
        src: String,
    },
    Shape {
        #[serde(default)]
        shape: ShapeKind,
    },
    Table {
        #[serde(default)]
        rows: Vec<Vec<String>>,
    },
    Link {
        #[serde(default)]
        content: String,
        href: String,
    },
    /// A composite element whose configuration is owned by the host.
    Smart {
        #[serde(default)]
        config: serde_json::Value,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Rectangle,
    Ellipse,
    Line,
}

/// Cosmetic properties. None of these affect layout directly; a change that
/// alters rendered height comes back from the renderer as a height update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl ElementStyle {
    /// Shallow merge: every property set in `other` overrides ours.
    pub fn merge(&mut self, other: &ElementStyle) {
        if other.color.is_some() {
            self.color = other.color.clone();
        }
        if other.background_color.is_some() {
            self.background_color = other.background_color.clone();
        }
        if other.font_family.is_some() {
            self.font_family = other.font_family.clone();
        }
        if other.font_size.is_some() {
            self.font_size = other.font_size;
        }
        if other.font_weight.is_some() {
            self.font_weight = other.font_weight;
        }
        if other.opacity.is_some() {
            self.opacity = other.opacity;
        }
    }
}

impl Element {
    fn new(id: &str, kind: ElementKind, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id: id.to_string(),
            origin: None,
            kind,
            x,
            y,
            width,
            height,
            rotation: 0.0,
            is_background: false,
            is_locked: false,
            style: ElementStyle::default(),
        }
    }

    /// Create a text element.
    pub fn text(id: &str, x: f64, y: f64, width: f64, height: f64, content: &str) -> Self {
        Self::new(
            id,
            ElementKind::Text {
                content: content.to_string(),
            },
            x,
            y,
            width,
            height,
        )
    }

    /// Create a rectangle shape.
    pub fn shape(id: &str, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            id,
            ElementKind::Shape {
                shape: ShapeKind::Rectangle,
            },
            x,
            y,
            width,
            height,
        )
    }

    /// Create an image element.
    pub fn image(id: &str, x: f64, y: f64, width: f64, height: f64, src: &str) -> Self {
        Self::new(
            id,
            ElementKind::Image {
                src: src.to_string(),
            },
            x,
            y,
            width,
            height,
        )
    }

    /// Mark this element as a repeated page background.
    pub fn into_background(mut self) -> Self {
        self.is_background = true;
        self
    }

    /// The stable key: the origin for page copies, the id otherwise.
    pub fn origin_id(&self) -> &str {
        self.origin.as_deref().unwrap_or(&self.id)
    }

    /// A copy of this element keyed for page `page_number`.
    pub fn page_copy(&self, page_number: u32) -> Element {
        let origin = self.origin_id().to_string();
        Element {
            id: format!("{}-pg{}", origin, page_number),
            origin: Some(origin),
            ..self.clone()
        }
    }

    /// Section headers follow the template convention: an id ending in `-h`
    /// or containing `header`.
    pub fn is_section_header(&self) -> bool {
        let key = self.origin_id();
        key.ends_with("-h") || key.contains("header")
    }

    pub fn is_shape(&self) -> bool {
        matches!(self.kind, ElementKind::Shape { .. })
    }

    /// Text-like content, for kinds that carry it.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            ElementKind::Text { content } | ElementKind::Link { content, .. } => Some(content),
            _ => None,
        }
    }
}

/// One page of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,

    /// Sequential page number, starting at 1.
    #[serde(default = "default_page_number")]
    pub number: u32,

    /// Elements in z-order.
    #[serde(default)]
    pub elements: Vec<Element>,

    /// Raster background (e.g. an imported PDF page), as a data URI or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,

    /// Freehand drawing layer, as a data URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_layer: Option<String>,
}

fn default_page_number() -> u32 {
    1
}

impl Page {
    pub fn new(id: &str, number: u32) -> Self {
        Self {
            id: id.to_string(),
            number,
            elements: vec![],
            background_image: None,
            drawing_layer: None,
        }
    }

    /// Create a page with elements.
    pub fn with_elements(id: &str, number: u32, elements: Vec<Element>) -> Self {
        Self {
            elements,
            ..Self::new(id, number)
        }
    }

    pub fn backgrounds(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| e.is_background)
    }

    pub fn content(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|e| !e.is_background)
    }

    pub fn find(&self, element_id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == element_id)
    }
}

/// A reference to one element on one page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementRef {
    pub page_id: String,
    pub element_id: String,
}

/// A partial update to an element. Only the fields that are set are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    /// New text for text and link elements; ignored for other kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// New configuration for smart elements; ignored for other kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    /// New source for image elements; ignored for other kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_locked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<ElementStyle>,
}

impl ElementPatch {
    pub fn height(height: f64) -> Self {
        Self {
            height: Some(height),
            ..Default::default()
        }
    }

    /// Does this patch touch anything that can change rendered height?
    /// Smart configuration counts as content.
    pub fn touches_content(&self) -> bool {
        self.content.is_some() || self.config.is_some()
    }

    /// Apply the patch to `element` (shallow merge).
    pub fn apply_to(&self, element: &mut Element) {
        if let Some(x) = self.x {
            element.x = x;
        }
        if let Some(y) = self.y {
            element.y = y;
        }
        if let Some(w) = self.width {
            element.width = w;
        }
        if let Some(h) = self.height {
            element.height = h;
        }
        if let Some(r) = self.rotation {
            element.rotation = r;
        }
        if let Some(locked) = self.is_locked {
            element.is_locked = locked;
        }
        if let Some(style) = &self.style {
            element.style.merge(style);
        }
        match &mut element.kind {
            ElementKind::Text { content } | ElementKind::Link { content, .. } => {
                if let Some(new_content) = &self.content {
                    *content = new_content.clone();
                }
            }
            ElementKind::Smart { config } => {
                if let Some(new_config) = &self.config {
                    *config = new_config.clone();
                }
            }
            ElementKind::Image { src } => {
                if let Some(new_src) = &self.src {
                    *src = new_src.clone();
                }
            }
            ElementKind::Shape { .. } | ElementKind::Table { .. } => {}
        }
    }
}
