// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the scene graph: identifiers, kinds, dirty bits, and props.

use alloc::string::String;
use kurbo::{Affine, Rect};

/// Identifier for a node in a [`SceneGraph`](crate::SceneGraph).
///
/// A slot index plus a generation counter. Ids are allocated by the owning graph;
/// there is no process-wide counter.
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed and every id pointing at it becomes stale.
/// - On reuse of a freed slot, its generation is incremented, so stale ids never
///   alias a different live node.
///
/// The derived ordering (slot, then generation) is arbitrary but total, which lets
/// ids key ordered maps.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Design-level node type. Determines how a node is drawn and whether it groups children.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum NodeKind {
    /// Top-level node of a page. A page has exactly one.
    Page,
    /// Artboard-like container.
    Frame,
    /// Semantic grouping without drawing behavior.
    Section,
    /// Free-form vector path.
    Vector,
    /// Plain container.
    #[default]
    Group,
    /// Rectangles, ellipses and other closed shapes.
    Polygon,
    /// Open line segment.
    Line,
    /// Text run.
    Text,
    /// Raster image.
    Image,
    /// Reusable component definition.
    Component,
    /// Placed instance of a component.
    Instance,
    /// Connector between two nodes.
    Connector,
    /// Sticky note.
    Sticky,
}

impl NodeKind {
    /// Whether newly inserted nodes may be placed inside this node.
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Group | Self::Frame | Self::Page)
    }
}

/// Interactive element semantics attached to a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ElementKind {
    /// Generic block.
    #[default]
    Div,
    /// Push button.
    Button,
    /// Hyperlink.
    Anchor,
    /// Navigation region.
    Nav,
    /// List container.
    List,
    /// List entry.
    ListItem,
    /// Checkbox.
    Checkbox,
    /// Radio button.
    Radio,
    /// On/off switch.
    Toggle,
    /// Text input. Rendered through a host-side overlay.
    Input,
}

impl ElementKind {
    /// Whether the host backs this element with an overlay that must be released
    /// when the node goes away.
    pub const fn hosts_overlay(self) -> bool {
        matches!(self, Self::Input)
    }
}

bitflags::bitflags! {
    /// Pending-change bits on a scene node.
    ///
    /// Any mutation sets a bit on the node itself and bubbles [`SUBTREE`](Self::SUBTREE)
    /// to every ancestor.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct DirtyFlags: u8 {
        /// Local transform changed.
        const TRANSFORM = 0b0000_0001;
        /// Props or key changed.
        const CONTENT   = 0b0000_0010;
        /// Bounds or child list changed.
        const LAYOUT    = 0b0000_0100;
        /// Some descendant is dirty.
        const SUBTREE   = 0b0000_1000;
    }
}

/// Horizontal text alignment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum TextAlign {
    /// Left in left-to-right text.
    #[default]
    Start,
    /// Centered.
    Center,
    /// Right in left-to-right text.
    End,
}

/// How an image fills its bounds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Cover the bounds, cropping overflow.
    #[default]
    Fill,
    /// Fit inside the bounds, letterboxing.
    Fit,
    /// Stretch to the bounds, ignoring aspect ratio.
    Stretch,
}

/// Shape styling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RectProps {
    /// Corner radii, clockwise from top-left.
    pub corner_radii: [f32; 4],
    /// Fill color, packed RGBA.
    pub fill: u32,
    /// Stroke color, packed RGBA.
    pub stroke: u32,
    /// Stroke width in local units.
    pub stroke_width: f32,
}

/// Text content and styling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextProps {
    /// The text itself.
    pub content: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in local units.
    pub font_size: f32,
    /// Text color, packed RGBA.
    pub fill: u32,
    /// Alignment within the bounds.
    pub align: TextAlign,
}

/// Image source and scaling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImageProps {
    /// Where the image was loaded from.
    pub source_url: String,
    /// Host texture handle.
    pub texture_id: u32,
    /// Scaling behavior.
    pub scale_mode: ScaleMode,
}

/// Opaque per-node payload handed to the host on commit.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Props {
    /// No drawable payload.
    #[default]
    None,
    /// Shape styling.
    Rect(RectProps),
    /// Text content.
    Text(TextProps),
    /// Image reference.
    Image(ImageProps),
}

/// Everything needed to create a node.
#[derive(Clone, Debug, Default)]
pub struct NodeDesc {
    /// Design-level type.
    pub kind: NodeKind,
    /// Interactive element semantics.
    pub element: ElementKind,
    /// Explicit reconciliation key. Without one, the node id is the key.
    pub key: Option<u32>,
    /// Drawable payload.
    pub props: Props,
    /// Transform relative to the parent.
    pub local_transform: Affine,
    /// Untransformed bounds.
    pub local_bounds: Rect,
}

impl NodeDesc {
    /// Description of a node of the given kind with identity transform and empty bounds.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// Set the element semantics.
    pub fn with_element(mut self, element: ElementKind) -> Self {
        self.element = element;
        self
    }

    /// Set an explicit key.
    pub fn with_key(mut self, key: u32) -> Self {
        self.key = Some(key);
        self
    }

    /// Set the props.
    pub fn with_props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Set the local transform.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.local_transform = transform;
        self
    }

    /// Set the local bounds.
    pub fn with_bounds(mut self, bounds: Rect) -> Self {
        self.local_bounds = bounds;
        self
    }
}
