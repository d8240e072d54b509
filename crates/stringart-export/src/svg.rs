//! SVG export serializer.
//!
//! Draws the thread as a single `<path>` running through the visited
//! nails in order, on a white background, with every nail marked by a
//! small `<circle>`. Document construction, XML escaping, and path data
//! formatting come from the [`svg`] crate.
//!
//! The `viewBox` is the canvas in pixels. A nail at `(row, col)` sits at
//! the centre of its pixel, `(col + 0.5, row + 0.5)`.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Circle, Description, Element, Group, Path, Rectangle, Title};
use svg::node::{Node, Text};

use stringart_core::{Dimensions, NailPosition, NailSet};

use crate::ExportError;

/// Stroke width of the thread, in pixels.
const THREAD_WIDTH: f64 = 0.5;
/// Radius of a nail marker, in pixels.
const NAIL_RADIUS: f64 = 0.75;

/// Metadata to embed in the SVG document.
///
/// Every field is optional. Text values are XML-escaped by the `svg`
/// crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`. Typically the source image
    /// file name without extension.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized run configuration, emitted inside
    /// `<metadata><stringart:config>` so the drawing can be reproduced.
    pub config_json: Option<&'a str>,
}

fn centre(position: NailPosition) -> (f64, f64) {
    (f64::from(position.col) + 0.5, f64::from(position.row) + 0.5)
}

/// Serialize a nail sequence into an SVG document.
///
/// Sequences shorter than two nails produce a document with the nails
/// but no thread.
///
/// # Errors
///
/// Returns [`ExportError::Nail`] if an entry of `sequence` is not a nail
/// of `nails`.
pub fn to_svg(
    sequence: &[usize],
    nails: &NailSet,
    dimensions: Dimensions,
    metadata: &SvgMetadata<'_>,
) -> Result<String, ExportError> {
    let (w, h) = (dimensions.width, dimensions.height);
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("stringart:config");
        config_el.assign("xmlns:stringart", "urn:stringart:config");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    doc = doc.add(
        Rectangle::new()
            .set("width", w)
            .set("height", h)
            .set("fill", "white"),
    );

    let points = sequence
        .iter()
        .map(|&index| nails.position(index).map(centre))
        .collect::<Result<Vec<_>, _>>()?;
    if let [first, rest @ ..] = points.as_slice()
        && !rest.is_empty()
    {
        let data = rest
            .iter()
            .fold(Data::new().move_to(*first), |data, &p| data.line_to(p));
        doc = doc.add(
            Path::new()
                .set("d", data)
                .set("fill", "none")
                .set("stroke", "black")
                .set("stroke-width", THREAD_WIDTH)
                .set("stroke-linejoin", "round"),
        );
    }

    let mut markers = Group::new().set("id", "nails").set("fill", "gray");
    for &position in nails.positions() {
        let (cx, cy) = centre(position);
        markers.append(
            Circle::new()
                .set("cx", cx)
                .set("cy", cy)
                .set("r", NAIL_RADIUS),
        );
    }
    doc = doc.add(markers);

    // The svg crate omits the XML declaration, so we prepend it.
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n"))
}
