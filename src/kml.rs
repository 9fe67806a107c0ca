//! KML output for eyeballing boundaries in a map viewer.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::models::Ring;

const KML_NS: &str = "http://www.opengis.net/kml/2.2";

/// Default output file for a zone name: `America/New_York` → `America_New_York.kml`
pub fn default_output_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{}.kml", name.replace('/', "_")))
}

/// Write a complete KML document with one placemark, one polygon per ring
pub fn write_placemark<W: Write>(
    out: &mut W,
    name: &str,
    description: &str,
    rings: &[Ring],
) -> io::Result<()> {
    let mut writer = Writer::new(out);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("kml").with_attributes([("xmlns", KML_NS)]),
    ))?;
    writer.write_event(Event::Start(BytesStart::new("Placemark")))?;
    text_element(&mut writer, "name", name)?;
    text_element(&mut writer, "description", description)?;

    for ring in rings {
        writer.write_event(Event::Start(BytesStart::new("Polygon")))?;
        text_element(&mut writer, "extrude", "1")?;
        text_element(&mut writer, "altitudeMode", "relativeToGround")?;
        writer.write_event(Event::Start(BytesStart::new("outerBoundaryIs")))?;
        writer.write_event(Event::Start(BytesStart::new("LinearRing")))?;

        let coordinates: String = ring
            .iter()
            .map(|coord| format!("{},{},0 ", coord.x, coord.y))
            .collect();
        text_element(&mut writer, "coordinates", &coordinates)?;

        writer.write_event(Event::End(BytesEnd::new("LinearRing")))?;
        writer.write_event(Event::End(BytesEnd::new("outerBoundaryIs")))?;
        writer.write_event(Event::End(BytesEnd::new("Polygon")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("Placemark")))?;
    writer.write_event(Event::End(BytesEnd::new("kml")))?;
    Ok(())
}

pub fn write_file(path: &Path, name: &str, description: &str, rings: &[Ring]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_placemark(&mut out, name, description, rings)?;
    out.flush()
}

/// `<tag>text</tag>`, with the text escaped
fn text_element<W: Write>(writer: &mut Writer<W>, tag: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))
}
