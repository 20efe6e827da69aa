//! Legend sidecar for raster outputs
//!
//! The class names and colours of a reclassified raster are stored next to
//! it as a GDAL PAM file (`<output>.aux.xml`), which desktop GIS tools pick
//! up as the band's category names and colour table.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ReclassError, Result};
use crate::models::{Legend, Rgba};

/// Path of the sidecar belonging to a raster
pub fn sidecar_path(raster: &Path) -> PathBuf {
    let mut name = raster.as_os_str().to_os_string();
    name.push(".aux.xml");
    PathBuf::from(name)
}

/// Write the PAM sidecar for `raster`. Returns `None` without touching the
/// filesystem when the legend has no entries.
pub fn write_sidecar(raster: &Path, legend: &Legend) -> Result<Option<PathBuf>> {
    if legend.is_empty() {
        return Ok(None);
    }

    let path = sidecar_path(raster);
    fs::write(&path, render_pam(legend)?)?;
    tracing::debug!(path = %path.display(), classes = legend.entries().len(), "Legend sidecar written");
    Ok(Some(path))
}

fn xml_error(e: impl std::fmt::Display) -> ReclassError {
    ReclassError::format("PAM", e.to_string())
}

fn start(writer: &mut Writer<Vec<u8>>, element: BytesStart<'_>) -> Result<()> {
    writer.write_event(Event::Start(element)).map_err(xml_error)
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_error)
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    if text.is_empty() {
        return writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(xml_error);
    }
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}

/// Render the PAM document. Category names and colour entries are indexed
/// by code, so codes missing from the legend get an empty name and a
/// transparent colour.
pub fn render_pam(legend: &Legend) -> Result<Vec<u8>> {
    let max_code = legend.max_code().unwrap_or(0).max(0);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_error)?;
    start(&mut writer, BytesStart::new("PAMDataset"))?;

    let mut band = BytesStart::new("PAMRasterBand");
    band.push_attribute(("band", "1"));
    start(&mut writer, band)?;

    start(&mut writer, BytesStart::new("CategoryNames"))?;
    for code in 0..=max_code {
        let label = legend.get(code).map(|e| e.label.as_str()).unwrap_or("");
        text_element(&mut writer, "Category", label)?;
    }
    end(&mut writer, "CategoryNames")?;

    text_element(&mut writer, "ColorInterp", "Palette")?;

    start(&mut writer, BytesStart::new("ColorTable"))?;
    for code in 0..=max_code {
        let color = legend.get(code).map(|e| e.color).unwrap_or(Rgba::TRANSPARENT);
        let (c1, c2, c3, c4) = (
            color.r.to_string(),
            color.g.to_string(),
            color.b.to_string(),
            color.a.to_string(),
        );
        let mut entry = BytesStart::new("Entry");
        entry.push_attribute(("c1", c1.as_str()));
        entry.push_attribute(("c2", c2.as_str()));
        entry.push_attribute(("c3", c3.as_str()));
        entry.push_attribute(("c4", c4.as_str()));
        writer.write_event(Event::Empty(entry)).map_err(xml_error)?;
    }
    end(&mut writer, "ColorTable")?;

    end(&mut writer, "PAMRasterBand")?;
    end(&mut writer, "PAMDataset")?;

    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassCatalog, ClassEntry};

    fn legend() -> Legend {
        let catalog: ClassCatalog = vec![
            ClassEntry::new(1, "forest", "#00ff00"),
            ClassEntry::new(3, "water & wetland", "#0000ff"),
        ]
        .into_iter()
        .collect();
        Legend::from_catalog(&catalog)
    }

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            sidecar_path(Path::new("/tmp/lc_reclass.tif")),
            PathBuf::from("/tmp/lc_reclass.tif.aux.xml")
        );
    }

    #[test]
    fn test_render_pam() {
        let xml = String::from_utf8(render_pam(&legend()).unwrap()).unwrap();

        assert!(xml.contains(r#"<PAMRasterBand band="1">"#));
        assert!(xml.contains("<Category>forest</Category>"));
        assert!(xml.contains("<Category>water &amp; wetland</Category>"));
        assert_eq!(xml.matches("<Category/>").count(), 2);
        assert!(xml.contains("<ColorInterp>Palette</ColorInterp>"));
        assert!(xml.contains(r#"<Entry c1="0" c2="255" c3="0" c4="255"/>"#));
        assert!(xml.contains(r#"<Entry c1="0" c2="0" c3="0" c4="0"/>"#));
        assert_eq!(xml.matches("<Entry ").count(), 4);
    }

    #[test]
    fn test_empty_legend_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("out.tif");

        assert_eq!(write_sidecar(&raster, &Legend::default()).unwrap(), None);
        assert!(!sidecar_path(&raster).exists());

        let written = write_sidecar(&raster, &legend()).unwrap().unwrap();
        assert!(written.exists());
    }
}
