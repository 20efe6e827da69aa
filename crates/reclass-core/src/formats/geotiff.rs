//! GeoTIFF raster store
//!
//! Reads go through the decoder chunk by chunk (strips or tiles), so only
//! one native block is decoded at a time. Writes are strip based and LZW
//! compressed, one row band per strip, with the georeferencing tags of the
//! source copied over.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType as EncoderColorType};
use tiff::encoder::compression::Lzw;
use tiff::encoder::{DirectoryEncoder, TiffEncoder, TiffKind, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType;

use crate::error::{ReclassError, Result};
use crate::formats::legend;
use crate::models::Legend;
use crate::ports::{BlockWindow, GeoReference, PixelType, RasterLayout, RasterSource, RasterStore, RasterTarget};

const MODEL_PIXEL_SCALE: Tag = Tag::Unknown(33550);
const MODEL_TIEPOINT: Tag = Tag::Unknown(33922);
const MODEL_TRANSFORMATION: Tag = Tag::Unknown(34264);
const GEO_KEY_DIRECTORY: Tag = Tag::Unknown(34735);
const GEO_DOUBLE_PARAMS: Tag = Tag::Unknown(34736);
const GEO_ASCII_PARAMS: Tag = Tag::Unknown(34737);
const GDAL_NODATA: Tag = Tag::Unknown(42113);

const PHOTOMETRIC_PALETTE: u16 = 3;

/// Raster store backed by GeoTIFF files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffStore;

impl GeoTiffStore {
    pub fn new() -> Self {
        Self
    }
}

impl RasterStore for GeoTiffStore {
    fn open(&self, path: &Path) -> Result<Box<dyn RasterSource>> {
        if !path.is_file() {
            return Err(ReclassError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let is_vrt = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("vrt"))
            .unwrap_or(false);
        if is_vrt {
            return Err(ReclassError::format(
                "VRT",
                "virtual rasters must be translated to GeoTIFF before reclassification",
            ));
        }

        Ok(Box::new(GeoTiffSource::open(path)?))
    }

    fn write(
        &self,
        path: &Path,
        target: &RasterTarget<'_>,
        produce: &mut dyn FnMut(&BlockWindow) -> Result<Vec<u16>>,
    ) -> Result<Option<PathBuf>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let mut encoder = TiffEncoder::new(BufWriter::new(file))?;

        match target.pixel_type {
            PixelType::U8 => {
                let palette = palette_tag(target.legend);
                write_band::<colortype::Gray8, _>(&mut encoder, target, palette, produce, |v| v as u8)?
            }
            PixelType::U16 => {
                write_band::<colortype::Gray16, _>(&mut encoder, target, None, produce, |v| v)?
            }
        }

        tracing::debug!(path = %path.display(), width = target.width, height = target.height, "GeoTIFF written");
        legend::write_sidecar(path, target.legend)
    }
}

/// Write the single band image strip by strip, asking `produce` for the
/// pixels of each row band
fn write_band<C, W>(
    encoder: &mut TiffEncoder<W>,
    target: &RasterTarget<'_>,
    palette: Option<Vec<u16>>,
    produce: &mut dyn FnMut(&BlockWindow) -> Result<Vec<u16>>,
    convert: fn(u16) -> C::Inner,
) -> Result<()>
where
    C: EncoderColorType,
    W: Write + Seek,
    [C::Inner]: TiffValue,
{
    let mut image = encoder.new_image_with_compression::<C, _>(target.width, target.height, Lzw)?;
    image.rows_per_strip(target.rows_per_band)?;

    if let Some(georeference) = &target.georeference {
        write_georeference(image.encoder(), georeference)?;
    }
    if let Some(colormap) = palette {
        image.encoder().write_tag(Tag::PhotometricInterpretation, PHOTOMETRIC_PALETTE)?;
        image.encoder().write_tag(Tag::ColorMap, &colormap[..])?;
    }

    for band in target.row_bands() {
        let values = produce(&band)?;
        if values.len() != band.len() {
            return Err(ReclassError::format(
                "GeoTIFF",
                format!("row band at {} has {} samples, expected {}", band.row_off, values.len(), band.len()),
            ));
        }
        let samples: Vec<C::Inner> = values.into_iter().map(convert).collect();
        image.write_strip(&samples)?;
    }

    image.finish()?;
    Ok(())
}

fn write_georeference<W: Write + Seek, K: TiffKind>(
    directory: &mut DirectoryEncoder<'_, W, K>,
    georeference: &GeoReference,
) -> Result<()> {
    if let Some(values) = &georeference.pixel_scale {
        directory.write_tag(MODEL_PIXEL_SCALE, &values[..])?;
    }
    if let Some(values) = &georeference.tiepoint {
        directory.write_tag(MODEL_TIEPOINT, &values[..])?;
    }
    if let Some(values) = &georeference.transformation {
        directory.write_tag(MODEL_TRANSFORMATION, &values[..])?;
    }
    if let Some(values) = &georeference.geo_keys {
        directory.write_tag(GEO_KEY_DIRECTORY, &values[..])?;
    }
    if let Some(values) = &georeference.geo_doubles {
        directory.write_tag(GEO_DOUBLE_PARAMS, &values[..])?;
    }
    if let Some(value) = &georeference.geo_ascii {
        directory.write_tag(GEO_ASCII_PARAMS, value.as_str())?;
    }
    Ok(())
}

/// TIFF ColorMap for an 8-bit palette image: 256 reds, then greens, then
/// blues, scaled to 16 bits. Codes without a legend entry stay black.
fn palette_tag(legend: &Legend) -> Option<Vec<u16>> {
    if legend.is_empty() {
        return None;
    }
    let mut colormap = vec![0u16; 3 * 256];
    for entry in legend.entries().iter().filter(|e| (0..256).contains(&e.code)) {
        let i = entry.code as usize;
        colormap[i] = entry.color.r as u16 * 257;
        colormap[256 + i] = entry.color.g as u16 * 257;
        colormap[512 + i] = entry.color.b as u16 * 257;
    }
    Some(colormap)
}

/// An open GeoTIFF, decoded one chunk at a time
pub struct GeoTiffSource {
    decoder: Decoder<BufReader<File>>,
    layout: RasterLayout,
    nodata: Option<i64>,
    georeference: Option<GeoReference>,
}

impl GeoTiffSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))?;

        let (width, height) = decoder.dimensions()?;
        let bands = samples_per_pixel(decoder.colortype()?);

        let planar = match decoder.find_tag(Tag::PlanarConfiguration)? {
            Some(value) => value.into_u16()?,
            None => 1,
        };
        if planar != 1 && bands > 1 {
            return Err(ReclassError::UnsupportedPixelType {
                reason: "band sequential (planar) multi-band layout".to_string(),
            });
        }

        let (block_width, block_height) = decoder.chunk_dimensions();
        let nodata = read_nodata(&mut decoder)?;
        let georeference = read_georeference(&mut decoder)?;

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            bands,
            block_width,
            block_height,
            "Opened GeoTIFF"
        );

        Ok(Self {
            decoder,
            layout: RasterLayout {
                width,
                height,
                bands,
                block_width,
                block_height,
            },
            nodata,
            georeference,
        })
    }

    fn chunk_index(&self, window: &BlockWindow) -> u32 {
        let across = self.layout.width.div_ceil(self.layout.block_width);
        (window.row_off / self.layout.block_height) * across + window.col_off / self.layout.block_width
    }
}

impl RasterSource for GeoTiffSource {
    fn layout(&self) -> RasterLayout {
        self.layout
    }

    fn read_window(&mut self, band: u32, window: &BlockWindow) -> Result<Vec<i64>> {
        let layout = self.layout;
        if band == 0 || band > layout.bands {
            return Err(ReclassError::AttributeNotFound {
                attribute: band.to_string(),
                available: (1..=layout.bands).map(|b| b.to_string()).collect(),
            });
        }
        if window.col_off % layout.block_width != 0 || window.row_off % layout.block_height != 0 {
            return Err(ReclassError::format(
                "GeoTIFF",
                format!("window at ({}, {}) is not aligned to the file blocks", window.col_off, window.row_off),
            ));
        }

        let index = self.chunk_index(window);
        let samples = decoded_to_i64(self.decoder.read_chunk(index)?)?;

        // Edge tiles may come back padded to the full tile size
        let bands = layout.bands as usize;
        let padded = layout.block_width as usize * layout.block_height as usize * bands;
        let stride = if samples.len() == padded && window.len() * bands != padded {
            layout.block_width as usize
        } else {
            window.width as usize
        };

        let offset = (band - 1) as usize;
        let mut values = Vec::with_capacity(window.len());
        for row in 0..window.height as usize {
            let start = row * stride * bands;
            for col in 0..window.width as usize {
                let i = start + col * bands + offset;
                let value = samples.get(i).copied().ok_or_else(|| {
                    ReclassError::format("GeoTIFF", format!("chunk {} is shorter than expected", index))
                })?;
                values.push(value);
            }
        }
        Ok(values)
    }

    fn nodata(&self) -> Option<i64> {
        self.nodata
    }

    fn georeference(&self) -> Option<GeoReference> {
        self.georeference.clone()
    }
}

fn samples_per_pixel(color: ColorType) -> u32 {
    match color {
        ColorType::Gray(_) | ColorType::Palette(_) => 1,
        ColorType::GrayA(_) => 2,
        ColorType::RGB(_) | ColorType::YCbCr(_) => 3,
        ColorType::RGBA(_) | ColorType::CMYK(_) => 4,
    }
}

fn integral(values: impl Iterator<Item = f64>) -> Result<Vec<i64>> {
    values
        .map(|v| {
            if v.is_finite() && v.fract() == 0.0 {
                Ok(v as i64)
            } else {
                Err(ReclassError::UnsupportedPixelType {
                    reason: format!("non integral sample {}", v),
                })
            }
        })
        .collect()
}

fn decoded_to_i64(result: DecodingResult) -> Result<Vec<i64>> {
    match result {
        DecodingResult::U8(data) => Ok(data.into_iter().map(i64::from).collect()),
        DecodingResult::U16(data) => Ok(data.into_iter().map(i64::from).collect()),
        DecodingResult::U32(data) => Ok(data.into_iter().map(i64::from).collect()),
        DecodingResult::U64(data) => data
            .into_iter()
            .map(|v| {
                i64::try_from(v).map_err(|_| ReclassError::UnsupportedPixelType {
                    reason: format!("sample {} exceeds the signed 64-bit range", v),
                })
            })
            .collect(),
        DecodingResult::I8(data) => Ok(data.into_iter().map(i64::from).collect()),
        DecodingResult::I16(data) => Ok(data.into_iter().map(i64::from).collect()),
        DecodingResult::I32(data) => Ok(data.into_iter().map(i64::from).collect()),
        DecodingResult::I64(data) => Ok(data),
        DecodingResult::F32(data) => integral(data.into_iter().map(f64::from)),
        DecodingResult::F64(data) => integral(data.into_iter()),
        #[allow(unreachable_patterns)]
        _ => Err(ReclassError::UnsupportedPixelType {
            reason: "unknown sample format".to_string(),
        }),
    }
}

fn read_nodata<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<i64>> {
    let Some(value) = decoder.find_tag(GDAL_NODATA)? else {
        return Ok(None);
    };
    let text = value.into_string()?;
    let text = text.trim_end_matches('\0').trim();
    Ok(text
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.fract() == 0.0)
        .map(|v| v as i64))
}

fn read_georeference<R: std::io::Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoReference>> {
    let georeference = GeoReference {
        pixel_scale: decoder.find_tag(MODEL_PIXEL_SCALE)?.map(|v| v.into_f64_vec()).transpose()?,
        tiepoint: decoder.find_tag(MODEL_TIEPOINT)?.map(|v| v.into_f64_vec()).transpose()?,
        transformation: decoder.find_tag(MODEL_TRANSFORMATION)?.map(|v| v.into_f64_vec()).transpose()?,
        geo_keys: decoder.find_tag(GEO_KEY_DIRECTORY)?.map(|v| v.into_u16_vec()).transpose()?,
        geo_doubles: decoder.find_tag(GEO_DOUBLE_PARAMS)?.map(|v| v.into_f64_vec()).transpose()?,
        geo_ascii: decoder.find_tag(GEO_ASCII_PARAMS)?.map(|v| v.into_string()).transpose()?,
    };

    if georeference == GeoReference::default() {
        Ok(None)
    } else {
        Ok(Some(georeference))
    }
}
