//! Getting chart images and pattern pdfs into the session.
//!
//! Nothing here parses the formats beyond sniffing magic bytes and reading
//! the image dimensions; drawing is left to the renderer and the pdf is handed
//! to the system viewer through a [`DisplayUrl`].

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageReader;
use strum_macros::Display;
use webbrowser::Browser;

use crate::error::{Result, RowmarkError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MediaType {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
    Pdf,
}

impl MediaType {
    pub fn is_image(&self) -> bool {
        !matches!(self, MediaType::Pdf)
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaType::Png => "png",
            MediaType::Jpeg => "jpg",
            MediaType::Gif => "gif",
            MediaType::Webp => "webp",
            MediaType::Bmp => "bmp",
            MediaType::Pdf => "pdf",
        }
    }
}

/// Identify a payload from its leading bytes.
pub fn sniff(bytes: &[u8]) -> Option<MediaType> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    if bytes.starts_with(PNG) {
        Some(MediaType::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(MediaType::Jpeg)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(MediaType::Gif)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(MediaType::Webp)
    } else if bytes.starts_with(b"BM") {
        Some(MediaType::Bmp)
    } else if bytes.starts_with(b"%PDF-") {
        Some(MediaType::Pdf)
    } else {
        None
    }
}

/// The chart picture, kept as the raw bytes it arrived as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    bytes: Vec<u8>,
    media: MediaType,
    dimensions: (u32, u32),
}

impl ImageAsset {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let media = match sniff(&bytes) {
            Some(m) if m.is_image() => m,
            _ => return Err(RowmarkError::Unsupported("not an image".into())),
        };
        let dimensions = ImageReader::new(Cursor::new(&bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Self {
            bytes,
            media,
            dimensions,
        })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(fs::read(path)?)
    }

    /// Pick the first image out of pasted text. Terminals paste file drops as
    /// paths, possibly quoted or as `file://` URLs, one per line.
    pub fn from_paste(text: &str) -> Option<Self> {
        text.lines()
            .filter_map(pasted_path)
            .filter(|p| p.is_file())
            .find_map(|p| match Self::from_path(&p) {
                Ok(asset) => Some(asset),
                Err(e) => {
                    log::debug!("pasted {:?} is not a usable image: {}", p, e);
                    None
                }
            })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media(&self) -> MediaType {
        self.media
    }

    /// Pixel size of the decoded image
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    pub fn decode(&self) -> Result<image::DynamicImage> {
        Ok(image::load_from_memory(&self.bytes)?)
    }
}

fn pasted_path(line: &str) -> Option<PathBuf> {
    let trimmed = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        return None;
    }
    let raw = trimmed.strip_prefix("file://").unwrap_or(trimmed);
    // drag-and-drop in many terminals escapes spaces
    Some(PathBuf::from(raw.replace("\\ ", " ")))
}

/// The pattern document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfDocument {
    bytes: Vec<u8>,
}

impl PdfDocument {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        match sniff(&bytes) {
            Some(MediaType::Pdf) => Ok(Self { bytes }),
            _ => Err(RowmarkError::Unsupported("not a pdf".into())),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bytes(fs::read(path)?)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A `file://` URL backed by a private copy of a payload. Dropping it revokes
/// the URL by deleting the copy, so a superseded document never lingers.
#[derive(Debug)]
pub struct DisplayUrl {
    path: PathBuf,
    url: String,
}

impl DisplayUrl {
    pub fn create(dir: &Path, stem: &str, media: MediaType, bytes: &[u8]) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%f");
        let path = dir.join(format!("{stem}-{stamp}.{}", media.extension()));
        fs::write(&path, bytes)?;
        let absolute = path.canonicalize().unwrap_or_else(|_| path.clone());
        let url = format!("file://{}", absolute.display());
        Ok(Self { path, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DisplayUrl {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::debug!("could not release {:?}: {}", self.path, e);
        }
    }
}

/// Something that can show a document URL to the user.
pub trait DocumentViewer {
    fn open(&mut self, url: &str) -> Result<()>;
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default)]
pub struct SystemViewer;

impl DocumentViewer for SystemViewer {
    fn open(&mut self, url: &str) -> Result<()> {
        if !Browser::is_available() {
            return Err(RowmarkError::Unsupported("no viewer available".into()));
        }
        webbrowser::open(url)?;
        Ok(())
    }
}

/// Remembers opened URLs instead of launching anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingViewer {
    opened: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
}

impl RecordingViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

impl DocumentViewer for RecordingViewer {
    fn open(&mut self, url: &str) -> Result<()> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(url.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    /// A small PNG with a gradient, `width` x `height`
    pub fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 10 % 256) as u8, (y * 10 % 256) as u8, 128])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub fn pdf() -> Vec<u8> {
        b"%PDF-1.4\n%rowmark test\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF\n".to_vec()
    }
}
