//! Writing embedded media to the caller's asset directory.

use std::fs;
use std::path::{Path, PathBuf};

/// Destination for extracted images and the URL prefix used to reference them.
#[derive(Debug, Clone)]
pub struct AssetSink {
    dir: PathBuf,
    url_prefix: String,
    default_ext: String,
}

impl AssetSink {
    pub fn new(dir: &Path, url_prefix: &str, default_ext: &str) -> Self {
        Self {
            dir: dir.to_path_buf(),
            url_prefix: url_prefix.to_string(),
            default_ext: default_ext.to_string(),
        }
    }

    /// `slide_<n>_image_<z>.<ext>`
    pub fn image_name(&self, slide: usize, z: u32, media_part: &str) -> String {
        format!("slide_{}_image_{}.{}", slide, z, self.extension_of(media_part))
    }

    /// `slide_<n>_background.<ext>`
    pub fn background_name(&self, slide: usize, media_part: &str) -> String {
        format!("slide_{}_background.{}", slide, self.extension_of(media_part))
    }

    /// Write `data` under `file_name` and return its `src` reference.
    pub fn write(&self, file_name: &str, data: &[u8]) -> std::io::Result<String> {
        fs::write(self.dir.join(file_name), data)?;
        log::debug!("Extracted asset {}", file_name);
        Ok(self.src_for(file_name))
    }

    /// Join the URL prefix and a file name with exactly one slash.
    pub fn src_for(&self, file_name: &str) -> String {
        if self.url_prefix.is_empty() || self.url_prefix.ends_with('/') {
            format!("{}{}", self.url_prefix, file_name)
        } else {
            format!("{}/{}", self.url_prefix, file_name)
        }
    }

    fn extension_of(&self, media_part: &str) -> String {
        let name = media_part.rsplit('/').next().unwrap_or(media_part);
        match name.rsplit_once('.') {
            Some((stem, ext))
                if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                ext.to_ascii_lowercase()
            }
            _ => self.default_ext.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_extensions() {
        let sink = AssetSink::new(Path::new("/tmp"), "/assets", "png");
        assert_eq!(
            sink.image_name(2, 5, "ppt/media/image3.JPEG"),
            "slide_2_image_5.jpeg"
        );
        assert_eq!(sink.image_name(1, 0, "ppt/media/image3"), "slide_1_image_0.png");
        assert_eq!(sink.background_name(4, "ppt/media/bg.emf"), "slide_4_background.emf");
    }

    #[test]
    fn test_src_for_joins_prefix() {
        let dir = Path::new("/tmp");
        assert_eq!(AssetSink::new(dir, "/assets", "png").src_for("a.png"), "/assets/a.png");
        assert_eq!(AssetSink::new(dir, "/assets/", "png").src_for("a.png"), "/assets/a.png");
        assert_eq!(AssetSink::new(dir, "", "png").src_for("a.png"), "a.png");
    }

    #[test]
    fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = AssetSink::new(dir.path(), "/a", "png");
        let src = sink.write("x.png", b"data").unwrap();
        assert_eq!(src, "/a/x.png");
        assert_eq!(std::fs::read(dir.path().join("x.png")).unwrap(), b"data");
    }
}
