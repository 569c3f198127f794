//! Output packaging: turn a finished artifact into a downloadable file.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{MediaError, MediaResult};

/// Name used when nothing better can be derived.
pub const DEFAULT_FILE_STEM: &str = "generated-video";
const VIDEO_EXTENSION: &str = "mp4";
const WATERMARK_SUFFIX: &str = "-watermarked";

/// Pick the output file name.
///
/// The preferred name wins as-is (sanitised, `.mp4` ensured). Otherwise the
/// stem comes from the locator's last path segment or [`DEFAULT_FILE_STEM`],
/// with `-watermarked` appended when the watermark was applied.
pub fn derive_file_name(preferred: Option<&str>, locator: &str, watermarked: bool) -> String {
    if let Some(name) = preferred.map(sanitize_file_name).filter(|n| !n.is_empty()) {
        return ensure_extension(name);
    }

    let stem = locator_stem(locator)
        .map(|s| sanitize_file_name(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_STEM.to_string());

    if watermarked {
        format!("{}{}.{}", stem, WATERMARK_SUFFIX, VIDEO_EXTENSION)
    } else {
        format!("{}.{}", stem, VIDEO_EXTENSION)
    }
}

/// Keep `[A-Za-z0-9._-]`, map everything else to `_`, no leading dots.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

fn ensure_extension(name: String) -> String {
    let has_mp4 = Path::new(&name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(VIDEO_EXTENSION));
    if has_mp4 {
        name
    } else {
        format!("{}.{}", name, VIDEO_EXTENSION)
    }
}

/// Last path segment of the locator without query, fragment or extension.
fn locator_stem(locator: &str) -> Option<String> {
    let path = match url::Url::parse(locator) {
        Ok(url) if url.scheme().len() > 1 => url.path().to_string(),
        _ => locator.to_string(),
    };

    let segment = path.rsplit(['/', '\\']).find(|s| !s.is_empty())?;
    let stem = Path::new(segment).file_stem()?.to_string_lossy().into_owned();
    (!stem.is_empty()).then_some(stem)
}

/// Writes artifacts into a download directory.
#[derive(Debug, Clone)]
pub struct OutputPackager {
    dir: PathBuf,
}

impl OutputPackager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` as `file_name` inside the download directory.
    ///
    /// Bytes go to a temp file in the same directory first and are then
    /// persisted under the final name, replacing any existing file.
    pub async fn package(&self, data: Vec<u8>, file_name: &str) -> MediaResult<PathBuf> {
        let name = ensure_extension(sanitize_file_name(file_name));
        let name = if name == format!(".{}", VIDEO_EXTENSION) {
            format!("{}.{}", DEFAULT_FILE_STEM, VIDEO_EXTENSION)
        } else {
            name
        };
        let target = self.dir.join(&name);
        let dir = self.dir.clone();
        let size = data.len();

        let path = tokio::task::spawn_blocking(move || -> MediaResult<PathBuf> {
            use std::io::Write;

            std::fs::create_dir_all(&dir)?;
            let mut staging = tempfile::Builder::new()
                .prefix(".vgen-")
                .suffix(".part")
                .tempfile_in(&dir)?;
            staging.write_all(&data)?;
            staging.as_file().sync_all()?;
            staging.persist(&target).map_err(|e| MediaError::Io(e.error))?;
            Ok(target)
        })
        .await
        .map_err(|e| MediaError::internal(format!("Packaging task failed: {}", e)))??;

        info!(path = %path.display(), bytes = size, "Packaged output");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferred_name_wins() {
        assert_eq!(derive_file_name(Some("my clip"), "https://x/y/a.mp4", true), "my_clip.mp4");
        assert_eq!(derive_file_name(Some("final.MP4"), "", false), "final.MP4");
        assert_eq!(derive_file_name(Some("../../etc/passwd"), "", false), "_.._etc_passwd.mp4");
    }

    #[test]
    fn test_name_from_locator() {
        assert_eq!(
            derive_file_name(None, "https://cdn.example.com/out/abc123.mp4?sig=1", false),
            "abc123.mp4"
        );
        assert_eq!(
            derive_file_name(None, "https://cdn.example.com/out/abc123.mp4", true),
            "abc123-watermarked.mp4"
        );
        assert_eq!(derive_file_name(None, "/tmp/videos/local.mov", false), "local.mp4");
    }

    #[test]
    fn test_default_name() {
        assert_eq!(derive_file_name(None, "https://cdn.example.com/", false), "generated-video.mp4");
        assert_eq!(derive_file_name(Some("  "), "", true), "generated-video-watermarked.mp4");
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_file_name("a/b\\c:d"), "a_b_c_d");
        assert_eq!(sanitize_file_name("..hidden"), "hidden");
        assert_eq!(sanitize_file_name("ok-name_1.mp4"), "ok-name_1.mp4");
    }

    #[tokio::test]
    async fn test_package_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let packager = OutputPackager::new(dir.path().join("downloads"));

        let path = packager.package(b"video".to_vec(), "clip").await.unwrap();
        assert_eq!(path, dir.path().join("downloads").join("clip.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"video");

        // No staging files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("downloads"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_package_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let packager = OutputPackager::new(dir.path());

        packager.package(b"first".to_vec(), "same.mp4").await.unwrap();
        let path = packager.package(b"second".to_vec(), "same.mp4").await.unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"second");
    }
}
