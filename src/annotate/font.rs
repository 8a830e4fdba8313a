//! Label font resolution.
//!
//! No font is bundled with the binary; one is resolved at startup from the
//! `--font` flag, the `CAMTRAP_FONT` environment variable, or well-known
//! system locations. Without a font the annotator still draws boxes and only
//! skips the text labels.

use crate::constants::FONT_ENV;
use ab_glyph::FontArc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// System font locations probed in order.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Resolve a label font, preferring the explicit path.
///
/// Returns `None` (with a warning) when nothing usable is found.
pub fn resolve(explicit: Option<&Path>) -> Option<FontArc> {
    let candidates: Vec<PathBuf> = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::env::var_os(FONT_ENV).map(PathBuf::from))
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
        .collect();

    for path in candidates {
        match load(&path) {
            Some(font) => {
                debug!("annotation font: {}", path.display());
                return Some(font);
            }
            None => continue,
        }
    }

    warn!("no label font found; annotated images will carry boxes without text");
    None
}

fn load(path: &Path) -> Option<FontArc> {
    let bytes = std::fs::read(path).ok()?;
    FontArc::try_from_vec(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_font_falls_through() {
        // A bogus explicit path must not panic; system fallback may or may
        // not resolve depending on the host.
        let _ = resolve(Some(Path::new("/nonexistent/font.ttf")));
    }

    #[test]
    fn test_load_rejects_non_font_file() {
        let file = tempfile::NamedTempFile::new().ok();
        if let Some(file) = file {
            std::fs::write(file.path(), b"not a font").ok();
            assert!(load(file.path()).is_none());
        }
    }
}
