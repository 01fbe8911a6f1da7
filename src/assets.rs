use anyhow::{Context, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A resolved input asset. `local_path` always points at an on-disk copy,
/// which ffmpeg needs for the audio track.
pub struct Asset {
    pub bytes: Vec<u8>,
    pub local_path: PathBuf,
}

impl Asset {
    pub fn extension(&self) -> Option<&str> {
        self.local_path.extension().and_then(|e| e.to_str())
    }
}

/// Resolves an asset reference the way the project's media paths work:
/// `http(s)` URLs are fetched, anything else is a path under `root` with an
/// optional leading slash.
pub fn fetch(spec: &str, root: &Path) -> Result<Asset> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        fetch_url(spec)
    } else {
        let normalized = spec.strip_prefix('/').unwrap_or(spec);
        let path = root.join(normalized);
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to read asset: {}", path.display()))?;
        Ok(Asset {
            bytes,
            local_path: path,
        })
    }
}

fn fetch_url(url: &str) -> Result<Asset> {
    log::info!("Fetching {url}");
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to fetch asset: {url}"))?
        .error_for_status()
        .with_context(|| format!("Asset request failed: {url}"))?;
    let bytes = response.bytes()?.to_vec();

    // Cache under a name derived from the URL so ffmpeg can reopen it.
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let name = match url.rsplit('/').next().filter(|n| !n.is_empty()) {
        Some(tail) => format!("{:016x}-{tail}", hasher.finish()),
        None => format!("{:016x}", hasher.finish()),
    };
    let local_path = std::env::temp_dir().join("viben").join(name);
    if let Some(parent) = local_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&local_path, &bytes)
        .with_context(|| format!("Failed to cache asset at {}", local_path.display()))?;

    Ok(Asset { bytes, local_path })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_slash_is_stripped() {
        let dir = std::env::temp_dir().join("viben-test-assets");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("clip.srt"), b"1\n00:00:00,000 --> 00:00:01,000\nhi\n")
            .unwrap();

        let asset = fetch("/clip.srt", &dir).unwrap();
        assert!(asset.bytes.starts_with(b"1\n"));
        assert_eq!(asset.extension(), Some("srt"));
    }

    #[test]
    fn missing_file_errors() {
        let dir = std::env::temp_dir().join("viben-test-assets");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(fetch("nope/missing.mp3", &dir).is_err());
    }
}
