use std::fs;
use std::path::Path;

use color_eyre::Result;
use tracing::warn;
use uuid::Uuid;

pub const PHOTO_EXT: &str = "jpeg";

/// Canonical filename of the full-size photo for an entry.
pub fn photo_name(id: Uuid) -> String {
    format!("{id}.{PHOTO_EXT}")
}

/// Thumbnail filename, derived from the full-size name by substitution.
pub fn thumbnail_name(image_name: &str) -> String {
    image_name.replace(PHOTO_EXT, "thumbnail.jpeg")
}

/// Copy a photo into the data directory under the entry's canonical name.
/// The thumbnail slot is filled with a second copy; per-pixel downscaling is
/// left to whatever displays the file. Returns the stored relative filename.
pub fn import_photo(src: &Path, data_dir: &Path, id: Uuid) -> Result<String> {
    let name = photo_name(id);
    fs::create_dir_all(data_dir)?;
    fs::copy(src, data_dir.join(&name))?;
    if let Err(err) = fs::copy(src, data_dir.join(thumbnail_name(&name))) {
        warn!(error = %err, "could not write thumbnail copy");
    }
    Ok(name)
}

/// Delete every `.jpeg` file in the data directory, skipping hidden files.
/// Per-file failures are logged and the sweep continues.
pub fn delete_photos(data_dir: &Path) {
    let dir = match fs::read_dir(data_dir) {
        Ok(dir) => dir,
        Err(err) => {
            warn!(path = %data_dir.display(), error = %err, "could not list photos");
            return;
        }
    };

    for dirent in dir.flatten() {
        let path = dirent.path();
        let hidden = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with('.'))
            .unwrap_or(false);
        if hidden || path.extension().and_then(|ext| ext.to_str()) != Some(PHOTO_EXT) {
            continue;
        }
        if let Err(err) = fs::remove_file(&path) {
            warn!(path = %path.display(), error = %err, "could not delete photo");
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn thumbnail_name_substitutes_extension() {
        let id = Uuid::new_v4();
        let name = photo_name(id);
        assert_eq!(thumbnail_name(&name), format!("{id}.thumbnail.jpeg"));
    }

    #[test]
    fn import_copies_full_size_and_thumbnail() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("picked.jpeg");
        fs::write(&src, b"jpeg bytes").unwrap();

        let id = Uuid::new_v4();
        let name = import_photo(&src, dir.path(), id).unwrap();
        assert_eq!(name, format!("{id}.jpeg"));
        assert_eq!(fs::read(dir.path().join(&name)).unwrap(), b"jpeg bytes");
        assert!(dir.path().join(thumbnail_name(&name)).exists());
    }

    #[test]
    fn import_fails_when_source_is_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.jpeg");
        assert!(import_photo(&missing, dir.path(), Uuid::new_v4()).is_err());
    }

    #[test]
    fn delete_photos_removes_only_jpeg_files() {
        let dir = TempDir::new().unwrap();
        let id = Uuid::new_v4();
        fs::write(dir.path().join(photo_name(id)), b"x").unwrap();
        fs::write(dir.path().join(format!("{id}.thumbnail.jpeg")), b"x").unwrap();
        fs::write(dir.path().join("journal.json"), b"[]").unwrap();
        fs::write(dir.path().join(".hidden.jpeg"), b"x").unwrap();

        delete_photos(dir.path());

        assert!(!dir.path().join(photo_name(id)).exists());
        assert!(!dir.path().join(format!("{id}.thumbnail.jpeg")).exists());
        assert!(dir.path().join("journal.json").exists());
        assert!(dir.path().join(".hidden.jpeg").exists());
    }

    #[test]
    fn delete_photos_on_missing_directory_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        delete_photos(&dir.path().join("does-not-exist"));
    }
}
