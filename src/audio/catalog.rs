//! Sound catalog
//!
//! The fixed list of sounds the board can play. Built once at startup,
//! either from the bundled list or from a JSON manifest, and never changed
//! afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while building a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate filename in catalog: {0}")]
    DuplicateFilename(String),

    #[error("Duplicate id in catalog: {0}")]
    DuplicateId(String),

    #[error("Catalog entry has an empty {0}")]
    EmptyKey(&'static str),
}

/// One playable sound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEntry {
    pub id: String,
    pub filename: String,
    /// Short label shown under the button
    pub label: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    /// Asset path relative to the assets directory.
    /// Defaults to `sounds/<filename>` when omitted from a manifest.
    #[serde(default)]
    pub asset: PathBuf,
}

impl SoundEntry {
    /// Resolve the asset path against the assets directory
    pub fn asset_path(&self, assets_dir: &Path) -> PathBuf {
        if self.asset.as_os_str().is_empty() {
            assets_dir.join("sounds").join(&self.filename)
        } else {
            assets_dir.join(&self.asset)
        }
    }
}

/// Immutable, ordered sound catalog with unique filenames and ids
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<SoundEntry>,
    by_filename: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or duplicate keys
    pub fn new(entries: Vec<SoundEntry>) -> Result<Self, CatalogError> {
        let (by_filename, by_id) = index(&entries)?;
        Ok(Self {
            entries,
            by_filename,
            by_id,
        })
    }

    /// The sounds shipped with the app
    pub fn bundled() -> Result<Self, CatalogError> {
        let entry = |id: &str, filename: &str, label: &str, name: &str, description: &str, icon: &str| {
            SoundEntry {
                id: id.to_string(),
                filename: filename.to_string(),
                label: label.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                icon: icon.to_string(),
                asset: PathBuf::new(),
            }
        };

        let entries = vec![
            entry(
                "1",
                "classic-meow.m4a",
                "Happy meow",
                "Classic meow",
                "The classic meow, good for everyday chatting",
                "cat.fill",
            ),
            entry(
                "2",
                "demanding-meow.m4a",
                "Play with me",
                "Demanding meow",
                "A coaxing meow that grabs your cat's attention",
                "hand.tap.fill",
            ),
            entry(
                "3",
                "gentle-purr.m4a",
                "Purr",
                "Contented purr",
                "A contented purr that helps your cat relax",
                "heart.fill",
            ),
        ];

        Self::new(entries)
    }

    /// Load a catalog from a JSON manifest (an array of entries)
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let entries: Vec<SoundEntry> = serde_json::from_str(&contents)?;
        let catalog = Self::new(entries)?;
        log::info!(
            "Loaded {} sound(s) from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Look up an entry by filename
    pub fn get(&self, filename: &str) -> Option<&SoundEntry> {
        self.by_filename.get(filename).map(|&i| &self.entries[i])
    }

    /// Look up an entry by id
    pub fn get_by_id(&self, id: &str) -> Option<&SoundEntry> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    /// Look up by filename first, then by id
    pub fn find(&self, key: &str) -> Option<&SoundEntry> {
        self.get(key).or_else(|| self.get_by_id(key))
    }

    pub fn entries(&self) -> &[SoundEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type KeyIndex = HashMap<String, usize>;

/// Index entries by filename and by id, rejecting empty or duplicate keys
fn index(entries: &[SoundEntry]) -> Result<(KeyIndex, KeyIndex), CatalogError> {
    let mut by_filename = HashMap::with_capacity(entries.len());
    let mut by_id = HashMap::with_capacity(entries.len());

    for (position, entry) in entries.iter().enumerate() {
        if entry.filename.is_empty() {
            return Err(CatalogError::EmptyKey("filename"));
        }
        if entry.id.is_empty() {
            return Err(CatalogError::EmptyKey("id"));
        }
        if by_filename.insert(entry.filename.clone(), position).is_some() {
            return Err(CatalogError::DuplicateFilename(entry.filename.clone()));
        }
        if by_id.insert(entry.id.clone(), position).is_some() {
            return Err(CatalogError::DuplicateId(entry.id.clone()));
        }
    }

    Ok((by_filename, by_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn entry(id: &str, filename: &str) -> SoundEntry {
        SoundEntry {
            id: id.to_string(),
            filename: filename.to_string(),
            label: String::new(),
            name: String::new(),
            description: String::new(),
            icon: String::new(),
            asset: PathBuf::new(),
        }
    }

    #[test]
    fn test_bundled_catalog() {
        let catalog = Catalog::bundled().unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entries()[0].filename, "classic-meow.m4a");
        assert_eq!(catalog.get("gentle-purr.m4a").map(|e| e.id.as_str()), Some("3"));
        assert_eq!(
            catalog.get_by_id("2").map(|e| e.filename.as_str()),
            Some("demanding-meow.m4a")
        );
        assert!(catalog.get("nonexistent.m4a").is_none());
    }

    #[test]
    fn test_find_prefers_filename() {
        let catalog = Catalog::new(vec![entry("a.m4a", "b.m4a"), entry("x", "a.m4a")]).unwrap();
        assert_eq!(catalog.find("a.m4a").map(|e| e.id.as_str()), Some("x"));
        assert_eq!(catalog.find("x").map(|e| e.filename.as_str()), Some("a.m4a"));
    }

    #[test]
    fn test_duplicate_filename_rejected() {
        let result = Catalog::new(vec![entry("1", "meow.m4a"), entry("2", "meow.m4a")]);
        assert!(matches!(result, Err(CatalogError::DuplicateFilename(f)) if f == "meow.m4a"));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = Catalog::new(vec![entry("1", "a.m4a"), entry("1", "b.m4a")]);
        assert!(matches!(result, Err(CatalogError::DuplicateId(id)) if id == "1"));
    }

    #[test]
    fn test_empty_key_rejected() {
        let result = Catalog::new(vec![entry("1", "")]);
        assert!(matches!(result, Err(CatalogError::EmptyKey("filename"))));

        let result = Catalog::new(vec![entry("1", "a.m4a"), entry("", "b.m4a")]);
        assert!(matches!(result, Err(CatalogError::EmptyKey("id"))));
    }

    #[test]
    fn test_index_positions_follow_entry_order() {
        let entries = vec![entry("7", "a.m4a"), entry("8", "b.m4a")];
        let (by_filename, by_id) = index(&entries).unwrap();
        assert_eq!(by_filename["b.m4a"], 1);
        assert_eq!(by_id["7"], 0);

        let duplicated = vec![entry("1", "a.m4a"), entry("2", "b.m4a"), entry("1", "c.m4a")];
        assert!(matches!(index(&duplicated), Err(CatalogError::DuplicateId(id)) if id == "1"));
    }

    #[test]
    fn test_asset_path() {
        let mut e = entry("1", "meow.m4a");
        assert_eq!(
            e.asset_path(Path::new("assets")),
            Path::new("assets").join("sounds").join("meow.m4a")
        );
        e.asset = PathBuf::from("custom/purr.wav");
        assert_eq!(e.asset_path(Path::new("assets")), Path::new("assets").join("custom/purr.wav"));
    }

    #[test]
    fn test_from_manifest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{ "id": "1", "filename": "trill.wav", "label": "Trill", "name": "Happy trill" }},
                {{ "id": "2", "filename": "hiss.wav", "label": "Hiss", "name": "Hiss", "asset": "fx/hiss.wav" }}
            ]"#
        )
        .unwrap();

        let catalog = Catalog::from_manifest(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("hiss.wav").unwrap().asset, PathBuf::from("fx/hiss.wav"));
        assert_eq!(catalog.get("trill.wav").unwrap().description, "");
    }

    #[test]
    fn test_from_manifest_rejects_duplicates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{ "id": "1", "filename": "trill.wav", "label": "", "name": "" }},
                {{ "id": "2", "filename": "trill.wav", "label": "", "name": "" }}
            ]"#
        )
        .unwrap();

        assert!(matches!(
            Catalog::from_manifest(file.path()),
            Err(CatalogError::DuplicateFilename(_))
        ));
    }
}
