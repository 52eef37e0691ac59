use crate::Format;
use serde::{Deserialize, Serialize};

/// Describes the contents of a pack file.
///
/// ```toml
/// [format]
/// copy_offsets = "absolute"
///
/// [[asset]]
/// name = "title.spr"
/// offset = 0
/// compressed_len = 412
/// uncompressed_len = 2048
/// crc = 0x1c291ca3
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub format: Format,

    #[serde(rename = "asset", default)]
    pub assets: Vec<PackedAsset>,
}

/// Location and metadata of one compressed asset inside a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedAsset {
    pub name: String,

    pub offset: usize,
    pub compressed_len: usize,

    /// used as the decoder capacity
    pub uncompressed_len: usize,
    /// CRC32 of the uncompressed data
    pub crc: u32,
}

impl AssetManifest {
    pub fn parse(manifest: &str) -> Result<AssetManifest, toml::de::Error> {
        toml::de::from_str(manifest)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn find(&self, name: &str) -> Option<&PackedAsset> {
        self.assets.iter().find(|asset| asset.name == name)
    }

    pub fn total_uncompressed_len(&self) -> usize {
        self.assets.iter().map(|asset| asset.uncompressed_len).sum()
    }
}

impl PackedAsset {
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        let end = self.offset.checked_add(self.compressed_len)?;
        Some(self.offset..end)
    }
}
