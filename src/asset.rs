use rayon::prelude::*;
use std::{fs, path::Path};
use thiserror::Error;

use crate::{compress_with, DecompressError, Decompressor};

mod manifest;
pub use manifest::{AssetManifest, PackedAsset};

/// A blob of concatenated compressed assets together with the manifest
/// describing where each one lives.
#[derive(Debug, Clone)]
pub struct AssetPack {
    pub manifest: AssetManifest,
    data: Vec<u8>,
}

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Failed to read asset pack")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse asset manifest")]
    Manifest(#[from] toml::de::Error),
    #[error("No asset named {0} in the pack")]
    UnknownAsset(String),
    #[error("Asset {0} lies outside the pack data")]
    OutOfBounds(String),
    #[error("Failed to decompress asset {name}")]
    Decompress {
        name: String,
        #[source]
        source: DecompressError,
    },
    #[error("Asset {name} decompressed to {actual} bytes, expected {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("Asset {name} has CRC {actual:#010x}, expected {expected:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },
}

impl AssetPack {
    pub fn open<P: AsRef<Path>, M: AsRef<Path>>(pack: P, manifest: M) -> Result<Self, AssetError> {
        let data = fs::read(pack.as_ref())?;
        let manifest = AssetManifest::parse(&fs::read_to_string(manifest.as_ref())?)?;

        Ok(Self::from_parts(manifest, data))
    }

    pub fn from_parts(manifest: AssetManifest, data: Vec<u8>) -> Self {
        Self { manifest, data }
    }

    /// Compress every asset and lay them out back to back.
    pub fn build<N, D, I>(assets: I, format: crate::Format) -> Self
    where
        N: Into<String>,
        D: AsRef<[u8]> + Sync,
        I: IntoIterator<Item = (N, D)>,
    {
        let assets = assets
            .into_iter()
            .map(|(name, data)| (name.into(), data))
            .collect::<Vec<(String, D)>>();

        let compressed = assets
            .par_iter()
            .map(|(_, data)| {
                let data = data.as_ref();
                (compress_with(data, format), data.len(), crc32fast::hash(data))
            })
            .collect::<Vec<_>>();

        let mut manifest = AssetManifest {
            format,
            assets: Vec::with_capacity(assets.len()),
        };
        let mut data = Vec::new();

        for ((name, _), (stream, uncompressed_len, crc)) in assets.into_iter().zip(compressed) {
            log::debug!(
                "packed {} ({} -> {} bytes) at {:#x}",
                name,
                uncompressed_len,
                stream.len(),
                data.len()
            );

            manifest.assets.push(PackedAsset {
                name,
                offset: data.len(),
                compressed_len: stream.len(),
                uncompressed_len,
                crc,
            });
            data.extend_from_slice(&stream);
        }

        Self { manifest, data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn assets(&self) -> &[PackedAsset] {
        &self.manifest.assets
    }

    pub fn extract(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let asset = self
            .manifest
            .find(name)
            .ok_or_else(|| AssetError::UnknownAsset(name.to_string()))?;

        self.extract_asset(asset)
    }

    /// Decompress a single asset and check it against its recorded size and CRC.
    pub fn extract_asset(&self, asset: &PackedAsset) -> Result<Vec<u8>, AssetError> {
        let stream = asset
            .range()
            .and_then(|range| self.data.get(range))
            .ok_or_else(|| AssetError::OutOfBounds(asset.name.clone()))?;

        let result = Decompressor::new(stream, 0)
            .with_capacity(asset.uncompressed_len)
            .with_format(self.manifest.format)
            .decompress()
            .map_err(|source| AssetError::Decompress {
                name: asset.name.clone(),
                source,
            })?;

        if result.data.len() != asset.uncompressed_len {
            return Err(AssetError::SizeMismatch {
                name: asset.name.clone(),
                expected: asset.uncompressed_len,
                actual: result.data.len(),
            });
        }

        let crc = crc32fast::hash(&result.data);
        if crc != asset.crc {
            return Err(AssetError::ChecksumMismatch {
                name: asset.name.clone(),
                expected: asset.crc,
                actual: crc,
            });
        }

        Ok(result.data)
    }
}
