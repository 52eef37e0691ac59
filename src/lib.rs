mod compression;
pub use compression::{
    compress, compress_with, decompress, decompress_into, decompress_into_with, decompress_with,
    Compressor, CopyOffsets, DecompressError, Decompressed, Decompressor, EncodeError, Format,
    Operation, Operations, StreamReader, DEFAULT_MAX_SIZE, END_MARKER, FILL, LONG_COPY,
    MAX_FILL_RUN, MAX_LITERAL_RUN, MAX_LONG_COPY, MAX_MEDIUM_COPY, MAX_SHORT_COPY,
    MAX_SHORT_OFFSET, MIN_FILL_RUN, MIN_MATCH,
};

mod asset;
pub use asset::{AssetError, AssetManifest, AssetPack, PackedAsset};
