//! Barcode capture for product lookup.
//!
//! Still images go through [`decode_with_fallbacks`], which walks a ladder of
//! [`DecodeConfig`]s. Frame streams go through [`scan_stream`], which stops on
//! the first detection.

pub mod config;
pub mod decode;
pub mod external;
pub mod stream;

pub use config::{default_ladder, DecodeConfig, PatchSize, DEFAULT_LADDER};
pub use decode::{decode_file, decode_with_fallbacks, BarcodeError, NOT_FOUND_MESSAGE};
pub use external::{preprocess, ExternalDecoder};
pub use stream::{
    scan_stream, DirectoryFrameSource, StreamControl, StreamHandle, StreamOutcome,
};
