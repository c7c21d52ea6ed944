use std::path::PathBuf;

use thiserror::Error;

/// Every condition here aborts the run it occurs in. Nothing is retried.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot read source {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file {0:?} appears more than once in the input")]
    DuplicateFile(String),

    #[error("write for batch {batch} not confirmed: {reason}")]
    WriteNotConfirmed { batch: usize, reason: String },

    #[error("address integrity failure: {resolved} of {expected} chunks resolved (missing: {})", .missing.join(", "))]
    AddressIntegrity {
        resolved: usize,
        expected: usize,
        missing: Vec<String>,
    },

    #[error("cannot reconstruct {file}: {reason}")]
    Decompression { file: String, reason: String },

    #[error("store returned {actual} addresses for {expected} lookups")]
    LookupMisaligned { expected: usize, actual: usize },

    #[error("store error: {0}")]
    Store(#[from] cfd_store::StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] cfd_codec::CodecError),

    #[error("manifest error: {0}")]
    Manifest(String),

    #[error("cannot write output {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type DeployResult<T> = Result<T, DeployError>;
