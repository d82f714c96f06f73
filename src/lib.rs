pub mod crypto;
pub mod envelope;
pub mod metadata;
pub mod naming;
pub mod processor;
pub mod batch;
pub mod cli;

pub use envelope::{Envelope, EnvelopeError, HEADER_LEN};
pub use metadata::FileMetadata;
pub use processor::{
    decrypt_file, decrypt_file_with, encrypt_file, encrypt_file_with,
    DecryptedFile, EncryptedFile, ProcessError, ProcessorOptions,
};
pub use batch::{Batch, BatchItem, BatchOutcome, BatchSummary, CancelFlag};
