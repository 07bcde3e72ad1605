//! Audiofetch engine: server API, push channel and durable storage.
mod api;
mod artifact;
mod channel;
mod engine;
mod persist;
mod store;
mod types;
mod wire;

pub use api::{ApiSettings, JobApi, ReqwestApi, DEFAULT_SERVER_URL};
pub use artifact::{filename_from_disposition, sanitize_filename};
pub use channel::{channel_url, run_channel, HANDSHAKE_TIMEOUT};
pub use engine::EngineHandle;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use store::{
    decode_ledger, encode_ledger, write_ledger_union, DurableStore, FileStore, MemoryStore,
    StoreChange, StoreError, CREDENTIAL_KEY, LEDGER_KEY,
};
pub use types::{ApiError, EngineEvent, FailureKind, JobId, ListPurpose, Origin};
pub use wire::{
    ChannelFrame, CreateJobBody, JobRecord, ServerConfigRecord, ServerDownloadRecord, WireMode,
    WireProgress, WireStatus,
};
