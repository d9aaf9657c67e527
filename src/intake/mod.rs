//! File intake: the selection of candidate uploads, the rules that admit
//! them, and their derived preview/progress state.

mod blob;
mod controller;
mod policy;

pub use blob::{Base64Reader, Blob, BlobId, BlobReader, to_base64, to_data_url};
pub use controller::{FileEntry, FileEntryView, IntakeController, IntakeEvent, ProgressSchedule};
pub use policy::{AcceptPolicy, DEFAULT_MAX_SIZE, Dropped, RejectedFile, Rejection};
