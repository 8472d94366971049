pub mod api;
pub mod error;
pub mod panic_handler;
pub mod pdf;
pub mod record;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod source;
pub mod surface;
pub mod viewer;
pub mod vitals;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use record::DocumentRecord;
pub use source::{ContentKind, classify};
pub use surface::{Canvas, Placeholder, RasterSurface};
pub use viewer::{OpenOutcome, Viewer, ViewerOptions, ViewerServices};
pub use vitals::{VitalEntry, VitalStatus, VitalsOutcome};
