//! PDF acquisition and viewer state

mod acquire;
mod decoder;
#[cfg(feature = "pdf")]
mod engine;
mod request;
mod state;
mod zoom;

pub use acquire::{
    AcquireContext, AcquireStrategy, Acquired, AcquisitionChain, BackendProxyStrategy,
    DirectStrategy, ManualFetchStrategy, SignedUrlStrategy, storage_path,
};
pub use decoder::{NoPdfEngine, PdfDecoder, PdfDocument, check_signature};
#[cfg(feature = "pdf")]
pub use engine::MupdfDecoder;
pub use request::{RequestId, RequestTracker};
pub use state::{Command, Controls, Effect, NO_PAGES_MESSAGE, ViewerState};
pub use zoom::Zoom;

/// The decoder this build supports
pub fn default_decoder() -> std::rc::Rc<dyn PdfDecoder> {
    #[cfg(feature = "pdf")]
    {
        std::rc::Rc::new(MupdfDecoder)
    }
    #[cfg(not(feature = "pdf"))]
    {
        log::warn!("Built without the `pdf` feature; PDF documents cannot be decoded");
        std::rc::Rc::new(NoPdfEngine)
    }
}
