//! Payment-processor integration for the Printworks storefront.
//!
//! The storefront never charges cards itself: at checkout time it
//! reconciles the visitor's cart against the processor's product catalog —
//! creating or re-pricing processor products as needed — and hands the
//! browser a hosted payment page URL built from the resulting line items.
//!
//! The processor is the source of truth for its catalog; this crate only
//! proposes creates and updates, keyed by artwork title. Any processor
//! error aborts the whole synchronization: there is no partial application
//! tracking and no retry, so a product created before a later failure stays
//! created (an accepted gap, surfaced as a generic error at the boundary).

pub mod error;
pub mod processor;
pub mod stripe;
pub mod sync;

pub use error::{ProcessorError, SyncError};
#[cfg(any(test, feature = "test-utils"))]
pub use processor::MockProcessor;
pub use processor::{
    FileLink, LineItem, PaymentLink, PaymentProcessor, ProcessorFile, ProcessorPrice,
    ProcessorProduct,
};
pub use stripe::StripeClient;
pub use sync::{ImageSource, ProductImage, build_line_items};
