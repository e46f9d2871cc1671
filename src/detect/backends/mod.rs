pub mod marker;

#[cfg(feature = "backend-rqrr")]
pub mod qr;

pub use marker::MarkerBackend;

#[cfg(feature = "backend-rqrr")]
pub use qr::QrBackend;
