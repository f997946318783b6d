//! Domain types shared by the E-Gram Panchayat portal.
//!
//! Pure value types with no framework or storage dependencies: validated email addresses,
//! generated file identifiers, data-URI payloads and one-time codes.

pub mod data_uri;
pub mod email;
pub mod id;
pub mod otp;
