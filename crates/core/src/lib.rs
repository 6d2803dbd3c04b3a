//! Domain core of the payment notification service.
//!
//! Everything here is free of I/O:
//!
//! - [`payload`]: decodes the raw database notification into a
//!   [`RecipientDescriptor`](payload::RecipientDescriptor).
//! - [`identity`]: resolves a descriptor into a
//!   [`CanonicalIdentity`](types::CanonicalIdentity).
//! - [`access`]: optional allow-list gate applied before composing.
//! - [`composer`]: renders, encrypts (NIP-04) and signs the direct message.
//! - [`keys`]: the process-wide [`ServiceIdentity`](keys::ServiceIdentity).

pub mod access;
pub mod channels;
pub mod composer;
pub mod error;
pub mod identity;
pub mod keys;
pub mod payload;
pub mod types;
