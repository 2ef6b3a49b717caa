//! User-facing parcel operations.

pub mod parcels;
