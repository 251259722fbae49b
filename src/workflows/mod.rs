//! Feature workflows exposed by the service.

pub mod promo;
