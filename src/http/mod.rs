//! HTTP surface for sign-in, sign-out and the on-site list.

pub mod gateway;

pub use gateway::{VisitorServer, router};
