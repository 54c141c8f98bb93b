//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the vocabulary every other crate agrees on:
//! - The unified error type and its classification
//! - The JSON response envelope returned by every API route
//! - Typed ID wrappers
//! - The authenticated identity carried through a request
//!
//! Only things that are hard to change and mean the same thing in every
//! crate belong here.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod envelope;
pub mod id;
pub mod identity;
