//! # codec
//!
//! Core traits for encoding and decoding directory-protocol data.
//!
//! This crate defines the fundamental `Decoder` and `Encoder` traits that
//! establish a type-safe conversion pattern used by the `ber` and
//! `attribute` crates.
//!
//! ## Overview
//!
//! The conversion pattern flows like this:
//! ```text
//! &[u8] → Ber → Tlv → Attribute
//! ```
//!
//! Each step uses the `Decoder` trait to convert from one type to the next,
//! and the `Encoder` trait to convert in the reverse direction.
//!
//! ## Type Safety
//!
//! The traits use marker traits (`DecodableFrom` and `EncodableTo`) to ensure
//! type safety at compile time. This prevents invalid conversions and catches
//! errors early in the development process.

#![forbid(unsafe_code)]

pub mod decoder;
pub mod encoder;
