#![allow(clippy::derive_partial_eq_without_eq)]
//! Protocol buffer messages that make up the footer of a Strata file.
//!
//! Closed id sets (physical types, repetitions, encodings, codecs) are carried as plain
//! integers so that a reader can detect ids it does not understand and report them, instead of
//! having them silently mapped to a default variant by the decoder.

pub mod footer;
