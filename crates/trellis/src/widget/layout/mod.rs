//! Layout engine for screens.
//!
//! The engine arranges an ordered list of item peers into rows inside a
//! fixed-size viewport. See [`manager`] for the algorithm; screens invoke
//! it through [`manager::run`] with either a full or an incremental mode.

pub mod manager;

pub use manager::LayoutMode;
