//! Domain logic and core data structures
//!
//! This module contains pure note geometry that is independent
//! of threads, channels and Win32.

pub mod core;
pub mod note;
