//! Platform-specific Windows implementations
//!
//! This module encapsulates all Win32 API interactions: the top-level
//! window that hosts the notes and its message loop.

pub mod window;
pub mod windows;
