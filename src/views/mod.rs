//! HTML rendering.

pub mod pages;
