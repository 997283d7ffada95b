//! Data models for the video catalog.
//!
//! `VideoRecord` maps to the `videos` table via `sqlx::FromRow`; `VideoView`
//! is the JSON representation handed back to admin clients.

pub mod video;
