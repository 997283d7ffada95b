pub mod catalog_service;
pub mod file_store;
pub mod video_service;
