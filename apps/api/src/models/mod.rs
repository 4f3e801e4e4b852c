pub mod profile;
pub mod saved_search;
