pub mod create_upload;
pub mod lookup_urls;
pub mod show_secure;
pub mod show_short_url;
pub mod show_upload;
pub mod upload_metadata;
