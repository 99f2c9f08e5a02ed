pub mod json_out;
pub mod m3u;

pub use json_out::export_json;
pub use m3u::export_m3u;
