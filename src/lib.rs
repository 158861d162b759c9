pub mod http;
pub mod playlist;
pub mod settings;
