//! HTTP handlers for facerate-ui

pub mod buildinfo;
pub mod health;
pub mod pages;
pub mod render;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use pages::{get_state, index, login, logout, rate, register, skip};
pub use render::serve_style_css;
