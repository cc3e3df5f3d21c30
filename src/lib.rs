pub mod models;
pub mod source;
pub mod util;
pub mod widget;
