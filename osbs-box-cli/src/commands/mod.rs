pub mod cluster;
pub mod down;
pub mod image;
pub mod status;
pub mod up;
