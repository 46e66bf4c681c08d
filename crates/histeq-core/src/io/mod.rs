pub mod image_io;

pub use image_io::{from_dynamic, load_image, save_image, to_dynamic};
