use image::imageops::FilterType;
use ndarray::{Array, Ix4};
use thiserror::Error;

/// Side length of the square model input.
pub const INPUT_SIZE: u32 = 224;
pub const INPUT_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Error guessing image format: {0}")]
    Format(#[from] std::io::Error),
    #[error("Error decoding image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decodes `image_data` and lays it out as a `[1, 224, 224, 3]` batch scaled to `[0, 1]`.
///
/// Any resolution and color mode is accepted: the image is stretched to the
/// model's input size and forced to RGB, so alpha is dropped and grayscale is
/// replicated across the three channels.
pub fn transform_image(image_data: &[u8]) -> Result<Array<f32, Ix4>, ImageError> {
    let image_reader =
        image::ImageReader::new(std::io::Cursor::new(image_data)).with_guessed_format()?;
    let original_img = image_reader.decode()?;

    let img = original_img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let size = INPUT_SIZE as usize;
    let input = Array::from_shape_fn((1, size, size, INPUT_CHANNELS), |(_, y, x, c)| {
        (img.get_pixel(x as u32, y as u32)[c] as f32) / 255.
    });

    Ok(input)
}
