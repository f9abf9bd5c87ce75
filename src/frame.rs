use super::math::{Colour, Vec3};

/// A rendered image, row-major from the top-left pixel
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<Colour>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Frame {
        Frame { width, height, pixels: vec![Vec3::zero(); width * height] }
    }

    pub fn from_rows(width: usize, height: usize, rows: Vec<Vec<Colour>>) -> Frame {
        let pixels: Vec<Colour> = rows.into_iter().flatten().collect();
        debug_assert_eq!(pixels.len(), width * height);
        Frame { width, height, pixels }
    }

    pub fn get(&self, x: usize, y: usize) -> Colour {
        self.pixels[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, colour: Colour) {
        self.pixels[y * self.width + x] = colour;
    }

    /// Packed 8-bit RGB, ready for an image encoder
    pub fn to_rgb8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|c| c.to_rgb8()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixels_are_row_major() {
        let mut frame = Frame::new(3, 2);
        frame.set(2, 1, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(frame.pixels[5], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(frame.get(2, 1), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(&frame.to_rgb8()[15..18], &[255, 0, 0]);
    }
}
