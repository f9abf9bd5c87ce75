use super::frame::Frame;
use super::math::Colour;

/// Plain-text (P3) portable pixmap
pub struct PpmImage {
    width: usize,
    height: usize,
    body: String,
}

impl PpmImage {
    pub fn create(width: usize, height: usize) -> PpmImage {
        PpmImage { width, height, body: String::new() }
    }

    pub fn from_frame(frame: &Frame) -> PpmImage {
        let mut image = PpmImage::create(frame.width, frame.height);
        for row in frame.pixels.chunks(frame.width.max(1)) {
            for colour in row {
                image.append_pixel(colour);
            }
            image.body.push('\n');
        }
        image
    }

    pub fn append_pixel(&mut self, colour: &Colour) {
        let [r, g, b] = colour.to_rgb8();
        self.body.push_str(&format!("{:4} {:4} {:4}", r, g, b));
    }

    pub fn get_text(&self) -> String {
        let mut text = String::new();
        // COLS x ROWS; 255 is max colour
        text.push_str(&format!("P3\n{} {}\n255\n", self.width, self.height));
        text.push_str(&self.body);
        text
    }
}
