/*
 *  chart/text.rs
 *
 *  TxMon - keeps an eye on the exciter
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mono-font labels drawn straight onto a pixmap
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::{Rgb888, RgbColor},
    prelude::*,
    text::{Baseline, Text},
};
use tiny_skia::{Pixmap, PremultipliedColorU8};

/// Glyph advance of the label font.
pub const CHAR_WIDTH: u32 = 6;

/// Opaque pixel writes onto a borrowed pixmap.
pub struct PixmapCanvas<'a> {
    pixmap: &'a mut Pixmap,
}

impl<'a> PixmapCanvas<'a> {
    pub fn new(pixmap: &'a mut Pixmap) -> Self {
        PixmapCanvas { pixmap }
    }
}

impl OriginDimensions for PixmapCanvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.pixmap.width(), self.pixmap.height())
    }
}

impl DrawTarget for PixmapCanvas<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = self.pixmap.width() as i32;
        let height = self.pixmap.height() as i32;
        let data = self.pixmap.pixels_mut();
        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }
            if let Some(px) = PremultipliedColorU8::from_rgba(color.r(), color.g(), color.b(), 255) {
                data[(y * width + x) as usize] = px;
            }
        }
        Ok(())
    }
}

pub fn label_width(text: &str) -> u32 {
    text.chars().count() as u32 * CHAR_WIDTH
}

/// `y` is the vertical middle of the text.
pub fn draw_label(pixmap: &mut Pixmap, text: &str, x: i32, y: i32, color: Rgb888) {
    let style = MonoTextStyle::new(&FONT_6X10, color);
    let mut canvas = PixmapCanvas::new(pixmap);
    // Infallible target
    let _ = Text::with_baseline(text, Point::new(x, y), style, Baseline::Middle).draw(&mut canvas);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_width() {
        assert_eq!(label_width("12:00:00"), 48);
        assert_eq!(label_width(""), 0);
    }

    #[test]
    fn test_label_marks_pixels_and_clips() {
        let mut pixmap = Pixmap::new(40, 20).unwrap();
        draw_label(&mut pixmap, "Hi", 2, 10, Rgb888::WHITE);
        assert!(pixmap.pixels().iter().any(|p| p.red() == 255 && p.alpha() == 255));

        // partially off the right edge must not panic
        draw_label(&mut pixmap, "overflowing label", 30, 10, Rgb888::WHITE);
        draw_label(&mut pixmap, "negative", -10, -3, Rgb888::WHITE);
    }
}
