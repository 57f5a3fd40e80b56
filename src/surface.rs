// ============================================================================
// SURFACE — flat BGRA pixel buffer + banded mutable view
// ============================================================================

use image::RgbaImage;

use crate::color::ColorBgra;
use crate::rect::RectI;

/// An owned `width × height` grid of premultiplied BGRA pixels.
///
/// Row-major, stride equals width.  `clone()` is a deep copy; two surfaces
/// never share backing storage.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Surface {
    width: i32,
    height: i32,
    data: Vec<ColorBgra>,
}

impl Surface {
    /// Create a fully transparent surface.
    pub fn new(width: i32, height: i32) -> Self {
        assert!(width >= 0 && height >= 0, "negative surface dimensions");
        Self {
            width,
            height,
            data: vec![ColorBgra::TRANSPARENT; (width as usize) * (height as usize)],
        }
    }

    pub fn new_filled(width: i32, height: i32, color: ColorBgra) -> Self {
        let mut surface = Self::new(width, height);
        surface.data.fill(color);
        surface
    }

    /// Import a flat straight-alpha RGBA image, premultiplying on the way in.
    pub fn from_rgba_image(src: &RgbaImage) -> Self {
        let width = src.width() as i32;
        let height = src.height() as i32;
        let data = src
            .as_raw()
            .chunks_exact(4)
            .map(|px| ColorBgra::from_bgra(px[2], px[1], px[0], px[3]).to_premultiplied_alpha())
            .collect();
        Self { width, height, data }
    }

    /// Export to a flat straight-alpha RGBA image.
    pub fn to_rgba_image(&self) -> RgbaImage {
        let mut raw = Vec::with_capacity(self.data.len() * 4);
        for px in &self.data {
            let s = px.to_straight_alpha();
            raw.extend_from_slice(&[s.r, s.g, s.b, s.a]);
        }
        RgbaImage::from_raw(self.width as u32, self.height as u32, raw)
            .unwrap_or_else(|| RgbaImage::new(0, 0))
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn bounds(&self) -> RectI {
        RectI::new(0, 0, self.width, self.height)
    }

    pub fn pixels(&self) -> &[ColorBgra] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [ColorBgra] {
        &mut self.data
    }

    /// Raw little-endian BGRA bytes, e.g. for texture upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Import raw premultiplied BGRA bytes (`width * height * 4` long).
    pub fn from_raw_bgra(width: i32, height: i32, bytes: &[u8]) -> Self {
        assert_eq!(bytes.len(), (width as usize) * (height as usize) * 4);
        Self { width, height, data: bytemuck::cast_slice(bytes).to_vec() }
    }

    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<ColorBgra>()
    }

    #[inline]
    pub fn get(&self, x: i32, y: i32) -> ColorBgra {
        debug_assert!(self.bounds().contains(x, y));
        self.data[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn put(&mut self, x: i32, y: i32, color: ColorBgra) {
        debug_assert!(self.bounds().contains(x, y));
        self.data[(y * self.width + x) as usize] = color;
    }

    #[inline]
    pub fn row(&self, y: i32) -> &[ColorBgra] {
        let start = (y * self.width) as usize;
        &self.data[start..start + self.width as usize]
    }

    #[inline]
    pub fn row_span(&self, x: i32, y: i32, len: i32) -> &[ColorBgra] {
        let start = (y * self.width + x) as usize;
        &self.data[start..start + len as usize]
    }

    /// Mutable view spanning the whole surface.
    pub fn view_mut(&mut self) -> SurfaceMut<'_> {
        let width = self.width;
        let height = self.height;
        SurfaceMut { data: &mut self.data, width, y0: 0, height }
    }
}

/// A mutable view over a horizontal band of a [`Surface`].
///
/// Rows `y0 .. y0 + height` of the parent, addressed in parent coordinates.
/// The parallel render driver hands each worker thread its own band, so
/// writes stay within the band while the shared source surface is read
/// freely.
pub struct SurfaceMut<'a> {
    data: &'a mut [ColorBgra],
    width: i32,
    y0: i32,
    height: i32,
}

impl<'a> SurfaceMut<'a> {
    /// Wrap `data`, which holds `height` rows starting at parent row `y0`.
    pub fn from_rows(data: &'a mut [ColorBgra], width: i32, y0: i32, height: i32) -> Self {
        debug_assert_eq!(data.len(), (width as usize) * (height as usize));
        Self { data, width, y0, height }
    }

    /// The band's extent in parent coordinates.
    pub fn bounds(&self) -> RectI {
        RectI::new(0, self.y0, self.width, self.height)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn put(&mut self, x: i32, y: i32, color: ColorBgra) {
        debug_assert!(self.bounds().contains(x, y));
        self.data[((y - self.y0) * self.width + x) as usize] = color;
    }

    #[inline]
    pub fn row_mut(&mut self, y: i32) -> &mut [ColorBgra] {
        let start = ((y - self.y0) * self.width) as usize;
        &mut self.data[start..start + self.width as usize]
    }

    #[inline]
    pub fn row_span_mut(&mut self, x: i32, y: i32, len: i32) -> &mut [ColorBgra] {
        let start = ((y - self.y0) * self.width + x) as usize;
        &mut self.data[start..start + len as usize]
    }

    /// Copy `rect` from `src` verbatim (identity transform fast path).
    pub fn copy_rect_from(&mut self, src: &Surface, rect: RectI) {
        let rect = rect.intersect(src.bounds()).intersect(self.bounds());
        if rect.is_empty() {
            return;
        }
        for y in rect.top()..=rect.bottom() {
            self.row_span_mut(rect.left(), y, rect.width)
                .copy_from_slice(src.row_span(rect.left(), y, rect.width));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_deep() {
        let mut a = Surface::new_filled(4, 4, ColorBgra::WHITE);
        let b = a.clone();
        a.put(1, 1, ColorBgra::BLACK);
        assert_eq!(b.get(1, 1), ColorBgra::WHITE);
    }

    #[test]
    fn rgba_image_round_trip() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        img.put_pixel(2, 1, image::Rgba([0, 128, 0, 255]));

        let surface = Surface::from_rgba_image(&img);
        assert_eq!(surface.get(0, 0), ColorBgra::from_bgr(0, 0, 255));
        assert_eq!(surface.to_rgba_image(), img);
    }

    #[test]
    fn banded_view_addresses_parent_rows() {
        let mut surface = Surface::new(4, 4);
        let width = surface.width();
        let pixels = surface.pixels_mut();
        // Band covering rows 2..4.
        let band = &mut pixels[8..16];
        let mut view = SurfaceMut::from_rows(band, width, 2, 2);
        view.put(1, 3, ColorBgra::WHITE);
        assert_eq!(view.bounds(), RectI::new(0, 2, 4, 2));
        drop(view);
        assert_eq!(surface.get(1, 3), ColorBgra::WHITE);
        assert_eq!(surface.get(1, 1), ColorBgra::TRANSPARENT);
    }

    #[test]
    fn copy_rect_clips_to_bounds() {
        let src = Surface::new_filled(4, 4, ColorBgra::WHITE);
        let mut dst = Surface::new(4, 4);
        dst.view_mut().copy_rect_from(&src, RectI::new(2, 2, 100, 100));
        assert_eq!(dst.get(3, 3), ColorBgra::WHITE);
        assert_eq!(dst.get(1, 1), ColorBgra::TRANSPARENT);
    }
}
