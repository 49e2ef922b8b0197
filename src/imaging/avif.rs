//! AVIF input support.
//!
//! The `image` crate's `"avif"` feature only enables the **encoder** (rav1e).
//! Decoding would need `"avif-native"`, which links the C library dav1d. Instead
//! the container is parsed with `avif-parse` and the AV1 payload is decoded by
//! `rav1d`, the pure Rust port of dav1d.
//!
//! - [`identify_avif`] reads dimensions from container metadata (fast path).
//! - [`decode_avif`] decodes the primary item to RGB (slow path).
//!
//! The alpha auxiliary item is not decoded; AVIF sources are treated as opaque.

use image::DynamicImage;
use std::io::Cursor;

use super::backend::{BackendError, Dimensions};

fn parse_container(bytes: &[u8]) -> Result<avif_parse::AvifData, BackendError> {
    avif_parse::read_avif(&mut Cursor::new(bytes))
        .map_err(|e| BackendError::Decode(format!("Failed to parse AVIF container: {e:?}")))
}

/// Dimensions from the AVIF container, without touching the AV1 payload.
pub fn identify_avif(bytes: &[u8]) -> Result<Dimensions, BackendError> {
    let avif = parse_container(bytes)?;
    let meta = avif
        .primary_item_metadata()
        .map_err(|e| BackendError::Decode(format!("Failed to read AVIF metadata: {e:?}")))?;
    Ok(Dimensions {
        width: meta.max_frame_width.get(),
        height: meta.max_frame_height.get(),
    })
}

/// Map a rav1d status code to a decode error.
fn rav1d_check(stage: &str, code: i32) -> Result<(), BackendError> {
    if code == 0 {
        Ok(())
    } else {
        Err(BackendError::Decode(format!("rav1d {stage} failed ({code})")))
    }
}

/// Runs a cleanup call when dropped, so every early return closes the decoder.
struct OnDrop<F: FnMut()>(F);

impl<F: FnMut()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        (self.0)()
    }
}

/// Decode the primary image of an AVIF file to RGB8.
pub fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    let avif = parse_container(bytes)?;
    let av1: &[u8] = &avif.primary_item;
    if av1.is_empty() {
        return Err(BackendError::Decode("AVIF primary item is empty".into()));
    }

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let settings_ptr = NonNull::new(settings.as_mut_ptr())
        .ok_or_else(|| BackendError::Decode("rav1d settings allocation failed".into()))?;
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    // One frame, one thread: the pipeline already runs jobs off the event loop.
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    rav1d_check("open", rc.0)?;
    let _close = OnDrop(move || {
        let mut ctx = ctx;
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
    });

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), av1.len()) };
    if buf.is_null() {
        return Err(BackendError::Decode("rav1d data_create failed".into()));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1.as_ptr(), buf, av1.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_data_unref(NonNull::new(&mut data)) };
    }
    rav1d_check("send_data", rc.0)?;

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    rav1d_check("get_picture", rc.0)?;

    let layout = pic.p.layout;
    let chroma = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some(Chroma::Monochrome),
        DAV1D_PIXEL_LAYOUT_I420 => Some(Chroma::Subsampled { x: true, y: true }),
        DAV1D_PIXEL_LAYOUT_I422 => Some(Chroma::Subsampled { x: true, y: false }),
        DAV1D_PIXEL_LAYOUT_I444 => Some(Chroma::Subsampled { x: false, y: false }),
        _ => None,
    };

    // Plane pointers die with the picture: convert before unref.
    let decoded = chroma.zip(pic.data[0]).map(|(chroma, y)| {
        let y_ptr = y.as_ptr() as *const u8;
        let plane = |i: usize| pic.data[i].map_or(y_ptr, |p| p.as_ptr() as *const u8);
        let planes = YuvPlanes {
            y_ptr,
            u_ptr: plane(1),
            v_ptr: plane(2),
            y_stride: pic.stride[0],
            uv_stride: pic.stride[1],
            width: pic.p.w as u32,
            height: pic.p.h as u32,
            bpc: pic.p.bpc as u32,
            chroma,
        };
        (planes.width, planes.height, planes.to_rgb())
    });
    unsafe { dav1d::dav1d_picture_unref(NonNull::new(&mut pic)) };

    let (width, height, rgb) = decoded.ok_or_else(|| {
        BackendError::Decode(format!("Unsupported AVIF pixel layout: {layout}"))
    })?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("Decoded AVIF buffer has the wrong length".into()))
}

/// BT.601 full-range conversion. `cb` and `cr` are already centered on zero.
fn ycbcr_to_rgb(y: f32, cb: f32, cr: f32) -> [f32; 3] {
    [
        y + 1.402 * cr,
        y - 0.344136 * cb - 0.714136 * cr,
        y + 1.772 * cb,
    ]
}

#[derive(Debug, Clone, Copy)]
enum Chroma {
    Monochrome,
    /// Horizontal / vertical subsampling (I420 = both).
    Subsampled { x: bool, y: bool },
}

/// Borrowed YUV planes from a rav1d picture.
///
/// The pointers are only valid until the picture is unreferenced, so the
/// conversion must finish before that.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    chroma: Chroma,
}

impl YuvPlanes {
    /// Convert to interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let y = self.sample(self.y_ptr, self.y_stride, col, row);
                let rgb_px = match self.chroma {
                    Chroma::Monochrome => [y, y, y],
                    Chroma::Subsampled { x: ss_x, y: ss_y } => {
                        let cx = if ss_x { col / 2 } else { col };
                        let cy = if ss_y { row / 2 } else { row };
                        let cb = self.sample(self.u_ptr, self.uv_stride, cx, cy) - center;
                        let cr = self.sample(self.v_ptr, self.uv_stride, cx, cy) - center;
                        ycbcr_to_rgb(y, cb, cr)
                    }
                };
                for channel in rgb_px {
                    rgb.push((channel * scale).clamp(0.0, 255.0) as u8);
                }
            }
        }
        rgb
    }

    /// One sample; 10- and 12-bit planes are stored as u16.
    #[inline]
    fn sample(&self, ptr: *const u8, stride: isize, x: u32, y: u32) -> f32 {
        if self.bpc <= 8 {
            (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
        } else {
            let offset = y as isize * stride + x as isize * 2;
            (unsafe { *(ptr.offset(offset) as *const u16) }) as f32
        }
    }
}
