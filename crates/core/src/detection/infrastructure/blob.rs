use crate::shared::config::BlobSettings;
use crate::shared::frame::Frame;
use crate::shared::rect::PixelRect;

/// Crop `roi` out of a BGR frame, resize it to a square of
/// `settings.input_size`, and lay it out as a `[1, 3, S, S]` RGB tensor
/// with `(pixel - mean) * scale` applied per channel.
///
/// `roi` must lie inside the frame and be non-empty.
pub fn blob_from_region(frame: &Frame, roi: &PixelRect, settings: &BlobSettings) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let s = settings.input_size as usize;
    let roi_x = roi.x.max(0) as usize;
    let roi_y = roi.y.max(0) as usize;
    let roi_w = roi.width.max(1) as usize;
    let roi_h = roi.height.max(1) as usize;
    let max_x = frame.width() as usize - 1;
    let max_y = frame.height() as usize - 1;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (roi_y + ((y as f64 + 0.5) * roi_h as f64 / s as f64) as usize).min(max_y);
        for x in 0..s {
            let src_x =
                (roi_x + ((x as f64 + 0.5) * roi_w as f64 / s as f64) as usize).min(max_x);
            for c in 0..3 {
                // Output channel c is RGB; source is BGR.
                let px = src[[src_y, src_x, 2 - c]] as f32;
                tensor[[0, c, y, x]] = (px - settings.mean[c]) * settings.scale;
            }
        }
    }

    tensor
}

/// Whole frame as a blob.
pub fn blob_from_frame(frame: &Frame, settings: &BlobSettings) -> ndarray::Array4<f32> {
    blob_from_region(frame, &PixelRect::full_frame(frame.width(), frame.height()), settings)
}
