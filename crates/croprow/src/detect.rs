use crate::{core, detector};
use ::image::imageops::{self, FilterType};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid RGB image buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbBuffer { expected: usize, got: usize },

    #[error("invalid RGB image dimensions (width={width}, height={height})")]
    InvalidRgbDimensions { width: u32, height: u32 },

    #[error(transparent)]
    CropRow(#[from] detector::CropRowError),
}

/// Borrow an `image::RgbImage` as a `croprow-core` view.
pub fn rgb_view(img: &::image::RgbImage) -> core::RgbImageView<'_> {
    core::RgbImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Build an `image::RgbImage` from an interleaved RGB buffer.
pub fn rgb_image_from_slice(
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<::image::RgbImage, DetectError> {
    let w = usize::try_from(width).ok();
    let h = usize::try_from(height).ok();
    let Some((w, h)) = w.zip(h) else {
        return Err(DetectError::InvalidRgbDimensions { width, height });
    };
    let Some(expected) = w.checked_mul(h).and_then(|n| n.checked_mul(3)) else {
        return Err(DetectError::InvalidRgbDimensions { width, height });
    };
    if pixels.len() != expected {
        return Err(DetectError::InvalidRgbBuffer {
            expected,
            got: pixels.len(),
        });
    }
    ::image::RgbImage::from_raw(width, height, pixels.to_vec())
        .ok_or(DetectError::InvalidRgbDimensions { width, height })
}

/// Convert a `croprow-core` image (e.g. an overlay) into an `image::RgbImage`.
pub fn to_image_rgb(img: &core::RgbImage) -> Result<::image::RgbImage, DetectError> {
    let width = u32::try_from(img.width).unwrap_or(u32::MAX);
    let height = u32::try_from(img.height).unwrap_or(u32::MAX);
    rgb_image_from_slice(width, height, &img.data)
}

/// Resize to the detector's frame size; frames already that size are copied.
pub fn resize_to_frame(img: &::image::RgbImage, frame: core::FrameSize) -> ::image::RgbImage {
    let (w, h) = (frame.width as u32, frame.height as u32);
    if img.dimensions() == (w, h) {
        return img.clone();
    }
    imageops::resize(img, w, h, FilterType::Triangle)
}

/// Run the crop row detector on an `image::RgbImage` of the configured frame size.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, params), fields(width = img.width(), height = img.height()))
)]
pub fn detect_crop_rows(
    img: &::image::RgbImage,
    params: &detector::CropRowParams,
) -> Result<detector::CropRowDetectionResult, DetectError> {
    Ok(detector::crop_row_detect(&rgb_view(img), params)?)
}

/// Run a prebuilt detector on an `image::RgbImage`.
pub fn detect_crop_rows_with(
    detector: &detector::CropRowDetector,
    img: &::image::RgbImage,
) -> Result<detector::CropRowDetectionResult, DetectError> {
    Ok(detector.detect(&rgb_view(img))?)
}

pub fn detect_crop_rows_from_rgb_u8(
    width: u32,
    height: u32,
    pixels: &[u8],
    params: &detector::CropRowParams,
) -> Result<detector::CropRowDetectionResult, DetectError> {
    let img = rgb_image_from_slice(width, height, pixels)?;
    detect_crop_rows(&img, params)
}

/// Draw the camera-space ROI trapezoid outline.
pub fn draw_roi_outline(
    img: &mut core::RgbImage,
    rectifier: &core::BirdsEyeRectifier,
    color: [u8; 3],
) {
    let [tl, tr, bl, br] =
        core::camera_roi_corners(rectifier.frame(), rectifier.roi(), rectifier.offset());
    for (a, b) in [(tl, tr), (tr, br), (br, bl), (bl, tl)] {
        core::draw_segment_rgb(img, a, b, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_length_is_checked() {
        let err = rgb_image_from_slice(4, 2, &[0; 10]).unwrap_err();
        assert!(matches!(
            err,
            DetectError::InvalidRgbBuffer {
                expected: 24,
                got: 10
            }
        ));
    }

    #[test]
    fn resize_hits_frame_size() {
        let img = ::image::RgbImage::from_pixel(640, 480, ::image::Rgb([10, 200, 10]));
        let out = resize_to_frame(&img, core::FrameSize::default());
        assert_eq!(out.dimensions(), (320, 240));
        let px = out.get_pixel(100, 100).0;
        for (got, want) in px.iter().zip([10u8, 200, 10]) {
            assert!(got.abs_diff(want) <= 1, "{px:?}");
        }
    }

    #[test]
    fn roi_outline_touches_top_corners() {
        let params = detector::CropRowParams::default();
        let det = detector::CropRowDetector::new(params).expect("default geometry");
        let mut img = core::RgbImage::new(320, 240);
        draw_roi_outline(&mut img, det.rectifier(), [255, 255, 0]);
        assert_eq!(img.pixel(68, 85), [255, 255, 0]);
        assert_eq!(img.pixel(208, 85), [255, 255, 0]);
        assert_eq!(img.pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn prebuilt_detector_matches_one_shot_detection() {
        let params = detector::CropRowParams::default();
        let det = detector::CropRowDetector::new(params.clone()).expect("default geometry");
        let mut img = ::image::RgbImage::from_pixel(320, 240, ::image::Rgb([139, 90, 43]));
        for y in 85..240 {
            for x in 150..156 {
                img.put_pixel(x, y, ::image::Rgb([40, 180, 40]));
            }
        }
        let reused = detect_crop_rows_with(&det, &img).expect("valid frame");
        let one_shot = detect_crop_rows(&img, &params).expect("valid frame");
        assert_eq!(reused.lines, one_shot.lines);
        assert_eq!(reused.overlay, one_shot.overlay);
    }

    #[test]
    fn prebuilt_detector_rejects_wrong_frame_size() {
        let det = detector::CropRowDetector::new(detector::CropRowParams::default())
            .expect("default geometry");
        let img = ::image::RgbImage::new(64, 48);
        let err = detect_crop_rows_with(&det, &img).unwrap_err();
        assert!(matches!(
            err,
            DetectError::CropRow(detector::CropRowError::FrameSize { .. })
        ));
    }
}
