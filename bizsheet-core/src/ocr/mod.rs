//! Region recognition: cropping a rendered page into regions of interest and
//! running a recognizer over them on a background thread
//!
//! ```text
//! [caller] --regions--> [recognition thread] --OcrEvent::Field...--> [caller]
//!                                            --OcrEvent::Finished--> [caller]
//! ```
//!
//! The recognizer is a long-lived capability passed in by the caller. The
//! first failing region aborts the batch.

pub mod capture;
pub mod cleanup;

use crossbeam_channel::{Receiver, unbounded};
use image::{GrayImage, Luma, imageops};
use imageproc::filter::gaussian_blur_f32;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub use capture::{CaptureState, FieldCapture};

/// Text reported for a field without a region
pub const NOT_SET: &str = "[지정 안됨]";

/// Rectangle on the page, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanned by two corners in any order
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Self {
        let (x0, x1) = (a.0.min(b.0), a.0.max(b.0));
        let (y0, y1) = (a.1.min(b.1), a.1.max(b.1));
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// A rendered page, 8-bit grayscale
pub type PageImage = GrayImage;

/// Cropped region handed to the recognizer
pub type RegionImage = GrayImage;

/// Smoothing applied before thresholding; a 3×3 Gaussian kernel
const BLUR_SIGMA: f32 = 0.8;
/// Gaussian weighting of the 11×11 neighbourhood used as local threshold
const THRESHOLD_SIGMA: f32 = 2.0;
/// Offset subtracted from the local threshold
const THRESHOLD_OFFSET: i16 = 2;

/// Crop `page` to `roi`, clamped to the page; `None` if nothing is left
pub fn crop(page: &PageImage, roi: &Roi) -> Option<RegionImage> {
    let region = imageops::crop_imm(page, roi.x, roi.y, roi.width, roi.height).to_image();
    (region.width() > 0 && region.height() > 0).then_some(region)
}

/// Blur, then binarize against the Gaussian-weighted local mean: a pixel
/// turns white when it is brighter than its neighbourhood minus the offset
pub fn binarize(region: &RegionImage) -> RegionImage {
    let smoothed = gaussian_blur_f32(region, BLUR_SIGMA);
    let local = gaussian_blur_f32(&smoothed, THRESHOLD_SIGMA);
    GrayImage::from_fn(region.width(), region.height(), |x, y| {
        let value = i16::from(smoothed.get_pixel(x, y)[0]);
        let threshold = i16::from(local.get_pixel(x, y)[0]) - THRESHOLD_OFFSET;
        Luma([if value > threshold { 255 } else { 0 }])
    })
}

/// A text recognizer for one region
pub trait Recognizer: Send + Sync {
    fn recognize(&self, image: &RegionImage) -> anyhow::Result<String>;
}

/// Progress of a recognition batch
#[derive(Debug, Clone, PartialEq)]
pub enum OcrEvent {
    /// Text recognized for one field
    Field { key: String, text: String },
    /// The batch ended; `Ok` carries the number of recognized regions
    Finished(Result<usize, String>),
}

/// A field to recognize and its region, if one was drawn
#[derive(Debug, Clone, PartialEq)]
pub struct RegionRequest {
    pub key: String,
    pub roi: Option<Roi>,
}

fn recognize_all(
    recognizer: &dyn Recognizer,
    page: &PageImage,
    regions: &[RegionRequest],
    mut emit: impl FnMut(OcrEvent),
) -> Result<usize, String> {
    let mut recognized = 0;
    for request in regions {
        let Some(roi) = request.roi else {
            emit(OcrEvent::Field {
                key: request.key.clone(),
                text: NOT_SET.to_string(),
            });
            continue;
        };
        let text = match crop(page, &roi) {
            Some(region) => recognizer
                .recognize(&binarize(&region))
                .map_err(|e| format!("{}: {:#}", request.key, e))?,
            None => String::new(),
        };
        emit(OcrEvent::Field {
            key: request.key.clone(),
            text: text.trim().to_string(),
        });
        recognized += 1;
    }
    Ok(recognized)
}

/// Recognize every region on a background thread.
///
/// Field events arrive in request order, followed by exactly one `Finished`.
pub fn spawn_recognition(
    recognizer: Arc<dyn Recognizer>,
    page: Arc<PageImage>,
    regions: Vec<RegionRequest>,
) -> (JoinHandle<()>, Receiver<OcrEvent>) {
    let (tx, rx) = unbounded();
    let handle = thread::spawn(move || {
        let outcome = recognize_all(recognizer.as_ref(), &page, &regions, |event| {
            // a dropped receiver only means nobody is listening any more
            let _ = tx.send(event);
        });
        match &outcome {
            Ok(count) => tracing::info!(regions = count, "recognition finished"),
            Err(message) => tracing::warn!(%message, "recognition aborted"),
        }
        let _ = tx.send(OcrEvent::Finished(outcome));
    });
    (handle, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports the region size, fails on regions wider than 8 pixels
    struct SizeRecognizer;

    impl Recognizer for SizeRecognizer {
        fn recognize(&self, image: &RegionImage) -> anyhow::Result<String> {
            if image.width() > 8 {
                anyhow::bail!("region too wide");
            }
            Ok(format!(" {}x{} ", image.width(), image.height()))
        }
    }

    fn page() -> Arc<PageImage> {
        Arc::new(GrayImage::from_fn(10, 6, |x, y| Luma([((y * 10 + x) * 4) as u8])))
    }

    fn request(key: &str, roi: Option<Roi>) -> RegionRequest {
        RegionRequest {
            key: key.to_string(),
            roi,
        }
    }

    #[test]
    fn test_crop_clamps_to_page() {
        let page = page();
        let region = crop(&page, &Roi::new(8, 4, 5, 5)).unwrap();
        assert_eq!(region.dimensions(), (2, 2));
        assert_eq!(region.get_pixel(0, 0), page.get_pixel(8, 4));
        assert_eq!(region.get_pixel(1, 1), page.get_pixel(9, 5));
        assert!(region.get_pixel_checked(2, 0).is_none());
        assert!(crop(&page, &Roi::new(10, 0, 3, 3)).is_none());
        assert_eq!(Roi::from_corners((5, 1), (2, 4)), Roi::new(2, 1, 3, 3));
    }

    #[test]
    fn test_binarize_separates_ink_from_paper() {
        let mut image = GrayImage::from_pixel(15, 15, Luma([250]));
        for x in 6..9 {
            for y in 6..9 {
                image.put_pixel(x, y, Luma([10]));
            }
        }
        let binary = binarize(&image);
        assert_eq!(binary.dimensions(), (15, 15));
        assert_eq!(binary.get_pixel(7, 7)[0], 0);
        assert_eq!(binary.get_pixel(0, 0)[0], 255);
        assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
    }

    #[test]
    fn test_events_in_order_then_finished() {
        let (handle, rx) = spawn_recognition(
            Arc::new(SizeRecognizer),
            page(),
            vec![
                request("business_no", Some(Roi::new(0, 0, 4, 2))),
                request("region", None),
            ],
        );
        handle.join().unwrap();
        let events: Vec<OcrEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                OcrEvent::Field {
                    key: "business_no".into(),
                    text: "4x2".into()
                },
                OcrEvent::Field {
                    key: "region".into(),
                    text: NOT_SET.into()
                },
                OcrEvent::Finished(Ok(1)),
            ]
        );
    }

    #[test]
    fn test_first_failure_aborts() {
        let (handle, rx) = spawn_recognition(
            Arc::new(SizeRecognizer),
            page(),
            vec![
                request("wide", Some(Roi::new(0, 0, 10, 2))),
                request("never", Some(Roi::new(0, 0, 2, 2))),
            ],
        );
        handle.join().unwrap();
        let events: Vec<OcrEvent> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0],
            OcrEvent::Finished(Err("wide: region too wide".into()))
        );
    }

    #[test]
    fn test_failure_mid_batch_stops_field_events() {
        let (handle, rx) = spawn_recognition(
            Arc::new(SizeRecognizer),
            page(),
            vec![
                request("business_no", Some(Roi::new(0, 0, 3, 3))),
                request("debt_ratio", Some(Roi::new(0, 0, 10, 3))),
                request("current_ratio", Some(Roi::new(0, 0, 2, 2))),
                request("region", None),
            ],
        );
        handle.join().unwrap();
        let events: Vec<OcrEvent> = rx.iter().collect();
        assert_eq!(
            events,
            vec![
                OcrEvent::Field {
                    key: "business_no".into(),
                    text: "3x3".into()
                },
                OcrEvent::Finished(Err("debt_ratio: region too wide".into())),
            ]
        );
    }
}
