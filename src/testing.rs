//! Fixtures shared by unit tests: synthetic DICOM files and datasets.

use std::path::Path;

use dicom_core::{DataElement, PrimitiveValue, VR};
use dicom_dictionary_std::{tags, uids};
use dicom_object::{FileMetaTableBuilder, InMemDicomObject};
use ndarray::Array3;

use crate::domain::image::NormalizedImage;

const INSTANCE_UID: &str = "2.25.31415926535897932384";

/// Description of a single-frame 16-bit MONOCHROME2 CT image.
pub struct DicomFixture {
    pub rows:    u16,
    pub columns: u16,
    pub pixels:  Vec<u16>,
    pub window:  Option<(f64, f64)>,
}

impl DicomFixture {
    pub fn new(rows: u16, columns: u16, pixels: Vec<u16>) -> Self {
        assert_eq!(pixels.len(), rows as usize * columns as usize);
        Self { rows, columns, pixels, window: None }
    }

    pub fn with_window(mut self, center: f64, width: f64) -> Self {
        self.window = Some((center, width));
        self
    }
}

/// Row-major ramp 0, 1, 2, ... of `rows * columns` values.
pub fn ramp_pixels(rows: u16, columns: u16) -> Vec<u16> {
    (0..rows as u32 * columns as u32).map(|v| v as u16).collect()
}

pub fn write_dicom(path: &Path, fixture: &DicomFixture) {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(uids::CT_IMAGE_STORAGE)));
    obj.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(INSTANCE_UID)));
    obj.put(DataElement::new(tags::MODALITY, VR::CS, PrimitiveValue::from("CT")));
    obj.put(DataElement::new(tags::SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(1_u16)));
    obj.put(DataElement::new(tags::PHOTOMETRIC_INTERPRETATION, VR::CS, PrimitiveValue::from("MONOCHROME2")));
    obj.put(DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(fixture.rows)));
    obj.put(DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(fixture.columns)));
    obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(16_u16)));
    obj.put(DataElement::new(tags::BITS_STORED, VR::US, PrimitiveValue::from(16_u16)));
    obj.put(DataElement::new(tags::HIGH_BIT, VR::US, PrimitiveValue::from(15_u16)));
    obj.put(DataElement::new(tags::PIXEL_REPRESENTATION, VR::US, PrimitiveValue::from(0_u16)));

    if let Some((center, width)) = fixture.window {
        obj.put(DataElement::new(tags::WINDOW_CENTER, VR::DS, PrimitiveValue::from(center.to_string())));
        obj.put(DataElement::new(tags::WINDOW_WIDTH, VR::DS, PrimitiveValue::from(width.to_string())));
    }

    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        PrimitiveValue::U16(fixture.pixels.clone().into()),
    ));

    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
                .media_storage_sop_instance_uid(INSTANCE_UID),
        )
        .expect("valid file meta");
    file.write_to_file(path).expect("write test DICOM file");
}

/// `count` images with a smooth gradient plus a per-image offset,
/// so the autoencoder has some structure to learn.
pub fn gradient_images(count: usize, side: usize) -> Vec<NormalizedImage> {
    (0..count)
        .map(|i| {
            let pixels = Array3::from_shape_fn((side, side, 3), |(r, c, _)| {
                let v = (r + c + i) as f32 / (2 * side + count) as f32;
                v.clamp(0.0, 1.0)
            });
            NormalizedImage::new(format!("grad_{i:03}.dcm"), pixels)
        })
        .collect()
}
