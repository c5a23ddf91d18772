use mt32drv_core::{
    validate, FirmwareLoader, RomNames, CM32L_CONTROL_ROM, CM32L_PCM_ROM, MT32_CONTROL_ROM,
    MT32_PCM_ROM,
};
use mt32drv_ports::firmware::{FirmwareError, FirmwareImage, FirmwareSource, RomKind, RomModel};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

#[derive(Default)]
struct MemoryFirmware {
    files: HashMap<String, Vec<u8>>,
    unreadable: Vec<String>,
}

impl MemoryFirmware {
    fn with(mut self, name: &str, data: Vec<u8>) -> Self {
        self.files.insert(name.to_string(), data);
        self
    }

    fn unreadable(mut self, name: &str) -> Self {
        self.unreadable.push(name.to_string());
        self
    }
}

impl FirmwareSource for MemoryFirmware {
    fn read(&self, name: &str) -> Result<Vec<u8>, FirmwareError> {
        if self.unreadable.iter().any(|n| n == name) {
            return Err(FirmwareError::Io {
                name: name.to_string(),
                message: "permission denied".to_string(),
            });
        }
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| FirmwareError::NotFound(name.to_string()))
    }
}

fn rom(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

#[test]
fn primary_name_wins_over_fallback() {
    let source = MemoryFirmware::default()
        .with(MT32_CONTROL_ROM, rom(64 * 1024))
        .with(CM32L_CONTROL_ROM, rom(64 * 1024));
    let image = FirmwareLoader::new(&source)
        .load(RomKind::Control, &RomNames::control())
        .expect("control rom");
    assert_eq!(image.name(), MT32_CONTROL_ROM);
    assert_eq!(image.kind(), RomKind::Control);
}

#[test]
fn falls_back_when_primary_is_missing_or_unreadable() {
    let source = MemoryFirmware::default()
        .unreadable(MT32_PCM_ROM)
        .with(CM32L_PCM_ROM, rom(1024 * 1024));
    let image = FirmwareLoader::new(&source)
        .load(RomKind::Pcm, &RomNames::pcm())
        .expect("pcm rom");
    assert_eq!(image.name(), CM32L_PCM_ROM);
}

#[test]
fn missing_both_names_is_missing_resource() {
    let source = MemoryFirmware::default();
    let err = FirmwareLoader::new(&source)
        .load(RomKind::Control, &RomNames::control())
        .expect_err("no control rom");
    assert_eq!(
        err,
        FirmwareError::MissingResource {
            primary: MT32_CONTROL_ROM.to_string(),
            fallback: CM32L_CONTROL_ROM.to_string(),
        }
    );
}

#[test]
fn load_set_validates_both_images() {
    let source = MemoryFirmware::default()
        .with(MT32_CONTROL_ROM, rom(64 * 1024))
        .with(MT32_PCM_ROM, rom(512 * 1024));
    let set = FirmwareLoader::new(&source)
        .load_set(&RomNames::control(), &RomNames::pcm())
        .expect("firmware set");

    assert!(set.control.is_valid());
    assert!(set.pcm.is_valid());
    assert_eq!(set.control.info().map(|i| i.model), Some(RomModel::Mt32));
}

#[test]
fn load_set_rejects_a_corrupt_pcm_image() {
    let source = MemoryFirmware::default()
        .with(MT32_CONTROL_ROM, rom(64 * 1024))
        .with(MT32_PCM_ROM, rom(1000));
    let err = FirmwareLoader::new(&source)
        .load_set(&RomNames::control(), &RomNames::pcm())
        .expect_err("corrupt pcm");
    assert!(matches!(
        err,
        FirmwareError::CorruptResource { ref name, .. } if name == MT32_PCM_ROM
    ));
}

#[test]
fn validate_identifies_models_by_size_and_name() {
    let mut newer = FirmwareImage::new(RomKind::Control, MT32_CONTROL_ROM, rom(128 * 1024));
    assert_eq!(validate(&mut newer).map(|i| i.model), Ok(RomModel::Mt32New));

    let mut cm32l = FirmwareImage::new(RomKind::Control, CM32L_CONTROL_ROM, rom(64 * 1024));
    assert_eq!(validate(&mut cm32l).map(|i| i.model), Ok(RomModel::Cm32l));
    assert!(cm32l.is_valid());
}

#[test]
fn validate_rejects_empty_and_blank_images() {
    let mut empty = FirmwareImage::new(RomKind::Control, MT32_CONTROL_ROM, Vec::new());
    assert!(validate(&mut empty).is_err());
    assert!(!empty.is_valid());

    let mut blank = FirmwareImage::new(RomKind::Pcm, MT32_PCM_ROM, vec![0xFF; 512 * 1024]);
    assert!(validate(&mut blank).is_err());
}

#[test]
fn validate_rejects_kind_mismatch() {
    let mut swapped = FirmwareImage::new(RomKind::Control, MT32_PCM_ROM, rom(512 * 1024));
    assert!(validate(&mut swapped).is_err());
}

#[test]
fn check_device_needs_a_matching_pair() {
    let mixed = MemoryFirmware::default()
        .with(MT32_CONTROL_ROM, rom(64 * 1024))
        .with(CM32L_PCM_ROM, rom(1024 * 1024));
    assert!(!FirmwareLoader::new(&mixed).check_device());

    let cm32l = MemoryFirmware::default()
        .with(CM32L_CONTROL_ROM, rom(64 * 1024))
        .with(CM32L_PCM_ROM, rom(1024 * 1024));
    assert!(FirmwareLoader::new(&cm32l).check_device());
}
