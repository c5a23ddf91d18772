use mt32drv_ports::firmware::{
    FirmwareError, FirmwareImage, FirmwareSource, RomInfo, RomKind, RomModel,
};
use serde::{Deserialize, Serialize};

pub const MT32_CONTROL_ROM: &str = "MT32_CONTROL.ROM";
pub const CM32L_CONTROL_ROM: &str = "CM32L_CONTROL.ROM";
pub const MT32_PCM_ROM: &str = "MT32_PCM.ROM";
pub const CM32L_PCM_ROM: &str = "CM32L_PCM.ROM";

/// Primary file name, then the name of the other hardware variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RomNames {
    pub primary: String,
    pub fallback: String,
}

impl RomNames {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    pub fn control() -> Self {
        Self::new(MT32_CONTROL_ROM, CM32L_CONTROL_ROM)
    }

    pub fn pcm() -> Self {
        Self::new(MT32_PCM_ROM, CM32L_PCM_ROM)
    }
}

const KNOWN_LAYOUTS: [RomInfo; 5] = [
    RomInfo {
        kind: RomKind::Control,
        model: RomModel::Mt32,
        size: 64 * 1024,
    },
    RomInfo {
        kind: RomKind::Control,
        model: RomModel::Mt32New,
        size: 128 * 1024,
    },
    RomInfo {
        kind: RomKind::Pcm,
        model: RomModel::Mt32,
        size: 512 * 1024,
    },
    RomInfo {
        kind: RomKind::Pcm,
        model: RomModel::Cm32l,
        size: 1024 * 1024,
    },
    // CM-32L control ROMs share the 64 KiB layout; the file name tells them apart.
    RomInfo {
        kind: RomKind::Control,
        model: RomModel::Cm32l,
        size: 64 * 1024,
    },
];

/// Both validated images, owned as one unit and released together.
#[derive(Debug)]
pub struct FirmwareSet {
    pub control: FirmwareImage,
    pub pcm: FirmwareImage,
}

pub struct FirmwareLoader<'a> {
    source: &'a dyn FirmwareSource,
}

impl<'a> FirmwareLoader<'a> {
    pub fn new(source: &'a dyn FirmwareSource) -> Self {
        Self { source }
    }

    /// Reads `names.primary`, falling back to `names.fallback`.
    pub fn load(&self, kind: RomKind, names: &RomNames) -> Result<FirmwareImage, FirmwareError> {
        for name in [&names.primary, &names.fallback] {
            match self.source.read(name) {
                Ok(data) => {
                    tracing::debug!("opened {:?} firmware {} ({} bytes)", kind, name, data.len());
                    return Ok(FirmwareImage::new(kind, name.as_str(), data));
                }
                Err(FirmwareError::NotFound(_)) => continue,
                Err(err) => {
                    tracing::warn!("failed to read {}: {}", name, err);
                    continue;
                }
            }
        }

        Err(FirmwareError::MissingResource {
            primary: names.primary.clone(),
            fallback: names.fallback.clone(),
        })
    }

    /// Loads and validates both images. Nothing is returned unless both pass.
    pub fn load_set(
        &self,
        control: &RomNames,
        pcm: &RomNames,
    ) -> Result<FirmwareSet, FirmwareError> {
        let mut control = self.load(RomKind::Control, control)?;
        validate(&mut control)?;
        let mut pcm = self.load(RomKind::Pcm, pcm)?;
        validate(&mut pcm)?;
        Ok(FirmwareSet { control, pcm })
    }

    /// True when a complete MT-32 or CM-32L file pair is available.
    pub fn check_device(&self) -> bool {
        let mt32 = self.source.exists(MT32_CONTROL_ROM) && self.source.exists(MT32_PCM_ROM);
        let cm32l = self.source.exists(CM32L_CONTROL_ROM) && self.source.exists(CM32L_PCM_ROM);
        if !(mt32 || cm32l) {
            tracing::warn!(
                "the MT-32 emulator requires one of two file sets: either '{}' and '{}' or '{}' and '{}'",
                MT32_CONTROL_ROM,
                MT32_PCM_ROM,
                CM32L_CONTROL_ROM,
                CM32L_PCM_ROM
            );
            return false;
        }
        true
    }
}

/// Matches the image against the known ROM layouts for its kind and marks it valid.
pub fn validate(image: &mut FirmwareImage) -> Result<RomInfo, FirmwareError> {
    let info = identify(image)?;
    image.mark_valid(info);
    Ok(info)
}

fn identify(image: &FirmwareImage) -> Result<RomInfo, FirmwareError> {
    let corrupt = |reason: String| FirmwareError::CorruptResource {
        name: image.name().to_string(),
        reason,
    };

    let data = image.data();
    if data.is_empty() {
        return Err(corrupt("empty image".to_string()));
    }

    let cm32l = image.name().to_ascii_uppercase().starts_with("CM32L");
    let candidates: Vec<RomInfo> = KNOWN_LAYOUTS
        .iter()
        .copied()
        .filter(|layout| layout.kind == image.kind() && layout.size == data.len())
        .collect();
    let info = candidates
        .iter()
        .find(|layout| (layout.model == RomModel::Cm32l) == cm32l)
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| {
            corrupt(format!(
                "{} bytes does not match any {:?} ROM layout",
                data.len(),
                image.kind()
            ))
        })?;

    if data.iter().all(|byte| *byte == data[0]) {
        return Err(corrupt(format!("blank dump (all bytes 0x{:02X})", data[0])));
    }

    Ok(info)
}
