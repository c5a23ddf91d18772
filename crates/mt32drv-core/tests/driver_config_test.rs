use mt32drv_core::{DispatchMode, DriverConfig, RomNames, REVERB_GAIN_RATIO};
use mt32drv_ports::storage::SettingsDto;
use mt32drv_ports::types::ChannelMask;
use pretty_assertions::assert_eq;

#[test]
fn defaults_match_unity_gain_and_direct_dispatch() {
    let config = DriverConfig::default();
    assert_eq!(config.output_gain, 1.0);
    assert_eq!(config.reverb_output_gain, REVERB_GAIN_RATIO);
    assert_eq!(config.dispatch, DispatchMode::Direct);
    assert_eq!(config.base_freq_hz, 10_000);
    assert_eq!(config.control_rom, RomNames::control());
    assert_eq!(config.pcm_rom, RomNames::pcm());
}

#[test]
fn settings_scale_both_gains() {
    let settings = SettingsDto {
        midi_gain: 50,
        channel_mask: ChannelMask(0x00FF),
        threaded_dispatch: true,
        base_freq_hz: 250,
        ..SettingsDto::default()
    };
    let config = DriverConfig::from_settings(&settings);

    assert_eq!(config.output_gain, 0.5);
    assert!((config.reverb_output_gain - 0.34).abs() < 1e-6);
    assert_eq!(config.channel_mask, ChannelMask(0x00FF));
    assert_eq!(config.dispatch, DispatchMode::Queued);
    assert_eq!(config.base_freq_hz, 250);
}
