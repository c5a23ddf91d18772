use anyhow::{Context, Result};
use mt32drv_core::{player_timer, DriverConfig, Mt32Driver, SongPlayer};
use mt32drv_domain_song::import_song_path;
use mt32drv_infra_audio_cpal::CpalAudioOutputPort;
use mt32drv_infra_midi_midir::MidirMidiInputPort;
use mt32drv_infra_storage_fs::{FsFirmwareSource, FsStorage};
use mt32drv_infra_synth_simple::SimpleSynthFactory;
use mt32drv_ports::audio::AudioOutputPort;
use mt32drv_ports::midi::{InputEvent, MidiInputPort, MidiOutput};
use mt32drv_ports::storage::{SettingsDto, StoragePort};
use mt32drv_ports::types::DeviceId;
use parking_lot::Mutex;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

struct CliOptions {
    list: bool,
    rom_dir: Option<String>,
    play: Option<PathBuf>,
    looping: bool,
    midi_in: Option<String>,
    audio_out: Option<String>,
    gain: Option<u32>,
    threaded: bool,
    save: bool,
}

impl CliOptions {
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut options = CliOptions {
            list: false,
            rom_dir: None,
            play: None,
            looping: false,
            midi_in: None,
            audio_out: None,
            gain: None,
            threaded: false,
            save: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--list" | "-l" => options.list = true,
                "--loop" => options.looping = true,
                "--threaded" => options.threaded = true,
                "--save" => options.save = true,
                "--rom-dir" => options.rom_dir = Some(value(&args, &mut i)?),
                "--play" | "-p" => options.play = Some(PathBuf::from(value(&args, &mut i)?)),
                "--midi-in" => options.midi_in = Some(value(&args, &mut i)?),
                "--audio-out" => options.audio_out = Some(value(&args, &mut i)?),
                "--gain" => {
                    let raw = value(&args, &mut i)?;
                    let gain = raw
                        .parse()
                        .with_context(|| format!("--gain expects a percentage, got {}", raw))?;
                    options.gain = Some(gain);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                other if other.ends_with(".mid") || other.ends_with(".midi") => {
                    options.play = Some(PathBuf::from(other));
                }
                other => anyhow::bail!("unknown option: {} (see --help)", other),
            }
            i += 1;
        }

        Ok(options)
    }

    fn apply(&self, settings: &mut SettingsDto) {
        if let Some(dir) = &self.rom_dir {
            settings.extra_rom_path = Some(dir.clone());
        }
        if let Some(id) = &self.midi_in {
            settings.selected_midi_in = Some(DeviceId(id.clone()));
        }
        if let Some(id) = &self.audio_out {
            settings.selected_audio_out = Some(DeviceId(id.clone()));
        }
        if let Some(gain) = self.gain {
            settings.midi_gain = gain;
        }
        if self.threaded {
            settings.threaded_dispatch = true;
        }
    }
}

fn value(args: &[String], i: &mut usize) -> Result<String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .with_context(|| format!("{} requires an argument", flag))
}

fn print_help() {
    eprintln!("mt32drv - MT-32 / CM-32L synthesis driver");
    eprintln!();
    eprintln!("Usage: mt32drv [OPTIONS] [FILE.mid]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -l, --list           List audio outputs and MIDI inputs");
    eprintln!("      --rom-dir DIR    Search DIR for firmware before the working directory");
    eprintln!("  -p, --play FILE      Play a Standard MIDI File");
    eprintln!("      --loop           Restart the song when it ends");
    eprintln!("      --midi-in ID     Forward a MIDI input device to the synth");
    eprintln!("      --audio-out ID   Render to this output instead of the default");
    eprintln!("      --gain PERCENT   Output gain, 100 is unity");
    eprintln!("      --threaded       Queue messages and dispatch them from the audio thread");
    eprintln!("      --save           Store the effective settings");
    eprintln!("  -h, --help           Print this help message");
}

fn list_devices(audio: &dyn AudioOutputPort, midi: &dyn MidiInputPort) -> Result<()> {
    println!("Audio outputs:");
    for device in audio.list_outputs()? {
        println!(
            "  {}  ({} Hz, {} ch)",
            device.id, device.default_config.sample_rate_hz, device.default_config.channels
        );
    }
    println!("MIDI inputs:");
    for device in midi.list_inputs()? {
        println!("  {}", device.id);
    }
    Ok(())
}

fn wait_for_enter() {
    println!("Press Enter to stop.");
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

fn main() -> Result<()> {
    let cli = CliOptions::parse()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let storage = FsStorage::default();
    let mut settings = storage.load_settings().unwrap_or_else(|err| {
        tracing::warn!("settings unreadable, using defaults: {}", err);
        SettingsDto::default()
    });
    cli.apply(&mut settings);
    if cli.save {
        storage
            .save_settings(&settings)
            .context("failed to save settings")?;
    }

    let audio_port = CpalAudioOutputPort::new();
    let midi_port = MidirMidiInputPort::default();
    if cli.list {
        return list_devices(&audio_port, &midi_port);
    }

    let firmware = FsFirmwareSource::from_settings(&settings);
    let search_dirs = firmware.search_dirs().to_vec();
    let driver = Arc::new(Mt32Driver::new(
        DriverConfig::from_settings(&settings),
        Arc::new(firmware),
        Arc::new(SimpleSynthFactory::default()),
    ));

    if !driver.check_device() {
        anyhow::bail!("no MT-32 or CM-32L firmware found in {:?}", search_dirs);
    }
    driver.open().context("failed to open the MT-32 emulator")?;

    let audio_out = match &settings.selected_audio_out {
        Some(id) => id.clone(),
        None => audio_port.default_output()?,
    };
    let stream = audio_port
        .open_output(&audio_out, settings.audio_buffer_size_frames, driver.clone())
        .with_context(|| format!("failed to open audio output {}", audio_out))?;

    let input = match &settings.selected_midi_in {
        Some(id) => {
            let weak = Arc::downgrade(&driver);
            let forward = Arc::new(move |event: InputEvent| {
                if let Some(driver) = weak.upgrade() {
                    if let Err(err) = driver.send_message(&event.message) {
                        tracing::warn!("MIDI input dropped: {}", err);
                    }
                }
            });
            Some(
                midi_port
                    .open_input(id, forward)
                    .with_context(|| format!("failed to open MIDI input {}", id))?,
            )
        }
        None => None,
    };

    let player = match &cli.play {
        Some(path) => {
            let song = import_song_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!(
                "playing {} ({:.1}s)",
                path.display(),
                song.duration_micros() as f64 / 1_000_000.0
            );
            let player = Arc::new(Mutex::new(SongPlayer::new(song)));
            {
                let mut player = player.lock();
                player.set_looping(cli.looping);
                player.play();
            }
            driver.set_timer_callback(Some(player_timer(&driver, player.clone())));
            Some(player)
        }
        None => None,
    };

    match &player {
        Some(player) if !cli.looping => {
            while !player.lock().is_finished() {
                std::thread::sleep(Duration::from_millis(50));
            }
            // Let release tails ring out.
            std::thread::sleep(Duration::from_millis(500));
        }
        _ => wait_for_enter(),
    }

    driver.set_timer_callback(None);
    if let Some(player) = &player {
        if let Err(err) = player.lock().stop(&*driver) {
            tracing::warn!("failed to silence channels: {}", err);
        }
    }
    if let Some(input) = input {
        input.close();
    }
    stream.close();

    for report in driver.recent_reports() {
        tracing::debug!("device report: {:?}", report);
    }
    driver.close();
    Ok(())
}
