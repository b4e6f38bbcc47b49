use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use percept_hw::camera::{self, CameraFacing};
use percept_hw::session::CaptureSession;
use percept_lang::{Tag, TagOptions, TagScheme, Tagger};
use percept_vision::classifier::ImageClassifier;
use percept_vision::detector::FaceDetector;
use percept_vision::geometry::{mirror_horizontal, to_screen_rect, Viewport};
use percept_vision::orientation::{exif_orientation, DeviceOrientation};
use percept_vision::request::{VisionHandler, VisionRequest};
use percept_vision::saliency::SaliencyModel;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

mod config;
mod pipeline;

use config::Config;
use pipeline::{ModelPipeline, Router, RouterEvent};

#[derive(Parser)]
#[command(name = "percept", about = "Live camera inference and text tagging")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream camera frames through the inference pipeline
    Live {
        /// Start on the vision-request path instead of classification
        #[arg(long)]
        vision: bool,
        /// Camera to use (overrides PERCEPT_CAMERA_FACING)
        #[arg(long, value_enum)]
        facing: Option<FacingArg>,
        /// Capture frame rate (overrides PERCEPT_CAPTURE_FPS)
        #[arg(long)]
        fps: Option<u32>,
        /// Capture size as WIDTHxHEIGHT (overrides PERCEPT_CAPTURE_WIDTH/HEIGHT)
        #[arg(long, value_parser = parse_size)]
        size: Option<(u32, u32)>,
        /// Model directory (overrides PERCEPT_MODEL_DIR)
        #[arg(long)]
        model_dir: Option<std::path::PathBuf>,
        /// Flip between the two paths every N seconds
        #[arg(long)]
        toggle_secs: Option<u64>,
        /// Emit results as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// List available camera devices
    Devices,
    /// Tag a piece of text
    Tag {
        text: String,
        /// Which tag scheme to run
        #[arg(long, value_enum, default_value_t = SchemeArg::LexicalClass)]
        scheme: SchemeArg,
        /// Keep punctuation units in the output
        #[arg(long)]
        punctuation: bool,
        /// Keep whitespace units in the output
        #[arg(long)]
        whitespace: bool,
        /// Merge adjacent name words into one tag
        #[arg(long)]
        join_names: bool,
        /// Emit results as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FacingArg {
    Back,
    Front,
}

impl From<FacingArg> for CameraFacing {
    fn from(arg: FacingArg) -> Self {
        match arg {
            FacingArg::Back => CameraFacing::Back,
            FacingArg::Front => CameraFacing::Front,
        }
    }
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let w = w.parse().map_err(|_| format!("bad width in {raw:?}"))?;
    let h = h.parse().map_err(|_| format!("bad height in {raw:?}"))?;
    Ok((w, h))
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemeArg {
    Language,
    TokenType,
    LexicalClass,
    Lemma,
    Names,
}

impl From<SchemeArg> for TagScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Language => TagScheme::Language,
            SchemeArg::TokenType => TagScheme::TokenType,
            SchemeArg::LexicalClass => TagScheme::LexicalClass,
            SchemeArg::Lemma => TagScheme::Lemma,
            SchemeArg::Names => TagScheme::NameTypeOrLexicalClass,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Live {
            vision,
            facing,
            fps,
            size,
            model_dir,
            toggle_secs,
            json,
        } => {
            let mut cfg = Config::from_env();
            if let Some(facing) = facing {
                cfg.camera_facing = facing.into();
            }
            if fps.is_some() {
                cfg.capture_fps = fps;
            }
            if let Some((w, h)) = size {
                cfg.capture_width = Some(w);
                cfg.capture_height = Some(h);
            }
            if let Some(dir) = model_dir {
                cfg.model_dir = dir;
            }
            run_live(cfg, vision, toggle_secs, json).await
        }
        Commands::Devices => {
            let devices = camera::list_devices();
            if devices.is_empty() {
                println!("No camera devices found");
            }
            for dev in devices {
                println!("{}\t{}\t{}", dev.path, dev.name, dev.driver);
            }
            Ok(())
        }
        Commands::Tag {
            text,
            scheme,
            punctuation,
            whitespace,
            join_names,
            json,
        } => {
            let options = TagOptions {
                omit_punctuation: !punctuation,
                omit_whitespace: !whitespace,
                join_names,
            };
            for (tag, range) in Tagger::new().tags(&text, scheme.into(), options) {
                let surface = &text[range.clone()];
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "start": range.start,
                            "end": range.end,
                            "text": surface,
                            "tag": tag_label(&tag),
                        })
                    );
                } else {
                    println!("{}..{}\t{}\t{}", range.start, range.end, surface, tag_label(&tag));
                }
            }
            Ok(())
        }
    }
}

fn tag_label(tag: &Tag) -> String {
    match tag {
        Tag::Language(code) => format!("language:{code}"),
        Tag::TokenType(t) => format!("token:{t:?}"),
        Tag::LexicalClass(c) => format!("class:{c:?}"),
        Tag::Lemma(lemma) => format!("lemma:{lemma}"),
        Tag::Name(n) => format!("name:{n:?}"),
    }
}

async fn run_live(
    cfg: Config,
    start_in_vision: bool,
    toggle_secs: Option<u64>,
    json: bool,
) -> Result<()> {
    let mut session =
        CaptureSession::configure(cfg.camera_facing, cfg.capture_spec(), cfg.warmup_frames)
            .context("camera setup failed")?;

    let pipeline = build_pipeline(&cfg);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let router = Router::spawn(session.slot(), Box::new(pipeline), tx)
        .context("failed to spawn router thread")?;
    router.set_vision_mode(start_in_vision);

    session.start().context("failed to start capture")?;
    tracing::info!(
        vision = router.vision_mode(),
        "live pipeline running; press Enter to toggle paths, Ctrl-C to stop"
    );

    let viewport = Viewport {
        width: cfg.viewport_width,
        scale: cfg.viewport_scale,
    };
    let mirror = cfg.camera_facing == CameraFacing::Front;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut auto_toggle = toggle_secs.map(|secs| {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.reset();
        interval
    });
    loop {
        tokio::select! {
            _ = maybe_tick(&mut auto_toggle) => {
                let vision = router.toggle();
                tracing::info!(vision, "inference path toggled on interval");
            }
            event = rx.recv() => {
                match event {
                    Some(event) => print_event(&event, &viewport, mirror, json),
                    None => break,
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(_)) => {
                        let vision = router.toggle();
                        tracing::info!(vision, "inference path toggled");
                    }
                    _ => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.stop();
    router.join();
    tracing::info!("live pipeline stopped");
    Ok(())
}

/// Tick the interval when set; otherwise never complete, so the select
/// branch stays inert.
async fn maybe_tick(interval: &mut Option<tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn build_pipeline(cfg: &Config) -> ModelPipeline {
    let classifier =
        match ImageClassifier::load(&cfg.classifier_model_path(), &cfg.classifier_labels_path()) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!(error = %e, "classifier unavailable; classification path disabled");
                None
            }
        };

    let mut handler = VisionHandler::new();
    let mut requests = Vec::new();
    match FaceDetector::load(&cfg.detector_model_path()) {
        Ok(d) => {
            handler = handler.with_detector(d);
            requests.push(VisionRequest::FaceRectangles);
        }
        Err(e) => tracing::warn!(error = %e, "face detector unavailable"),
    }
    match SaliencyModel::load(&cfg.saliency_model_path()) {
        Ok(s) => {
            handler = handler.with_saliency(s);
            requests.push(VisionRequest::AttentionSaliency);
        }
        Err(e) => tracing::warn!(error = %e, "saliency model unavailable"),
    }

    // Live capture holds the camera in portrait; stills from the rear
    // sensor want the right-top EXIF rotation.
    let orientation = exif_orientation(DeviceOrientation::Portrait);
    ModelPipeline::new(classifier, handler, orientation, requests)
}

fn print_event(event: &RouterEvent, viewport: &Viewport, mirror: bool, json: bool) {
    match event {
        RouterEvent::Classification(c) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "label": &c.label, "confidence": c.confidence })
                );
            } else {
                println!("{}  {:.2}", c.label, c.confidence);
            }
        }
        RouterEvent::Observations(observations) => {
            for obs in observations {
                let screen = obs.bounding_box.as_ref().map(|rect| {
                    let screen = to_screen_rect(rect, viewport);
                    if mirror {
                        mirror_horizontal(&screen, viewport.width)
                    } else {
                        screen
                    }
                });
                if json {
                    println!(
                        "{}",
                        serde_json::json!({
                            "kind": obs.kind,
                            "confidence": obs.confidence,
                            "identifier": &obs.identifier,
                            "rect": screen,
                        })
                    );
                } else {
                    match &screen {
                        Some(r) => println!(
                            "{:?}  {:.2}  x={:.0} y={:.0} w={:.0} h={:.0}",
                            obs.kind, obs.confidence, r.x, r.y, r.width, r.height
                        ),
                        None => println!(
                            "{:?}  {:.2}  {}",
                            obs.kind,
                            obs.confidence,
                            obs.identifier.as_deref().unwrap_or("-")
                        ),
                    }
                }
            }
        }
    }
}
