//! geometrix command line viewer

mod config;
mod demo;

use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use clap::Parser;
use geometrix::prelude::*;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Command, Config, ViewArgs};
use crate::demo::demo_scene;

fn load(path: &Path) -> anyhow::Result<DecodedPayload> {
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    DecodedPayload::from_json(&json)
        .map_err(|report| anyhow::anyhow!("{report:?}"))
        .with_context(|| format!("decoding {}", path.display()))
}

fn view(args: ViewArgs) -> anyhow::Result<()> {
    let mut payload = load(&args.payload)?;
    if let Some(theme) = args.theme {
        payload.scene.controls.theme = theme;
    }
    if let Some(space) = args.space {
        payload.scene.grid.space = space;
    }
    let mut options = ViewerOptions::new().title(args.title);
    if let Some(background) = args.background {
        options = options.background(background);
    }
    if args.print_hover {
        options = options.on_hover(|spec| match spec {
            Some(spec) => println!("hover: {} ({})", spec.label(), spec.kind.name()),
            None => println!("hover: -"),
        });
    }
    if run_viewer(payload, options).is_error() {
        bail!("viewer exited with an error");
    }
    Ok(())
}

/// Decode, build and fit a payload, logging what a viewer would show.
fn check(path: &Path) -> anyhow::Result<()> {
    let payload = load(path)?;
    let scene = &payload.scene;
    info!(
        "{} objects, {} buffers, {} frames",
        scene.objects.len(),
        payload.buffers.len(),
        payload.frames.len()
    );
    for (i, obj) in scene.objects.iter().enumerate() {
        let roles: Vec<&str> = obj.buffers.keys().map(String::as_str).collect();
        info!("object {i}: {} [{}] roles={roles:?}", obj.label(), obj.kind.name());
    }

    let built = build_scene(scene, &payload.buffers).map_err(|report| anyhow::anyhow!("{report:?}"))?;
    info!("built {} nodes", built.len());
    match GridConfig::default().fit_to_scene(scene, &payload.buffers) {
        Some(fit) => info!(
            "grid {:?}..{:?}, divisions {:?}, gizmo scale {:.2}",
            fit.config.min, fit.config.max, fit.config.divisions, fit.gizmo_scale
        ),
        None => info!("no positions, default grid"),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    match config.command {
        Command::View(args) => view(args),
        Command::Check { payload } => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| "geometrix=info,geometrix_viewer=debug".into()),
                )
                .init();
            check(&payload)
        }
        Command::Demo(args) => {
            let payload = demo_scene(args.animate, args.frames, args.space);
            if run_viewer(payload, ViewerOptions::new().title("geometrix demo")).is_error() {
                bail!("viewer exited with an error");
            }
            Ok(())
        }
    }
}
