//! Command line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use geometrix::core::{Color, GridSpace, Theme};

/// Interactive viewer for geometry scene payloads
#[derive(Parser, Clone, Debug)]
#[command(name = "geometrix")]
#[command(about = "Render points, lines, meshes and surfaces on an adaptive coordinate grid")]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Open a window showing a `{scene, buffers, frames}` JSON payload
    View(ViewArgs),
    /// Decode and build a payload without opening a window
    Check {
        /// Path to the payload JSON
        payload: PathBuf,
    },
    /// Show a built-in demo scene
    Demo(DemoArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ViewArgs {
    /// Path to the payload JSON
    pub payload: PathBuf,

    /// Window title
    #[arg(long, default_value = "geometrix")]
    pub title: String,

    /// Override the scene's theme (dark, light)
    #[arg(long, value_parser = parse_named::<Theme>)]
    pub theme: Option<Theme>,

    /// Override the grid space (cartesian, cylindrical, spherical)
    #[arg(long, value_parser = parse_named::<GridSpace>)]
    pub space: Option<GridSpace>,

    /// Background color as `rrggbb` or `#rrggbb`, instead of the theme's
    #[arg(long, value_parser = parse_hex_color)]
    pub background: Option<Color>,

    /// Print the hovered object to stdout
    #[arg(long)]
    pub print_hover: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DemoArgs {
    /// Animate the demo surface
    #[arg(long)]
    pub animate: bool,

    /// Number of animation frames
    #[arg(long, default_value = "60")]
    pub frames: usize,

    /// Grid space (cartesian, cylindrical, spherical)
    #[arg(long, value_parser = parse_named::<GridSpace>, default_value = "cartesian")]
    pub space: GridSpace,
}

/// Parse a lowercase enum name the way scene JSON spells it.
fn parse_named<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_lowercase())).map_err(|e| e.to_string())
}

fn parse_hex_color(s: &str) -> Result<Color, String> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    if digits.len() != 6 {
        return Err(format!("expected 6 hex digits, got {s:?}"));
    }
    u32::from_str_radix(digits, 16)
        .map(Color::hex)
        .map_err(|e| e.to_string())
}
