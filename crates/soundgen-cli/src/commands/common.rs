//! Helpers shared by the playback commands.

use anyhow::Context;
use soundgen_config::load_instrument;
use soundgen_synth::Instrument;

/// Load a factory instrument by name or an instrument document by path.
pub fn resolve_instrument(name_or_path: &str) -> anyhow::Result<Instrument> {
    load_instrument(name_or_path).with_context(|| format!("loading instrument '{name_or_path}'"))
}

/// Format a linear level as dBFS.
pub fn format_level(level: f32) -> String {
    if level > 0.0 {
        format!("{level:.4} ({:.1} dBFS)", 20.0 * level.log10())
    } else {
        format!("{level:.4} (-inf dBFS)")
    }
}
