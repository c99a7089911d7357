//! User configuration (`config.toml`).
//!
//! ```toml
//! [sheet]
//! max_columns = 26
//! max_rows = 100
//!
//! [import]
//! max_columns = 1000
//! max_rows = 1000
//! ```
//!
//! Problems with the file never stop the program: they are reported as
//! warnings and the defaults are used instead.

use directories::ProjectDirs;
use lambdasheet_core::SheetBounds;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

/// Smallest bound that still admits one address (`1 < 2`).
const MIN_BOUND: u32 = 2;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    sheet: Option<BoundsSection>,
    import: Option<BoundsSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BoundsSection {
    max_columns: Option<u32>,
    max_rows: Option<u32>,
}

impl BoundsSection {
    /// Apply the values set in this section on top of `base`.
    fn apply(&self, section: &str, base: SheetBounds, warnings: &mut Vec<String>) -> SheetBounds {
        let mut pick = |key: &str, value: Option<u32>, default: u32| match value {
            Some(v) if v >= MIN_BOUND => v,
            Some(v) => {
                warnings.push(format!(
                    "Ignoring [{}] {} = {}: must be at least {}",
                    section, key, v, MIN_BOUND
                ));
                default
            }
            None => default,
        };
        SheetBounds::new(
            pick("max_columns", self.max_columns, base.max_columns),
            pick("max_rows", self.max_rows, base.max_rows),
        )
    }
}

/// Resolved configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Bounds for sheets built from `-c` arguments or stdin.
    pub sheet: SheetBounds,
    /// Bounds for sheets loaded from TSV files.
    pub import: SheetBounds,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sheet: SheetBounds::INTERACTIVE,
            import: SheetBounds::BULK,
        }
    }
}

pub(crate) fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("me", "shoryuken", "lambdasheet")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("config.toml");
    Some(path)
}

/// Parse configuration text. Unknown keys and bad values become warnings.
pub fn parse_config(content: &str, origin: &str) -> (Config, Vec<String>) {
    let mut warnings = Vec::new();
    let file = match toml::from_str::<ConfigFile>(content) {
        Ok(file) => file,
        Err(err) => {
            warnings.push(format!("Failed to parse {}: {}", origin, err));
            return (Config::default(), warnings);
        }
    };
    let defaults = Config::default();
    let section = |s: Option<BoundsSection>| s.unwrap_or_default();
    let config = Config {
        sheet: section(file.sheet).apply("sheet", defaults.sheet, &mut warnings),
        import: section(file.import).apply("import", defaults.import, &mut warnings),
    };
    (config, warnings)
}

/// Load the configuration from `explicit`, or from the user config dir.
///
/// A missing file in the user config dir is silently ignored; a missing
/// explicit file is a warning.
pub fn load_config(explicit: Option<&Path>) -> (Config, Vec<String>) {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match user_config_path() {
            Some(p) => p,
            None => return (Config::default(), Vec::new()),
        },
    };

    if !path.exists() {
        let warnings = if explicit.is_some() {
            vec![format!("Config file not found: {}", path.display())]
        } else {
            Vec::new()
        };
        return (Config::default(), warnings);
    }

    let content = match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > MAX_CONFIG_FILE_BYTES => Err(format!(
            "Refusing to read {}: file too large ({} bytes, max {})",
            path.display(),
            meta.len(),
            MAX_CONFIG_FILE_BYTES
        )),
        Ok(_) => std::fs::read_to_string(&path)
            .map_err(|err| format!("Failed to read {}: {}", path.display(), err)),
        Err(err) => Err(format!(
            "Failed to read metadata for {}: {}",
            path.display(),
            err
        )),
    };
    match content {
        Ok(content) => parse_config(&content, &path.display().to_string()),
        Err(warning) => (Config::default(), vec![warning]),
    }
}
