//! Bundling options loaded from a TOML file

use crate::bundle::BundleOptions;
use crate::error::WdlError;
use std::fs;
use std::io;
use std::path::Path;

/// Load bundle options from `path`. A missing file yields the defaults.
pub fn load_options<P: AsRef<Path>>(path: P) -> Result<BundleOptions, WdlError> {
    let path = path.as_ref();
    let config_error = |message: String| WdlError::Config {
        path: path.to_path_buf(),
        message,
    };

    if path.is_dir() {
        return Err(config_error(
            "expected a TOML file, but found a directory".to_string(),
        ));
    }
    match fs::read_to_string(path) {
        Ok(contents) => toml::from_str::<BundleOptions>(&contents)
            .map_err(|e| config_error(format!("failed to parse as TOML: {}", e))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(BundleOptions::default()),
        Err(err) => Err(config_error(format!("failed to read: {}", err))),
    }
}

/// Serialise options in the same format `load_options` reads
pub fn save_options<P: AsRef<Path>>(path: P, options: &BundleOptions) -> Result<(), WdlError> {
    let path = path.as_ref();
    let serialized = toml::to_string(options).map_err(|e| WdlError::Config {
        path: path.to_path_buf(),
        message: format!("failed to serialise options: {}", e),
    })?;
    crate::fs_utils::write_file(path, serialized)
}
