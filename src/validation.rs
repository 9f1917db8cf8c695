//! Checks run on caller-supplied paths before any network call.
//!
//! Messages are written for agents driving the tool: each names the
//! offending argument and ends with a SOLUTION block.

use crate::error::{Result, ThumbkitError};
use crate::models::SUPPORTED_EXTENSIONS;
use std::path::Path;

pub fn validate_image_path(path: &Path, arg_name: &str) -> Result<()> {
    let shown = path.display();

    if !path.is_absolute() {
        return Err(ThumbkitError::ValidationError(format!(
            "ERROR: {arg_name} must be an ABSOLUTE path, but got relative path: {shown}\n\n\
             SOLUTION: Convert to absolute path before calling thumbkit.\n\
             Examples:\n  \
             Python: os.path.abspath('{shown}')\n  \
             Shell:  $(realpath {shown})\n\n\
             Relative paths are resolved from the current working directory and usually fail.\n\
             Always use absolute paths like: /Users/username/images/file.png"
        )));
    }

    if !path.exists() {
        return Err(ThumbkitError::ValidationError(format!(
            "ERROR: {arg_name} file does not exist: {shown}\n\n\
             SOLUTION: Verify the file path is correct and the file exists.\n\
             Check for typos in the path or ensure the file hasn't been moved/deleted."
        )));
    }

    if !path.is_file() {
        return Err(ThumbkitError::ValidationError(format!(
            "ERROR: {arg_name} path is a directory, not a file: {shown}\n\n\
             SOLUTION: Provide the full path to an image file, not a directory.\n\
             Example: {shown}/image.png"
        )));
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        let suffix = if extension.is_empty() {
            "(none)".to_string()
        } else {
            format!(".{}", extension)
        };
        return Err(ThumbkitError::ValidationError(format!(
            "ERROR: {arg_name} has unsupported file extension: {suffix}\n\n\
             SOLUTION: Use one of these supported image formats:\n  \
             - PNG (.png)\n  \
             - JPEG (.jpg, .jpeg)\n  \
             - WebP (.webp)\n\n\
             Current file: {shown}"
        )));
    }

    Ok(())
}

/// References are numbered from 1 in the order given.
pub fn validate_reference_images<P: AsRef<Path>>(paths: &[P], arg_name: &str) -> Result<()> {
    for (i, path) in paths.iter().enumerate() {
        validate_image_path(path.as_ref(), &format!("{} (image #{})", arg_name, i + 1))?;
    }
    Ok(())
}

pub fn validate_out_dir(path: &Path) -> Result<()> {
    if path.exists() && !path.is_dir() {
        return Err(ThumbkitError::ValidationError(format!(
            "ERROR: --out-dir path exists but is not a directory: {}\n\n\
             SOLUTION: Provide a directory path, not a file path.",
            path.display()
        )));
    }
    Ok(())
}
