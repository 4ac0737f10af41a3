//! Safety checks for batch output paths.
//!
//! Batch mode writes one file per input into an output directory. These checks
//! keep it from overwriting a source song with its own transform.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output file must have the required extension (e.g. "cho")
/// - Output cannot be the same as any of the provided source paths
///
/// # Arguments
/// * `output` - The output path that will be created/overwritten
/// * `required_extension` - Extension the output must carry, without the dot
/// * `source_paths` - Slice of source paths that must not match the output
pub fn validate_output_path(
    output: &Path,
    required_extension: &str,
    source_paths: &[&Path],
) -> Result<()> {
    let extension = output.extension().and_then(|e| e.to_str()).unwrap_or("");

    if !extension.eq_ignore_ascii_case(required_extension) {
        bail!(
            "Safety check failed: output file '{}' must have a .{} extension",
            output.display(),
            required_extension
        );
    }

    for source in source_paths {
        if output == *source {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
