pub mod file;
pub mod stdin;

use lihtc_core::policy::UnderwritingPolicy;
use lihtc_core::types::ProjectInputs;

/// Resolve the deal inputs for a command: an explicit file wins, then piped
/// stdin, then the built-in example deal when requested.
pub fn resolve_project_inputs(
    path: Option<&str>,
    use_example: bool,
) -> Result<ProjectInputs, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return file::read_inputs(path);
    }
    if let Some(data) = stdin::read_stdin()? {
        return Ok(serde_json::from_value(data)?);
    }
    if use_example {
        return Ok(ProjectInputs::example());
    }
    Err("provide --input <file.json|file.yaml>, pipe JSON on stdin, or pass --example".into())
}

/// Load an underwriting policy override, or fall back to the defaults.
pub fn resolve_policy(
    path: Option<&str>,
) -> Result<UnderwritingPolicy, Box<dyn std::error::Error>> {
    match path {
        Some(path) => file::read_inputs(path),
        None => Ok(UnderwritingPolicy::default()),
    }
}
