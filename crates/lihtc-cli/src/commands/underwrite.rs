use clap::Args;
use serde_json::Value;

use lihtc_core::pipeline;

use crate::input;

/// Arguments for the full underwriting pipeline
#[derive(Args)]
pub struct UnderwriteArgs {
    /// Path to a ProjectInputs file (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Run the built-in example deal
    #[arg(long)]
    pub example: bool,

    /// Path to an underwriting policy override (JSON or YAML)
    #[arg(long)]
    pub policy: Option<String>,
}

pub fn run_underwrite(args: UnderwriteArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = input::resolve_project_inputs(args.input.as_deref(), args.example)?;
    let policy = input::resolve_policy(args.policy.as_deref())?;

    let result = pipeline::underwrite(&inputs, &policy)?;
    Ok(serde_json::to_value(result)?)
}
