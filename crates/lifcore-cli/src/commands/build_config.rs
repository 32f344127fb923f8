//! Parameter block construction

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::{config::NetworkSpec, error::CliResult};

/// Build a binary parameter block
#[derive(Args, Debug)]
pub struct BuildConfigCommand {
    /// Network description (TOML)
    pub network: PathBuf,

    /// Output block file
    #[arg(short, long, default_value = "block.lifc")]
    pub output: PathBuf,
}

impl BuildConfigCommand {
    pub fn execute(self) -> CliResult<()> {
        let spec = NetworkSpec::load(&self.network)?;
        let block = spec.build()?;
        let bytes = block.encode();

        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.output, &bytes)?;

        info!(
            "Wrote {} ({} bytes): {} neurons, {} receptor types, {} neuron types",
            self.output.display(),
            bytes.len(),
            block.num_neurons(),
            block.num_receptors(),
            block.neuron_types.len()
        );
        Ok(())
    }
}
