//! Parameter block inspection

use clap::Args;
use std::path::PathBuf;
use tracing::info;

use crate::error::{CliError, CliResult};
use lifcore_params::{BlockFlags, ExpDecayLut, ParamBlock, ReceptorSign};

/// Show the contents of a parameter block
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Parameter block file
    pub block: PathBuf,

    /// Print the receptor decay tables
    #[arg(long)]
    pub decay_table: bool,

    /// Entries per decay table
    #[arg(long, default_value = "16")]
    pub entries: usize,

    /// Sample the decay table every 2^shift ticks
    #[arg(long, default_value = "0")]
    pub time_shift: u32,

    /// Print the parsed block as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub fn execute(self) -> CliResult<()> {
        let block = ParamBlock::from_file(&self.block)?;
        info!("Inspecting {}", self.block.display());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&block)?);
            return Ok(());
        }

        self.print_summary(&block);
        if self.decay_table {
            self.print_decay_tables(&block)?;
        }
        Ok(())
    }

    fn print_summary(&self, block: &ParamBlock) {
        let n = block.num_neurons();
        let recorded = (0..n).filter(|&i| block.is_recorded(i)).count();

        println!("model: {:?}", block.model);
        println!("neurons: {}", n);
        println!("timestep: {} us", block.timestep_us);
        println!(
            "recording: {} neurons (traces: {}, spikes: {})",
            recorded,
            block.flags.contains(BlockFlags::RECORD_TRACES),
            block.flags.contains(BlockFlags::RECORD_SPIKES)
        );

        println!("receptors: {}", block.num_receptors());
        for (r, receptor) in block.receptors.iter().enumerate() {
            let sign = match receptor.sign {
                ReceptorSign::Excitatory => "excitatory",
                ReceptorSign::Inhibitory => "inhibitory",
            };
            println!(
                "  [{}] {} decay={:.6} weight_frac_bits={}",
                r,
                sign,
                receptor.decay.to_f64(),
                receptor.weight_frac_bits
            );
        }

        println!("neuron types: {}", block.neuron_types.len());
        for (t, params) in block.neuron_types.iter().enumerate() {
            let members = block.type_index.iter().filter(|&&i| i as usize == t).count();
            println!(
                "  [{}] {} neurons: v_rest={} v_reset={} v_thresh={} decay={:.6} input_scale={:.6} refractory={} ticks",
                t,
                members,
                params.v_rest,
                params.v_reset,
                params.v_thresh,
                params.membrane_decay.to_f64(),
                params.input_scale.to_f64(),
                params.refractory_ticks
            );
        }

        let biased = block.bias.iter().filter(|b| b.to_raw() != 0).count();
        println!("biased neurons: {}", biased);
    }

    /// Analytic table next to the value the tick loop reaches by repeated multiplication
    fn print_decay_tables(&self, block: &ParamBlock) -> CliResult<()> {
        let step = sample_step(self.entries, self.time_shift)?;
        let dt_ms = block.timestep_us as f64 / 1000.0;
        for (r, receptor) in block.receptors.iter().enumerate() {
            let factor = receptor.decay.to_f64();
            if factor <= 0.0 {
                println!("receptor {}: decays fully every tick", r);
                continue;
            }
            let tau_ms = if factor >= 1.0 {
                f64::INFINITY
            } else {
                -dt_ms / factor.ln()
            };
            let lut = ExpDecayLut::new(dt_ms, tau_ms, self.entries, self.time_shift)
                .map_err(|e| CliError::invalid_args(e.to_string()))?;

            println!("receptor {} (tau ~ {:.3} ms):", r, tau_ms);
            println!("  {:>8} {:>12} {:>12}", "ticks", "exp", "iterated");
            let mut iterated = lifcore_params::Q15_16::ONE;
            let mut done = 0u32;
            for (k, value) in lut.entries().iter().enumerate() {
                let ticks = k as u32 * step;
                while done < ticks {
                    iterated = iterated.saturating_mul(receptor.decay);
                    done += 1;
                }
                println!(
                    "  {:>8} {:>12.6} {:>12.6}",
                    ticks,
                    value.to_f64(),
                    iterated.to_f64()
                );
            }
        }
        Ok(())
    }
}

/// Tick spacing of the table samples; the last sample must fit a tick counter
fn sample_step(entries: usize, time_shift: u32) -> CliResult<u32> {
    let last = entries.saturating_sub(1) as u64;
    let step = 1u64.checked_shl(time_shift).unwrap_or(u64::MAX);
    match last.checked_mul(step) {
        Some(ticks) if time_shift < 32 && ticks <= u32::MAX as u64 => Ok(step as u32),
        _ => Err(CliError::invalid_args(format!(
            "{} entries every 2^{} ticks overrun the tick counter",
            entries, time_shift
        ))),
    }
}
