//! Interactive prompt sequence
//!
//! Asks the operator for every field of a simulation run. Blank answers
//! keep the default. Works on any reader/writer pair so the sequence can be
//! driven from tests.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::str::FromStr;
use tracing::warn;

use crate::config::{
    apply_tp_overrides, check_stage_sum, parse_percent_list, stages_from_sell_percents,
};
use crate::{SimulationConfig, SimulationError, StrategyConfig};

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    write!(output, "  {}: ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read input")?;
    Ok(line.trim().to_string())
}

fn ask_or<R: BufRead, W: Write, T>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let answer = ask(input, output, prompt)?;
    if answer.is_empty() {
        return Ok(default);
    }
    answer
        .parse()
        .with_context(|| format!("Invalid value for '{}': {}", prompt, answer))
}

/// Run the prompt sequence.
///
/// Returns `Ok(None)` when the stage list does not add up to 100%: the
/// warning is written to `output` and the run should stop there.
pub fn prompt_config<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Option<SimulationConfig>> {
    let defaults = StrategyConfig::default();
    let default_quantity = SimulationConfig::default().quantity;

    writeln!(output, "\nSWING TRADE SIMULATOR - Interactive Mode\n")?;

    let token = ask_or(input, output, "Token (e.g. SOL/USDT)", defaults.token.clone())?;
    let exchange = ask_or(input, output, "Exchange (e.g. OKX)", defaults.exchange.clone())?;
    let entry_price = ask_or(input, output, "Entry price ($)", defaults.entry_price)?;
    let quantity = ask_or(input, output, "Quantity bought", default_quantity)?;
    let tp_percent = ask_or(input, output, "Take Profit (%)", defaults.tp_percent)?;
    let sl_percent = ask_or(input, output, "Stop Loss (%)", defaults.sl_percent)?;
    let fee_percent = ask_or(input, output, "Exchange fee (%)", defaults.fee_percent)?;
    let check_interval_min = ask_or(
        input,
        output,
        "Check interval (min)",
        defaults.check_interval_min,
    )?;

    let mut strategy = StrategyConfig {
        token,
        exchange,
        entry_price,
        tp_percent,
        sl_percent,
        fee_percent,
        check_interval_min,
        ..defaults
    };

    let gradual = ask(input, output, "Gradual sell? (e.g. 30,30,20,20 or blank)")?;
    if !gradual.is_empty() {
        let sell_percents = parse_percent_list(&gradual)?;

        if let Err(SimulationError::StageAllocation { total }) = check_stage_sum(&sell_percents) {
            warn!("Rejected stage list summing to {}%", total);
            writeln!(output, "\n  WARNING: stages sum to {}% (must be 100%)", total)?;
            return Ok(None);
        }

        let mut stages = stages_from_sell_percents(&sell_percents, tp_percent);
        let suggested: Vec<f64> = stages.iter().map(|s| s.tp_percent).collect();
        let custom = ask(
            input,
            output,
            &format!(
                "Staged TPs {:?}. Customize? (e.g. 10,15,20,25 or Enter)",
                suggested
            ),
        )?;
        if !custom.is_empty() {
            apply_tp_overrides(&mut stages, &parse_percent_list(&custom)?);
        }

        strategy = strategy.with_gradual_stages(stages);
    }

    Ok(Some(SimulationConfig {
        strategy,
        quantity,
        exchange_id: None,
    }))
}
