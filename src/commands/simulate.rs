//! Simulate command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use swing_simulator::config::{
    apply_tp_overrides, check_stage_sum, parse_percent_list, stages_from_sell_percents,
};
use swing_simulator::{
    build_create_request, data, interactive, report, CreateStrategyRequest, PriceSeriesReport,
    SimulationConfig, SimulationError, SimulationResult, StrategySimulator,
};
use tracing::{debug, info, warn};

/// Flag values layered over the loaded or default configuration
#[derive(Debug, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub exchange: Option<String>,
    pub entry_price: Option<f64>,
    pub quantity: Option<f64>,
    pub tp: Option<f64>,
    pub sl: Option<f64>,
    pub fee: Option<f64>,
    pub check_interval: Option<u32>,
    pub stages: Option<String>,
    pub stage_tps: Option<String>,
    pub exchange_id: Option<String>,
}

impl Overrides {
    fn apply(self, mut run: SimulationConfig) -> Result<SimulationConfig> {
        let strategy = &mut run.strategy;

        if let Some(token) = self.token {
            info!("Overriding token to: {}", token);
            strategy.token = token;
        }
        if let Some(exchange) = self.exchange {
            info!("Overriding exchange to: {}", exchange);
            strategy.exchange = exchange;
        }
        if let Some(entry_price) = self.entry_price {
            info!("Overriding entry price to: ${:.2}", entry_price);
            strategy.entry_price = entry_price;
        }
        if let Some(tp) = self.tp {
            info!("Overriding take profit to: {}%", tp);
            strategy.tp_percent = tp;
        }
        if let Some(sl) = self.sl {
            info!("Overriding stop loss to: {}%", sl);
            strategy.sl_percent = sl;
        }
        if let Some(fee) = self.fee {
            info!("Overriding fee to: {}%", fee);
            strategy.fee_percent = fee;
        }
        if let Some(minutes) = self.check_interval {
            info!("Overriding check interval to: {}min", minutes);
            strategy.check_interval_min = minutes;
        }

        if let Some(list) = self.stages {
            let sell_percents = parse_percent_list(&list)?;
            if let Err(SimulationError::StageAllocation { total }) = check_stage_sum(&sell_percents)
            {
                println!("\n  WARNING: stages sum to {}% (must be 100%)", total);
                anyhow::bail!("Gradual stages sum to {}%, expected 100%", total);
            }
            let stages = stages_from_sell_percents(&sell_percents, strategy.tp_percent);
            info!("Overriding gradual stages to: {:?}", sell_percents);
            strategy.gradual_enabled = true;
            strategy.gradual_stages = stages;
        }

        if let Some(list) = self.stage_tps {
            let tps = parse_percent_list(&list)?;
            if !strategy.has_stages() {
                warn!("--stage-tps given without any gradual stages, ignoring");
            }
            apply_tp_overrides(&mut strategy.gradual_stages, &tps);
        }

        if let Some(quantity) = self.quantity {
            info!("Overriding quantity to: {}", quantity);
            run.quantity = quantity;
        }
        if let Some(exchange_id) = self.exchange_id {
            run.exchange_id = Some(exchange_id);
        }

        Ok(run)
    }
}

/// Build the run from a config file (or the built-in plan) plus flag overrides
pub fn load(config_path: Option<String>, overrides: Overrides) -> Result<SimulationConfig> {
    let run = match config_path {
        Some(path) => {
            let run = SimulationConfig::from_file(&path)?;
            info!("Loaded configuration from: {}", path);
            run
        }
        None => {
            info!("Using the default SOL/USDT plan");
            SimulationConfig::default()
        }
    };

    overrides.apply(run)
}

/// Build the run from the interactive prompts. `None` means the operator's
/// answers were rejected and the run should stop.
pub fn prompt() -> Result<Option<SimulationConfig>> {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    interactive::prompt_config(&mut input, &mut output)
}

#[derive(Debug, Serialize)]
struct Backtest {
    name: String,
    report: PriceSeriesReport,
}

#[derive(Debug, Serialize)]
struct SimulationOutput {
    single: SimulationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    gradual: Option<SimulationResult>,
    partials: Vec<SimulationResult>,
    backtests: Vec<Backtest>,
    payload: CreateStrategyRequest,
}

pub fn run(run: SimulationConfig, prices_path: Option<String>, json: bool) -> Result<()> {
    info!("Starting simulation");

    let exchange_id = run.resolve_exchange_id();
    debug!("Exchange id: {}", exchange_id);

    let simulator = StrategySimulator::new(run.strategy, run.quantity)?;
    let config = simulator.config();

    let single = simulator.simulate_single_sell();

    let (gradual, partials) = if config.is_gradual() {
        let gradual = simulator.simulate_gradual_sell();
        let partials: Vec<SimulationResult> = (1..config.gradual_stages.len())
            .map(|n| simulator.simulate_partial_exit(n))
            .collect();
        (Some(gradual), partials)
    } else {
        (None, Vec::new())
    };

    let mut paths = vec![
        (
            format!("rising path (+1%/tick, {} ticks)", data::RISING_TICKS),
            data::rising_path(config.entry_price),
        ),
        (
            format!("falling path (-1%/tick, {} ticks)", data::FALLING_TICKS),
            data::falling_path(config.entry_price),
        ),
    ];
    if let Some(path) = prices_path {
        let prices = data::load_prices_csv(&path)?;
        paths.push((format!("recorded path ({})", path), prices));
    }

    let mut backtests = Vec::with_capacity(paths.len());
    for (name, prices) in paths {
        info!("Walking {}", name);
        let report = simulator
            .simulate_price_series(&prices)
            .with_context(|| format!("Backtest failed on {}", name))?;
        backtests.push(Backtest { name, report });
    }

    let payload = build_create_request(config, &exchange_id);

    if json {
        let output = SimulationOutput {
            single,
            gradual,
            partials,
            backtests,
            payload,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    print!("{}", report::render_header(config, simulator.quantity()));
    print!("{}", report::render_result(&single));

    if let Some(gradual) = &gradual {
        print!("{}", report::render_result(gradual));
        print!("{}", report::render_comparison(&single, gradual));
        if !partials.is_empty() {
            print!("{}", report::render_partials(&partials));
        }
    }

    for backtest in &backtests {
        print!("{}", report::render_price_events(&backtest.name, &backtest.report));
    }

    println!("\n{}", "=".repeat(60));
    println!("  STRATEGY PAYLOAD");
    println!("{}", "=".repeat(60));
    println!("{}", payload.to_json_pretty()?);

    info!("Simulation complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_flags_replace_default_stages() {
        let overrides = Overrides {
            tp: Some(8.0),
            stages: Some("50,50".to_string()),
            stage_tps: Some("9".to_string()),
            ..Default::default()
        };
        let run = overrides.apply(SimulationConfig::default()).unwrap();

        let stages = &run.strategy.gradual_stages;
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].tp_percent, 9.0);
        assert_eq!(stages[1].tp_percent, 13.0);
        assert!(run.strategy.is_gradual());
    }

    #[test]
    fn test_bad_stage_flag_is_rejected() {
        let overrides = Overrides {
            stages: Some("30,30".to_string()),
            ..Default::default()
        };
        assert!(overrides.apply(SimulationConfig::default()).is_err());
    }

    #[test]
    fn test_scalar_flags_override_defaults() {
        let overrides = Overrides {
            token: Some("ETH/USDT".to_string()),
            quantity: Some(2.0),
            check_interval: Some(5),
            exchange_id: Some("abc".to_string()),
            ..Default::default()
        };
        let run = overrides.apply(SimulationConfig::default()).unwrap();
        assert_eq!(run.strategy.token, "ETH/USDT");
        assert_eq!(run.quantity, 2.0);
        assert_eq!(run.strategy.check_interval_min, 5);
        assert_eq!(run.resolve_exchange_id(), "abc");
    }
}
