//! # FluxCalc CLI Application
//!
//! Terminal front end for `calc_core`: evaluates calculator keystrokes (or
//! runs an interactive keypad on stdin), converts units and currencies, and
//! forwards free-text currency questions to the AI assistant.
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `warn`).
//! Settings are read from the environment after loading an optional `.env`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use calc_core::ai::{GeminiClient, AI_SERVICE};
use calc_core::config::AppConfig;
use calc_core::currency::{CurrencyConverter, HttpRateSource};
use calc_core::engine::{BinaryOperator, CalculatorMode, CalculatorState, Engine, KeyInput, ScientificFunction};
use calc_core::errors::{CalcError, CalcResult};
use calc_core::numeric::format_grouped;
use calc_core::units::{self, MAX_FRACTION_DIGITS, MIN_FRACTION_DIGITS};

#[derive(Parser)]
#[command(name = "fluxcalc", version, about = "Calculator, unit converter and currency converter")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate calculator keys, or start an interactive keypad without any
    Calc(CalcArgs),

    /// Unit catalog and conversions
    #[command(subcommand)]
    Units(UnitsCommand),

    /// Convert an amount between currencies using live rates
    Currency {
        amount: String,
        from: String,
        to: String,
    },

    /// Ask the AI assistant a currency question
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
}

#[derive(Args)]
struct CalcArgs {
    /// Enable scientific functions
    #[arg(long)]
    scientific: bool,

    /// Key tokens, e.g. `12 + 30 =` or `9 sqrt`
    #[arg(allow_negative_numbers = true)]
    keys: Vec<String>,
}

#[derive(Subcommand)]
enum UnitsCommand {
    /// List categories and their units
    List,

    /// Convert a value, e.g. `units convert temperature celsius fahrenheit 100`
    Convert {
        category: String,
        from: String,
        to: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
}

#[derive(Serialize)]
struct UnitConversion<'a> {
    category: &'a str,
    from: &'a str,
    to: &'a str,
    value: f64,
    result: f64,
    formatted: String,
}

#[derive(Serialize)]
struct AiAnswer<'a> {
    query: &'a str,
    answer: &'a str,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env();
    debug!(model = %config.gemini_model, rates = %config.rate_service_url, "configuration loaded");

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Ok(json) = serde_json::to_string_pretty(&e) {
                eprintln!();
                eprintln!("Error JSON:");
                eprintln!("{}", json);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &AppConfig) -> CalcResult<()> {
    match cli.command {
        Command::Calc(args) => run_calc(args, cli.json),
        Command::Units(UnitsCommand::List) => list_units(cli.json),
        Command::Units(UnitsCommand::Convert { category, from, to, value }) => {
            convert_units(&category, &from, &to, value, cli.json)
        }
        Command::Currency { amount, from, to } => convert_currency(&amount, &from, &to, config, cli.json).await,
        Command::Ask { query } => ask(&query.join(" "), config, cli.json).await,
    }
}

fn run_calc(args: CalcArgs, json: bool) -> CalcResult<()> {
    let mode = if args.scientific {
        CalculatorMode::Scientific
    } else {
        CalculatorMode::Standard
    };
    let engine = Engine::new(mode);

    if args.keys.is_empty() {
        return keypad_repl(&engine, json);
    }

    let keys = KeyInput::parse_sequence(&args.keys)?;
    let state = engine.evaluate(&CalculatorState::new(), keys);
    print_state(&state, json)
}

/// Line-oriented keypad: each line is a batch of key tokens applied to the
/// running state.
fn keypad_repl(engine: &Engine, json: bool) -> CalcResult<()> {
    println!("FluxCalc - {:?} keypad", engine.mode());
    println!("Enter keys separated by spaces (e.g. `12 + 30 =`), `help` for keys, `quit` to exit.");
    println!();

    let mut state = CalculatorState::new();
    let stdin = io::stdin();
    loop {
        print!("[{}] > ", state.angle_mode_label());
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let line = line.trim();
        if matches!(line, "quit" | "exit" | "q") {
            break;
        }
        if line.is_empty() {
            continue;
        }
        if line == "help" {
            println!("{}", key_help(engine.mode()));
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        match KeyInput::parse_sequence(&tokens) {
            Ok(keys) => {
                state = engine.evaluate(&state, keys);
                print_state(&state, json)?;
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }
    Ok(())
}

fn key_help(mode: CalculatorMode) -> String {
    let operators: Vec<&str> = BinaryOperator::ALL.iter().map(|op| op.symbol()).collect();
    let mut lines = vec![
        "  digits, .  ± (neg)  ⌫ (bs)  ce  ac  =".to_string(),
        format!("  operators: {}", operators.join(" ")),
    ];
    if mode == CalculatorMode::Scientific {
        let functions: Vec<&str> = ScientificFunction::ALL.iter().map(|f| f.symbol()).collect();
        lines.push(format!("  functions: {}", functions.join(" ")));
        lines.push("  rad/deg toggles the angle mode".to_string());
    }
    lines.join("\n")
}

fn print_state(state: &CalculatorState, json: bool) -> CalcResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(state)?);
        return Ok(());
    }
    if !state.expression.is_empty() {
        println!("  {}", state.expression);
    }
    println!("  {}", state.display_text());
    Ok(())
}

fn list_units(json: bool) -> CalcResult<()> {
    let categories = units::categories();
    if json {
        println!("{}", serde_json::to_string_pretty(categories)?);
        return Ok(());
    }
    for category in categories {
        println!("{} ({})", category.name, category.id);
        for unit in &category.units {
            println!("  {:<12} {}", unit.id, unit.name);
        }
    }
    Ok(())
}

fn convert_units(category: &str, from: &str, to: &str, value: f64, json: bool) -> CalcResult<()> {
    let result = units::convert(category, from, to, value)?;
    let formatted = format_grouped(result, MIN_FRACTION_DIGITS, MAX_FRACTION_DIGITS);

    if json {
        let output = UnitConversion {
            category,
            from,
            to,
            value,
            result,
            formatted,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {} = {} {}", value, from, formatted, to);
    }
    Ok(())
}

async fn convert_currency(amount: &str, from: &str, to: &str, config: &AppConfig, json: bool) -> CalcResult<()> {
    let source = HttpRateSource::from_config(config)?;
    let converter = CurrencyConverter::new()
        .set_from_currency(from)
        .set_to_currency(to)
        .set_input(amount)
        .load_rates(&source)
        .await;

    ensure_requested_target(&converter, to)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&converter)?);
        return Ok(());
    }

    if let Some(error) = &converter.error {
        return Err(CalcError::api("Currency converter", None, error.clone()));
    }
    if converter.output_value.is_empty() {
        return Err(CalcError::invalid_input("amount", amount, "Not a number"));
    }

    println!(
        "{} {} = {} {}",
        converter.input_value, converter.from_currency, converter.output_value, converter.to_currency
    );
    Ok(())
}

/// Fail when the fetched table lacked the requested target and another
/// currency was substituted for it.
fn ensure_requested_target(converter: &CurrencyConverter, requested: &str) -> CalcResult<()> {
    let requested = requested.trim().to_uppercase();
    if converter.to_currency != requested {
        return Err(CalcError::rate_unavailable(requested, converter.from_currency.clone()));
    }
    Ok(())
}

async fn ask(query: &str, config: &AppConfig, json: bool) -> CalcResult<()> {
    let client = GeminiClient::new(config)?;
    if !client.is_configured() {
        return Err(CalcError::not_configured(AI_SERVICE));
    }
    let answer = client.ask_currency_question(query).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&AiAnswer { query, answer: &answer })?);
    } else {
        println!("{}", answer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calc_core::currency::RateSnapshot;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_after_keys() {
        let cli = Cli::try_parse_from(["fluxcalc", "calc", "7", "-", "3", "=", "--json", "--scientific"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Calc(args) => {
                assert!(args.scientific);
                assert_eq!(args.keys, vec!["7", "-", "3", "="]);
            }
            _ => panic!("expected calc command"),
        }
    }

    #[test]
    fn test_substituted_target_is_rejected() {
        let mut rates = calc_core::currency::ExchangeRates::new();
        rates.insert("USD".to_string(), 1.0);
        rates.insert("GBP".to_string(), 0.8);
        let converter = CurrencyConverter::new()
            .set_to_currency("chf")
            .rates_loaded("USD", Ok(RateSnapshot::new("USD", rates)));
        assert_eq!(converter.to_currency, "GBP");

        let err = ensure_requested_target(&converter, "chf").unwrap_err();
        assert_eq!(err, CalcError::rate_unavailable("CHF", "USD"));
        assert!(ensure_requested_target(&converter, "gbp").is_ok());
    }

    #[test]
    fn test_key_help_lists_functions_in_scientific_mode() {
        assert!(!key_help(CalculatorMode::Standard).contains("functions"));
        let help = key_help(CalculatorMode::Scientific);
        assert!(help.contains("× ÷"));
        assert!(help.contains("√"));
    }

    #[tokio::test]
    async fn test_ask_without_key_is_not_configured() {
        let err = ask("10 USD to EUR", &AppConfig::default(), false).await.unwrap_err();
        assert_eq!(err.error_code(), "NOT_CONFIGURED");
    }
}
