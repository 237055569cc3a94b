//! Signal Ladder - channel-signal trading bot for Solana

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{fmt, EnvFilter};

use signal_ladder::adapters::cli::{CliApp, Command, OutputFormat, ParseCmd, RunCmd, StatusCmd, TradeCmd};
use signal_ladder::adapters::jito::{JitoBundleClient, JitoBundleSubmitter};
use signal_ladder::adapters::jupiter::JupiterClient;
use signal_ladder::adapters::solana::{SolanaClient, WalletManager};
use signal_ladder::adapters::storage::JsonPositionStore;
use signal_ladder::adapters::telegram::TelegramSource;
use signal_ladder::application::{
    report_failure, EngineSettings, ExecutionEngine, SignalBot, SignalListener, StopLossMonitor,
    TradeKind, TradeReport,
};
use signal_ladder::config::{load_config, peek_log_level, Config};
use signal_ladder::domain::{SignalMarkers, SignalParser};
use signal_ladder::ports::PositionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config_level = app.command.config_path().and_then(peek_log_level);
    init_logging(app.verbose, app.debug, config_level.as_deref());

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Status(cmd) => status_command(cmd).await,
        Command::Parse(cmd) => parse_command(cmd),
        Command::Buy(cmd) => trade_command(cmd, TradeKind::Buy).await,
        Command::Sell(cmd) => trade_command(cmd, TradeKind::Sell).await,
    }
}

/// RUST_LOG wins, then the CLI flags, then the config file
fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new(config_level.unwrap_or("info"))
        }
    });

    fmt().with_env_filter(filter).init();
}

/// Everything a trading command needs, wired once at startup
struct Runtime {
    engine: Arc<ExecutionEngine>,
}

fn build_runtime(config: &Config, rpc_url: Option<String>, keypair: Option<&Path>) -> Result<Runtime> {
    let wallet = load_wallet(config, keypair)?;
    tracing::info!(wallet = %wallet.pubkey(), "Wallet loaded");

    let rpc_url = rpc_url.unwrap_or_else(|| config.solana.get_rpc_url());
    let solana = SolanaClient::new(rpc_url);

    let jupiter = JupiterClient::with_config(config.jupiter.client_config())
        .context("Failed to create Jupiter client")?;

    let jito_config = config.jito.client_config();
    let relay = JitoBundleClient::with_config(jito_config.clone())
        .context("Failed to create Jito client")?;
    let submitter = JitoBundleSubmitter::new(relay, wallet.keypair(), &jito_config)
        .context("Failed to set up bundle submitter")?;

    let data_dir = config.storage.data_dir();
    let store = JsonPositionStore::open(&data_dir)
        .with_context(|| format!("Failed to open position store in {}", data_dir.display()))?;
    tracing::info!(path = %store.path().display(), "Position store opened");

    let settings = EngineSettings {
        buy_lamports: config.trading.buy_lamports()?,
        tip_lamports: config.trading.priority_fee_lamports()?,
        slippage_bps: config.trading.slippage_bps,
        ..EngineSettings::default()
    };

    let engine = ExecutionEngine::new(
        Arc::new(jupiter),
        Arc::new(solana),
        Arc::new(submitter),
        Arc::new(store),
        wallet,
        config.trading.ladder()?,
        config.trading.stop_loss_policy(),
        settings,
    );

    Ok(Runtime {
        engine: Arc::new(engine),
    })
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    tracing::info!("Starting signal-ladder...");

    let config = load_config(&cmd.config).context("Failed to load configuration")?;

    let allow_list = config.telegram.allow_list();
    if allow_list.is_empty() {
        bail!("No signal channels configured, set [telegram].channels in {}", cmd.config.display());
    }
    let Some(bot_token) = config.telegram.get_bot_token() else {
        bail!("Telegram bot token missing, set TELEGRAM_BOT_TOKEN or [telegram].bot_token");
    };

    let runtime = build_runtime(&config, cmd.rpc_url.clone(), cmd.keypair.as_deref())?;
    let source = TelegramSource::new(bot_token, config.telegram.poll_timeout_secs)
        .context("Failed to create Telegram client")?;

    let listener = SignalListener::new(
        source,
        SignalParser::new(config.signals.clone()),
        allow_list,
        Arc::clone(&runtime.engine),
    );
    let monitor = StopLossMonitor::new(Arc::clone(&runtime.engine), config.trading.monitor_pacing());
    let bot = SignalBot::new(listener, monitor);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        shutdown_tx.send(true).ok();
    });

    tracing::info!(
        buy_sol = %config.trading.buy_amount_sol,
        levels = config.trading.take_profit_percentages.len(),
        stop_loss = %runtime.engine.stop_loss().multiplier(),
        "Bot running"
    );
    bot.run(shutdown_rx).await;
    tracing::info!("signal-ladder stopped");
    Ok(())
}

async fn status_command(cmd: StatusCmd) -> Result<()> {
    let config = load_config(&cmd.config)?;
    let store = JsonPositionStore::open(config.storage.data_dir())?;
    let ladder = config.trading.ladder()?;

    let mut positions = store.all().await?;
    positions.sort_by_key(|p| p.opened_at);

    let (sol_lamports, balances) = if cmd.offline {
        (None, None)
    } else {
        let wallet = load_wallet(&config, None)?;
        let solana = SolanaClient::new(config.solana.get_rpc_url());
        let lamports = solana
            .get_balance(&wallet.pubkey())
            .await
            .with_context(|| format!("Failed to read SOL balance of {}", wallet.pubkey()))?;
        let mut balances = Vec::with_capacity(positions.len());
        for position in &positions {
            let balance = solana
                .token_balance_ui(&wallet.pubkey(), &position.token_address)
                .await
                .map(|b| b.to_string())
                .unwrap_or_else(|e| format!("error: {}", e));
            balances.push(balance);
        }
        (Some(lamports), Some(balances))
    };

    match cmd.format {
        OutputFormat::Json => {
            let rows: Vec<_> = positions
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    serde_json::json!({
                        "position": p,
                        "balance": balances.as_ref().map(|b| b[i].clone()),
                    })
                })
                .collect();
            let out = serde_json::json!({
                "sol_lamports": sol_lamports,
                "positions": rows,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            if let Some(lamports) = sol_lamports {
                println!("Wallet balance: {} lamports", lamports);
            }
            if positions.is_empty() {
                println!("No open positions");
                return Ok(());
            }
            println!("{} open position(s), ladder {:?}", positions.len(), ladder.percentages());
            for (i, p) in positions.iter().enumerate() {
                println!(
                    "{}  level {}/{}  entry {} lamports  tokens {}{}",
                    p.token_address,
                    p.current_tp_level,
                    ladder.max_level(),
                    p.entry_lamports,
                    p.initial_token_amount,
                    balances
                        .as_ref()
                        .map(|b| format!("  balance {}", b[i]))
                        .unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

fn parse_command(cmd: ParseCmd) -> Result<()> {
    let markers = match &cmd.config {
        Some(path) => load_config(path)?.signals,
        None => SignalMarkers::default(),
    };
    let parser = SignalParser::new(markers);

    // shells pass "\n" literally
    let text = cmd.text.replace("\\n", "\n");
    match parser.parse(&text, cmd.link.as_deref()) {
        Some(signal) => println!(
            "{} {}{}",
            signal.kind,
            signal.token_address,
            signal.label.map(|l| format!(" ({})", l)).unwrap_or_default()
        ),
        None => println!("no signal"),
    }
    Ok(())
}

async fn trade_command(cmd: TradeCmd, kind: TradeKind) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    let runtime = build_runtime(&config, None, cmd.keypair.as_deref())?;

    let result = match kind {
        TradeKind::Sell => runtime.engine.execute_sell(&cmd.mint).await,
        _ => runtime.engine.execute_buy(&cmd.mint).await,
    };

    match result {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            report_failure(kind, &cmd.mint, &e);
            Err(e).with_context(|| format!("{} {} failed", kind, cmd.mint))
        }
    }
}

fn print_report(report: &TradeReport) {
    println!("{} {} confirmed", report.kind, report.token_address);
    println!("  in:  {}", report.in_amount);
    println!("  out: {}", report.out_amount);
    match report.level_after {
        Some(level) => println!("  level: {}", level),
        None => println!("  position closed"),
    }
    println!("  tx:  {}", report.explorer_url());
    if !report.persisted {
        println!("  WARNING: position store not updated, see logs");
    }
}

/// Wallet from an explicit path, SOLANA_PRIVATE_KEY, or the configured keypair file
fn load_wallet(config: &Config, keypair_override: Option<&Path>) -> Result<WalletManager> {
    if let Some(path) = keypair_override {
        return load_wallet_file(path);
    }
    if let Some(secret) = config.solana.get_private_key() {
        return WalletManager::from_base58(&secret).context("SOLANA_PRIVATE_KEY is not a valid keypair");
    }
    match config.solana.get_keypair_path() {
        Some(path) => load_wallet_file(&path),
        None => bail!("No wallet configured, set SOLANA_PRIVATE_KEY or [solana].keypair_path"),
    }
}

/// Load wallet with helpful error messages
fn load_wallet_file(path: &Path) -> Result<WalletManager> {
    if !path.exists() {
        bail!(
            "Wallet file not found: {}\n\n\
             To create a new wallet, run:\n  \
             solana-keygen new --outfile {}\n\n\
             Or set SOLANA_PRIVATE_KEY, or update 'keypair_path' in your config",
            path.display(),
            path.display()
        );
    }

    WalletManager::from_file(path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load wallet from '{}': {}\n\n\
             Expected format: JSON array of bytes (e.g., [1,2,3,...])",
            path.display(),
            e
        )
    })
}
