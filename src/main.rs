use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dining::{Pacing, RunLimit, SimConfig, Simulation};

#[derive(Parser)]
#[command(name = "dining")]
#[command(about = "Dining philosophers without a waiter: parity-ordered fork pickup")]
struct Cli {
    /// TOML config file. Flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of philosophers (and forks)
    #[arg(short = 'n', long)]
    philosophers: Option<usize>,

    /// Run for this many milliseconds
    #[arg(short, long, conflicts_with = "meals")]
    duration_ms: Option<u64>,

    /// Stop once every philosopher has eaten this many times
    #[arg(short, long)]
    meals: Option<u64>,

    /// Lower bound of a thinking pause in milliseconds
    #[arg(long)]
    think_min_ms: Option<u64>,

    /// Upper bound of a thinking pause in milliseconds
    #[arg(long)]
    think_max_ms: Option<u64>,

    /// Lower bound of a meal in milliseconds
    #[arg(long)]
    eat_min_ms: Option<u64>,

    /// Upper bound of a meal in milliseconds
    #[arg(long)]
    eat_max_ms: Option<u64>,

    /// Extra wait, on top of one think + eat cycle, for everyone to stop after the stop signal
    #[arg(long)]
    grace_ms: Option<u64>,

    /// Random seed; philosopher i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Also log every fork pickup and put-down
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimConfig::default(),
        };

        if let Some(n) = self.philosophers {
            config.philosophers = n;
        }
        if let Some(ms) = self.duration_ms {
            config.run = RunLimit::Duration { ms };
        }
        if let Some(per_philosopher) = self.meals {
            config.run = RunLimit::Meals { per_philosopher };
        }
        config.think = Pacing {
            min_ms: self.think_min_ms.unwrap_or(config.think.min_ms),
            max_ms: self.think_max_ms.unwrap_or(config.think.max_ms),
        };
        config.eat = Pacing {
            min_ms: self.eat_min_ms.unwrap_or(config.eat.min_ms),
            max_ms: self.eat_max_ms.unwrap_or(config.eat.max_ms),
        };
        if let Some(ms) = self.grace_ms {
            config.shutdown_grace_ms = ms;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = cli.into_config()?;
    let sim = Simulation::new(config).context("invalid configuration")?;
    info!(
        philosophers = sim.config().philosophers,
        run = ?sim.config().run,
        "setting the table"
    );

    // Ctrl-C でも同じ停止経路を通す
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };
    let report = sim.run_until(interrupt).await?;

    println!("\n=== Dinner Complete ===");
    println!("{}", report);
    if let Some(p) = report.hungriest() {
        println!("Hungriest: {} ({} meals)", p.id, p.meals);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "dining", "-n", "7", "--meals", "4", "--eat-max-ms", "30", "--seed", "9",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.philosophers, 7);
        assert_eq!(config.run, RunLimit::Meals { per_philosopher: 4 });
        assert_eq!(config.eat, Pacing { min_ms: 0, max_ms: 30 });
        assert_eq!(config.think, Pacing::up_to(1_000));
        assert_eq!(config.seed, Some(9));
    }

    #[test]
    fn test_min_pause_flags() {
        let cli = Cli::parse_from([
            "dining", "--think-min-ms", "200", "--eat-min-ms", "50", "--eat-max-ms", "80",
        ]);
        let config = cli.into_config().unwrap();

        assert_eq!(config.think, Pacing { min_ms: 200, max_ms: 1_000 });
        assert_eq!(config.eat, Pacing { min_ms: 50, max_ms: 80 });
        assert!(config.validate().is_ok());

        // min > max は validate で弾かれる
        let cli = Cli::parse_from(["dining", "--eat-min-ms", "5000"]);
        assert!(cli.into_config().unwrap().validate().is_err());
    }

    #[test]
    fn test_duration_conflicts_with_meals() {
        let res = Cli::try_parse_from(["dining", "-d", "100", "-m", "2"]);
        assert!(res.is_err());
    }
}
