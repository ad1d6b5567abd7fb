use clap::{Args, Parser, Subcommand, ValueEnum};
use std::net::{IpAddr, SocketAddr};

use crate::core::{
    Bill, BillConfig, Category, CustomerType, TierBand, TierSchedule, UNBOUNDED_SENTINEL,
    UpperBound, codec,
};
use crate::logging::LogFormat;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCustomerType {
    Domestic,
    NonDomestic,
}

impl From<CliCustomerType> for CustomerType {
    fn from(value: CliCustomerType) -> Self {
        match value {
            CliCustomerType::Domestic => CustomerType::Domestic,
            CliCustomerType::NonDomestic => CustomerType::NonDomestic,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCategory {
    Lv,
    MvHv,
    Streetlight,
    Water,
}

impl From<CliCategory> for Category {
    fn from(value: CliCategory) -> Self {
        match value {
            CliCategory::Lv => Category::Lv,
            CliCategory::MvHv => Category::MvHv,
            CliCategory::Streetlight => Category::Streetlight,
            CliCategory::Water => Category::Water,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "billsplit",
    about = "Split a shared tiered electricity bill across co-tenants (max-min fair tiers + ICPT + service tax)"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        env = "BILLSPLIT_LOG_FORMAT",
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API
    Serve(ServeArgs),
    /// Compute and print a bill
    Split(SplitArgs),
    /// Print a share token for a configuration
    Share(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "BILLSPLIT_HOST", default_value = "0.0.0.0")]
    host: IpAddr,
    #[arg(short, long, env = "BILLSPLIT_PORT", default_value_t = 8080)]
    port: u16,
}

#[derive(Args, Debug)]
pub struct SplitArgs {
    #[command(flatten)]
    config: ConfigArgs,
    #[arg(long, help = "Print the bill as JSON instead of a table")]
    json: bool,
}

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    #[arg(long, help = "Share token to start from; unreadable tokens fall back to defaults")]
    state: Option<String>,
    #[arg(
        long = "tier",
        value_name = "FROM-TO@RATE",
        help = "Price band, e.g. 1-200@0.218 or 601-@0.546 for the open-ended top band; repeat in order"
    )]
    tiers: Vec<String>,
    #[arg(
        long = "tenant",
        value_name = "NAME=KWH",
        help = "Tenant reading; KWH may be an expression such as 1520.5-1270"
    )]
    tenants: Vec<String>,
    #[arg(long, help = "Service tax rate in percent")]
    tax_rate: Option<f64>,
    #[arg(long, value_enum)]
    customer_type: Option<CliCustomerType>,
    #[arg(long, value_enum, help = "ICPT category for non-domestic customers")]
    category: Option<CliCategory>,
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve(args) => {
            let addr = SocketAddr::new(args.host, args.port);
            super::run_http_server(addr)
                .await
                .map_err(|e| format!("server error: {e}"))
        }
        Command::Split(args) => {
            let config = build_config(args.config)?;
            let bill = config.bill();
            if args.json {
                let json = serde_json::to_string_pretty(&bill)
                    .map_err(|e| format!("could not serialize bill: {e}"))?;
                println!("{json}");
            } else {
                for warning in config.schedule.warnings() {
                    eprintln!("warning: {warning}");
                }
                print!("{}", render_bill(&bill));
            }
            Ok(())
        }
        Command::Share(args) => {
            let config = build_config(args)?;
            let token = codec::encode(&config).map_err(|e| e.to_string())?;
            println!("{}", codec::share_query(&token));
            Ok(())
        }
    }
}

fn build_config(args: ConfigArgs) -> Result<BillConfig, String> {
    let mut config = codec::decode_or_default(args.state.as_deref());

    if !args.tiers.is_empty() {
        let bands = args
            .tiers
            .iter()
            .map(|raw| parse_tier(raw))
            .collect::<Result<Vec<_>, _>>()?;
        config.schedule = TierSchedule::from_bands(bands);
    }

    if !args.tenants.is_empty() {
        let mut tenants = crate::core::TenantSet::empty();
        for raw in &args.tenants {
            let (name, entry) = raw
                .split_once('=')
                .ok_or_else(|| format!("--tenant {raw}: expected NAME=KWH"))?;
            let id = tenants.add_tenant(name.trim(), 0.0);
            if entry.trim().is_empty() {
                tenants.set_consumption_text(id, entry);
            } else {
                tenants
                    .apply_expression(id, entry)
                    .map_err(|e| format!("--tenant {raw}: {e}"))?;
            }
        }
        config.tenants = tenants;
    }

    if let Some(rate) = args.tax_rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err("--tax-rate must be >= 0".to_string());
        }
        config.tax_rate_percent = rate;
    }
    if let Some(customer_type) = args.customer_type {
        config.customer_type = customer_type.into();
    }
    if let Some(category) = args.category {
        config.category = category.into();
    }

    Ok(config)
}

fn parse_tier(raw: &str) -> Result<TierBand, String> {
    let err = || format!("--tier {raw}: expected FROM-TO@RATE");
    let (range, rate) = raw.split_once('@').ok_or_else(err)?;
    let (from, to) = range.split_once('-').ok_or_else(err)?;

    let from = from.trim().parse::<f64>().map_err(|_| err())?;
    let to = match to.trim() {
        "" | "inf" | "∞" => UpperBound::Unbounded,
        t if t == UNBOUNDED_SENTINEL => UpperBound::Unbounded,
        t => UpperBound::Finite(t.parse::<f64>().map_err(|_| err())?),
    };
    let rate = rate.trim().parse::<f64>().map_err(|_| err())?;
    if !from.is_finite() || !rate.is_finite() {
        return Err(err());
    }
    Ok(TierBand::new(from, to, rate))
}

/// Plain-text bill: amounts to 2 places, rates to 3.
pub fn render_bill(bill: &Bill) -> String {
    let mut out = format!("{:<16} {:>12} {:>10} {:>12}\n", "Tier", "kWh", "Rate", "Cost");
    for tier in &bill.tiers {
        let range = format!("{} - {}", tier.from, tier.to);
        out.push_str(&format!(
            "{:<16} {:>12.2} {:>10.3} {:>12.2}\n",
            range, tier.usage, tier.rate, tier.cost
        ));
    }
    out.push_str(&summary_line("Base cost", bill.base_cost));
    out.push_str(&summary_line(
        &format!("ICPT ({})", bill.adjustment_label),
        bill.adjustment,
    ));
    if bill.tax_applies {
        out.push_str(&summary_line(
            &format!("Service tax ({}%)", bill.tax_rate_percent),
            bill.tax,
        ));
    }
    out.push_str(&summary_line("Grand total", bill.grand_total));
    out.push('\n');

    out.push_str(&format!(
        "{:<16} {:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "Unit", "kWh", "Base", "ICPT", "Tax", "Total"
    ));
    for tenant in &bill.tenants {
        out.push_str(&format!(
            "{:<16} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}\n",
            tenant.name,
            tenant.consumption,
            tenant.base_cost,
            tenant.adjustment,
            tenant.tax,
            tenant.total
        ));
        for entry in tenant.breakdown.iter().filter(|b| b.usage > 0.0) {
            out.push_str(&format!(
                "    {:.2} kWh x {:.3} = {:.2}\n",
                entry.usage, entry.rate, entry.cost
            ));
        }
    }
    out
}

fn summary_line(label: &str, amount: f64) -> String {
    format!("{label:<40} {amount:>12.2}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn split_config(args: &[&str]) -> Result<BillConfig, String> {
        let cli = Cli::try_parse_from(std::iter::once("billsplit").chain(args.iter().copied()))
            .map_err(|e| e.to_string())?;
        match cli.command {
            Command::Split(args) => build_config(args.config),
            Command::Share(args) => build_config(args),
            Command::Serve(_) => Err("unexpected serve".to_string()),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn build_config_parses_tenant_expressions() {
        let config = split_config(&[
            "split",
            "--tenant",
            "A=250",
            "--tenant",
            "B=1000 - 450",
            "--tax-rate",
            "8",
        ])
        .expect("valid args");

        assert_eq!(config.tenants.len(), 2);
        assert_eq!(config.tenants.tenants()[1].consumption, 550.0);
        assert_eq!(
            config.tenants.tenants()[1].expression.as_deref(),
            Some("1000 - 450")
        );
        assert_approx(config.bill().grand_total, 368.28);
    }

    #[test]
    fn build_config_rejects_bad_tenant_entry() {
        let err = split_config(&["split", "--tenant", "A=12 +"]).expect_err("must reject");
        assert!(err.contains("--tenant"));
        let err = split_config(&["split", "--tenant", "no-equals"]).expect_err("must reject");
        assert!(err.contains("NAME=KWH"));
    }

    #[test]
    fn blank_tenant_reading_counts_as_zero() {
        let config = split_config(&["split", "--tenant", "A=", "--tenant", "B=  ", "--tenant", "C=300"])
            .expect("blank readings are accepted");

        let readings: Vec<f64> = config.tenants.tenants().iter().map(|t| t.consumption).collect();
        assert_eq!(readings, vec![0.0, 0.0, 300.0]);
        assert!(config.tenants.tenants()[0].expression.is_none());
        assert_approx(config.bill().total_consumption, 300.0);
    }

    #[test]
    fn build_config_rejects_negative_tax_rate() {
        let err = split_config(&["split", "--tax-rate=-1"]).expect_err("must reject");
        assert!(err.contains("--tax-rate"));
    }

    #[test]
    fn tiers_and_classification_flags_replace_defaults() {
        let config = split_config(&[
            "share",
            "--tier",
            "1-100@0.2",
            "--tier",
            "101-@0.4",
            "--customer-type",
            "non-domestic",
            "--category",
            "mv-hv",
        ])
        .expect("valid args");

        let bands = config.schedule.bands();
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].to, UpperBound::Finite(100.0));
        assert!(bands[1].to.is_unbounded());
        assert_eq!(config.customer_type, CustomerType::NonDomestic);
        assert_eq!(config.category, Category::MvHv);
    }

    #[test]
    fn parse_tier_rejects_malformed_bands() {
        assert!(parse_tier("1-100").is_err());
        assert!(parse_tier("1@0.2").is_err());
        assert!(parse_tier("a-100@0.2").is_err());
        assert!(parse_tier("1-100@x").is_err());
        assert!(parse_tier("601-inf@0.546").is_ok_and(|b| b.to.is_unbounded()));
    }

    #[test]
    fn state_flag_seeds_configuration() {
        let mut shared = BillConfig::default();
        shared.tax_rate_percent = 6.0;
        let token = codec::encode(&shared).expect("encode");

        let config = split_config(&["split", "--state", &token]).expect("valid args");
        assert_eq!(config.tax_rate_percent, 6.0);

        let fallback = split_config(&["split", "--state", "broken"]).expect("valid args");
        assert_eq!(fallback.tax_rate_percent, BillConfig::default().tax_rate_percent);
    }

    #[test]
    fn render_bill_lists_tiers_and_tenants() {
        let config = split_config(&["split", "--tenant", "A=250", "--tenant", "=550"])
            .expect("valid args");
        let text = render_bill(&config.bill());

        assert!(text.contains("601 - ∞"));
        assert!(text.contains("43.60"));
        assert!(text.contains("Service tax (8%)"));
        assert!(text.contains("368.28"));
        assert!(text.contains("Unit 2"));
        assert!(text.contains("100.00 kWh x 0.218 = 21.80"));
    }
}
