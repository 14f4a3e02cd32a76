use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use epistats::api::DEFAULT_BASE_URL;
use epistats::models::ChartType;
use epistats::stats::ComparisonRow;
use epistats::transform::{self, calculate_percentage, format_number_locale, format_per_million};
use epistats::{Client, ClientConfig, CountryStat, Dashboard, DashboardConfig, Metric, StatsSource};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "epistats",
    version,
    about = "Fetch, rank & compare COVID-19 statistics per country"
)]
struct Cli {
    /// API base URL.
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    /// Per-request timeout in seconds.
    #[arg(long, global = true, default_value_t = 10)]
    timeout_secs: u64,
    /// Locale for number grouping (en, de, fr, es, it, pt, nl).
    #[arg(long, global = true, default_value = "en")]
    locale: String,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List countries ranked by a metric.
    Countries(CountriesArgs),
    /// Show one country with its recent daily figures.
    Country(CountryArgs),
    /// Compare a set of countries side by side.
    Compare(CompareArgs),
    /// Show world totals.
    Global,
}

#[derive(Args, Debug)]
struct CountriesArgs {
    /// Metric to rank by (cases, todayCases, deaths, recovered, active, critical, tests, ...).
    #[arg(long, default_value = "cases")]
    sort: Metric,
    /// Lowest first.
    #[arg(long, default_value_t = false)]
    asc: bool,
    /// Only countries whose name contains this text.
    #[arg(long)]
    search: Option<String>,
    /// Show at most this many rows.
    #[arg(long, default_value_t = 20)]
    limit: usize,
    /// Show the metric per million population.
    #[arg(long, default_value_t = false)]
    per_million: bool,
}

#[derive(Args, Debug)]
struct CountryArgs {
    /// Country name or ISO code (e.g., Germany, DE, DEU).
    name: String,
    /// Days of history to load.
    #[arg(long, default_value_t = 30)]
    days: u32,
    /// Show figures per million population.
    #[arg(long, default_value_t = false)]
    per_million: bool,
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// Countries separated by comma or semicolon (default: USA,India,Brazil,Russia,France).
    #[arg(short, long)]
    countries: Option<String>,
    #[arg(long, default_value = "cases")]
    metric: Metric,
    #[arg(long, default_value_t = false)]
    per_million: bool,
    /// Print a table instead of bars.
    #[arg(long, default_value_t = false)]
    table: bool,
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let client = Client::with_config(ClientConfig {
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..ClientConfig::default()
    })
    .context("build HTTP client")?;

    match cli.cmd {
        Command::Countries(args) => cmd_countries(&client, args, &cli.locale),
        Command::Country(args) => cmd_country(client, args, &cli.locale),
        Command::Compare(args) => cmd_compare(client, args, &cli.locale),
        Command::Global => cmd_global(&client, &cli.locale),
    }
}

fn metric_cell(c: &CountryStat, metric: Metric, per_million: bool, locale: &str) -> String {
    let raw = c.value(metric);
    if per_million && !metric.is_per_million() {
        format_per_million(raw.unwrap_or(0.0), c.population)
    } else {
        format_number_locale(raw, locale)
    }
}

fn cmd_countries(client: &Client, args: CountriesArgs, locale: &str) -> Result<()> {
    let all = client
        .fetch_all_countries()
        .context("Failed to fetch countries data")?;
    let matching: Vec<CountryStat> =
        transform::filter_by_search(&all, args.search.as_deref().unwrap_or(""))
            .into_iter()
            .cloned()
            .collect();
    if matching.is_empty() {
        bail!("no countries match");
    }
    let ranked = transform::sort_by_metric(&matching, args.sort, args.asc);

    let heading = if args.per_million {
        format!("{} (per 1M)", args.sort.label())
    } else {
        args.sort.label().to_string()
    };
    println!("{:>4}  {:<32} {:>18}", "#", "Country", heading);
    for (i, c) in ranked.iter().take(args.limit).enumerate() {
        println!(
            "{:>4}  {:<32} {:>18}",
            i + 1,
            c.country,
            metric_cell(c, args.sort, args.per_million, locale)
        );
    }
    eprintln!("Showing {} of {} countries", ranked.len().min(args.limit), ranked.len());
    Ok(())
}

fn cmd_country(client: Client, args: CountryArgs, locale: &str) -> Result<()> {
    let dashboard = Dashboard::with_config(
        client,
        DashboardConfig {
            history_days: args.days,
            ..DashboardConfig::default()
        },
    );
    dashboard.select_country(&args.name);
    let state = dashboard.snapshot();
    if let Some(err) = state.error {
        bail!(err);
    }
    let Some(c) = state.selected_country_data else {
        bail!("no data for {}", args.name);
    };

    let fmt = |v: Option<u64>| {
        if args.per_million {
            format!("{} per 1M", format_per_million(v.unwrap_or(0) as f64, c.population))
        } else {
            format_number_locale(v.map(|n| n as f64), locale)
        }
    };

    println!("{} ({})", c.country, c.continent.as_deref().unwrap_or("unknown continent"));
    println!(
        "  Population: {}",
        format_number_locale(c.population.map(|n| n as f64), locale)
    );
    if let Some(at) = c.updated_at() {
        println!("  Updated:    {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    let rows = [
        ("Cases", c.cases, c.today_cases),
        ("Deaths", c.deaths, c.today_deaths),
        ("Recovered", c.recovered, c.today_recovered),
    ];
    for (label, total, today) in rows {
        println!(
            "  {:<10}  {:>18}  +{} today",
            label,
            fmt(total),
            format_number_locale(today.map(|n| n as f64), locale)
        );
    }
    println!("  {:<10}  {:>18}", "Active", fmt(c.active));
    println!("  {:<10}  {:>18}", "Critical", fmt(c.critical));
    println!(
        "  Fatality rate: {:.2}%",
        calculate_percentage(
            c.deaths.unwrap_or(0) as f64,
            c.cases.map(|n| n as f64)
        )
    );

    let deltas = dashboard.daily_deltas();
    if !deltas.is_empty() {
        println!();
        println!(
            "  {:<10}  {:>12} {:>10} {:>12} {:>12}",
            "Date", "New cases", "Deaths", "Recovered", "Active"
        );
        // The first point holds cumulative totals; only report actual daily figures.
        for p in deltas.iter().skip(1) {
            println!(
                "  {:<10}  {:>12} {:>10} {:>12} {:>12}",
                p.date,
                format_number_locale(Some(p.cases as f64), locale),
                format_number_locale(Some(p.deaths as f64), locale),
                format_number_locale(Some(p.recovered as f64), locale),
                format_number_locale(Some(p.active as f64), locale),
            );
        }
    }
    Ok(())
}

fn bar(row: &ComparisonRow, max: f64, width: usize) -> String {
    if max <= 0.0 {
        return String::new();
    }
    let n = ((row.value / max) * width as f64).round() as usize;
    "#".repeat(n.min(width))
}

fn cmd_compare(client: Client, args: CompareArgs, locale: &str) -> Result<()> {
    let mut config = DashboardConfig {
        refetch_comparison_on_metric_change: false,
        ..DashboardConfig::default()
    };
    if let Some(list) = args.countries.as_deref() {
        config.comparison_countries = parse_list(list);
    }
    if config.comparison_countries.is_empty() {
        bail!("at least one country required");
    }

    let dashboard = Dashboard::with_config(client, config);
    dashboard.set_selected_metric(args.metric);
    if args.per_million {
        dashboard.toggle_per_million();
    }
    if args.table {
        dashboard.set_chart_type(ChartType::Table);
    }
    dashboard.fetch_comparison_data();

    let state = dashboard.snapshot();
    if let Some(err) = state.error {
        bail!(err);
    }
    let rows = dashboard.comparison_rows();
    let suffix = if state.show_per_million { " per 1M" } else { "" };

    println!("Comparing {}{}", state.selected_metric.label(), suffix);
    match state.chart_type {
        ChartType::Bar => {
            let max = rows.first().map(|r| r.value).unwrap_or(0.0);
            for r in &rows {
                println!(
                    "  {:<16} {:<40} {}",
                    r.country,
                    bar(r, max, 40),
                    format_number_locale(Some(r.value), locale)
                );
            }
        }
        ChartType::Table => {
            println!(
                "  {:>3}  {:<16} {:>18} {:>16}",
                "#", "Country", state.selected_metric.key(), "Population"
            );
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "  {:>3}  {:<16} {:>18} {:>16}",
                    i + 1,
                    r.country,
                    format_number_locale(Some(r.value), locale),
                    format_number_locale(r.population.map(|p| p as f64), locale)
                );
            }
        }
    }

    if let Some(s) = dashboard.comparison_summary() {
        println!();
        println!(
            "  Highest: {} ({}{})",
            s.highest.country,
            format_number_locale(Some(s.highest.value), locale),
            suffix
        );
        println!(
            "  Lowest:  {} ({}{})",
            s.lowest.country,
            format_number_locale(Some(s.lowest.value), locale),
            suffix
        );
        println!("  Average: {}{}", format_number_locale(Some(s.mean), locale), suffix);
        println!("  Total:   {}", format_number_locale(Some(s.total), locale));
    }
    Ok(())
}

fn cmd_global(client: &Client, locale: &str) -> Result<()> {
    let g = client
        .fetch_global()
        .context("Failed to fetch global statistics")?;
    let n = |v: Option<u64>| format_number_locale(v.map(|x| x as f64), locale);
    println!("World");
    if let Some(at) = g.updated_at() {
        println!("  Updated:    {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("  Cases:      {} (+{} today)", n(g.cases), n(g.today_cases));
    println!("  Deaths:     {} (+{} today)", n(g.deaths), n(g.today_deaths));
    println!("  Recovered:  {}", n(g.recovered));
    println!("  Active:     {}", n(g.active));
    println!("  Critical:   {}", n(g.critical));
    println!("  Tests:      {}", n(g.tests));
    if let Some(affected) = g.affected_countries {
        println!("  Countries:  {}", affected);
    }
    Ok(())
}
