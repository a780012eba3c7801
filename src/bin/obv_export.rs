use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use obv_terminal::config::AppConfig;
use obv_terminal::export::{self, XLSX_MIME};
use obv_terminal::filter::{NumericRange, Selection};
use obv_terminal::loader::Source;
use obv_terminal::session::Session;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage();
        return Ok(());
    }

    let config = AppConfig::from_env().context("load configuration")?;
    let mut session = Session::new(config);

    let source = if let Some(path) = arg_value(&args, "--input") {
        Source::Upload(PathBuf::from(path))
    } else if let Some(url) = arg_value(&args, "--url") {
        Source::Remote(url)
    } else {
        session.default_source()
    };

    if let Some(raw) = arg_value(&args, "--age") {
        session.filters.age = parse_range(&raw).with_context(|| format!("--age {raw}"))?;
    }
    if let Some(raw) = arg_value(&args, "--usage") {
        session.filters.usage = parse_range(&raw).with_context(|| format!("--usage {raw}"))?;
    }
    session.filters.positions = Selection::new(arg_values(&args, "--position"));
    session.filters.competitions = Selection::new(arg_values(&args, "--competition"));

    session
        .load(source.clone())
        .with_context(|| format!("load {}", source.label()))?;

    // Team picks apply as given; a name the dataset lacks is a typo, not "any team".
    let teams = Selection::new(arg_values(&args, "--team"));
    let unknown = session.unknown_teams(&teams);
    if !unknown.is_empty() {
        return Err(anyhow!("unknown team(s): {}", unknown.join(", ")));
    }
    session.filters.teams = teams;

    let run = session
        .run()
        .ok_or_else(|| anyhow!("no dataset loaded"))?;

    let out_path = arg_value(&args, "--out")
        .map(PathBuf::from)
        .unwrap_or_else(|| session.export_path());
    let report = export::export_to_path(&run.view, &out_path)?;

    println!("OBV export complete");
    println!("Source: {}", source.label());
    println!("Rows: {}/{}", run.filtered_rows, run.loaded_rows);
    println!("Columns: {}", run.view.columns().join(", "));
    if !run.derive.unmapped_competitions.is_empty() {
        println!(
            "Unmapped competitions ({}): {}",
            run.derive.unmapped_competitions.len(),
            run.derive.unmapped_competitions.join(", ")
        );
    }
    println!(
        "Wrote {} ({} bytes, {})",
        report.path.display(),
        report.bytes,
        XLSX_MIME
    );
    Ok(())
}

fn print_usage() {
    println!(
        "usage: obv_export [--input PATH | --url URL] [--age MIN-MAX] [--usage MIN-MAX]\n\
         \x20                 [--position P]... [--competition C]... [--team T]... [--out PATH]"
    );
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value(args: &[String], key: &str) -> Option<String> {
    arg_values(args, key).into_iter().next()
}

/// Every value given for `key`, as `--key=value` or `--key value`.
fn arg_values(args: &[String], key: &str) -> Vec<String> {
    let prefix = format!("{key}=");
    let mut out = Vec::new();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
            continue;
        }
        if arg == key
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            out.push(next.trim().to_string());
        }
    }
    out
}

/// `MIN:MAX`, `MIN,MAX` or `MIN-MAX`. A leading `-` belongs to the min bound.
fn parse_range(raw: &str) -> Result<NumericRange> {
    let raw = raw.trim();
    let (min, max) = raw
        .split_once([':', ','])
        .or_else(|| {
            let (sign, rest) = raw.strip_prefix('-').map_or(("", raw), |r| ("-", r));
            rest.split_once('-')
                .map(|(min, max)| (&raw[..sign.len() + min.len()], max))
        })
        .ok_or_else(|| anyhow!("expected MIN-MAX"))?;
    let min = min.trim().parse::<f64>().context("range min")?;
    let max = max.trim().parse::<f64>().context("range max")?;
    if min > max {
        return Err(anyhow!("range min {min} is above max {max}"));
    }
    Ok(NumericRange::new(min, max))
}
