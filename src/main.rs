mod config;
mod descriptor;
mod error;
mod ir;
mod opcodes;
mod params;
mod replacer;
mod report;
mod rules;
mod scan;
mod visitor;
mod weave;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::report::{build_invocation, build_sarif, rewrite_results};
use crate::scan::scan_inputs;
use crate::weave::{resolve_parameters, weave_classes};

/// CLI arguments for callweave execution.
#[derive(Parser, Debug)]
#[command(
    name = "callweave",
    about = "Call-site weaving for JVM method instruction streams.",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[arg(long, global = true)]
    quiet: bool,
    #[arg(long, global = true)]
    timing: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite call sites matched by the configured aspects and report them as SARIF.
    Weave(WeaveArgs),
    /// Report parameter names recovered from local variable debug records.
    Params(ParamsArgs),
}

#[derive(Args, Debug)]
struct WeaveArgs {
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    #[arg(long, value_name = "PATH")]
    config: PathBuf,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Directory receiving one JSON listing per generated class.
    #[arg(long, value_name = "DIR")]
    emit_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ParamsArgs {
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    #[arg(long)]
    require_debug_info: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);
    run(cli)
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.quiet {
        "off"
    } else if cli.timing {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let started_at = Instant::now();
    match cli.command {
        Command::Weave(args) => run_weave(args)?,
        Command::Params(args) => run_params(args)?,
    }
    if cli.timing && !cli.quiet {
        tracing::info!(total_ms = started_at.elapsed().as_millis() as u64, "timing");
    }
    Ok(())
}

fn run_weave(args: WeaveArgs) -> Result<()> {
    ensure_exists(&args.input, "input")?;
    ensure_exists(&args.config, "config")?;

    let config = load_config(&args.config)?;
    let rules = config.rule_set();
    let scan = scan_inputs(&args.input)?;
    let woven = weave_classes(&scan.classes, &config, &rules)?;
    tracing::info!(
        classes = scan.classes.len(),
        woven = woven.len(),
        aspects = rules.len(),
        "weave finished"
    );

    if let Some(dir) = &args.emit_dir {
        emit_listings(dir, &woven)?;
    }

    let results = rewrite_results(&woven);
    let sarif = build_sarif(scan.artifacts, build_invocation(), results);
    let mut writer = output_writer(args.output.as_deref())?;
    serde_json::to_writer_pretty(&mut writer, &sarif)
        .context("failed to serialize SARIF output")?;
    writer
        .write_all(b"\n")
        .context("failed to write SARIF output")?;
    Ok(())
}

fn run_params(args: ParamsArgs) -> Result<()> {
    ensure_exists(&args.input, "input")?;

    let scan = scan_inputs(&args.input)?;
    let reports = resolve_parameters(&scan.classes, args.require_debug_info)?;

    let mut writer = output_writer(args.output.as_deref())?;
    serde_json::to_writer_pretty(&mut writer, &reports)
        .context("failed to serialize parameter report")?;
    writer
        .write_all(b"\n")
        .context("failed to write parameter report")?;
    Ok(())
}

fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("{what} not found: {}", path.display());
    }
    Ok(())
}

fn emit_listings(dir: &Path, woven: &[weave::WovenClass]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for class in woven {
        let path = dir.join(listing_file_name(&class.class.name));
        let file =
            File::create(&path).with_context(|| format!("failed to open {}", path.display()))?;
        serde_json::to_writer_pretty(file, &class.class)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn listing_file_name(class_name: &str) -> String {
    format!("{}.json", class_name.replace('/', "."))
}

fn output_writer(output: Option<&Path>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) if path == Path::new("-") => Ok(Box::new(io::stdout())),
        Some(path) => Ok(Box::new(
            File::create(path).with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Ok(Box::new(io::stdout())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let input = dir.join("App.json");
        fs::write(
            &input,
            r#"{
                "name": "com/example/App",
                "super_name": "java/lang/Object",
                "methods": [
                    {"name": "<init>", "descriptor": "()V", "events": [
                        {"op": "var", "opcode": 25, "index": 0},
                        {"op": "invoke", "kind": "special", "owner": "java/lang/Object", "name": "<init>", "descriptor": "()V"},
                        {"op": "insn", "opcode": 177},
                        {"op": "end"}
                    ]},
                    {"name": "now", "descriptor": "()J", "events": [
                        {"op": "line_number", "line": 7, "start": 0},
                        {"op": "invoke", "kind": "static", "owner": "java/lang/System", "name": "currentTimeMillis", "descriptor": "()J"},
                        {"op": "insn", "opcode": 173},
                        {"op": "end"}
                    ]}
                ]
            }"#,
        )
        .expect("write listing");
        let config = dir.join("weave.json");
        fs::write(
            &config,
            r#"{"aspects": [{
                "match": {"owner": "java/lang/System", "name": "currentTimeMillis"},
                "replace": {"owner": "com/example/Clock", "name": "now", "pass_method_name": true}
            }]}"#,
        )
        .expect("write config");
        (input, config)
    }

    #[test]
    fn cli_parses_weave_subcommand() {
        let cli = Cli::try_parse_from([
            "callweave",
            "weave",
            "--input",
            "in.json",
            "--config",
            "weave.json",
            "--emit-dir",
            "out",
            "--quiet",
        ])
        .expect("parse cli");

        assert!(cli.quiet);
        match cli.command {
            Command::Weave(args) => {
                assert_eq!(args.input, PathBuf::from("in.json"));
                assert_eq!(args.emit_dir, Some(PathBuf::from("out")));
            }
            Command::Params(_) => panic!("expected weave"),
        }
    }

    #[test]
    fn weave_writes_sarif_and_generated_listing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (input, config) = write_fixture(dir.path());
        let output = dir.path().join("out.sarif");
        let emit_dir = dir.path().join("woven");

        run_weave(WeaveArgs {
            input,
            config,
            output: Some(output.clone()),
            emit_dir: Some(emit_dir.clone()),
        })
        .expect("weave");

        let sarif: serde_json::Value =
            serde_json::from_slice(&fs::read(&output).expect("read sarif")).expect("parse sarif");
        let results = sarif["runs"][0]["results"].as_array().expect("results");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["ruleId"], "SUPER_CONSTRUCTOR_REDIRECTED");
        assert_eq!(results[1]["ruleId"], "INVOKE_REPLACED");
        assert_eq!(sarif["runs"][0]["artifacts"].as_array().expect("artifacts").len(), 1);

        let listing: ir::Class = serde_json::from_slice(
            &fs::read(emit_dir.join("com.example.App$$Woven.json")).expect("read listing"),
        )
        .expect("parse listing");
        assert_eq!(listing.super_name.as_deref(), Some("com/example/App"));
        assert_eq!(
            listing.methods[1].events,
            vec![
                ir::Event::Ldc {
                    constant: ir::Constant::String("now".to_string())
                },
                ir::Event::Invoke {
                    kind: ir::CallKind::Static,
                    owner: "com/example/Clock".to_string(),
                    name: "now".to_string(),
                    descriptor: "(Ljava/lang/String;)J".to_string(),
                },
                ir::Event::Insn { opcode: 173 },
                ir::Event::End,
            ]
        );
    }

    #[test]
    fn weave_rejects_missing_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (input, _) = write_fixture(dir.path());

        let err = run_weave(WeaveArgs {
            input,
            config: dir.path().join("missing.json"),
            output: Some(dir.path().join("out.sarif")),
            emit_dir: None,
        })
        .expect_err("missing config");

        assert!(err.to_string().starts_with("config not found"));
    }

    #[test]
    fn params_reports_each_method() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (input, _) = write_fixture(dir.path());
        let output = dir.path().join("params.json");

        run_params(ParamsArgs {
            input: input.clone(),
            output: Some(output.clone()),
            require_debug_info: false,
        })
        .expect("params");

        let report: serde_json::Value =
            serde_json::from_slice(&fs::read(&output).expect("read report")).expect("parse report");
        assert_eq!(report.as_array().expect("report array").len(), 2);
        assert_eq!(report[0]["debug_info_present"], true);
        assert_eq!(report[1]["method"], "now");

        let strict = run_params(ParamsArgs {
            input,
            output: Some(output),
            require_debug_info: true,
        });
        assert!(strict.is_ok());
    }

    #[test]
    fn listing_file_name_uses_dotted_class_name() {
        assert_eq!(listing_file_name("com/example/App$$Woven"), "com.example.App$$Woven.json");
    }
}
