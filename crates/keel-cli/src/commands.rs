use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use keel_cmp::{compare, FormatOptions};
use keel_event::Rule;
use keel_plan::{ApplyAction, ClusterConfig, Plan, PlanConfig, Planner, ScaledInstance, Verdict};
use tracing::debug;

use crate::cli::*;
use crate::ui::{self, Block};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let Cli { command, format, .. } = cli;
    match command {
        Command::Diff(args) => cmd_diff(args, format),
        Command::Plan(args) => cmd_plan(args, format),
        Command::Rules(args) => cmd_rules(args, format),
    }
}

fn load_snapshot(path: &Path) -> anyhow::Result<ClusterConfig> {
    ClusterConfig::load(path).with_context(|| format!("cannot load snapshot {}", path.display()))
}

fn load_plan_config(path: Option<&Path>) -> anyhow::Result<PlanConfig> {
    match path {
        Some(path) => PlanConfig::load(path)
            .with_context(|| format!("cannot load plan file {}", path.display())),
        None => Ok(PlanConfig::default()),
    }
}

fn cmd_diff(args: DiffArgs, format: OutputFormat) -> anyhow::Result<()> {
    let before = load_snapshot(&args.before)?;
    let after = load_snapshot(&args.after)?;

    let mut options = PlanConfig::default().compare;
    options.respect_slice_order = args.respect_order;
    let res = compare(&before, &after, &options)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&res.changes())?);
        return Ok(());
    }

    if !res.has_changes() {
        println!("No changes detected.");
        return Ok(());
    }

    let fmt = FormatOptions {
        show_diff_only: !args.all,
        show_color: !args.no_color,
        show_change_type_prefix: !args.no_prefix,
    };
    println!("{}", res.to_yaml(&fmt));
    Ok(())
}

fn cmd_plan(args: PlanArgs, format: OutputFormat) -> anyhow::Result<()> {
    let action: ApplyAction = args.action.parse()?;
    let mut config = load_plan_config(args.config.as_deref())?;
    if args.no_color {
        config.format.show_color = false;
    }

    let applied = load_snapshot(&args.applied)?;
    let new = load_snapshot(&args.new)?;

    let planner = Planner::new(action, config);
    let plan = planner.plan(&applied, &new)?;
    debug!(verdict = ?plan.verdict(), "plan ready");

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&plan_json(&plan))?);
        if plan.verdict() == Verdict::Blocked {
            bail!("Configuration file contains errors.");
        }
        return Ok(());
    }

    if !plan.has_changes() {
        println!("No changes detected.");
        return Ok(());
    }

    let color = planner.config().format.show_color;
    println!("Following changes have been detected:\n");
    println!("{}", plan.comparison().to_yaml(&planner.config().format));

    let blocking = plan.blocking();
    if !blocking.is_empty() {
        for finding in &blocking {
            eprintln!("{}", Block::from(finding).render(color));
        }
        bail!("Configuration file contains errors.");
    }

    let warnings = plan.warnings();
    for finding in &warnings {
        eprintln!("{}", Block::from(finding).render(color));
    }
    if !warnings.is_empty() {
        println!("Above warnings indicate potentially dangerous actions.");
    }

    if !args.yes {
        ui::confirm()?;
    }

    print_instances("Nodes to remove:", plan.removed_instances());
    print_instances("Nodes to add:", plan.new_instances());
    println!("{} Plan accepted ({} action).", "✓".green().bold(), action.to_string().cyan());
    Ok(())
}

fn plan_json(plan: &Plan) -> serde_json::Value {
    serde_json::json!({
        "action": plan.action(),
        "verdict": plan.verdict(),
        "changes": plan.comparison().distinct_changes(),
        "events": plan.events(),
        "blocking": plan.blocking(),
        "warnings": plan.warnings(),
        "removed": plan.removed_instances(),
        "added": plan.new_instances(),
    })
}

fn print_instances(title: &str, instances: &[ScaledInstance]) {
    if instances.is_empty() {
        return;
    }
    println!("{}", title.bold());
    for scaled in instances {
        println!("  {} {} ({})", "-".dimmed(), scaled.instance.id.yellow(), scaled.role);
    }
}

fn cmd_rules(args: RulesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let action: ApplyAction = args.action.parse()?;
    let config = load_plan_config(args.config.as_deref())?;
    let rules = config.rules_for(action);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }

    println!("Policy of the {} action:", action.to_string().cyan().bold());
    for rule in &rules {
        println!("{}", describe_rule(rule));
    }
    Ok(())
}

fn describe_rule(rule: &Rule) -> String {
    let tier = format!("{:<6}", rule.rule_type.to_string());
    let tier = match rule.rule_type.tier_name() {
        "Error" => tier.red(),
        "Warn" => tier.yellow(),
        "Allow" => tier.green(),
        _ => tier.dimmed(),
    };

    let mut line = format!("  {tier} {:<7} {}", rule.match_change_type.as_str(), rule.match_path);
    if let Some(action) = rule.action {
        line.push_str(&format!(" [{action}]"));
    }
    for message in rule.message.lines() {
        line.push_str(&format!("\n           {}", message.dimmed()));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const APPLIED: &str = r#"{
        "cluster": {
            "network": {"mode": "nat", "cidr": "192.168.113.0/24"},
            "nodes": {"worker": {"instances": [{"id": "1", "cpu": 2}, {"id": "2", "cpu": 2}]}}
        },
        "kubernetes": {"version": "v1.27.5"}
    }"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn plan_args(applied: PathBuf, new: PathBuf, action: &str) -> PlanArgs {
        PlanArgs {
            applied,
            new,
            action: action.into(),
            config: None,
            yes: true,
            no_color: true,
        }
    }

    #[test]
    fn plan_passes_allowed_scale() {
        let dir = tempfile::tempdir().unwrap();
        let applied = write(dir.path(), "applied.json", APPLIED);
        let new = write(
            dir.path(),
            "new.json",
            &APPLIED.replace(r#"{"id": "2", "cpu": 2}"#, r#"{"id": "3", "cpu": 2}"#),
        );

        cmd_plan(plan_args(applied, new, "scale"), OutputFormat::Text).unwrap();
    }

    #[test]
    fn plan_fails_on_blocked_change() {
        let dir = tempfile::tempdir().unwrap();
        let applied = write(dir.path(), "applied.json", APPLIED);
        let new = write(dir.path(), "new.json", &APPLIED.replace("nat", "bridge"));

        let err = cmd_plan(plan_args(applied.clone(), new.clone(), "create"), OutputFormat::Text)
            .unwrap_err();
        assert_eq!(err.to_string(), "Configuration file contains errors.");

        let err = cmd_plan(plan_args(applied, new, "create"), OutputFormat::Json).unwrap_err();
        assert_eq!(err.to_string(), "Configuration file contains errors.");
    }

    #[test]
    fn plan_rejects_unknown_action() {
        let dir = tempfile::tempdir().unwrap();
        let applied = write(dir.path(), "applied.json", APPLIED);

        let err = cmd_plan(plan_args(applied.clone(), applied, "destroy"), OutputFormat::Text)
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown cluster action: destroy");
    }

    #[test]
    fn missing_snapshot_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let err = load_snapshot(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn diff_accepts_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let before = write(dir.path(), "before.json", APPLIED);
        let after = write(
            dir.path(),
            "after.toml",
            "[kubernetes]\nversion = \"v1.28.0\"\n",
        );

        let args = DiffArgs {
            before,
            after,
            all: false,
            no_color: true,
            no_prefix: false,
            respect_order: false,
        };
        cmd_diff(args, OutputFormat::Json).unwrap();
    }

    #[test]
    fn describes_rules() {
        colored::control::set_override(false);
        let rule = ApplyAction::Scale.rules().remove(0);
        assert_eq!(
            describe_rule(&rule),
            "  Allow  delete  cluster.nodes.worker.instances.@ [scale_down]"
        );
    }
}
