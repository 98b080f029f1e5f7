use crate::args::SeedUsersArgs;
use crate::config;
use crate::error::CliError;
use crate::migrate::map_config_error;
use crate::output;
use crate::style::Style;
use crate::ui::Ui;
use std::io::IsTerminal;
use strata_provision::{
    apply_plan, default_roster, plan_accounts, AccountOutcome, AccountState, AuthAdmin,
    PlannedAccount, ProvisionReport, SupabaseAdminClient, TestAccount, DEFAULT_PASSWORD,
};

pub async fn run(args: &SeedUsersArgs) -> Result<(), CliError> {
    let config = config::supabase_config(args).map_err(map_config_error)?;
    let client = SupabaseAdminClient::new(config).map_err(|e| {
        CliError::provisioning_failed("Could not build the auth API client").with_reason(e.to_string())
    })?;

    let ui = Ui::new(Style::detect());
    for line in ui.header("strata seed-users") {
        output::line(line);
    }

    let assume_yes = args.yes;
    execute(&client, &default_roster(), &ui, |pending| {
        if assume_yes {
            return Ok(true);
        }
        confirm(pending)
    })
    .await
}

/// Plans the roster, asks `confirm` when something would be created, then
/// provisions. `confirm` receives the number of accounts that need work.
pub async fn execute<F>(
    client: &dyn AuthAdmin,
    roster: &[TestAccount],
    ui: &Ui,
    confirm: F,
) -> Result<(), CliError>
where
    F: FnOnce(usize) -> Result<bool, CliError>,
{
    let plan = plan_accounts(client, roster).await;
    for line in plan_lines(ui, &plan) {
        output::line(line);
    }

    let pending = plan.iter().filter(|p| p.needs_work()).count();
    if pending == 0 {
        output::blank();
        output::line(ui.ok_line("All test accounts already exist"));
        return Ok(());
    }

    if !confirm(pending)? {
        output::line(ui.info_line("Aborted; nothing was created"));
        return Ok(());
    }

    let report = apply_plan(client, &plan, DEFAULT_PASSWORD).await;
    output::blank();
    for line in report_lines(ui, &report) {
        output::line(line);
    }

    check(&report)
}

fn confirm(pending: usize) -> Result<bool, CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::configuration("Confirmation required")
            .with_reason("stdin is not a terminal")
            .with_action("Pass --yes to provision without a prompt."));
    }

    dialoguer::Confirm::new()
        .with_prompt(format!("Provision {pending} test account(s)?"))
        .default(false)
        .interact()
        .map_err(|e| CliError::configuration("Confirmation prompt failed").with_reason(e.to_string()))
}

pub fn plan_lines(ui: &Ui, plan: &[PlannedAccount]) -> Vec<String> {
    let style = ui.style();
    plan.iter()
        .map(|p| {
            let label = format!("{} ({})", p.account.email, p.account.role);
            match &p.state {
                Ok(AccountState::Missing) => ui.item(&style.arrow(), &label, "will create"),
                Ok(AccountState::AuthOnly { .. }) => {
                    ui.item(&style.arrow(), &label, "will add profile")
                }
                Ok(AccountState::Provisioned { .. }) => ui.item(&style.skip(), &label, "exists"),
                Err(e) => ui.item(&style.fail(), &label, &format!("lookup failed: {e}")),
            }
        })
        .collect()
}

pub fn report_lines(ui: &Ui, report: &ProvisionReport) -> Vec<String> {
    let style = ui.style();
    let mut lines: Vec<String> = report
        .outcomes
        .iter()
        .map(|(account, outcome)| match outcome {
            AccountOutcome::Created { user_id } => {
                ui.item(&style.ok(), &account.email, &format!("created ({user_id})"))
            }
            AccountOutcome::ProfileMirrored { user_id } => {
                ui.item(&style.ok(), &account.email, &format!("profile added ({user_id})"))
            }
            AccountOutcome::AlreadyProvisioned { .. } => {
                ui.item(&style.skip(), &account.email, "already provisioned")
            }
            AccountOutcome::Failed { stage, error } => {
                ui.item(&style.fail(), &account.email, &format!("{stage} failed: {error}"))
            }
        })
        .collect();

    lines.push(String::new());
    lines.push(ui.kv("created", &report.created().to_string()));
    lines.push(ui.kv("profiles added", &report.mirrored().to_string()));
    lines.push(ui.kv("already existed", &report.already_provisioned().to_string()));
    lines.push(ui.kv("failed", &report.failed().to_string()));
    lines.push(ui.kv("default password", DEFAULT_PASSWORD));
    lines
}

fn check(report: &ProvisionReport) -> Result<(), CliError> {
    let failed = report.failed();
    if failed == 0 {
        return Ok(());
    }

    let first = report.outcomes.iter().find_map(|(account, outcome)| match outcome {
        AccountOutcome::Failed { stage, error } => Some(format!("{}: {stage} failed: {error}", account.email)),
        _ => None,
    });

    let mut err = CliError::provisioning_failed(format!("{failed} test account(s) could not be provisioned"))
        .with_meaning("The other accounts were processed. Re-running only touches what is still missing.");
    if let Some(reason) = first {
        err = err.with_reason(reason);
    }
    Err(err)
}
