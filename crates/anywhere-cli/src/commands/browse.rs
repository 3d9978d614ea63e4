use crate::DispatchArgs;
use crate::context::CliContext;
use anyhow::Result;
use anywhere_ui::{BrowserShell, run_browser};
use std::io::IsTerminal;
use std::process::ExitCode;

pub(crate) fn run_browse(ctx: &CliContext, args: &DispatchArgs) -> Result<ExitCode> {
    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        anyhow::bail!("browse needs an interactive terminal; try `anywhere open <input>`");
    }
    let mut session = ctx.session(args);
    let mut driver = ctx.driver(false)?;
    let mut shell = BrowserShell::new(&ctx.cfg.ui, ctx.cfg.suggestions.max_visible);
    run_browser(&mut session, &mut driver, &mut shell)?;
    if shell.stale_dropped > 0
        && let Some(observer) = driver.observer()
    {
        observer.verbose_log(&format!(
            "dropped {} superseded responses",
            shell.stale_dropped
        ));
    }
    Ok(ExitCode::SUCCESS)
}
