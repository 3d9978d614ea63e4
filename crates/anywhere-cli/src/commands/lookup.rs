use crate::context::CliContext;
use crate::output::print_json;
use crate::{ClassifyArgs, DispatchArgs, OpenArgs, SuggestArgs};
use anyhow::{Result, bail};
use anywhere_core::ProxyResult;
use anywhere_session::{Applied, resolve_route, wants_lookup};
use serde_json::json;
use std::process::ExitCode;
use std::time::Instant;

pub(crate) fn run_classify(ctx: &CliContext, args: &ClassifyArgs) -> Result<ExitCode> {
    let settings = ctx.settings(&args.dispatch);
    let (classification, endpoint) = resolve_route(&args.text, settings.strategy, settings.mode);
    if ctx.json {
        print_json(&json!({
            "input": args.text,
            "classification": classification,
            "endpoint": endpoint.path(),
            "suggestions": ctx.cfg.suggestions.enabled && wants_lookup(&args.text),
        }))?;
    } else {
        println!("{classification} -> {endpoint}");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn run_open(ctx: &CliContext, args: &OpenArgs) -> Result<ExitCode> {
    let mut session = ctx.session(&args.dispatch);
    session.edit(args.input.clone(), Instant::now());
    let Some(effect) = session.submit() else {
        bail!("nothing to open: input is empty");
    };

    let mut driver = ctx.driver(true)?;
    driver.run(effect);
    loop {
        match driver.wait(&mut session, ctx.wait_limit()) {
            Some(Applied::Content | Applied::Error) => break,
            Some(_) => {}
            None => bail!(
                "no answer from {} within {}s",
                ctx.cfg.backend.base_url,
                ctx.wait_limit().as_secs()
            ),
        }
    }

    if ctx.json {
        print_json(&session.view())?;
    }
    match session.result() {
        ProxyResult::Content { html, .. } => {
            if !ctx.json {
                println!("{}", html.trim_end_matches('\n'));
            }
            Ok(ExitCode::SUCCESS)
        }
        ProxyResult::Error { message } => {
            if !ctx.json {
                eprintln!("error: {message}");
            }
            Ok(ExitCode::FAILURE)
        }
        other => bail!("request did not settle: {other:?}"),
    }
}

pub(crate) fn run_suggest(ctx: &CliContext, args: &SuggestArgs) -> Result<ExitCode> {
    let mut session = ctx.session(&DispatchArgs::default());
    session.edit(args.text.clone(), Instant::now());
    if let Some(effect) = session.flush_suggestions() {
        let mut driver = ctx.driver(true)?;
        driver.run(effect);
        if driver.wait(&mut session, ctx.wait_limit()).is_none()
            && let Some(observer) = driver.observer()
        {
            observer.verbose_log(&format!(
                "no suggestions for '{}' within {}s",
                args.text,
                ctx.wait_limit().as_secs()
            ));
        }
    }

    if ctx.json {
        print_json(&json!({
            "query": args.text,
            "classification": session.classification(),
            "suggestions": session.suggestions(),
        }))?;
    } else {
        for suggestion in session.suggestions() {
            println!("{suggestion}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
