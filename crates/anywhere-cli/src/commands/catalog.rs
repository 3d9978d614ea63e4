use crate::context::CliContext;
use crate::output::print_json;
use crate::{AddGameArgs, GamesArgs, GamesCmd};
use anyhow::Result;
use anywhere_core::{NewGame, PORTALS};
use serde_json::json;
use std::process::ExitCode;

pub(crate) fn run_games(ctx: &CliContext, args: &GamesArgs) -> Result<ExitCode> {
    match &args.command {
        None => list_games(ctx, args.category.as_deref()),
        Some(GamesCmd::Init) => {
            let message = ctx.backend()?.init_default_games()?;
            print_message(ctx, &message)
        }
        Some(GamesCmd::Add(add)) => add_game(ctx, add),
        Some(GamesCmd::Remove { id }) => {
            let message = ctx.backend()?.delete_game(id)?;
            print_message(ctx, &message)
        }
    }
}

fn list_games(ctx: &CliContext, category: Option<&str>) -> Result<ExitCode> {
    let games = ctx.backend()?.games(category)?;
    if ctx.json {
        print_json(&games)?;
    } else if games.is_empty() {
        println!("no games");
    } else {
        for game in games {
            println!("{} [{}] {}", game.title, game.category, game.game_url);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn add_game(ctx: &CliContext, args: &AddGameArgs) -> Result<ExitCode> {
    let game = ctx.backend()?.add_game(&NewGame {
        title: args.title.clone(),
        description: args.description.clone(),
        category: args.category.clone(),
        game_url: args.url.clone(),
        thumbnail: args.thumbnail.clone(),
    })?;
    if ctx.json {
        print_json(&game)?;
    } else {
        println!("added {} ({})", game.title, game.id);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_message(ctx: &CliContext, message: &str) -> Result<ExitCode> {
    if ctx.json {
        print_json(&json!({ "message": message }))?;
    } else {
        println!("{message}");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn run_categories(ctx: &CliContext) -> Result<ExitCode> {
    let categories = ctx.backend()?.categories()?;
    if ctx.json {
        print_json(&categories)?;
    } else {
        for entry in categories {
            println!("{} ({})", entry.category, entry.count);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Portal pages are served by the backend as-is; only their URLs are shown.
pub(crate) fn run_portals(ctx: &CliContext) -> Result<ExitCode> {
    let backend = ctx.backend()?;
    let rows: Vec<(&str, String)> = PORTALS
        .iter()
        .map(|(name, path)| (*name, backend.portal_url(path)))
        .collect();
    if ctx.json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(name, url)| json!({ "name": name, "url": url }))
            .collect();
        print_json(&payload)?;
    } else {
        for (name, url) in rows {
            println!("{name:<8} {url}");
        }
    }
    Ok(ExitCode::SUCCESS)
}
