//! Command execution: dispatch from parsed arguments through [`App`].
//!
//! Each mutating command runs the store operation, saves the snapshot, then
//! prints. Queries never save.

use std::collections::{HashMap, HashSet};

use serde_json::json;

use crate::app::App;
use crate::commands::init;
use crate::domain::{
    DelayEvent, ItemId, NewItem, NewStream, PermissionGrant, PrincipalId, StreamId, Workstream,
};
use crate::error::{Error, Result};
use crate::impact::ImpactAnalyzer;
use crate::output::{
    self, print_chain, print_impact, print_item, print_items, print_json, print_message,
    print_rollup, print_stream, print_stream_tree, OutputConfig, OutputMode, StreamTreeNode,
};
use crate::permissions::PermissionResolver;
use crate::rollup::RollupAggregator;

use super::args::*;
use super::{Cli, Commands, ItemCommand, StreamCommand};

/// Execute a parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };

    let Some(command) = cli.command else {
        print_message("No command provided. Run 'trellis --help' for usage.")?;
        return Ok(());
    };

    match command {
        Commands::Init(args) => execute_init(args, mode).await,
        Commands::Stream { command } => {
            let mut app = open_app().await?;
            match command {
                StreamCommand::Add(args) => execute_stream_add(&mut app, args, mode).await,
                StreamCommand::Move(args) => execute_stream_move(&mut app, args, mode).await,
                StreamCommand::Rm(args) => execute_stream_rm(&mut app, args, mode).await,
                StreamCommand::Tree(args) => execute_stream_tree(&app, args, mode).await,
            }
        }
        Commands::Item { command } => {
            let mut app = open_app().await?;
            match command {
                ItemCommand::Add(args) => execute_item_add(&mut app, args, mode).await,
                ItemCommand::Status(args) => execute_item_status(&mut app, args, mode).await,
                ItemCommand::Reschedule(args) => {
                    execute_item_reschedule(&mut app, args, mode).await
                }
                ItemCommand::Rm(args) => execute_item_rm(&mut app, args, mode).await,
                ItemCommand::List(args) => execute_item_list(&app, args, mode).await,
            }
        }
        Commands::Link(args) => {
            let mut app = open_app().await?;
            execute_link(&mut app, args, mode).await
        }
        Commands::Unlink(args) => {
            let mut app = open_app().await?;
            execute_unlink(&mut app, args, mode).await
        }
        Commands::Grant(args) => {
            let mut app = open_app().await?;
            execute_grant(&mut app, args, mode).await
        }
        Commands::Revoke(args) => {
            let mut app = open_app().await?;
            execute_revoke(&mut app, args, mode).await
        }
        Commands::Access(args) => execute_access(&open_app().await?, args, mode).await,
        Commands::Chain(args) => execute_chain(&open_app().await?, args, mode).await,
        Commands::Ready => execute_ready(&open_app().await?, mode).await,
        Commands::Impact(args) => execute_impact(&open_app().await?, args, mode).await,
        Commands::Rollup(args) => execute_rollup(&open_app().await?, args, mode).await,
    }
}

async fn open_app() -> Result<App> {
    let cwd = std::env::current_dir()?;
    App::from_directory(&cwd).await
}

// ========== init ==========

async fn execute_init(args: InitArgs, mode: OutputMode) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let result = init::init(&cwd, args.max_depth).await?;

    match mode {
        OutputMode::Json => print_json(&json!({
            "trellis_dir": result.trellis_dir,
            "max_depth": result.max_depth,
        }))?,
        OutputMode::Text => {
            if !args.quiet {
                let config = OutputConfig::from_env();
                print_message(&output::success(
                    &format!(
                        "Initialized empty trellis portfolio in {} (max depth {})",
                        result.trellis_dir.display(),
                        result.max_depth
                    ),
                    &config,
                ))?;
            }
        }
    }
    Ok(())
}

// ========== stream ==========

async fn execute_stream_add(app: &mut App, args: StreamAddArgs, mode: OutputMode) -> Result<()> {
    let stream = app
        .create_stream(NewStream {
            name: args.name,
            parent: args.parent.map(StreamId::new),
            owner: PrincipalId::new(args.owner),
        })
        .await?;
    app.save().await?;
    print_stream(&stream, mode)?;
    Ok(())
}

async fn execute_stream_move(app: &mut App, args: StreamMoveArgs, mode: OutputMode) -> Result<()> {
    let moved = app
        .move_stream(StreamId::new(args.stream), args.parent.map(StreamId::new))
        .await?;
    app.save().await?;
    print_stream(&moved, mode)?;
    Ok(())
}

async fn execute_stream_rm(app: &mut App, args: StreamRmArgs, mode: OutputMode) -> Result<()> {
    let id = StreamId::new(args.stream);
    app.delete_stream(id).await?;
    app.save().await?;
    match mode {
        OutputMode::Json => print_json(&json!({ "deleted": id }))?,
        OutputMode::Text => print_message(&format!("Deleted workstream {id}"))?,
    }
    Ok(())
}

async fn execute_stream_tree(app: &App, args: StreamTreeArgs, mode: OutputMode) -> Result<()> {
    let streams = app.store().all_streams().await?;

    let ids: Vec<StreamId> = streams.iter().map(|s| s.id).collect();
    let counts = app.store().status_counts(&ids).await?;
    let item_count = |id: StreamId| -> usize {
        counts
            .get(&id)
            .map(|table| table.values().sum::<u64>() as usize)
            .unwrap_or(0)
    };

    let mut children_of: HashMap<Option<StreamId>, Vec<&Workstream>> = HashMap::new();
    for stream in &streams {
        children_of.entry(stream.parent).or_default().push(stream);
    }

    fn build(
        stream: &Workstream,
        children_of: &HashMap<Option<StreamId>, Vec<&Workstream>>,
        item_count: &dyn Fn(StreamId) -> usize,
    ) -> StreamTreeNode {
        let children = children_of
            .get(&Some(stream.id))
            .map(|kids| {
                kids.iter()
                    .map(|k| build(k, children_of, item_count))
                    .collect()
            })
            .unwrap_or_default();
        StreamTreeNode {
            id: stream.id.0,
            name: stream.name.clone(),
            item_count: item_count(stream.id),
            children,
        }
    }

    let roots: Vec<StreamTreeNode> = match args.root {
        Some(root_id) => {
            let id = StreamId::new(root_id);
            let root = streams
                .iter()
                .find(|s| s.id == id)
                .ok_or(Error::StreamNotFound(id))?;
            vec![build(root, &children_of, &item_count)]
        }
        None => children_of
            .get(&None)
            .map(|tops| {
                tops.iter()
                    .map(|s| build(s, &children_of, &item_count))
                    .collect()
            })
            .unwrap_or_default(),
    };

    if roots.is_empty() && mode == OutputMode::Text {
        return print_message("No workstreams yet. Create one with 'trellis stream add'.")
            .map_err(Into::into);
    }
    print_stream_tree(&roots, mode)?;
    Ok(())
}

// ========== item ==========

async fn execute_item_add(app: &mut App, args: ItemAddArgs, mode: OutputMode) -> Result<()> {
    let item = app
        .create_item(NewItem {
            name: args.name,
            stream: StreamId::new(args.stream),
            status: args.status.into(),
            target_date: args.date,
            owner: args.owner.map(PrincipalId::new),
        })
        .await?;
    app.save().await?;
    print_item(&item, mode)?;
    Ok(())
}

async fn execute_item_status(app: &mut App, args: ItemStatusArgs, mode: OutputMode) -> Result<()> {
    let item = app
        .set_status(ItemId::new(args.item), args.status.into())
        .await?;
    app.save().await?;
    print_item(&item, mode)?;
    Ok(())
}

async fn execute_item_reschedule(
    app: &mut App,
    args: ItemRescheduleArgs,
    mode: OutputMode,
) -> Result<()> {
    let item = app.reschedule_item(ItemId::new(args.item), args.date).await?;
    app.save().await?;
    print_item(&item, mode)?;
    Ok(())
}

async fn execute_item_rm(app: &mut App, args: ItemRmArgs, mode: OutputMode) -> Result<()> {
    let id = ItemId::new(args.item);
    app.delete_item(id).await?;
    app.save().await?;
    match mode {
        OutputMode::Json => print_json(&json!({ "deleted": id }))?,
        OutputMode::Text => print_message(&format!("Deleted work item {id}"))?,
    }
    Ok(())
}

async fn execute_item_list(app: &App, args: ItemListArgs, mode: OutputMode) -> Result<()> {
    let items = app.store().items_in(StreamId::new(args.stream)).await?;
    print_items(&items, mode)?;
    Ok(())
}

// ========== graph ==========

async fn execute_link(app: &mut App, args: LinkArgs, mode: OutputMode) -> Result<()> {
    let edge = app
        .link(
            ItemId::new(args.prerequisite),
            ItemId::new(args.dependent),
            args.kind.into(),
        )
        .await?;
    app.save().await?;
    match mode {
        OutputMode::Json => print_json(&edge)?,
        OutputMode::Text => print_message(&format!(
            "Linked {} {} {}",
            edge.prerequisite, edge.kind, edge.dependent
        ))?,
    }
    Ok(())
}

async fn execute_unlink(app: &mut App, args: UnlinkArgs, mode: OutputMode) -> Result<()> {
    let prerequisite = ItemId::new(args.prerequisite);
    let dependent = ItemId::new(args.dependent);
    app.unlink(prerequisite, dependent).await?;
    app.save().await?;
    match mode {
        OutputMode::Json => {
            print_json(&json!({ "unlinked": { "prerequisite": prerequisite, "dependent": dependent } }))?
        }
        OutputMode::Text => print_message(&format!("Unlinked {prerequisite} -> {dependent}"))?,
    }
    Ok(())
}

// ========== permissions ==========

async fn execute_grant(app: &mut App, args: GrantArgs, mode: OutputMode) -> Result<()> {
    let grant = app
        .grant(PermissionGrant {
            stream: StreamId::new(args.stream),
            principal: PrincipalId::new(args.principal),
            kind: args.kind.into(),
            scope: args.scope.into(),
        })
        .await?;
    app.save().await?;
    match mode {
        OutputMode::Json => print_json(&grant)?,
        OutputMode::Text => print_message(&format!(
            "Granted {} ({}) to principal {} on workstream {}",
            grant.kind, grant.scope, grant.principal, grant.stream
        ))?,
    }
    Ok(())
}

async fn execute_revoke(app: &mut App, args: RevokeArgs, mode: OutputMode) -> Result<()> {
    let stream = StreamId::new(args.stream);
    let principal = PrincipalId::new(args.principal);
    app.revoke(stream, principal, args.kind.into(), args.scope.into())
        .await?;
    app.save().await?;
    match mode {
        OutputMode::Json => print_json(&json!({
            "revoked": { "stream": stream, "principal": principal }
        }))?,
        OutputMode::Text => print_message(&format!(
            "Revoked {} from principal {principal} on workstream {stream}",
            args.kind
        ))?,
    }
    Ok(())
}

async fn execute_access(app: &App, args: AccessArgs, mode: OutputMode) -> Result<()> {
    let stream_id = StreamId::new(args.stream);
    let principal = PrincipalId::new(args.principal);

    let stream = app
        .store()
        .stream(stream_id)
        .await?
        .ok_or(Error::StreamNotFound(stream_id))?;
    let resolver = PermissionResolver::new(app.store());
    let access = resolver.resolve(stream_id, principal).await?;

    output::print_access(&stream, principal, &access, mode)?;
    Ok(())
}

// ========== analysis ==========

async fn execute_chain(app: &App, args: ChainArgs, mode: OutputMode) -> Result<()> {
    let item = ItemId::new(args.item);
    let chain = app.store().full_chain(item).await?;
    print_chain(item, &chain, mode)?;
    Ok(())
}

async fn execute_ready(app: &App, mode: OutputMode) -> Result<()> {
    let items = app.store().ready_items().await?;
    print_items(&items, mode)?;
    Ok(())
}

async fn execute_impact(app: &App, args: ImpactArgs, mode: OutputMode) -> Result<()> {
    let item = ItemId::new(args.item);
    let event = DelayEvent {
        item,
        original_date: args.from,
        new_date: args.to,
    };

    let analyzer = ImpactAnalyzer::new(app.store());
    let report = analyzer.assess(&event).await?;
    let delayed: HashSet<ItemId> = HashSet::from([item]);
    let path = analyzer.critical_path(item, &delayed).await?;

    print_impact(&report, &path, mode)?;
    Ok(())
}

async fn execute_rollup(app: &App, args: RollupArgs, mode: OutputMode) -> Result<()> {
    let aggregator = RollupAggregator::new(app.store(), app.cache());
    let report = aggregator.aggregate(StreamId::new(args.stream)).await?;
    print_rollup(&report, mode)?;
    Ok(())
}
