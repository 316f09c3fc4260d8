use clap::Parser;
use contactcore::cli::{
    run_activity, run_add, run_delete, run_duplicates, run_find_email, run_hide, run_history,
    run_import, run_list, run_merge, run_note, run_restore, run_show, run_task_add, run_task_done,
    run_unhide, run_update, run_version, Cli, Commands, TaskCommands,
};
use contactcore::config::Config;
use contactcore::db::Database;
use contactcore::logging::init_logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().with_overrides(cli.db, cli.log_level, cli.log_dir);

    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("Warning: logging disabled: {}", err);
    }

    let db = Database::open_at(&config.db_path)?;
    let owner = db.local_owner_id()?;

    match cli.command {
        Commands::Add(args) => run_add(&db, owner, args)?,
        Commands::Update(args) => run_update(&db, owner, args)?,
        Commands::Delete(args) => run_delete(&db, owner, &args.identifier)?,
        Commands::List(args) => run_list(&db, owner, args)?,
        Commands::Show(args) => run_show(&db, owner, &args.identifier, args.json)?,
        Commands::FindEmail(args) => run_find_email(&db, owner, &args.address)?,
        Commands::History(args) => run_history(&db, owner, &args.identifier, args.json)?,
        Commands::Version(args) => run_version(&db, owner, &args.identifier, &args.version)?,
        Commands::Restore(args) => run_restore(&db, owner, &args.identifier, &args.version)?,
        Commands::Duplicates(args) => run_duplicates(&db, owner, &args.identifier)?,
        Commands::Merge(args) => run_merge(&db, owner, args)?,
        Commands::Activity(args) => run_activity(&db, owner, args)?,
        Commands::Hide(args) => run_hide(&db, owner, &args.identifier)?,
        Commands::Unhide(args) => run_unhide(&db, owner, &args.identifier)?,
        Commands::Import(args) => {
            run_import(&db, owner, &args.file, args.dry_run)?;
        }
        Commands::Task(TaskCommands::Add(args)) => run_task_add(&db, owner, args)?,
        Commands::Task(TaskCommands::Done(args)) => run_task_done(&db, owner, args.id)?,
        Commands::Note(args) => run_note(&db, owner, args)?,
    }

    Ok(())
}
