//! CLI smoke and inspection entry point.
//!
//! - No arguments: print core linkage info.
//! - `<db_path> <event_id>`: print the derived task checklist of one event.
//!
//! File logging is enabled when `EVENTPLAN_LOG_DIR` is set.

use eventplan_core::{
    init_logging, open_db, EventId, EventService, LoggingConfig, SqliteEventRepository,
    SqliteEventTypeRepository, SqliteTaskDefinitionRepository,
};
use log::{error, info};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Some(config) = LoggingConfig::from_env() {
        if let Err(err) = init_logging(&config.level, &config.log_dir) {
            eprintln!("file logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => {
            println!("eventplan_core ping={}", eventplan_core::ping());
            println!("eventplan_core version={}", eventplan_core::core_version());
            ExitCode::SUCCESS
        }
        [db_path, event_id] => match print_checklist(db_path, event_id) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("event=cli_checklist module=cli status=error error={err}");
                eprintln!("error: {err}");
                ExitCode::FAILURE
            }
        },
        _ => {
            eprintln!("usage: eventplan_cli [<db_path> <event_id>]");
            ExitCode::from(2)
        }
    }
}

fn print_checklist(db_path: &str, event_id: &str) -> Result<(), Box<dyn Error>> {
    let event_id: EventId = event_id
        .trim()
        .parse()
        .map_err(|_| format!("invalid event id `{event_id}`"))?;

    let conn = open_db(db_path)?;
    let service = EventService::new(
        SqliteEventRepository::try_new(&conn)?,
        SqliteEventTypeRepository::try_new(&conn)?,
        SqliteTaskDefinitionRepository::try_new(&conn)?,
    );

    let event = service.get_event(event_id)?;
    let tasks = service.checklist(event_id)?;
    info!(
        "event=cli_checklist module=cli status=ok id={event_id} tasks={}",
        tasks.len()
    );

    println!(
        "event id={} name={} start_time={} tasks={}",
        event.id(),
        event.name(),
        event.start_time(),
        tasks.len()
    );
    for task in tasks {
        println!(
            "{}\t{}\t{}\t{}\t{}",
            task.task_definition_id,
            task.starts_at,
            task.due_at,
            task.source_event_type_id,
            task.title
        );
    }
    Ok(())
}
