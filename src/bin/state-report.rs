use chrono::Utc;
use mailwatch::{engine, state::StateFile};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        return;
    };

    let state_path =
        env::var("MAILWATCH_STATE_PATH").unwrap_or_else(|_| "mailwatch-state.json".to_owned());
    let state = StateFile::new(&state_path).load();

    match command.as_str() {
        "list" => {
            let limit = args
                .get(2)
                .and_then(|raw| raw.parse::<usize>().ok())
                .unwrap_or(20);

            println!(
                "{} tracked incident(s), last run {}",
                state.incidents.len(),
                state.last_run.to_rfc3339()
            );
            for (key, record) in state.incidents.iter().take(limit) {
                let status = if record.is_resolved { "resolved" } else { "active" };
                let resolved_at = record
                    .resolved_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "-".to_owned());
                println!(
                    "{key} issue=#{} [{status}] created={} lastUpdate={} resolvedAt={resolved_at}",
                    record.issue_number,
                    record.created_at.to_rfc3339(),
                    record.last_update.to_rfc3339(),
                );
            }
        }
        "prune-preview" => {
            let now = Utc::now();
            let mut expired = 0;
            for (key, record) in &state.incidents {
                if engine::is_expired(record, now) {
                    expired += 1;
                    let resolved_at = record
                        .resolved_at
                        .map(|at| at.to_rfc3339())
                        .unwrap_or_else(|| "unknown".to_owned());
                    println!(
                        "{key} issue=#{} would be dropped (resolved {resolved_at})",
                        record.issue_number,
                    );
                }
            }
            println!(
                "{expired} of {} record(s) past the {}-day retention window",
                state.incidents.len(),
                engine::RETENTION_DAYS,
            );
        }
        _ => print_usage(),
    }
}

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  state-report list [limit]");
    eprintln!("  state-report prune-preview");
}
