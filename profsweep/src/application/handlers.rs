use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use profsweep_core::check::registry::read_export;
use profsweep_core::check::resolve_identities;
use profsweep_core::error::{ProfileError, Result};
use profsweep_core::registry::hex::decode_string;
use profsweep_core::registry::parse_export;
use profsweep_core::view::{Column, ColumnKind};
use profsweep_core::{
    Backend, CancelToken, HostParams, Job, JobOutcome, ProfileStore, RegistryEntry, RemoteDir,
    Session, Settings, open_host,
};
use tracing::info;

use crate::presentation::prompt::{TerminalPrompt, confirm};

const POLL: Duration = Duration::from_millis(100);
const NOTICE_EVERY: Duration = Duration::from_secs(15);

fn open_session(settings: Settings, computer: String) -> Result<Session> {
    let host = open_host(
        Backend::Shell,
        HostParams {
            computer,
            settings: settings.clone(),
        },
    )?;
    if !host.ping()? {
        return Err(ProfileError::remote(
            "ping",
            format!("{} did not answer", host.computer()),
        ));
    }
    Session::open(host, settings)
}

/// Run a job in the background, reporting while it is slow, and apply its batch.
fn run_job(session: &mut Session, job: Job) -> Result<JobOutcome> {
    let handle = session.submit(job, CancelToken::new())?;
    let kind = handle.kind();
    let started = Instant::now();
    let mut next_notice = NOTICE_EVERY;
    let outcome = loop {
        if let Some(res) = handle.try_take() {
            break res?;
        }
        if started.elapsed() >= next_notice {
            info!(?kind, secs = started.elapsed().as_secs(), "still running");
            next_notice += NOTICE_EVERY;
        }
        thread::sleep(POLL);
    };
    session.apply(&outcome.batch);
    Ok(outcome)
}

pub fn render_table(store: &ProfileStore, columns: &[Column]) -> Vec<String> {
    let rows: Vec<Vec<String>> = store
        .records()
        .map(|r| columns.iter().map(|c| c.cell(r)).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.title().len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| -> String {
        cells
            .iter()
            .zip(columns)
            .zip(&widths)
            .map(|((cell, col), &w)| match col.kind() {
                ColumnKind::Bytes => format!("{cell:>w$}"),
                _ => format!("{cell:<w$}"),
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(columns.iter().map(|c| c.title().to_string()).collect())];
    out.extend(rows.into_iter().map(line));
    out
}

fn print_table(store: &ProfileStore, columns: &[Column]) {
    for l in render_table(store, columns) {
        println!("{l}");
    }
}

pub fn handle_scan(
    settings: Settings,
    computer: String,
    size: bool,
    state: bool,
    registry: bool,
) -> Result<()> {
    let mut session = open_session(settings, computer)?;
    if size {
        run_job(&mut session, Job::Size)?;
    }
    if state {
        run_job(&mut session, Job::State)?;
    }
    if registry {
        run_job(&mut session, Job::Registry(Box::new(TerminalPrompt)))?;
    }

    let columns: Vec<Column> = Column::ALL
        .into_iter()
        .filter(|c| match c {
            Column::Size => size,
            Column::State => state,
            Column::Sid | Column::Guid => registry,
            _ => true,
        })
        .collect();
    print_table(session.store(), &columns);
    session.close();
    Ok(())
}

pub fn handle_delete(
    settings: Settings,
    computer: String,
    users: Vec<String>,
    all_marked: bool,
    yes: bool,
) -> Result<()> {
    let mut session = open_session(settings, computer)?;
    run_job(&mut session, Job::State)?;
    run_job(&mut session, Job::Registry(Box::new(TerminalPrompt)))?;

    if !all_marked {
        let mut wanted = Vec::with_capacity(users.len());
        for u in &users {
            let key = session
                .store()
                .find_key(u)
                .ok_or_else(|| ProfileError::DoesNotExist(u.clone()))?;
            wanted.push(key.to_string());
        }
        let others: Vec<String> = session
            .store()
            .records()
            .filter(|r| !r.is_public() && !wanted.contains(&r.name))
            .map(|r| r.name.clone())
            .collect();
        for name in &others {
            session.mark(name, false)?;
        }
        for name in &wanted {
            session.mark(name, true)?;
        }
    }

    let marked: Vec<String> = session.store().marked().map(|r| r.name.clone()).collect();
    if marked.is_empty() {
        println!("nothing to delete on {}", session.computer());
        session.close();
        return Ok(());
    }
    print_table(
        session.store(),
        &[Column::User, Column::State, Column::Sid, Column::Guid, Column::Delete],
    );
    if !yes
        && !confirm(&format!(
            "delete {} profile(s) from {}?",
            marked.len(),
            session.computer()
        ))
    {
        println!("cancelled");
        session.close();
        return Ok(());
    }

    let outcome = run_job(&mut session, Job::Delete)?;
    if let Some(report) = &outcome.report {
        for l in report.lines() {
            println!("{}", l.replace('\t', "  |  "));
        }
    }
    if let Some(path) = &outcome.report_path {
        println!("report: {}", path.display());
    }
    session.close();
    Ok(())
}

pub fn handle_ping(settings: Settings, computer: String) -> Result<()> {
    let host = open_host(Backend::Shell, HostParams { computer, settings })?;
    if host.ping()? {
        println!("{} is reachable", host.computer());
    } else {
        println!("{} did not answer", host.computer());
    }
    Ok(())
}

pub fn handle_parse(file: PathBuf) -> Result<()> {
    let text = read_export(&file)?;
    for e in parse_export(&text)? {
        match e {
            RegistryEntry::KeyHeader { path } => println!("[{path}]"),
            RegistryEntry::ValueLine { name, raw_data } => match decode_string(&raw_data) {
                Ok(s) => println!("  {name} = {s}"),
                Err(_) => println!("  {name} = {raw_data}"),
            },
        }
    }
    Ok(())
}

pub fn handle_resolve(
    settings: Settings,
    profile_list: PathBuf,
    profile_guid: PathBuf,
    users: Vec<String>,
) -> Result<()> {
    let mut store = ProfileStore::from_listing(users.into_iter().map(|name| RemoteDir {
        name,
        last_updated: String::new(),
    }));
    let list_text = read_export(&profile_list)?;
    let guid_text = read_export(&profile_guid)?;
    let batch = resolve_identities(&list_text, &guid_text, &store, &settings.user_prefix())?;
    for u in &batch.updates {
        store.apply(u);
    }
    print_table(&store, &[Column::User, Column::Sid, Column::Guid]);
    Ok(())
}
